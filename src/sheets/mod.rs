pub mod address;
pub mod client;
pub mod google;

pub use address::{CellAddress, CellRange, ReportingCalendar};
pub use client::{SheetRef, SpreadsheetClient};

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("invalid cell address: {0}")]
    InvalidAddress(String),
    #[error("{0} is before the reporting start date")]
    BeforeStart(NaiveDate),
    #[error("spreadsheet request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("spreadsheet API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("google authorization failed: {0}")]
    Auth(String),
    #[error("The google service file is either not in JSON format or invalid.")]
    InvalidCredentialsFile,
    #[error("unexpected spreadsheet response: {0}")]
    Malformed(String),
}
