//! A1 cell addressing and the reporting calendar that maps dates to rows.

use super::SheetsError;
use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Converts column letters (`A`, `Z`, `AA`) into a 1-based index.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, ch| {
        let ch = ch.to_ascii_uppercase();
        ch.is_ascii_uppercase()
            .then(|| acc * 26 + (ch as u32 - 'A' as u32 + 1))
    })
}

/// Converts a 1-based column index back into letters.
pub fn column_letters(mut index: u32) -> String {
    let mut out = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        out.push((b'A' + rem as u8) as char);
        index = (index - 1) / 26;
    }
    out.iter().rev().collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub column: u32,
    pub row: u32,
}

impl CellAddress {
    pub fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Column letters from config plus a computed row.
    pub fn at(column: &str, row: u32) -> Result<Self, SheetsError> {
        let column = column_index(column.trim())
            .ok_or_else(|| SheetsError::InvalidAddress(column.to_string()))?;
        if row == 0 {
            return Err(SheetsError::InvalidAddress(format!("{}0", column_letters(column))));
        }
        Ok(Self { column, row })
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.column), self.row)
    }
}

impl FromStr for CellAddress {
    type Err = SheetsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let split = trimmed
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| SheetsError::InvalidAddress(raw.to_string()))?;
        let (letters, digits) = trimmed.split_at(split);
        let row: u32 = digits
            .parse()
            .map_err(|_| SheetsError::InvalidAddress(raw.to_string()))?;
        Self::at(letters, row).map_err(|_| SheetsError::InvalidAddress(raw.to_string()))
    }
}

/// Rectangle between two corners, inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress::new(a.column.min(b.column), a.row.min(b.row)),
            end: CellAddress::new(a.column.max(b.column), a.row.max(b.row)),
        }
    }

    pub fn single(cell: CellAddress) -> Self {
        Self { start: cell, end: cell }
    }

    pub fn width(&self) -> usize {
        (self.end.column - self.start.column + 1) as usize
    }

    pub fn height(&self) -> usize {
        (self.end.row - self.start.row + 1) as usize
    }

    /// Range prefixed with a quoted sheet title, as the Sheets API expects.
    pub fn a1(&self, sheet_title: &str) -> String {
        format!("'{}'!{}", sheet_title.replace('\'', "''"), self)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

/// Row `start_row` holds `start_date`; every following day is the next row.
#[derive(Clone, Copy, Debug)]
pub struct ReportingCalendar {
    pub start_date: NaiveDate,
}

impl ReportingCalendar {
    pub fn new(start_date: NaiveDate) -> Self {
        Self { start_date }
    }

    pub fn day_row(&self, start_row: u32, today: NaiveDate) -> Result<u32, SheetsError> {
        let days = (today - self.start_date).num_days();
        if days < 0 {
            return Err(SheetsError::BeforeStart(today));
        }
        Ok(start_row + days as u32)
    }

    /// Row of the Monday of `today`'s week.
    pub fn week_row(&self, start_row: u32, today: NaiveDate) -> Result<u32, SheetsError> {
        let offset = today.weekday().num_days_from_monday() as u32;
        let day_row = self.day_row(start_row, today)?;
        day_row
            .checked_sub(offset)
            .filter(|row| *row >= start_row)
            .ok_or(SheetsError::BeforeStart(today))
    }
}
