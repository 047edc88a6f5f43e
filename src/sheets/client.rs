use super::{CellAddress, CellRange, SheetsError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A worksheet inside a spreadsheet document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRef {
    /// Spreadsheet document id (the key in its URL).
    pub table: String,
    /// Worksheet title.
    pub sheet: String,
    /// Row holding the reporting start date.
    #[serde(default = "default_start_row")]
    pub start_row: u32,
}

fn default_start_row() -> u32 {
    1
}

/// Cell-level access to a spreadsheet. Reads come back padded to the requested rectangle.
#[async_trait]
pub trait SpreadsheetClient: Send + Sync {
    async fn read_ranges(
        &self,
        sheet: &SheetRef,
        ranges: &[CellRange],
    ) -> Result<Vec<Vec<Vec<String>>>, SheetsError>;

    async fn write_ranges(
        &self,
        sheet: &SheetRef,
        writes: &[(CellRange, Vec<Vec<String>>)],
    ) -> Result<(), SheetsError>;

    async fn clear_ranges(&self, sheet: &SheetRef, ranges: &[CellRange]) -> Result<(), SheetsError>;

    async fn read_cell(&self, sheet: &SheetRef, cell: CellAddress) -> Result<String, SheetsError> {
        let mut values = self.read_ranges(sheet, &[CellRange::single(cell)]).await?;
        Ok(values
            .pop()
            .and_then(|mut rows| rows.pop())
            .and_then(|mut row| row.pop())
            .unwrap_or_default())
    }

    /// Reads several columns of one row with a single request spanning them.
    async fn read_row(
        &self,
        sheet: &SheetRef,
        columns: &[u32],
        row: u32,
    ) -> Result<Vec<String>, SheetsError> {
        let (Some(first), Some(last)) = (columns.iter().min(), columns.iter().max()) else {
            return Ok(Vec::new());
        };
        let span = CellRange::new(CellAddress::new(*first, row), CellAddress::new(*last, row));
        let rows = self.read_ranges(sheet, &[span]).await?;
        let line = rows
            .into_iter()
            .next()
            .and_then(|rows| rows.into_iter().next())
            .unwrap_or_default();

        Ok(columns
            .iter()
            .map(|column| {
                line.get((column - first) as usize)
                    .cloned()
                    .unwrap_or_default()
            })
            .collect())
    }

    async fn write_cells(
        &self,
        sheet: &SheetRef,
        cells: &[(CellAddress, String)],
    ) -> Result<(), SheetsError> {
        if cells.is_empty() {
            return Ok(());
        }
        let writes: Vec<(CellRange, Vec<Vec<String>>)> = cells
            .iter()
            .map(|(cell, value)| (CellRange::single(*cell), vec![vec![value.clone()]]))
            .collect();
        self.write_ranges(sheet, &writes).await
    }
}

/// Pads a returned block to the requested rectangle; the API drops trailing blanks.
pub fn pad_block(mut rows: Vec<Vec<String>>, range: &CellRange) -> Vec<Vec<String>> {
    rows.truncate(range.height());
    rows.resize_with(range.height(), Vec::new);
    for row in rows.iter_mut() {
        row.truncate(range.width());
        row.resize_with(range.width(), String::new);
    }
    rows
}
