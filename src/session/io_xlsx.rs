// Spreadsheet input (calamine) and Excel export (rust_xlsxwriter).

use calamine::{open_workbook_auto, DataType, Reader};
use rust_xlsxwriter::{Format, Workbook};

use crate::session::*;

pub const REPORT_SHEET_NAME: &str = "Attendance Report";

fn read_cell(cell: &DataType) -> Cell {
    match cell {
        DataType::String(s) if s.is_empty() => Cell::Empty,
        DataType::String(s) => Cell::Text(s.clone()),
        DataType::Int(i) => Cell::Number(*i as f64),
        DataType::Float(f) => Cell::Number(*f),
        DataType::Bool(b) => Cell::Text(b.to_string()),
        _ => Cell::Empty,
    }
}

/// Reads the first sheet of a workbook (xlsx, xlsm, xls or ods).
pub fn read_roster_sheet(path: &str) -> SessionResult<Grid> {
    let mut workbook = open_workbook_auto(path).context(SourceReadSnafu { path })?;
    let range = workbook
        .worksheet_range_at(0)
        .context(EmptySpreadsheetSnafu { path })?
        .context(SourceReadSnafu { path })?;
    let rows: Vec<Vec<Cell>> = range
        .rows()
        .map(|row| row.iter().map(read_cell).collect())
        .collect();
    debug!(
        "read_roster_sheet: {}: {} rows",
        simplify_file_name(path),
        rows.len()
    );
    Ok(Grid::new(rows))
}

pub fn write_report_xlsx(report: &AttendanceReport, order: SortOrder, path: &str) -> SessionResult<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook
        .add_worksheet()
        .set_name(REPORT_SHEET_NAME)
        .context(WritingXlsxSnafu { path })?;
    for (col, title) in EXPORT_HEADER.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *title, &bold)
            .context(WritingXlsxSnafu { path })?;
    }
    for (idx, row) in report.export_rows(order).iter().enumerate() {
        for (col, value) in row.cells().iter().enumerate() {
            sheet
                .write_string((idx + 1) as u32, col as u16, *value)
                .context(WritingXlsxSnafu { path })?;
        }
    }
    sheet
        .set_column_width(0, 32)
        .context(WritingXlsxSnafu { path })?;
    sheet
        .set_column_width(2, 32)
        .context(WritingXlsxSnafu { path })?;
    workbook.save(path).context(WritingXlsxSnafu { path })?;
    Ok(())
}
