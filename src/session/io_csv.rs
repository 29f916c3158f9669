// Primitives for reading and writing CSV files.

use std::fs::File;
use std::io::Write;

use csv::{ReaderBuilder, Writer};

use crate::session::*;

const BOM: &str = "\u{feff}";

fn read_field(s: &str) -> Cell {
    if s.trim().is_empty() {
        Cell::Empty
    } else {
        Cell::Text(s.to_string())
    }
}

/// Reads a roster exported as CSV. There is no header handling: the
/// header row, if any, is found by the column locator.
pub fn read_roster_csv(path: &str) -> SessionResult<Grid> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(SourceReadCsvSnafu { path })?;
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.context(SourceReadCsvSnafu { path })?;
        let row: Vec<Cell> = record
            .iter()
            .enumerate()
            .map(|(col, s)| {
                if idx == 0 && col == 0 {
                    read_field(s.trim_start_matches(BOM))
                } else {
                    read_field(s)
                }
            })
            .collect();
        rows.push(row);
    }
    debug!(
        "read_roster_csv: {}: {} rows",
        simplify_file_name(path),
        rows.len()
    );
    Ok(Grid::new(rows))
}

/// Writes the report as CSV, preceded by a byte order mark so that
/// spreadsheet programs detect UTF-8.
pub fn write_report_csv(report: &AttendanceReport, order: SortOrder, path: &str) -> SessionResult<()> {
    let mut file = File::create(path).context(WritingFileSnafu { path })?;
    file.write_all(BOM.as_bytes())
        .context(WritingFileSnafu { path })?;
    let mut writer = Writer::from_writer(file);
    writer
        .write_record(EXPORT_HEADER)
        .context(WritingCsvSnafu { path })?;
    for row in report.export_rows(order).iter() {
        writer
            .write_record(row.cells())
            .context(WritingCsvSnafu { path })?;
    }
    writer.flush().context(WritingFileSnafu { path })?;
    Ok(())
}
