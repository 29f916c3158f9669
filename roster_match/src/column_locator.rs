// Finds the column of person names in a messy roster sheet.

use std::collections::HashSet;

use log::{debug, warn};

use crate::config::LocatorConfig;

/// A single spreadsheet cell, as delivered by the spreadsheet reader.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// The textual content of the cell (untrimmed).
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => "".to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format!("{}", n),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Cell {
        Cell::Number(n)
    }
}

/// The first sheet of a roster, row by row. Rows may have different lengths.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Grid {
        Grid { rows }
    }

    /// Builds a grid of text cells. Empty strings become empty cells.
    pub fn from_text_rows(rows: &[Vec<&str>]) -> Grid {
        Grid {
            rows: rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|s| if s.is_empty() { Cell::Empty } else { Cell::from(*s) })
                        .collect()
                })
                .collect(),
        }
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// The length of the longest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    // Lower-cased, trimmed text of a cell. Missing cells read as "".
    fn header_text(&self, row: Option<usize>, col: usize) -> String {
        row.and_then(|r| self.cell(r, col))
            .map(|c| c.text().trim().to_lowercase())
            .unwrap_or_default()
    }
}

/// How the name column was found.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Detection {
    PrimaryKeyword,
    SecondaryKeyword,
    ColumnScore,
    DefaultColumn,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct ColumnLocation {
    /// The header row, if a header keyword was found.
    pub header_row: Option<usize>,
    pub column: usize,
    pub detection: Detection,
}

impl ColumnLocation {
    /// The first row holding data.
    pub fn first_data_row(&self) -> usize {
        self.header_row.map(|h| h + 1).unwrap_or(0)
    }
}

/// True for text that reads entirely as a number, with the rules of a
/// spreadsheet formula or a browser: blank text counts as 0, decimal and
/// exponent forms ("12", " 3.5", "1e3", "-.5"), hexadecimal, octal and
/// binary literals ("0x1A", "0o17", "0b101") and a signed "Infinity".
/// "inf", "infinity" and "NaN" are text.
pub fn is_numeric_text(s: &str) -> bool {
    let t = s.trim();
    if t.is_empty() {
        return true;
    }
    let lower = t.to_lowercase();
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = lower.strip_prefix(prefix) {
            return !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix));
        }
    }
    let unsigned = t
        .strip_prefix('+')
        .or_else(|| t.strip_prefix('-'))
        .unwrap_or(t);
    if unsigned == "Infinity" {
        return true;
    }
    // Rust also reads "inf" and "nan", in any case.
    if unsigned.chars().any(|c| c.is_alphabetic() && c != 'e' && c != 'E') {
        return false;
    }
    t.parse::<f64>().is_ok()
}

fn contains_any(value: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| value.contains(k.as_str()))
}

/// Scans the first rows, left to right and top to bottom, for a header cell
/// containing one of the keywords. Cells that also contain one of the
/// `reject` keywords are skipped. Returns (row, column) of the first hit.
pub fn find_header(
    grid: &Grid,
    keywords: &[String],
    reject: &[String],
    scan_rows: usize,
) -> Option<(usize, usize)> {
    for (row_idx, row) in grid.rows().iter().take(scan_rows).enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            let value = cell.text().trim().to_lowercase();
            if contains_any(&value, keywords) && !contains_any(&value, reject) {
                debug!(
                    "find_header: found {:?} at row {} column {}",
                    value, row_idx, col_idx
                );
                return Some((row_idx, col_idx));
            }
        }
    }
    None
}

/// Scores every column on how name-like its values are.
///
/// Up to `sample_rows` rows following the header (or from the first row if
/// there is no header) are sampled. Per cell: 2 points for a long value of
/// several words that is neither an email nor a number, 1 point for a
/// medium-length non-numeric value. Columns whose header contains an ignore
/// keyword keep a score of 0.
pub fn score_columns(grid: &Grid, header_row: Option<usize>, config: &LocatorConfig) -> Vec<u32> {
    let mut scores: Vec<u32> = vec![0; grid.width()];
    let excluded: Vec<bool> = (0..scores.len())
        .map(|col| contains_any(&grid.header_text(header_row, col), &config.ignore_keywords))
        .collect();
    let sample_start = header_row.map(|h| h + 1).unwrap_or(0);

    for row in grid
        .rows()
        .iter()
        .skip(sample_start)
        .take(config.sample_rows)
    {
        for (col, cell) in row.iter().enumerate() {
            if excluded[col] {
                continue;
            }
            let text = cell.text();
            let value = text.trim();
            let len = value.chars().count();
            let numeric = is_numeric_text(value);
            if len > 8 && value.split_whitespace().count() >= 2 && !value.contains('@') && !numeric
            {
                scores[col] += 2;
            } else if len > 5 && !numeric {
                scores[col] += 1;
            }
        }
    }
    debug!("score_columns: header_row: {:?} scores: {:?}", header_row, scores);
    scores
}

// Index of the first maximum.
fn best_column(scores: &[u32]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (idx, score) in scores.iter().enumerate() {
        match best {
            Some((_, s)) if s >= *score => {}
            _ => best = Some((idx, *score)),
        }
    }
    best.map(|p| p.0)
}

/// Finds the row and column most likely to hold person names.
///
/// The strategies are tried in order and the first success wins:
/// primary keywords, secondary keywords (minus the ignore list), column
/// scoring, and finally column 0.
pub fn locate_name_column(grid: &Grid, config: &LocatorConfig) -> ColumnLocation {
    if let Some((row, col)) = find_header(grid, &config.primary_keywords, &[], config.header_scan_rows) {
        return ColumnLocation {
            header_row: Some(row),
            column: col,
            detection: Detection::PrimaryKeyword,
        };
    }
    if let Some((row, col)) = find_header(
        grid,
        &config.secondary_keywords,
        &config.ignore_keywords,
        config.header_scan_rows,
    ) {
        return ColumnLocation {
            header_row: Some(row),
            column: col,
            detection: Detection::SecondaryKeyword,
        };
    }

    let scores = score_columns(grid, None, config);
    match best_column(&scores) {
        Some(col) => ColumnLocation {
            header_row: None,
            column: col,
            detection: Detection::ColumnScore,
        },
        None => {
            warn!("Could not reliably identify a name column. Defaulting to column 0.");
            ColumnLocation {
                header_row: None,
                column: 0,
                detection: Detection::DefaultColumn,
            }
        }
    }
}

/// Reads the names below the located header.
///
/// Values are trimmed, and kept when longer than the minimum length and not
/// numeric. Duplicates are removed, keeping the first occurrence.
pub fn extract_column_names(
    grid: &Grid,
    location: &ColumnLocation,
    config: &LocatorConfig,
) -> Vec<String> {
    let col = location.column;
    let header = grid.header_text(location.header_row, col);
    // The column belongs to a pivot table sharing the sheet.
    if col >= config.pivot_guard_column && header.contains(config.pivot_label.as_str()) {
        debug!(
            "extract_column_names: column {} is a pivot table region, skipping it",
            col
        );
        return vec![];
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut res: Vec<String> = Vec::new();
    for (idx, row) in grid.rows().iter().enumerate().skip(location.first_data_row()) {
        let value = match row.get(col) {
            Some(cell) => cell.text().trim().to_string(),
            None => continue,
        };
        if value.chars().count() <= config.min_name_len || is_numeric_text(&value) {
            debug!("extract_column_names: row {}: skipping {:?}", idx, value);
            continue;
        }
        if seen.insert(value.clone()) {
            res.push(value);
        }
    }
    res
}

/// Locates the name column of the grid and returns its deduplicated names.
pub fn extract_names_from_grid(grid: &Grid, config: &LocatorConfig) -> Vec<String> {
    let location = locate_name_column(grid, config);
    debug!("extract_names_from_grid: location: {:?}", location);
    extract_column_names(grid, &location, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[Vec<&str>]) -> Grid {
        Grid::from_text_rows(rows)
    }

    #[test]
    fn primary_keyword_beats_pivot_label() {
        let g = grid(&[
            vec!["Training report", "", "", ""],
            vec!["Row Labels", "Count of ID", "Pharmacist Name", "City"],
            vec!["North", "3", "Sara Ali", "Cairo"],
            vec!["South", "2", "Omar Khan", "Giza"],
        ]);
        let loc = locate_name_column(&g, &LocatorConfig::default());
        assert_eq!(loc.header_row, Some(1));
        assert_eq!(loc.column, 2);
        assert_eq!(loc.detection, Detection::PrimaryKeyword);
        assert_eq!(
            extract_names_from_grid(&g, &LocatorConfig::default()),
            vec!["Sara Ali", "Omar Khan"]
        );
    }

    #[test]
    fn primary_keyword_wins_over_earlier_secondary() {
        let g = grid(&[
            vec!["Name of supervisor group", "Display Name"],
            vec!["Group A", "Sara Ali"],
        ]);
        let loc = locate_name_column(&g, &LocatorConfig::default());
        assert_eq!((loc.header_row, loc.column), (Some(0), 1));
    }

    #[test]
    fn secondary_keyword_skips_ignored_headers() {
        let g = grid(&[
            vec!["Username", "Supervisor name", "Full Name", "Email"],
            vec!["sali", "Dr. Hany", "Sara Ali", "sara@x.org"],
            vec!["okhan", "Dr. Hany", "Omar Khan", "omar@x.org"],
        ]);
        let loc = locate_name_column(&g, &LocatorConfig::default());
        assert_eq!(loc.detection, Detection::SecondaryKeyword);
        assert_eq!(loc.column, 2);
        assert_eq!(
            extract_column_names(&g, &loc, &LocatorConfig::default()),
            vec!["Sara Ali", "Omar Khan"]
        );
    }

    #[test]
    fn arabic_header() {
        let g = grid(&[vec!["م", "الاسم"], vec!["1", "سارة علي"], vec!["2", "عمر خان"]]);
        assert_eq!(
            extract_names_from_grid(&g, &LocatorConfig::default()),
            vec!["سارة علي", "عمر خان"]
        );
    }

    #[test]
    fn header_search_is_limited_to_first_rows() {
        let mut rows: Vec<Vec<&str>> = (0..10).map(|_| vec!["x", "y"]).collect();
        rows.push(vec!["Pharmacist Name", "Other"]);
        let g = grid(&rows);
        assert_eq!(find_header(&g, &LocatorConfig::default().primary_keywords, &[], 10), None);
    }

    #[test]
    fn scoring_fallback_prefers_name_like_column() {
        let g = grid(&[
            vec!["1001", "Sara Ali Hassan", "2024-01-01"],
            vec!["1002", "Omar Khan Mahmoud", "2024-01-02"],
            vec!["1003", "Mona", "2024-01-03"],
        ]);
        let loc = locate_name_column(&g, &LocatorConfig::default());
        assert_eq!(loc.detection, Detection::ColumnScore);
        assert_eq!(loc.header_row, None);
        assert_eq!(loc.column, 1);
        assert_eq!(
            extract_column_names(&g, &loc, &LocatorConfig::default()),
            vec!["Sara Ali Hassan", "Omar Khan Mahmoud", "Mona"]
        );
    }

    #[test]
    fn scoring_tie_goes_to_lowest_column() {
        let g = grid(&[
            vec!["12", "Sara Ali Hassan", "Omar Khan Mahmoud"],
            vec!["13", "Mona Adel Fathy", "Hany Samir Aziz"],
        ]);
        let scores = score_columns(&g, None, &LocatorConfig::default());
        assert_eq!(scores, vec![0, 4, 4]);
        assert_eq!(locate_name_column(&g, &LocatorConfig::default()).column, 1);
    }

    #[test]
    fn scoring_rules() {
        let g = grid(&[
            vec!["sara.ali@mail.com x", "Alexandria", "123456789", "Sara Ali"],
        ]);
        // email: long, two words but contains '@' -> 1 point
        // single long word -> 1 point
        // number -> 0
        // "Sara Ali" is 8 chars -> not > 8 -> 1 point
        assert_eq!(score_columns(&g, None, &LocatorConfig::default()), vec![1, 1, 0, 1]);
    }

    #[test]
    fn scoring_excludes_ignored_header_columns() {
        let g = grid(&[
            vec!["Status", "Attendee"],
            vec!["Did not attend today", "Sara"],
        ]);
        let scores = score_columns(&g, Some(0), &LocatorConfig::default());
        assert_eq!(scores, vec![0, 0]);
    }

    #[test]
    fn empty_grid_defaults_to_first_column() {
        let g = Grid::default();
        let loc = locate_name_column(&g, &LocatorConfig::default());
        assert_eq!(loc.detection, Detection::DefaultColumn);
        assert_eq!(loc.column, 0);
        assert!(extract_column_names(&g, &loc, &LocatorConfig::default()).is_empty());
    }

    #[test]
    fn extraction_filters_short_numeric_and_duplicates() {
        let g = Grid::new(vec![
            vec![Cell::from("Display Name")],
            vec![Cell::from("  Sara Ali  ")],
            vec![Cell::from("Ali")],
            vec![Cell::Number(12345.0)],
            vec![Cell::from("2023")],
            vec![],
            vec![Cell::Empty],
            vec![Cell::from("Sara Ali")],
            vec![Cell::from("Omar Khan")],
        ]);
        let names = extract_names_from_grid(&g, &LocatorConfig::default());
        assert_eq!(names, vec!["Sara Ali", "Omar Khan"]);
        // Running the extraction again gives the same output.
        assert_eq!(extract_names_from_grid(&g, &LocatorConfig::default()), names);
    }

    #[test]
    fn pivot_region_is_not_read() {
        let g = grid(&[
            vec!["a", "b", "c", "d", "e", "f", "Row Labels: pharmacist name"],
            vec!["", "", "", "", "", "", "Sara Ali"],
        ]);
        let loc = locate_name_column(&g, &LocatorConfig::default());
        assert_eq!(loc.column, 6);
        assert!(extract_column_names(&g, &loc, &LocatorConfig::default()).is_empty());
    }

    #[test]
    fn numeric_text() {
        assert!(is_numeric_text("42"));
        assert!(is_numeric_text(" 3.5 "));
        assert!(is_numeric_text(""));
        assert!(!is_numeric_text("NaN"));
        assert!(!is_numeric_text("Sara"));
        assert!(!is_numeric_text("12 Main"));
        assert!(is_numeric_text("1e3"));
        assert!(is_numeric_text("-.5"));
        assert!(is_numeric_text("Infinity"));
        assert!(is_numeric_text("-Infinity"));
        assert!(!is_numeric_text("inf"));
        assert!(!is_numeric_text("INF"));
        assert!(!is_numeric_text("infinity"));
        assert!(is_numeric_text("0x1A"));
        assert!(is_numeric_text("0b101"));
        assert!(!is_numeric_text("0x"));
        assert!(!is_numeric_text("0xZ1"));
        assert!(!is_numeric_text("-0x1A"));
    }
}
