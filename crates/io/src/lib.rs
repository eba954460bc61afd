// File I/O for reconciliation tables
//
// Load: CSV/TSV (delimiter sniffed, Windows-1252 fallback) and spreadsheets
//       (xlsx, xlsm, xls, xlsb, ods) into the engine's `Table`.
// Write: the enriched table as a styled .xlsx or a plain .csv.

pub mod csv;
pub mod xlsx;

use std::path::{Path, PathBuf};

use switchrecon::Table;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("cannot read {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },

    #[error("unsupported file type: {} (expected .csv, .tsv, .txt, .xlsx, .xlsm, .xls, .xlsb or .ods)", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("{} has no header row", .path.display())]
    Empty { path: PathBuf },

    /// Output could not be written. Distinct from load errors so callers can
    /// retry against another destination.
    #[error("cannot write {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },
}

/// On-disk table formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Tsv,
    Spreadsheet,
}

impl FileKind {
    pub fn of(path: &Path) -> Result<Self, IoError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "txt" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Spreadsheet),
            _ => Err(IoError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Load a table from disk. `sheet` selects a worksheet in spreadsheet files
/// (first sheet when `None`) and is ignored for delimited files.
pub fn load_table(path: &Path, sheet: Option<&str>) -> Result<Table, IoError> {
    let mut table = match FileKind::of(path)? {
        FileKind::Csv => csv::import(path)?,
        FileKind::Tsv => csv::import_with_delimiter(path, b'\t')?,
        FileKind::Spreadsheet => xlsx::import(path, sheet)?,
    };
    if table.headers.is_empty() {
        return Err(IoError::Empty {
            path: path.to_path_buf(),
        });
    }
    name_blank_headers(&mut table);
    log::debug!(
        "loaded {}: {} column(s), {} row(s)",
        path.display(),
        table.width(),
        table.len()
    );
    Ok(table)
}

/// Write a table to `path` (.xlsx or .csv). The table is only borrowed, so a
/// failed write can be retried elsewhere.
pub fn write_table(table: &Table, path: &Path) -> Result<(), IoError> {
    match FileKind::of(path)? {
        FileKind::Csv => csv::export(table, path),
        FileKind::Spreadsheet
            if path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("xlsx")) =>
        {
            xlsx::export(table, path)
        }
        _ => Err(IoError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Label for a loaded table: its file name.
pub(crate) fn table_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Blank header cells become `Column <letter>` so they can be told apart.
fn name_blank_headers(table: &mut Table) {
    for (col, header) in table.headers.iter_mut().enumerate() {
        if header.trim().is_empty() {
            *header = format!("Column {}", col_to_letter(col));
        }
    }
}

/// Convert column index to spreadsheet column letters (0 = A, 25 = Z, 26 = AA).
pub fn col_to_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col + 1;
    while n > 0 {
        n -= 1;
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use switchrecon::Value;
    use tempfile::tempdir;

    #[test]
    fn file_kinds() {
        assert_eq!(FileKind::of(Path::new("a.CSV")).unwrap(), FileKind::Csv);
        assert_eq!(FileKind::of(Path::new("a.tsv")).unwrap(), FileKind::Tsv);
        assert_eq!(FileKind::of(Path::new("a.xlsb")).unwrap(), FileKind::Spreadsheet);
        assert!(matches!(
            FileKind::of(Path::new("a.pdf")),
            Err(IoError::UnsupportedFormat { .. })
        ));
        assert!(FileKind::of(Path::new("noext")).is_err());
    }

    #[test]
    fn column_letters() {
        assert_eq!(col_to_letter(0), "A");
        assert_eq!(col_to_letter(25), "Z");
        assert_eq!(col_to_letter(26), "AA");
        assert_eq!(col_to_letter(701), "ZZ");
    }

    #[test]
    fn blank_headers_are_named_by_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reg.csv");
        fs::write(&path, "Folio,,Broker,\nF1,x,BRK1,\n").unwrap();
        let t = load_table(&path, None).unwrap();
        assert_eq!(t.headers, vec!["Folio", "Column B", "Broker", "Column D"]);
        assert_eq!(t.name, "reg.csv");
        assert_eq!(t.cell(0, 1), &Value::text("x"));
    }

    #[test]
    fn empty_file_has_no_header_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();
        assert!(matches!(load_table(&path, None), Err(IoError::Empty { .. })));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempdir().unwrap();
        let err = load_table(&dir.path().join("nope.csv"), None).unwrap_err();
        assert!(matches!(err, IoError::Read { .. }));
        assert!(err.to_string().starts_with("cannot read "));
    }

    #[test]
    fn write_rejects_unwritable_formats() {
        let dir = tempdir().unwrap();
        let table = Table::new("t", vec!["A".into()]);
        let err = write_table(&table, &dir.path().join("out.ods")).unwrap_err();
        assert!(matches!(err, IoError::UnsupportedFormat { .. }));
    }

    #[test]
    fn write_into_missing_directory_fails_without_consuming_table() {
        let dir = tempdir().unwrap();
        let mut table = Table::new("t", vec!["A".into()]);
        table.push_row(vec![Value::text("1")]);
        let bad = dir.path().join("no/such/dir/out.csv");
        assert!(matches!(write_table(&table, &bad), Err(IoError::Write { .. })));
        let good = dir.path().join("out.csv");
        write_table(&table, &good).unwrap();
        assert_eq!(fs::read_to_string(&good).unwrap(), "A\n1\n");
    }
}
