// Excel file import (xlsx, xlsm, xls, xlsb, ods) and export (xlsx only)
//
// Import: the first row of the chosen sheet is the header row. Date cells become
//         calendar dates; everything else keeps its type.
// Export: one sheet, "Processed Data", with a fixed house style.

use std::path::Path;

use calamine::{open_workbook_auto, Data, ExcelDateTime, Reader, Sheets};
use chrono::NaiveDate;
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook as XlsxWorkbook};
use switchrecon::dates::{date_to_excel_serial, parse_day_first};
use switchrecon::{Table, Value};

use crate::{table_name, IoError};

/// Name of the single worksheet written on export.
pub const OUTPUT_SHEET: &str = "Processed Data";

const HEADER_FILL: u32 = 0x305496;
const FONT_NAME: &str = "Calibri";
const DATE_FORMAT: &str = "dd-mm-yyyy";
const MIN_COLUMN_WIDTH: usize = 12;
const MAX_COLUMN_WIDTH: usize = 50;

/// Spreadsheet limits (rows include the header row).
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

/// Import one worksheet (`sheet`, or the first) as a table.
pub fn import(path: &Path, sheet: Option<&str>) -> Result<Table, IoError> {
    let read_err = |message: String| IoError::Read {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| read_err(format!("failed to open workbook: {e}")))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(wanted) => sheet_names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| {
                read_err(format!(
                    "no sheet named '{wanted}' (sheets: {})",
                    sheet_names.join(", ")
                ))
            })?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| read_err("workbook contains no sheets".into()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| read_err(format!("failed to read sheet '{sheet_name}': {e}")))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(header_text).collect(),
        None => Vec::new(),
    };

    let mut table = Table::new(table_name(path), headers);
    for row in rows {
        let values: Vec<Value> = row.iter().map(cell_value).collect();
        if values.iter().all(Value::is_blank) {
            continue;
        }
        table.push_row(values);
    }
    log::debug!("{}: read sheet '{sheet_name}'", path.display());
    Ok(table)
}

fn header_text(cell: &Data) -> String {
    match cell_value(cell) {
        Value::Text(s) => s,
        other => other.to_string(),
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) => Value::from_field(s),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::text(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => Value::text(format!("#{:?}", e)),
        Data::DateTime(dt) => date_time_value(dt),
        Data::DateTimeIso(s) => parse_day_first(s).map_or_else(|| Value::from_field(s), Value::Date),
        Data::DurationIso(s) => Value::from_field(s),
    }
}

/// Calendar date of a date cell, honouring the workbook's 1900 or 1904 epoch.
/// Durations and out-of-range serials stay numbers.
fn date_time_value(dt: &ExcelDateTime) -> Value {
    let serial = dt.as_f64();
    if dt.is_duration() || !serial.is_finite() || serial < 0.0 {
        return Value::Number(serial);
    }
    let (year, month, day, ..) = dt.to_ymd_hms_milli();
    NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
        .map_or(Value::Number(serial), Value::Date)
}

/// Export the table as a single styled worksheet.
pub fn export(table: &Table, path: &Path) -> Result<(), IoError> {
    let write_err = |message: String| IoError::Write {
        path: path.to_path_buf(),
        message,
    };

    if table.len() + 1 > MAX_ROWS || table.width() > MAX_COLS {
        return Err(write_err(format!(
            "{} rows x {} columns exceeds the spreadsheet limit",
            table.len() + 1,
            table.width()
        )));
    }

    let header_format = Format::new()
        .set_bold()
        .set_font_name(FONT_NAME)
        .set_font_size(11.0)
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap();
    let body_format = Format::new()
        .set_font_name(FONT_NAME)
        .set_font_size(10.0)
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap();
    let date_format = body_format.clone().set_num_format(DATE_FORMAT);

    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(OUTPUT_SHEET)
        .map_err(|e| write_err(format!("failed to create sheet: {e}")))?;

    for (col, header) in table.headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, header, &header_format)
            .map_err(|e| write_err(e.to_string()))?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let row32 = (r + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            let col16 = col as u16;
            let written = match value {
                Value::Empty => worksheet.write_blank(row32, col16, &body_format),
                Value::Number(n) => worksheet.write_number_with_format(row32, col16, *n, &body_format),
                Value::Date(d) => match date_to_excel_serial(*d) {
                    Some(serial) => worksheet.write_number_with_format(row32, col16, serial, &date_format),
                    None => worksheet.write_string_with_format(row32, col16, value.to_string(), &body_format),
                },
                Value::Text(_) | Value::NotFound => {
                    worksheet.write_string_with_format(row32, col16, value.to_string(), &body_format)
                }
            };
            written.map_err(|e| write_err(e.to_string()))?;
        }
    }

    for (col, width) in column_widths(table).into_iter().enumerate() {
        worksheet
            .set_column_width(col as u16, width as f64)
            .map_err(|e| write_err(e.to_string()))?;
    }

    workbook
        .save(path)
        .map_err(|e| write_err(format!("failed to save workbook: {e}")))?;
    Ok(())
}

/// Width per column: longest rendered value plus two, clamped to 12..=50.
pub fn column_widths(table: &Table) -> Vec<usize> {
    (0..table.width())
        .map(|col| {
            let longest = std::iter::once(table.headers[col].chars().count())
                .chain(table.rows.iter().map(|r| {
                    r.get(col).map_or(0, |v| v.to_string().chars().count())
                }))
                .max()
                .unwrap_or(0);
            (longest + 2).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::ExcelDateTimeType;
    use tempfile::tempdir;

    fn processed() -> Table {
        let mut t = Table::new(
            "processed",
            vec![
                "out Scheme Code".into(),
                "TRAN_DATE".into(),
                "switch in Trail Rate 1 year".into(),
                "Check 1 year".into(),
            ],
        );
        t.push_row(vec![
            Value::text("129B"),
            Value::Date(NaiveDate::from_ymd_opt(2023, 6, 15).unwrap()),
            Value::Number(1.0),
            Value::text("Check"),
        ]);
        t.push_row(vec![Value::Empty, Value::Empty, Value::NotFound, Value::Empty]);
        t
    }

    #[test]
    fn test_export_then_import() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("processed.xlsx");
        let table = processed();

        export(&table, &path).unwrap();

        let back = import(&path, None).unwrap();
        assert_eq!(back.name, "processed.xlsx");
        assert_eq!(back.headers, table.headers);
        assert_eq!(back.len(), 2);
        assert_eq!(back.cell(0, 0), &Value::text("129B"));
        assert_eq!(back.cell(0, 2), &Value::Number(1.0));
        assert_eq!(back.cell(1, 2), &Value::text("Not Found"));
        assert_eq!(back.cell(1, 0), &Value::Empty);
    }

    #[test]
    fn test_import_named_sheet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        export(&processed(), &path).unwrap();

        assert!(import(&path, Some(OUTPUT_SHEET)).is_ok());
        let err = import(&path, Some("Sheet9")).unwrap_err();
        assert!(err.to_string().contains("no sheet named 'Sheet9'"));
    }

    #[test]
    fn test_import_rejects_non_workbook() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fake.xlsx");
        std::fs::write(&path, "not a zip").unwrap();
        assert!(matches!(import(&path, None), Err(IoError::Read { .. })));
    }

    #[test]
    fn test_column_widths_are_clamped() {
        let mut t = Table::new("w", vec!["A".into(), "switch in Trail Rate 1 year".into(), "N".into()]);
        t.push_row(vec![Value::Empty, Value::Empty, Value::text("x".repeat(80))]);
        assert_eq!(column_widths(&t), vec![12, 29, 50]);
    }

    #[test]
    fn test_cell_conversion() {
        assert_eq!(cell_value(&Data::Bool(true)), Value::text("TRUE"));
        assert_eq!(cell_value(&Data::Int(7)), Value::Number(7.0));
        assert_eq!(cell_value(&Data::String("  ".into())), Value::Empty);
        assert_eq!(
            cell_value(&Data::DateTimeIso("2023-06-15T00:00:00".into())),
            Value::Date(NaiveDate::from_ymd_opt(2023, 6, 15).unwrap())
        );
        assert_eq!(header_text(&Data::Float(2024.0)), "2024");
    }

    #[test]
    fn test_date_cells_follow_workbook_epoch() {
        let expected = Value::Date(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
        let v1900 = ExcelDateTime::new(45667.0, ExcelDateTimeType::DateTime, false);
        let v1904 = ExcelDateTime::new(45667.0 - 1462.0, ExcelDateTimeType::DateTime, true);
        assert_eq!(cell_value(&Data::DateTime(v1900)), expected);
        assert_eq!(cell_value(&Data::DateTime(v1904)), expected);

        let duration = ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, false);
        assert_eq!(cell_value(&Data::DateTime(duration)), Value::Number(1.5));
    }
}
