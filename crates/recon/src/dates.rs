//! Day-first date parsing for register and schedule cells.
//!
//! Text dates are read day-first (`15-06-2023`, `15/06/2023`, `15-Jun-2023`); ISO
//! `YYYY-MM-DD` is also accepted because it is unambiguous. Anything else is
//! unparseable and reads as `None`, never an error.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::model::Value;

const DATE_FORMATS: &[&str] = &[
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d-%B-%Y",
    "%d %B %Y",
    "%d-%m-%y",
    "%d/%m/%y",
    "%d.%m.%y",
    "%d-%b-%y",
    "%d %b %y",
];

/// `%Y` also accepts one- and two-digit years; anything below this is left to the `%y` formats.
const MIN_FOUR_DIGIT_YEAR: i32 = 100;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d-%m-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M",
];

/// Spreadsheet serial day 0 (1899-12-30, absorbing the 1900 leap-year bug).
fn excel_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

/// Spreadsheet serial (1900 system) for a calendar date.
pub fn date_to_excel_serial(date: NaiveDate) -> Option<f64> {
    let days = date.signed_duration_since(excel_epoch()?).num_days();
    (days >= 1).then_some(days as f64)
}

/// Parse a text date, day-first.
pub fn parse_day_first(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .chain(
            DATETIME_FORMATS
                .iter()
                .filter_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date()),
        )
        .find(|d| d.year() >= MIN_FOUR_DIGIT_YEAR)
}

/// Calendar date held by a cell, if any. Numeric cells are not treated as
/// serials here: a spreadsheet loader already turns real date cells into `Value::Date`.
pub fn cell_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Text(s) => parse_day_first(s),
        _ => None,
    }
}
