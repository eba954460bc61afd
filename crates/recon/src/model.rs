use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{ReconError, Result};

/// Text written for a derived cell whose lookup or match failed.
pub const NOT_FOUND_TEXT: &str = "Not Found";

/// Date rendering used for text output (day-first, matching the input convention).
pub const DATE_DISPLAY_FORMAT: &str = "%d-%m-%Y";

// ---------------------------------------------------------------------------
// Cell values
// ---------------------------------------------------------------------------

/// A single cell. `NotFound` is only ever produced by the engine for derived
/// columns; loaders never emit it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    NotFound,
}

static EMPTY: Value = Value::Empty;

impl Value {
    /// Build a cell from a raw text field. Whitespace-only fields load as `Empty`.
    pub fn from_field(field: &str) -> Self {
        if field.trim().is_empty() {
            Value::Empty
        } else {
            Value::Text(field.to_string())
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// True for `Empty` and whitespace-only text. `NotFound` is not blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Stringified content, or `None` for `Empty` and `NotFound`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Empty | Value::NotFound => None,
            Value::Text(s) => Some(s.clone()),
            Value::Number(n) => Some(format_number(*n)),
            Value::Date(d) => Some(d.format(DATE_DISPLAY_FORMAT).to_string()),
        }
    }

    /// Trimmed, non-empty text content.
    pub fn as_trimmed(&self) -> Option<String> {
        self.as_text()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Trimmed, upper-cased, non-empty text content (the key form used for matching).
    pub fn as_key(&self) -> Option<String> {
        self.as_trimmed().map(|s| s.to_uppercase())
    }

    /// Materialize an optional lookup result: `None` becomes `NotFound`.
    pub fn or_not_found(value: Option<Value>) -> Value {
        value.unwrap_or(Value::NotFound)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::NotFound => f.write_str(NOT_FOUND_TEXT),
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Date(d) => write!(f, "{}", d.format(DATE_DISPLAY_FORMAT)),
        }
    }
}

/// Integers without decimals, everything else in shortest round-trip form.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// An in-memory dataset: one header row plus data rows, all the same width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Label used in warnings and errors (usually the source file name).
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding with `Empty` or truncating to the header width.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.headers.len(), Value::Empty);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// Cell at (row, col); out-of-range positions read as `Empty`.
    pub fn cell(&self, row: usize, col: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Parse delimited text. The first record is the header row; fully blank
    /// records are skipped; short records are padded.
    pub fn from_delimited(name: impl Into<String>, data: &str, delimiter: u8) -> Result<Self> {
        let name = name.into();
        let data = data.strip_prefix('\u{feff}').unwrap_or(data);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(data.as_bytes());

        let mut records = reader.records();
        let headers: Vec<String> = match records.next() {
            Some(record) => record
                .map_err(|e| ReconError::Parse {
                    dataset: name.clone(),
                    message: e.to_string(),
                })?
                .iter()
                .map(|h| h.to_string())
                .collect(),
            None => Vec::new(),
        };

        let mut table = Table::new(name, headers);
        for record in records {
            let record = record.map_err(|e| ReconError::Parse {
                dataset: table.name.clone(),
                message: e.to_string(),
            })?;
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            table.push_row(record.iter().map(Value::from_field).collect());
        }
        Ok(table)
    }

    pub fn from_csv(name: impl Into<String>, data: &str) -> Result<Self> {
        Self::from_delimited(name, data, b',')
    }

    /// Header names occurring more than once (exact, case- and whitespace-sensitive),
    /// each reported once in first-seen order.
    pub fn duplicate_headers(&self) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for h in &self.headers {
            *counts.entry(h.as_str()).or_default() += 1;
        }
        let mut dupes: Vec<String> = Vec::new();
        for h in &self.headers {
            if counts[h.as_str()] > 1 && !dupes.iter().any(|d| d == h) {
                dupes.push(h.clone());
            }
        }
        dupes
    }

    pub fn ensure_unique_headers(&self) -> Result<()> {
        let names = self.duplicate_headers();
        if names.is_empty() {
            Ok(())
        } else {
            Err(ReconError::DuplicateHeaders {
                dataset: self.name.clone(),
                names,
            })
        }
    }

    /// Stack tables vertically. Columns are unioned by exact header name in
    /// first-seen order; cells a source table lacks are `Empty`. Row order is
    /// table order, then row order within each table.
    pub fn concat(name: impl Into<String>, tables: &[Table]) -> Table {
        let mut headers: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for table in tables {
            for h in &table.headers {
                if !index.contains_key(h) {
                    index.insert(h.clone(), headers.len());
                    headers.push(h.clone());
                }
            }
        }

        let mut out = Table::new(name, headers);
        for table in tables {
            let positions: Vec<usize> = table.headers.iter().map(|h| index[h]).collect();
            for row in &table.rows {
                let mut merged = vec![Value::Empty; out.width()];
                for (src, &dst) in positions.iter().enumerate() {
                    if let Some(v) = row.get(src) {
                        merged[dst] = v.clone();
                    }
                }
                out.rows.push(merged);
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Engine input / output
// ---------------------------------------------------------------------------

/// The three loaded datasets a run reconciles.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub register: Table,
    pub reference: Table,
    /// Brokerage schedules in the order they were supplied.
    pub schedules: Vec<Table>,
}

/// What a column of the enriched table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// A register column carried through (possibly renamed).
    Source,
    OutSchemeCode,
    OutSubfundCode,
    OutAssetClass,
    InSchemeCode,
    InSubfundCode,
    InAssetClass,
    InTrailRate(u8),
    OutTrailRate(u8),
    Check(u8),
    PeriodFrom,
    PeriodTo,
    RegularVsDirect,
}

impl ColumnKind {
    /// Header text for generated columns; `None` for `Source`.
    pub fn header(&self) -> Option<String> {
        let name = match self {
            Self::Source => return None,
            Self::OutSchemeCode => "out Scheme Code".to_string(),
            Self::OutSubfundCode => "out subfund code".to_string(),
            Self::OutAssetClass => "out ASSET_CLASS".to_string(),
            Self::InSchemeCode => "IN Scheme Code".to_string(),
            Self::InSubfundCode => "IN subfund code".to_string(),
            Self::InAssetClass => "IN ASSET_CLASS".to_string(),
            Self::InTrailRate(y) => format!("switch in Trail Rate {y} year"),
            Self::OutTrailRate(y) => format!("switch out Trail Rate {y} year"),
            Self::Check(y) => format!("Check {y} year"),
            Self::PeriodFrom => "Investment Period From".to_string(),
            Self::PeriodTo => "Investment Period To".to_string(),
            Self::RegularVsDirect => "Regular vs Direct Check".to_string(),
        };
        Some(name)
    }

    /// Member of the per-year trail-rate / check block.
    pub fn is_rate_block(&self) -> bool {
        matches!(self, Self::InTrailRate(_) | Self::OutTrailRate(_) | Self::Check(_))
    }
}

/// The reconciled table plus the kind of every column, index-aligned with
/// `table.headers`.
#[derive(Debug, Clone, Default)]
pub struct EnrichedTable {
    pub table: Table,
    pub kinds: Vec<ColumnKind>,
}

impl EnrichedTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: Table::new(name, Vec::new()),
            kinds: Vec::new(),
        }
    }

    /// Append a column with one value per existing row.
    pub fn push_column(&mut self, name: impl Into<String>, kind: ColumnKind, values: Vec<Value>) {
        if self.table.rows.is_empty() && self.table.headers.is_empty() {
            self.table.rows = values.iter().map(|_| Vec::new()).collect();
        }
        debug_assert_eq!(values.len(), self.table.rows.len());
        self.table.headers.push(name.into());
        self.kinds.push(kind);
        for (row, v) in self.table.rows.iter_mut().zip(values) {
            row.push(v);
        }
    }

    /// Append a generated column under its standard header.
    pub fn push_generated(&mut self, kind: ColumnKind, values: Vec<Value>) {
        let name = kind.header().unwrap_or_default();
        self.push_column(name, kind, values);
    }

    /// Index of the first column of the given kind.
    pub fn position(&self, kind: ColumnKind) -> Option<usize> {
        self.kinds.iter().position(|k| *k == kind)
    }

    /// Value of the first column of `kind` in `row`.
    pub fn get(&self, row: usize, kind: ColumnKind) -> Option<&Value> {
        self.position(kind).map(|col| self.table.cell(row, col))
    }

    pub fn headers(&self) -> &[String] {
        &self.table.headers
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// A non-fatal condition recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Semantic columns that could not be resolved, and what was skipped as a result.
    MissingColumns {
        dataset: String,
        columns: Vec<String>,
        consequence: String,
    },
    /// Rows dropped because the broker is DIRECT.
    DirectRowsRemoved { removed: usize, remaining: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingColumns {
                dataset,
                columns,
                consequence,
            } => write!(
                f,
                "columns not found in {dataset}: {}; {consequence}",
                columns.join(", ")
            ),
            Self::DirectRowsRemoved { removed, remaining } => write!(
                f,
                "removed {removed} row(s) where broker is 'DIRECT'; remaining rows: {remaining}"
            ),
        }
    }
}

/// Match tallies for one side of the switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SideStatistics {
    pub matched: usize,
    /// Broker or subfund blank / not found, so no lookup was attempted.
    pub missing_key: usize,
    /// No schedule record for the (broker, subfund) pair.
    pub no_candidate: usize,
    /// Candidates existed but none covered the transaction date.
    pub outside_period: usize,
}

impl SideStatistics {
    pub fn unmatched(&self) -> usize {
        self.missing_key + self.no_candidate + self.outside_period
    }

    pub fn total(&self) -> usize {
        self.matched + self.unmatched()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchStatistics {
    pub switch_in: SideStatistics,
    pub switch_out: SideStatistics,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub engine_version: String,
    pub register_rows: usize,
    pub schedule_rows: usize,
    pub output_rows: usize,
    pub removed_direct: usize,
    pub warnings: Vec<Warning>,
    /// Informational messages that are expected in some datasets.
    pub notes: Vec<String>,
    pub statistics: MatchStatistics,
}

/// Result of a reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconOutput {
    pub table: EnrichedTable,
    pub report: RunReport,
}

/// Stage boundaries a host can observe to report progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Load,
    Resolve,
    Map,
    Match,
    Flag,
    Filter,
    Layout,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Resolve => write!(f, "resolve"),
            Self::Map => write!(f, "map"),
            Self::Match => write!(f, "match"),
            Self::Flag => write!(f, "flag"),
            Self::Filter => write!(f, "filter"),
            Self::Layout => write!(f, "layout"),
            Self::Write => write!(f, "write"),
        }
    }
}
