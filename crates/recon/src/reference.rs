//! Scheme code -> (subfund, asset class) lookups built from the reference master.

use std::collections::HashMap;

use crate::columns::{self, Field};
use crate::model::{Table, Value};

/// Attributes the master records for one scheme code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeAttributes {
    pub subfund_code: String,
    /// `None` when the master has no asset-class column.
    pub asset_class: Option<String>,
}

/// Lookup keyed by trimmed scheme code, case preserved.
#[derive(Debug, Clone, Default)]
pub struct SchemeMap {
    entries: HashMap<String, SchemeAttributes>,
}

impl SchemeMap {
    /// Build from resolved column positions. Rows are inserted in file order,
    /// so a scheme code listed twice keeps its last occurrence. Rows with a
    /// blank scheme code are skipped.
    pub fn build(table: &Table, code_col: usize, subfund_col: usize, asset_col: Option<usize>) -> Self {
        let mut entries = HashMap::new();
        for row in 0..table.len() {
            let Some(code) = table.cell(row, code_col).as_trimmed() else {
                continue;
            };
            let subfund_code = trimmed_or_empty(table.cell(row, subfund_col));
            let asset_class = asset_col.map(|col| trimmed_or_empty(table.cell(row, col)));
            entries.insert(
                code,
                SchemeAttributes {
                    subfund_code,
                    asset_class,
                },
            );
        }
        Self { entries }
    }

    /// Resolve the master's columns and build the map. `Err` carries the labels
    /// of the required columns that did not resolve.
    pub fn from_table(table: &Table) -> Result<Self, Vec<String>> {
        let code_col = columns::resolve(&table.headers, Field::SchemeCodeReference);
        let subfund_col = columns::resolve(&table.headers, Field::ParentSubfundCode);
        let asset_col = columns::resolve(&table.headers, Field::AssetClass);
        match (code_col, subfund_col) {
            (Some(code), Some(subfund)) => Ok(Self::build(table, code, subfund, asset_col)),
            _ => {
                let mut missing = Vec::new();
                if code_col.is_none() {
                    missing.push(Field::SchemeCodeReference.label());
                }
                if subfund_col.is_none() {
                    missing.push(Field::ParentSubfundCode.label());
                }
                Err(missing)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Subfund code for a scheme code; `None` is reported as not found.
    pub fn resolve(&self, code: &str) -> Option<&str> {
        self.entries
            .get(code.trim())
            .map(|a| a.subfund_code.as_str())
    }

    pub fn asset_class(&self, code: &str) -> Option<&str> {
        self.entries
            .get(code.trim())
            .and_then(|a| a.asset_class.as_deref())
    }
}

fn trimmed_or_empty(value: &Value) -> String {
    value.as_text().map(|s| s.trim().to_string()).unwrap_or_default()
}
