//! `switchrecon columns`: header resolution report for one file.

use std::path::PathBuf;

use serde_json::json;
use switchrecon::columns::{resolve_all, Resolution, REFERENCE_FIELDS, REGISTER_FIELDS, SCHEDULE_FIELDS};
use switchrecon::Table;
use switchrecon_io::col_to_letter;

use crate::CliError;

const GROUPS: &[(&str, &[switchrecon::columns::Field])] = &[
    ("register", REGISTER_FIELDS),
    ("reference", REFERENCE_FIELDS),
    ("schedule", SCHEDULE_FIELDS),
];

fn resolve_groups(table: &Table) -> Vec<(&'static str, Vec<Resolution>)> {
    GROUPS
        .iter()
        .map(|(group, fields)| (*group, resolve_all(table.headers.as_slice(), fields)))
        .collect()
}

pub fn cmd_columns(file: PathBuf, sheet: Option<String>, json_output: bool) -> Result<(), CliError> {
    let table = switchrecon_io::load_table(&file, sheet.as_deref()).map_err(CliError::io)?;
    let groups = resolve_groups(&table);
    let duplicates = table.duplicate_headers();

    if json_output {
        let mut by_group = serde_json::Map::new();
        for (group, resolutions) in &groups {
            by_group.insert(group.to_string(), json!(resolutions));
        }
        let out = json!({
            "file": table.name,
            "headers": table.headers,
            "duplicates": duplicates,
            "fields": by_group,
        });
        let json_str = serde_json::to_string_pretty(&out)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    println!("{} ({} column(s), {} row(s))", table.name, table.width(), table.len());
    for (group, resolutions) in &groups {
        println!();
        println!("{group} fields:");
        for r in resolutions {
            match (&r.column, r.index) {
                (Some(column), Some(index)) => {
                    println!("  {:<34} {} (column {})", r.label, column, col_to_letter(index))
                }
                _ => println!("  {:<34} -", r.label),
            }
        }
    }
    if !duplicates.is_empty() {
        eprintln!("warning: duplicate column names: {}", duplicates.join(", "));
    }
    Ok(())
}
