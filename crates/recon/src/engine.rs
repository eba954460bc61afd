use crate::codes::extract_scheme_code;
use crate::columns::{self, Field, TRAIL_YEARS};
use crate::compare::{compare_rates, Flag};
use crate::dates::cell_date;
use crate::error::Result;
use crate::filter::remove_direct;
use crate::layout::organize;
use crate::matcher::{MatchedValues, ScheduleColumns, ScheduleIndex, Side};
use crate::model::{
    ColumnKind, EnrichedTable, MatchStatistics, ReconInput, ReconOutput, RunReport, Stage, Table,
    Value, Warning,
};
use crate::plan::check_plan;
use crate::reference::SchemeMap;

/// Header given to the register's `From` column in the output.
pub const SWITCH_OUT_SCHEME: &str = "switch out scheme";
/// Header given to the register's `Scheme :` column in the output.
pub const SWITCH_IN_SCHEME: &str = "switch in scheme";

/// Label of the concatenated schedule table.
pub const SCHEDULES_LABEL: &str = "brokerage schedules";

/// Run reconciliation. Returns the enriched table and a report of warnings,
/// notes and match statistics.
pub fn run(input: &ReconInput) -> Result<ReconOutput> {
    run_with_progress(input, &mut |_| {})
}

/// [`run`], reporting each stage to `on_stage` as it starts.
pub fn run_with_progress(input: &ReconInput, on_stage: &mut dyn FnMut(Stage)) -> Result<ReconOutput> {
    input.register.ensure_unique_headers()?;
    input.reference.ensure_unique_headers()?;
    for schedule in &input.schedules {
        schedule.ensure_unique_headers()?;
    }

    let register = &input.register;
    let schedule = Table::concat(SCHEDULES_LABEL, &input.schedules);
    let mut report = RunReport {
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        register_rows: register.len(),
        schedule_rows: schedule.len(),
        ..RunReport::default()
    };

    // -- Resolve ------------------------------------------------------------
    on_stage(Stage::Resolve);
    let cols = RegisterColumns::resolve(register);
    let mut missing_scheme = Vec::new();
    if cols.from.is_none() {
        missing_scheme.push(Field::From.label());
    }
    if cols.scheme.is_none() {
        missing_scheme.push(Field::SchemeOut.label());
    }
    if !missing_scheme.is_empty() {
        report.warnings.push(Warning::MissingColumns {
            dataset: register.name.clone(),
            columns: missing_scheme,
            consequence: "scheme codes are blank and dependent lookups are Not Found".into(),
        });
    }

    // -- Map ----------------------------------------------------------------
    on_stage(Stage::Map);
    let out_codes = extract_codes(register, cols.from);
    let in_codes = extract_codes(register, cols.scheme);

    let scheme_map = match SchemeMap::from_table(&input.reference) {
        Ok(map) => {
            log::debug!("scheme map: {} code(s) from {}", map.len(), input.reference.name);
            if columns::resolve(&input.reference.headers, Field::AssetClass).is_none() {
                report.notes.push(format!(
                    "{} has no asset-class column; asset classes are Not Found",
                    input.reference.name
                ));
            }
            Some(map)
        }
        Err(missing) => {
            report.warnings.push(Warning::MissingColumns {
                dataset: input.reference.name.clone(),
                columns: missing,
                consequence: "subfund codes and asset classes are Not Found".into(),
            });
            None
        }
    };

    let map = scheme_map.as_ref();
    let out_subfunds = lookup(map, &out_codes, |m, c| m.resolve(c));
    let in_subfunds = lookup(map, &in_codes, |m, c| m.resolve(c));
    let out_assets = lookup(map, &out_codes, |m, c| m.asset_class(c));
    let in_assets = lookup(map, &in_codes, |m, c| m.asset_class(c));

    // -- Match --------------------------------------------------------------
    on_stage(Stage::Match);
    let schedule_cols = ScheduleColumns::resolve(&schedule.headers);
    let mut missing_match: Vec<String> = Vec::new();
    let mut missing_in: Vec<&str> = Vec::new();
    if let Err(missing) = &schedule_cols {
        missing_match.extend(missing.iter().cloned());
        missing_in.push(SCHEDULES_LABEL);
    }
    if cols.broker.is_none() {
        missing_match.push(Field::Broker.label());
        missing_in.push(&register.name);
    }

    let mut statistics = MatchStatistics::default();
    let (in_values, out_values): (Vec<MatchedValues>, Vec<MatchedValues>) = match (schedule_cols, cols.broker) {
        (Ok(schedule_cols), Some(broker_col)) => {
            let optional = schedule_cols.missing_optional();
            if !optional.is_empty() {
                report.notes.push(format!(
                    "{SCHEDULES_LABEL} lack columns {}; those values are Not Found",
                    optional.join(", ")
                ));
            }
            let index = ScheduleIndex::build(&schedule, schedule_cols);
            if index.dropped() > 0 {
                report.notes.push(format!(
                    "{} schedule row(s) with a blank Cons Code or Scheme Code were ignored",
                    index.dropped()
                ));
            }

            let mut in_values = Vec::with_capacity(register.len());
            let mut out_values = Vec::with_capacity(register.len());
            for row in 0..register.len() {
                let broker = register.cell(row, broker_col).as_trimmed();
                let date = cols.date.and_then(|c| cell_date(register.cell(row, c)));

                let (outcome, values) =
                    index.resolve(Side::In, broker.as_deref(), in_subfunds[row].as_deref(), date);
                statistics.switch_in.record(outcome);
                in_values.push(values);

                let (outcome, values) =
                    index.resolve(Side::Out, broker.as_deref(), out_subfunds[row].as_deref(), date);
                statistics.switch_out.record(outcome);
                out_values.push(values);
            }
            (in_values, out_values)
        }
        _ => {
            report.warnings.push(Warning::MissingColumns {
                dataset: missing_in.join(" and "),
                columns: missing_match,
                consequence: "brokerage matching skipped; trail rates and periods are Not Found".into(),
            });
            let none = || -> Vec<MatchedValues> {
                (0..register.len()).map(|_| MatchedValues::not_found()).collect()
            };
            (none(), none())
        }
    };
    log::info!(
        "switch in: {} matched, {} unmatched; switch out: {} matched, {} unmatched",
        statistics.switch_in.matched,
        statistics.switch_in.unmatched(),
        statistics.switch_out.matched,
        statistics.switch_out.unmatched(),
    );
    report.statistics = statistics;

    // -- Flag ---------------------------------------------------------------
    on_stage(Stage::Flag);
    let checks: Vec<[Flag; 5]> = in_values
        .iter()
        .zip(&out_values)
        .map(|(inv, outv)| std::array::from_fn(|i| compare_rates(&inv.trail[i], &outv.trail[i])))
        .collect();
    let plan_flags: Vec<Flag> = match (cols.scheme, cols.from) {
        (Some(scheme), Some(from)) => (0..register.len())
            .map(|row| check_plan(register.cell(row, scheme), register.cell(row, from)))
            .collect(),
        _ => vec![Flag::Blank; register.len()],
    };

    // -- Assemble -----------------------------------------------------------
    let mut table = EnrichedTable::new(register.name.clone());
    table.push_generated(ColumnKind::OutSchemeCode, code_values(&out_codes));
    table.push_generated(ColumnKind::OutSubfundCode, lookup_values(&out_subfunds));
    table.push_generated(ColumnKind::OutAssetClass, lookup_values(&out_assets));
    table.push_generated(ColumnKind::InSchemeCode, code_values(&in_codes));
    table.push_generated(ColumnKind::InSubfundCode, lookup_values(&in_subfunds));
    table.push_generated(ColumnKind::InAssetClass, lookup_values(&in_assets));

    let mut broker_pos = None;
    for (col, header) in register.headers.iter().enumerate() {
        let name = if Some(col) == cols.from {
            SWITCH_OUT_SCHEME.to_string()
        } else if Some(col) == cols.scheme {
            SWITCH_IN_SCHEME.to_string()
        } else {
            header.clone()
        };
        if Some(col) == cols.broker {
            broker_pos = Some(table.headers().len());
        }
        let values = (0..register.len()).map(|row| register.cell(row, col).clone()).collect();
        table.push_column(name, ColumnKind::Source, values);
    }

    for year in TRAIL_YEARS {
        let i = usize::from(year - 1);
        table.push_generated(
            ColumnKind::InTrailRate(year),
            in_values.iter().map(|v| v.trail[i].clone()).collect(),
        );
    }
    table.push_generated(
        ColumnKind::PeriodFrom,
        in_values.iter().map(|v| v.period_from.clone()).collect(),
    );
    table.push_generated(
        ColumnKind::PeriodTo,
        in_values.iter().map(|v| v.period_to.clone()).collect(),
    );
    for year in TRAIL_YEARS {
        let i = usize::from(year - 1);
        table.push_generated(
            ColumnKind::OutTrailRate(year),
            out_values.iter().map(|v| v.trail[i].clone()).collect(),
        );
    }
    for year in TRAIL_YEARS {
        let i = usize::from(year - 1);
        table.push_generated(
            ColumnKind::Check(year),
            checks.iter().map(|c| c[i].to_value()).collect(),
        );
    }
    table.push_generated(
        ColumnKind::RegularVsDirect,
        plan_flags.iter().map(|f| f.to_value()).collect(),
    );

    // -- Filter -------------------------------------------------------------
    on_stage(Stage::Filter);
    match broker_pos {
        Some(pos) => {
            let removed = remove_direct(&mut table.table, pos);
            report.removed_direct = removed;
            if removed > 0 {
                log::info!("removed {removed} DIRECT row(s)");
                report.warnings.push(Warning::DirectRowsRemoved {
                    removed,
                    remaining: table.len(),
                });
            }
        }
        None => report
            .notes
            .push("no broker column; DIRECT rows were not filtered".into()),
    }

    // -- Layout -------------------------------------------------------------
    on_stage(Stage::Layout);
    organize(&mut table);

    report.output_rows = table.len();
    for warning in &report.warnings {
        log::warn!("{warning}");
    }
    Ok(ReconOutput { table, report })
}

/// Register column positions for the fields the engine reads.
#[derive(Debug, Clone, Copy, Default)]
struct RegisterColumns {
    from: Option<usize>,
    scheme: Option<usize>,
    broker: Option<usize>,
    date: Option<usize>,
}

impl RegisterColumns {
    fn resolve(register: &Table) -> Self {
        let find = |field: Field| {
            let idx = columns::resolve(&register.headers, field);
            log::debug!(
                "{}: {} -> {}",
                register.name,
                field.label(),
                idx.map_or("(none)", |i| register.headers[i].as_str())
            );
            idx
        };
        Self {
            from: find(Field::From),
            scheme: find(Field::SchemeOut),
            broker: find(Field::Broker),
            date: find(Field::TransactionDate),
        }
    }
}

fn lookup<'m>(
    map: Option<&'m SchemeMap>,
    codes: &[Option<String>],
    get: impl Fn(&'m SchemeMap, &str) -> Option<&'m str>,
) -> Vec<Option<String>> {
    codes
        .iter()
        .map(|code| match (map, code) {
            (Some(map), Some(code)) => get(map, code).map(str::to_string),
            _ => None,
        })
        .collect()
}

fn extract_codes(register: &Table, col: Option<usize>) -> Vec<Option<String>> {
    (0..register.len())
        .map(|row| col.and_then(|c| extract_scheme_code(register.cell(row, c))))
        .collect()
}

/// Extracted codes: text when present, blank otherwise.
fn code_values(codes: &[Option<String>]) -> Vec<Value> {
    codes
        .iter()
        .map(|c| c.as_ref().map_or(Value::Empty, |c| Value::text(c.as_str())))
        .collect()
}

/// Lookup results: text when found, `NotFound` otherwise.
fn lookup_values(found: &[Option<String>]) -> Vec<Value> {
    found
        .iter()
        .map(|v| Value::or_not_found(v.as_ref().map(|s| Value::text(s.as_str()))))
        .collect()
}
