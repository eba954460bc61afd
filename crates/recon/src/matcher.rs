//! Brokerage matching: find the schedule record valid for a broker, subfund and
//! transaction date.
//!
//! The concatenated schedule is indexed once by normalized (cons code, scheme
//! code). Each bucket keeps rows in file order, so "first surviving candidate"
//! is the first row of the bucket that passes the date filter.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::columns::{self, Field};
use crate::dates::cell_date;
use crate::model::{SideStatistics, Table, Value};

/// Which scheme of the switch a lookup is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    In,
    Out,
}

/// Resolved schedule column positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleColumns {
    pub cons_code: usize,
    pub scheme_code: usize,
    pub period_from: Option<usize>,
    pub period_to: Option<usize>,
    /// Trail rate column for years 1..=5.
    pub trail: [Option<usize>; 5],
}

impl ScheduleColumns {
    /// Resolve against schedule headers. `Err` carries the labels of the key
    /// columns that did not resolve.
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Result<Self, Vec<String>> {
        let cons = columns::resolve(headers, Field::ConsCode);
        let scheme = columns::resolve(headers, Field::SchemeCodeSchedule);
        let (Some(cons_code), Some(scheme_code)) = (cons, scheme) else {
            let mut missing = Vec::new();
            if cons.is_none() {
                missing.push(Field::ConsCode.label());
            }
            if scheme.is_none() {
                missing.push(Field::SchemeCodeSchedule.label());
            }
            return Err(missing);
        };
        let mut trail = [None; 5];
        for (i, slot) in trail.iter_mut().enumerate() {
            *slot = columns::resolve(headers, Field::TrailRateYear(i as u8 + 1));
        }
        Ok(Self {
            cons_code,
            scheme_code,
            period_from: columns::resolve(headers, Field::InvestmentPeriodFrom),
            period_to: columns::resolve(headers, Field::InvestmentPeriodTo),
            trail,
        })
    }

    /// Date filtering needs both bounds.
    pub fn has_period(&self) -> bool {
        self.period_from.is_some() && self.period_to.is_some()
    }

    /// Optional columns that did not resolve (trail years, period bounds).
    pub fn missing_optional(&self) -> Vec<String> {
        let mut missing = Vec::new();
        for (i, col) in self.trail.iter().enumerate() {
            if col.is_none() {
                missing.push(Field::TrailRateYear(i as u8 + 1).label());
            }
        }
        if self.period_from.is_none() {
            missing.push(Field::InvestmentPeriodFrom.label());
        }
        if self.period_to.is_none() {
            missing.push(Field::InvestmentPeriodTo.label());
        }
        missing
    }
}

/// Parsed validity window of one schedule row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

impl Window {
    /// Inclusive on both ends. An unparseable bound disables filtering for this row.
    fn admits(&self, date: NaiveDate) -> bool {
        match (self.from, self.to) {
            (Some(from), Some(to)) => from <= date && date <= to,
            _ => true,
        }
    }
}

/// Why a lookup did or did not produce a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Row index into the schedule table.
    Matched(usize),
    /// Broker or subfund blank / not found.
    MissingKey,
    NoCandidate,
    /// Candidates existed but none covered the transaction date.
    OutsidePeriod,
}

impl MatchOutcome {
    pub fn row(&self) -> Option<usize> {
        match self {
            Self::Matched(row) => Some(*row),
            _ => None,
        }
    }
}

impl SideStatistics {
    pub fn record(&mut self, outcome: MatchOutcome) {
        match outcome {
            MatchOutcome::Matched(_) => self.matched += 1,
            MatchOutcome::MissingKey => self.missing_key += 1,
            MatchOutcome::NoCandidate => self.no_candidate += 1,
            MatchOutcome::OutsidePeriod => self.outside_period += 1,
        }
    }
}

/// Values read from a matched record for one side.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedValues {
    pub trail: [Value; 5],
    /// Only read for [`Side::In`]; `NotFound` otherwise.
    pub period_from: Value,
    pub period_to: Value,
}

impl MatchedValues {
    pub fn not_found() -> Self {
        Self {
            trail: std::array::from_fn(|_| Value::NotFound),
            period_from: Value::NotFound,
            period_to: Value::NotFound,
        }
    }
}

/// The concatenated schedule, indexed for lookups.
#[derive(Debug, Clone)]
pub struct ScheduleIndex<'a> {
    table: &'a Table,
    columns: ScheduleColumns,
    windows: Vec<Window>,
    buckets: HashMap<(String, String), Vec<usize>>,
    dropped: usize,
}

impl<'a> ScheduleIndex<'a> {
    /// Index every row with a non-blank cons code and scheme code.
    pub fn build(table: &'a Table, columns: ScheduleColumns) -> Self {
        let mut buckets: HashMap<(String, String), Vec<usize>> = HashMap::new();
        let mut windows = Vec::with_capacity(table.len());
        let mut dropped = 0;
        for row in 0..table.len() {
            windows.push(Window {
                from: columns.period_from.and_then(|c| cell_date(table.cell(row, c))),
                to: columns.period_to.and_then(|c| cell_date(table.cell(row, c))),
            });
            let cons = table.cell(row, columns.cons_code).as_key();
            let scheme = table.cell(row, columns.scheme_code).as_key();
            match (cons, scheme) {
                (Some(cons), Some(scheme)) => buckets.entry((cons, scheme)).or_default().push(row),
                _ => dropped += 1,
            }
        }
        Self {
            table,
            columns,
            windows,
            buckets,
            dropped,
        }
    }

    pub fn columns(&self) -> &ScheduleColumns {
        &self.columns
    }

    /// Rows left out of the index for a blank key.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// First record, in file order, keyed by (broker, subfund) whose window
    /// admits `date`. Without a date or without both period columns, the first
    /// keyed record wins.
    pub fn lookup(&self, broker: Option<&str>, subfund: Option<&str>, date: Option<NaiveDate>) -> MatchOutcome {
        let broker = broker.map(normalize).filter(|b| !b.is_empty());
        let subfund = subfund.map(normalize).filter(|s| !s.is_empty());
        let (Some(broker), Some(subfund)) = (broker, subfund) else {
            return MatchOutcome::MissingKey;
        };
        let Some(candidates) = self.buckets.get(&(broker, subfund)) else {
            return MatchOutcome::NoCandidate;
        };
        let date = date.filter(|_| self.columns.has_period());
        let chosen = match date {
            Some(date) => candidates.iter().copied().find(|&row| self.windows[row].admits(date)),
            None => candidates.first().copied(),
        };
        match chosen {
            Some(row) => MatchOutcome::Matched(row),
            None => MatchOutcome::OutsidePeriod,
        }
    }

    /// Read the values a side needs from a matched row.
    pub fn values(&self, row: usize, side: Side) -> MatchedValues {
        let trail = std::array::from_fn(|i| self.read(row, self.columns.trail[i]));
        let (period_from, period_to) = match side {
            Side::In => (
                self.read(row, self.columns.period_from),
                self.read(row, self.columns.period_to),
            ),
            Side::Out => (Value::NotFound, Value::NotFound),
        };
        MatchedValues {
            trail,
            period_from,
            period_to,
        }
    }

    /// Lookup plus read-out; unmatched lookups read as all `NotFound`.
    pub fn resolve(
        &self,
        side: Side,
        broker: Option<&str>,
        subfund: Option<&str>,
        date: Option<NaiveDate>,
    ) -> (MatchOutcome, MatchedValues) {
        let outcome = self.lookup(broker, subfund, date);
        let values = match outcome.row() {
            Some(row) => self.values(row, side),
            None => MatchedValues::not_found(),
        };
        (outcome, values)
    }

    fn read(&self, row: usize, col: Option<usize>) -> Value {
        match col {
            Some(col) => {
                let v = self.table.cell(row, col);
                if v.is_blank() {
                    Value::NotFound
                } else {
                    v.clone()
                }
            }
            None => Value::NotFound,
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEDULE: &str = "\
Cons Code,Scheme Code,Investment Period From,Investment Period To,Trail Rate 1 Year,Trail Rate 2 Year
BRK1,SF1,01-01-2023,31-12-2023,0.5,0.4
BRK1,SF2,01-01-2023,31-12-2023,1.0,
BRK1,SF2,01-01-2024,31-12-2024,1.2,0.9
 brk2 , sf3 ,not a date,31-12-2023,0.7,0.6
,SF1,01-01-2023,31-12-2023,9,9
";

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn schedule() -> Table {
        Table::from_csv("brokerage.csv", SCHEDULE).unwrap()
    }

    fn index(table: &Table) -> ScheduleIndex<'_> {
        let cols = ScheduleColumns::resolve(&table.headers).unwrap();
        ScheduleIndex::build(table, cols)
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let t = schedule();
        let idx = index(&t);
        assert_eq!(idx.lookup(Some("BRK1"), Some("SF1"), Some(ymd(2023, 1, 1))), MatchOutcome::Matched(0));
        assert_eq!(idx.lookup(Some("BRK1"), Some("SF1"), Some(ymd(2023, 12, 31))), MatchOutcome::Matched(0));
        assert_eq!(idx.lookup(Some("BRK1"), Some("SF1"), Some(ymd(2024, 1, 1))), MatchOutcome::OutsidePeriod);
    }

    #[test]
    fn two_digit_year_bounds_match() {
        let t = Table::from_csv(
            "b.csv",
            "Cons Code,Scheme Code,Investment Period From,Investment Period To,Trail Rate 1 Year\n\
             BRK1,SF1,01-01-23,31-12-23,0.5\n",
        )
        .unwrap();
        let idx = index(&t);
        assert_eq!(idx.lookup(Some("BRK1"), Some("SF1"), Some(ymd(2023, 6, 15))), MatchOutcome::Matched(0));
        assert_eq!(idx.lookup(Some("BRK1"), Some("SF1"), Some(ymd(2024, 1, 1))), MatchOutcome::OutsidePeriod);
    }

    #[test]
    fn date_selects_among_candidates() {
        let t = schedule();
        let idx = index(&t);
        assert_eq!(idx.lookup(Some("brk1"), Some("sf2"), Some(ymd(2024, 3, 1))), MatchOutcome::Matched(2));
        assert_eq!(idx.lookup(Some("BRK1"), Some("SF2"), None), MatchOutcome::Matched(1));
    }

    #[test]
    fn unparseable_bound_keeps_candidate() {
        let t = schedule();
        let idx = index(&t);
        assert_eq!(idx.lookup(Some("BRK2"), Some("SF3"), Some(ymd(2030, 1, 1))), MatchOutcome::Matched(3));
    }

    #[test]
    fn missing_keys_and_blank_schedule_keys() {
        let t = schedule();
        let idx = index(&t);
        assert_eq!(idx.dropped(), 1);
        assert_eq!(idx.lookup(None, Some("SF1"), None), MatchOutcome::MissingKey);
        assert_eq!(idx.lookup(Some("  "), Some("SF1"), None), MatchOutcome::MissingKey);
        assert_eq!(idx.lookup(Some("BRK1"), Some(""), None), MatchOutcome::MissingKey);
        assert_eq!(idx.lookup(Some("BRK9"), Some("SF1"), None), MatchOutcome::NoCandidate);
    }

    #[test]
    fn values_by_side() {
        let t = schedule();
        let idx = index(&t);
        let (outcome, inv) = idx.resolve(Side::In, Some("BRK1"), Some("SF2"), Some(ymd(2023, 6, 1)));
        assert_eq!(outcome, MatchOutcome::Matched(1));
        assert_eq!(inv.trail[0], Value::text("1.0"));
        assert_eq!(inv.trail[1], Value::NotFound);
        assert_eq!(inv.trail[2], Value::NotFound);
        assert_eq!(inv.period_from, Value::text("01-01-2023"));

        let (_, outv) = idx.resolve(Side::Out, Some("BRK1"), Some("SF1"), Some(ymd(2023, 6, 1)));
        assert_eq!(outv.trail[0], Value::text("0.5"));
        assert_eq!(outv.period_from, Value::NotFound);

        let (outcome, none) = idx.resolve(Side::In, Some("BRK1"), None, None);
        assert_eq!(outcome, MatchOutcome::MissingKey);
        assert_eq!(none, MatchedValues::not_found());
    }

    #[test]
    fn no_date_filter_without_both_period_columns() {
        let t = Table::from_csv(
            "b.csv",
            "Cons Code,Scheme Code,Investment Period From,Trail Rate 1 Year\nBRK1,SF1,01-01-2020,0.5\n",
        )
        .unwrap();
        let idx = index(&t);
        assert!(!idx.columns().has_period());
        assert_eq!(idx.lookup(Some("BRK1"), Some("SF1"), Some(ymd(2010, 1, 1))), MatchOutcome::Matched(0));
        let v = idx.values(0, Side::In);
        assert_eq!(v.period_from, Value::text("01-01-2020"));
        assert_eq!(v.period_to, Value::NotFound);
    }

    #[test]
    fn key_columns_reported_when_missing() {
        let missing = ScheduleColumns::resolve(&["Broker", "Rate"]).unwrap_err();
        assert_eq!(missing, vec!["Cons Code", "Scheme Code"]);
    }

    #[test]
    fn statistics_tally_outcomes() {
        let mut s = SideStatistics::default();
        s.record(MatchOutcome::Matched(0));
        s.record(MatchOutcome::NoCandidate);
        s.record(MatchOutcome::OutsidePeriod);
        s.record(MatchOutcome::MissingKey);
        assert_eq!(s.matched, 1);
        assert_eq!(s.unmatched(), 3);
        assert_eq!(s.total(), 4);
    }
}
