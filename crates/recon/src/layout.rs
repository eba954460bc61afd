//! Final column ordering: trail rates and checks grouped per year.

use crate::columns::TRAIL_YEARS;
use crate::model::{ColumnKind, EnrichedTable};

/// Column order as indices into `kinds`. Columns before the first trail-rate /
/// check column keep their place; then, for each year, `in` rate, `out` rate
/// and check; then everything else in its original order.
pub fn layout_order(kinds: &[ColumnKind]) -> Vec<usize> {
    let Some(first_rate) = kinds.iter().position(|k| k.is_rate_block()) else {
        return (0..kinds.len()).collect();
    };

    let mut placed = vec![false; kinds.len()];
    let mut order: Vec<usize> = Vec::with_capacity(kinds.len());
    let mut place = |i: usize, order: &mut Vec<usize>| {
        if !placed[i] {
            placed[i] = true;
            order.push(i);
        }
    };

    for i in 0..first_rate {
        place(i, &mut order);
    }
    for year in TRAIL_YEARS {
        for kind in [
            ColumnKind::InTrailRate(year),
            ColumnKind::OutTrailRate(year),
            ColumnKind::Check(year),
        ] {
            if let Some(i) = kinds.iter().position(|k| *k == kind) {
                place(i, &mut order);
            }
        }
    }
    for i in 0..kinds.len() {
        place(i, &mut order);
    }
    order
}

/// Reorder the table's columns (headers, kinds and every row) by [`layout_order`].
pub fn organize(table: &mut EnrichedTable) {
    let order = layout_order(&table.kinds);
    if order.iter().enumerate().all(|(i, &j)| i == j) {
        return;
    }
    table.kinds = order.iter().map(|&i| table.kinds[i]).collect();
    table.table.headers = order.iter().map(|&i| table.table.headers[i].clone()).collect();
    for row in table.table.rows.iter_mut() {
        let mut old = std::mem::take(row);
        *row = order.iter().map(|&i| std::mem::take(&mut old[i])).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;
    use proptest::prelude::*;
    use ColumnKind::*;

    #[test]
    fn groups_rates_by_year() {
        let kinds = [
            OutSchemeCode,
            Source,
            InTrailRate(1),
            InTrailRate(2),
            PeriodFrom,
            PeriodTo,
            OutTrailRate(1),
            OutTrailRate(2),
            Check(1),
            Check(2),
            RegularVsDirect,
        ];
        let order = layout_order(&kinds);
        let laid: Vec<ColumnKind> = order.iter().map(|&i| kinds[i]).collect();
        assert_eq!(
            laid,
            vec![
                OutSchemeCode,
                Source,
                InTrailRate(1),
                OutTrailRate(1),
                Check(1),
                InTrailRate(2),
                OutTrailRate(2),
                Check(2),
                PeriodFrom,
                PeriodTo,
                RegularVsDirect,
            ]
        );
    }

    #[test]
    fn missing_members_are_skipped() {
        let kinds = [Source, Check(3), InTrailRate(1), Source];
        let order = layout_order(&kinds);
        assert_eq!(order, vec![0, 2, 1, 3]);
    }

    #[test]
    fn no_rate_columns_is_identity() {
        let kinds = [Source, OutSchemeCode, Source];
        assert_eq!(layout_order(&kinds), vec![0, 1, 2]);
    }

    #[test]
    fn source_columns_named_like_generated_ones_stay_put() {
        let mut t = EnrichedTable::new("out");
        t.push_column("Check 1 year", Source, vec![Value::text("a")]);
        t.push_generated(InTrailRate(1), vec![Value::text("1.0")]);
        t.push_generated(PeriodFrom, vec![Value::Empty]);
        t.push_generated(OutTrailRate(1), vec![Value::text("0.5")]);
        t.push_generated(Check(1), vec![Value::text("Check")]);
        organize(&mut t);
        assert_eq!(
            t.headers(),
            &[
                "Check 1 year",
                "switch in Trail Rate 1 year",
                "switch out Trail Rate 1 year",
                "Check 1 year",
                "Investment Period From",
            ]
        );
        assert_eq!(t.kinds[0], Source);
        assert_eq!(t.table.rows[0][0], Value::text("a"));
        assert_eq!(t.table.rows[0][2], Value::text("0.5"));
        assert_eq!(t.table.rows[0][3], Value::text("Check"));
    }

    fn kind_strategy() -> impl Strategy<Value = ColumnKind> {
        prop_oneof![
            Just(Source),
            Just(OutSchemeCode),
            Just(PeriodFrom),
            Just(RegularVsDirect),
            (1u8..=5).prop_map(InTrailRate),
            (1u8..=5).prop_map(OutTrailRate),
            (1u8..=5).prop_map(Check),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: std::env::var("PROPTEST_CASES").ok().and_then(|s| s.parse().ok()).unwrap_or(256),
            failure_persistence: None,
            .. ProptestConfig::default()
        })]

        #[test]
        fn layout_is_a_permutation(kinds in prop::collection::vec(kind_strategy(), 0..24)) {
            let mut order = layout_order(&kinds);
            prop_assert_eq!(order.len(), kinds.len());
            order.sort_unstable();
            prop_assert_eq!(order, (0..kinds.len()).collect::<Vec<_>>());
        }

        #[test]
        fn prefix_before_first_rate_is_untouched(kinds in prop::collection::vec(kind_strategy(), 0..24)) {
            let order = layout_order(&kinds);
            let first = kinds.iter().position(|k| k.is_rate_block()).unwrap_or(kinds.len());
            let expected: Vec<usize> = (0..first).collect();
            prop_assert_eq!(order[..first].to_vec(), expected);
        }
    }
}
