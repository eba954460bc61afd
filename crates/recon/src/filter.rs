use crate::model::Table;

/// Broker value marking a direct (no-distributor) transaction.
pub const DIRECT_BROKER: &str = "DIRECT";

/// Drop rows whose broker cell (trimmed, upper-cased) is `DIRECT`. Returns the
/// number of rows removed; row order is preserved.
pub fn remove_direct(table: &mut Table, broker_col: usize) -> usize {
    let before = table.rows.len();
    table.rows.retain(|row| {
        row.get(broker_col)
            .and_then(|v| v.as_key())
            .map_or(true, |key| key != DIRECT_BROKER)
    });
    before - table.rows.len()
}
