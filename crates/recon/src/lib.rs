//! `switchrecon`: switch register reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded tables (register, reference master,
//! brokerage schedules), returns the enriched table plus a run report.
//! No CLI or file IO dependencies.

pub mod codes;
pub mod columns;
pub mod compare;
pub mod config;
pub mod dates;
pub mod engine;
pub mod error;
pub mod filter;
pub mod layout;
pub mod matcher;
pub mod model;
pub mod plan;
pub mod reference;

pub use config::RunConfig;
pub use engine::{run, run_with_progress};
pub use error::ReconError;
pub use model::{
    ColumnKind, EnrichedTable, ReconInput, ReconOutput, RunReport, Stage, Table, Value, Warning,
};
