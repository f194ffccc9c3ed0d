//! AML Graph Core - Temporal Transaction Graph Engine
//!
//! Loads AMLSim datasets (accounts, transactions, alerts) into an attributed
//! graph and replays transactions onto it one timestep at a time.
//!
//! # Architecture
//!
//! - **core**: Time management
//! - **models**: Domain types (Account, TransactionBatch, money)
//! - **ledger**: Time-indexed transaction batches
//! - **graph**: Graph store contract and the attributed graph
//! - **tmgraph**: Temporal controller and snapshot memory
//! - **ingest**: AMLSim CSV loading and categorical encoding
//!
//! # Critical Invariants
//!
//! 1. All money values are i64 (cents)
//! 2. A step conserves the total balance of the graph
//! 3. A failed step leaves graph and time untouched
//! 4. Backups and snapshots are deep copies

// Module declarations
pub mod core;
pub mod graph;
pub mod ingest;
pub mod ledger;
pub mod models;
pub mod tmgraph;

// Re-exports for convenience
pub use crate::core::time::TimeManager;
pub use graph::{
    check_is_graph, AttributedGraph, Device, GraphError, GraphStore, ACCOUNT_TYPE, BALANCE,
    COUNTRY,
};
pub use ingest::{load_graph_local, AmlData, IngestError, LoadedGraph};
pub use ledger::{Ledger, LedgerError, Timestep};
pub use models::{
    account::Account,
    transaction::{
        AttrMap, BatchError, Column, ColumnMap, TransactionBatch, TransactionRow, BATCH_FIELDS,
        EDGE_FIELDS,
    },
};
pub use tmgraph::{
    BatchSource, Memory, MemoryError, StepResult, TMGraph, TMGraphConfig, TMGraphError, Warning,
};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn aml_graph_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::tmgraph::PyTMGraph>()?;
    Ok(())
}
