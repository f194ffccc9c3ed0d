//! AMLSim ingestion
//!
//! - **records**: CSV row types
//! - **encoding**: categorical label ↔ id dictionaries
//! - **loader**: directory loading and graph/ledger construction

pub mod encoding;
pub mod loader;
pub mod records;

pub use encoding::{CategoryEncoder, DataDicts};
pub use loader::{
    load_graph_local, load_graph_remote, AmlData, IngestError, LoadedGraph, ACCOUNTS_FILE,
    ALERTS_FILE, TRANSACTIONS_FILE,
};
pub use records::{AccountRecord, AlertRecord, TransactionRecord};
