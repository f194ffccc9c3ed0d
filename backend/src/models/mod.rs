//! Domain models for the transaction graph

pub mod account;
pub mod money;
pub mod transaction;

// Re-exports
pub use account::Account;
pub use transaction::{
    AttrMap, BatchError, Column, ColumnMap, TransactionBatch, TransactionRow, BATCH_FIELDS,
    EDGE_FIELDS,
};
