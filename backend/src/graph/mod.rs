//! Graph storage
//!
//! - **store**: the [`GraphStore`] capability contract and its errors
//! - **attributed**: the in-crate attributed graph implementation
//! - **device**: compute device tags

pub mod attributed;
pub mod device;
pub mod store;

pub use attributed::AttributedGraph;
pub use device::{Device, ParseDeviceError};
pub use store::{check_is_graph, GraphError, GraphStore, ACCOUNT_TYPE, BALANCE, COUNTRY};
