//! Temporal graph replay
//!
//! See `controller.rs` for the step loop and `memory.rs` for snapshot
//! history.

pub mod controller;
pub mod memory;

pub use controller::{BatchSource, StepResult, TMGraph, TMGraphConfig, TMGraphError, Warning};
pub use memory::{Memory, MemoryError};
