//! Core replay primitives

pub mod time;
