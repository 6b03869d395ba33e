//! File formats the CLI reads and writes.

pub mod catalog;
pub mod csv;
