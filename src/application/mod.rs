//! Application layer containing the order placement orchestration.
//!
//! This module defines the `OrderPlacementService`, the entry point callers use
//! to place orders. It is stateless between calls and safe to share between
//! tasks behind an `Arc`; the only shared state is the stock held by the stores.

pub mod placement;
