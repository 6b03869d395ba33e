//! Domain types for order placement and the ports the stores implement.

pub mod customer;
pub mod order;
pub mod ports;
pub mod product;
