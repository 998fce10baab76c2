//! Entity mapping contracts.
//!
//! # Responsibility
//! - Describe how a caller-owned record type maps onto one SQLite table.
//!
//! # Invariants
//! - Every mapped record is identified by exactly one key column.
//! - The service never retains entity values across calls.

pub mod entity;
