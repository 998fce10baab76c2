//! Core use-case services.
//!
//! # Responsibility
//! - Wrap provider sessions into transaction-per-operation CRUD entry points.
//! - Keep callers decoupled from session and transaction handling.

pub mod entity_service;
