//! Shared domain types for QuietMind: errors, configuration, chat enums.
//!
//! This crate performs no I/O. Everything here is plain data shared by the
//! store, the provider adapters, and the gateway.

pub mod chat;
pub mod config;
pub mod error;
