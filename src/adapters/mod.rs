//! Infrastructure adapters. Implement outbound ports.
//!
//! Web service, SQLite cache, ratings backend, clock, terminal. Map errors to DomainError.

pub mod clock;
pub mod persistence;
pub mod ratings;
pub mod ui;
pub mod web;
