//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod outcome;

pub use entities::{
    DailyMenuplan, Mensa, Menu, MenuRating, MenuSnapshot, WeekIdentifier, WeeklyMenuplan,
};
pub use errors::DomainError;
pub use outcome::{LoadFailure, LoadReport, LoadResult, LoadStatus};
