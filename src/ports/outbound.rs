//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{DomainError, Mensa, MenuSnapshot, WeekIdentifier};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt;

/// Which kind of source produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Remote,
    Local,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Remote => f.write_str("remote"),
            SourceKind::Local => f.write_str("local"),
        }
    }
}

/// A place the current menus can be loaded from.
///
/// Remote sources fail with `DomainError::RemoteFetch`, local ones with
/// `DomainError::LocalFetch`.
#[async_trait::async_trait]
pub trait MenuSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Load the current menu snapshot (all mensas with their weekly plans).
    async fn load(&self) -> Result<MenuSnapshot, DomainError>;
}

/// Ratings backend. Attaches rating metadata to an already loaded snapshot.
#[async_trait::async_trait]
pub trait RatingsPort: Send + Sync {
    /// Fails with `DomainError::RatingsFetch`; the snapshot is consumed either way.
    async fn enrich(&self, snapshot: MenuSnapshot) -> Result<MenuSnapshot, DomainError>;
}

/// Offline menu cache.
///
/// Every call acquires its own connection and releases it before returning,
/// so no handle is held across a remote fetch.
#[async_trait::async_trait]
pub trait MenuStore: Send + Sync {
    /// Week of the stored menus. `None` if nothing is cached.
    async fn stored_week(&self) -> Result<Option<WeekIdentifier>, DomainError>;

    /// Replace the cached mensas and menus with `snapshot`.
    async fn store_snapshot(&self, snapshot: &MenuSnapshot) -> Result<(), DomainError>;

    /// Load the cached mensas and menus, with favorite flags applied.
    async fn load_snapshot(&self) -> Result<MenuSnapshot, DomainError>;

    /// Persist the favorite flag of every given mensa.
    async fn store_favorites(&self, mensas: &[Mensa]) -> Result<(), DomainError>;

    async fn favorite_ids(&self) -> Result<HashSet<i64>, DomainError>;

    async fn is_favorite(&self, mensa_id: i64) -> Result<bool, DomainError>;

    /// Web service timestamp of the cached mensa entry.
    async fn mensa_timestamp(&self, mensa_id: i64) -> Result<Option<i64>, DomainError>;

    /// Drop every cached row (mensas, menus, favorites).
    async fn clear(&self) -> Result<(), DomainError>;
}

/// Source of "today". Swapped in tests to pin the current week.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}
