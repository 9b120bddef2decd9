//! Decides whether the cached menus must be refreshed from the web service.
//!
//! Compares the ISO week of today with the week stored alongside the cached
//! menus. Fails open: if the cache cannot be asked, the data counts as stale.

use crate::domain::WeekIdentifier;
use crate::ports::{Clock, MenuStore};
use std::sync::Arc;
use tracing::{debug, warn};

/// Staleness checker over the offline cache.
pub struct StalenessChecker {
    store: Arc<dyn MenuStore>,
    clock: Arc<dyn Clock>,
}

impl StalenessChecker {
    pub fn new(store: Arc<dyn MenuStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// True if the cached menus predate the current week, the cache is empty,
    /// or the cache could not be read.
    ///
    /// Week numbers carry no year: a cache from week 52 still counts as fresh
    /// in week 1 of the next year.
    pub async fn is_stale(&self) -> bool {
        let current = WeekIdentifier::of(self.clock.today());
        match self.store.stored_week().await {
            Ok(Some(stored)) => {
                let stale = current > stored;
                debug!(%current, %stored, stale, "compared cached menu week");
                stale
            }
            Ok(None) => {
                debug!(%current, "no cached menus; refresh required");
                true
            }
            Err(e) => {
                warn!(error = %e, "staleness check failed; treating cache as stale");
                true
            }
        }
    }
}
