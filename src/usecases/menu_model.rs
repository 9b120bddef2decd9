//! Application state: the currently loaded menus plus observers.
//!
//! Passed around by `Arc`. Updated by load reports (as a `LoadListener`) and by
//! favorite changes; observers subscribe and unsubscribe explicitly.

use crate::domain::{DomainError, LoadReport, LoadStatus, Mensa, MenuSnapshot};
use crate::ports::{LoadListener, MenuStore, ModelObserver};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Handle returned by `MenuModel::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct ModelState {
    snapshot: Option<Arc<MenuSnapshot>>,
    last_status: Option<LoadStatus>,
}

/// Menu model. Holds the last successfully loaded snapshot.
pub struct MenuModel {
    store: Arc<dyn MenuStore>,
    state: RwLock<ModelState>,
    observers: Mutex<Vec<(SubscriptionId, Arc<dyn ModelObserver>)>>,
    next_id: AtomicU64,
}

impl MenuModel {
    pub fn new(store: Arc<dyn MenuStore>) -> Self {
        Self {
            store,
            state: RwLock::new(ModelState::default()),
            observers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn ModelObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(sid, _)| *sid != id);
        observers.len() != before
    }

    pub fn snapshot(&self) -> Option<Arc<MenuSnapshot>> {
        self.read_state().snapshot.clone()
    }

    pub fn mensas(&self) -> Vec<Mensa> {
        self.snapshot()
            .map(|s| s.mensas.clone())
            .unwrap_or_default()
    }

    pub fn no_mensas_loaded(&self) -> bool {
        self.snapshot().is_none_or(|s| s.is_empty())
    }

    /// Status of the most recent load, successful or not.
    pub fn last_status(&self) -> Option<LoadStatus> {
        self.read_state().last_status
    }

    /// Mark or unmark a mensa as favorite and persist all favorite flags.
    ///
    /// Returns `Ok(false)` if no snapshot is loaded or the mensa is unknown.
    pub async fn set_favorite(&self, mensa_id: i64, favorite: bool) -> Result<bool, DomainError> {
        let Some(current) = self.snapshot() else {
            return Ok(false);
        };
        if current.mensa(mensa_id).is_none() {
            return Ok(false);
        }
        let mut next = MenuSnapshot::clone(&current);
        for mensa in next.mensas.iter_mut().filter(|m| m.id == mensa_id) {
            mensa.is_favorite = favorite;
        }

        // The in-memory flag only changes once the store has accepted it.
        self.store.store_favorites(&next.mensas).await?;
        let next = Arc::new(next);
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot = Some(Arc::clone(&next));
        info!(mensa_id, favorite, "favorite updated");
        self.notify(&next);
        Ok(true)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, ModelState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, snapshot: &MenuSnapshot) {
        // Clone the list so observers may (un)subscribe from inside the callback.
        let observers: Vec<Arc<dyn ModelObserver>> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect();
        debug!(observers = observers.len(), "notifying model observers");
        for observer in observers {
            observer.on_model_changed(snapshot);
        }
    }
}

impl LoadListener for MenuModel {
    fn on_load_finished(&self, report: &LoadReport) {
        let snapshot = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.last_status = Some(report.status);
            match &report.snapshot {
                Some(snapshot) => {
                    state.snapshot = Some(Arc::clone(snapshot));
                    Arc::clone(snapshot)
                }
                None => {
                    warn!(status = %report.status, "load failed; keeping previous menus");
                    return;
                }
            }
        };
        self.notify(&snapshot);
    }
}
