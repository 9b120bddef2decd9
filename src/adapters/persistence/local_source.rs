//! Implements MenuSource over the offline cache.

use crate::domain::{DomainError, MenuSnapshot};
use crate::ports::{MenuSource, MenuStore, SourceKind};
use std::sync::Arc;

/// Reads the most recently cached menus. Every failure surfaces as `LocalFetch`.
pub struct LocalMenuSource {
    store: Arc<dyn MenuStore>,
}

impl LocalMenuSource {
    pub fn new(store: Arc<dyn MenuStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl MenuSource for LocalMenuSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    async fn load(&self) -> Result<MenuSnapshot, DomainError> {
        self.store.load_snapshot().await.map_err(|e| match e {
            DomainError::LocalFetch(msg) => DomainError::LocalFetch(msg),
            other => DomainError::LocalFetch(other.to_string()),
        })
    }
}
