//! Mock ratings adapter for setups without a ratings backend.
//!
//! Leaves the snapshot untouched after a simulated round trip.

use crate::domain::{DomainError, MenuSnapshot};
use crate::ports::RatingsPort;
use std::time::Duration;
use tracing::info;

/// Mock ratings backend. Attaches nothing and never fails.
pub struct MockRatingsAdapter {
    /// Simulated network delay in milliseconds.
    delay_ms: u64,
}

impl MockRatingsAdapter {
    /// Create a new mock adapter with default delay (50ms).
    pub fn new() -> Self {
        Self { delay_ms: 50 }
    }

    pub fn with_delay(delay_ms: u64) -> Self {
        Self { delay_ms }
    }
}

impl Default for MockRatingsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RatingsPort for MockRatingsAdapter {
    async fn enrich(&self, snapshot: MenuSnapshot) -> Result<MenuSnapshot, DomainError> {
        info!(
            mensas = snapshot.mensas.len(),
            "[MOCK] ratings backend not configured; skipping ratings"
        );
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        Ok(snapshot)
    }
}
