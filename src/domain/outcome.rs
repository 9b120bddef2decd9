//! Outcome of one load sequence: result, status classification, report.

use crate::domain::MenuSnapshot;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Why a load sequence ended without data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadFailure {
    /// Reserved: the staleness check fails open, so this is never produced.
    StalenessCheckFailed,
    RemoteFetchFailed,
    LocalFetchFailed,
    RatingsFetchFailed,
}

/// Terminal result of a load sequence. Built once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum LoadResult {
    Success {
        used_remote_source: bool,
        /// False when ratings could not be fetched and the cache was served without them.
        has_ratings: bool,
    },
    Failure {
        reason: LoadFailure,
    },
}

impl LoadResult {
    pub fn is_success(&self) -> bool {
        matches!(self, LoadResult::Success { .. })
    }
}

/// Short classification of a finished sequence, used to pick the user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadStatus {
    DownloadCompleted,
    DownloadFailedUsedCache,
    NoUpdateNeeded,
    TotalFailure,
}

impl LoadStatus {
    /// Derived from whether the cache was stale and how the sequence ended.
    pub fn classify(stale: bool, result: &LoadResult) -> Self {
        match *result {
            LoadResult::Success {
                used_remote_source: true,
                ..
            } => LoadStatus::DownloadCompleted,
            LoadResult::Success { .. } if stale => LoadStatus::DownloadFailedUsedCache,
            LoadResult::Success { .. } => LoadStatus::NoUpdateNeeded,
            LoadResult::Failure { .. } => LoadStatus::TotalFailure,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoadStatus::DownloadCompleted => "download-completed",
            LoadStatus::DownloadFailedUsedCache => "download-failed-used-cache",
            LoadStatus::NoUpdateNeeded => "no-update-needed",
            LoadStatus::TotalFailure => "total-failure",
        }
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What every listener receives at the end of a run.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub stale: bool,
    pub result: LoadResult,
    pub status: LoadStatus,
    /// Loaded data; `None` exactly when `result` is a failure.
    pub snapshot: Option<Arc<MenuSnapshot>>,
}

impl LoadReport {
    pub fn success(
        stale: bool,
        used_remote_source: bool,
        has_ratings: bool,
        snapshot: MenuSnapshot,
    ) -> Self {
        let result = LoadResult::Success {
            used_remote_source,
            has_ratings,
        };
        Self {
            stale,
            status: LoadStatus::classify(stale, &result),
            result,
            snapshot: Some(Arc::new(snapshot)),
        }
    }

    pub fn failure(stale: bool, reason: LoadFailure) -> Self {
        let result = LoadResult::Failure { reason };
        Self {
            stale,
            status: LoadStatus::classify(stale, &result),
            result,
            snapshot: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification_table() {
        let remote = LoadResult::Success {
            used_remote_source: true,
            has_ratings: true,
        };
        let cache = LoadResult::Success {
            used_remote_source: false,
            has_ratings: true,
        };
        let failed = LoadResult::Failure {
            reason: LoadFailure::LocalFetchFailed,
        };

        assert_eq!(LoadStatus::classify(true, &remote), LoadStatus::DownloadCompleted);
        assert_eq!(
            LoadStatus::classify(true, &cache),
            LoadStatus::DownloadFailedUsedCache
        );
        assert_eq!(LoadStatus::classify(false, &cache), LoadStatus::NoUpdateNeeded);
        assert_eq!(LoadStatus::classify(true, &failed), LoadStatus::TotalFailure);
        assert_eq!(LoadStatus::classify(false, &failed), LoadStatus::TotalFailure);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(LoadStatus::DownloadCompleted.to_string(), "download-completed");
        assert_eq!(
            LoadStatus::DownloadFailedUsedCache.as_str(),
            "download-failed-used-cache"
        );
        assert_eq!(LoadStatus::NoUpdateNeeded.as_str(), "no-update-needed");
        assert_eq!(LoadStatus::TotalFailure.as_str(), "total-failure");
    }

    #[test]
    fn test_failure_report_has_no_snapshot() {
        let report = LoadReport::failure(false, LoadFailure::LocalFetchFailed);
        assert!(report.snapshot.is_none());
        assert!(!report.result.is_success());
        assert_eq!(report.status, LoadStatus::TotalFailure);
    }
}
