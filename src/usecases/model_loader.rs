//! Load orchestration: staleness check -> source selection -> load -> ratings -> fallback.
//!
//! - Stale cache: download from the web service, fall back to the cache on failure
//! - Fresh cache: load the cache directly; no web request
//! - Ratings failures retry the cache once more without ratings
//! - One report per run, delivered to every listener after the worker is joined

use crate::domain::{DomainError, LoadFailure, LoadReport, MenuSnapshot};
use crate::ports::{LoadListener, MenuSource, RatingsPort, SourceKind};
use crate::usecases::staleness::StalenessChecker;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Steps of one load sequence. Each step runs once; `RetryLocal` at most
/// twice (first with ratings, then without).
///
/// A ratings failure on downloaded data drops the download and retries the
/// cache with ratings; on cached data it reloads the cache without ratings.
enum Step {
    CheckStaleness,
    Fetch(SourceKind),
    Enrich {
        source: SourceKind,
        snapshot: MenuSnapshot,
    },
    RetryLocal {
        with_ratings: bool,
    },
    Done(LoadReport),
}

/// Model loader. Chooses between web service and cache and reports one outcome.
pub struct ModelLoader {
    staleness: StalenessChecker,
    remote: Arc<dyn MenuSource>,
    local: Arc<dyn MenuSource>,
    ratings: Arc<dyn RatingsPort>,
    listeners: Vec<Arc<dyn LoadListener>>,
}

impl ModelLoader {
    pub fn new(
        staleness: StalenessChecker,
        remote: Arc<dyn MenuSource>,
        local: Arc<dyn MenuSource>,
        ratings: Arc<dyn RatingsPort>,
    ) -> Self {
        Self {
            staleness,
            remote,
            local,
            ratings,
            listeners: Vec::new(),
        }
    }

    /// Register a completion callback. Callbacks run in registration order.
    pub fn with_listener(mut self, listener: Arc<dyn LoadListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Run one load sequence on a background task, then notify every listener
    /// from the calling task with the same report.
    ///
    /// # Errors
    /// `DomainError::Worker` if the background task panicked; listeners are not called.
    pub async fn run(self: &Arc<Self>) -> Result<LoadReport, DomainError> {
        let worker = Arc::clone(self);
        let report = tokio::spawn(async move { worker.execute().await })
            .await
            .map_err(|e| DomainError::Worker(e.to_string()))?;

        for listener in &self.listeners {
            listener.on_load_finished(&report);
        }
        Ok(report)
    }

    /// The load sequence itself, without listener delivery.
    pub async fn execute(&self) -> LoadReport {
        let mut stale = false;
        let mut step = Step::CheckStaleness;

        loop {
            step = match step {
                Step::CheckStaleness => {
                    stale = self.staleness.is_stale().await;
                    let source = if stale {
                        SourceKind::Remote
                    } else {
                        SourceKind::Local
                    };
                    info!(stale, %source, "selected menu source");
                    Step::Fetch(source)
                }
                Step::Fetch(source) => {
                    let menus = self.source(source);
                    debug!(kind = %menus.kind(), "loading menus");
                    match menus.load().await {
                        Ok(snapshot) => Step::Enrich { source, snapshot },
                        Err(e) => match source {
                            SourceKind::Remote => {
                                warn!(error = %e, "download failed; falling back to cached menus");
                                Step::RetryLocal { with_ratings: true }
                            }
                            SourceKind::Local => {
                                warn!(error = %e, "loading cached menus failed");
                                Step::Done(LoadReport::failure(
                                    stale,
                                    LoadFailure::LocalFetchFailed,
                                ))
                            }
                        },
                    }
                }
                Step::Enrich { source, snapshot } => match self.ratings.enrich(snapshot).await {
                    Ok(snapshot) => {
                        debug!(rated = snapshot.rated_menus(), "ratings attached");
                        Step::Done(LoadReport::success(
                            stale,
                            source == SourceKind::Remote,
                            true,
                            snapshot,
                        ))
                    }
                    Err(e) => {
                        warn!(error = %e, %source, "fetching ratings failed");
                        Step::RetryLocal {
                            with_ratings: source == SourceKind::Remote,
                        }
                    }
                },
                Step::RetryLocal { with_ratings } => match self.local.load().await {
                    Ok(snapshot) if with_ratings => Step::Enrich {
                        source: SourceKind::Local,
                        snapshot,
                    },
                    Ok(snapshot) => {
                        info!("serving cached menus without ratings");
                        Step::Done(LoadReport::success(stale, false, false, snapshot))
                    }
                    Err(e) => {
                        warn!(error = %e, with_ratings, "cache retry failed");
                        Step::Done(LoadReport::failure(stale, LoadFailure::LocalFetchFailed))
                    }
                },
                Step::Done(report) => {
                    info!(status = %report.status, "menu load finished");
                    return report;
                }
            };
        }
    }

    fn source(&self, kind: SourceKind) -> &dyn MenuSource {
        match kind {
            SourceKind::Remote => self.remote.as_ref(),
            SourceKind::Local => self.local.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        LoadResult, LoadStatus, Mensa, Menu, MenuRating, WeekIdentifier, WeeklyMenuplan,
    };
    use crate::ports::{Clock, MenuStore};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TODAY_WEEK: u32 = 47;

    fn today() -> NaiveDate {
        NaiveDate::from_isoywd_opt(2013, TODAY_WEEK, chrono::Weekday::Wed).unwrap()
    }

    struct FixedClock;

    impl Clock for FixedClock {
        fn today(&self) -> NaiveDate {
            today()
        }
    }

    struct WeekStore(u32);

    #[async_trait]
    impl MenuStore for WeekStore {
        async fn stored_week(&self) -> Result<Option<WeekIdentifier>, DomainError> {
            Ok(Some(WeekIdentifier::new(self.0)))
        }
        async fn store_snapshot(&self, _: &MenuSnapshot) -> Result<(), DomainError> {
            Ok(())
        }
        async fn load_snapshot(&self) -> Result<MenuSnapshot, DomainError> {
            unimplemented!()
        }
        async fn store_favorites(&self, _: &[Mensa]) -> Result<(), DomainError> {
            Ok(())
        }
        async fn favorite_ids(&self) -> Result<HashSet<i64>, DomainError> {
            Ok(HashSet::new())
        }
        async fn is_favorite(&self, _: i64) -> Result<bool, DomainError> {
            Ok(false)
        }
        async fn mensa_timestamp(&self, _: i64) -> Result<Option<i64>, DomainError> {
            Ok(None)
        }
        async fn clear(&self) -> Result<(), DomainError> {
            Ok(())
        }
    }

    /// Source failing per a script of outcomes (`true` = fail); once the
    /// script runs out every call behaves like `fails`.
    struct FakeSource {
        kind: SourceKind,
        fails: bool,
        script: Mutex<VecDeque<bool>>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(kind: SourceKind, fails: bool) -> Arc<Self> {
            Self::scripted(kind, &[], fails)
        }

        fn scripted(kind: SourceKind, script: &[bool], fails: bool) -> Arc<Self> {
            Arc::new(Self {
                kind,
                fails,
                script: Mutex::new(script.iter().copied().collect()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MenuSource for FakeSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn load(&self) -> Result<MenuSnapshot, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fails = self.script.lock().unwrap().pop_front().unwrap_or(self.fails);
            match (fails, self.kind) {
                (true, SourceKind::Remote) => Err(DomainError::RemoteFetch("timeout".into())),
                (true, SourceKind::Local) => Err(DomainError::LocalFetch("no mensas".into())),
                (false, _) => Ok(snapshot(&self.kind.to_string())),
            }
        }
    }

    /// Ratings backend answering from a script; succeeds once the script runs out.
    struct ScriptedRatings {
        script: Mutex<VecDeque<bool>>,
        calls: AtomicUsize,
    }

    impl ScriptedRatings {
        fn new(script: &[bool]) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.iter().copied().collect()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RatingsPort for ScriptedRatings {
        async fn enrich(&self, mut snapshot: MenuSnapshot) -> Result<MenuSnapshot, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let ok = self.script.lock().unwrap().pop_front().unwrap_or(true);
            if !ok {
                return Err(DomainError::RatingsFetch("backend unreachable".into()));
            }
            for mensa in &mut snapshot.mensas {
                for menu in mensa.menuplan.menus_mut() {
                    menu.rating = Some(MenuRating {
                        average: 4.5,
                        votes: 2,
                    });
                }
            }
            Ok(snapshot)
        }
    }

    fn snapshot(origin: &str) -> MenuSnapshot {
        let mut plan = WeeklyMenuplan::new();
        plan.add(Menu::new(1, format!("{} menu", origin), "Served with rice", today()));
        MenuSnapshot::new(vec![Mensa {
            id: 1,
            name: "Mensa Gesellschaftsstrasse".into(),
            street: "Gesellschaftsstrasse 2".into(),
            zip: "3012 Bern".into(),
            latitude: 46.95,
            longitude: 7.43,
            is_favorite: false,
            timestamp: 0,
            menuplan: plan,
        }])
    }

    struct Harness {
        remote: Arc<FakeSource>,
        local: Arc<FakeSource>,
        ratings: Arc<ScriptedRatings>,
        loader: ModelLoader,
    }

    fn harness(stale: bool, remote_fails: bool, local_fails: bool, ratings: &[bool]) -> Harness {
        harness_with(
            stale,
            FakeSource::new(SourceKind::Remote, remote_fails),
            FakeSource::new(SourceKind::Local, local_fails),
            ratings,
        )
    }

    fn harness_with(
        stale: bool,
        remote: Arc<FakeSource>,
        local: Arc<FakeSource>,
        ratings: &[bool],
    ) -> Harness {
        let stored = if stale { TODAY_WEEK - 1 } else { TODAY_WEEK };
        let ratings = ScriptedRatings::new(ratings);
        let loader = ModelLoader::new(
            StalenessChecker::new(Arc::new(WeekStore(stored)), Arc::new(FixedClock)),
            remote.clone(),
            local.clone(),
            ratings.clone(),
        );
        Harness {
            remote,
            local,
            ratings,
            loader,
        }
    }

    fn title_of(report: &LoadReport) -> String {
        let snapshot = report.snapshot.as_ref().expect("snapshot");
        snapshot.mensas[0].menuplan.menus().next().unwrap().title.clone()
    }

    #[tokio::test]
    async fn test_fresh_cache_loads_locally() {
        let h = harness(false, false, false, &[]);
        let report = h.loader.execute().await;

        assert_eq!(
            report.result,
            LoadResult::Success {
                used_remote_source: false,
                has_ratings: true
            }
        );
        assert_eq!(report.status, LoadStatus::NoUpdateNeeded);
        assert_eq!(h.remote.calls(), 0);
        assert_eq!(h.local.calls(), 1);
        assert_eq!(report.snapshot.as_ref().unwrap().rated_menus(), 1);
    }

    #[tokio::test]
    async fn test_stale_cache_downloads() {
        let h = harness(true, false, false, &[]);
        let report = h.loader.execute().await;

        assert_eq!(
            report.result,
            LoadResult::Success {
                used_remote_source: true,
                has_ratings: true
            }
        );
        assert_eq!(report.status, LoadStatus::DownloadCompleted);
        assert_eq!(h.local.calls(), 0);
        assert_eq!(title_of(&report), "remote menu");
    }

    #[tokio::test]
    async fn test_download_failure_falls_back_to_cache() {
        let h = harness(true, true, false, &[]);
        let report = h.loader.execute().await;

        assert_eq!(
            report.result,
            LoadResult::Success {
                used_remote_source: false,
                has_ratings: true
            }
        );
        assert_eq!(report.status, LoadStatus::DownloadFailedUsedCache);
        assert_eq!(h.remote.calls(), 1);
        assert_eq!(h.local.calls(), 1);
        assert_eq!(title_of(&report), "local menu");
    }

    #[tokio::test]
    async fn test_download_and_cache_failure_is_total_failure() {
        let h = harness(true, true, true, &[]);
        let report = h.loader.execute().await;

        assert_eq!(
            report.result,
            LoadResult::Failure {
                reason: LoadFailure::LocalFetchFailed
            }
        );
        assert_eq!(report.status, LoadStatus::TotalFailure);
        assert!(report.snapshot.is_none());
        assert_eq!(h.ratings.calls(), 0);
    }

    #[tokio::test]
    async fn test_fresh_cache_failure_does_not_download() {
        let h = harness(false, false, true, &[]);
        let report = h.loader.execute().await;

        assert_eq!(
            report.result,
            LoadResult::Failure {
                reason: LoadFailure::LocalFetchFailed
            }
        );
        assert_eq!(report.status, LoadStatus::TotalFailure);
        assert_eq!(h.remote.calls(), 0);
        assert_eq!(h.local.calls(), 1);
    }

    #[tokio::test]
    async fn test_ratings_failure_after_download_uses_cache_with_ratings() {
        let h = harness(true, false, false, &[false]);
        let report = h.loader.execute().await;

        assert_eq!(
            report.result,
            LoadResult::Success {
                used_remote_source: false,
                has_ratings: true
            }
        );
        assert_eq!(report.status, LoadStatus::DownloadFailedUsedCache);
        assert_eq!(h.remote.calls(), 1);
        assert_eq!(h.local.calls(), 1);
        assert_eq!(h.ratings.calls(), 2);
    }

    #[tokio::test]
    async fn test_ratings_failing_twice_serves_cache_without_ratings() {
        let h = harness(true, false, false, &[false, false]);
        let report = h.loader.execute().await;

        assert_eq!(
            report.result,
            LoadResult::Success {
                used_remote_source: false,
                has_ratings: false
            }
        );
        assert_eq!(report.status, LoadStatus::DownloadFailedUsedCache);
        assert_eq!(h.local.calls(), 2);
        assert_eq!(h.ratings.calls(), 2);
        assert_eq!(report.snapshot.as_ref().unwrap().rated_menus(), 0);
    }

    #[tokio::test]
    async fn test_download_failure_and_ratings_failure_serves_cache_without_ratings() {
        let h = harness(true, true, false, &[false]);
        let report = h.loader.execute().await;

        assert_eq!(
            report.result,
            LoadResult::Success {
                used_remote_source: false,
                has_ratings: false
            }
        );
        assert_eq!(report.status, LoadStatus::DownloadFailedUsedCache);
        assert_eq!(h.local.calls(), 2);
    }

    #[tokio::test]
    async fn test_fresh_cache_ratings_failure_reloads_without_ratings() {
        let h = harness(false, false, false, &[false]);
        let report = h.loader.execute().await;

        assert_eq!(
            report.result,
            LoadResult::Success {
                used_remote_source: false,
                has_ratings: false
            }
        );
        assert_eq!(report.status, LoadStatus::NoUpdateNeeded);
        assert_eq!(h.remote.calls(), 0);
        assert_eq!(h.local.calls(), 2);
        assert_eq!(h.ratings.calls(), 1);
    }

    #[tokio::test]
    async fn test_ratings_failure_after_download_and_cache_failure_is_total_failure() {
        let h = harness(true, false, true, &[false]);
        let report = h.loader.execute().await;

        assert_eq!(
            report.result,
            LoadResult::Failure {
                reason: LoadFailure::LocalFetchFailed
            }
        );
        assert_eq!(report.status, LoadStatus::TotalFailure);
        assert!(report.snapshot.is_none());
        assert_eq!(h.remote.calls(), 1);
        assert_eq!(h.local.calls(), 1);
        assert_eq!(h.ratings.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_failing_on_reload_without_ratings_is_total_failure() {
        let h = harness_with(
            true,
            FakeSource::new(SourceKind::Remote, false),
            FakeSource::scripted(SourceKind::Local, &[false, true], false),
            &[false, false],
        );
        let report = h.loader.execute().await;

        assert_eq!(
            report.result,
            LoadResult::Failure {
                reason: LoadFailure::LocalFetchFailed
            }
        );
        assert_eq!(report.status, LoadStatus::TotalFailure);
        assert_eq!(h.remote.calls(), 1);
        assert_eq!(h.local.calls(), 2);
        assert_eq!(h.ratings.calls(), 2);
    }

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<(&'static str, LoadResult)>>>,
    }

    impl LoadListener for Recorder {
        fn on_load_finished(&self, report: &LoadReport) {
            self.log.lock().unwrap().push((self.name, report.result));
        }
    }

    #[tokio::test]
    async fn test_every_listener_notified_once_in_order() {
        let h = harness(true, true, false, &[]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let loader = Arc::new(
            h.loader
                .with_listener(Arc::new(Recorder {
                    name: "first",
                    log: log.clone(),
                }))
                .with_listener(Arc::new(Recorder {
                    name: "second",
                    log: log.clone(),
                })),
        );

        let report = loader.run().await.unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], ("first", report.result));
        assert_eq!(log[1], ("second", report.result));
    }
}
