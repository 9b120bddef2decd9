//! Wiring & DI. Entry point: bootstrap adapters, inject into the loader, print the result.
//! No business logic here; source selection and fallback live in ModelLoader.

use dotenv::dotenv;
use mensa_menus::adapters::clock::SystemClock;
use mensa_menus::adapters::persistence::{LocalMenuSource, SqliteMenuStore};
use mensa_menus::adapters::ratings::{HttpRatingsAdapter, MockRatingsAdapter};
use mensa_menus::adapters::ui::{LoadSpinner, StatusLine, print_day_overview};
use mensa_menus::adapters::web::MensaWebSource;
use mensa_menus::ports::{Clock, MenuSource, MenuStore, RatingsPort};
use mensa_menus::shared::AppConfig;
use mensa_menus::usecases::{MenuModel, ModelLoader, StalenessChecker};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!("no .env found"),
    }

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "invalid configuration; using defaults");
        AppConfig::default()
    });
    let timeout = Duration::from_secs(cfg.request_timeout_secs_or_default());

    let data_path = PathBuf::from(cfg.data_dir_or_default());
    let sqlite = Arc::new(
        SqliteMenuStore::connect(&data_path)
            .await
            .map_err(|e| anyhow::anyhow!("opening menu cache failed: {}", e))?,
    );
    let store: Arc<dyn MenuStore> = sqlite;

    // --- Sources ---
    let web_url = cfg.web_service_url_or_default();
    info!(url = %web_url, "menu web service");
    let remote: Arc<dyn MenuSource> = Arc::new(
        MensaWebSource::new(web_url, timeout, Arc::clone(&store))
            .map_err(|e| anyhow::anyhow!("{}", e))?,
    );
    let local: Arc<dyn MenuSource> = Arc::new(LocalMenuSource::new(Arc::clone(&store)));

    // --- Ratings ---
    let ratings: Arc<dyn RatingsPort> = if cfg.is_ratings_configured() {
        let url = cfg.ratings_url.clone().unwrap_or_default();
        info!(url = %url, "ratings backend enabled");
        Arc::new(
            HttpRatingsAdapter::new(
                url,
                cfg.ratings_app_id.clone().unwrap_or_default(),
                cfg.ratings_api_key.clone().unwrap_or_default(),
                timeout,
            )
            .map_err(|e| anyhow::anyhow!("{}", e))?,
        )
    } else {
        warn!("MENSA_RATINGS_URL/APP_ID/API_KEY not set, using mock ratings adapter");
        Arc::new(MockRatingsAdapter::new())
    };

    // --- Application state + loader ---
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let model = Arc::new(MenuModel::new(Arc::clone(&store)));
    let loader = Arc::new(
        ModelLoader::new(
            StalenessChecker::new(Arc::clone(&store), Arc::clone(&clock)),
            remote,
            local,
            ratings,
        )
        .with_listener(Arc::new(LoadSpinner::start("Loading menus...")))
        .with_listener(model.clone())
        .with_listener(Arc::new(StatusLine)),
    );

    let report = loader
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    if let Some(snapshot) = model.snapshot() {
        let today = clock.today();
        let day = snapshot
            .days()
            .into_iter()
            .find(|d| *d >= today)
            .unwrap_or(today);
        print_day_overview(&snapshot, day);
    }

    if !report.result.is_success() {
        anyhow::bail!("no menus available ({})", report.status);
    }
    Ok(())
}
