//! Mensa web service adapter. Implements MenuSource by downloading the current week.
//!
//! Endpoints (JSON, wrapped in `{"result": {"content": ...}}`):
//! - `GET {base}/mensas`: list of mensas
//! - `GET {base}/mensas/{id}/weeklyplan`: menus of the current week for one mensa
//!
//! A successful download is written to the offline cache before it is returned.

use crate::domain::{DomainError, Mensa, Menu, MenuSnapshot, WeeklyMenuplan};
use crate::ports::{MenuSource, MenuStore, SourceKind};
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Deserialize)]
struct Envelope<T> {
    result: Content<T>,
}

#[derive(Deserialize)]
struct Content<T> {
    content: T,
}

#[derive(Deserialize)]
struct MensaDto {
    id: i64,
    mensa: String,
    #[serde(default)]
    street: String,
    #[serde(default)]
    plz: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    timestamp: i64,
}

#[derive(Deserialize)]
struct WeeklyPlanDto {
    #[serde(default)]
    menus: Vec<MenuDto>,
}

#[derive(Deserialize)]
struct MenuDto {
    title: String,
    date: NaiveDate,
    /// Description lines, joined with newlines.
    #[serde(default)]
    menu: Vec<String>,
}

/// Web service menu source.
pub struct MensaWebSource {
    client: reqwest::Client,
    base_url: String,
    store: Arc<dyn MenuStore>,
}

impl MensaWebSource {
    /// Create a web source for `base_url` (e.g. "http://mensa.xonix.ch/v1").
    ///
    /// `store` receives every successful download and provides favorite flags.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        store: Arc<dyn MenuStore>,
    ) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DomainError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DomainError::RemoteFetch(format!("GET {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DomainError::RemoteFetch(format!(
                "GET {} returned {}: {}",
                url,
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| DomainError::RemoteFetch(format!("bad payload from {}: {}", url, e)))?;
        Ok(envelope.result.content)
    }

    async fn favorites(&self) -> HashSet<i64> {
        match self.store.favorite_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "could not read favorites; downloaded mensas start unmarked");
                HashSet::new()
            }
        }
    }
}

fn to_menuplan(dto: WeeklyPlanDto) -> WeeklyMenuplan {
    let mut plan = WeeklyMenuplan::new();
    for (id, m) in dto.menus.into_iter().enumerate() {
        plan.add(Menu::new(id as i64, m.title, m.menu.join("\n"), m.date));
    }
    plan
}

#[async_trait::async_trait]
impl MenuSource for MensaWebSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Remote
    }

    async fn load(&self) -> Result<MenuSnapshot, DomainError> {
        let list: Vec<MensaDto> = self.get_json("/mensas").await?;
        info!(count = list.len(), "downloaded mensa list");

        let favorites = self.favorites().await;
        let mut mensas = Vec::with_capacity(list.len());
        for dto in list {
            let plan: WeeklyPlanDto = self
                .get_json(&format!("/mensas/{}/weeklyplan", dto.id))
                .await?;
            debug!(mensa_id = dto.id, menus = plan.menus.len(), "downloaded weekly plan");
            mensas.push(Mensa {
                id: dto.id,
                name: dto.mensa,
                street: dto.street,
                zip: dto.plz,
                latitude: dto.lat,
                longitude: dto.lon,
                is_favorite: favorites.contains(&dto.id),
                timestamp: dto.timestamp,
                menuplan: to_menuplan(plan),
            });
        }

        let snapshot = MenuSnapshot::new(mensas);
        if let Err(e) = self.store.store_snapshot(&snapshot).await {
            warn!(error = %e, "could not cache downloaded menus");
        }
        Ok(snapshot)
    }
}
