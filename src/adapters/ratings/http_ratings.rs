//! Ratings backend adapter. Implements RatingsPort over a REST endpoint.
//!
//! `GET {ratings_url}?week=N` with application id and API key headers returns
//! `{"results": [{"menu": "<title>", "rating": 4.2, "votes": 17}]}`.
//! Ratings are matched to menus by title.

use crate::domain::{DomainError, MenuRating, MenuSnapshot};
use crate::ports::RatingsPort;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// HTTP ratings adapter.
pub struct HttpRatingsAdapter {
    client: reqwest::Client,
    url: String,
    app_id: String,
    api_key: String,
}

#[derive(Deserialize)]
struct RatingsResponse {
    results: Vec<RatingDto>,
}

#[derive(Deserialize)]
struct RatingDto {
    menu: String,
    rating: f64,
    #[serde(default)]
    votes: u32,
}

impl HttpRatingsAdapter {
    /// # Arguments
    /// * `url` - Ratings collection endpoint
    /// * `app_id` - Sent as `X-Application-Id`
    /// * `api_key` - Sent as `X-Api-Key`
    pub fn new(
        url: String,
        app_id: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url,
            app_id,
            api_key,
        })
    }

    async fn fetch(&self, week: Option<u32>) -> Result<Vec<RatingDto>, DomainError> {
        let mut request = self
            .client
            .get(&self.url)
            .header("X-Application-Id", &self.app_id)
            .header("X-Api-Key", &self.api_key);
        if let Some(week) = week {
            request = request.query(&[("week", week)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DomainError::RatingsFetch(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "ratings backend returned error");
            return Err(DomainError::RatingsFetch(format!(
                "API error {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let body: RatingsResponse = response
            .json()
            .await
            .map_err(|e| DomainError::RatingsFetch(format!("Failed to parse response: {}", e)))?;
        Ok(body.results)
    }
}

#[async_trait::async_trait]
impl RatingsPort for HttpRatingsAdapter {
    async fn enrich(&self, mut snapshot: MenuSnapshot) -> Result<MenuSnapshot, DomainError> {
        let results = self.fetch(snapshot.week.map(|w| w.number())).await?;
        let by_title: HashMap<String, MenuRating> = results
            .into_iter()
            .map(|r| {
                (
                    r.menu,
                    MenuRating {
                        average: r.rating.clamp(0.0, 5.0),
                        votes: r.votes,
                    },
                )
            })
            .collect();

        for mensa in &mut snapshot.mensas {
            for menu in mensa.menuplan.menus_mut() {
                menu.rating = by_title.get(&menu.title).copied();
            }
        }
        info!(
            ratings = by_title.len(),
            rated_menus = snapshot.rated_menus(),
            "ratings attached"
        );
        Ok(snapshot)
    }
}
