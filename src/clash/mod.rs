// Clash Royale player API client.

pub mod player;

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;

use crate::metrics;
pub use player::{normalize_tag, Player};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("upstream returned status {0}")]
    Status(StatusCode),
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid upstream URL: {0}")]
    InvalidUrl(String),
    #[error("upstream response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of current player data, keyed by player tag.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn player(&self, tag: &str) -> Result<Player, ClientError>;
}

/// Authenticated client for the player endpoint of the proxy API.
pub struct ClashClient {
    http: Client,
    base_url: String,
    token: String,
}

impl ClashClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Player endpoint URL for `tag`. The whole `#TAG` is pushed as one
    /// percent-encoded path segment, so `/`, `?` and `#` in user input stay
    /// inside it.
    pub fn player_url(&self, tag: &str) -> Result<Url, ClientError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .push("players")
            .push(&format!("#{}", normalize_tag(tag)));
        Ok(url)
    }

    async fn fetch(&self, tag: &str) -> Result<Player, ClientError> {
        let response = self
            .http
            .get(self.player_url(tag)?)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ClientError::Status(status));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl StatsSource for ClashClient {
    async fn player(&self, tag: &str) -> Result<Player, ClientError> {
        let started = Instant::now();
        let result = self.fetch(tag).await;
        metrics::UPSTREAM_REQUEST_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());

        let outcome = match &result {
            Ok(_) => "ok",
            Err(ClientError::Status(status)) if *status == StatusCode::NOT_FOUND => "not_found",
            Err(_) => "error",
        };
        metrics::UPSTREAM_REQUESTS_TOTAL
            .with_label_values(&[outcome])
            .inc();

        if let Err(e) = &result {
            tracing::warn!("Player lookup for {tag} failed: {e}");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_url() {
        let client = ClashClient::new("https://proxy.royaleapi.dev/v1/", "token");
        assert_eq!(
            client.player_url("#abc123").unwrap().as_str(),
            "https://proxy.royaleapi.dev/v1/players/%23ABC123"
        );
        assert_eq!(
            client.player_url("ABC123").unwrap().as_str(),
            "https://proxy.royaleapi.dev/v1/players/%23ABC123"
        );
    }

    #[test]
    fn test_player_url_keeps_tag_in_one_segment() {
        let client = ClashClient::new("https://proxy.royaleapi.dev/v1", "token");

        let url = client.player_url("X/../../clans/%23Y").unwrap();
        assert_eq!(url.host_str(), Some("proxy.royaleapi.dev"));
        assert_eq!(url.path_segments().unwrap().count(), 3);
        assert!(url.path().starts_with("/v1/players/%23X%2F"));

        let url = client.player_url("a?b#c").unwrap();
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
        assert_eq!(url.path_segments().unwrap().count(), 3);
    }

    #[test]
    fn test_invalid_base_url() {
        let client = ClashClient::new("not a url", "token");
        assert!(matches!(
            client.player_url("#ABC"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    async fn spawn_fake_upstream() -> String {
        use axum::{
            extract::Path,
            http::{HeaderMap, StatusCode as HttpStatus},
            routing::get,
            Json, Router,
        };

        async fn player(Path(tag): Path<String>, headers: HeaderMap) -> axum::response::Response {
            use axum::response::IntoResponse;
            let authorized = headers
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                == Some("Bearer secret");
            if !authorized {
                return HttpStatus::FORBIDDEN.into_response();
            }
            match tag.as_str() {
                "#ABC123" => Json(serde_json::json!({
                    "tag": "#ABC123",
                    "name": "Knight",
                    "trophies": 4000,
                    "arena": {"name": "Legendary Arena"},
                    "wins": 7,
                    "losses": 3
                }))
                .into_response(),
                "#GARBAGE" => "not json".into_response(),
                _ => HttpStatus::NOT_FOUND.into_response(),
            }
        }

        let app = Router::new().route("/v1/players/{tag}", get(player));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    #[tokio::test]
    async fn test_fetch_player() {
        let base = spawn_fake_upstream().await;
        let client = ClashClient::new(&base, "secret");

        let player = client.player("#abc123").await.unwrap();
        assert_eq!(player.name, "Knight");
        assert_eq!(player.trophies, 4000);
        assert_eq!(player.winrate(), 70.0);
    }

    #[tokio::test]
    async fn test_fetch_failures() {
        let base = spawn_fake_upstream().await;
        let client = ClashClient::new(&base, "secret");

        assert!(matches!(
            client.player("#NOPE").await,
            Err(ClientError::Status(s)) if s == StatusCode::NOT_FOUND
        ));
        assert!(matches!(
            client.player("garbage").await,
            Err(ClientError::Decode(_))
        ));

        let unauthorized = ClashClient::new(&base, "wrong");
        assert!(matches!(
            unauthorized.player("#ABC123").await,
            Err(ClientError::Status(s)) if s == StatusCode::FORBIDDEN
        ));
    }
}
