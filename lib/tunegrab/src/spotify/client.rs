use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use crate::error::{GrabError, Result};
use crate::spotify::models::{RawAlbum, RawTrack, TokenResponse, TrackPage};
use crate::traits::CatalogApi;

const API_BASE: &str = "https://api.spotify.com/v1/";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Page size for album track listings; the catalog caps pages at 50.
const PAGE_LIMIT: u32 = 50;

/// Slack subtracted from the advertised token lifetime so a token is never
/// used right at its expiry boundary.
const TOKEN_EXPIRY_SLACK_SECS: i64 = 30;

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Client-credentials client for the Spotify Web API (the catalog provider).
#[derive(Debug)]
pub struct SpotifyClient {
    api_base: Url,
    token_url: Url,
    client_id: String,
    client_secret: String,
    client: Client,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Default)]
pub struct SpotifyClientBuilder {
    client_id: Option<String>,
    client_secret: Option<String>,
    api_base: Option<String>,
    token_url: Option<String>,
}

impl SpotifyClientBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn client_id(mut self, id: &str) -> Self {
        self.client_id = Some(id.to_string());
        self
    }

    pub fn client_secret(mut self, secret: &str) -> Self {
        self.client_secret = Some(secret.to_string());
        self
    }

    /// Override the API base URL, mainly for tests against a local server.
    pub fn api_base(mut self, url: &str) -> Self {
        self.api_base = Some(url.to_string());
        self
    }

    pub fn token_url(mut self, url: &str) -> Self {
        self.token_url = Some(url.to_string());
        self
    }

    pub fn build(self) -> Result<SpotifyClient> {
        let client_id = self.client_id.filter(|s| !s.is_empty());
        let client_secret = self.client_secret.filter(|s| !s.is_empty());
        let (client_id, client_secret) = match (client_id, client_secret) {
            (Some(id), Some(secret)) => (id, secret),
            _ => return Err(GrabError::NotConfigured),
        };

        let api_base = Url::parse(self.api_base.as_deref().unwrap_or(API_BASE))?;
        let token_url = Url::parse(self.token_url.as_deref().unwrap_or(TOKEN_URL))?;

        Ok(SpotifyClient {
            api_base,
            token_url,
            client_id,
            client_secret,
            client: Client::new(),
            token: Mutex::new(None),
        })
    }
}

impl SpotifyClient {
    pub fn builder() -> SpotifyClientBuilder {
        SpotifyClientBuilder::new()
    }

    /// Returns a valid bearer token, requesting a fresh one when the cached
    /// token is absent or expired.
    async fn bearer_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(token.value.clone());
            }
        }

        info!("Requesting catalog access token");
        let basic = BASE64.encode(format!("{}:{}", self.client_id, self.client_secret));
        let response = self
            .client
            .post(self.token_url.clone())
            .header(reqwest::header::AUTHORIZATION, format!("Basic {basic}"))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let token: TokenResponse = Self::handle_response(response).await?;

        let expires_at =
            Utc::now() + Duration::seconds((token.expires_in - TOKEN_EXPIRY_SLACK_SECS).max(0));
        *guard = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at,
        });
        Ok(token.access_token)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = self.api_base.join(endpoint)?;
        debug!("Request: GET {}", url);
        let token = self.bearer_token().await?;
        let response = self.client.get(url).bearer_auth(token).send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            let text = response.text().await?;
            serde_json::from_str(&text).map_err(|e| GrabError::Api {
                status: status.as_u16(),
                message: format!("JSON parse error: {e}"),
            })
        } else {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            Err(GrabError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    /// Maps a 404 from the catalog to "no record" rather than an error.
    fn absent_on_404<T>(result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(GrabError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait::async_trait]
impl CatalogApi for SpotifyClient {
    async fn track(&self, id: &str) -> Result<Option<RawTrack>> {
        Self::absent_on_404(self.get(&format!("tracks/{id}")).await)
    }

    async fn album(&self, id: &str) -> Result<Option<RawAlbum>> {
        Self::absent_on_404(self.get(&format!("albums/{id}")).await)
    }

    async fn album_tracks(&self, id: &str, offset: u32) -> Result<TrackPage> {
        self.get(&format!(
            "albums/{id}/tracks?limit={PAGE_LIMIT}&offset={offset}"
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_credentials() {
        assert!(matches!(
            SpotifyClient::builder().build(),
            Err(GrabError::NotConfigured)
        ));
        assert!(matches!(
            SpotifyClient::builder().client_id("id").build(),
            Err(GrabError::NotConfigured)
        ));
        assert!(matches!(
            SpotifyClient::builder()
                .client_id("id")
                .client_secret("")
                .build(),
            Err(GrabError::NotConfigured)
        ));
    }

    #[test]
    fn builder_accepts_full_credentials() {
        let client = SpotifyClient::builder()
            .client_id("id")
            .client_secret("secret")
            .build()
            .unwrap();
        assert_eq!(client.api_base.as_str(), API_BASE);
    }
}
