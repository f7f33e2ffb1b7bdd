//!
//! src/catalog.rs
//!
//! Authenticates to the music catalog, searches tracks for a resolved
//! query and normalizes raw items into compact track records
//!

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::CatalogError;
use crate::fetch::SpotifyClient;
use crate::types::{AccessToken, RawTrack, SearchResponse, TrackRecord};

/// Seconds shaved off a token's lifetime before it is considered stale
pub const TOKEN_EXPIRY_SKEW: i64 = 30;
const TOKEN_LIFETIME_MAX: u64 = 86_400;

/// Credential exchange plus raw track search
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn exchange_credentials(&self) -> Result<AccessToken, CatalogError>;

    async fn search_tracks(&self, bearer: &str, query: &str, limit: u32) ->
        Result<Vec<RawTrack>, CatalogError>;
}

pub struct SpotifyCatalog {
    client: SpotifyClient
}

impl SpotifyCatalog {
    pub fn new(client: SpotifyClient) -> Self {
        Self { client }
    }
}

/// Token reply: any non-2xx, undecodable or blank token is an auth failure
fn read_token(status: StatusCode, body: &str) -> Result<AccessToken, CatalogError> {
    if !status.is_success() {
        return Err(CatalogError::Auth(format!("token status {status}: {body}")));
    }

    let token: AccessToken = serde_json::from_str(body)
        .map_err(|e| CatalogError::Auth(format!("token body: {e}")))?;

    if token.access_token.trim().is_empty() {
        return Err(CatalogError::Auth("empty access_token".to_string()));
    }
    Ok(token)
}

/// Search reply: 401 means the bearer was rejected, a missing tracks object is empty
fn read_search(status: StatusCode, body: &str) -> Result<Vec<RawTrack>, CatalogError> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(CatalogError::Auth("bearer rejected by search".to_string()));
    }
    if !status.is_success() {
        return Err(CatalogError::Search(format!("search status {status}: {body}")));
    }

    let page: SearchResponse = serde_json::from_str(body)?;
    Ok(page.tracks.map(|t| t.items).unwrap_or_default())
}

#[async_trait]
impl CatalogProvider for SpotifyCatalog {
    async fn exchange_credentials(&self) -> Result<AccessToken, CatalogError> {
        let response = self.client.token_request()
            .send()
            .await
            .map_err(|e| CatalogError::Auth(e.to_string()))?;

        let status = response.status();
        let body = response.text()
            .await
            .map_err(|e| CatalogError::Auth(format!("token body: {e}")))?;
        read_token(status, &body)
    }

    async fn search_tracks(&self, bearer: &str, query: &str, limit: u32) ->
        Result<Vec<RawTrack>, CatalogError> {
        let request = self.client.search(query, limit, bearer)
            .map_err(|e| CatalogError::Search(format!("search url: {e}")))?;

        let response = request.send()
            .await
            .map_err(|e| CatalogError::Search(e.to_string()))?;

        let status = response.status();
        let body = response.text()
            .await
            .map_err(|e| CatalogError::Search(e.to_string()))?;
        read_search(status, &body)
    }
}

/// Maps one raw item, a missing primary artist or web link is malformed
pub fn normalize(raw: RawTrack) -> Result<TrackRecord, CatalogError> {
    let artist = raw.artists
        .into_iter()
        .next()
        .map(|a| a.name)
        .ok_or_else(|| CatalogError::Malformed(format!("track {} has no artists", raw.id)))?;

    let external_url = raw.external_urls.spotify
        .ok_or_else(|| CatalogError::Malformed(format!("track {} has no web link", raw.id)))?;

    let image_url = raw.album
        .and_then(|album| album.images.into_iter().next())
        .map(|image| image.url);

    Ok(TrackRecord {
        id: raw.id,
        name: raw.name,
        artist,
        image_url,
        preview_url: raw.preview_url,
        external_url
    })
}

/// Keeps provider order, drops repeated ids, caps at `limit`
pub fn normalize_page(raw: Vec<RawTrack>, limit: u32) ->
    Result<Vec<TrackRecord>, CatalogError> {
    let mut seen = HashSet::new();
    let mut tracks = Vec::with_capacity(raw.len().min(limit as usize));

    for item in raw {
        let track = normalize(item)?;
        if !seen.insert(track.id.clone()) {
            debug!(id = %track.id, "catalog.duplicate");
            continue;
        }
        tracks.push(track);
    }
    tracks.truncate(limit as usize);
    Ok(tracks)
}

#[derive(Debug, Clone)]
struct CachedToken {
    bearer: String,
    expires_at: DateTime<Utc>
}

/// Shared bearer token, refreshed once it is within the skew of expiry
#[derive(Debug)]
pub struct TokenCache {
    slot: Mutex<Option<CachedToken>>,
    skew: chrono::Duration
}

impl Default for TokenCache {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
            skew: chrono::Duration::seconds(TOKEN_EXPIRY_SKEW)
        }
    }
}

impl TokenCache {
    async fn bearer(&self, provider: &dyn CatalogProvider) -> Result<String, CatalogError> {
        let mut slot = self.slot.lock().await;
        let now = Utc::now();

        if let Some(cached) = slot.as_ref() {
            if cached.expires_at - self.skew > now {
                return Ok(cached.bearer.clone());
            }
        }

        let token = provider.exchange_credentials().await?;
        *slot = token.expires_in.map(|secs| CachedToken {
            bearer: token.access_token.clone(),
            expires_at: now + chrono::Duration::seconds(secs.min(TOKEN_LIFETIME_MAX) as i64)
        });
        debug!(cached = slot.is_some(), "catalog.token.refresh");
        Ok(token.access_token)
    }

    async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}

#[derive(Clone)]
pub struct CatalogSearchClient {
    provider: Arc<dyn CatalogProvider>,
    tokens: Option<Arc<TokenCache>>
}

impl CatalogSearchClient {
    /// Re-authenticates on every search
    pub fn new(provider: Arc<dyn CatalogProvider>) -> Self {
        Self { provider, tokens: None }
    }

    pub fn with_token_cache(mut self) -> Self {
        self.tokens = Some(Arc::new(TokenCache::default()));
        self
    }

    async fn bearer(&self) -> Result<String, CatalogError> {
        match &self.tokens {
            Some(cache) => cache.bearer(self.provider.as_ref()).await,
            None => Ok(self.provider.exchange_credentials().await?.access_token)
        }
    }

    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<TrackRecord>, CatalogError> {
        let bearer = self.bearer().await?;

        let raw = match self.provider.search_tracks(&bearer, query, limit).await {
            Ok(raw) => raw,
            Err(e) => {
                if let (CatalogError::Auth(_), Some(cache)) = (&e, &self.tokens) {
                    warn!("catalog.token.rejected");
                    cache.invalidate().await;
                }
                return Err(e);
            }
        };

        let tracks = normalize_page(raw, limit)?;
        info!(query = %query, limit, count = tracks.len(), "catalog.search");
        Ok(tracks)
    }
}
