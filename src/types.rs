use serde::{Deserialize, Serialize};

/// Which resolver produced the query sent to the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuerySource {
    Generative,
    Fallback
}

/// Search phrase handed to the catalog. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub text: String,
    pub source: QuerySource
}

impl ResolvedQuery {
    pub fn generative(text: impl Into<String>) -> Self {
        Self { text: text.into(), source: QuerySource::Generative }
    }

    pub fn fallback(text: impl Into<String>) -> Self {
        Self { text: text.into(), source: QuerySource::Fallback }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Compact track shape returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRecord {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub image_url: Option<String>,
    pub preview_url: Option<String>,
    pub external_url: String
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResult {
    pub resolved_query: String,
    pub query_source: QuerySource,
    pub tracks: Vec<TrackRecord>
}

///
/// Raw Spotify payloads, only the fields the service consumes
///

#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub tracks: Option<TrackPage>
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackPage {
    #[serde(default)]
    pub items: Vec<RawTrack>
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<RawArtist>,
    #[serde(default)]
    pub album: Option<RawAlbum>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawArtist {
    pub name: String
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAlbum {
    #[serde(default)]
    pub images: Vec<RawImage>
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImage {
    pub url: String
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>
}
