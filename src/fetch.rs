//!
//! src/fetch.rs
//!
//! Defines methods for hitting the generative and catalog endpoints and
//! returning unparsed requests. Interpretation lives with the callers.
//!

use reqwest::{Client, header, redirect, RequestBuilder};
use serde_json::json;

use crate::config::{GenerativeConfig, HttpConfig, SpotifyConfig};
use crate::errors::ServiceError;

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

fn client_with_headers(http: &HttpConfig, headers: header::HeaderMap) ->
    Result<Client, ServiceError> {
    let client = client_helper(http)
        .default_headers(headers)
        .build()?;
    Ok(client)
}

pub fn base_client(http: &HttpConfig) -> Result<Client, ServiceError> {
    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    client_with_headers(http, h)
}

#[derive(Clone, Debug)]
pub struct SpotifyClient {
    pub http: Client,
    pub cfg: SpotifyConfig
}

impl SpotifyClient {
    pub fn new(http_config: &HttpConfig, cfg: &SpotifyConfig) ->
        Result<Self, ServiceError> {

        let http = base_client(http_config)?;
        Ok( Self {
            http,
            cfg: cfg.clone()
        })
    }

    /// POST token_url, client credentials grant
    pub fn token_request(&self) -> RequestBuilder {
        self.http
            .post(self.cfg.token_url.clone())
            .basic_auth(&self.cfg.client_id, Some(&self.cfg.client_secret))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
    }

    /// GET /v1/search?type=track&q=...&limit=
    pub fn search(&self, query: &str, limit: u32, bearer: &str) ->
        Result<RequestBuilder, url::ParseError> {
        let url = self.cfg.api_base.join("search")?;
        Ok(self.http.get(url).bearer_auth(bearer).query(&[
            ("type", "track"),
            ("q", query),
            ("limit", &limit.to_string()),
        ]))
    }
}

#[derive(Clone, Debug)]
pub struct GeminiClient {
    pub http: Client,
    pub cfg: GenerativeConfig
}

impl GeminiClient {
    pub fn new(http_config: &HttpConfig, cfg: &GenerativeConfig) ->
        Result<Self, ServiceError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            header::HeaderValue::from_str(&cfg.api_key)
                .map_err(|e| ServiceError::Config(format!("invalid GEMINI_API_KEY: {e}")))?
        );
        let http = client_with_headers(http_config, headers)?;
        Ok( Self { http, cfg: cfg.clone() })
    }

    /// POST /v1beta/models/{model}:generateContent
    pub fn generate_content(&self, prompt: &str) -> Result<RequestBuilder, url::ParseError> {
        let url = self.cfg.api_base
            .join(&format!("models/{}:generateContent", self.cfg.model))?;
        Ok(self.http.post(url).json(&json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        })))
    }
}
