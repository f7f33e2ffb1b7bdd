//!
//! src/errors.rs
//!
//! Defines enums and methods of error conversion
//! for errors the service uses
//!
//!

use std::time::Duration;

use thiserror::Error;

/// Process level failures: startup, config, serving
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self { ServiceError::Http(e.to_string()) }
}

/// Failures of the generative text provider. Never leave the pipeline.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("provider timed out after {0:?}")]
    Timeout(Duration),
    #[error("provider rejected credentials: {0}")]
    Auth(String),
    #[error("provider rate limited")]
    RateLimited,
    #[error("provider status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("http error: {0}")]
    Http(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("provider task aborted: {0}")]
    Aborted(String)
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self { ProviderError::Http(e.to_string()) }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self { ProviderError::Malformed(e.to_string()) }
}

/// Failures of the music catalog. Terminal for a request.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("auth error: {0}")]
    Auth(String),
    #[error("search error: {0}")]
    Search(String),
    #[error("malformed catalog data: {0}")]
    Malformed(String)
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self { CatalogError::Malformed(e.to_string()) }
}

impl CatalogError {
    /// Short stable tag for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::Auth(_)      => "auth",
            CatalogError::Search(_)    => "search",
            CatalogError::Malformed(_) => "malformed"
        }
    }
}
