//!
//! src/config.rs
//!
//! Reads environment at process start and assembles the configuration
//! every other module is built from
//!

use std::{net::SocketAddr, time};

use url::Url;

use crate::errors::ServiceError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 16;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

/// Constants for the recommendation flow
pub const AI_TIMEOUT_MS: u64 = 3000;
pub const SEARCH_LIMIT: u32 = 12;
pub const SEARCH_LIMIT_MAX: u32 = 50;
pub const GEMINI_MODEL: &str = "gemini-1.5-flash-latest";
pub const BIND_ADDR: &str = "127.0.0.1:3000";

/// Source of raw variables, process env in production and a map in tests
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Returns an invalid environment var error on missing or blank values
fn env_check(env: EnvLookup, s: &str) -> Result<String, ServiceError> {
    match env(s) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ServiceError::Config(format!("{s} was not set"))),
    }
}

fn env_or(env: EnvLookup, s: &str, default: &str) -> String {
    env(s)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

fn ensure_host(url: &Url, expected_host: &str) -> Result<(), String> {
    match url.host_str() {
        Some(h) if h.eq_ignore_ascii_case(expected_host) => Ok(()),
        Some(h) => Err(
            format!("Unexpected host for {url} (got {h}, expected {expected_host})")
        ),
        None => Err(format!("URL missing host: {url}"))
    }
}

/// Parses, validates and slash terminates a base url so `join` appends
fn checked_url(
    var: &str,
    raw: &str,
    host: &str,
    trailing_slash: bool
) -> Result<Url, ServiceError> {
    let mut url = Url::parse(raw)
        .map_err(|e| ServiceError::Config(format!("{var} invalid {e}")))?;

    ensure_https(&url).map_err(ServiceError::Config)?;
    ensure_host(&url, host).map_err(ServiceError::Config)?;

    if trailing_slash && !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
    Ok(url)
}

pub fn parse_limit(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(SEARCH_LIMIT)
        .clamp(1, SEARCH_LIMIT_MAX)
}

pub fn parse_timeout(raw: Option<&str>) -> time::Duration {
    let ms = raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(AI_TIMEOUT_MS);
    time::Duration::from_millis(ms)
}

pub fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

///
/// Configuration for the generative text provider
///
#[derive(Debug, Clone)]
pub struct GenerativeConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: Url,
    pub timeout: time::Duration    // race deadline, default 3s
}

fn build_generative(env: EnvLookup) -> Result<GenerativeConfig, ServiceError> {
    let api_key  = env_check(env, "GEMINI_API_KEY")?;
    let model    = env_or(env, "GEMINI_MODEL", GEMINI_MODEL);
    let api_base = env_or(
        env, "GEMINI_API_BASE", "https://generativelanguage.googleapis.com/v1beta/"
    );
    let api_base = checked_url(
        "GEMINI_API_BASE", &api_base, "generativelanguage.googleapis.com", true
    )?;
    let timeout = parse_timeout(env("AI_TIMEOUT_MS").as_deref());

    Ok( GenerativeConfig { api_key, model, api_base, timeout } )
}

/// Configuration that Spotify expects when hitting endpoints
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: Url,
    pub api_base: Url,
}

fn build_spotify(env: EnvLookup) -> Result<SpotifyConfig, ServiceError> {
    let client_id     = env_check(env, "SPOTIFY_CLIENT_ID")?;
    let client_secret = env_check(env, "SPOTIFY_CLIENT_SECRET")?;

    // form urls
    let token_url = env_or(env, "SPOTIFY_TOKEN_URL", "https://accounts.spotify.com/api/token");
    let api_base  = env_or(env, "SPOTIFY_API_BASE", "https://api.spotify.com/v1/");

    let token_url = checked_url("SPOTIFY_TOKEN_URL", &token_url, "accounts.spotify.com", false)?;
    let api_base  = checked_url("SPOTIFY_API_BASE", &api_base, "api.spotify.com", true)?;

    Ok( SpotifyConfig { client_id, client_secret, token_url, api_base })
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub limit: u32,          // default 12
    pub token_cache: bool    // reuse bearer tokens across requests
}

fn build_search(env: EnvLookup) -> SearchConfig {
    SearchConfig {
        limit: parse_limit(env("SEARCH_LIMIT").as_deref()),
        token_cache: parse_flag(env("CATALOG_TOKEN_CACHE").as_deref())
    }
}

///
/// Configuration for Http timeouts, pools, etc.
///
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr
}

fn build_server(env: EnvLookup) -> Result<ServerConfig, ServiceError> {
    let raw = env_or(env, "BIND_ADDR", BIND_ADDR);
    let bind_addr = raw.parse::<SocketAddr>()
        .map_err(|e| ServiceError::Config(format!("BIND_ADDR invalid {e}")))?;
    Ok( ServerConfig { bind_addr } )
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,mood_tunes=debug,reqwest=warn".to_string(),
            format: LogFormat::Json,
            with_ansi: true,
            include_file_line: true,
            include_target: true,
        }
    }
}

fn build_logging(env: EnvLookup) -> LoggingConfig {
    let format = match env("LOG_FORMAT").map(|s| s.to_ascii_lowercase()).as_deref() {
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::Json
    };
    LoggingConfig { format, ..LoggingConfig::default() }
}

///
/// AppConfig which holds everything the clients and server are built from
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub generative: GenerativeConfig,
    pub spotify: SpotifyConfig,
    pub search: SearchConfig,
    pub http: HttpConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig
}

pub fn build_config(env: EnvLookup) -> Result<AppConfig, ServiceError> {
    let generative = build_generative(env)?;
    let spotify    = build_spotify(env)?;
    let search     = build_search(env);
    let http       = HttpConfig::default();
    let server     = build_server(env)?;
    let logging    = build_logging(env);

    Ok( AppConfig { generative, spotify, search, http, server, logging } )
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, ServiceError> {
    dotenvy::dotenv().ok();
    build_config(&|key| std::env::var(key).ok())
}
