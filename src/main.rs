//!
//! src/main.rs
//!
//! Wires configuration, logging, provider clients and the http surface
//! of the mood to music recommendation service
//!
//!

mod config;
mod errors;
mod logging;
mod types;

mod fetch;
mod fallback;
mod generative;
mod pipeline;
mod catalog;
mod server;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::{CatalogSearchClient, SpotifyCatalog};
use crate::errors::ServiceError;
use crate::fallback::KeywordFallbackResolver;
use crate::generative::{GeminiGenerator, GenerativeQueryResolver};
use crate::pipeline::QueryResolutionPipeline;
use crate::server::{AppState, Recommender};

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    let cfgs = config::load_config()?;
    let _guard = logging::init_logging(&cfgs.logging)?;

    info!(
        service = "mood-tunes",
        version = %env!("CARGO_PKG_VERSION"),
        "starting"
    );

    let gemini  = fetch::GeminiClient::new(&cfgs.http, &cfgs.generative)?;
    let spotify = fetch::SpotifyClient::new(&cfgs.http, &cfgs.spotify)?;

    let pipeline = QueryResolutionPipeline::new(
        GenerativeQueryResolver::new(Arc::new(GeminiGenerator::new(gemini))),
        KeywordFallbackResolver::default(),
        cfgs.generative.timeout
    );

    let mut catalog = CatalogSearchClient::new(Arc::new(SpotifyCatalog::new(spotify)));
    if cfgs.search.token_cache {
        catalog = catalog.with_token_cache();
    }

    let recommender = Recommender::new(pipeline, catalog, cfgs.search.limit);
    let app = server::router(AppState { recommender: Arc::new(recommender) });

    let shutdown = CancellationToken::new();
    let trigger = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!(msg = "shutting server down", "server.signal");
                shutdown.cancel();
            }
        })
    };

    let listener = tokio::net::TcpListener::bind(cfgs.server.bind_addr).await?;
    info!(
        addr = %cfgs.server.bind_addr,
        model = %cfgs.generative.model,
        timeout_ms = cfgs.generative.timeout.as_millis() as u64,
        limit = cfgs.search.limit,
        token_cache = cfgs.search.token_cache,
        "server.start"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await?;

    trigger.abort();
    info!("server.exit");
    Ok(())
}
