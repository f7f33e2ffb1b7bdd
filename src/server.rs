//!
//! src/server.rs
//!
//! Inbound surface: resolves a mood into a query, searches the catalog
//! and shapes the response or the generic error
//!

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::catalog::CatalogSearchClient;
use crate::errors::CatalogError;
use crate::pipeline::QueryResolutionPipeline;
use crate::types::RecommendationResult;

/// Runs one request end to end, no state carried between calls
#[derive(Clone)]
pub struct Recommender {
    pipeline: QueryResolutionPipeline,
    catalog: CatalogSearchClient,
    limit: u32
}

impl Recommender {
    pub fn new(pipeline: QueryResolutionPipeline, catalog: CatalogSearchClient, limit: u32) -> Self {
        Self { pipeline, catalog, limit }
    }

    pub async fn recommend(&self, mood: &str) -> Result<RecommendationResult, CatalogError> {
        if mood.trim().is_empty() {
            warn!("recommend.empty_mood");
        }

        let query = self.pipeline.resolve(mood).await;
        let tracks = self.catalog.search(query.as_str(), self.limit).await?;

        Ok(RecommendationResult {
            resolved_query: query.text,
            query_source: query.source,
            tracks
        })
    }
}

/// Caller only ever sees one failure class
#[derive(Debug)]
pub enum ApiError {
    Server
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Server => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Server Error" }))
            ).into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendBody {
    #[serde(default)]
    pub mood: Option<String>
}

#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>
}

async fn recommend(
    State(state): State<AppState>,
    body: Result<Json<RecommendBody>, JsonRejection>
) -> Result<Json<RecommendationResult>, ApiError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("recommend", request_id = %request_id);

    async move {
        let body = match body {
            Ok(Json(body)) => body,
            Err(rejection) => {
                warn!(error = %rejection, "recommend.bad_body");
                return Err(ApiError::Server);
            }
        };
        let mood = body.mood.unwrap_or_default();
        info!(mood = %mood, "recommend.received");

        match state.recommender.recommend(&mood).await {
            Ok(result) => {
                info!(
                    query = %result.resolved_query,
                    source = ?result.query_source,
                    count = result.tracks.len(),
                    "recommend.done"
                );
                Ok(Json(result))
            }
            Err(e) => {
                error!(kind = e.kind(), error = %e, "recommend.failed");
                Err(ApiError::Server)
            }
        }
    }
    .instrument(span)
    .await
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/recommend", post(recommend))
        .route("/health", get(health))
        .with_state(state)
}
