//!
//! src/pipeline.rs
//!
//! Two tier query resolution: generative first, keyword rules whenever the
//! generative attempt fails or runs out of time
//!

use std::time::Duration;

use tracing::{info, warn};

use crate::fallback::KeywordFallbackResolver;
use crate::generative::GenerativeQueryResolver;
use crate::types::ResolvedQuery;

#[derive(Clone)]
pub struct QueryResolutionPipeline {
    generative: GenerativeQueryResolver,
    fallback: KeywordFallbackResolver,
    deadline: Duration
}

impl QueryResolutionPipeline {
    pub fn new(
        generative: GenerativeQueryResolver,
        fallback: KeywordFallbackResolver,
        deadline: Duration
    ) -> Self {
        Self { generative, fallback, deadline }
    }

    /// Never fails; the return type carries which resolver produced the query
    pub async fn resolve(&self, mood: &str) -> ResolvedQuery {
        match self.generative.resolve(mood, self.deadline).await {
            Ok(phrase) => {
                info!(query = %phrase, "pipeline.generative");
                ResolvedQuery::generative(phrase)
            }
            Err(e) => {
                let query = self.fallback.resolve(mood);
                warn!(error = %e, query = %query, "pipeline.fallback");
                ResolvedQuery::fallback(query)
            }
        }
    }
}
