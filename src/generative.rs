//!
//! src/generative.rs
//!
//! Asks a text generation provider for a short search phrase, racing the
//! call against a deadline
//!

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::ProviderError;
use crate::fetch::GeminiClient;

/// Opaque text generation capability
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn model(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>
}

#[derive(Debug, Default, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>
}

/// Concatenates the text parts of the first candidate
fn extract_text(body: &serde_json::Value) -> Result<String, ProviderError> {
    let response = GenerateResponse::deserialize(body)?;
    let content = response.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| ProviderError::Malformed("no candidates in response".to_string()))?;

    let text: String = content.parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.is_empty() {
        return Err(ProviderError::Malformed("candidate has no text".to_string()));
    }
    Ok(text)
}

fn status_error(status: reqwest::StatusCode, body: String) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::Auth(body),
        429       => ProviderError::RateLimited,
        code      => ProviderError::Status { status: code, body }
    }
}

pub struct GeminiGenerator {
    client: GeminiClient
}

impl GeminiGenerator {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    fn model(&self) -> &str {
        &self.client.cfg.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = self.client.generate_content(prompt)
            .map_err(|e| ProviderError::Http(format!("gemini url: {e}")))?;

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let body: serde_json::Value = response.json().await?;
        extract_text(&body)
    }
}

pub fn build_prompt(mood: &str) -> String {
    format!(
        "User mood: \"{mood}\"\n\
         Suggest a short Spotify search query (max 3 words).\n\
         Return ONLY the text."
    )
}

#[derive(Clone)]
pub struct GenerativeQueryResolver {
    generator: Arc<dyn TextGenerator>
}

impl GenerativeQueryResolver {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// The provider call runs detached; on timeout its handle is dropped
    /// and whatever it later produces is discarded.
    pub async fn resolve(&self, mood: &str, deadline: Duration) ->
        Result<String, ProviderError> {
        let prompt = build_prompt(mood);
        let generator = Arc::clone(&self.generator);
        let call = tokio::spawn(async move { generator.generate(&prompt).await });

        let outcome = tokio::select! {
            biased;
            joined = call => match joined {
                Ok(result) => result,
                Err(e) => Err(ProviderError::Aborted(e.to_string()))
            },
            _ = sleep(deadline) => {
                warn!(model = self.generator.model(), deadline_ms = deadline.as_millis() as u64,
                    "generative.timeout");
                Err(ProviderError::Timeout(deadline))
            }
        };

        let reply = outcome?;
        let phrase = reply.trim();
        if phrase.is_empty() {
            return Err(ProviderError::Malformed("empty phrase".to_string()));
        }

        debug!(model = self.generator.model(), phrase = %phrase, "generative.resolved");
        Ok(phrase.to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    /// Scripted generator: replies (or fails) after a delay
    pub(crate) struct StubGenerator {
        pub reply: Option<String>,
        pub delay: Duration,
        pub calls: AtomicUsize,
        pub finished: AtomicBool,
        pub last_prompt: std::sync::Mutex<Option<String>>
    }

    impl StubGenerator {
        pub(crate) fn replying(text: &str, delay: Duration) -> Self {
            Self {
                reply: Some(text.to_string()),
                delay,
                calls: AtomicUsize::new(0),
                finished: AtomicBool::new(false),
                last_prompt: std::sync::Mutex::new(None)
            }
        }

        pub(crate) fn failing() -> Self {
            Self { reply: None, ..Self::replying("", Duration::ZERO) }
        }
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        fn model(&self) -> &str { "stub" }

        async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            sleep(self.delay).await;
            self.finished.store(true, Ordering::SeqCst);
            match &self.reply {
                Some(text) => Ok(text.clone()),
                None => Err(ProviderError::Auth("stub rejects key".to_string()))
            }
        }
    }

    const DEADLINE: Duration = Duration::from_secs(3);

    #[tokio::test(start_paused = true)]
    async fn reply_within_deadline_is_trimmed() {
        let stub = Arc::new(StubGenerator::replying("  Dance Party Hits \n", Duration::from_millis(500)));
        let resolver = GenerativeQueryResolver::new(stub.clone());

        let phrase = resolver.resolve("อยากเต้น", DEADLINE).await.unwrap();
        assert_eq!(phrase, "Dance Party Hits");
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn prompt_embeds_mood_and_word_limit() {
        let stub = Arc::new(StubGenerator::replying("Lofi", Duration::ZERO));
        let resolver = GenerativeQueryResolver::new(stub.clone());
        resolver.resolve("เหนื่อย", DEADLINE).await.unwrap();

        let prompt = stub.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("User mood: \"เหนื่อย\""));
        assert!(prompt.contains("max 3 words"));
        assert!(prompt.contains("Return ONLY the text."));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out_and_is_left_running() {
        let stub = Arc::new(StubGenerator::replying("Too Late", Duration::from_secs(5)));
        let resolver = GenerativeQueryResolver::new(stub.clone());

        let started = tokio::time::Instant::now();
        let err = resolver.resolve("เศร้า", DEADLINE).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(d) if d == DEADLINE));
        assert!(started.elapsed() >= DEADLINE);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!stub.finished.load(Ordering::SeqCst));

        // the detached call still runs to completion, nobody waits on it
        sleep(Duration::from_secs(3)).await;
        assert!(stub.finished.load(Ordering::SeqCst));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn provider_failure_is_returned() {
        let resolver = GenerativeQueryResolver::new(Arc::new(StubGenerator::failing()));
        let err = resolver.resolve("เศร้า", DEADLINE).await.unwrap_err();
        assert!(matches!(err, ProviderError::Auth(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn blank_reply_is_malformed() {
        let resolver = GenerativeQueryResolver::new(
            Arc::new(StubGenerator::replying(" \n\t ", Duration::ZERO))
        );
        let err = resolver.resolve("เศร้า", DEADLINE).await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[test]
    fn extract_text_joins_first_candidate_parts() {
        let body = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "Sad " }, { "text": "Piano" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        });
        assert_eq!(extract_text(&body).unwrap(), "Sad Piano");
    }

    #[test]
    fn extract_text_rejects_missing_candidates() {
        assert!(matches!(extract_text(&json!({})), Err(ProviderError::Malformed(_))));
        assert!(matches!(
            extract_text(&json!({ "candidates": [{ "finishReason": "SAFETY" }] })),
            Err(ProviderError::Malformed(_))
        ));
        assert!(matches!(
            extract_text(&json!({ "candidates": "nope" })),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn reply_just_inside_deadline_wins() {
        let inside = Arc::new(StubGenerator::replying("Chill Vibes", DEADLINE - Duration::from_millis(1)));
        let phrase = GenerativeQueryResolver::new(inside).resolve("ชิล", DEADLINE).await.unwrap();
        assert_eq!(phrase, "Chill Vibes");

        let outside = Arc::new(StubGenerator::replying("Chill Vibes", DEADLINE + Duration::from_millis(1)));
        let err = GenerativeQueryResolver::new(outside).resolve("ชิล", DEADLINE).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }

    #[test]
    fn status_mapping() {
        use reqwest::StatusCode;
        assert!(matches!(status_error(StatusCode::FORBIDDEN, String::new()), ProviderError::Auth(_)));
        assert!(matches!(status_error(StatusCode::TOO_MANY_REQUESTS, String::new()), ProviderError::RateLimited));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, "no model".into()),
            ProviderError::Status { status: 404, .. }
        ));
    }

    fn live() -> bool {
        std::env::var("LIVE_HTTP").ok().as_deref() == Some("1")
    }

    #[tokio::test]
    async fn gemini_generator_testbench() -> Result<(), crate::errors::ServiceError> {
        dotenvy::dotenv().ok();

        if !live() {
            eprintln!("Set LIVE_HTTP=1 to run");
            return Ok(())
        }

        let cfgs = crate::config::load_config()?;
        let client = GeminiClient::new(&cfgs.http, &cfgs.generative)?;
        let resolver = GenerativeQueryResolver::new(Arc::new(GeminiGenerator::new(client)));

        match resolver.resolve("อยากเต้น", cfgs.generative.timeout).await {
            Ok(phrase) => println!("phrase: {phrase}"),
            Err(e) => println!("provider failed: {e}")
        }
        Ok(())
    }
}
