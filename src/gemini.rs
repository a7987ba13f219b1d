//! Minimal Gemini client for our use-cases.
//!
//! We only call `models/{model}:generateContent` with a single user text part
//! and read back the concatenated text of the first candidate.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key. No retry and no cancellation; a request
//! timeout only applies when GEMINI_TIMEOUT_SECS is set.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_UNIT_MODEL: &str = "gemini-3-pro-preview";
const DEFAULT_HELPER_MODEL: &str = "gemini-3-flash-preview";

/// One-shot text generation: a model id, a single prompt, an optional temperature.
#[async_trait]
pub trait TextModel: Send + Sync {
  async fn generate_text(&self, model: &str, prompt: &str, temperature: Option<f32>) -> Result<String, String>;
}

/// Model identifiers used by the orchestrator.
#[derive(Clone, Debug)]
pub struct ModelNames {
  /// Full unit generation and refinement.
  pub unit: String,
  /// Cheaper model for the subject suggestion helper.
  pub helper: String,
}

impl Default for ModelNames {
  fn default() -> Self {
    Self { unit: DEFAULT_UNIT_MODEL.into(), helper: DEFAULT_HELPER_MODEL.into() }
  }
}

impl ModelNames {
  pub fn from_env() -> Self {
    Self {
      unit: std::env::var("GEMINI_UNIT_MODEL").unwrap_or_else(|_| DEFAULT_UNIT_MODEL.into()),
      helper: std::env::var("GEMINI_HELPER_MODEL").unwrap_or_else(|_| DEFAULT_HELPER_MODEL.into()),
    }
  }
}

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
}

impl Gemini {
  /// Construct the client if we find GEMINI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());

    let mut builder = reqwest::Client::builder();
    if let Some(secs) = std::env::var("GEMINI_TIMEOUT_SECS").ok().and_then(|s| s.parse::<u64>().ok()) {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = builder.build().ok()?;

    Some(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string() })
  }

  fn endpoint(&self, model: &str) -> String {
    format!("{}/models/{}:generateContent", self.base_url, model)
  }
}

#[async_trait]
impl TextModel for Gemini {
  #[instrument(level = "info", skip(self, prompt, model, temperature), fields(model = %model, prompt_len = prompt.len()))]
  async fn generate_text(&self, model: &str, prompt: &str, temperature: Option<f32>) -> Result<String, String> {
    let req = GenerateContentRequest {
      contents: vec![Content { role: Some("user".into()), parts: vec![Part { text: Some(prompt.to_string()) }] }],
      generation_config: temperature.map(|t| GenerationConfig { temperature: Some(t) }),
    };

    let start = Instant::now();
    let res = self.client.post(self.endpoint(model))
      .header(USER_AGENT, "shanuki-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header("x-goog-api-key", &self.api_key)
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_gemini_error(&body).unwrap_or(body);
      return Err(format!("Gemini HTTP {}: {}", status, msg));
    }

    let body: GenerateContentResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, completion_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }
    let text = body.text();
    info!(elapsed = ?start.elapsed(), reply_len = text.len(), "Gemini reply received");
    Ok(text)
  }
}

// --- generateContent DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  contents: Vec<Content>,
  #[serde(skip_serializing_if = "Option::is_none")]
  generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct GenerationConfig {
  #[serde(skip_serializing_if = "Option::is_none")]
  temperature: Option<f32>,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  role: Option<String>,
  #[serde(default)]
  parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
  /// Concatenated text parts of the first candidate; empty when there is none.
  fn text(&self) -> String {
    self.candidates.first()
      .and_then(|c| c.content.as_ref())
      .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect::<String>())
      .unwrap_or_default()
  }
}

#[derive(Deserialize)]
struct Candidate {
  #[serde(default)] content: Option<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
