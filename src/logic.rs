//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! Each operation composes a prompt, makes exactly one model call, and
//! interprets the reply:
//!   - `generate`: new unit from a `UnitRequest`
//!   - `update`: revised unit from the current HTML + feedback (stateless)
//!   - `suggest_interdisciplinary_subject`: short free-text helper
//!
//! Validation errors stop before the model call. Model errors are returned to
//! the caller; reply-shape problems are absorbed by the interpreter.

use std::time::Instant;

use tracing::{error, info, instrument};

use crate::composer::{compose, compose_edit, compose_suggestion};
use crate::domain::{EditRequest, GenerationResult, UnitRequest};
use crate::error::GenerationError;
use crate::gemini::TextModel;
use crate::interpreter::parse;
use crate::state::AppState;

/// Sampling temperature for unit generation. Updates and suggestions use the model default.
pub const UNIT_TEMPERATURE: f32 = 0.9;

fn model_of(state: &AppState) -> Result<&dyn TextModel, GenerationError> {
  state.model.as_deref().ok_or(GenerationError::Unavailable)
}

#[instrument(level = "info", skip(state, request), fields(mode = request.mode.as_str(), topic = %request.topic, level = %request.level))]
pub async fn generate(state: &AppState, request: &UnitRequest) -> Result<GenerationResult, GenerationError> {
  request.validate(&state.catalog.levels)?;
  let model = model_of(state)?;

  let prompt = compose(&state.prompts, request);
  let start = Instant::now();
  let raw = model
    .generate_text(&state.models.unit, &prompt, Some(UNIT_TEMPERATURE))
    .await
    .map_err(|e| {
      error!(target: "unit", elapsed = ?start.elapsed(), error = %e, "Model call failed during unit generation");
      GenerationError::Model(e)
    })?;

  let result = parse(&raw);
  info!(
    target: "unit",
    elapsed = ?start.elapsed(),
    prompt_len = prompt.len(),
    html_len = result.html.len(),
    distractors = result.distractor_words.len(),
    "Unit generated"
  );
  Ok(result)
}

#[instrument(level = "info", skip(state, edit), fields(html_len = edit.current_html.len(), feedback_len = edit.feedback_text.len()))]
pub async fn update(state: &AppState, edit: &EditRequest) -> Result<GenerationResult, GenerationError> {
  edit.validate()?;
  let model = model_of(state)?;

  let prompt = compose_edit(&state.prompts, edit);
  let start = Instant::now();
  let raw = model
    .generate_text(&state.models.unit, &prompt, None)
    .await
    .map_err(|e| {
      error!(target: "unit", elapsed = ?start.elapsed(), error = %e, "Model call failed during unit update");
      GenerationError::Model(e)
    })?;

  let result = parse(&raw);
  info!(target: "unit", elapsed = ?start.elapsed(), html_len = result.html.len(), "Unit updated");
  Ok(result)
}

#[instrument(level = "info", skip(state, reference_text, level), fields(reference_len = reference_text.len(), %level))]
pub async fn suggest_interdisciplinary_subject(
  state: &AppState,
  reference_text: &str,
  level: &str,
) -> Result<String, GenerationError> {
  if reference_text.trim().is_empty() {
    return Err(GenerationError::Validation("El documento no contiene texto para analizar.".into()));
  }
  let model = model_of(state)?;

  let prompt = compose_suggestion(&state.prompts, reference_text, level);
  let reply = model
    .generate_text(&state.models.helper, &prompt, None)
    .await
    .map_err(|e| {
      error!(target: "unit", error = %e, "Model call failed during subject suggestion");
      GenerationError::Model(e)
    })?;

  let subject = reply.trim().to_string();
  info!(target: "unit", subject = %subject, "Interdisciplinary subject suggested");
  Ok(subject)
}
