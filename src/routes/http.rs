//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs sizes and basic result info.

use std::sync::Arc;
use axum::{
  extract::State,
  http::header,
  response::IntoResponse,
  Json,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::{info, instrument};

use crate::documents::join_pages;
use crate::domain::{download_file_name, EditRequest, UnitRequest};
use crate::error::GenerationError;
use crate::logic::{generate, suggest_interdisciplinary_subject, update};
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, generation: state.model.is_some() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_catalog(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let defaults = UnitRequest::with_defaults(&state.catalog.levels, &state.catalog.narrative_themes);
  Json(CatalogOut { catalog: state.catalog.clone(), defaults })
}

#[instrument(level = "info", skip(state, body), fields(mode = body.mode.as_str(), topic = %body.topic))]
pub async fn http_post_unit(
  State(state): State<Arc<AppState>>,
  Json(body): Json<UnitRequest>,
) -> Result<Json<UnitOut>, GenerationError> {
  let result = generate(&state, &body).await?;
  let out = to_out(result, download_file_name(body.mode, &body.topic));
  info!(target: "unit", id = %out.id, file = %out.file_name, "HTTP unit generated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(html_len = body.current_html.len(), feedback_len = body.feedback_text.len()))]
pub async fn http_post_update(
  State(state): State<Arc<AppState>>,
  Json(body): Json<UpdateIn>,
) -> Result<Json<UnitOut>, GenerationError> {
  let edit = EditRequest { current_html: body.current_html, feedback_text: body.feedback_text };
  let result = update(&state, &edit).await?;
  let out = to_out(result, download_file_name(body.mode, &body.topic));
  info!(target: "unit", id = %out.id, "HTTP unit updated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(reference_len = body.reference_text.len(), level = %body.level))]
pub async fn http_post_suggest(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SuggestIn>,
) -> Result<Json<SuggestOut>, GenerationError> {
  let subject = suggest_interdisciplinary_subject(&state, &body.reference_text, &body.level).await?;
  Ok(Json(SuggestOut { subject }))
}

#[instrument(level = "info", skip(body), fields(pages = body.pages.len()))]
pub async fn http_post_document(Json(body): Json<DocumentIn>) -> impl IntoResponse {
  let (text, pages_used) = join_pages(&body.pages);
  Json(DocumentOut { text, pages_used })
}

#[instrument(level = "info", skip(body), fields(html_len = body.html.len(), mode = body.mode.as_str()))]
pub async fn http_post_download(Json(body): Json<DownloadIn>) -> impl IntoResponse {
  let file_name = download_file_name(body.mode, &body.topic);
  (
    [
      (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
      (header::CONTENT_DISPOSITION, content_disposition(&file_name)),
    ],
    body.html,
  )
}

/// Bytes escaped in `filename*`: all but alphanumerics and `-._~`.
const FILENAME_STAR: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Attachment header with an ASCII `filename` and an RFC 5987 `filename*`
/// (topics routinely carry accents, which plain header values cannot).
fn content_disposition(file_name: &str) -> String {
  let ascii: String = file_name
    .chars()
    .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
    .collect();
  let encoded = utf8_percent_encode(file_name, FILENAME_STAR);
  format!("attachment; filename=\"{}\"; filename*=UTF-8''{}", ascii, encoded)
}
