//! Error taxonomy of the generation boundary.
//!
//! Response-shape problems never show up here: the interpreter always degrades
//! to a renderable result. Only input validation and the external call fail.

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerationError {
  /// Blocked before any external call.
  #[error("{0}")]
  Validation(String),
  /// Network/auth/quota failure reported by the model client.
  #[error("model call failed: {0}")]
  Model(String),
  /// No model client configured (missing API key).
  #[error("generation unavailable: GEMINI_API_KEY not set")]
  Unavailable,
  /// An operation of the same kind is already in flight for this session.
  #[error("operation already in progress: {0}")]
  Busy(&'static str),
}

impl GenerationError {
  pub fn status(&self) -> StatusCode {
    match self {
      GenerationError::Validation(_) => StatusCode::BAD_REQUEST,
      GenerationError::Model(_) => StatusCode::BAD_GATEWAY,
      GenerationError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
      GenerationError::Busy(_) => StatusCode::CONFLICT,
    }
  }
}

impl IntoResponse for GenerationError {
  fn into_response(self) -> Response {
    (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_codes_follow_taxonomy() {
    assert_eq!(GenerationError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
    assert_eq!(GenerationError::Model("timeout".into()).status(), StatusCode::BAD_GATEWAY);
    assert_eq!(GenerationError::Unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(GenerationError::Busy("generate").status(), StatusCode::CONFLICT);
  }

  #[test]
  fn validation_message_is_shown_verbatim() {
    let e = GenerationError::Validation("Para modo ABP, completa materia y contexto.".into());
    assert_eq!(e.to_string(), "Para modo ABP, completa materia y contexto.");
  }
}
