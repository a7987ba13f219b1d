//! Interpretation of the model's free-text reply.
//!
//! The reply is expected to carry a full HTML document followed by a
//! `<SHANUKI_DATA>{"distractorWords": [...]}</SHANUKI_DATA>` block. Nothing
//! here fails: malformed or missing parts degrade to fixed fallbacks and are
//! only logged.
//!
//! HTML extraction order:
//!   1) one contiguous match, first `<html` through last `</html>` (case-insensitive);
//!   2) index slicing between the first `<html` and the last `</html>`;
//!   3) `HTML_FAILURE_MARKER`.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::domain::GenerationResult;
use crate::util::trunc_for_log;

/// Placed in `html` when no document could be located in the reply.
pub const HTML_FAILURE_MARKER: &str = "Error al generar el HTML.";

/// Used when the data block is missing, malformed, or carries no words.
pub const DEFAULT_DISTRACTOR_WORDS: [&str; 6] = ["Error", "Bug", "Fallo", "Null", "Undefined", "False"];

const HTML_OPEN: &str = "<html";
const HTML_CLOSE: &str = "</html>";

fn html_span_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"(?is)<html.*</html>").expect("static regex"))
}

fn data_block_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"(?is)<SHANUKI_DATA>(.*?)</SHANUKI_DATA>").expect("static regex"))
}

/// Parse a raw model reply into a renderable result. Total over all inputs.
pub fn parse(raw: &str) -> GenerationResult {
  let html = match extract_html(raw) {
    Some(h) => h.to_string(),
    None => {
      warn!(target: "unit", reply_len = raw.len(), head = %trunc_for_log(raw, 80), "No HTML document found in model reply");
      HTML_FAILURE_MARKER.to_string()
    }
  };

  let distractor_words = extract_distractor_words(raw)
    .unwrap_or_else(|| DEFAULT_DISTRACTOR_WORDS.iter().map(|w| w.to_string()).collect());

  GenerationResult { html, distractor_words }
}

/// First `<html` through last `</html>`, trying the pattern match before index slicing.
pub fn extract_html(raw: &str) -> Option<&str> {
  html_span_re()
    .find(raw)
    .map(|m| m.as_str())
    .or_else(|| extract_html_by_index(raw))
}

/// Substring fallback. ASCII lowering keeps byte offsets aligned with `raw`.
fn extract_html_by_index(raw: &str) -> Option<&str> {
  let lower = raw.to_ascii_lowercase();
  let start = lower.find(HTML_OPEN)?;
  let end = lower.rfind(HTML_CLOSE)?;
  if end < start {
    return None;
  }
  raw.get(start..end + HTML_CLOSE.len())
}

/// Words from the data block, or None when the fallback list must be used.
pub fn extract_distractor_words(raw: &str) -> Option<Vec<String>> {
  let Some(caps) = data_block_re().captures(raw) else {
    warn!(target: "unit", "No <SHANUKI_DATA> block in model reply");
    return None;
  };
  let body = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
  let json = strip_code_fences(body);

  // Payload must be an object; with duplicate keys the last one wins.
  match serde_json::from_str::<Value>(json) {
    Ok(Value::Object(data)) => {
      let words: Vec<String> = data
        .get("distractorWords")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
      if words.is_empty() {
        warn!(target: "unit", "Data block has no distractorWords");
        return None;
      }
      Some(words)
    }
    Ok(_) => {
      warn!(target: "unit", payload = %trunc_for_log(json, 120), "Data block is not a JSON object");
      None
    }
    Err(e) => {
      warn!(target: "unit", error = %e, payload = %trunc_for_log(json, 120), "Error parsing distractor words");
      None
    }
  }
}

/// Remove a leading ```json (then a leading ```) and a trailing ```.
fn strip_code_fences(body: &str) -> &str {
  let s = body.trim();
  let s = s.strip_prefix("```json").unwrap_or(s);
  let s = s.strip_prefix("```").unwrap_or(s);
  let s = s.strip_suffix("```").unwrap_or(s);
  s.trim()
}
