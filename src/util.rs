//! Small utility helpers used across modules.

use std::sync::OnceLock;

use regex::{Captures, Regex};

fn token_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"\[([A-Z_]+)\]").expect("static regex"))
}

/// Very small and safe string templating.
/// Replaces every `[KEY]` of the template with its value in one pass over the
/// template; inserted values are never scanned again. Unknown tokens stay.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  token_re()
    .replace_all(tpl, |caps: &Captures| match pairs.iter().find(|(k, _)| *k == &caps[1]) {
      Some((_, v)) => v.to_string(),
      None => caps[0].to_string(),
    })
    .into_owned()
}

/// Returns `value` unless it is missing or blank, in which case `fallback`.
pub fn non_blank_or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
  match value {
    Some(v) if !v.trim().is_empty() => v,
    _ => fallback,
  }
}

/// First `max_chars` characters of `s` (never splits a UTF-8 sequence).
pub fn prefix_chars(s: &str, max_chars: usize) -> &str {
  match s.char_indices().nth(max_chars) {
    Some((idx, _)) => &s[..idx],
    None => s,
  }
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  let head = prefix_chars(s, max);
  if head.len() == s.len() { s.to_string() } else { format!("{}… ({} bytes total)", head, s.len()) }
}
