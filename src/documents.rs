//! Reference documents arrive as per-page plain text (extraction from the
//! binary file happens client-side). Only the first pages are kept.

use serde::{Deserialize, Serialize};

/// Pages beyond this are ignored.
pub const MAX_DOCUMENT_PAGES: usize = 6;

/// Which wizard field a document feeds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
  /// Computer-science theory notes → `theory_text`.
  Theory,
  /// Interdisciplinary program of another subject → `reference_text`.
  Program,
}

/// Join up to `MAX_DOCUMENT_PAGES` pages, each followed by one space.
/// Returns the text and how many pages were used.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> (String, usize) {
  let used = pages.len().min(MAX_DOCUMENT_PAGES);
  let mut out = String::new();
  for page in &pages[..used] {
    out.push_str(page.as_ref());
    out.push(' ');
  }
  (out, used)
}
