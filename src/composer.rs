//! Prompt composition: pick a template and fill its `[TOKEN]` placeholders.
//!
//! Tokens understood by the generation templates:
//!   [NIVEL] [LENGUAJE] [TEMA] [CS_THEORY_TEXT] [COMMON_RULES]   (both modes)
//!   [NARRATIVA]                                                 (gamified)
//!   [MATERIA] [CONTEXTO] [PROGRAM_TEXT]                         (problem-based)
//! Edit template: [CURRENT_HTML] [USER_FEEDBACK].
//! Suggestion template: [NIVEL] [PROGRAM_TEXT].
//!
//! Every occurrence of a token is replaced. Templates are trusted; nothing is
//! validated after substitution.

use crate::config::Prompts;
use crate::domain::{EditRequest, GenerationMode, UnitRequest};
use crate::util::{fill_template, non_blank_or, prefix_chars};

/// Reference text sent to the suggestion helper is cut to this many characters.
pub const SUGGESTION_REFERENCE_PREFIX: usize = 5000;

/// Template for the request's mode.
pub fn template_for(prompts: &Prompts, mode: GenerationMode) -> &str {
  match mode {
    GenerationMode::Gamified => &prompts.gamified_template,
    GenerationMode::ProblemBased => &prompts.pbl_template,
  }
}

/// Build the generation prompt for `request`.
///
/// `[COMMON_RULES]` is expanded first since it is template text itself; the
/// request values then go in with a single pass, so user text is left as is.
pub fn compose(prompts: &Prompts, request: &UnitRequest) -> String {
  let theory = non_blank_or(request.theory_text.as_deref(), &prompts.missing_theory_text);
  let base = fill_template(template_for(prompts, request.mode), &[("COMMON_RULES", prompts.common_rules.as_str())]);

  let mut pairs = vec![
    ("NIVEL", request.level.as_str()),
    ("LENGUAJE", request.language.as_str()),
    ("TEMA", request.topic.as_str()),
    ("CS_THEORY_TEXT", theory),
  ];
  match request.mode {
    GenerationMode::ProblemBased => {
      let reference = non_blank_or(request.reference_text.as_deref(), &prompts.missing_reference_text);
      pairs.extend([
        ("MATERIA", request.interdisciplinary_subject.as_str()),
        ("CONTEXTO", request.context.as_str()),
        ("PROGRAM_TEXT", reference),
      ]);
    }
    GenerationMode::Gamified => pairs.push(("NARRATIVA", request.narrative_theme.as_str())),
  }
  fill_template(&base, &pairs)
}

/// Build the refinement prompt from the current HTML and the instructor's feedback.
pub fn compose_edit(prompts: &Prompts, edit: &EditRequest) -> String {
  fill_template(
    &prompts.edit_template,
    &[("CURRENT_HTML", edit.current_html.as_str()), ("USER_FEEDBACK", edit.feedback_text.as_str())],
  )
}

/// Build the subject-suggestion prompt; `reference_text` is bounded to a fixed prefix.
pub fn compose_suggestion(prompts: &Prompts, reference_text: &str, level: &str) -> String {
  fill_template(
    &prompts.suggestion_template,
    &[("NIVEL", level), ("PROGRAM_TEXT", prefix_chars(reference_text, SUGGESTION_REFERENCE_PREFIX))],
  )
}
