//! Domain models: generation mode, unit/edit requests, generation result.

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Default technology used when the instructor does not pick one.
pub const DEFAULT_LANGUAGE: &str = "Python";

/// Pedagogical mode of the generated unit.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GenerationMode {
  /// Narrative-driven unit; the student is the protagonist of a themed story.
  #[default]
  #[serde(rename = "gamified")]
  Gamified,
  /// Problem-based learning tied to another school subject.
  #[serde(rename = "pbl", alias = "problem_based")]
  ProblemBased,
}

impl GenerationMode {
  /// Wire name, also used in download file names.
  pub fn as_str(&self) -> &'static str {
    match self {
      GenerationMode::Gamified => "gamified",
      GenerationMode::ProblemBased => "pbl",
    }
  }
}

/// Everything the instructor configures before asking for a unit.
/// Mode-specific fields are carried for both modes but only read for their own.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UnitRequest {
  #[serde(default)] pub language: String,
  #[serde(default)] pub topic: String,
  #[serde(default)] pub level: String,
  #[serde(default)] pub mode: GenerationMode,

  // Gamified
  #[serde(default)] pub narrative_theme: String,

  // Problem-based
  #[serde(default)] pub interdisciplinary_subject: String,
  #[serde(default)] pub context: String,

  // Reference material (plain text extracted from documents). Accepted from
  // clients but never echoed back; session snapshots carry the file names.
  #[serde(default, skip_serializing)] pub theory_text: Option<String>,
  #[serde(default, skip_serializing)] pub reference_text: Option<String>,
}

impl UnitRequest {
  /// Initial wizard inputs: default language, first level and first theme of the catalog.
  pub fn with_defaults(levels: &[String], themes: &[String]) -> Self {
    Self {
      language: DEFAULT_LANGUAGE.into(),
      level: levels.first().cloned().unwrap_or_default(),
      narrative_theme: themes.first().cloned().unwrap_or_default(),
      ..Self::default()
    }
  }

  /// Reject requests that must not reach the model.
  /// `levels` is the configured level list; an empty list accepts any level.
  pub fn validate(&self, levels: &[String]) -> Result<(), GenerationError> {
    if self.topic.trim().is_empty() {
      return Err(GenerationError::Validation("Por favor, ingresa el tema técnico.".into()));
    }
    if !levels.is_empty() && !levels.iter().any(|l| l == &self.level) {
      return Err(GenerationError::Validation(format!("Nivel educativo desconocido: {}", self.level)));
    }
    if self.mode == GenerationMode::ProblemBased
      && (self.interdisciplinary_subject.trim().is_empty() || self.context.trim().is_empty())
    {
      return Err(GenerationError::Validation("Para modo ABP, completa materia y contexto.".into()));
    }
    Ok(())
  }
}

/// A refinement round over an already generated unit.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
  pub current_html: String,
  pub feedback_text: String,
}

impl EditRequest {
  pub fn validate(&self) -> Result<(), GenerationError> {
    if self.current_html.trim().is_empty() {
      return Err(GenerationError::Validation("No hay una unidad generada para actualizar.".into()));
    }
    if self.feedback_text.trim().is_empty() {
      return Err(GenerationError::Validation("Describe los cambios que deseas aplicar.".into()));
    }
    Ok(())
  }
}

/// Parsed model output. Always renderable: see `interpreter::parse`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
  pub html: String,
  pub distractor_words: Vec<String>,
}

/// `Shanuki_<mode>_<topic>.html`, every whitespace char of the topic becoming `_`.
pub fn download_file_name(mode: GenerationMode, topic: &str) -> String {
  let topic: String = topic.chars().map(|c| if c.is_whitespace() { '_' } else { c }).collect();
  format!("Shanuki_{}_{}.html", mode.as_str(), topic)
}
