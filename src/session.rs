//! Per-connection wizard state.
//!
//! A session walks two steps: `Configure` (inputs, documents) and `Review`
//! (preview, feedback rounds, download). Each kind of model call has a busy
//! flag; a second request of the same kind is refused while one is in flight.
//! The current result is only ever replaced as a whole.

use serde::{Deserialize, Serialize};

use crate::config::Catalog;
use crate::documents::DocumentKind;
use crate::domain::{download_file_name, EditRequest, GenerationMode, GenerationResult, UnitRequest};
use crate::error::GenerationError;

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
  Configure,
  Review,
}

/// Partial update of the wizard inputs; absent fields are left untouched.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputsPatch {
  #[serde(default)] pub language: Option<String>,
  #[serde(default)] pub topic: Option<String>,
  #[serde(default)] pub level: Option<String>,
  #[serde(default)] pub mode: Option<GenerationMode>,
  #[serde(default)] pub narrative_theme: Option<String>,
  #[serde(default)] pub interdisciplinary_subject: Option<String>,
  #[serde(default)] pub context: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
  pub inputs: UnitRequest,
  pub step: WizardStep,
  pub generating: bool,
  pub suggesting: bool,
  pub regenerating: bool,
  pub feedback: String,
  pub theory_file: Option<String>,
  pub program_file: Option<String>,
  pub result: Option<GenerationResult>,
}

impl Session {
  pub fn new(catalog: &Catalog) -> Self {
    Self {
      inputs: UnitRequest::with_defaults(&catalog.levels, &catalog.narrative_themes),
      step: WizardStep::Configure,
      generating: false,
      suggesting: false,
      regenerating: false,
      feedback: String::new(),
      theory_file: None,
      program_file: None,
      result: None,
    }
  }

  pub fn apply_inputs(&mut self, patch: InputsPatch) {
    if let Some(v) = patch.language { self.inputs.language = v; }
    if let Some(v) = patch.topic { self.inputs.topic = v; }
    if let Some(v) = patch.level { self.inputs.level = v; }
    if let Some(v) = patch.mode { self.inputs.mode = v; }
    if let Some(v) = patch.narrative_theme { self.inputs.narrative_theme = v; }
    if let Some(v) = patch.interdisciplinary_subject { self.inputs.interdisciplinary_subject = v; }
    if let Some(v) = patch.context { self.inputs.context = v; }
  }

  pub fn set_mode(&mut self, mode: GenerationMode) {
    self.inputs.mode = mode;
  }

  pub fn set_feedback(&mut self, text: String) {
    self.feedback = text;
  }

  /// Store extracted document text in the field `kind` feeds.
  pub fn load_document(&mut self, kind: DocumentKind, file_name: String, text: String) {
    match kind {
      DocumentKind::Theory => {
        self.theory_file = Some(file_name);
        self.inputs.theory_text = Some(text);
      }
      DocumentKind::Program => {
        self.program_file = Some(file_name);
        self.inputs.reference_text = Some(text);
      }
    }
  }

  /// Back to the configuration step; inputs and the last result are kept.
  pub fn restart(&mut self) {
    self.step = WizardStep::Configure;
  }

  /// Validate and mark generation in flight. Returns the request to send.
  pub fn begin_generate(&mut self, levels: &[String]) -> Result<UnitRequest, GenerationError> {
    if self.generating {
      return Err(GenerationError::Busy("generate"));
    }
    self.inputs.validate(levels)?;
    self.generating = true;
    Ok(self.inputs.clone())
  }

  pub fn finish_generate(&mut self, outcome: &Result<GenerationResult, GenerationError>) {
    self.generating = false;
    if let Ok(result) = outcome {
      self.result = Some(result.clone());
      self.step = WizardStep::Review;
    }
  }

  /// Validate and mark a refinement round in flight. Returns the edit to send.
  pub fn begin_update(&mut self) -> Result<EditRequest, GenerationError> {
    if self.regenerating {
      return Err(GenerationError::Busy("update"));
    }
    let Some(result) = &self.result else {
      return Err(GenerationError::Validation("No hay una unidad generada para actualizar.".into()));
    };
    let edit = EditRequest { current_html: result.html.clone(), feedback_text: self.feedback.clone() };
    edit.validate()?;
    self.regenerating = true;
    Ok(edit)
  }

  pub fn finish_update(&mut self, outcome: &Result<GenerationResult, GenerationError>) {
    self.regenerating = false;
    if let Ok(result) = outcome {
      self.result = Some(result.clone());
      self.feedback.clear();
    }
  }

  /// Mark a subject suggestion in flight. Returns (reference text, level).
  pub fn begin_suggest(&mut self) -> Result<(String, String), GenerationError> {
    if self.suggesting {
      return Err(GenerationError::Busy("suggest"));
    }
    let text = self.inputs.reference_text.clone().unwrap_or_default();
    self.suggesting = true;
    Ok((text, self.inputs.level.clone()))
  }

  pub fn finish_suggest(&mut self, outcome: &Result<String, GenerationError>) {
    self.suggesting = false;
    if let Ok(subject) = outcome {
      self.inputs.interdisciplinary_subject = subject.clone();
    }
  }

  /// File name and HTML of the current result, if any.
  pub fn download(&self) -> Option<(String, String)> {
    self.result.as_ref().map(|r| (download_file_name(self.inputs.mode, &self.inputs.topic), r.html.clone()))
  }
}
