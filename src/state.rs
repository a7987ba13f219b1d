//! Application state shared by every handler: prompts, catalog, model names,
//! and the optional model client.
//!
//! Nothing here is mutated after startup; per-connection wizard state lives in
//! `session::Session`.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::{load_app_config_from_env, AppConfig, Catalog, Prompts};
use crate::gemini::{Gemini, ModelNames, TextModel};

#[derive(Clone)]
pub struct AppState {
    pub prompts: Prompts,
    pub catalog: Catalog,
    pub models: ModelNames,
    pub model: Option<Arc<dyn TextModel>>,
}

impl AppState {
    /// Build state from env: load config, model names, init Gemini.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_app_config_from_env().unwrap_or_default();
        let models = ModelNames::from_env();

        let model: Option<Arc<dyn TextModel>> = match Gemini::from_env() {
            Some(g) => {
                info!(target: "shanuki_backend", base_url = %g.base_url, unit_model = %models.unit, helper_model = %models.helper, "Gemini enabled.");
                Some(Arc::new(g))
            }
            None => {
                info!(target: "shanuki_backend", "Gemini disabled (no GEMINI_API_KEY). Generation endpoints will answer 503.");
                None
            }
        };

        Self::from_parts(cfg, models, model)
    }

    /// Assemble state from already-loaded parts.
    pub fn from_parts(cfg: AppConfig, models: ModelNames, model: Option<Arc<dyn TextModel>>) -> Self {
        info!(
            target: "shanuki_backend",
            levels = cfg.catalog.levels.len(),
            themes = cfg.catalog.narrative_themes.len(),
            "Catalog ready"
        );
        Self { prompts: cfg.prompts, catalog: cfg.catalog, models, model }
    }
}
