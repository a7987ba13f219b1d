//! Loading generator configuration (prompt templates + catalog) from TOML.
//!
//! See `AppConfig`, `Prompts` and `Catalog` for the expected schema. Every
//! field is optional; missing ones keep the built-in defaults.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub catalog: Catalog,
}

/// Choices offered by the wizard. `levels` also restricts accepted requests.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct Catalog {
  pub levels: Vec<String>,
  pub narrative_themes: Vec<String>,
  pub subject_suggestions: Vec<String>,
}

impl Default for Catalog {
  fn default() -> Self {
    let owned = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    Self {
      levels: owned(&[
        "7mo Año (EBI)", "8vo Año (EBI)", "9no Año (EBI)",
        "1er Año (Bachillerato)", "2do Año (Bachillerato)", "3er Año (Bachillerato)",
      ]),
      narrative_themes: owned(&[
        "Cyberpunk / Hackers del Futuro",
        "Fantasía Medieval / Hechiceros de Código",
        "Apocalipsis Zombie / Supervivencia",
        "Exploración Espacial / Misión Marte",
        "Detectives / Misterio Noir",
        "Superhéroes / Academia de Poderes",
      ]),
      subject_suggestions: owned(&[
        "Matemática", "Historia", "Geografía", "Biología",
        "Ciencias Físicas", "Arte", "Idioma Español", "Inglés",
      ]),
    }
  }
}

/// Prompt templates sent to the model. Tokens are written as `[TOKEN]`; see
/// `composer` for the list each template understands.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  /// Appended to both generation templates through `[COMMON_RULES]`.
  pub common_rules: String,
  pub gamified_template: String,
  pub pbl_template: String,
  pub edit_template: String,
  pub suggestion_template: String,
  /// Used when no theory document was supplied.
  pub missing_theory_text: String,
  /// Used when no interdisciplinary program document was supplied.
  pub missing_reference_text: String,
}

const COMMON_RULES: &str = r#"
ESPECIFICACIONES TÉCNICAS (HTML5):
- Librerías: Pyodide para ejecución de Python, jsPDF para reportes, FontAwesome para iconos.
- UI: Estética profesional, responsiva.
- Editor de código: Manejo de TAB (4 espacios), consola de salida, y validación con casos de prueba.
- Generador de PDF: Debe capturar el proceso del estudiante (nombre, nivel, puntaje quiz, código final y resultado de validación).

IMPORTANTE:
1. Entrega ÚNICAMENTE el código HTML completo y funcional.
2. AL FINAL, incluye <SHANUKI_DATA>{"distractorWords": ["palabra1", "palabra2", "palabra3", "palabra4", "palabra5", "palabra6"]}</SHANUKI_DATA>.
"#;

const PBL_TEMPLATE: &str = r#"PROMPT: UNIDAD DE APRENDIZAJE INTEGRAL CON ABP (TEORÍA + QUIZ + CÓDIGO)

ROL: Docente Experto en Didáctica de la Computación y ABP.
MODO: APRENDIZAJE BASADO EN PROBLEMAS (REALISTA E INTERDISCIPLINARIO).

PARÁMETROS:
- Nivel: [NIVEL]
- Lenguaje: [LENGUAJE]
- Tema Técnico: [TEMA]
- Materia Interdisciplinaria: [MATERIA]
- Contexto: [CONTEXTO]

MATERIALES DE CONSULTA:
1. TEÓRICO INFORMÁTICA: [CS_THEORY_TEXT] (Usa esto para las explicaciones y flashcards).
2. DOCUMENTO INTERDISCIPLINARIO: [PROGRAM_TEXT] (Usa esto para el contexto del problema).

ESTRUCTURA:
1. Problema Real: Presenta el desafío interdisciplinario.
2. Teoría: Explica el [TEMA] basándote en el TEÓRICO ADJUNTO.
3. Quiz: 3 preguntas conceptuales.
4. Desafío Práctico: Resuelve el problema de [MATERIA] usando código.

[COMMON_RULES]"#;

const GAMIFIED_TEMPLATE: &str = r#"PROMPT: UNIDAD DE APRENDIZAJE GAMIFICADA (NARRATIVA + RETOS)

ROL: Diseñador de Videojuegos Educativos y Docente Senior.
MODO: GAMIFICACIÓN INMERSIVA.

PARÁMETROS:
- Nivel: [NIVEL]
- Lenguaje: [LENGUAJE]
- Tema Técnico: [TEMA]
- Temática Narrativa: [NARRATIVA]

MATERIALES DE CONSULTA:
1. TEÓRICO INFORMÁTICA: [CS_THEORY_TEXT] (Usa esto estrictamente para el contenido académico).

INSTRUCCIONES DE DISEÑO VISUAL Y NARRATIVO:
- Adapta todo el CSS y textos al estilo: [NARRATIVA].
- El estudiante es el "Héroe/Protagonista".
- El editor de código es la "Herramienta/Arma".

ESTRUCTURA:
1. Misión Inicial: Introduce la historia.
2. Entrenamiento (Teoría): Flashcards estilizadas según la narrativa.
3. Prueba de Acceso (Quiz): Preguntas para avanzar.
4. Misión Final (Editor): Resolver el reto usando código para "ganar" el nivel.

[COMMON_RULES]"#;

const EDIT_TEMPLATE: &str = r#"ACTUALIZACIÓN DE UNIDAD DIDÁCTICA.

Tienes el siguiente código HTML de una unidad educativa:
[CURRENT_HTML]

El docente solicita el siguiente cambio/ajuste:
"[USER_FEEDBACK]"

INSTRUCCIONES:
1. Modifica el código HTML existente para satisfacer la solicitud del docente.
2. Mantén la estructura funcional (Pyodide, PDF, etc.).
3. Devuelve el HTML completo corregido.
4. Incluye nuevamente el bloque <SHANUKI_DATA> al final."#;

const SUGGESTION_TEMPLATE: &str = r#"Analiza el siguiente fragmento de programa escolar de [NIVEL] y sugiere una temática interdisciplinaria para un proyecto de informática basado en problemas (ABP). Devuelve solo el nombre de la materia y el tema en una frase corta (máximo 10 palabras).

PROGRAMA: [PROGRAM_TEXT]"#;

impl Default for Prompts {
  fn default() -> Self {
    Self {
      common_rules: COMMON_RULES.into(),
      gamified_template: GAMIFIED_TEMPLATE.into(),
      pbl_template: PBL_TEMPLATE.into(),
      edit_template: EDIT_TEMPLATE.into(),
      suggestion_template: SUGGESTION_TEMPLATE.into(),
      missing_theory_text: "Usa tu conocimiento general, no se adjuntó teórico específico.".into(),
      missing_reference_text: "No se cargó archivo de programa interdisciplinario.".into(),
    }
  }
}

/// Parse a TOML document into `AppConfig`.
pub fn parse_app_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(s)
}

/// Attempt to load `AppConfig` from SHANUKI_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("SHANUKI_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_app_config(&s) {
      Ok(cfg) => {
        info!(target: "shanuki_backend", %path, levels = cfg.catalog.levels.len(), "Loaded generator config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "shanuki_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "shanuki_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
