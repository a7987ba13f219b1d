//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Catalog;
use crate::documents::DocumentKind;
use crate::domain::{GenerationMode, GenerationResult, UnitRequest};
use crate::session::{InputsPatch, Session};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    GetState,
    UpdateInputs {
        inputs: InputsPatch,
    },
    SetMode {
        mode: GenerationMode,
    },
    LoadDocument {
        kind: DocumentKind,
        #[serde(rename = "fileName")]
        file_name: String,
        pages: Vec<String>,
    },
    Generate,
    SetFeedback {
        text: String,
    },
    ApplyFeedback,
    Restart,
    Download,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    State {
        session: Session,
    },
    Generated {
        unit: UnitOut,
    },
    Updated {
        unit: UnitOut,
    },
    Suggestion {
        subject: String,
    },
    Download {
        #[serde(rename = "fileName")]
        file_name: String,
        html: String,
    },
    Error {
        message: String,
    },
}

/// Generated unit as delivered to the client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnitOut {
    pub id: String,
    pub html: String,
    pub distractor_words: Vec<String>,
    pub file_name: String,
}

/// Convert an interpreted result into the public DTO, minting a fresh id.
pub fn to_out(result: GenerationResult, file_name: String) -> UnitOut {
    UnitOut {
        id: Uuid::new_v4().to_string(),
        html: result.html,
        distractor_words: result.distractor_words,
        file_name,
    }
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub generation: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogOut {
    #[serde(flatten)]
    pub catalog: Catalog,
    pub defaults: UnitRequest,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIn {
    pub current_html: String,
    pub feedback_text: String,
    /// Only used to name the downloadable file.
    #[serde(default)]
    pub mode: GenerationMode,
    #[serde(default)]
    pub topic: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestIn {
    pub reference_text: String,
    pub level: String,
}
#[derive(Serialize)]
pub struct SuggestOut {
    pub subject: String,
}

#[derive(Deserialize)]
pub struct DocumentIn {
    pub pages: Vec<String>,
}
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOut {
    pub text: String,
    pub pages_used: usize,
}

#[derive(Deserialize)]
pub struct DownloadIn {
    pub html: String,
    #[serde(default)]
    pub mode: GenerationMode,
    #[serde(default)]
    pub topic: String,
}
