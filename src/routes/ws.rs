//! WebSocket upgrade + message loop. One `Session` per connection.
//!
//! State messages are answered inline. Model calls run in spawned tasks and
//! report back through a channel, so the socket keeps serving state messages
//! while a call is outstanding; the session busy flags refuse duplicates.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, instrument};

use crate::documents::{join_pages, DocumentKind};
use crate::domain::download_file_name;
use crate::logic::{generate, suggest_interdisciplinary_subject, update};
use crate::protocol::{to_out, ClientWsMessage, ServerWsMessage};
use crate::session::Session;
use crate::state::AppState;

type SharedSession = Arc<Mutex<Session>>;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "shanuki_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "shanuki_backend", "WebSocket connected");
  let session: SharedSession = Arc::new(Mutex::new(Session::new(&state.catalog)));
  let (tx, mut rx) = mpsc::unbounded_channel::<ServerWsMessage>();

  loop {
    tokio::select! {
      incoming = socket.recv() => {
        let Some(Ok(msg)) = incoming else { break };
        match msg {
          Message::Text(txt) => {
            let reply = match serde_json::from_str::<ClientWsMessage>(&txt) {
              Ok(msg) => {
                debug!(target: "shanuki_backend", len = txt.len(), "WS message received");
                handle_client_ws(msg, &state, &session, &tx).await
              }
              Err(e) => Some(ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }),
            };
            if let Some(reply) = reply {
              if send_json(&mut socket, &reply).await.is_err() { break; }
            }
          }
          Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
          Message::Close(_) => break,
          _ => {}
        }
      }
      Some(out) = rx.recv() => {
        if send_json(&mut socket, &out).await.is_err() { break; }
      }
    }
  }
  info!(target: "shanuki_backend", "WebSocket disconnected");
}

async fn send_json(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await.map_err(|e| {
    error!(target: "shanuki_backend", error = %e, "WS send error");
    e
  })
}

/// Handle one client message. Returns the immediate reply, if any; results of
/// model calls arrive later through `tx`.
#[instrument(level = "debug", skip_all)]
async fn handle_client_ws(
  msg: ClientWsMessage,
  state: &Arc<AppState>,
  session: &SharedSession,
  tx: &mpsc::UnboundedSender<ServerWsMessage>,
) -> Option<ServerWsMessage> {
  match msg {
    ClientWsMessage::Ping => Some(ServerWsMessage::Pong),

    ClientWsMessage::GetState => Some(snapshot(session).await),

    ClientWsMessage::UpdateInputs { inputs } => {
      session.lock().await.apply_inputs(inputs);
      Some(snapshot(session).await)
    }

    ClientWsMessage::SetMode { mode } => {
      session.lock().await.set_mode(mode);
      Some(snapshot(session).await)
    }

    ClientWsMessage::SetFeedback { text } => {
      session.lock().await.set_feedback(text);
      Some(snapshot(session).await)
    }

    ClientWsMessage::Restart => {
      session.lock().await.restart();
      Some(snapshot(session).await)
    }

    ClientWsMessage::Download => {
      let download = session.lock().await.download();
      Some(match download {
        Some((file_name, html)) => ServerWsMessage::Download { file_name, html },
        None => ServerWsMessage::Error { message: "No hay una unidad generada para descargar.".into() },
      })
    }

    ClientWsMessage::LoadDocument { kind, file_name, pages } => {
      let (text, pages_used) = join_pages(&pages);
      info!(target: "unit", ?kind, %file_name, pages_used, text_len = text.len(), "Document loaded");
      session.lock().await.load_document(kind, file_name, text);
      if kind == DocumentKind::Program {
        spawn_suggest(state, session, tx).await;
      }
      Some(snapshot(session).await)
    }

    ClientWsMessage::Generate => {
      let begun = session.lock().await.begin_generate(&state.catalog.levels);
      match begun {
        Ok(request) => {
          let busy = snapshot(session).await;
          let (st, sess, out) = (state.clone(), session.clone(), tx.clone());
          tokio::spawn(async move {
            let outcome = generate(&st, &request).await;
            sess.lock().await.finish_generate(&outcome);
            let msg = match outcome {
              Ok(result) => ServerWsMessage::Generated {
                unit: to_out(result, download_file_name(request.mode, &request.topic)),
              },
              Err(e) => ServerWsMessage::Error { message: e.to_string() },
            };
            let _ = out.send(msg);
            let _ = out.send(snapshot(&sess).await);
          });
          Some(busy)
        }
        Err(e) => Some(ServerWsMessage::Error { message: e.to_string() }),
      }
    }

    ClientWsMessage::ApplyFeedback => {
      let begun = session.lock().await.begin_update();
      match begun {
        Ok(edit) => {
          let busy = snapshot(session).await;
          let (st, sess, out) = (state.clone(), session.clone(), tx.clone());
          tokio::spawn(async move {
            let outcome = update(&st, &edit).await;
            let file_name = {
              let mut s = sess.lock().await;
              s.finish_update(&outcome);
              download_file_name(s.inputs.mode, &s.inputs.topic)
            };
            let msg = match outcome {
              Ok(result) => ServerWsMessage::Updated { unit: to_out(result, file_name) },
              Err(e) => ServerWsMessage::Error { message: e.to_string() },
            };
            let _ = out.send(msg);
            let _ = out.send(snapshot(&sess).await);
          });
          Some(busy)
        }
        Err(e) => Some(ServerWsMessage::Error { message: e.to_string() }),
      }
    }
  }
}

/// Ask for an interdisciplinary subject from the loaded program document.
async fn spawn_suggest(state: &Arc<AppState>, session: &SharedSession, tx: &mpsc::UnboundedSender<ServerWsMessage>) {
  let begun = session.lock().await.begin_suggest();
  let (text, level) = match begun {
    Ok(args) => args,
    Err(e) => {
      let _ = tx.send(ServerWsMessage::Error { message: e.to_string() });
      return;
    }
  };
  let (st, sess, out) = (state.clone(), session.clone(), tx.clone());
  tokio::spawn(async move {
    let outcome = suggest_interdisciplinary_subject(&st, &text, &level).await;
    sess.lock().await.finish_suggest(&outcome);
    let msg = match outcome {
      Ok(subject) => ServerWsMessage::Suggestion { subject },
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    };
    let _ = out.send(msg);
    let _ = out.send(snapshot(&sess).await);
  });
}

async fn snapshot(session: &SharedSession) -> ServerWsMessage {
  ServerWsMessage::State { session: session.lock().await.clone() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AppConfig;
  use crate::gemini::{ModelNames, TextModel};
  use crate::logic::tests::FakeModel;
  use crate::domain::GenerationResult;
  use crate::session::{InputsPatch, WizardStep};

  fn setup(fake: Arc<FakeModel>) -> (Arc<AppState>, SharedSession) {
    let state = Arc::new(AppState::from_parts(
      AppConfig::default(),
      ModelNames::default(),
      Some(fake as Arc<dyn TextModel>),
    ));
    let session = Arc::new(Mutex::new(Session::new(&state.catalog)));
    (state, session)
  }

  #[tokio::test]
  async fn generate_flow_moves_to_review() {
    let fake = FakeModel::new(vec![Ok(
      r#"<html>v1</html><SHANUKI_DATA>{"distractorWords":["a"]}</SHANUKI_DATA>"#.into(),
    )]);
    let (state, session) = setup(fake);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let patch = InputsPatch { topic: Some("Listas".into()), ..InputsPatch::default() };
    handle_client_ws(ClientWsMessage::UpdateInputs { inputs: patch }, &state, &session, &tx).await;
    let reply = handle_client_ws(ClientWsMessage::Generate, &state, &session, &tx).await;
    assert!(matches!(reply, Some(ServerWsMessage::State { ref session }) if session.generating));

    match rx.recv().await {
      Some(ServerWsMessage::Generated { unit }) => {
        assert_eq!(unit.html, "<html>v1</html>");
        assert_eq!(unit.file_name, "Shanuki_gamified_Listas.html");
      }
      other => panic!("unexpected {other:?}"),
    }
    match rx.recv().await {
      Some(ServerWsMessage::State { session }) => {
        assert!(!session.generating);
        assert_eq!(session.step, WizardStep::Review);
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[tokio::test]
  async fn generate_failure_reports_error_and_keeps_configure() {
    let fake = FakeModel::new(vec![Err("Gemini HTTP 500: interno".into())]);
    let (state, session) = setup(fake);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let patch = InputsPatch { topic: Some("Listas".into()), ..InputsPatch::default() };
    handle_client_ws(ClientWsMessage::UpdateInputs { inputs: patch }, &state, &session, &tx).await;
    handle_client_ws(ClientWsMessage::Generate, &state, &session, &tx).await;

    match rx.recv().await {
      Some(ServerWsMessage::Error { message }) => assert!(message.contains("interno")),
      other => panic!("unexpected {other:?}"),
    }
    match rx.recv().await {
      Some(ServerWsMessage::State { session }) => {
        assert!(!session.generating);
        assert_eq!(session.step, WizardStep::Configure);
        assert!(session.result.is_none());
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[tokio::test]
  async fn apply_feedback_replaces_result_and_clears_feedback() {
    let fake = FakeModel::new(vec![Ok(
      r#"<html>v2</html><SHANUKI_DATA>{"distractorWords":["z"]}</SHANUKI_DATA>"#.into(),
    )]);
    let (state, session) = setup(fake.clone());
    let (tx, mut rx) = mpsc::unbounded_channel();
    {
      let mut s = session.lock().await;
      s.apply_inputs(InputsPatch { topic: Some("Listas".into()), ..InputsPatch::default() });
      s.result = Some(GenerationResult { html: "<html>v1</html>".into(), distractor_words: vec!["a".into()] });
      s.step = WizardStep::Review;
    }

    handle_client_ws(ClientWsMessage::SetFeedback { text: "más retos".into() }, &state, &session, &tx).await;
    let reply = handle_client_ws(ClientWsMessage::ApplyFeedback, &state, &session, &tx).await;
    assert!(matches!(reply, Some(ServerWsMessage::State { ref session }) if session.regenerating));

    match rx.recv().await {
      Some(ServerWsMessage::Updated { unit }) => {
        assert_eq!(unit.html, "<html>v2</html>");
        assert_eq!(unit.distractor_words, vec!["z".to_string()]);
        assert_eq!(unit.file_name, "Shanuki_gamified_Listas.html");
      }
      other => panic!("unexpected {other:?}"),
    }
    match rx.recv().await {
      Some(ServerWsMessage::State { session }) => {
        assert!(!session.regenerating);
        assert!(session.feedback.is_empty());
        assert_eq!(session.result.map(|r| r.html).as_deref(), Some("<html>v2</html>"));
      }
      other => panic!("unexpected {other:?}"),
    }
    let calls = fake.calls();
    assert!(calls[0].1.contains("<html>v1</html>"));
    assert!(calls[0].1.contains("más retos"));
  }

  #[tokio::test]
  async fn failed_feedback_round_keeps_result() {
    let fake = FakeModel::new(vec![Err("Gemini HTTP 429: cuota".into())]);
    let (state, session) = setup(fake);
    let (tx, mut rx) = mpsc::unbounded_channel();
    {
      let mut s = session.lock().await;
      s.result = Some(GenerationResult { html: "<html>v1</html>".into(), distractor_words: vec!["a".into()] });
      s.set_feedback("otra paleta".into());
    }
    handle_client_ws(ClientWsMessage::ApplyFeedback, &state, &session, &tx).await;

    assert!(matches!(rx.recv().await, Some(ServerWsMessage::Error { .. })));
    match rx.recv().await {
      Some(ServerWsMessage::State { session }) => {
        assert!(!session.regenerating);
        assert_eq!(session.feedback, "otra paleta");
        assert_eq!(session.result.map(|r| r.html).as_deref(), Some("<html>v1</html>"));
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[tokio::test]
  async fn duplicate_generate_is_refused() {
    let fake = FakeModel::new(vec![]);
    let (state, session) = setup(fake);
    let (tx, _rx) = mpsc::unbounded_channel();
    {
      let mut s = session.lock().await;
      s.apply_inputs(InputsPatch { topic: Some("Listas".into()), ..InputsPatch::default() });
      s.generating = true;
    }
    let reply = handle_client_ws(ClientWsMessage::Generate, &state, &session, &tx).await;
    assert!(matches!(reply, Some(ServerWsMessage::Error { .. })));
  }

  #[tokio::test]
  async fn program_document_triggers_suggestion() {
    let fake = FakeModel::new(vec![Ok("Historia: la independencia".into())]);
    let (state, session) = setup(fake.clone());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let msg = ClientWsMessage::LoadDocument {
      kind: DocumentKind::Program,
      file_name: "historia.pdf".into(),
      pages: vec!["Unidad 1".into(), "Unidad 2".into()],
    };
    handle_client_ws(msg, &state, &session, &tx).await;

    match rx.recv().await {
      Some(ServerWsMessage::Suggestion { subject }) => assert_eq!(subject, "Historia: la independencia"),
      other => panic!("unexpected {other:?}"),
    }
    let _ = rx.recv().await;
    let s = session.lock().await;
    assert_eq!(s.inputs.interdisciplinary_subject, "Historia: la independencia");
    assert_eq!(s.inputs.reference_text.as_deref(), Some("Unidad 1 Unidad 2 "));
    assert_eq!(fake.calls()[0].0, ModelNames::default().helper);
  }

  #[tokio::test]
  async fn download_without_result_is_an_error() {
    let (state, session) = setup(FakeModel::new(vec![]));
    let (tx, _rx) = mpsc::unbounded_channel();
    let reply = handle_client_ws(ClientWsMessage::Download, &state, &session, &tx).await;
    assert!(matches!(reply, Some(ServerWsMessage::Error { .. })));
  }
}
