//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws` (one wizard session per connection)
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/catalog", get(http::http_get_catalog))
        .route("/api/v1/units", post(http::http_post_unit))
        .route("/api/v1/units/update", post(http::http_post_update))
        .route("/api/v1/suggest", post(http::http_post_suggest))
        .route("/api/v1/documents", post(http::http_post_document))
        .route("/api/v1/download", post(http::http_post_download))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::gemini::{ModelNames, TextModel};
    use crate::interpreter::HTML_FAILURE_MARKER;
    use crate::logic::tests::FakeModel;

    fn app_with(model: Option<Arc<FakeModel>>) -> Router {
        let model = model.map(|m| m as Arc<dyn TextModel>);
        build_router(Arc::new(AppState::from_parts(AppConfig::default(), ModelNames::default(), model)))
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let req = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn health_reports_generation_availability() {
        let res = app_with(None)
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let v: Value = serde_json::from_slice(&to_bytes(res.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(v, json!({ "ok": true, "generation": false }));
    }

    #[tokio::test]
    async fn catalog_lists_levels_and_defaults() {
        let res = app_with(None)
            .oneshot(Request::get("/api/v1/catalog").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let v: Value = serde_json::from_slice(&to_bytes(res.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(v["levels"].as_array().unwrap().len(), 6);
        assert_eq!(v["narrativeThemes"][0], "Cyberpunk / Hackers del Futuro");
        assert_eq!(v["defaults"]["language"], "Python");
        assert_eq!(v["defaults"]["mode"], "gamified");
    }

    #[tokio::test]
    async fn unit_endpoint_returns_parsed_unit() {
        let fake = FakeModel::new(vec![Ok(
            r#"<html><body>X</body></html><SHANUKI_DATA>{"distractorWords":["a","b"]}</SHANUKI_DATA>"#.into(),
        )]);
        let (status, v) = post_json(
            app_with(Some(fake)),
            "/api/v1/units",
            json!({ "topic": "Ciclos For", "level": "7mo Año (EBI)", "mode": "gamified", "narrativeTheme": "Detectives / Misterio Noir" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["html"], "<html><body>X</body></html>");
        assert_eq!(v["distractorWords"], json!(["a", "b"]));
        assert_eq!(v["fileName"], "Shanuki_gamified_Ciclos_For.html");
    }

    #[tokio::test]
    async fn pbl_without_context_is_rejected_before_model_call() {
        let fake = FakeModel::new(vec![]);
        let (status, v) = post_json(
            app_with(Some(fake.clone())),
            "/api/v1/units",
            json!({ "topic": "Listas", "level": "7mo Año (EBI)", "mode": "pbl", "interdisciplinarySubject": "Arte" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(v["error"].as_str().unwrap().contains("ABP"));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn model_failure_maps_to_bad_gateway() {
        let fake = FakeModel::new(vec![Err("Gemini HTTP 401 Unauthorized: bad key".into())]);
        let (status, v) = post_json(
            app_with(Some(fake)),
            "/api/v1/units/update",
            json!({ "currentHtml": "<html></html>", "feedbackText": "más ejercicios" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(v["error"].as_str().unwrap().contains("bad key"));
    }

    #[tokio::test]
    async fn update_with_garbage_reply_still_returns_unit() {
        let fake = FakeModel::new(vec![Ok("no hay html".into())]);
        let (status, v) = post_json(
            app_with(Some(fake)),
            "/api/v1/units/update",
            json!({ "currentHtml": "<html></html>", "feedbackText": "otra vez", "mode": "pbl", "topic": "Listas" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["html"], HTML_FAILURE_MARKER);
        assert_eq!(v["distractorWords"].as_array().unwrap().len(), 6);
        assert_eq!(v["fileName"], "Shanuki_pbl_Listas.html");
    }

    #[tokio::test]
    async fn generation_without_api_key_is_unavailable() {
        let (status, _) = post_json(
            app_with(None),
            "/api/v1/suggest",
            json!({ "referenceText": "Programa de Biología", "level": "7mo Año (EBI)" }),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn suggest_returns_trimmed_subject() {
        let fake = FakeModel::new(vec![Ok(" Matemática: estadística \n".into())]);
        let (status, v) = post_json(
            app_with(Some(fake)),
            "/api/v1/suggest",
            json!({ "referenceText": "Unidad 3: estadística descriptiva", "level": "9no Año (EBI)" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["subject"], "Matemática: estadística");
    }

    #[tokio::test]
    async fn documents_keep_first_six_pages() {
        let pages: Vec<String> = (1..=8).map(|i| format!("p{i}")).collect();
        let (status, v) = post_json(app_with(None), "/api/v1/documents", json!({ "pages": pages })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["pagesUsed"], 6);
        assert_eq!(v["text"], "p1 p2 p3 p4 p5 p6 ");
    }

    #[tokio::test]
    async fn download_is_an_html_attachment() {
        let req = Request::post("/api/v1/download")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "html": "<html>ok</html>", "mode": "pbl", "topic": "Bases de datos" }).to_string()))
            .unwrap();
        let res = app_with(None).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let disposition = res.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.contains("filename=\"Shanuki_pbl_Bases_de_datos.html\""));
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<html>ok</html>");
    }
}
