use crate::agent::TutorAgent;
use crate::cli::Args;
use crate::config::prompt::Feature;
use crate::error::ApiError;
use crate::history::DEFAULT_SESSION;
use crate::models::api::{
    ChatRequest,
    HealthResponse,
    ResultResponse,
    TextRequest,
    VerbRequest,
    WordRequest,
};
use std::any::Any;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    routing::{ get, post },
    Router,
    Json,
    extract::{ State, rejection::JsonRejection },
    response::{ IntoResponse, Response },
    http::HeaderMap,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{ Any as CorsAny, CorsLayer };
use log::{ info, error, debug };

pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Clone)]
struct AppState {
    agent: Arc<TutorAgent>,
}

pub fn router(agent: Arc<TutorAgent>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(CorsAny)
        .allow_methods(CorsAny)
        .allow_headers(CorsAny);

    Router::new()
        .route("/api/assist", post(assist_handler))
        .route("/api/conjugate", post(conjugate_handler))
        .route("/api/define", post(define_handler))
        .route("/api/translate_to_spanish", post(translate_to_spanish_handler))
        .route("/api/translate_to_english", post(translate_to_english_handler))
        .route("/api/chatbot", post(chatbot_handler))
        .route("/api/reset_conversation", post(reset_conversation_handler))
        .route("/api/health", get(health_handler))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .with_state(AppState { agent })
}

pub async fn start_http_server(
    args: &Args,
    agent: Arc<TutorAgent>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = args.server_addr.parse::<SocketAddr>()?;
    let app = router(agent);

    if args.enable_tls {
        let (cert_path, key_path) = match (&args.tls_cert_path, &args.tls_key_path) {
            (Some(cert_path), Some(key_path)) => (cert_path, key_path),
            _ => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                return Err("TLS enabled without cert/key".into());
            }
        };
        info!(
            "TLS enabled. Loading certificate from '{}' and key from '{}'",
            cert_path,
            key_path
        );
        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            cert_path,
            key_path
        ).await?;

        info!("Starting HTTPS API server on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
            e
        })?;
        info!("Starting HTTP API server on: http://{}", addr);
        axum::serve(listener, app.into_make_service()).await?;
    }

    Ok(())
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| {
            debug!("Rejected request body: {}", rejection.body_text());
            ApiError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
        })
}

fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}

async fn answer(
    state: &AppState,
    feature: Feature,
    input: &str
) -> Result<Json<ResultResponse<String>>, ApiError> {
    let result = state.agent.answer(feature, input).await?;
    Ok(Json(ResultResponse { result }))
}

async fn assist_handler(
    State(state): State<AppState>,
    payload: Result<Json<TextRequest>, JsonRejection>
) -> Result<Json<ResultResponse<String>>, ApiError> {
    let req = parse_body(payload)?;
    answer(&state, Feature::Assist, &req.text).await
}

async fn define_handler(
    State(state): State<AppState>,
    payload: Result<Json<WordRequest>, JsonRejection>
) -> Result<Json<ResultResponse<String>>, ApiError> {
    let req = parse_body(payload)?;
    answer(&state, Feature::Define, &req.word).await
}

async fn translate_to_spanish_handler(
    State(state): State<AppState>,
    payload: Result<Json<TextRequest>, JsonRejection>
) -> Result<Json<ResultResponse<String>>, ApiError> {
    let req = parse_body(payload)?;
    answer(&state, Feature::TranslateToSpanish, &req.text).await
}

async fn translate_to_english_handler(
    State(state): State<AppState>,
    payload: Result<Json<TextRequest>, JsonRejection>
) -> Result<Json<ResultResponse<String>>, ApiError> {
    let req = parse_body(payload)?;
    answer(&state, Feature::TranslateToEnglish, &req.text).await
}

async fn conjugate_handler(
    State(state): State<AppState>,
    payload: Result<Json<VerbRequest>, JsonRejection>
) -> Result<Response, ApiError> {
    let req = parse_body(payload)?;
    debug!("Received request to conjugate verb: {}", req.verb);

    // structured-content failures are still 200 so the caller can show the raw text
    let response = match state.agent.conjugate(&req.verb).await?.into_result() {
        Ok(table) => Json(ResultResponse { result: table }).into_response(),
        Err(fallback) => Json(fallback).into_response(),
    };
    Ok(response)
}

async fn chatbot_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>
) -> Result<Json<ResultResponse<String>>, ApiError> {
    let req = parse_body(payload)?;
    let query = req.query.unwrap_or_default();
    let result = state.agent.chat(&session_id(&headers), &query).await?;
    Ok(Json(ResultResponse { result }))
}

async fn reset_conversation_handler(
    State(state): State<AppState>,
    headers: HeaderMap
) -> Json<ResultResponse<String>> {
    state.agent.reset_conversation(&session_id(&headers)).await;
    Json(ResultResponse { result: "Conversation history reset successfully".into() })
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", model: state.agent.model() })
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::Internal(details).into_response()
}
