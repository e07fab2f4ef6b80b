use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use kotoba_gateway::{
    ChatRequest, ErrorInfo, ErrorKind, ExamplesRequest, GrammarRequest, KanjiRequest,
    OperationRequest, OperationResult, ProbeRequest, TranslateRequest,
};

use crate::state::AppState;

pub async fn translate(State(state): State<AppState>, Json(body): Json<TranslateRequest>) -> Response {
    respond(state.gateway.invoke(OperationRequest::Translate(body)).await)
}

pub async fn kanji(State(state): State<AppState>, Json(body): Json<KanjiRequest>) -> Response {
    respond(state.gateway.invoke(OperationRequest::ExplainKanji(body)).await)
}

pub async fn grammar(State(state): State<AppState>, Json(body): Json<GrammarRequest>) -> Response {
    respond(state.gateway.invoke(OperationRequest::ExplainGrammar(body)).await)
}

pub async fn chat(State(state): State<AppState>, Json(body): Json<ChatRequest>) -> Response {
    respond(state.gateway.invoke(OperationRequest::Chat(body)).await)
}

pub async fn examples(State(state): State<AppState>, Json(body): Json<ExamplesRequest>) -> Response {
    respond(
        state
            .gateway
            .invoke(OperationRequest::GenerateExamples(body))
            .await,
    )
}

pub async fn probe(State(state): State<AppState>, Json(body): Json<ProbeRequest>) -> Response {
    respond(state.gateway.invoke(OperationRequest::Probe(body)).await)
}

/// Connection status plus a live permission check. The permission probe is
/// the only remote side effect of this endpoint.
pub async fn status(State(state): State<AppState>) -> Response {
    let snapshot = state.manager.status();
    let permissions = if snapshot.initialized {
        match state.manager.check_permissions().await {
            Ok(report) => json!(report),
            Err(err) => json!({ "error": err }),
        }
    } else {
        json!(null)
    };
    Json(json!({
        "success": true,
        "status": snapshot,
        "permissions": permissions,
    }))
    .into_response()
}

pub async fn health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

fn respond(result: Result<OperationResult, ErrorInfo>) -> Response {
    match result {
        Ok(result) => {
            let mut body = json!({ "success": true });
            if let (Some(map), Ok(serde_json::Value::Object(fields))) =
                (body.as_object_mut(), serde_json::to_value(&result))
            {
                map.extend(fields);
            }
            Json(body).into_response()
        }
        Err(err) => error_response(&err),
    }
}

pub(crate) fn error_response(err: &ErrorInfo) -> Response {
    (
        status_for(err.kind),
        Json(json!({ "success": false, "error": err })),
    )
        .into_response()
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Configuration | ErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Upstream | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
