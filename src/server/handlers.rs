//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response as AxumResponse},
    routing::{any, delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use super::state::AppState;
use crate::capabilities::{NewSessionPayload, PayloadStore};
use crate::dialect::{Dialect, Response, Verb, WireRequest};
use crate::error::BridgeError;
use crate::pipeline::Platform;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/session", post(create_session))
        .route("/session/:id", delete(delete_session))
        .route("/session/:id/*command", any(command))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Readiness plus build and platform metadata; independent of any session.
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session_count = state.sessions.count().await;

    Json(json!({
        "value": {
            "ready": true,
            "message": "wdbridge ready for new sessions",
            "build": {
                "version": env!("CARGO_PKG_VERSION"),
            },
            "os": {
                "name": Platform::current().name(),
                "arch": std::env::consts::ARCH,
            },
            "uptimeSecs": state.uptime().as_secs(),
            "activeSessions": session_count,
        }
    }))
}

/// Create a new session: parse the payload, drive the factory pipeline,
/// register the result, and answer in the dialect the client spoke.
async fn create_session(State(state): State<Arc<AppState>>, body: Bytes) -> AxumResponse {
    let document = {
        let mut store = match PayloadStore::new(body, state.config.server.spill_threshold_bytes) {
            Ok(store) => store,
            Err(error) => return error_response(Dialect::Legacy, &error),
        };
        match store.json() {
            Ok(document) => document,
            Err(error) => return error_response(Dialect::Legacy, &error),
        }
    };

    let payload = match NewSessionPayload::parse(&document) {
        Ok(payload) => payload,
        Err(error) => return error_response(Dialect::Legacy, &error),
    };
    // An empty request document defaults to the legacy dialect.
    let downstream = payload.downstream_dialects().resolve(Dialect::W3C);

    let session = match state.pipeline.create_session(&payload).await {
        Ok(session) => session,
        Err(error) => {
            warn!(%error, "session creation failed");
            return error_response(downstream, &error);
        },
    };

    let session = state.sessions.insert(session).await;
    debug!(
        session_id = %session.id(),
        upstream = %session.upstream_dialect(),
        downstream = %session.downstream_dialect(),
        "session created"
    );

    let response = match downstream {
        Dialect::Legacy => Response::success(
            Some(session.id().to_string()),
            session.capabilities().clone(),
        ),
        Dialect::W3C => Response::success(
            None,
            json!({
                "sessionId": session.id(),
                "capabilities": session.capabilities(),
            }),
        ),
    };
    render(downstream, &response)
}

/// Tear down a session explicitly.
async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AxumResponse {
    match state.sessions.remove(&id).await {
        Some(session) => {
            session.stop().await;
            let downstream = session.downstream_dialect();
            let response = match downstream {
                Dialect::Legacy => Response::success(Some(id), Value::Null),
                Dialect::W3C => Response::success(None, Value::Null),
            };
            render(downstream, &response)
        },
        None => error_response(Dialect::W3C, &BridgeError::SessionNotFound(id)),
    }
}

/// Every in-session command: route through the session's converter,
/// serialized per session and bounded by the command timeout. Sessions
/// whose dialects match skip the codecs entirely and forward raw bytes.
async fn command(
    State(state): State<Arc<AppState>>,
    Path((id, command)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> AxumResponse {
    let Some(session) = state.sessions.get(&id).await else {
        return error_response(Dialect::W3C, &BridgeError::SessionNotFound(id));
    };
    let downstream = session.downstream_dialect();
    let timeout = state.config.server.command_timeout();
    let path = format!("/session/{id}/{command}");

    if session.converter().is_passthrough() {
        return match session
            .execute_raw(method, &path, &headers, body, timeout)
            .await
        {
            Ok((status, headers, bytes)) => raw_response(status, headers, bytes),
            Err(error) => error_response(downstream, &error),
        };
    }

    let Some(verb) = Verb::from_http(&method) else {
        return error_response(
            downstream,
            &BridgeError::UnknownCommand(format!("{method} /session/{id}/{command}")),
        );
    };

    let request_body = if body.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(error) => return error_response(downstream, &BridgeError::Json(error)),
        }
    };

    let request = WireRequest::new(verb, path, request_body);
    match session.execute(request, timeout).await {
        Ok(wire) => wire_response(wire.status, wire.body),
        Err(error) => error_response(downstream, &error),
    }
}

/// Encode a structured response in the given dialect.
fn render(dialect: Dialect, response: &Response) -> AxumResponse {
    match dialect.response_codec().encode(response) {
        Ok(wire) => wire_response(wire.status, wire.body),
        // Encoding only fails on a serialization bug; answer something
        // rather than nothing.
        Err(error) => wire_response(500, json!({"value": {"message": error.to_string()}})),
    }
}

/// Render a bridge error as a dialect-shaped error envelope.
fn error_response(dialect: Dialect, error: &BridgeError) -> AxumResponse {
    let response = Response::error(error.error_code(), error.to_string());
    render(dialect, &response)
}

fn wire_response(status: u16, body: Value) -> AxumResponse {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}

/// Relay a raw upstream response. The hop-by-hop set is already stripped;
/// content length is recomputed by the server.
fn raw_response(status: u16, mut headers: HeaderMap, body: Bytes) -> AxumResponse {
    headers.remove(header::CONTENT_LENGTH);
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, headers, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline::NewSessionPipeline;
    use http::Request;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(Config::default(), NewSessionPipeline::new()))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_status_reports_ready() {
        let router = create_router(test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/status")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["value"]["ready"], json!(true));
        assert_eq!(
            body["value"]["build"]["version"],
            json!(env!("CARGO_PKG_VERSION"))
        );
    }

    #[tokio::test]
    async fn test_new_session_with_no_backends_fails() {
        let router = create_router(test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/session")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(
                        r#"{"capabilities": {"alwaysMatch": {"browserName": "chrome"}}}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["value"]["error"], json!("session not created"));
    }

    #[tokio::test]
    async fn test_invalid_capabilities_are_rejected_before_any_backend() {
        let router = create_router(test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/session")
                    .body(axum::body::Body::from(
                        r#"{"capabilities": {"alwaysMatch": {"browserName": "x"},
                            "firstMatch": [{"browserName": "y"}]}}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        // Rendered legacy-shaped: numeric status, message in value.
        assert_eq!(body["status"], json!(61));
    }

    #[tokio::test]
    async fn test_command_for_unknown_session_is_not_found() {
        let router = create_router(test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/session/ghost/url")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["value"]["error"], json!("invalid session id"));
    }
}
