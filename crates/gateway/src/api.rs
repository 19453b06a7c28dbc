//! Assistant HTTP API.
//!
//! Endpoints:
//!
//! - `GET  /v1/assistants`               - List enabled assistants and their tools
//! - `POST /v1/assistants/{name}/query`  - Send a message, get an answer
//! - `POST /v1/assistants/{name}/search` - Search an assistant's knowledge base
//! - `POST /agency-ai-query`, `/scout-ai-query`, `/finance-ppm-ai-query` - legacy aliases
//!
//! Every response uses the `{success, data}` / `{success, error}` envelope.

use axum::{
    Router,
    extract::rejection::JsonRejection,
    extract::{FromRequestParts, Path, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};
use workroom_assistant::{AssistantQuery, AssistantReply, Orchestrator};
use workroom_core::error::Error;
use workroom_core::identity::UserProfile;

use crate::SharedState;
use crate::auth::AuthError;

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/v1/assistants", get(list_assistants_handler))
        .route("/v1/assistants/{name}/query", post(query_handler))
        .route("/v1/assistants/{name}/search", post(search_handler))
        .route("/agency-ai-query", post(agency_query_handler))
        .route("/scout-ai-query", post(scout_query_handler))
        .route("/finance-ppm-ai-query", post(finance_ppm_query_handler))
}

// ── Envelope and errors ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("User not found")]
    UnknownUser,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    NotFound(String),

    /// The language model or embedding API failed.
    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(msg) => ApiError::BadRequest(msg),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Forbidden(msg) => ApiError::Forbidden(msg),
            Error::Provider(e) => ApiError::Upstream(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::UnknownUser | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            debug!(status = status.as_u16(), error = %self, "Request rejected");
        }
        let body = ErrorEnvelope {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ── Caller identity ───────────────────────────────────────────────────────

/// The authenticated caller, resolved from the bearer token.
///
/// Runs before any body parsing, so unauthenticated requests never reach
/// validation or storage.
pub struct Caller(pub UserProfile);

impl FromRequestParts<SharedState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = state.auth.authenticate(&parts.headers)?;
        match state.users.lookup(&user_id).await {
            Ok(Some(profile)) => Ok(Caller(profile)),
            Ok(None) => {
                warn!(user = %user_id, "Token subject is not a known user");
                Err(ApiError::UnknownUser)
            }
            Err(e) => Err(Error::Store(e).into()),
        }
    }
}

fn assistant(state: &SharedState, name: &str) -> Result<Arc<Orchestrator>, ApiError> {
    state
        .assistants
        .get(name)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown assistant: {name}")))
}

// ── Query ─────────────────────────────────────────────────────────────────

async fn run_query(
    state: &SharedState,
    caller: UserProfile,
    name: &str,
    body: Result<Json<AssistantQuery>, JsonRejection>,
) -> Result<Json<Envelope<AssistantReply>>, ApiError> {
    let orchestrator = assistant(state, name)?;
    let Json(query) = body?;
    let reply = orchestrator.handle(&caller, query).await?;
    Ok(Envelope::ok(reply))
}

async fn query_handler(
    State(state): State<SharedState>,
    Caller(caller): Caller,
    Path(name): Path<String>,
    body: Result<Json<AssistantQuery>, JsonRejection>,
) -> Result<Json<Envelope<AssistantReply>>, ApiError> {
    run_query(&state, caller, &name, body).await
}

async fn agency_query_handler(
    State(state): State<SharedState>,
    Caller(caller): Caller,
    body: Result<Json<AssistantQuery>, JsonRejection>,
) -> Result<Json<Envelope<AssistantReply>>, ApiError> {
    run_query(&state, caller, "agency", body).await
}

async fn scout_query_handler(
    State(state): State<SharedState>,
    Caller(caller): Caller,
    body: Result<Json<AssistantQuery>, JsonRejection>,
) -> Result<Json<Envelope<AssistantReply>>, ApiError> {
    run_query(&state, caller, "scout", body).await
}

async fn finance_ppm_query_handler(
    State(state): State<SharedState>,
    Caller(caller): Caller,
    body: Result<Json<AssistantQuery>, JsonRejection>,
) -> Result<Json<Envelope<AssistantReply>>, ApiError> {
    run_query(&state, caller, "finance_ppm", body).await
}

// ── Search ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: String,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    category: Option<String>,
}

async fn search_handler(
    State(state): State<SharedState>,
    Caller(caller): Caller,
    Path(name): Path<String>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let orchestrator = assistant(&state, &name)?;
    let Json(req) = body?;
    let results = orchestrator
        .search_knowledge(&caller, &req.query, req.limit, req.category.as_deref())
        .await?;
    Ok(Envelope::ok(results))
}

// ── Listing ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct AssistantSummary {
    name: String,
    display_name: String,
    model: String,
    retrieval: bool,
    tools: Vec<String>,
}

#[derive(Serialize)]
struct AssistantList {
    assistants: Vec<AssistantSummary>,
    count: usize,
}

async fn list_assistants_handler(
    State(state): State<SharedState>,
    Caller(_caller): Caller,
) -> Json<Envelope<AssistantList>> {
    let assistants: Vec<AssistantSummary> = state
        .assistants
        .iter()
        .map(|a| {
            let profile = a.profile();
            AssistantSummary {
                name: profile.name.clone(),
                display_name: profile.display_name.clone(),
                model: profile.model.clone(),
                retrieval: profile.retrieval,
                tools: a.tool_names().into_iter().map(String::from).collect(),
            }
        })
        .collect();
    let count = assistants.len();
    Envelope::ok(AssistantList { assistants, count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use workroom_core::error::{ProviderError, StoreError};

    #[test]
    fn core_errors_map_to_status_classes() {
        let cases = [
            (Error::Validation("message is required".into()), StatusCode::BAD_REQUEST),
            (Error::NotFound("Conversation not found".into()), StatusCode::NOT_FOUND),
            (
                Error::Provider(ProviderError::Timeout("30s".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                Error::Store(StoreError::Storage("disk full".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        assert_eq!(ApiError::UnknownUser.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::PayloadTooLarge("length limit exceeded".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::Auth(AuthError::MissingCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn validation_message_is_kept_verbatim() {
        let err = ApiError::from(Error::Validation("message is required".into()));
        assert_eq!(err.to_string(), "message is required");
    }
}
