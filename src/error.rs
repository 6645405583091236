use std::path::PathBuf;

use axum::response::{IntoResponse, Response};
use axum::Json;

/// Why a persisted credential could not be used. Never leaves the
/// credential store: every variant means "authorize again".
#[derive(Debug, thiserror::Error)]
pub enum CacheMiss {
    #[error("no credential file")]
    Missing,
    #[error("could not read credential file")]
    Unreadable(#[source] std::io::Error),
    #[error("credential file is malformed")]
    Malformed(#[source] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("user declined authorization: {0}")]
    Declined(String),
    #[error("authorization redirect carried an unexpected state")]
    StateMismatch,
    #[error("authorization flow failed: {0}")]
    Flow(String),
    #[error("could not exchange authorization code")]
    Exchange(#[source] UpstreamError),
    #[error("could not read client secret from {}", path.display())]
    ClientSecret {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, thiserror::Error)]
#[error("could not write credential to {}", path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request to Google failed")]
    Request(#[from] reqwest::Error),
    #[error("Google responded {status}: {body}")]
    Status { status: http::StatusCode, body: String },
    #[error("no access token and no refresh token to mint one")]
    NoRefreshToken,
    #[error("could not mint an access token")]
    Refresh(#[source] Box<UpstreamError>),
    #[error("response lacks `{0}`")]
    MissingField(&'static str),
    #[error(transparent)]
    InsufficientScope(#[from] InsufficientScopeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("insufficient scope to perform request")]
pub struct InsufficientScopeError(());

impl InsufficientScopeError {
    pub(crate) fn new() -> Self {
        Self(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let err = &self as &(dyn std::error::Error + 'static);
        tracing::error!(err, "error creating Meet link");
        let body = serde_json::json!({ "error": "Internal Server Error" });
        (http::StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
