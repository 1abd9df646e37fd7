//! Cross-cutting request and response policies.
//!
//! # Design
//! Both hooks run for every endpoint; no endpoint has its own error
//! handling. The outgoing hook only ever adds a header. The incoming hook
//! classifies a failure, performs the side effects for its class, and hands
//! the error back untouched so the caller still sees the rejection.

use crate::error::ApiError;
use crate::hooks::{AuthStore, Navigator, Notifier, LOGIN_ROUTE};
use crate::http::{HttpRequest, AUTHORIZATION};

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";
pub const SERVER_ERROR_MESSAGE: &str = "Internal server error. Please try again later.";
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error. Please try again.";

/// How a failed request is surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    /// HTTP 401: the session is terminated.
    SessionExpired,
    /// HTTP 5xx.
    ServerFault,
    /// The backend explained itself in a `detail` field.
    Detail(String),
    /// Anything else, including failures without a response.
    Unknown,
}

impl ErrorClass {
    /// Classify in priority order: 401, then 5xx, then `detail`, then unknown.
    pub fn of(err: &ApiError) -> Self {
        match err {
            ApiError::Http { status: 401, .. } => ErrorClass::SessionExpired,
            ApiError::Http { status, .. } if *status >= 500 => ErrorClass::ServerFault,
            ApiError::Http {
                detail: Some(detail),
                ..
            } => ErrorClass::Detail(detail.clone()),
            _ => ErrorClass::Unknown,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ErrorClass::SessionExpired => SESSION_EXPIRED_MESSAGE,
            ErrorClass::ServerFault => SERVER_ERROR_MESSAGE,
            ErrorClass::Detail(detail) => detail,
            ErrorClass::Unknown => UNKNOWN_ERROR_MESSAGE,
        }
    }
}

/// Attach `Authorization: Bearer <token>` when the store holds a token.
pub fn authorize(request: &mut HttpRequest, auth: &dyn AuthStore) {
    if let Some(token) = auth.token() {
        request.set_header(AUTHORIZATION, format!("Bearer {token}"));
    }
}

/// Run the side effects for a failed request and return the error as-is.
pub fn surface_error(
    err: ApiError,
    auth: &dyn AuthStore,
    notifier: &dyn Notifier,
    navigator: &dyn Navigator,
) -> ApiError {
    let class = ErrorClass::of(&err);
    tracing::warn!(error = %err, ?class, "request failed");
    if class == ErrorClass::SessionExpired {
        auth.logout();
        notifier.error(class.message());
        navigator.navigate(LOGIN_ROUTE);
    } else {
        notifier.error(class.message());
    }
    err
}
