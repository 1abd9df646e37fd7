//! Capabilities the client borrows from its host application.
//!
//! # Design
//! The client never reaches into global state. The auth session, the
//! notification sink and the router are handed in at construction as trait
//! objects, so a UI can plug in its own stores and tests can plug in
//! recorders. The default implementations here are enough for headless use:
//! an in-memory token slot, notifications logged through `tracing`, and a
//! navigator that only logs.

use std::sync::RwLock;

/// Route the host navigates to when the session expires.
pub const LOGIN_ROUTE: &str = "/login";

/// Source of the current bearer token, and the way to end the session.
pub trait AuthStore: Send + Sync {
    /// Current token, if logged in. Read once per outgoing request.
    ///
    /// The token is sent verbatim in the `Authorization` header. A token with
    /// bytes that are not valid in a header value (control characters such
    /// as `\n`) makes the transport reject the request before it is sent,
    /// surfacing as `ApiError::Transport`.
    fn token(&self) -> Option<String>;

    /// Drop the stored session.
    fn logout(&self);
}

/// Sink for user-visible error notifications.
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);
}

/// Host navigation, used to send the user back to the login page.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Token slot held in memory.
#[derive(Debug, Default)]
pub struct MemoryAuthStore {
    token: RwLock<Option<String>>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    pub fn set_token(&self, token: impl Into<String>) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(token.into());
    }
}

impl AuthStore for MemoryAuthStore {
    fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn logout(&self) {
        self.token.write().unwrap_or_else(|e| e.into_inner()).take();
    }
}

/// Emits notifications as `warn` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, message: &str) {
        tracing::warn!(target: "design_core::notify", "{message}");
    }
}

/// Logs navigation requests without acting on them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: &str) {
        tracing::info!(%route, "navigation requested");
    }
}
