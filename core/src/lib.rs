//! Async API client for the design workflow backend.
//!
//! # Overview
//! Typed access to a backend that takes a product from a conversational
//! requirements capture, through 3D model generation and physical
//! simulation, to a priced budget and proposal.
//!
//! # Design
//! - `Endpoints` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network.
//! - `Transport` executes requests; `ReqwestTransport` is the default.
//! - `ApiClient` runs every call through the same two interceptors: bearer
//!   token injection on the way out, error classification and notification
//!   on the way back.
//! - The auth session, notification sink and router are injected through
//!   the traits in `hooks`, never read from globals.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod hooks;
pub mod http;
pub mod interceptor;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use endpoints::Endpoints;
pub use error::ApiError;
pub use hooks::{AuthStore, LogNavigator, MemoryAuthStore, Navigator, Notifier, TracingNotifier};
pub use http::{FormField, HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use interceptor::ErrorClass;
pub use transport::{ReqwestTransport, Transport};
pub use types::*;
