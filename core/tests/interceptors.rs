//! Interceptor behaviour across endpoints, against a scripted transport.
//!
//! # Design
//! `Scripted` answers every request with the next canned outcome and records
//! what it was sent, so each test can assert on the exact outgoing headers
//! and on the notifications, logouts and redirects a response triggers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use design_core::interceptor::{SERVER_ERROR_MESSAGE, SESSION_EXPIRED_MESSAGE, UNKNOWN_ERROR_MESSAGE};
use design_core::{
    ApiClient, ApiError, AuthStore, ClientConfig, Credentials, HttpMethod, HttpRequest, HttpResponse,
    MemoryAuthStore, Navigator, Notifier, ProjectUpdate, Transport,
};
use uuid::Uuid;

const BASE_URL: &str = "http://backend.test/api/v1";

#[derive(Default)]
struct Scripted {
    outcomes: Mutex<VecDeque<Result<HttpResponse, ApiError>>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl Scripted {
    fn respond(&self, status: u16, body: &str) {
        self.outcomes.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body: Bytes::from(body.to_string()),
        }));
    }

    fn fail(&self, err: ApiError) {
        self.outcomes.lock().unwrap().push_back(Err(err));
    }

    fn last_sent(&self) -> HttpRequest {
        self.sent.lock().unwrap().last().cloned().expect("nothing sent")
    }
}

#[async_trait]
impl Transport for Scripted {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.sent.lock().unwrap().push(request);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted outcome left")
    }
}

#[derive(Default)]
struct Recorder {
    notifications: Mutex<Vec<String>>,
    routes: Mutex<Vec<String>>,
}

impl Notifier for Recorder {
    fn error(&self, message: &str) {
        self.notifications.lock().unwrap().push(message.to_string());
    }
}

impl Navigator for Recorder {
    fn navigate(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_string());
    }
}

struct Harness {
    client: ApiClient,
    transport: Arc<Scripted>,
    auth: Arc<MemoryAuthStore>,
    recorder: Arc<Recorder>,
}

fn harness(token: Option<&str>) -> Harness {
    let transport = Arc::new(Scripted::default());
    let auth = Arc::new(match token {
        Some(token) => MemoryAuthStore::with_token(token),
        None => MemoryAuthStore::new(),
    });
    let recorder = Arc::new(Recorder::default());
    let config = ClientConfig::new(BASE_URL).unwrap();
    let client = ApiClient::with_transport(&config, transport.clone(), auth.clone())
        .with_notifier(recorder.clone())
        .with_navigator(recorder.clone());
    Harness {
        client,
        transport,
        auth,
        recorder,
    }
}

impl Harness {
    fn notifications(&self) -> Vec<String> {
        self.recorder.notifications.lock().unwrap().clone()
    }

    fn routes(&self) -> Vec<String> {
        self.recorder.routes.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// Outgoing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn token_is_sent_as_bearer_header() {
    let h = harness(Some("tok-123"));
    h.transport.respond(200, r#"{"status":"healthy"}"#);

    h.client.get_health_status().await.unwrap();

    let sent = h.transport.last_sent();
    assert_eq!(sent.header("Authorization"), Some("Bearer tok-123"));
}

#[tokio::test]
async fn no_token_means_no_header() {
    let h = harness(None);
    h.transport.respond(200, r#"{"status":"healthy"}"#);

    h.client.get_health_status().await.unwrap();

    assert_eq!(h.transport.last_sent().header("Authorization"), None);
}

#[tokio::test]
async fn token_is_read_at_send_time() {
    let h = harness(None);
    h.transport.respond(200, r#"{"status":"healthy"}"#);
    h.transport.respond(200, r#"{"status":"healthy"}"#);

    h.client.get_health_status().await.unwrap();
    h.auth.set_token("late");
    h.client.get_health_status().await.unwrap();

    let sent = h.transport.sent.lock().unwrap();
    assert_eq!(sent[0].header("Authorization"), None);
    assert_eq!(sent[1].header("Authorization"), Some("Bearer late"));
}

// ---------------------------------------------------------------------------
// Incoming
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unauthorized_terminates_session() {
    let h = harness(Some("stale"));
    h.transport.respond(401, r#"{"detail":"Could not validate credentials"}"#);

    let err = h.client.get_projects().await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(h.auth.token(), None);
    assert_eq!(h.notifications(), vec![SESSION_EXPIRED_MESSAGE]);
    assert_eq!(h.routes(), vec!["/login"]);
}

#[tokio::test]
async fn server_error_notifies_once() {
    for status in [500, 502, 599] {
        let h = harness(Some("tok"));
        h.transport.respond(status, r#"{"detail":"stack trace"}"#);

        let err = h.client.get_project(Uuid::nil()).await.unwrap_err();

        assert_eq!(err.status(), Some(status));
        assert_eq!(h.notifications(), vec![SERVER_ERROR_MESSAGE]);
        assert_eq!(h.auth.token().as_deref(), Some("tok"));
        assert!(h.routes().is_empty());
    }
}

#[tokio::test]
async fn detail_is_shown_verbatim() {
    let h = harness(Some("tok"));
    h.transport.respond(404, r#"{"detail":"Project not found"}"#);

    let err = h
        .client
        .update_project(Uuid::nil(), &ProjectUpdate::default())
        .await
        .unwrap_err();

    assert_eq!(err.detail(), Some("Project not found"));
    assert_eq!(h.notifications(), vec!["Project not found"]);
}

#[tokio::test]
async fn failure_without_detail_is_unknown() {
    let h = harness(Some("tok"));
    h.transport.respond(400, r#"{"error":"bad"}"#);

    h.client.get_budget(Uuid::nil()).await.unwrap_err();

    assert_eq!(h.notifications(), vec![UNKNOWN_ERROR_MESSAGE]);
}

#[tokio::test]
async fn transport_failure_is_unknown_and_propagated() {
    let h = harness(Some("tok"));
    h.transport.fail(ApiError::Timeout);

    let err = h.client.download_model(Uuid::nil()).await.unwrap_err();

    assert!(matches!(err, ApiError::Timeout));
    assert_eq!(h.notifications(), vec![UNKNOWN_ERROR_MESSAGE]);
    assert_eq!(h.auth.token().as_deref(), Some("tok"));
}

#[tokio::test]
async fn success_emits_nothing() {
    let h = harness(Some("tok"));
    h.transport.respond(200, r#"{"items":[],"total":0,"page":1,"size":20}"#);

    let projects = h.client.get_projects().await.unwrap();

    assert!(projects.is_empty());
    assert!(h.notifications().is_empty());
}

#[tokio::test]
async fn malformed_success_body_is_not_notified() {
    let h = harness(Some("tok"));
    h.transport.respond(200, "<html>");

    let err = h.client.get_system_stats().await.unwrap_err();

    assert!(matches!(err, ApiError::Deserialization(_)));
    assert!(h.notifications().is_empty());
}

// ---------------------------------------------------------------------------
// Endpoint contract
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_posts_credentials_and_returns_body() {
    let h = harness(None);
    h.transport.respond(200, r#"{"access_token":"abc","token_type":"bearer"}"#);

    let token = h
        .client
        .login(&Credentials {
            username: "a".to_string(),
            password: "b".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(token.access_token, "abc");
    assert_eq!(token.token_type, "bearer");
    let sent = h.transport.last_sent();
    assert_eq!(sent.method, HttpMethod::Post);
    assert_eq!(sent.url, format!("{BASE_URL}/auth/login"));
    let body: serde_json::Value = serde_json::from_str(sent.body.as_json().unwrap()).unwrap();
    assert_eq!(body, serde_json::json!({"username": "a", "password": "b"}));
    // Login does not store the token itself.
    assert_eq!(h.auth.token(), None);
}

#[tokio::test]
async fn calculate_budget_defaults_margin() {
    let h = harness(Some("tok"));
    let project_id = Uuid::new_v4();
    h.transport.respond(
        201,
        &format!(
            r#"{{"id":"{}","project_id":"{project_id}","material_cost":10,"component_cost":6.5,
                "printing_cost":9,"labor_cost":20,"final_price":59.15,"profit_margin":30,"items":[]}}"#,
            Uuid::new_v4()
        ),
    );

    let budget = h.client.calculate_budget(project_id, None).await.unwrap();

    assert_eq!(budget.project_id, project_id);
    let sent = h.transport.last_sent();
    let body: serde_json::Value = serde_json::from_str(sent.body.as_json().unwrap()).unwrap();
    assert_eq!(body["profit_margin"], 30.0);
    assert_eq!(body["project_id"], project_id.to_string());
}

#[tokio::test]
async fn downloads_return_raw_bytes() {
    let h = harness(Some("tok"));
    h.transport.respond(200, "%PDF-1.4");

    let pdf = h.client.download_proposal(Uuid::nil()).await.unwrap();

    assert_eq!(&pdf[..], b"%PDF-1.4");
    assert!(h
        .transport
        .last_sent()
        .url
        .ends_with("/budgeting/00000000-0000-0000-0000-000000000000/download-proposal"));
}
