use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::app;
use mock_server::models::{
    Budget, Conversation, Health, MessageResponse, Model, Page, Project, Proposal, Simulation,
    SimulationResults, Stats, Status, TokenResponse, User,
};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "XBOUNDARYX";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn detail(response: axum::response::Response) -> String {
    let body: Value = body_json(response).await;
    body["detail"].as_str().unwrap().to_string()
}

async fn call(app: &Router, request: Request<String>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body.to_string()).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<String> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(String::new()).unwrap()
}

fn multipart_request(uri: &str, token: &str, fields: &[(&str, &str)]) -> Request<String> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
        .body(body)
        .unwrap()
}

/// Register and log in a fresh user, returning the bearer token.
async fn login(app: &Router, username: &str) -> String {
    let resp = call(
        app,
        json_request(
            "POST",
            "/api/v1/auth/register",
            None,
            &format!(r#"{{"email":"{username}@example.com","username":"{username}","password":"pw"}}"#),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = call(
        app,
        json_request(
            "POST",
            "/api/v1/auth/login",
            None,
            &format!(r#"{{"username":"{username}","password":"pw"}}"#),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let token: TokenResponse = body_json(resp).await;
    assert_eq!(token.token_type, "bearer");
    token.access_token
}

async fn create_project(app: &Router, token: &str) -> Project {
    let resp = call(
        app,
        json_request(
            "POST",
            "/api/v1/projects/",
            Some(token),
            r#"{"name":"Bracket","description":"Wall shelf bracket","category":"mechanical"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

// --- system ---

#[tokio::test]
async fn health_is_public() {
    let resp = call(&app(), get("/api/v1/health", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let health: Health = body_json(resp).await;
    assert_eq!(health.status, "healthy");
    assert!(health.services.contains_key("storage"));
}

// --- auth ---

#[tokio::test]
async fn protected_routes_require_token() {
    let app = app();
    let resp = call(&app, get("/api/v1/projects", None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(detail(resp).await, "Not authenticated");

    let resp = call(&app, get("/api/v1/projects", Some("forged"))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_returns_created_user() {
    let resp = call(
        &app(),
        json_request(
            "POST",
            "/api/v1/auth/register",
            None,
            r#"{"email":"ada@example.com","username":"ada","password":"pw","full_name":"Ada L"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let user: User = body_json(resp).await;
    assert_eq!(user.username, "ada");
    assert_eq!(user.full_name.as_deref(), Some("Ada L"));
    assert!(user.is_active);
}

#[tokio::test]
async fn duplicate_registration_is_rejected_with_detail() {
    let app = app();
    login(&app, "ada").await;
    let resp = call(
        &app,
        json_request(
            "POST",
            "/api/v1/auth/register",
            None,
            r#"{"email":"other@example.com","username":"ada","password":"pw"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail(resp).await, "Username or email already registered");
}

#[tokio::test]
async fn wrong_password_is_rejected_with_detail() {
    let app = app();
    login(&app, "ada").await;
    let resp = call(
        &app,
        json_request(
            "POST",
            "/api/v1/auth/login",
            None,
            r#"{"username":"ada","password":"nope"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail(resp).await, "Incorrect username or password");
}

// --- projects ---

#[tokio::test]
async fn project_lifecycle() {
    let app = app();
    let token = login(&app, "ada").await;

    let created = create_project(&app, &token).await;
    assert_eq!(created.status, Status::Draft);

    let resp = call(&app, get("/api/v1/projects", Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page: Page<Project> = body_json(resp).await;
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, created.id);

    let resp = call(
        &app,
        json_request(
            "PUT",
            &format!("/api/v1/projects/{}", created.id),
            Some(&token),
            r#"{"name":"Shelf bracket"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Project = body_json(resp).await;
    assert_eq!(updated.name, "Shelf bracket");
    assert_eq!(updated.description, "Wall shelf bracket"); // unchanged

    let resp = call(&app, get(&format!("/api/v1/projects/{}", created.id), Some(&token))).await;
    let fetched: Project = body_json(resp).await;
    assert_eq!(fetched.name, "Shelf bracket");
}

#[tokio::test]
async fn projects_are_private_to_their_owner() {
    let app = app();
    let ada = login(&app, "ada").await;
    let bob = login(&app, "bob").await;
    let project = create_project(&app, &ada).await;

    let resp = call(&app, get(&format!("/api/v1/projects/{}", project.id), Some(&bob))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(detail(resp).await, "Project not found");

    let resp = call(&app, get("/api/v1/projects", Some(&bob))).await;
    let page: Page<Project> = body_json(resp).await;
    assert!(page.items.is_empty());
}

// --- conversational ---

#[tokio::test]
async fn conversation_collects_specs() {
    let app = app();
    let token = login(&app, "ada").await;
    let project = create_project(&app, &token).await;

    let resp = call(
        &app,
        json_request(
            "POST",
            "/api/v1/conversational/start",
            Some(&token),
            &format!(r#"{{"project_id":"{}"}}"#, project.id),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let start: MessageResponse = body_json(resp).await;
    assert_eq!(start.clarifications_needed.len(), 2);

    let resp = call(
        &app,
        json_request(
            "POST",
            "/api/v1/conversational/message",
            Some(&token),
            &format!(
                r#"{{"message":"material=PLA dimensions=120x40x10","conversation_id":"{}"}}"#,
                start.conversation_id
            ),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let reply: MessageResponse = body_json(resp).await;
    assert!(reply.clarifications_needed.is_empty());
    assert_eq!(reply.extracted_specs["material"], "PLA");

    let resp = call(
        &app,
        get(&format!("/api/v1/conversational/{}", start.conversation_id), Some(&token)),
    )
    .await;
    let conversation: Conversation = body_json(resp).await;
    assert_eq!(conversation.project_id, Some(project.id));
    assert_eq!(conversation.messages.len(), 3);

    let resp = call(&app, get(&format!("/api/v1/projects/{}", project.id), Some(&token))).await;
    let project: Project = body_json(resp).await;
    assert_eq!(project.status, Status::Conversing);
}

#[tokio::test]
async fn conversation_without_project_is_allowed() {
    let app = app();
    let token = login(&app, "ada").await;
    let resp = call(
        &app,
        json_request("POST", "/api/v1/conversational/start", Some(&token), "{}"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

// --- modeling ---

#[tokio::test]
async fn generate_model_from_multipart() {
    let app = app();
    let token = login(&app, "ada").await;
    let project = create_project(&app, &token).await;
    let project_id = project.id.to_string();

    let resp = call(
        &app,
        multipart_request(
            "/api/v1/modeling/generate",
            &token,
            &[
                ("project_id", project_id.as_str()),
                ("specifications", r#"{"name":"bracket","dimensions":"120x40x10"}"#),
            ],
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let model: Model = body_json(resp).await;
    assert_eq!(model.name, "bracket");
    assert!(model.is_printable);
    assert_eq!(model.warnings.len(), 1);

    let resp = call(
        &app,
        get(&format!("/api/v1/modeling/{}/download", model.id), Some(&token)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[http::header::CONTENT_TYPE],
        "application/octet-stream"
    );
    let stl = body_bytes(resp).await;
    assert!(stl.starts_with(b"solid bracket"));
}

#[tokio::test]
async fn generate_model_rejects_bad_specification() {
    let app = app();
    let token = login(&app, "ada").await;
    let project = create_project(&app, &token).await;
    let project_id = project.id.to_string();

    let resp = call(
        &app,
        multipart_request(
            "/api/v1/modeling/generate",
            &token,
            &[("project_id", project_id.as_str()), ("specifications", "[1,2]")],
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail(resp).await, "specifications must be a JSON object");
}

// --- simulation + budgeting ---

#[tokio::test]
async fn simulate_and_quote() {
    let app = app();
    let token = login(&app, "ada").await;
    let project = create_project(&app, &token).await;
    let project_id = project.id.to_string();

    let resp = call(
        &app,
        multipart_request(
            "/api/v1/modeling/generate",
            &token,
            &[("project_id", project_id.as_str()), ("specifications", "{}")],
        ),
    )
    .await;
    let model: Model = body_json(resp).await;
    assert!(!model.is_printable);

    let resp = call(
        &app,
        json_request(
            "POST",
            "/api/v1/simulation/start",
            Some(&token),
            &format!(r#"{{"model_id":"{}","name":"drop test","type":"drop"}}"#, model.id),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let simulation: Simulation = body_json(resp).await;
    assert_eq!(simulation.progress, 1.0);

    let resp = call(
        &app,
        get(&format!("/api/v1/simulation/{}/results", simulation.id), Some(&token)),
    )
    .await;
    let results: SimulationResults = body_json(resp).await;
    assert_eq!(results.simulation_id, simulation.id);
    assert_eq!(results.results["passed"], true);

    let resp = call(
        &app,
        json_request(
            "POST",
            "/api/v1/budgeting/calculate",
            Some(&token),
            &format!(r#"{{"project_id":"{}","profit_margin":30}}"#, project.id),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let budget: Budget = body_json(resp).await;
    assert_eq!(budget.final_price, 59.15);

    let resp = call(&app, get(&format!("/api/v1/budgeting/{}", project.id), Some(&token))).await;
    let fetched: Budget = body_json(resp).await;
    assert_eq!(fetched.id, budget.id);

    // proposal must be generated before it can be downloaded
    let download = format!("/api/v1/budgeting/{}/download-proposal", budget.id);
    let resp = call(&app, get(&download, Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = call(
        &app,
        json_request(
            "POST",
            &format!("/api/v1/budgeting/{}/proposal", budget.id),
            Some(&token),
            "",
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let proposal: Proposal = body_json(resp).await;
    assert_eq!(proposal.download_url, download);

    let resp = call(&app, get(&download, Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_bytes(resp).await.starts_with(b"%PDF"));

    let resp = call(&app, get(&format!("/api/v1/projects/{}", project.id), Some(&token))).await;
    let project: Project = body_json(resp).await;
    assert_eq!(project.status, Status::Complete);

    let resp = call(&app, get("/api/v1/stats", None)).await;
    let stats: Stats = body_json(resp).await;
    assert_eq!(stats.total_projects, 1);
    assert_eq!(stats.total_models, 1);
    assert_eq!(stats.total_simulations, 1);
    assert_eq!(stats.total_budgets, 1);
    assert_eq!(stats.active_users, 1);
}

#[tokio::test]
async fn unknown_budget_is_not_found() {
    let app = app();
    let token = login(&app, "ada").await;
    let resp = call(
        &app,
        get(
            "/api/v1/budgeting/00000000-0000-0000-0000-000000000000",
            Some(&token),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(detail(resp).await, "Budget not found");
}
