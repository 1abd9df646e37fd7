//! In-memory stand-in for the design backend.
//!
//! Serves every endpoint the client calls under `/api/v1`, keeps all state in
//! a single `RwLock`, and answers failures with FastAPI-style
//! `{"detail": "..."}` bodies. Simulations complete immediately and budgets
//! are priced from a fixed bill of materials.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{FromRequestParts, Multipart, Path, State},
    http::{header, request::Parts, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub mod error;
pub mod models;

use error::{AppError, AppResult};
use models::*;

/// Specification keys the assistant keeps asking for until they are provided.
pub const REQUIRED_SPECS: [&str; 2] = ["dimensions", "material"];

struct Account {
    user: User,
    password: String,
}

struct Owned<T> {
    owner: Uuid,
    value: T,
}

struct ModelRecord {
    owner: Uuid,
    project_id: Uuid,
    model: Model,
}

struct BudgetRecord {
    owner: Uuid,
    budget: Budget,
    proposal_ready: bool,
}

#[derive(Default)]
pub struct Store {
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, Uuid>,
    projects: HashMap<Uuid, Owned<Project>>,
    conversations: HashMap<Uuid, Owned<Conversation>>,
    models: HashMap<Uuid, ModelRecord>,
    simulations: HashMap<Uuid, Owned<Simulation>>,
    budgets: HashMap<Uuid, BudgetRecord>,
}

impl Store {
    fn project_mut(&mut self, owner: Uuid, id: Uuid) -> AppResult<&mut Project> {
        self.projects
            .get_mut(&id)
            .filter(|p| p.owner == owner)
            .map(|p| &mut p.value)
            .ok_or(AppError::NotFound("Project"))
    }

    fn advance(&mut self, owner: Uuid, project_id: Uuid, status: Status) {
        if let Ok(project) = self.project_mut(owner, project_id) {
            project.status = status;
            project.updated_at = Utc::now();
        }
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Id of the user owning the bearer token.
pub struct AuthUser(pub Uuid);

impl FromRequestParts<Db> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, db: &Db) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;
        db.read()
            .await
            .tokens
            .get(token)
            .copied()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let api = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/projects", get(list_projects))
        .route("/projects/", post(create_project))
        .route("/projects/{id}", get(get_project).put(update_project))
        .route("/conversational/start", post(start_conversation))
        .route("/conversational/message", post(send_message))
        .route("/conversational/{id}", get(get_conversation))
        .route("/modeling/generate", post(generate_model))
        .route("/modeling/{id}/status", get(model_status))
        .route("/modeling/{id}/download", get(download_model))
        .route("/simulation/start", post(start_simulation))
        .route("/simulation/{id}/status", get(simulation_status))
        .route("/simulation/{id}/results", get(simulation_results))
        .route("/budgeting/calculate", post(calculate_budget))
        .route("/budgeting/{id}", get(get_budget))
        .route("/budgeting/{id}/proposal", post(generate_proposal))
        .route("/budgeting/{id}/download-proposal", get(download_proposal))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .with_state(db);
    Router::new().nest("/api/v1", api).layer(TraceLayer::new_for_http())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// --- auth ---

async fn register(
    State(db): State<Db>,
    Json(input): Json<Registration>,
) -> AppResult<(StatusCode, Json<User>)> {
    let mut store = db.write().await;
    let taken = store
        .accounts
        .values()
        .any(|a| a.user.username == input.username || a.user.email == input.email);
    if taken {
        return Err(AppError::BadRequest("Username or email already registered".to_string()));
    }
    let user = User {
        id: Uuid::new_v4(),
        email: input.email,
        username: input.username,
        full_name: input.full_name,
        is_active: true,
        created_at: Utc::now(),
    };
    store.accounts.insert(
        user.username.clone(),
        Account {
            user: user.clone(),
            password: input.password,
        },
    );
    tracing::info!(username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(db): State<Db>,
    Json(input): Json<Credentials>,
) -> AppResult<Json<TokenResponse>> {
    let mut store = db.write().await;
    let user_id = store
        .accounts
        .get(&input.username)
        .filter(|a| a.password == input.password)
        .map(|a| a.user.id)
        .ok_or_else(|| AppError::BadRequest("Incorrect username or password".to_string()))?;
    let token = Uuid::new_v4().simple().to_string();
    store.tokens.insert(token.clone(), user_id);
    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

// --- projects ---

async fn list_projects(State(db): State<Db>, AuthUser(user): AuthUser) -> Json<Page<Project>> {
    let store = db.read().await;
    let mut items: Vec<Project> = store
        .projects
        .values()
        .filter(|p| p.owner == user)
        .map(|p| p.value.clone())
        .collect();
    items.sort_by_key(|p| p.created_at);
    let total = items.len() as u64;
    Json(Page {
        size: items.len() as u32,
        items,
        total,
        page: 1,
    })
}

async fn get_project(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Project>> {
    let mut store = db.write().await;
    store.project_mut(user, id).map(|p| Json(p.clone()))
}

async fn create_project(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    Json(input): Json<NewProject>,
) -> (StatusCode, Json<Project>) {
    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4(),
        name: input.name,
        description: input.description,
        category: input.category,
        status: input.status.unwrap_or(Status::Draft),
        created_at: now,
        updated_at: now,
    };
    db.write().await.projects.insert(
        project.id,
        Owned {
            owner: user,
            value: project.clone(),
        },
    );
    (StatusCode::CREATED, Json(project))
}

async fn update_project(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ProjectUpdate>,
) -> AppResult<Json<Project>> {
    let mut store = db.write().await;
    let project = store.project_mut(user, id)?;
    if let Some(name) = input.name {
        project.name = name;
    }
    if let Some(description) = input.description {
        project.description = description;
    }
    if let Some(category) = input.category {
        project.category = category;
    }
    if let Some(status) = input.status {
        project.status = status;
    }
    project.updated_at = Utc::now();
    Ok(Json(project.clone()))
}

// --- conversational ---

fn extract_specs(message: &str) -> JsonMap {
    message
        .split_whitespace()
        .filter_map(|token| token.trim_end_matches([',', '.', ';']).split_once('='))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .map(|(k, v)| {
            let value = v.parse::<f64>().map(Value::from).unwrap_or_else(|_| Value::from(v));
            (k.to_lowercase(), value)
        })
        .collect()
}

fn clarifications(specs: &JsonMap) -> Vec<String> {
    REQUIRED_SPECS
        .iter()
        .filter(|key| !specs.contains_key(**key))
        .map(|key| format!("What {key} should the design have?"))
        .collect()
}

fn new_message(role: Role, content: String) -> Message {
    Message {
        id: Uuid::new_v4(),
        role,
        content,
        created_at: Utc::now(),
    }
}

fn open_conversation(store: &mut Store, user: Uuid, project_id: Option<Uuid>) -> AppResult<Uuid> {
    if let Some(project_id) = project_id {
        store.project_mut(user, project_id)?;
        store.advance(user, project_id, Status::Conversing);
    }
    let conversation = Conversation {
        id: Uuid::new_v4(),
        project_id,
        messages: Vec::new(),
        extracted_specs: JsonMap::new(),
        created_at: Utc::now(),
    };
    let id = conversation.id;
    store.conversations.insert(
        id,
        Owned {
            owner: user,
            value: conversation,
        },
    );
    Ok(id)
}

async fn start_conversation(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    Json(input): Json<StartConversation>,
) -> AppResult<Json<MessageResponse>> {
    let mut store = db.write().await;
    let id = open_conversation(&mut store, user, input.project_id)?;
    let greeting = new_message(
        Role::Assistant,
        "Hi! Describe the product you want to build.".to_string(),
    );
    let response = MessageResponse {
        response: greeting.content.clone(),
        conversation_id: id,
        message_id: greeting.id,
        clarifications_needed: clarifications(&JsonMap::new()),
        extracted_specs: JsonMap::new(),
    };
    if let Some(conversation) = store.conversations.get_mut(&id) {
        conversation.value.messages.push(greeting);
    }
    Ok(Json(response))
}

async fn send_message(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    Json(input): Json<MessageRequest>,
) -> AppResult<Json<MessageResponse>> {
    let mut store = db.write().await;
    let id = match input.conversation_id {
        Some(id) => id,
        None => open_conversation(&mut store, user, input.project_id)?,
    };
    let conversation = store
        .conversations
        .get_mut(&id)
        .filter(|c| c.owner == user)
        .map(|c| &mut c.value)
        .ok_or(AppError::NotFound("Conversation"))?;

    conversation.extracted_specs.extend(extract_specs(&input.message));
    conversation.messages.push(new_message(Role::User, input.message));

    let missing = clarifications(&conversation.extracted_specs);
    let text = if missing.is_empty() {
        "Thanks, the specification is complete."
    } else {
        "Thanks. I still need a few details."
    };
    let reply = new_message(Role::Assistant, text.to_string());
    let response = MessageResponse {
        response: reply.content.clone(),
        conversation_id: id,
        message_id: reply.id,
        clarifications_needed: missing,
        extracted_specs: conversation.extracted_specs.clone(),
    };
    conversation.messages.push(reply);
    Ok(Json(response))
}

async fn get_conversation(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Conversation>> {
    let store = db.read().await;
    store
        .conversations
        .get(&id)
        .filter(|c| c.owner == user)
        .map(|c| Json(c.value.clone()))
        .ok_or(AppError::NotFound("Conversation"))
}

// --- modeling ---

fn bad_request(e: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(e.to_string())
}

async fn generate_model(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Model>)> {
    let mut project_id = None;
    let mut specs = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().unwrap_or_default().to_string();
        let text = field.text().await.map_err(bad_request)?;
        match name.as_str() {
            "project_id" => {
                let id = text
                    .parse::<Uuid>()
                    .map_err(|_| bad_request("project_id must be a UUID"))?;
                project_id = Some(id);
            }
            "specifications" => {
                let map = serde_json::from_str::<JsonMap>(&text)
                    .map_err(|_| bad_request("specifications must be a JSON object"))?;
                specs = Some(map);
            }
            _ => {}
        }
    }
    let project_id = project_id.ok_or_else(|| bad_request("project_id is required"))?;
    let specs = specs.ok_or_else(|| bad_request("specifications is required"))?;

    let mut store = db.write().await;
    store.project_mut(user, project_id)?;

    let mut validation_errors = Vec::new();
    if !specs.contains_key("dimensions") {
        validation_errors.push("Missing dimensions".to_string());
    }
    let mut warnings = Vec::new();
    if !specs.contains_key("material") {
        warnings.push("No material specified, defaulting to PLA".to_string());
    }
    let id = Uuid::new_v4();
    let model = Model {
        id,
        name: specs
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("model")
            .to_string(),
        engine: "cadquery".to_string(),
        file_path: format!("/models/{id}.stl"),
        is_printable: validation_errors.is_empty(),
        validation_errors,
        warnings,
        volume: 48_000.0,
        surface_area: 11_200.0,
        vertex_count: 1_024,
        face_count: 2_044,
    };
    store.models.insert(
        id,
        ModelRecord {
            owner: user,
            project_id,
            model: model.clone(),
        },
    );
    store.advance(user, project_id, Status::Modeling);
    Ok((StatusCode::CREATED, Json(model)))
}

async fn find_model(db: &Db, user: Uuid, id: Uuid) -> AppResult<Model> {
    db.read()
        .await
        .models
        .get(&id)
        .filter(|m| m.owner == user)
        .map(|m| m.model.clone())
        .ok_or(AppError::NotFound("Model"))
}

async fn model_status(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Model>> {
    find_model(&db, user, id).await.map(Json)
}

async fn download_model(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let model = find_model(&db, user, id).await?;
    let stl = format!("solid {0}\nendsolid {0}\n", model.name);
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], stl.into_bytes()))
}

// --- simulation ---

fn run_simulation(test_type: TestType, parameters: Option<&JsonMap>) -> Value {
    let param = |key: &str, default: f64| {
        parameters
            .and_then(|p| p.get(key))
            .and_then(Value::as_f64)
            .unwrap_or(default)
    };
    match test_type {
        TestType::Drop => json!({
            "passed": true,
            "drop_height_m": param("height_m", 1.0),
            "max_impact_force_n": 182.4,
        }),
        TestType::Stress => json!({
            "passed": true,
            "load_n": param("load_n", 100.0),
            "max_von_mises_mpa": 24.7,
            "safety_factor": 2.1,
        }),
        TestType::Motion => json!({ "passed": true, "max_displacement_mm": 3.2 }),
        TestType::Fluid => json!({ "passed": true, "drag_coefficient": 0.42 }),
    }
}

async fn start_simulation(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    Json(input): Json<SimulationRequest>,
) -> AppResult<(StatusCode, Json<Simulation>)> {
    let mut store = db.write().await;
    let project_id = store
        .models
        .get(&input.model_id)
        .filter(|m| m.owner == user)
        .map(|m| m.project_id)
        .ok_or(AppError::NotFound("Model"))?;
    if let Some(conditions) = &input.initial_conditions {
        tracing::debug!(keys = conditions.len(), "initial conditions supplied");
    }
    let simulation = Simulation {
        id: Uuid::new_v4(),
        name: input.name,
        test_type: input.test_type,
        status: SimulationStatus::Completed,
        progress: 1.0,
        results: Some(run_simulation(input.test_type, input.parameters.as_ref())),
    };
    store.simulations.insert(
        simulation.id,
        Owned {
            owner: user,
            value: simulation.clone(),
        },
    );
    store.advance(user, project_id, Status::Simulating);
    Ok((StatusCode::CREATED, Json(simulation)))
}

async fn find_simulation(db: &Db, user: Uuid, id: Uuid) -> AppResult<Simulation> {
    db.read()
        .await
        .simulations
        .get(&id)
        .filter(|s| s.owner == user)
        .map(|s| s.value.clone())
        .ok_or(AppError::NotFound("Simulation"))
}

async fn simulation_status(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Simulation>> {
    find_simulation(&db, user, id).await.map(Json)
}

async fn simulation_results(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SimulationResults>> {
    let simulation = find_simulation(&db, user, id).await?;
    Ok(Json(SimulationResults {
        simulation_id: simulation.id,
        status: simulation.status,
        results: simulation.results.unwrap_or(Value::Null),
    }))
}

// --- budgeting ---

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn item(description: &str, quantity: f64, unit_price: f64, supplier: Option<&str>) -> BudgetItem {
    BudgetItem {
        description: description.to_string(),
        quantity,
        unit_price,
        total_price: round2(quantity * unit_price),
        supplier: supplier.map(str::to_string),
    }
}

/// Fixed bill of materials: material, components, printing, labor.
pub fn price(project_id: Uuid, profit_margin: f64) -> Budget {
    let items = vec![
        item("PLA filament (kg)", 0.4, 25.0, Some("Prusament")),
        item("Fastener kit", 1.0, 6.5, Some("McMaster-Carr")),
        item("Printing time (h)", 6.0, 1.5, None),
        item("Assembly and QA (h)", 1.0, 20.0, None),
    ];
    let [material, component, printing, labor] =
        [0, 1, 2, 3].map(|i| items[i].total_price);
    let subtotal = material + component + printing + labor;
    Budget {
        id: Uuid::new_v4(),
        project_id,
        material_cost: material,
        component_cost: component,
        printing_cost: printing,
        labor_cost: labor,
        final_price: round2(subtotal * (1.0 + profit_margin / 100.0)),
        profit_margin,
        items,
        created_at: Utc::now(),
    }
}

async fn calculate_budget(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    Json(input): Json<BudgetRequest>,
) -> AppResult<(StatusCode, Json<Budget>)> {
    if !(0.0..1000.0).contains(&input.profit_margin) {
        return Err(bad_request("profit_margin must be between 0 and 1000"));
    }
    let mut store = db.write().await;
    store.project_mut(user, input.project_id)?;
    let budget = price(input.project_id, input.profit_margin);
    store.budgets.insert(
        budget.id,
        BudgetRecord {
            owner: user,
            budget: budget.clone(),
            proposal_ready: false,
        },
    );
    store.advance(user, input.project_id, Status::Quoting);
    Ok((StatusCode::CREATED, Json(budget)))
}

/// Latest budget of a project.
async fn get_budget(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Budget>> {
    let store = db.read().await;
    store
        .budgets
        .values()
        .filter(|b| b.owner == user && b.budget.project_id == project_id)
        .max_by_key(|b| b.budget.created_at)
        .map(|b| Json(b.budget.clone()))
        .ok_or(AppError::NotFound("Budget"))
}

async fn generate_proposal(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Proposal>> {
    let mut store = db.write().await;
    let record = store
        .budgets
        .get_mut(&id)
        .filter(|b| b.owner == user)
        .ok_or(AppError::NotFound("Budget"))?;
    record.proposal_ready = true;
    let project_id = record.budget.project_id;
    store.advance(user, project_id, Status::Complete);
    Ok(Json(Proposal {
        file_path: format!("/proposals/{id}.pdf"),
        download_url: format!("/api/v1/budgeting/{id}/download-proposal"),
    }))
}

async fn download_proposal(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let store = db.read().await;
    let record = store
        .budgets
        .get(&id)
        .filter(|b| b.owner == user && b.proposal_ready)
        .ok_or(AppError::NotFound("Proposal"))?;
    let pdf = format!(
        "%PDF-1.4\n% proposal {id}\n% total {:.2}\n%%EOF\n",
        record.budget.final_price
    );
    Ok(([(header::CONTENT_TYPE, "application/pdf")], pdf.into_bytes()))
}

// --- system ---

async fn health() -> Json<Health> {
    Json(Health {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services: [("storage", "in-memory"), ("simulation", "ok"), ("modeling", "ok")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    })
}

async fn stats(State(db): State<Db>) -> Json<Stats> {
    let store = db.read().await;
    let mut active: Vec<&Uuid> = store.tokens.values().collect();
    active.sort();
    active.dedup();
    Json(Stats {
        total_projects: store.projects.len() as u64,
        total_models: store.models.len() as u64,
        total_simulations: store.simulations.len() as u64,
        total_budgets: store.budgets.len() as u64,
        active_users: active.len() as u64,
    })
}
