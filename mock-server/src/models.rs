//! Wire types of the design backend, as the server sees them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type JsonMap = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Mechanical,
    Electronic,
    Mixed,
    Architecture,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    Conversing,
    Modeling,
    Simulating,
    Quoting,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub category: Category,
    pub status: Option<Status>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub status: Option<Status>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
}

#[derive(Debug, Deserialize)]
pub struct StartConversation {
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub message: String,
    pub conversation_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub response: String,
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    pub clarifications_needed: Vec<String>,
    pub extracted_specs: JsonMap,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub messages: Vec<Message>,
    pub extracted_specs: JsonMap,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub id: Uuid,
    pub name: String,
    pub engine: String,
    pub file_path: String,
    pub is_printable: bool,
    pub validation_errors: Vec<String>,
    pub warnings: Vec<String>,
    pub volume: f64,
    pub surface_area: f64,
    pub vertex_count: u64,
    pub face_count: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Drop,
    Stress,
    Motion,
    Fluid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SimulationStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Deserialize)]
pub struct SimulationRequest {
    pub model_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub test_type: TestType,
    pub parameters: Option<JsonMap>,
    pub initial_conditions: Option<JsonMap>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub test_type: TestType,
    pub status: SimulationStatus,
    pub progress: f64,
    pub results: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimulationResults {
    pub simulation_id: Uuid,
    pub status: SimulationStatus,
    pub results: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct BudgetRequest {
    pub project_id: Uuid,
    pub profit_margin: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
    pub supplier: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub project_id: Uuid,
    pub material_cost: f64,
    pub component_cost: f64,
    pub printing_cost: f64,
    pub labor_cost: f64,
    pub final_price: f64,
    pub profit_margin: f64,
    pub items: Vec<BudgetItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Proposal {
    pub file_path: String,
    pub download_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub version: String,
    pub services: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Stats {
    pub total_projects: u64,
    pub total_models: u64,
    pub total_simulations: u64,
    pub total_budgets: u64,
    pub active_users: u64,
}
