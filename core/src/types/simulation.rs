use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SimulationType {
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

/// Body of `POST /simulation/start`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationRequest {
    pub model_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub simulation_type: SimulationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_conditions: Option<serde_json::Map<String, serde_json::Value>>,
}

/// A physical test run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Simulation {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub simulation_type: SimulationType,
    pub status: SimulationStatus,
    /// Completion fraction in `[0, 1]`.
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub results: Option<serde_json::Value>,
}

/// Output of `GET /simulation/{id}/results`. The payload shape depends on
/// the simulation type and is left untyped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationResults {
    pub simulation_id: Uuid,
    pub status: SimulationStatus,
    #[serde(default)]
    pub results: serde_json::Value,
}
