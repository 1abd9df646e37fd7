use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Output of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Per-dependency status, e.g. `"database" => "ok"`.
    #[serde(default)]
    pub services: BTreeMap<String, String>,
}

/// Output of `GET /stats`. Counters the backend leaves out read as zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SystemStats {
    pub total_projects: u64,
    pub total_models: u64,
    pub total_simulations: u64,
    pub total_budgets: u64,
    pub active_users: u64,
}
