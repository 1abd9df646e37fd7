use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profit margin, in percent, applied when the caller does not pick one.
pub const DEFAULT_PROFIT_MARGIN: f64 = 30.0;

/// Body of `POST /budgeting/calculate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetRequest {
    pub project_id: Uuid,
    pub profit_margin: f64,
}

/// One line of a budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
    #[serde(default)]
    pub supplier: Option<String>,
}

/// A cost estimate for a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Budget {
    pub id: Uuid,
    pub project_id: Uuid,
    pub material_cost: f64,
    pub component_cost: f64,
    pub printing_cost: f64,
    pub labor_cost: f64,
    pub final_price: f64,
    /// Percent, e.g. `30.0`.
    pub profit_margin: f64,
    /// Line items in the order the backend listed them.
    #[serde(default)]
    pub items: Vec<BudgetItem>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A rendered proposal document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Proposal {
    pub file_path: String,
    pub download_url: String,
}
