use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::conversation::Specification;

/// CAD engine that produced a model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelEngine {
    Cadquery,
    Openscad,
    Zoo,
}

/// Geometry metrics, absent until the mesh has been analysed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelMetrics {
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub surface_area: Option<f64>,
    #[serde(default)]
    pub vertex_count: Option<u64>,
    #[serde(default)]
    pub face_count: Option<u64>,
}

/// Metadata of a generated 3D model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model3D {
    pub id: Uuid,
    pub name: String,
    pub engine: ModelEngine,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub is_printable: bool,
    #[serde(default)]
    pub validation_errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(flatten)]
    pub metrics: ModelMetrics,
}

/// Input of `POST /modeling/generate`. Sent as multipart form data with the
/// specification JSON-encoded into a single text field.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateModel {
    pub project_id: Uuid,
    pub specifications: Specification,
}
