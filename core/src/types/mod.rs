//! Data-transfer shapes exchanged with the design backend.
//!
//! # Design
//! These types mirror the backend schema but are defined independently from
//! the mock-server crate; integration tests catch schema drift. Enums are
//! closed sets and nothing here validates values, rejecting bad input is the
//! backend's job. Optional request fields are omitted from the JSON rather
//! than sent as `null`.

pub mod auth;
pub mod budgeting;
pub mod conversation;
pub mod modeling;
pub mod project;
pub mod simulation;
pub mod system;

pub use auth::{Credentials, RegistrationRequest, TokenResponse, User};
pub use budgeting::{Budget, BudgetItem, BudgetRequest, Proposal, DEFAULT_PROFIT_MARGIN};
pub use conversation::{
    Conversation, ConversationMessage, MessageRequest, MessageResponse, MessageRole,
    Specification, StartConversation,
};
pub use modeling::{GenerateModel, Model3D, ModelEngine, ModelMetrics};
pub use project::{NewProject, Page, Project, ProjectCategory, ProjectStatus, ProjectUpdate};
pub use simulation::{
    Simulation, SimulationRequest, SimulationResults, SimulationStatus, SimulationType,
};
pub use system::{HealthStatus, SystemStats};
