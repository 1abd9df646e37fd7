//! Async API client for the design workflow backend.
//!
//! # Design
//! `ApiClient` is an explicitly constructed value, not a global: callers
//! build one and clone it where needed. Each method is one round-trip:
//! build the request, run the outgoing interceptor, send it through the
//! transport, run the incoming interceptor on failure, parse. There is no
//! retry, caching, or fallback; a failure is always returned to the caller
//! after its notification has been emitted.

use std::sync::Arc;

use bytes::Bytes;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::endpoints::{check_status, parse_bytes, parse_items, parse_json, Endpoints};
use crate::error::ApiError;
use crate::hooks::{AuthStore, LogNavigator, Navigator, Notifier, TracingNotifier};
use crate::http::{HttpRequest, HttpResponse};
use crate::interceptor::{authorize, surface_error};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{
    Budget, Conversation, Credentials, GenerateModel, HealthStatus, MessageRequest, MessageResponse,
    Model3D, NewProject, Project, ProjectUpdate, Proposal, RegistrationRequest, Simulation,
    SimulationRequest, SimulationResults, SystemStats, TokenResponse, User,
};

/// Client for every backend endpoint.
#[derive(Clone)]
pub struct ApiClient {
    endpoints: Endpoints,
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthStore>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.endpoints.base_url())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Client over `reqwest` with notifications logged and navigation
    /// requests ignored.
    pub fn new(config: &ClientConfig, auth: Arc<dyn AuthStore>) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::with_transport(config, Arc::new(transport), auth))
    }

    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn Transport>, auth: Arc<dyn AuthStore>) -> Self {
        Self {
            endpoints: Endpoints::new(&config.base_url),
            transport,
            auth,
            notifier: Arc::new(TracingNotifier),
            navigator: Arc::new(LogNavigator),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    /// Send one request through both interceptors. Resolves only for 2xx
    /// responses.
    async fn execute(&self, mut request: HttpRequest) -> Result<HttpResponse, ApiError> {
        authorize(&mut request, self.auth.as_ref());
        tracing::debug!(method = request.method.as_str(), url = %request.url, "sending request");

        let outcome = self
            .transport
            .send(request)
            .await
            .and_then(|response| {
                tracing::debug!(status = response.status, "received response");
                check_status(&response).map(|()| response)
            });

        outcome.map_err(|err| {
            surface_error(err, self.auth.as_ref(), self.notifier.as_ref(), self.navigator.as_ref())
        })
    }

    // -- auth ---------------------------------------------------------------

    /// Exchange credentials for a token. The token is returned, not stored;
    /// keeping it is up to the `AuthStore` owner.
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenResponse, ApiError> {
        let request = self.endpoints.build_login(credentials)?;
        parse_json(self.execute(request).await?)
    }

    pub async fn register(&self, input: &RegistrationRequest) -> Result<User, ApiError> {
        let request = self.endpoints.build_register(input)?;
        parse_json(self.execute(request).await?)
    }

    // -- projects -----------------------------------------------------------

    /// Projects of the current user, unwrapped from the paginated envelope.
    pub async fn get_projects(&self) -> Result<Vec<Project>, ApiError> {
        let request = self.endpoints.build_get_projects();
        parse_items(self.execute(request).await?)
    }

    pub async fn get_project(&self, id: Uuid) -> Result<Project, ApiError> {
        let request = self.endpoints.build_get_project(id);
        parse_json(self.execute(request).await?)
    }

    pub async fn create_project(&self, input: &NewProject) -> Result<Project, ApiError> {
        let request = self.endpoints.build_create_project(input)?;
        parse_json(self.execute(request).await?)
    }

    pub async fn update_project(&self, id: Uuid, input: &ProjectUpdate) -> Result<Project, ApiError> {
        let request = self.endpoints.build_update_project(id, input)?;
        parse_json(self.execute(request).await?)
    }

    // -- conversational -----------------------------------------------------

    /// Open a conversation. With `None`, `project_id` is left out of the
    /// request and the backend decides what that means.
    pub async fn start_conversation(&self, project_id: Option<Uuid>) -> Result<MessageResponse, ApiError> {
        let request = self.endpoints.build_start_conversation(project_id)?;
        parse_json(self.execute(request).await?)
    }

    pub async fn send_message(&self, input: &MessageRequest) -> Result<MessageResponse, ApiError> {
        let request = self.endpoints.build_send_message(input)?;
        parse_json(self.execute(request).await?)
    }

    pub async fn get_conversation(&self, id: Uuid) -> Result<Conversation, ApiError> {
        let request = self.endpoints.build_get_conversation(id);
        parse_json(self.execute(request).await?)
    }

    // -- modeling -----------------------------------------------------------

    pub async fn generate_model(&self, input: &GenerateModel) -> Result<Model3D, ApiError> {
        let request = self.endpoints.build_generate_model(input)?;
        parse_json(self.execute(request).await?)
    }

    pub async fn get_model_status(&self, id: Uuid) -> Result<Model3D, ApiError> {
        let request = self.endpoints.build_get_model_status(id);
        parse_json(self.execute(request).await?)
    }

    /// Raw model file.
    pub async fn download_model(&self, id: Uuid) -> Result<Bytes, ApiError> {
        let request = self.endpoints.build_download_model(id);
        parse_bytes(self.execute(request).await?)
    }

    // -- simulation ---------------------------------------------------------

    pub async fn start_simulation(&self, input: &SimulationRequest) -> Result<Simulation, ApiError> {
        let request = self.endpoints.build_start_simulation(input)?;
        parse_json(self.execute(request).await?)
    }

    pub async fn get_simulation_status(&self, id: Uuid) -> Result<Simulation, ApiError> {
        let request = self.endpoints.build_get_simulation_status(id);
        parse_json(self.execute(request).await?)
    }

    pub async fn get_simulation_results(&self, id: Uuid) -> Result<SimulationResults, ApiError> {
        let request = self.endpoints.build_get_simulation_results(id);
        parse_json(self.execute(request).await?)
    }

    // -- budgeting ----------------------------------------------------------

    /// Price a project. Without a margin, 30 percent is sent.
    pub async fn calculate_budget(&self, project_id: Uuid, profit_margin: Option<f64>) -> Result<Budget, ApiError> {
        let request = self.endpoints.build_calculate_budget(project_id, profit_margin)?;
        parse_json(self.execute(request).await?)
    }

    pub async fn get_budget(&self, project_id: Uuid) -> Result<Budget, ApiError> {
        let request = self.endpoints.build_get_budget(project_id);
        parse_json(self.execute(request).await?)
    }

    pub async fn generate_proposal(&self, budget_id: Uuid) -> Result<Proposal, ApiError> {
        let request = self.endpoints.build_generate_proposal(budget_id);
        parse_json(self.execute(request).await?)
    }

    /// Raw proposal document.
    pub async fn download_proposal(&self, budget_id: Uuid) -> Result<Bytes, ApiError> {
        let request = self.endpoints.build_download_proposal(budget_id);
        parse_bytes(self.execute(request).await?)
    }

    // -- system -------------------------------------------------------------

    pub async fn get_health_status(&self) -> Result<HealthStatus, ApiError> {
        let request = self.endpoints.build_get_health_status();
        parse_json(self.execute(request).await?)
    }

    pub async fn get_system_stats(&self) -> Result<SystemStats, ApiError> {
        let request = self.endpoints.build_get_system_stats();
        parse_json(self.execute(request).await?)
    }
}
