//! Stateless request builders and response parsers for the design API.
//!
//! # Design
//! `Endpoints` holds only a `base_url` and carries no mutable state between
//! calls. Every endpoint has a `build_*` method that produces an
//! `HttpRequest`; responses are turned into values by the generic `parse_*`
//! functions. Nothing here touches the network or the auth session, which
//! keeps the wire contract testable on its own.

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::{
    FormField, HttpMethod, HttpRequest, HttpResponse, RequestBody, APPLICATION_JSON, CONTENT_TYPE,
};
use crate::types::{
    BudgetRequest, Credentials, GenerateModel, MessageRequest, NewProject, Page, ProjectUpdate,
    RegistrationRequest, SimulationRequest, StartConversation, DEFAULT_PROFIT_MARGIN,
};

/// Request builder for every backend endpoint.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base_url: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn get(&self, path: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.url(path),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    fn json<T: Serialize>(&self, method: HttpMethod, path: &str, input: &T) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method,
            url: self.url(path),
            headers: vec![(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string())],
            body: RequestBody::Json(body),
        })
    }

    // -- auth ---------------------------------------------------------------

    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.json(HttpMethod::Post, "/auth/login", credentials)
    }

    pub fn build_register(&self, input: &RegistrationRequest) -> Result<HttpRequest, ApiError> {
        self.json(HttpMethod::Post, "/auth/register", input)
    }

    // -- projects -----------------------------------------------------------

    pub fn build_get_projects(&self) -> HttpRequest {
        self.get("/projects")
    }

    pub fn build_get_project(&self, id: Uuid) -> HttpRequest {
        self.get(&format!("/projects/{id}"))
    }

    pub fn build_create_project(&self, input: &NewProject) -> Result<HttpRequest, ApiError> {
        self.json(HttpMethod::Post, "/projects/", input)
    }

    pub fn build_update_project(&self, id: Uuid, input: &ProjectUpdate) -> Result<HttpRequest, ApiError> {
        self.json(HttpMethod::Put, &format!("/projects/{id}"), input)
    }

    // -- conversational -----------------------------------------------------

    pub fn build_start_conversation(&self, project_id: Option<Uuid>) -> Result<HttpRequest, ApiError> {
        self.json(
            HttpMethod::Post,
            "/conversational/start",
            &StartConversation { project_id },
        )
    }

    pub fn build_send_message(&self, input: &MessageRequest) -> Result<HttpRequest, ApiError> {
        self.json(HttpMethod::Post, "/conversational/message", input)
    }

    pub fn build_get_conversation(&self, id: Uuid) -> HttpRequest {
        self.get(&format!("/conversational/{id}"))
    }

    // -- modeling -----------------------------------------------------------

    /// Multipart upload: `project_id` plus the specification as a JSON string.
    pub fn build_generate_model(&self, input: &GenerateModel) -> Result<HttpRequest, ApiError> {
        let specifications =
            serde_json::to_string(&input.specifications).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.url("/modeling/generate"),
            headers: Vec::new(),
            body: RequestBody::Multipart(vec![
                FormField {
                    name: "project_id".to_string(),
                    value: input.project_id.to_string(),
                },
                FormField {
                    name: "specifications".to_string(),
                    value: specifications,
                },
            ]),
        })
    }

    pub fn build_get_model_status(&self, id: Uuid) -> HttpRequest {
        self.get(&format!("/modeling/{id}/status"))
    }

    pub fn build_download_model(&self, id: Uuid) -> HttpRequest {
        self.get(&format!("/modeling/{id}/download"))
    }

    // -- simulation ---------------------------------------------------------

    pub fn build_start_simulation(&self, input: &SimulationRequest) -> Result<HttpRequest, ApiError> {
        self.json(HttpMethod::Post, "/simulation/start", input)
    }

    pub fn build_get_simulation_status(&self, id: Uuid) -> HttpRequest {
        self.get(&format!("/simulation/{id}/status"))
    }

    pub fn build_get_simulation_results(&self, id: Uuid) -> HttpRequest {
        self.get(&format!("/simulation/{id}/results"))
    }

    // -- budgeting ----------------------------------------------------------

    /// `profit_margin` falls back to [`DEFAULT_PROFIT_MARGIN`].
    pub fn build_calculate_budget(
        &self,
        project_id: Uuid,
        profit_margin: Option<f64>,
    ) -> Result<HttpRequest, ApiError> {
        let input = BudgetRequest {
            project_id,
            profit_margin: profit_margin.unwrap_or(DEFAULT_PROFIT_MARGIN),
        };
        self.json(HttpMethod::Post, "/budgeting/calculate", &input)
    }

    pub fn build_get_budget(&self, project_id: Uuid) -> HttpRequest {
        self.get(&format!("/budgeting/{project_id}"))
    }

    pub fn build_generate_proposal(&self, budget_id: Uuid) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            url: self.url(&format!("/budgeting/{budget_id}/proposal")),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn build_download_proposal(&self, budget_id: Uuid) -> HttpRequest {
        self.get(&format!("/budgeting/{budget_id}/download-proposal"))
    }

    // -- system -------------------------------------------------------------

    pub fn build_get_health_status(&self) -> HttpRequest {
        self.get("/health")
    }

    pub fn build_get_system_stats(&self) -> HttpRequest {
        self.get("/stats")
    }
}

/// Map a non-2xx status to `ApiError::Http`.
pub fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::from_status(response.status, &response.body))
}

/// Deserialize a JSON body.
pub fn parse_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    serde_json::from_slice(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Deserialize a paginated envelope and return only its `items`.
pub fn parse_items<T: DeserializeOwned>(response: HttpResponse) -> Result<Vec<T>, ApiError> {
    parse_json::<Page<T>>(response).map(|page| page.items)
}

/// Return the raw body of a binary download.
pub fn parse_bytes(response: HttpResponse) -> Result<bytes::Bytes, ApiError> {
    check_status(&response)?;
    tracing::debug!(
        content_type = response.header(CONTENT_TYPE).unwrap_or("unknown"),
        len = response.body.len(),
        "download complete"
    );
    Ok(response.body)
}
