use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use super::{ProjectCompletion, WorkshopRepository};
use crate::auth::TokenProvider;
use crate::config::AppConfig;
use crate::errors::{ServiceError, WorkflowResult};
use crate::models::{
    Appointment, AppointmentId, AppointmentPatch, AppointmentStatus, Customer, CustomerId,
    Employee, EmployeeId, NewProjectUpdate, NewTimeLog, Project, ProjectId, ProjectPatch,
    ProjectStatus, ProjectUpdate, Task, TaskId, TimeLog,
};
use crate::retry::{with_retry, RetryConfig, TransportRetryPolicy};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct StatusBody<S> {
    status: S,
}

/// [`WorkshopRepository`] backed by the shop service's REST API.
///
/// Reads are retried on transient failures; writes are sent exactly once.
pub struct HttpWorkshopRepository {
    client: Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
    retry: RetryConfig,
}

impl HttpWorkshopRepository {
    /// Build a repository using a default reqwest client with a 30s timeout.
    pub fn new(base_url: &str, tokens: Arc<dyn TokenProvider>) -> WorkflowResult<Self> {
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Self::with_client(base_url, tokens, client)
    }

    /// Build a repository from an existing client.
    pub fn with_client(
        base_url: &str,
        tokens: Arc<dyn TokenProvider>,
        client: Client,
    ) -> WorkflowResult<Self> {
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url)?,
            tokens,
            retry: RetryConfig::default(),
        })
    }

    pub fn from_config(config: &AppConfig, tokens: Arc<dyn TokenProvider>) -> WorkflowResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_client(&config.api_base_url, tokens, client)?
            .with_retry_config(config.retry_config()))
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn request(&self, method: Method, path: &str) -> WorkflowResult<RequestBuilder> {
        let url = self.base_url.join(path).map_err(|e| {
            ServiceError::validation(format!("invalid request path {}: {}", path, e))
        })?;
        let request = self
            .client
            .request(method, url)
            .header("Accept", "application/json");
        Ok(match self.tokens.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> WorkflowResult<T> {
        with_retry(&self.retry, TransportRetryPolicy, || async move {
            let response = self.request(Method::GET, path)?.send().await?;
            decode(response, path).await
        })
        .await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> WorkflowResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self.request(method, path)?.json(body).send().await?;
        decode(response, path).await
    }
}

fn normalize_base_url(raw: &str) -> WorkflowResult<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ServiceError::validation(format!("invalid API base URL {}: {}", raw, e)))?;
    // Url::join replaces the last segment unless the base ends with a slash.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> WorkflowResult<T> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ServiceError::NotFound(path.to_string()));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        debug!(%status, path, "shop service rejected request");
        return Err(ServiceError::transport(
            format!("HTTP {}: {}", status, body),
            Some(status.as_u16()),
        ));
    }
    Ok(response.json::<T>().await?)
}

#[async_trait]
impl WorkshopRepository for HttpWorkshopRepository {
    #[instrument(skip(self))]
    async fn list_appointments(&self) -> WorkflowResult<Vec<Appointment>> {
        self.get_json("appointments").await
    }

    #[instrument(skip(self))]
    async fn get_appointment(&self, id: AppointmentId) -> WorkflowResult<Appointment> {
        self.get_json(&format!("appointments/{}", id)).await
    }

    #[instrument(skip(self))]
    async fn patch_appointment(
        &self,
        id: AppointmentId,
        patch: AppointmentPatch,
    ) -> WorkflowResult<Appointment> {
        self.send_json(Method::PATCH, &format!("appointments/{}", id), &patch)
            .await
    }

    #[instrument(skip(self))]
    async fn update_appointment_status(
        &self,
        id: AppointmentId,
        status: AppointmentStatus,
    ) -> WorkflowResult<Appointment> {
        self.send_json(
            Method::PATCH,
            &format!("appointments/{}/status", id),
            &StatusBody { status },
        )
        .await
    }

    #[instrument(skip(self))]
    async fn list_projects(&self) -> WorkflowResult<Vec<Project>> {
        self.get_json("projects").await
    }

    #[instrument(skip(self))]
    async fn get_project(&self, id: ProjectId) -> WorkflowResult<Project> {
        self.get_json(&format!("projects/{}", id)).await
    }

    #[instrument(skip(self))]
    async fn patch_project(&self, id: ProjectId, patch: ProjectPatch) -> WorkflowResult<Project> {
        self.send_json(Method::PATCH, &format!("projects/{}", id), &patch)
            .await
    }

    #[instrument(skip(self))]
    async fn update_project_status(
        &self,
        id: ProjectId,
        status: ProjectStatus,
    ) -> WorkflowResult<Project> {
        self.send_json(
            Method::PATCH,
            &format!("projects/{}/status", id),
            &StatusBody { status },
        )
        .await
    }

    #[instrument(skip(self))]
    async fn list_tasks(&self) -> WorkflowResult<Vec<Task>> {
        self.get_json("tasks").await
    }

    #[instrument(skip(self))]
    async fn get_task(&self, id: TaskId) -> WorkflowResult<Task> {
        self.get_json(&format!("tasks/{}", id)).await
    }

    #[instrument(skip(self))]
    async fn list_project_updates(
        &self,
        project_id: ProjectId,
    ) -> WorkflowResult<Vec<ProjectUpdate>> {
        self.get_json(&format!("projects/{}/updates", project_id))
            .await
    }

    #[instrument(skip(self, update), fields(project_id = update.project_id))]
    async fn create_project_update(
        &self,
        update: NewProjectUpdate,
    ) -> WorkflowResult<ProjectUpdate> {
        self.send_json(
            Method::POST,
            &format!("projects/{}/updates", update.project_id),
            &update,
        )
        .await
    }

    #[instrument(skip(self, update), fields(project_id = update.project_id))]
    async fn complete_project(
        &self,
        update: NewProjectUpdate,
    ) -> WorkflowResult<ProjectCompletion> {
        self.send_json(
            Method::POST,
            &format!("projects/{}/complete", update.project_id),
            &update,
        )
        .await
    }

    #[instrument(skip(self, log), fields(employee_id = log.employee_id))]
    async fn create_time_log(&self, log: NewTimeLog) -> WorkflowResult<TimeLog> {
        self.send_json(Method::POST, "time-logs", &log).await
    }

    #[instrument(skip(self))]
    async fn list_time_logs(&self, employee_id: EmployeeId) -> WorkflowResult<Vec<TimeLog>> {
        self.get_json(&format!("time-logs?employeeId={}", employee_id))
            .await
    }

    #[instrument(skip(self))]
    async fn list_employees(&self) -> WorkflowResult<Vec<Employee>> {
        self.get_json("employees").await
    }

    #[instrument(skip(self))]
    async fn get_employee(&self, id: EmployeeId) -> WorkflowResult<Employee> {
        self.get_json(&format!("employees/{}", id)).await
    }

    #[instrument(skip(self))]
    async fn list_customers(&self) -> WorkflowResult<Vec<Customer>> {
        self.get_json("customers").await
    }

    #[instrument(skip(self))]
    async fn get_customer(&self, id: CustomerId) -> WorkflowResult<Customer> {
        self.get_json(&format!("customers/{}", id)).await
    }
}
