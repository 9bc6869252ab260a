//! Data access for the workflows.
//!
//! The shop service is the system of record. [`WorkshopRepository`] is the
//! only way the workflows reach it: one method per request, each request
//! applied atomically by the service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::WorkflowResult;
use crate::models::{
    Appointment, AppointmentId, AppointmentPatch, AppointmentStatus, Customer, CustomerId,
    Employee, EmployeeId, NewProjectUpdate, NewTimeLog, Project, ProjectId, ProjectPatch,
    ProjectStatus, ProjectUpdate, Task, TaskId, TimeLog,
};

pub mod http;
pub mod memory;

pub use http::HttpWorkshopRepository;
pub use memory::InMemoryWorkshopRepository;

/// Result of the completion request: the stored update and the project
/// after its status moved to COMPLETED.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCompletion {
    pub update: ProjectUpdate,
    pub project: Project,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkshopRepository: Send + Sync {
    async fn list_appointments(&self) -> WorkflowResult<Vec<Appointment>>;
    async fn get_appointment(&self, id: AppointmentId) -> WorkflowResult<Appointment>;
    /// Applies every set field of `patch` in one request.
    async fn patch_appointment(
        &self,
        id: AppointmentId,
        patch: AppointmentPatch,
    ) -> WorkflowResult<Appointment>;
    async fn update_appointment_status(
        &self,
        id: AppointmentId,
        status: AppointmentStatus,
    ) -> WorkflowResult<Appointment>;

    async fn list_projects(&self) -> WorkflowResult<Vec<Project>>;
    async fn get_project(&self, id: ProjectId) -> WorkflowResult<Project>;
    async fn patch_project(&self, id: ProjectId, patch: ProjectPatch) -> WorkflowResult<Project>;
    async fn update_project_status(
        &self,
        id: ProjectId,
        status: ProjectStatus,
    ) -> WorkflowResult<Project>;

    async fn list_tasks(&self) -> WorkflowResult<Vec<Task>>;
    async fn get_task(&self, id: TaskId) -> WorkflowResult<Task>;

    async fn list_project_updates(&self, project_id: ProjectId)
        -> WorkflowResult<Vec<ProjectUpdate>>;
    async fn create_project_update(&self, update: NewProjectUpdate)
        -> WorkflowResult<ProjectUpdate>;
    /// Stores a completion update and moves the project to COMPLETED as one
    /// request; either both happen or neither.
    async fn complete_project(&self, update: NewProjectUpdate)
        -> WorkflowResult<ProjectCompletion>;

    async fn create_time_log(&self, log: NewTimeLog) -> WorkflowResult<TimeLog>;
    async fn list_time_logs(&self, employee_id: EmployeeId) -> WorkflowResult<Vec<TimeLog>>;

    async fn list_employees(&self) -> WorkflowResult<Vec<Employee>>;
    async fn get_employee(&self, id: EmployeeId) -> WorkflowResult<Employee>;
    async fn list_customers(&self) -> WorkflowResult<Vec<Customer>>;
    async fn get_customer(&self, id: CustomerId) -> WorkflowResult<Customer>;
}
