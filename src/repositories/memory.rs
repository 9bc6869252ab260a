use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{ProjectCompletion, WorkshopRepository};
use crate::errors::{ServiceError, WorkflowResult};
use crate::models::{
    Appointment, AppointmentId, AppointmentPatch, AppointmentStatus, Customer, CustomerId,
    Employee, EmployeeId, NewProjectUpdate, NewTimeLog, Project, ProjectId, ProjectPatch,
    ProjectStatus, ProjectUpdate, Task, TaskId, TimeLog,
};

#[derive(Default)]
struct State {
    appointments: BTreeMap<AppointmentId, Appointment>,
    projects: BTreeMap<ProjectId, Project>,
    tasks: BTreeMap<TaskId, Task>,
    updates: Vec<ProjectUpdate>,
    time_logs: Vec<TimeLog>,
    employees: BTreeMap<EmployeeId, Employee>,
    customers: BTreeMap<CustomerId, Customer>,
    writes: usize,
    fail_next_write: Option<ServiceError>,
}

impl State {
    /// Counts the write and returns the injected failure, if one is armed.
    fn begin_write(&mut self) -> WorkflowResult<()> {
        self.writes += 1;
        match self.fail_next_write.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Process-local [`WorkshopRepository`] for tests and offline tooling. Every
/// write is applied under one lock, so a request either fully lands or leaves
/// the state untouched.
#[derive(Default)]
pub struct InMemoryWorkshopRepository {
    state: Mutex<State>,
}

impl InMemoryWorkshopRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn insert_appointment(&self, appointment: Appointment) {
        self.state().appointments.insert(appointment.id, appointment);
    }

    pub fn insert_project(&self, project: Project) {
        self.state().projects.insert(project.id, project);
    }

    pub fn insert_task(&self, task: Task) {
        self.state().tasks.insert(task.id, task);
    }

    pub fn insert_employee(&self, employee: Employee) {
        self.state().employees.insert(employee.id, employee);
    }

    pub fn insert_customer(&self, customer: Customer) {
        self.state().customers.insert(customer.id, customer);
    }

    /// Makes the next write fail with `err` without touching any record.
    pub fn fail_next_write(&self, err: ServiceError) {
        self.state().fail_next_write = Some(err);
    }

    /// Number of write requests received so far, failed ones included.
    pub fn write_count(&self) -> usize {
        self.state().writes
    }
}

fn not_found(entity: &str, id: i64) -> ServiceError {
    ServiceError::NotFound(format!("{} {}", entity, id))
}

fn next_id<T>(items: &[T], id: impl Fn(&T) -> i64) -> i64 {
    items.iter().map(id).max().unwrap_or(0) + 1
}

#[async_trait]
impl WorkshopRepository for InMemoryWorkshopRepository {
    async fn list_appointments(&self) -> WorkflowResult<Vec<Appointment>> {
        Ok(self.state().appointments.values().cloned().collect())
    }

    async fn get_appointment(&self, id: AppointmentId) -> WorkflowResult<Appointment> {
        self.state()
            .appointments
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("appointment", id))
    }

    async fn patch_appointment(
        &self,
        id: AppointmentId,
        patch: AppointmentPatch,
    ) -> WorkflowResult<Appointment> {
        let mut state = self.state();
        state.begin_write()?;
        let appointment = state
            .appointments
            .get_mut(&id)
            .ok_or_else(|| not_found("appointment", id))?;
        appointment.apply(&patch);
        Ok(appointment.clone())
    }

    async fn update_appointment_status(
        &self,
        id: AppointmentId,
        status: AppointmentStatus,
    ) -> WorkflowResult<Appointment> {
        self.patch_appointment(
            id,
            AppointmentPatch {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    async fn list_projects(&self) -> WorkflowResult<Vec<Project>> {
        Ok(self.state().projects.values().cloned().collect())
    }

    async fn get_project(&self, id: ProjectId) -> WorkflowResult<Project> {
        self.state()
            .projects
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("project", id))
    }

    async fn patch_project(&self, id: ProjectId, patch: ProjectPatch) -> WorkflowResult<Project> {
        let mut state = self.state();
        state.begin_write()?;
        let project = state
            .projects
            .get_mut(&id)
            .ok_or_else(|| not_found("project", id))?;
        project.apply(&patch);
        Ok(project.clone())
    }

    async fn update_project_status(
        &self,
        id: ProjectId,
        status: ProjectStatus,
    ) -> WorkflowResult<Project> {
        self.patch_project(
            id,
            ProjectPatch {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    async fn list_tasks(&self) -> WorkflowResult<Vec<Task>> {
        Ok(self.state().tasks.values().cloned().collect())
    }

    async fn get_task(&self, id: TaskId) -> WorkflowResult<Task> {
        self.state()
            .tasks
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("task", id))
    }

    async fn list_project_updates(
        &self,
        project_id: ProjectId,
    ) -> WorkflowResult<Vec<ProjectUpdate>> {
        Ok(self
            .state()
            .updates
            .iter()
            .filter(|u| u.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_project_update(
        &self,
        update: NewProjectUpdate,
    ) -> WorkflowResult<ProjectUpdate> {
        let mut state = self.state();
        state.begin_write()?;
        if !state.projects.contains_key(&update.project_id) {
            return Err(not_found("project", update.project_id));
        }
        let id = next_id(&state.updates, |u| u.id);
        let stored = update.into_update(id, Utc::now());
        state.updates.push(stored.clone());
        Ok(stored)
    }

    async fn complete_project(
        &self,
        update: NewProjectUpdate,
    ) -> WorkflowResult<ProjectCompletion> {
        let mut state = self.state();
        state.begin_write()?;
        let project_id = update.project_id;
        let id = next_id(&state.updates, |u| u.id);
        let project = state
            .projects
            .get_mut(&project_id)
            .ok_or_else(|| not_found("project", project_id))?;
        project.status = ProjectStatus::Completed;
        let project = project.clone();
        let stored = update.into_update(id, Utc::now());
        state.updates.push(stored.clone());
        Ok(ProjectCompletion {
            update: stored,
            project,
        })
    }

    async fn create_time_log(&self, log: NewTimeLog) -> WorkflowResult<TimeLog> {
        let mut state = self.state();
        state.begin_write()?;
        let id = next_id(&state.time_logs, |l| l.id);
        let stored = log.into_time_log(id);
        state.time_logs.push(stored.clone());
        Ok(stored)
    }

    async fn list_time_logs(&self, employee_id: EmployeeId) -> WorkflowResult<Vec<TimeLog>> {
        Ok(self
            .state()
            .time_logs
            .iter()
            .filter(|l| l.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn list_employees(&self) -> WorkflowResult<Vec<Employee>> {
        Ok(self.state().employees.values().cloned().collect())
    }

    async fn get_employee(&self, id: EmployeeId) -> WorkflowResult<Employee> {
        self.state()
            .employees
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("employee", id))
    }

    async fn list_customers(&self) -> WorkflowResult<Vec<Customer>> {
        Ok(self.state().customers.values().cloned().collect())
    }

    async fn get_customer(&self, id: CustomerId) -> WorkflowResult<Customer> {
        self.state()
            .customers
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("customer", id))
    }
}
