use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info, instrument, warn};

use super::assignment::{dedup_preserving_order, EmployeeAssignmentResolver};
use crate::errors::{ServiceError, WorkflowResult};
use crate::events::{publish, EventSender, WorkflowEvent};
use crate::models::people::employee_label;
use crate::models::task::accepted_count;
use crate::models::{
    EmployeeId, Project, ProjectId, ProjectPatch, ProjectStatus, ProjectUpdate,
    ProjectUpdateDraft, Task, TaskId, TaskProgress, UpdateType,
};
use crate::policy::{Decision, StatusTransitionPolicy, TransitionAction, TransitionContext};
use crate::reports::{ExtraCharge, ProjectReport, ProjectReportBuilder};
use crate::repositories::WorkshopRepository;

/// Project lifecycle: staffing, approval, progress updates, completion and
/// the final report.
#[derive(Clone)]
pub struct ProjectWorkflow {
    repo: Arc<dyn WorkshopRepository>,
    events: Option<EventSender>,
}

impl ProjectWorkflow {
    pub fn new(repo: Arc<dyn WorkshopRepository>) -> Self {
        Self { repo, events: None }
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> WorkflowResult<Vec<Project>> {
        self.repo.list_projects().await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: ProjectId) -> WorkflowResult<Project> {
        self.repo.get_project(id).await
    }

    /// Projects that still need an administrator: freshly created or without
    /// any assigned employee.
    #[instrument(skip(self))]
    pub async fn pending(&self) -> WorkflowResult<Vec<Project>> {
        let projects = self.repo.list_projects().await?;
        Ok(projects.into_iter().filter(Project::is_pending).collect())
    }

    /// Update history, as shown to the customer.
    #[instrument(skip(self))]
    pub async fn updates(&self, id: ProjectId) -> WorkflowResult<Vec<ProjectUpdate>> {
        self.repo.list_project_updates(id).await
    }

    /// The services that make up the project.
    #[instrument(skip(self))]
    pub async fn tasks(&self, id: ProjectId) -> WorkflowResult<Vec<Task>> {
        let project = self.repo.get_project(id).await?;
        self.tasks_of(&project).await
    }

    /// Replaces the assigned employees and sets the main representative in
    /// one request.
    #[instrument(skip(self))]
    pub async fn assign_employees(
        &self,
        id: ProjectId,
        employee_ids: &[EmployeeId],
        main_representative: Option<EmployeeId>,
    ) -> WorkflowResult<Project> {
        if let Some(invalid) = employee_ids.iter().find(|&&employee_id| employee_id <= 0) {
            return Err(ServiceError::validation(format!(
                "invalid employee id {}",
                invalid
            )));
        }

        let project = self.repo.get_project(id).await?;
        if project.status.is_terminal() {
            return Err(ServiceError::invalid_state(format!(
                "cannot assign employees to a {} project",
                project.status
            )));
        }

        let main = EmployeeAssignmentResolver::resolve_main_representative(
            employee_ids,
            main_representative,
            project.main_representative_employee_id,
        )?
        .into_result()?;
        let assigned = dedup_preserving_order(employee_ids);

        let patch = ProjectPatch {
            assigned_employee_ids: Some(assigned.clone()),
            main_representative_employee_id: Some(main),
            ..Default::default()
        };
        let updated = self.repo.patch_project(id, patch).await.map_err(|e| {
            error!("Failed to assign employees to project {}: {}", id, e);
            e
        })?;

        info!(
            "Project {} assigned to {:?}, main representative {}",
            id, assigned, main
        );
        publish(
            self.events.as_ref(),
            WorkflowEvent::ProjectEmployeesAssigned {
                project_id: id,
                employee_ids: assigned,
                main_representative: main,
            },
        )
        .await;
        Ok(updated)
    }

    /// Moves the project into work. Requires at least one assigned employee.
    #[instrument(skip(self))]
    pub async fn approve(&self, id: ProjectId) -> WorkflowResult<Project> {
        let current = self
            .load_for_transition(id, ProjectStatus::InProgress, |p| {
                TransitionContext::new(TransitionAction::Approve)
                    .assigned_employees(p.assigned_employee_ids.len())
            })
            .await?;
        self.set_status(current, ProjectStatus::InProgress).await
    }

    /// Cancels the project unless the customer already accepted some of its
    /// services.
    #[instrument(skip(self))]
    pub async fn reject(&self, id: ProjectId) -> WorkflowResult<Project> {
        let project = self.repo.get_project(id).await?;
        let accepted = accepted_count(&self.tasks_of(&project).await?);
        if accepted > 0 {
            warn!("Project {} has {} accepted services", id, accepted);
        }

        let current = self
            .evaluate(project, ProjectStatus::Cancelled, |_| {
                TransitionContext::new(TransitionAction::Reject).accepted_services(accepted)
            })
            .await?;
        self.set_status(current, ProjectStatus::Cancelled).await
    }

    #[instrument(skip(self))]
    pub async fn recommend(&self, id: ProjectId) -> WorkflowResult<Project> {
        let current = self
            .load_for_transition(id, ProjectStatus::Recommended, |_| {
                TransitionContext::new(TransitionAction::Recommend)
            })
            .await?;
        self.set_status(current, ProjectStatus::Recommended).await
    }

    #[instrument(skip(self))]
    pub async fn confirm(&self, id: ProjectId) -> WorkflowResult<Project> {
        let current = self
            .load_for_transition(id, ProjectStatus::Confirmed, |_| {
                TransitionContext::new(TransitionAction::Confirm)
            })
            .await?;
        self.set_status(current, ProjectStatus::Confirmed).await
    }

    /// Posts a progress update on behalf of the main representative.
    ///
    /// A `COMPLETION` update also finishes the project; the update and the
    /// status change are sent as one request.
    #[instrument(
        skip(self, draft),
        fields(employee_id = draft.employee_id, update_type = %draft.update_type)
    )]
    pub async fn post_update(
        &self,
        id: ProjectId,
        draft: ProjectUpdateDraft,
    ) -> WorkflowResult<ProjectUpdate> {
        draft.validate()?;

        let project = self.repo.get_project(id).await?;
        if project.status.is_terminal() {
            return Err(ServiceError::invalid_state(format!(
                "project {} is {} and no longer accepts updates",
                id, project.status
            )));
        }
        if !project.is_main_representative(draft.employee_id) {
            return Err(ServiceError::forbidden(
                "only the main representative can post updates",
            ));
        }

        if draft.update_type == UpdateType::Completion {
            StatusTransitionPolicy::project(
                project.status,
                ProjectStatus::Completed,
                &TransitionContext::new(TransitionAction::Complete)
                    .assigned_employees(project.assigned_employee_ids.len()),
            )
            .into_result()?;

            let completion = self
                .repo
                .complete_project(draft.into_new_update(id))
                .await
                .map_err(|e| {
                    error!("Failed to complete project {}: {}", id, e);
                    e
                })?;

            info!("Project {} completed", id);
            publish(
                self.events.as_ref(),
                WorkflowEvent::ProjectStatusChanged {
                    project_id: id,
                    old_status: project.status,
                    new_status: completion.project.status,
                },
            )
            .await;
            self.update_posted(&completion.update).await;
            return Ok(completion.update);
        }

        let update = self
            .repo
            .create_project_update(draft.into_new_update(id))
            .await
            .map_err(|e| {
                error!("Failed to post update on project {}: {}", id, e);
                e
            })?;
        info!("Update {} posted on project {}", update.id, id);
        self.update_posted(&update).await;
        Ok(update)
    }

    /// Shortcut for the main representative: every service at 100% and a
    /// completion update with `message`.
    #[instrument(skip(self, message))]
    pub async fn mark_completed(
        &self,
        id: ProjectId,
        employee_id: EmployeeId,
        message: &str,
    ) -> WorkflowResult<ProjectUpdate> {
        if message.trim().is_empty() {
            return Err(ServiceError::validation("a completion message is required"));
        }

        let project = self.repo.get_project(id).await?;
        let progress = project
            .task_ids
            .iter()
            .map(|&task_id| TaskProgress {
                task_id,
                completed: true,
                percentage: 100,
            })
            .collect();
        let draft = ProjectUpdateDraft::new(employee_id, UpdateType::Completion, message)
            .with_task_progress(progress);
        self.post_update(id, draft).await
    }

    /// Builds the final report for `employee_id` from the project's services.
    /// The report is signed with the employee's name.
    #[instrument(skip(self, extra_charges, notes))]
    pub async fn draft_report(
        &self,
        id: ProjectId,
        employee_id: EmployeeId,
        selected_task_ids: &[TaskId],
        extra_charges: &[ExtraCharge],
        notes: Option<&str>,
        date: NaiveDate,
    ) -> WorkflowResult<ProjectReport> {
        let project = self.repo.get_project(id).await?;
        let tasks = self.tasks_of(&project).await?;
        let employee = match self.repo.get_employee(employee_id).await {
            Ok(employee) => Some(employee),
            Err(ServiceError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        ProjectReportBuilder::new(employee_label(employee.as_ref()), date).build(
            selected_task_ids,
            &tasks,
            extra_charges,
            notes,
        )
    }

    /// Stores `report` in the project description, replacing any report
    /// submitted earlier. Only assigned employees may submit.
    #[instrument(skip(self, report))]
    pub async fn submit_report(
        &self,
        id: ProjectId,
        employee_id: EmployeeId,
        report: &ProjectReport,
    ) -> WorkflowResult<Project> {
        let project = self.repo.get_project(id).await?;
        if !project.is_assigned(employee_id) {
            return Err(ServiceError::forbidden(
                "only employees assigned to the project can submit its report",
            ));
        }

        let patch = ProjectPatch {
            description: Some(report.append_to(&project.description)),
            ..Default::default()
        };
        let updated = self.repo.patch_project(id, patch).await.map_err(|e| {
            error!("Failed to store report for project {}: {}", id, e);
            e
        })?;

        info!("Report submitted for project {} by employee {}", id, employee_id);
        publish(
            self.events.as_ref(),
            WorkflowEvent::ProjectReportSubmitted {
                project_id: id,
                employee_id,
            },
        )
        .await;
        Ok(updated)
    }

    async fn tasks_of(&self, project: &Project) -> WorkflowResult<Vec<Task>> {
        let tasks = self.repo.list_tasks().await?;
        Ok(tasks
            .into_iter()
            .filter(|t| project.task_ids.contains(&t.id))
            .collect())
    }

    async fn load_for_transition<F>(
        &self,
        id: ProjectId,
        to: ProjectStatus,
        context: F,
    ) -> WorkflowResult<Project>
    where
        F: Fn(&Project) -> TransitionContext<'static>,
    {
        let project = self.repo.get_project(id).await?;
        self.evaluate(project, to, context).await
    }

    /// Checks the transition from `project`'s status. An unreachable
    /// transition triggers one re-fetch in case the project moved
    /// concurrently.
    async fn evaluate<F>(
        &self,
        project: Project,
        to: ProjectStatus,
        context: F,
    ) -> WorkflowResult<Project>
    where
        F: Fn(&Project) -> TransitionContext<'static>,
    {
        let denial = match StatusTransitionPolicy::project(project.status, to, &context(&project)) {
            Decision::Allow => return Ok(project),
            Decision::Deny(denial) if denial.is_unreachable() => denial,
            Decision::Deny(denial) => return Err(denial.into()),
        };

        let fresh = self.repo.get_project(project.id).await?;
        if fresh.status == project.status {
            return Err(denial.into());
        }
        debug!(
            "Project {} moved from {} to {} concurrently; re-evaluating",
            project.id, project.status, fresh.status
        );
        StatusTransitionPolicy::project(fresh.status, to, &context(&fresh)).into_result()?;
        Ok(fresh)
    }

    async fn set_status(&self, current: Project, status: ProjectStatus) -> WorkflowResult<Project> {
        let updated = self
            .repo
            .update_project_status(current.id, status)
            .await
            .map_err(|e| {
                error!("Failed to move project {} to {}: {}", current.id, status, e);
                e
            })?;
        info!("Project {} is now {}", current.id, updated.status);
        if current.status != updated.status {
            publish(
                self.events.as_ref(),
                WorkflowEvent::ProjectStatusChanged {
                    project_id: current.id,
                    old_status: current.status,
                    new_status: updated.status,
                },
            )
            .await;
        }
        Ok(updated)
    }

    async fn update_posted(&self, update: &ProjectUpdate) {
        publish(
            self.events.as_ref(),
            WorkflowEvent::ProjectUpdatePosted {
                project_id: update.project_id,
                update_id: update.id,
            },
        )
        .await;
    }
}
