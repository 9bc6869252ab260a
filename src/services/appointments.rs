use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use crate::errors::{ServiceError, WorkflowResult};
use crate::events::{publish, EventSender, WorkflowEvent};
use crate::models::appointment::REJECTION_PREFIX;
use crate::models::{Appointment, AppointmentId, AppointmentPatch, AppointmentStatus, EmployeeId};
use crate::policy::{Decision, StatusTransitionPolicy, TransitionAction, TransitionContext};
use crate::repositories::WorkshopRepository;

/// Staff-side lifecycle of customer appointments.
///
/// Each mutation validates locally, asks the transition policy, then sends a
/// single request to the shop service. Callers reload after a success.
#[derive(Clone)]
pub struct AppointmentWorkflow {
    repo: Arc<dyn WorkshopRepository>,
    events: Option<EventSender>,
}

impl AppointmentWorkflow {
    pub fn new(repo: Arc<dyn WorkshopRepository>) -> Self {
        Self { repo, events: None }
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> WorkflowResult<Vec<Appointment>> {
        self.repo.list_appointments().await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: AppointmentId) -> WorkflowResult<Appointment> {
        self.repo.get_appointment(id).await
    }

    /// Assigns the technician and confirms the appointment in one request.
    /// Re-assigning a confirmed appointment keeps it confirmed.
    #[instrument(skip(self))]
    pub async fn assign_employee(
        &self,
        id: AppointmentId,
        employee_id: EmployeeId,
    ) -> WorkflowResult<Appointment> {
        if employee_id <= 0 {
            return Err(ServiceError::validation("a valid employee must be selected"));
        }

        let current = self
            .load_for_transition(id, AppointmentStatus::Confirmed, |_| {
                TransitionContext::new(TransitionAction::Assign)
            })
            .await?;

        let patch = AppointmentPatch {
            employee_id: Some(employee_id),
            status: Some(AppointmentStatus::Confirmed),
            notes: None,
        };
        let updated = self.repo.patch_appointment(id, patch).await.map_err(|e| {
            error!("Failed to assign employee {} to appointment {}: {}", employee_id, id, e);
            e
        })?;

        info!("Appointment {} assigned to employee {}", id, employee_id);
        publish(
            self.events.as_ref(),
            WorkflowEvent::AppointmentAssigned {
                appointment_id: id,
                employee_id,
            },
        )
        .await;
        self.status_changed(id, current.status, updated.status).await;
        Ok(updated)
    }

    /// Confirms a pending appointment that already has an employee.
    #[instrument(skip(self))]
    pub async fn approve(&self, id: AppointmentId) -> WorkflowResult<Appointment> {
        let current = self
            .load_for_transition(id, AppointmentStatus::Confirmed, |a| {
                TransitionContext::new(TransitionAction::Approve)
                    .employee_present(a.employee_id.is_some())
            })
            .await?;
        self.set_status(current, AppointmentStatus::Confirmed).await
    }

    /// Cancels the appointment and records the reason in its notes.
    #[instrument(skip(self))]
    pub async fn reject(&self, id: AppointmentId, reason: &str) -> WorkflowResult<Appointment> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::validation("reason required"));
        }

        let current = self
            .load_for_transition(id, AppointmentStatus::Canceled, |_| {
                TransitionContext::new(TransitionAction::Reject).reason(reason)
            })
            .await?;

        let notes = match current.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(existing) => format!("{}\n{}{}", existing, REJECTION_PREFIX, reason),
            None => format!("{}{}", REJECTION_PREFIX, reason),
        };
        let patch = AppointmentPatch {
            employee_id: None,
            status: Some(AppointmentStatus::Canceled),
            notes: Some(notes),
        };
        let updated = self.repo.patch_appointment(id, patch).await.map_err(|e| {
            error!("Failed to reject appointment {}: {}", id, e);
            e
        })?;

        info!("Appointment {} rejected", id);
        self.status_changed(id, current.status, updated.status).await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn start(&self, id: AppointmentId) -> WorkflowResult<Appointment> {
        let current = self
            .load_for_transition(id, AppointmentStatus::InProgress, |_| {
                TransitionContext::new(TransitionAction::Start)
            })
            .await?;
        self.set_status(current, AppointmentStatus::InProgress).await
    }

    /// Finishes the appointment; `report_text` replaces the notes and is what
    /// the customer reads as the technician's report.
    #[instrument(skip(self, report_text))]
    pub async fn complete(
        &self,
        id: AppointmentId,
        report_text: &str,
    ) -> WorkflowResult<Appointment> {
        if report_text.trim().is_empty() {
            return Err(ServiceError::validation("a completion report is required"));
        }

        let current = self
            .load_for_transition(id, AppointmentStatus::Completed, |_| {
                TransitionContext::new(TransitionAction::Complete)
            })
            .await?;

        let patch = AppointmentPatch {
            employee_id: None,
            status: Some(AppointmentStatus::Completed),
            notes: Some(report_text.to_string()),
        };
        let updated = self.repo.patch_appointment(id, patch).await.map_err(|e| {
            error!("Failed to complete appointment {}: {}", id, e);
            e
        })?;

        info!("Appointment {} completed", id);
        self.status_changed(id, current.status, updated.status).await;
        Ok(updated)
    }

    /// Loads the appointment and checks the transition to `to`. An unreachable
    /// transition triggers one re-fetch: if someone else moved the
    /// appointment in the meantime the fresh status is evaluated instead.
    async fn load_for_transition<'r, F>(
        &self,
        id: AppointmentId,
        to: AppointmentStatus,
        context: F,
    ) -> WorkflowResult<Appointment>
    where
        F: Fn(&Appointment) -> TransitionContext<'r>,
    {
        let appointment = self.repo.get_appointment(id).await?;
        let denial = match StatusTransitionPolicy::appointment(
            appointment.status,
            to,
            &context(&appointment),
        ) {
            Decision::Allow => return Ok(appointment),
            Decision::Deny(denial) if denial.is_unreachable() => denial,
            Decision::Deny(denial) => return Err(denial.into()),
        };

        let fresh = self.repo.get_appointment(id).await?;
        if fresh.status == appointment.status {
            return Err(denial.into());
        }
        debug!(
            "Appointment {} moved from {} to {} concurrently; re-evaluating",
            id, appointment.status, fresh.status
        );
        StatusTransitionPolicy::appointment(fresh.status, to, &context(&fresh)).into_result()?;
        Ok(fresh)
    }

    async fn set_status(
        &self,
        current: Appointment,
        status: AppointmentStatus,
    ) -> WorkflowResult<Appointment> {
        let updated = self
            .repo
            .update_appointment_status(current.id, status)
            .await
            .map_err(|e| {
                error!("Failed to move appointment {} to {}: {}", current.id, status, e);
                e
            })?;
        info!("Appointment {} is now {}", current.id, updated.status);
        self.status_changed(current.id, current.status, updated.status)
            .await;
        Ok(updated)
    }

    async fn status_changed(
        &self,
        id: AppointmentId,
        old_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) {
        if old_status == new_status {
            return;
        }
        publish(
            self.events.as_ref(),
            WorkflowEvent::AppointmentStatusChanged {
                appointment_id: id,
                old_status,
                new_status,
            },
        )
        .await;
    }
}
