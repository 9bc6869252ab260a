use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

use crate::models::{
    AppointmentId, AppointmentStatus, EmployeeId, ProjectId, ProjectStatus, UpdateId,
};

/// Published after a workflow mutation has been accepted by the shop service.
/// Subscribers reload the affected list from the service instead of patching
/// local copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkflowEvent {
    AppointmentAssigned {
        appointment_id: AppointmentId,
        employee_id: EmployeeId,
    },
    AppointmentStatusChanged {
        appointment_id: AppointmentId,
        old_status: AppointmentStatus,
        new_status: AppointmentStatus,
    },
    ProjectEmployeesAssigned {
        project_id: ProjectId,
        employee_ids: Vec<EmployeeId>,
        main_representative: EmployeeId,
    },
    ProjectStatusChanged {
        project_id: ProjectId,
        old_status: ProjectStatus,
        new_status: ProjectStatus,
    },
    ProjectUpdatePosted {
        project_id: ProjectId,
        update_id: UpdateId,
    },
    ProjectReportSubmitted {
        project_id: ProjectId,
        employee_id: EmployeeId,
    },
}

impl WorkflowEvent {
    pub fn appointment_id(&self) -> Option<AppointmentId> {
        match self {
            Self::AppointmentAssigned { appointment_id, .. }
            | Self::AppointmentStatusChanged { appointment_id, .. } => Some(*appointment_id),
            _ => None,
        }
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        match self {
            Self::ProjectEmployeesAssigned { project_id, .. }
            | Self::ProjectStatusChanged { project_id, .. }
            | Self::ProjectUpdatePosted { project_id, .. }
            | Self::ProjectReportSubmitted { project_id, .. } => Some(*project_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event: WorkflowEvent,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<EventEnvelope>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<EventEnvelope>) -> Self {
        Self { sender }
    }

    /// Creates a sender with its receiving half.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<EventEnvelope>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: WorkflowEvent) -> Result<(), String> {
        self.sender
            .send(EventEnvelope {
                event,
                occurred_at: Utc::now(),
            })
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Publishes `event` if a sender is configured. The mutation it describes is
/// already committed, so a closed channel is logged and otherwise ignored.
pub(crate) async fn publish(sender: Option<&EventSender>, event: WorkflowEvent) {
    if let Some(sender) = sender {
        if let Err(e) = sender.send(event).await {
            warn!("Dropping workflow event: {}", e);
        }
    }
}
