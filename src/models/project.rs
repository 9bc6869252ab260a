use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::{AppointmentId, CustomerId, EmployeeId, ProjectId, TaskId, VehicleId};
use crate::reports::{self, ProjectReport};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Created,
    Recommended,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "projectId")]
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: ProjectStatus,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub customer_id: CustomerId,
    pub vehicle_id: VehicleId,
    #[serde(default)]
    pub appointment_id: Option<AppointmentId>,
    #[serde(default)]
    pub task_ids: Vec<TaskId>,
    #[serde(default)]
    pub assigned_employee_ids: Vec<EmployeeId>,
    #[serde(default)]
    pub main_representative_employee_id: Option<EmployeeId>,
}

impl Project {
    /// Admin lists treat a project as pending while it is freshly created or
    /// while nobody is assigned to it, whatever its nominal status says.
    pub fn is_pending(&self) -> bool {
        self.status == ProjectStatus::Created || self.assigned_employee_ids.is_empty()
    }

    pub fn is_assigned(&self, employee_id: EmployeeId) -> bool {
        self.assigned_employee_ids.contains(&employee_id)
    }

    pub fn is_main_representative(&self, employee_id: EmployeeId) -> bool {
        self.main_representative_employee_id == Some(employee_id)
    }

    /// The completion report embedded in the description, if one was submitted.
    pub fn report(&self) -> Option<ProjectReport> {
        reports::split_description(&self.description).1
    }

    pub fn apply(&mut self, patch: &ProjectPatch) {
        if let Some(ids) = &patch.assigned_employee_ids {
            self.assigned_employee_ids = ids.clone();
        }
        if let Some(main) = patch.main_representative_employee_id {
            self.main_representative_employee_id = Some(main);
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_employee_ids: Option<Vec<EmployeeId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_representative_employee_id: Option<EmployeeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
}
