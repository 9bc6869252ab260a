use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::{AppointmentId, CustomerId, EmployeeId, TaskId, VehicleId};

/// Prefix written in front of the reason when an appointment is rejected.
pub const REJECTION_PREFIX: &str = "REJECTED: ";

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
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Canceled,
}

impl AppointmentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }
}

/// Why the customer booked the appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsultationType {
    GeneralCheckup,
    SpecificIssue,
    Maintenance,
    Diagnostic,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(rename = "appointmentId")]
    pub id: AppointmentId,
    pub vehicle_id: VehicleId,
    pub customer_id: CustomerId,
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
    pub consultation_type: ConsultationType,
    pub date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub customer_issue: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub task_ids: Vec<TaskId>,
}

impl Appointment {
    pub fn apply(&mut self, patch: &AppointmentPatch) {
        if let Some(employee_id) = patch.employee_id {
            self.employee_id = Some(employee_id);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
    }

    /// The reason recorded by the last rejection, if the appointment was rejected.
    pub fn rejection_reason(&self) -> Option<&str> {
        if self.status != AppointmentStatus::Canceled {
            return None;
        }
        self.notes
            .as_deref()?
            .lines()
            .rev()
            .find_map(|line| line.strip_prefix(REJECTION_PREFIX))
    }

    /// The technician's report shown to the customer once work is done.
    pub fn technician_report(&self) -> Option<&str> {
        match self.status {
            AppointmentStatus::Completed => self.notes.as_deref(),
            _ => None,
        }
    }
}

/// Fields changed together by one appointment mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<EmployeeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
