use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AppointmentId, EmployeeId, ProjectId, TaskId, TimeLogId};
use crate::errors::{ServiceError, WorkflowResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLog {
    #[serde(rename = "timeLogId")]
    pub id: TimeLogId,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub hours_worked: Decimal,
    pub employee_id: EmployeeId,
    #[serde(default)]
    pub task_id: Option<TaskId>,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub appointment_id: Option<AppointmentId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTimeLog {
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub hours_worked: Decimal,
    pub employee_id: EmployeeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<AppointmentId>,
}

impl NewTimeLog {
    pub fn into_time_log(self, id: TimeLogId) -> TimeLog {
        TimeLog {
            id,
            description: self.description,
            start_time: self.start_time,
            end_time: self.end_time,
            hours_worked: self.hours_worked,
            employee_id: self.employee_id,
            task_id: self.task_id,
            project_id: self.project_id,
            appointment_id: self.appointment_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeLogDraft {
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub employee_id: EmployeeId,
    pub task_id: Option<TaskId>,
    pub project_id: Option<ProjectId>,
    pub appointment_id: Option<AppointmentId>,
}

impl TimeLogDraft {
    pub fn into_new_time_log(self) -> WorkflowResult<NewTimeLog> {
        if self.description.trim().is_empty() {
            return Err(ServiceError::validation("time log description is required"));
        }
        let hours_worked = hours_between(self.start_time, self.end_time)?;
        Ok(NewTimeLog {
            description: self.description.trim().to_string(),
            start_time: self.start_time,
            end_time: self.end_time,
            hours_worked,
            employee_id: self.employee_id,
            task_id: self.task_id,
            project_id: self.project_id,
            appointment_id: self.appointment_id,
        })
    }
}

/// Hours between `start` and `end`, rounded to two decimals.
/// `end` must be strictly after `start`.
pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> WorkflowResult<Decimal> {
    if end <= start {
        return Err(ServiceError::validation(
            "end time must be after start time",
        ));
    }
    let seconds = (end - start).num_seconds();
    Ok((Decimal::from(seconds) / Decimal::from(3600)).round_dp(2))
}
