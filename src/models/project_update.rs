use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::{EmployeeId, ProjectId, TaskId, UpdateId};
use crate::errors::{ServiceError, WorkflowResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateType {
    Progress,
    CostChange,
    Delay,
    Completion,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgress {
    pub task_id: TaskId,
    pub completed: bool,
    pub percentage: u8,
}

/// A posted progress update. Immutable once the service has stored it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
    #[serde(rename = "updateId")]
    pub id: UpdateId,
    pub project_id: ProjectId,
    pub employee_id: EmployeeId,
    pub message: String,
    pub update_type: UpdateType,
    #[serde(default)]
    pub additional_cost: Option<Decimal>,
    #[serde(default)]
    pub cost_reason: Option<String>,
    #[serde(default)]
    pub estimated_completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub task_progress: Vec<TaskProgress>,
    pub overall_percentage: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// The body sent to the service when posting an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProjectUpdate {
    pub project_id: ProjectId,
    pub employee_id: EmployeeId,
    pub message: String,
    pub update_type: UpdateType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_cost: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_completion_date: Option<NaiveDate>,
    pub task_progress: Vec<TaskProgress>,
    pub overall_percentage: f64,
}

impl NewProjectUpdate {
    pub fn into_update(self, id: UpdateId, created_at: DateTime<Utc>) -> ProjectUpdate {
        ProjectUpdate {
            id,
            project_id: self.project_id,
            employee_id: self.employee_id,
            message: self.message,
            update_type: self.update_type,
            additional_cost: self.additional_cost,
            cost_reason: self.cost_reason,
            estimated_completion_date: self.estimated_completion_date,
            task_progress: self.task_progress,
            overall_percentage: self.overall_percentage,
            created_at: Some(created_at),
        }
    }
}

/// What the authoring employee fills in before posting.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectUpdateDraft {
    pub employee_id: EmployeeId,
    pub message: String,
    pub update_type: UpdateType,
    pub additional_cost: Option<Decimal>,
    pub cost_reason: Option<String>,
    pub estimated_completion_date: Option<NaiveDate>,
    pub task_progress: Vec<TaskProgress>,
}

impl ProjectUpdateDraft {
    pub fn new(
        employee_id: EmployeeId,
        update_type: UpdateType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            employee_id,
            message: message.into(),
            update_type,
            additional_cost: None,
            cost_reason: None,
            estimated_completion_date: None,
            task_progress: Vec::new(),
        }
    }

    pub fn with_task_progress(mut self, progress: Vec<TaskProgress>) -> Self {
        self.task_progress = progress;
        self
    }

    pub fn with_additional_cost(mut self, amount: Decimal, reason: impl Into<String>) -> Self {
        self.additional_cost = Some(amount);
        self.cost_reason = Some(reason.into());
        self
    }

    pub fn with_estimated_completion(mut self, date: NaiveDate) -> Self {
        self.estimated_completion_date = Some(date);
        self
    }

    pub fn validate(&self) -> WorkflowResult<()> {
        if self.message.trim().is_empty() {
            return Err(ServiceError::validation("update message is required"));
        }
        if let Some(progress) = self.task_progress.iter().find(|p| p.percentage > 100) {
            return Err(ServiceError::validation(format!(
                "completion percentage for task {} must be between 0 and 100, got {}",
                progress.task_id, progress.percentage
            )));
        }
        if let Some(cost) = self.additional_cost {
            if cost.is_sign_negative() {
                return Err(ServiceError::validation("additional cost cannot be negative"));
            }
            let has_reason = self
                .cost_reason
                .as_deref()
                .map(|r| !r.trim().is_empty())
                .unwrap_or(false);
            if !cost.is_zero() && !has_reason {
                return Err(ServiceError::validation(
                    "a reason is required when adding cost",
                ));
            }
        }
        Ok(())
    }

    /// Freezes the draft for `project_id`, computing the overall percentage
    /// from the per-task records as they are now.
    pub fn into_new_update(self, project_id: ProjectId) -> NewProjectUpdate {
        let overall_percentage = overall_percentage(&self.task_progress);
        NewProjectUpdate {
            project_id,
            employee_id: self.employee_id,
            message: self.message.trim().to_string(),
            update_type: self.update_type,
            additional_cost: self.additional_cost,
            cost_reason: self.cost_reason,
            estimated_completion_date: self.estimated_completion_date,
            task_progress: self.task_progress,
            overall_percentage,
        }
    }
}

/// Arithmetic mean of the per-task percentages; 0 when there are none.
pub fn overall_percentage(progress: &[TaskProgress]) -> f64 {
    if progress.is_empty() {
        return 0.0;
    }
    let sum: u32 = progress.iter().map(|p| u32::from(p.percentage)).sum();
    f64::from(sum) / progress.len() as f64
}
