use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::{AppointmentId, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Accepted services lock their project against cancellation.
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted | Self::InProgress | Self::Completed)
    }
}

/// A service line item from the catalog or derived from an appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "taskId")]
    pub id: TaskId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub estimated_hours: Decimal,
    pub estimated_cost: Decimal,
    #[serde(default)]
    pub category: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    #[serde(default)]
    pub appointment_id: Option<AppointmentId>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Number of accepted services among `tasks`.
pub fn accepted_count<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> usize {
    tasks.into_iter().filter(|t| t.status.is_accepted()).count()
}
