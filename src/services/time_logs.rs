use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::errors::WorkflowResult;
use crate::models::{EmployeeId, TimeLog, TimeLogDraft};
use crate::repositories::WorkshopRepository;

/// An employee's recorded work with the summed hours.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSheet {
    pub employee_id: EmployeeId,
    pub logs: Vec<TimeLog>,
    pub total_hours: Decimal,
}

#[derive(Clone)]
pub struct TimeLogService {
    repo: Arc<dyn WorkshopRepository>,
}

impl TimeLogService {
    pub fn new(repo: Arc<dyn WorkshopRepository>) -> Self {
        Self { repo }
    }

    /// Records a block of work; the hours are derived from the interval.
    #[instrument(skip(self, draft), fields(employee_id = draft.employee_id))]
    pub async fn record(&self, draft: TimeLogDraft) -> WorkflowResult<TimeLog> {
        let employee_id = draft.employee_id;
        let log = draft.into_new_time_log()?;
        let stored = self.repo.create_time_log(log).await.map_err(|e| {
            error!("Failed to record time for employee {}: {}", employee_id, e);
            e
        })?;
        info!(
            "Recorded {}h for employee {} (log {})",
            stored.hours_worked, employee_id, stored.id
        );
        Ok(stored)
    }

    #[instrument(skip(self))]
    pub async fn for_employee(&self, employee_id: EmployeeId) -> WorkflowResult<TimeSheet> {
        let logs = self.repo.list_time_logs(employee_id).await?;
        let total_hours = logs.iter().map(|l| l.hours_worked).sum();
        Ok(TimeSheet {
            employee_id,
            logs,
            total_hours,
        })
    }
}
