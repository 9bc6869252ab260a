//! Status transition policy.
//!
//! Every status change the workflows perform is decided here, from the
//! current status, the requested target and a small context describing the
//! action. The table is an allow-list: any combination not matched below is
//! denied.

use std::fmt;

use crate::errors::ServiceError;
use crate::models::{AppointmentStatus, ProjectStatus};

/// The user-facing action that asks for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionAction {
    Assign,
    Approve,
    Reject,
    Cancel,
    Start,
    Complete,
    Recommend,
    Confirm,
}

impl fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Assign => "assign",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Recommend => "recommend",
            Self::Confirm => "confirm",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Appointment {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    Project {
        from: ProjectStatus,
        to: ProjectStatus,
    },
}

/// Facts about the entity the decision depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionContext<'a> {
    pub action: TransitionAction,
    pub employee_present: bool,
    pub assigned_employee_count: usize,
    pub accepted_service_count: usize,
    pub reason: Option<&'a str>,
}

impl<'a> TransitionContext<'a> {
    pub fn new(action: TransitionAction) -> Self {
        Self {
            action,
            employee_present: false,
            assigned_employee_count: 0,
            accepted_service_count: 0,
            reason: None,
        }
    }

    pub fn employee_present(mut self, present: bool) -> Self {
        self.employee_present = present;
        self
    }

    pub fn assigned_employees(mut self, count: usize) -> Self {
        self.assigned_employee_count = count;
        self
    }

    pub fn accepted_services(mut self, count: usize) -> Self {
        self.accepted_service_count = count;
        self
    }

    pub fn reason(mut self, reason: &'a str) -> Self {
        self.reason = Some(reason);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    #[error("{entity} cannot {action} from {from} to {to}")]
    Unreachable {
        entity: &'static str,
        action: TransitionAction,
        from: String,
        to: String,
    },
    #[error("an employee must be assigned before approval")]
    EmployeeRequired,
    #[error("at least one employee must be assigned")]
    NoAssignedEmployees,
    #[error("reason required")]
    ReasonRequired,
    #[error("services already accepted")]
    ServicesAccepted,
}

impl Denial {
    /// Precondition failures are fixable by the caller's input; the rest mean
    /// the entity is in the wrong state.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::EmployeeRequired | Self::NoAssignedEmployees | Self::ReasonRequired
        )
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

impl From<Denial> for ServiceError {
    fn from(denial: Denial) -> Self {
        if denial.is_precondition() {
            ServiceError::ValidationError(denial.to_string())
        } else {
            ServiceError::InvalidStateError(denial.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Allow => None,
            Self::Deny(denial) => Some(denial.to_string()),
        }
    }

    pub fn into_result(self) -> Result<(), ServiceError> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(denial) => Err(denial.into()),
        }
    }
}

pub struct StatusTransitionPolicy;

impl StatusTransitionPolicy {
    pub fn can_transition(transition: Transition, ctx: &TransitionContext<'_>) -> Decision {
        match transition {
            Transition::Appointment { from, to } => Self::appointment(from, to, ctx),
            Transition::Project { from, to } => Self::project(from, to, ctx),
        }
    }

    pub fn appointment(
        from: AppointmentStatus,
        to: AppointmentStatus,
        ctx: &TransitionContext<'_>,
    ) -> Decision {
        use AppointmentStatus::*;
        use TransitionAction as A;

        match (from, to, ctx.action) {
            (Pending, Confirmed, A::Assign) | (Confirmed, Confirmed, A::Assign) => Decision::Allow,
            (Pending, Confirmed, A::Approve) => {
                if ctx.employee_present {
                    Decision::Allow
                } else {
                    Decision::Deny(Denial::EmployeeRequired)
                }
            }
            (Confirmed, InProgress, A::Start) => Decision::Allow,
            (InProgress, Completed, A::Complete) => Decision::Allow,
            (Pending | Confirmed | InProgress, Canceled, A::Reject) => {
                if has_text(ctx.reason) {
                    Decision::Allow
                } else {
                    Decision::Deny(Denial::ReasonRequired)
                }
            }
            (Pending | Confirmed | InProgress, Canceled, A::Cancel) => Decision::Allow,
            _ => unreachable_transition("appointment", ctx.action, from, to),
        }
    }

    pub fn project(
        from: ProjectStatus,
        to: ProjectStatus,
        ctx: &TransitionContext<'_>,
    ) -> Decision {
        use ProjectStatus::*;
        use TransitionAction as A;

        match (ctx.action, to) {
            // Employee count is checked before reachability so an unassigned
            // project always reports the missing assignment.
            (A::Approve, InProgress) => {
                if ctx.assigned_employee_count == 0 {
                    Decision::Deny(Denial::NoAssignedEmployees)
                } else if matches!(from, Created | Recommended | Confirmed) {
                    Decision::Allow
                } else {
                    unreachable_transition("project", ctx.action, from, to)
                }
            }
            (A::Reject | A::Cancel, Cancelled) => {
                if ctx.accepted_service_count > 0 {
                    Decision::Deny(Denial::ServicesAccepted)
                } else if !from.is_terminal() {
                    Decision::Allow
                } else {
                    unreachable_transition("project", ctx.action, from, to)
                }
            }
            (A::Recommend, Recommended) if from == Created => Decision::Allow,
            (A::Confirm, Confirmed) if matches!(from, Created | Recommended) => Decision::Allow,
            (A::Complete, Completed) if from == InProgress => Decision::Allow,
            _ => unreachable_transition("project", ctx.action, from, to),
        }
    }

    /// Whether a cancel or reject is reachable from `status`. Used by list
    /// views to decide which actions to offer.
    pub fn appointment_is_cancelable(status: AppointmentStatus) -> bool {
        Self::appointment(
            status,
            AppointmentStatus::Canceled,
            &TransitionContext::new(TransitionAction::Cancel),
        )
        .is_allowed()
    }

    pub fn project_is_cancelable(status: ProjectStatus, accepted_service_count: usize) -> bool {
        Self::project(
            status,
            ProjectStatus::Cancelled,
            &TransitionContext::new(TransitionAction::Cancel)
                .accepted_services(accepted_service_count),
        )
        .is_allowed()
    }
}

fn has_text(value: Option<&str>) -> bool {
    value.map(|s| !s.trim().is_empty()).unwrap_or(false)
}

fn unreachable_transition(
    entity: &'static str,
    action: TransitionAction,
    from: impl fmt::Display,
    to: impl fmt::Display,
) -> Decision {
    Decision::Deny(Denial::Unreachable {
        entity,
        action,
        from: from.to_string(),
        to: to.to_string(),
    })
}
