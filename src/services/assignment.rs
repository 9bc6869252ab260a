use crate::errors::{ServiceError, WorkflowResult};
use crate::models::EmployeeId;

/// Outcome of picking the main representative for a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(EmployeeId),
    /// The caller has to ask which employee is in charge. `suggested` may be
    /// preselected in a form but is never stored without confirmation.
    RequiresChoice {
        candidates: Vec<EmployeeId>,
        suggested: EmployeeId,
    },
}

impl Resolution {
    pub fn resolved(&self) -> Option<EmployeeId> {
        match self {
            Self::Resolved(id) => Some(*id),
            Self::RequiresChoice { .. } => None,
        }
    }

    pub fn into_result(self) -> WorkflowResult<EmployeeId> {
        match self {
            Self::Resolved(id) => Ok(id),
            Self::RequiresChoice {
                candidates,
                suggested,
            } => Err(ServiceError::MainRepresentativeRequired {
                candidates,
                suggested,
            }),
        }
    }
}

pub struct EmployeeAssignmentResolver;

impl EmployeeAssignmentResolver {
    /// Decides who represents the project towards the customer.
    ///
    /// A single selected employee is always the representative. With several,
    /// an explicit choice wins when it is part of the selection, then the
    /// previous representative if still selected; otherwise the caller must
    /// choose.
    pub fn resolve_main_representative(
        selected: &[EmployeeId],
        explicit_choice: Option<EmployeeId>,
        previous_main_rep: Option<EmployeeId>,
    ) -> WorkflowResult<Resolution> {
        let selected = dedup_preserving_order(selected);

        match selected.as_slice() {
            [] => Err(ServiceError::validation("no employees selected")),
            [only] => Ok(Resolution::Resolved(*only)),
            [first, ..] => {
                let member = |id: &EmployeeId| selected.contains(id);
                if let Some(choice) = explicit_choice.filter(member) {
                    return Ok(Resolution::Resolved(choice));
                }
                if let Some(previous) = previous_main_rep.filter(member) {
                    return Ok(Resolution::Resolved(previous));
                }
                Ok(Resolution::RequiresChoice {
                    suggested: *first,
                    candidates: selected.clone(),
                })
            }
        }
    }
}

/// Drops repeated ids, keeping the first occurrence of each.
pub fn dedup_preserving_order(ids: &[EmployeeId]) -> Vec<EmployeeId> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}
