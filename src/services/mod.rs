// Main representative selection
pub mod assignment;

// Workflows over the shop service
pub mod appointments;
pub mod projects;
pub mod time_logs;

pub use appointments::AppointmentWorkflow;
pub use assignment::{EmployeeAssignmentResolver, Resolution};
pub use projects::ProjectWorkflow;
pub use time_logs::{TimeLogService, TimeSheet};
