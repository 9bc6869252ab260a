//! Domain entities exchanged with the shop service.
//!
//! Field names follow the service's camelCase JSON and every status enum
//! serializes to the exact upper-case token the service expects.

pub mod appointment;
pub mod people;
pub mod project;
pub mod project_update;
pub mod task;
pub mod time_log;

pub use appointment::{Appointment, AppointmentPatch, AppointmentStatus, ConsultationType};
pub use people::{Customer, Employee};
pub use project::{Project, ProjectPatch, ProjectStatus};
pub use project_update::{
    NewProjectUpdate, ProjectUpdate, ProjectUpdateDraft, TaskProgress, UpdateType,
};
pub use task::{Task, TaskPriority, TaskStatus};
pub use time_log::{NewTimeLog, TimeLog, TimeLogDraft};

pub type AppointmentId = i64;
pub type ProjectId = i64;
pub type TaskId = i64;
pub type EmployeeId = i64;
pub type CustomerId = i64;
pub type VehicleId = i64;
pub type UpdateId = i64;
pub type TimeLogId = i64;
