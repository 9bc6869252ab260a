//! Workflow engine for a vehicle service shop.
//!
//! Appointments and repair projects move through explicit status lifecycles.
//! The [`policy`] module decides which transitions are allowed, the
//! [`services`] drive them against the shop service through a
//! [`repositories::WorkshopRepository`], and [`reports`] reads and writes the
//! completion report embedded in project descriptions.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod policy;
pub mod reports;
pub mod repositories;
pub mod retry;
pub mod services;

pub use errors::{ServiceError, WorkflowResult};
pub use policy::{Decision, StatusTransitionPolicy, Transition, TransitionAction, TransitionContext};
pub use reports::{ExtraCharge, ProjectReport, ProjectReportBuilder};
pub use services::{
    AppointmentWorkflow, EmployeeAssignmentResolver, ProjectWorkflow, Resolution, TimeLogService,
};
