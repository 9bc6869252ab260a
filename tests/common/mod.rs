#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use garageflow::{
    events::{EventEnvelope, EventSender, WorkflowEvent},
    models::{
        Appointment, AppointmentStatus, ConsultationType, Employee, EmployeeId, Project,
        ProjectStatus, Task, TaskId, TaskPriority, TaskStatus,
    },
    repositories::{InMemoryWorkshopRepository, WorkshopRepository},
    services::{AppointmentWorkflow, ProjectWorkflow, TimeLogService},
};
use rust_decimal::Decimal;
use tokio::sync::mpsc;

/// Workflows wired to a seeded in-memory shop service, with the event
/// stream captured for assertions.
pub struct TestShop {
    pub repo: Arc<InMemoryWorkshopRepository>,
    sender: EventSender,
    events: mpsc::Receiver<EventEnvelope>,
}

impl TestShop {
    pub fn new() -> Self {
        let (sender, events) = EventSender::channel(64);
        Self {
            repo: Arc::new(InMemoryWorkshopRepository::new()),
            sender,
            events,
        }
    }

    fn dyn_repo(&self) -> Arc<dyn WorkshopRepository> {
        self.repo.clone()
    }

    pub fn appointments(&self) -> AppointmentWorkflow {
        AppointmentWorkflow::new(self.dyn_repo()).with_events(self.sender.clone())
    }

    pub fn projects(&self) -> ProjectWorkflow {
        ProjectWorkflow::new(self.dyn_repo()).with_events(self.sender.clone())
    }

    pub fn time_logs(&self) -> TimeLogService {
        TimeLogService::new(self.dyn_repo())
    }

    /// Events published so far, oldest first.
    pub fn drain_events(&mut self) -> Vec<WorkflowEvent> {
        let mut out = Vec::new();
        while let Ok(envelope) = self.events.try_recv() {
            out.push(envelope.event);
        }
        out
    }
}

pub fn appointment(
    id: i64,
    status: AppointmentStatus,
    employee_id: Option<EmployeeId>,
) -> Appointment {
    Appointment {
        id,
        vehicle_id: 11,
        customer_id: 2,
        employee_id,
        consultation_type: ConsultationType::SpecificIssue,
        date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
        start_time: None,
        end_time: None,
        status,
        customer_issue: Some("Grinding noise when braking".into()),
        notes: None,
        task_ids: vec![],
    }
}

pub fn project(
    id: i64,
    status: ProjectStatus,
    assigned: Vec<EmployeeId>,
    main: Option<EmployeeId>,
) -> Project {
    Project {
        id,
        name: "Brake overhaul".into(),
        description: "Replace pads and rotors on the front axle.".into(),
        status,
        start_date: None,
        end_date: None,
        customer_id: 2,
        vehicle_id: 11,
        appointment_id: Some(5),
        task_ids: vec![1, 2],
        assigned_employee_ids: assigned,
        main_representative_employee_id: main,
    }
}

pub fn task(id: TaskId, name: &str, cost: Decimal, hours: Decimal, status: TaskStatus) -> Task {
    Task {
        id,
        name: name.into(),
        description: String::new(),
        estimated_hours: hours,
        estimated_cost: cost,
        category: "Brakes".into(),
        priority: TaskPriority::Medium,
        status,
        appointment_id: None,
        notes: None,
    }
}

pub fn employee(id: EmployeeId, first_name: &str, last_name: &str) -> Employee {
    Employee {
        id,
        first_name: first_name.into(),
        last_name: last_name.into(),
        email: None,
    }
}
