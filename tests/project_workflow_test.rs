//! Integration tests for the project workflow.
//!
//! Tests cover:
//! - Employee assignment and main representative selection
//! - Approval, recommendation, confirmation and cancellation rules
//! - Progress updates and completion
//! - Report submission into the project description

mod common;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use common::{employee, project, task, TestShop};
use garageflow::events::WorkflowEvent;
use garageflow::models::{
    ProjectStatus, ProjectUpdateDraft, TaskProgress, TaskStatus, UpdateType,
};
use garageflow::reports::{ExtraCharge, REPORT_DELIMITER};
use garageflow::{EmployeeAssignmentResolver, Resolution, ServiceError};
use rust_decimal_macros::dec;

fn seed_tasks(shop: &TestShop, first: TaskStatus, second: TaskStatus) {
    shop.repo
        .insert_task(task(1, "Brake pads", dec!(100), dec!(2), first));
    shop.repo
        .insert_task(task(2, "Rotor resurfacing", dec!(50), dec!(1), second));
    // Belongs to another project.
    shop.repo
        .insert_task(task(3, "Oil change", dec!(40), dec!(0.5), TaskStatus::Accepted));
}

// ==================== Assignment ====================

#[tokio::test]
async fn approve_without_employees_is_a_validation_error() {
    let shop = TestShop::new();
    shop.repo
        .insert_project(project(9, ProjectStatus::Created, vec![], None));

    let err = shop.projects().approve(9).await.unwrap_err();

    assert_matches!(
        err,
        ServiceError::ValidationError(msg) if msg == "at least one employee must be assigned"
    );
    assert_eq!(shop.repo.write_count(), 0);
    assert_eq!(
        shop.projects().get(9).await.unwrap().status,
        ProjectStatus::Created
    );
}

#[tokio::test]
async fn several_employees_without_main_representative_require_a_choice() {
    let shop = TestShop::new();
    shop.repo
        .insert_project(project(9, ProjectStatus::Created, vec![3, 7], None));

    let resolution =
        EmployeeAssignmentResolver::resolve_main_representative(&[3, 7], None, None).unwrap();
    assert_eq!(
        resolution,
        Resolution::RequiresChoice {
            candidates: vec![3, 7],
            suggested: 3
        }
    );

    let err = shop
        .projects()
        .assign_employees(9, &[3, 7], None)
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_matches!(
        err,
        ServiceError::MainRepresentativeRequired { candidates, suggested: 3 }
            if candidates == vec![3, 7]
    );
    assert_eq!(shop.repo.write_count(), 0);
}

#[tokio::test]
async fn assignment_stores_employees_and_main_representative_together() {
    let mut shop = TestShop::new();
    shop.repo
        .insert_project(project(9, ProjectStatus::Created, vec![], None));

    let updated = shop
        .projects()
        .assign_employees(9, &[3, 7, 3], Some(7))
        .await
        .unwrap();

    assert_eq!(updated.assigned_employee_ids, vec![3, 7]);
    assert_eq!(updated.main_representative_employee_id, Some(7));
    assert_eq!(shop.repo.write_count(), 1);
    assert_eq!(
        shop.drain_events(),
        vec![WorkflowEvent::ProjectEmployeesAssigned {
            project_id: 9,
            employee_ids: vec![3, 7],
            main_representative: 7,
        }]
    );

    let approved = shop.projects().approve(9).await.unwrap();
    assert_eq!(approved.status, ProjectStatus::InProgress);
}

#[tokio::test]
async fn previous_main_representative_is_kept_when_still_selected() {
    let shop = TestShop::new();
    shop.repo
        .insert_project(project(9, ProjectStatus::InProgress, vec![3, 7], Some(7)));

    let updated = shop
        .projects()
        .assign_employees(9, &[7, 8], None)
        .await
        .unwrap();

    assert_eq!(updated.assigned_employee_ids, vec![7, 8]);
    assert_eq!(updated.main_representative_employee_id, Some(7));
}

#[tokio::test]
async fn single_employee_becomes_main_representative() {
    let shop = TestShop::new();
    shop.repo
        .insert_project(project(9, ProjectStatus::Created, vec![], None));

    let updated = shop
        .projects()
        .assign_employees(9, &[4], Some(99))
        .await
        .unwrap();

    assert_eq!(updated.main_representative_employee_id, Some(4));
}

#[tokio::test]
async fn closed_projects_cannot_be_restaffed() {
    let shop = TestShop::new();
    shop.repo
        .insert_project(project(9, ProjectStatus::Cancelled, vec![3], Some(3)));

    let err = shop
        .projects()
        .assign_employees(9, &[4], None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStateError(_));
}

// ==================== Status transitions ====================

#[tokio::test]
async fn recommend_then_confirm() {
    let shop = TestShop::new();
    shop.repo
        .insert_project(project(9, ProjectStatus::Created, vec![], None));
    let workflow = shop.projects();

    assert_eq!(
        workflow.recommend(9).await.unwrap().status,
        ProjectStatus::Recommended
    );
    assert_eq!(
        workflow.confirm(9).await.unwrap().status,
        ProjectStatus::Confirmed
    );
    assert_matches!(
        workflow.recommend(9).await.unwrap_err(),
        ServiceError::InvalidStateError(_)
    );
}

#[tokio::test]
async fn project_with_accepted_service_cannot_be_cancelled() {
    let shop = TestShop::new();
    seed_tasks(&shop, TaskStatus::Accepted, TaskStatus::Pending);
    shop.repo
        .insert_project(project(9, ProjectStatus::Confirmed, vec![3], Some(3)));

    let err = shop.projects().reject(9).await.unwrap_err();

    assert_eq!(err.to_string(), "Invalid state: services already accepted");
    assert_eq!(shop.repo.write_count(), 0);
    assert_eq!(
        shop.projects().get(9).await.unwrap().status,
        ProjectStatus::Confirmed
    );
}

#[tokio::test]
async fn project_without_accepted_services_is_cancelled() {
    let shop = TestShop::new();
    // Task 3 is accepted but belongs to another project.
    seed_tasks(&shop, TaskStatus::Pending, TaskStatus::Cancelled);
    shop.repo
        .insert_project(project(9, ProjectStatus::Recommended, vec![], None));

    let cancelled = shop.projects().reject(9).await.unwrap();
    assert_eq!(cancelled.status, ProjectStatus::Cancelled);
}

#[tokio::test]
async fn pending_lists_new_or_unassigned_projects() {
    let shop = TestShop::new();
    shop.repo
        .insert_project(project(1, ProjectStatus::Created, vec![3], Some(3)));
    shop.repo
        .insert_project(project(2, ProjectStatus::Confirmed, vec![], None));
    shop.repo
        .insert_project(project(3, ProjectStatus::InProgress, vec![3], Some(3)));

    let ids: Vec<_> = shop
        .projects()
        .pending()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

// ==================== Updates and completion ====================

#[tokio::test]
async fn main_representative_posts_progress() {
    let mut shop = TestShop::new();
    shop.repo
        .insert_project(project(9, ProjectStatus::InProgress, vec![3, 7], Some(7)));

    let draft = ProjectUpdateDraft::new(7, UpdateType::Progress, "Pads replaced")
        .with_task_progress(vec![
            TaskProgress {
                task_id: 1,
                completed: true,
                percentage: 100,
            },
            TaskProgress {
                task_id: 2,
                completed: false,
                percentage: 50,
            },
        ]);
    let update = shop.projects().post_update(9, draft).await.unwrap();

    assert_eq!(update.overall_percentage, 75.0);
    assert_eq!(update.project_id, 9);
    assert_eq!(shop.projects().updates(9).await.unwrap(), vec![update.clone()]);
    assert_eq!(
        shop.drain_events(),
        vec![WorkflowEvent::ProjectUpdatePosted {
            project_id: 9,
            update_id: update.id
        }]
    );
    assert_eq!(
        shop.projects().get(9).await.unwrap().status,
        ProjectStatus::InProgress
    );
}

#[tokio::test]
async fn other_assigned_employees_cannot_post_updates() {
    let shop = TestShop::new();
    shop.repo
        .insert_project(project(9, ProjectStatus::InProgress, vec![3, 7], Some(7)));

    let draft = ProjectUpdateDraft::new(3, UpdateType::Delay, "Waiting for parts");
    let err = shop.projects().post_update(9, draft).await.unwrap_err();

    assert_matches!(err, ServiceError::AuthorizationError(_));
    assert_eq!(shop.repo.write_count(), 0);
}

#[tokio::test]
async fn cost_change_needs_a_reason() {
    let shop = TestShop::new();
    shop.repo
        .insert_project(project(9, ProjectStatus::InProgress, vec![7], Some(7)));

    let draft = ProjectUpdateDraft::new(7, UpdateType::CostChange, "Rotor cracked")
        .with_additional_cost(dec!(80), "");
    let err = shop.projects().post_update(9, draft).await.unwrap_err();
    assert!(err.is_validation());

    let draft = ProjectUpdateDraft::new(7, UpdateType::CostChange, "Rotor cracked")
        .with_additional_cost(dec!(80), "Replacement rotor");
    let update = shop.projects().post_update(9, draft).await.unwrap();
    assert_eq!(update.additional_cost, Some(dec!(80)));
}

#[tokio::test]
async fn mark_completed_records_update_and_status_in_one_request() {
    let mut shop = TestShop::new();
    shop.repo
        .insert_project(project(9, ProjectStatus::InProgress, vec![7], Some(7)));

    let update = shop
        .projects()
        .mark_completed(9, 7, "All services done")
        .await
        .unwrap();

    assert_eq!(update.update_type, UpdateType::Completion);
    assert_eq!(update.overall_percentage, 100.0);
    assert!(update.task_progress.iter().all(|p| p.completed));
    assert_eq!(shop.repo.write_count(), 1);
    assert_eq!(
        shop.projects().get(9).await.unwrap().status,
        ProjectStatus::Completed
    );
    assert_eq!(
        shop.drain_events(),
        vec![
            WorkflowEvent::ProjectStatusChanged {
                project_id: 9,
                old_status: ProjectStatus::InProgress,
                new_status: ProjectStatus::Completed,
            },
            WorkflowEvent::ProjectUpdatePosted {
                project_id: 9,
                update_id: update.id
            },
        ]
    );

    let draft = ProjectUpdateDraft::new(7, UpdateType::General, "One more thing");
    let err = shop.projects().post_update(9, draft).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidStateError(_));
}

#[tokio::test]
async fn completion_before_work_starts_is_refused() {
    let shop = TestShop::new();
    shop.repo
        .insert_project(project(9, ProjectStatus::Confirmed, vec![7], Some(7)));

    let err = shop
        .projects()
        .mark_completed(9, 7, "Done")
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InvalidStateError(_));
    assert_eq!(shop.repo.write_count(), 0);
    assert!(shop.projects().updates(9).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_completion_changes_nothing() {
    let shop = TestShop::new();
    shop.repo
        .insert_project(project(9, ProjectStatus::InProgress, vec![7], Some(7)));
    shop.repo
        .fail_next_write(ServiceError::transport("HTTP 500", Some(500)));

    assert!(shop.projects().mark_completed(9, 7, "Done").await.is_err());

    assert_eq!(
        shop.projects().get(9).await.unwrap().status,
        ProjectStatus::InProgress
    );
    assert!(shop.projects().updates(9).await.unwrap().is_empty());
}

// ==================== Reports ====================

#[tokio::test]
async fn submitted_report_is_readable_from_the_project() {
    let mut shop = TestShop::new();
    seed_tasks(&shop, TaskStatus::Completed, TaskStatus::Completed);
    shop.repo.insert_employee(employee(7, "Ana", "Silva"));
    shop.repo
        .insert_project(project(9, ProjectStatus::Completed, vec![3, 7], Some(7)));
    let workflow = shop.projects();
    let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();

    let report = workflow
        .draft_report(
            9,
            7,
            &[1, 2],
            &[
                ExtraCharge::new("part", dec!(20)),
                ExtraCharge::new("", dec!(5)),
            ],
            Some("Rotors within spec."),
            date,
        )
        .await
        .unwrap();
    assert_eq!(report.submitted_by, "Ana Silva");
    assert_eq!(report.services_cost, dec!(150));
    assert_eq!(report.extra_charges_total, dec!(20));
    assert_eq!(report.total_cost(), dec!(170));
    assert_eq!(report.total_hours, dec!(3));

    let updated = workflow.submit_report(9, 7, &report).await.unwrap();
    assert!(updated
        .description
        .starts_with("Replace pads and rotors on the front axle.\n\n"));
    assert_eq!(updated.report(), Some(report.clone()));
    assert_eq!(
        shop.drain_events(),
        vec![WorkflowEvent::ProjectReportSubmitted {
            project_id: 9,
            employee_id: 7
        }]
    );

    // A second submission replaces the first block.
    let revised = workflow
        .draft_report(9, 3, &[1], &[], None, date)
        .await
        .unwrap();
    let updated = workflow.submit_report(9, 3, &revised).await.unwrap();
    assert_eq!(updated.description.matches(REPORT_DELIMITER).count(), 1);
    assert_eq!(updated.report(), Some(revised));
}

#[tokio::test]
async fn unassigned_employee_cannot_submit_report() {
    let shop = TestShop::new();
    seed_tasks(&shop, TaskStatus::Completed, TaskStatus::Completed);
    shop.repo
        .insert_project(project(9, ProjectStatus::Completed, vec![7], Some(7)));
    let workflow = shop.projects();

    let report = workflow
        .draft_report(
            9,
            4,
            &[1],
            &[],
            None,
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(report.submitted_by, "Unknown employee");

    let err = workflow.submit_report(9, 4, &report).await.unwrap_err();
    assert_matches!(err, ServiceError::AuthorizationError(_));
    assert_eq!(shop.repo.write_count(), 0);
}

#[tokio::test]
async fn report_rejects_services_outside_the_project() {
    let shop = TestShop::new();
    seed_tasks(&shop, TaskStatus::Completed, TaskStatus::Completed);
    shop.repo
        .insert_project(project(9, ProjectStatus::Completed, vec![7], Some(7)));

    let err = shop
        .projects()
        .draft_report(
            9,
            7,
            &[1, 3],
            &[],
            None,
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        )
        .await
        .unwrap_err();
    assert!(err.is_validation());
}
