//! Completion reports.
//!
//! A report is stored inside the project description as a block of labeled
//! lines after [`REPORT_DELIMITER`]. Customer views read it back with
//! [`parse_report`], so the labels and the bullet prefix are part of the
//! service contract and must not change.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{ServiceError, WorkflowResult};
use crate::models::{Task, TaskId};

pub const REPORT_DELIMITER: &str = "--- Project Report ---";

const SUBMITTED_BY: &str = "Submitted by:";
const DATE: &str = "Date:";
const COMPLETED_SERVICES: &str = "Completed Services:";
const SERVICES_COST: &str = "Services Cost:";
const TOTAL_HOURS: &str = "Total Hours:";
const EXTRA_CHARGES_TOTAL: &str = "Extra Charges Total:";
const EXTRA_CHARGES_DETAILS: &str = "Extra Charges Details:";
const NOTES: &str = "Notes:";
const BULLET: &str = "- ";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// An ad hoc cost line added when the report is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraCharge {
    pub description: String,
    pub amount: Decimal,
}

impl ExtraCharge {
    pub fn new(description: impl Into<String>, amount: Decimal) -> Self {
        Self {
            description: description.into(),
            amount,
        }
    }

    /// Charges without a description or with a non-positive amount are
    /// ignored rather than rejected.
    pub fn counts(&self) -> bool {
        !self.description.trim().is_empty() && self.amount > Decimal::ZERO
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectReport {
    pub submitted_by: String,
    pub date: NaiveDate,
    pub completed_services: Vec<String>,
    pub services_cost: Decimal,
    pub total_hours: Decimal,
    pub extra_charges_total: Decimal,
    pub extra_charges: Vec<ExtraCharge>,
    pub notes: Option<String>,
}

impl ProjectReport {
    pub fn total_cost(&self) -> Decimal {
        self.services_cost + self.extra_charges_total
    }

    /// Renders the report block, delimiter first.
    pub fn render(&self) -> String {
        let mut lines = vec![
            REPORT_DELIMITER.to_string(),
            labeled(SUBMITTED_BY, &self.submitted_by),
            labeled(DATE, &self.date.format(DATE_FORMAT).to_string()),
            labeled(COMPLETED_SERVICES, &join_services(&self.completed_services)),
            labeled(SERVICES_COST, &self.services_cost.to_string()),
            labeled(TOTAL_HOURS, &self.total_hours.to_string()),
            labeled(EXTRA_CHARGES_TOTAL, &self.extra_charges_total.to_string()),
            EXTRA_CHARGES_DETAILS.to_string(),
        ];
        lines.extend(
            self.extra_charges
                .iter()
                .map(|c| format!("{}{}: {}", BULLET, c.description, c.amount)),
        );
        lines.push(match &self.notes {
            Some(notes) => labeled(NOTES, notes),
            None => NOTES.to_string(),
        });
        lines.join("\n")
    }

    /// Returns `description` with this report appended. An earlier report
    /// block in the description is replaced.
    pub fn append_to(&self, description: &str) -> String {
        let (prose, _) = split_description(description);
        let prose = prose.trim_end();
        if prose.is_empty() {
            self.render()
        } else {
            format!("{}\n\n{}", prose, self.render())
        }
    }
}

/// Collects the figures for a completion report.
#[derive(Debug, Clone)]
pub struct ProjectReportBuilder {
    submitted_by: String,
    date: NaiveDate,
}

impl ProjectReportBuilder {
    pub fn new(submitted_by: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            submitted_by: single_line(&submitted_by.into()),
            date,
        }
    }

    pub fn build(
        &self,
        selected_task_ids: &[TaskId],
        all_tasks: &[Task],
        extra_charges: &[ExtraCharge],
        notes: Option<&str>,
    ) -> WorkflowResult<ProjectReport> {
        if selected_task_ids.is_empty() {
            return Err(ServiceError::validation(
                "select at least one completed service",
            ));
        }

        let mut seen = Vec::with_capacity(selected_task_ids.len());
        let mut selected = Vec::with_capacity(selected_task_ids.len());
        for id in selected_task_ids {
            if seen.contains(id) {
                continue;
            }
            seen.push(*id);
            let task = all_tasks
                .iter()
                .find(|t| t.id == *id)
                .ok_or_else(|| ServiceError::validation(format!("unknown service {}", id)))?;
            selected.push(task);
        }

        let services_cost: Decimal = selected.iter().map(|t| t.estimated_cost).sum();
        let total_hours: Decimal = selected.iter().map(|t| t.estimated_hours).sum();

        let extra_charges: Vec<ExtraCharge> = extra_charges
            .iter()
            .filter(|c| c.counts())
            .map(|c| ExtraCharge::new(single_line(&c.description), c.amount))
            .collect();
        let extra_charges_total: Decimal = extra_charges.iter().map(|c| c.amount).sum();

        Ok(ProjectReport {
            submitted_by: self.submitted_by.clone(),
            date: self.date,
            completed_services: selected.iter().map(|t| single_line(&t.name)).collect(),
            services_cost,
            total_hours,
            extra_charges_total,
            extra_charges,
            notes: notes.map(normalize_notes).filter(|n| !n.is_empty()),
        })
    }
}

/// Splits a description into the prose and the embedded report, if any.
pub fn split_description(description: &str) -> (&str, Option<ProjectReport>) {
    match description.find(REPORT_DELIMITER) {
        Some(idx) => (&description[..idx], parse_report(&description[idx..])),
        None => (description, None),
    }
}

/// Parses a report block. Text before the delimiter is ignored; `None` is
/// returned when there is no delimiter or a required figure is unreadable.
pub fn parse_report(text: &str) -> Option<ProjectReport> {
    let start = text.find(REPORT_DELIMITER)?;
    let body = &text[start + REPORT_DELIMITER.len()..];

    let mut submitted_by = String::new();
    let mut date = None;
    let mut completed_services = Vec::new();
    let mut services_cost = Decimal::ZERO;
    let mut total_hours = Decimal::ZERO;
    let mut extra_charges_total = Decimal::ZERO;
    let mut extra_charges = Vec::new();
    let mut notes = None;
    let mut in_details = false;

    let mut lines = body.lines();
    while let Some(line) = lines.next() {
        if let Some(value) = value_of(line, NOTES) {
            let mut text = value.to_string();
            for rest in lines.by_ref() {
                text.push('\n');
                text.push_str(rest);
            }
            notes = Some(text).filter(|n| !n.is_empty());
            break;
        }
        if in_details {
            if let Some(item) = line.strip_prefix(BULLET) {
                let (description, amount) = item.rsplit_once(": ")?;
                extra_charges.push(ExtraCharge::new(
                    description,
                    Decimal::from_str(amount.trim()).ok()?,
                ));
                continue;
            }
            in_details = false;
        }
        if let Some(value) = value_of(line, SUBMITTED_BY) {
            submitted_by = value.to_string();
        } else if let Some(value) = value_of(line, DATE) {
            date = NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok();
        } else if let Some(value) = value_of(line, COMPLETED_SERVICES) {
            completed_services = split_services(value);
        } else if let Some(value) = value_of(line, SERVICES_COST) {
            services_cost = Decimal::from_str(value.trim()).ok()?;
        } else if let Some(value) = value_of(line, TOTAL_HOURS) {
            total_hours = Decimal::from_str(value.trim()).ok()?;
        } else if let Some(value) = value_of(line, EXTRA_CHARGES_TOTAL) {
            extra_charges_total = Decimal::from_str(value.trim()).ok()?;
        } else if line.trim_end() == EXTRA_CHARGES_DETAILS {
            in_details = true;
        }
    }

    Some(ProjectReport {
        submitted_by,
        date: date?,
        completed_services,
        services_cost,
        total_hours,
        extra_charges_total,
        extra_charges,
        notes,
    })
}

fn labeled(label: &str, value: &str) -> String {
    format!("{} {}", label, value)
}

/// Value after `label`, without the single separating space.
fn value_of<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(label)?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Service names are comma separated; commas and backslashes inside a name
/// are backslash-escaped so a name like "Oil, filter" stays one service.
fn join_services(names: &[String]) -> String {
    names
        .iter()
        .map(|name| name.replace('\\', "\\\\").replace(',', "\\,"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn split_services(value: &str) -> Vec<String> {
    let mut services = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ',' => {
                services.push(std::mem::take(&mut current));
                if chars.peek() == Some(&' ') {
                    chars.next();
                }
            }
            _ => current.push(c),
        }
    }
    services.push(current);
    services.retain(|s| !s.is_empty());
    services
}

fn single_line(value: &str) -> String {
    value
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_notes(notes: &str) -> String {
    notes.replace("\r\n", "\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskPriority, TaskStatus};
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn task(id: TaskId, name: &str, cost: Decimal, hours: Decimal) -> Task {
        Task {
            id,
            name: name.into(),
            description: String::new(),
            estimated_hours: hours,
            estimated_cost: cost,
            category: "Brakes".into(),
            priority: TaskPriority::Medium,
            status: TaskStatus::Completed,
            appointment_id: None,
            notes: None,
        }
    }

    fn builder() -> ProjectReportBuilder {
        ProjectReportBuilder::new(
            "Ana Silva",
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        )
    }

    #[test]
    fn totals_follow_selected_tasks_and_valid_charges() {
        let tasks = vec![
            task(1, "Brake pads", dec!(100), dec!(2)),
            task(2, "Fluid flush", dec!(50), dec!(1)),
            task(3, "Alignment", dec!(80), dec!(1.5)),
        ];
        let charges = vec![
            ExtraCharge::new("part", dec!(20)),
            ExtraCharge::new("", dec!(5)),
        ];
        let report = builder().build(&[1, 2], &tasks, &charges, None).unwrap();
        assert_eq!(report.services_cost, dec!(150));
        assert_eq!(report.extra_charges_total, dec!(20));
        assert_eq!(report.total_cost(), dec!(170));
        assert_eq!(report.total_hours, dec!(3));
        assert_eq!(report.extra_charges, vec![ExtraCharge::new("part", dec!(20))]);
    }

    #[test]
    fn empty_selection_is_rejected() {
        let err = builder().build(&[], &[], &[], None).unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));
    }

    #[test]
    fn unknown_task_is_rejected() {
        let tasks = vec![task(1, "Brake pads", dec!(100), dec!(2))];
        let err = builder().build(&[1, 4], &tasks, &[], None).unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains('4'));
    }

    #[test]
    fn render_matches_protocol() {
        let tasks = vec![
            task(1, "Brake pads", dec!(100), dec!(2)),
            task(2, "Fluid flush", dec!(50), dec!(1)),
        ];
        let charges = vec![
            ExtraCharge::new("part", dec!(20)),
            ExtraCharge::new("rag", dec!(0)),
        ];
        let report = builder()
            .build(&[1, 2], &tasks, &charges, Some("Rotors within spec.\nCheck again at 10k"))
            .unwrap();
        assert_eq!(
            report.render(),
            "--- Project Report ---\n\
             Submitted by: Ana Silva\n\
             Date: 2026-10-18\n\
             Completed Services: Brake pads, Fluid flush\n\
             Services Cost: 150\n\
             Total Hours: 3\n\
             Extra Charges Total: 20\n\
             Extra Charges Details:\n\
             - part: 20\n\
             Notes: Rotors within spec.\nCheck again at 10k"
        );
    }

    #[test]
    fn parse_recovers_rendered_report() {
        let tasks = vec![task(1, "Brake pads", dec!(99.95), dec!(1.25))];
        let charges = vec![
            ExtraCharge::new("shop: supplies", dec!(4.50)),
            ExtraCharge::new("disposal", dec!(3)),
        ];
        let report = builder()
            .build(&[1], &tasks, &charges, Some("  all good  "))
            .unwrap();
        let parsed = parse_report(&report.render()).unwrap();
        assert_eq!(parsed, report);
        assert_eq!(parsed.notes.as_deref(), Some("all good"));
        assert_eq!(parsed.extra_charges[0].description, "shop: supplies");
    }

    #[test]
    fn service_names_with_commas_stay_whole() {
        let tasks = vec![
            task(1, "Oil, filter", dec!(60), dec!(1)),
            task(2, r"Wipers \ washers", dec!(15), dec!(0.25)),
            task(3, "Alignment", dec!(80), dec!(1.5)),
        ];
        let report = builder().build(&[1, 2, 3], &tasks, &[], None).unwrap();

        let rendered = report.render();
        assert!(rendered
            .contains(r"Completed Services: Oil\, filter, Wipers \\ washers, Alignment"));

        let parsed = parse_report(&rendered).unwrap();
        assert_eq!(
            parsed.completed_services,
            vec!["Oil, filter", r"Wipers \ washers", "Alignment"]
        );
        assert_eq!(parsed, report);
    }

    #[test]
    fn report_without_notes_or_charges_round_trips() {
        let tasks = vec![task(1, "Oil change", dec!(45), dec!(0.5))];
        let report = builder().build(&[1], &tasks, &[], Some("   ")).unwrap();
        assert_eq!(report.notes, None);
        assert_eq!(parse_report(&report.render()), Some(report));
    }

    #[test]
    fn append_replaces_previous_report() {
        let tasks = vec![task(1, "Oil change", dec!(45), dec!(0.5))];
        let first = builder().build(&[1], &tasks, &[], Some("first")).unwrap();
        let second = builder().build(&[1], &tasks, &[], Some("second")).unwrap();

        let once = first.append_to("Customer wants synthetic oil.");
        let twice = second.append_to(&once);
        assert_eq!(twice.matches(REPORT_DELIMITER).count(), 1);

        let (prose, parsed) = split_description(&twice);
        assert_eq!(prose.trim_end(), "Customer wants synthetic oil.");
        assert_eq!(parsed.unwrap().notes.as_deref(), Some("second"));
    }

    #[test]
    fn description_without_report() {
        let (prose, parsed) = split_description("Just prose");
        assert_eq!(prose, "Just prose");
        assert!(parsed.is_none());
        assert!(parse_report("Services Cost: 10").is_none());
    }

    #[test]
    fn unreadable_figures_are_rejected() {
        let text = "--- Project Report ---\nDate: 2026-10-18\nServices Cost: lots\nNotes:";
        assert!(parse_report(text).is_none());
    }
}
