use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use garageflow::{
    auth::{StaticToken, TokenProvider},
    config::{self, AppConfig},
    events::EventSender,
    models::{
        people::customer_label, Appointment, EmployeeId, Project, ProjectUpdate,
        ProjectUpdateDraft, TaskProgress, TimeLogDraft, UpdateType,
    },
    reports::ExtraCharge,
    repositories::{HttpWorkshopRepository, WorkshopRepository},
    services::{AppointmentWorkflow, ProjectWorkflow, TimeLogService},
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize()?;

    match cli.command {
        Commands::Appointments(command) => {
            handle_appointments_command(&context, command, cli.json).await?
        }
        Commands::Projects(command) => handle_projects_command(&context, command, cli.json).await?,
        Commands::TimeLogs(command) => handle_time_logs_command(&context, command, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "garageflow",
    about = "Appointment and project workflows for the service shop",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(subcommand)]
    Appointments(AppointmentsCommands),
    #[command(subcommand)]
    Projects(ProjectsCommands),
    #[command(subcommand)]
    TimeLogs(TimeLogsCommands),
}

#[derive(Subcommand)]
enum AppointmentsCommands {
    List,
    Get(IdArgs),
    Assign(AssignAppointmentArgs),
    Approve(IdArgs),
    Reject(RejectAppointmentArgs),
    Start(IdArgs),
    Complete(CompleteAppointmentArgs),
}

#[derive(Subcommand)]
enum ProjectsCommands {
    List(ListProjectsArgs),
    Get(IdArgs),
    Assign(AssignProjectArgs),
    Approve(IdArgs),
    Reject(IdArgs),
    Recommend(IdArgs),
    Confirm(IdArgs),
    Update(PostUpdateArgs),
    Complete(CompleteProjectArgs),
    Report(SubmitReportArgs),
    Updates(IdArgs),
}

#[derive(Subcommand)]
enum TimeLogsCommands {
    Record(RecordTimeArgs),
    List(EmployeeArgs),
}

#[derive(Args)]
struct IdArgs {
    #[arg(long, help = "Identifier of the record")]
    id: i64,
}

#[derive(Args)]
struct EmployeeArgs {
    #[arg(long, help = "Employee identifier")]
    employee: EmployeeId,
}

#[derive(Args)]
struct AssignAppointmentArgs {
    #[arg(long, help = "Appointment identifier")]
    id: i64,
    #[arg(long, help = "Employee to assign")]
    employee: EmployeeId,
}

#[derive(Args)]
struct RejectAppointmentArgs {
    #[arg(long, help = "Appointment identifier")]
    id: i64,
    #[arg(long, help = "Reason recorded in the appointment notes")]
    reason: String,
}

#[derive(Args)]
struct CompleteAppointmentArgs {
    #[arg(long, help = "Appointment identifier")]
    id: i64,
    #[arg(long, help = "Technician report shown to the customer")]
    report: String,
}

#[derive(Args)]
struct ListProjectsArgs {
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Only projects that are new or have nobody assigned"
    )]
    pending: bool,
}

#[derive(Args)]
struct AssignProjectArgs {
    #[arg(long, help = "Project identifier")]
    id: i64,
    #[arg(long, value_delimiter = ',', required = true, help = "Comma-separated employee ids")]
    employees: Vec<EmployeeId>,
    #[arg(long, help = "Main representative; required when several employees are selected")]
    main: Option<EmployeeId>,
}

#[derive(Args)]
struct PostUpdateArgs {
    #[arg(long, help = "Project identifier")]
    id: i64,
    #[arg(long, help = "Employee posting the update (must be the main representative)")]
    employee: EmployeeId,
    #[arg(
        long = "type",
        default_value = "PROGRESS",
        help = "PROGRESS, COST_CHANGE, DELAY, COMPLETION or GENERAL"
    )]
    update_type: UpdateType,
    #[arg(long, help = "Update message")]
    message: String,
    #[arg(
        long = "task",
        value_parser = parse_task_progress,
        help = "Task progress as TASK_ID=PERCENT; repeatable"
    )]
    tasks: Vec<TaskProgress>,
    #[arg(long, requires = "cost_reason", help = "Additional cost")]
    cost: Option<Decimal>,
    #[arg(long, help = "Reason for the additional cost")]
    cost_reason: Option<String>,
    #[arg(long, help = "Estimated completion date (YYYY-MM-DD)")]
    eta: Option<NaiveDate>,
}

#[derive(Args)]
struct CompleteProjectArgs {
    #[arg(long, help = "Project identifier")]
    id: i64,
    #[arg(long, help = "Main representative completing the project")]
    employee: EmployeeId,
    #[arg(long, help = "Completion message")]
    message: String,
}

#[derive(Args)]
struct SubmitReportArgs {
    #[arg(long, help = "Project identifier")]
    id: i64,
    #[arg(long, help = "Assigned employee submitting the report")]
    employee: EmployeeId,
    #[arg(
        long,
        value_delimiter = ',',
        required = true,
        help = "Comma-separated completed task ids"
    )]
    services: Vec<i64>,
    #[arg(
        long = "charge",
        value_parser = parse_extra_charge,
        help = "Extra charge as DESCRIPTION=AMOUNT; repeatable"
    )]
    charges: Vec<ExtraCharge>,
    #[arg(long, help = "Free-form notes")]
    notes: Option<String>,
    #[arg(long, help = "Report date (YYYY-MM-DD); defaults to today")]
    date: Option<NaiveDate>,
}

#[derive(Args)]
struct RecordTimeArgs {
    #[arg(long, help = "Employee who did the work")]
    employee: EmployeeId,
    #[arg(long, help = "What was done")]
    description: String,
    #[arg(long, help = "Start time (RFC 3339)")]
    start: DateTime<Utc>,
    #[arg(long, help = "End time (RFC 3339)")]
    end: DateTime<Utc>,
    #[arg(long, help = "Related task")]
    task: Option<i64>,
    #[arg(long, help = "Related project")]
    project: Option<i64>,
    #[arg(long, help = "Related appointment")]
    appointment: Option<i64>,
}

fn parse_task_progress(raw: &str) -> Result<TaskProgress, String> {
    let (task, percent) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected TASK_ID=PERCENT, got '{}'", raw))?;
    let task_id = task
        .trim()
        .parse()
        .map_err(|_| format!("invalid task id '{}'", task))?;
    let percentage: u8 = percent
        .trim()
        .parse()
        .map_err(|_| format!("invalid percentage '{}'", percent))?;
    Ok(TaskProgress {
        task_id,
        completed: percentage == 100,
        percentage,
    })
}

fn parse_extra_charge(raw: &str) -> Result<ExtraCharge, String> {
    let (description, amount) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected DESCRIPTION=AMOUNT, got '{}'", raw))?;
    let amount: Decimal = amount
        .trim()
        .parse()
        .map_err(|_| format!("invalid amount '{}'", amount))?;
    Ok(ExtraCharge::new(description.trim(), amount))
}

struct CliContext {
    repo: Arc<dyn WorkshopRepository>,
    event_sender: EventSender,
}

impl CliContext {
    fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(&config.log_level, config.log_json);

        let repo = build_repository(&config)?;

        let (event_sender, mut event_rx) = EventSender::channel(config.event_channel_capacity);
        tokio::spawn(async move {
            while let Some(envelope) = event_rx.recv().await {
                debug!(target: "garageflow_cli", event = ?envelope.event, "workflow event");
            }
        });

        Ok(Self { repo, event_sender })
    }

    fn appointments(&self) -> AppointmentWorkflow {
        AppointmentWorkflow::new(self.repo.clone()).with_events(self.event_sender.clone())
    }

    fn projects(&self) -> ProjectWorkflow {
        ProjectWorkflow::new(self.repo.clone()).with_events(self.event_sender.clone())
    }

    fn time_logs(&self) -> TimeLogService {
        TimeLogService::new(self.repo.clone())
    }
}

fn build_repository(config: &AppConfig) -> Result<Arc<dyn WorkshopRepository>> {
    let token: Arc<dyn TokenProvider> =
        Arc::new(StaticToken::new(config.api_token.clone().unwrap_or_default()));
    let repo = HttpWorkshopRepository::from_config(config, token)
        .context("failed to configure shop service client")?;
    Ok(Arc::new(repo))
}

async fn handle_appointments_command(
    context: &CliContext,
    command: AppointmentsCommands,
    json: bool,
) -> Result<()> {
    let workflow = context.appointments();
    let appointment = match command {
        AppointmentsCommands::List => {
            let appointments = workflow.list().await.context("failed to list appointments")?;
            if json {
                return print_json(&appointments);
            }
            let customers = context.repo.list_customers().await.unwrap_or_default();
            if appointments.is_empty() {
                println!("No appointments found");
            }
            for appointment in &appointments {
                let customer = customers.iter().find(|c| c.id == appointment.customer_id);
                println!(
                    "- Appointment {} • {} • {} • {} • {}",
                    appointment.id,
                    appointment.date,
                    appointment.consultation_type,
                    customer_label(customer, appointment.customer_id),
                    appointment.status
                );
            }
            return Ok(());
        }
        AppointmentsCommands::Get(args) => workflow
            .get(args.id)
            .await
            .with_context(|| format!("failed to load appointment {}", args.id))?,
        AppointmentsCommands::Assign(args) => workflow
            .assign_employee(args.id, args.employee)
            .await
            .with_context(|| format!("failed to assign appointment {}", args.id))?,
        AppointmentsCommands::Approve(args) => workflow
            .approve(args.id)
            .await
            .with_context(|| format!("failed to approve appointment {}", args.id))?,
        AppointmentsCommands::Reject(args) => workflow
            .reject(args.id, &args.reason)
            .await
            .with_context(|| format!("failed to reject appointment {}", args.id))?,
        AppointmentsCommands::Start(args) => workflow
            .start(args.id)
            .await
            .with_context(|| format!("failed to start appointment {}", args.id))?,
        AppointmentsCommands::Complete(args) => workflow
            .complete(args.id, &args.report)
            .await
            .with_context(|| format!("failed to complete appointment {}", args.id))?,
    };

    if json {
        print_json(&appointment)
    } else {
        render_appointment(&appointment);
        Ok(())
    }
}

async fn handle_projects_command(
    context: &CliContext,
    command: ProjectsCommands,
    json: bool,
) -> Result<()> {
    let workflow = context.projects();
    let project = match command {
        ProjectsCommands::List(args) => {
            let projects = if args.pending {
                workflow.pending().await
            } else {
                workflow.list().await
            }
            .context("failed to list projects")?;
            if json {
                return print_json(&projects);
            }
            if projects.is_empty() {
                println!("No projects found");
            }
            projects.iter().for_each(render_project);
            return Ok(());
        }
        ProjectsCommands::Get(args) => workflow
            .get(args.id)
            .await
            .with_context(|| format!("failed to load project {}", args.id))?,
        ProjectsCommands::Assign(args) => workflow
            .assign_employees(args.id, &args.employees, args.main)
            .await
            .with_context(|| format!("failed to assign project {}", args.id))?,
        ProjectsCommands::Approve(args) => workflow
            .approve(args.id)
            .await
            .with_context(|| format!("failed to approve project {}", args.id))?,
        ProjectsCommands::Reject(args) => workflow
            .reject(args.id)
            .await
            .with_context(|| format!("failed to reject project {}", args.id))?,
        ProjectsCommands::Recommend(args) => workflow
            .recommend(args.id)
            .await
            .with_context(|| format!("failed to recommend project {}", args.id))?,
        ProjectsCommands::Confirm(args) => workflow
            .confirm(args.id)
            .await
            .with_context(|| format!("failed to confirm project {}", args.id))?,
        ProjectsCommands::Update(args) => {
            let mut draft = ProjectUpdateDraft::new(args.employee, args.update_type, args.message)
                .with_task_progress(args.tasks);
            if let (Some(cost), Some(reason)) = (args.cost, args.cost_reason) {
                draft = draft.with_additional_cost(cost, reason);
            }
            if let Some(eta) = args.eta {
                draft = draft.with_estimated_completion(eta);
            }
            let update = workflow
                .post_update(args.id, draft)
                .await
                .with_context(|| format!("failed to post update on project {}", args.id))?;
            return render_update_result(&update, json);
        }
        ProjectsCommands::Complete(args) => {
            let update = workflow
                .mark_completed(args.id, args.employee, &args.message)
                .await
                .with_context(|| format!("failed to complete project {}", args.id))?;
            return render_update_result(&update, json);
        }
        ProjectsCommands::Report(args) => {
            let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
            let report = workflow
                .draft_report(
                    args.id,
                    args.employee,
                    &args.services,
                    &args.charges,
                    args.notes.as_deref(),
                    date,
                )
                .await
                .context("failed to build project report")?;
            let project = workflow
                .submit_report(args.id, args.employee, &report)
                .await
                .with_context(|| format!("failed to submit report for project {}", args.id))?;
            if json {
                return print_json(&project);
            }
            println!("{}", report.render());
            println!("Total cost: {}", report.total_cost());
            return Ok(());
        }
        ProjectsCommands::Updates(args) => {
            let updates = workflow
                .updates(args.id)
                .await
                .with_context(|| format!("failed to load updates for project {}", args.id))?;
            if json {
                return print_json(&updates);
            }
            if updates.is_empty() {
                println!("No updates posted yet");
            }
            updates.iter().for_each(render_update);
            return Ok(());
        }
    };

    if json {
        print_json(&project)
    } else {
        render_project(&project);
        Ok(())
    }
}

async fn handle_time_logs_command(
    context: &CliContext,
    command: TimeLogsCommands,
    json: bool,
) -> Result<()> {
    let service = context.time_logs();
    match command {
        TimeLogsCommands::Record(args) => {
            let log = service
                .record(TimeLogDraft {
                    description: args.description,
                    start_time: args.start,
                    end_time: args.end,
                    employee_id: args.employee,
                    task_id: args.task,
                    project_id: args.project,
                    appointment_id: args.appointment,
                })
                .await
                .context("failed to record time")?;
            if json {
                print_json(&log)?;
            } else {
                println!(
                    "Recorded {}h for employee {} (log {})",
                    log.hours_worked, log.employee_id, log.id
                );
            }
        }
        TimeLogsCommands::List(args) => {
            let sheet = service
                .for_employee(args.employee)
                .await
                .with_context(|| {
                    format!("failed to load time logs for employee {}", args.employee)
                })?;
            if json {
                print_json(&sheet)?;
            } else {
                for log in &sheet.logs {
                    println!(
                        "- {} → {} • {}h • {}",
                        log.start_time, log.end_time, log.hours_worked, log.description
                    );
                }
                println!("Total: {}h", sheet.total_hours);
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_appointment(appointment: &Appointment) {
    println!(
        "Appointment {} • {} • {} • employee {}",
        appointment.id,
        appointment.date,
        appointment.status,
        appointment
            .employee_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unassigned".to_string())
    );
    if let Some(reason) = appointment.rejection_reason() {
        println!("  Rejected: {}", reason);
    }
    if let Some(report) = appointment.technician_report() {
        println!("  Report: {}", report);
    }
}

fn render_project(project: &Project) {
    println!(
        "- Project {} • {} • {} • employees {:?} • main {}",
        project.id,
        project.name,
        project.status,
        project.assigned_employee_ids,
        project
            .main_representative_employee_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    if let Some(report) = project.report() {
        println!(
            "  Report by {} on {} • total {}",
            report.submitted_by,
            report.date,
            report.total_cost()
        );
    }
}

fn render_update(update: &ProjectUpdate) {
    println!(
        "- Update {} • {} • {:.0}% • {}",
        update.id, update.update_type, update.overall_percentage, update.message
    );
}

fn render_update_result(update: &ProjectUpdate, json: bool) -> Result<()> {
    if json {
        print_json(update)
    } else {
        render_update(update);
        Ok(())
    }
}
