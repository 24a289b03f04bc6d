use std::error::Error;

use chrono::{NaiveDate, Utc, Weekday};
use clap::{Args, Parser, Subcommand};
use engine::{Engine, MoneyCents, NewTemplate, Period, Schedule, TransactionKind};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use serde::Serialize;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "monthbook_admin")]
#[command(about = "Admin utilities for Monthbook (bootstrap workspaces, close months by hand)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./monthbook.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Workspace(Workspace),
    Category(Category),
    Template(Template),
    /// Materialize recurring templates for a period.
    Expand(PeriodArgs),
    /// Close the open period of a workspace.
    Close(PeriodArgs),
    /// Close every open period before today's month.
    RollOver(RollOverArgs),
    /// Totals of a period (the open one by default).
    Status(StatusArgs),
    /// Closed periods, newest first.
    History(WorkspaceArgs),
}

#[derive(Args, Debug)]
struct Workspace {
    #[command(subcommand)]
    command: WorkspaceCommand,
}

#[derive(Subcommand, Debug)]
enum WorkspaceCommand {
    Create(WorkspaceCreateArgs),
    List,
}

#[derive(Args, Debug)]
struct WorkspaceCreateArgs {
    #[arg(long)]
    name: String,
    /// First open period, `YYYY-MM`; defaults to the current month.
    #[arg(long)]
    period: Option<Period>,
}

#[derive(Args, Debug)]
struct Category {
    #[command(subcommand)]
    command: CategoryCommand,
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    Create(CategoryCreateArgs),
}

#[derive(Args, Debug)]
struct CategoryCreateArgs {
    #[arg(long)]
    workspace: Uuid,
    #[arg(long)]
    name: String,
    /// `income` or `expense`.
    #[arg(long, value_parser = parse_kind)]
    kind: TransactionKind,
}

#[derive(Args, Debug)]
struct Template {
    #[command(subcommand)]
    command: TemplateCommand,
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    Create(TemplateCreateArgs),
}

#[derive(Args, Debug)]
struct TemplateCreateArgs {
    #[arg(long)]
    workspace: Uuid,
    #[arg(long)]
    category: Uuid,
    #[arg(long)]
    description: String,
    /// Decimal amount, e.g. `1000.00`.
    #[arg(long)]
    amount: MoneyCents,
    #[arg(long, value_parser = parse_kind)]
    kind: TransactionKind,
    /// Monthly on this day of month.
    #[arg(long, conflicts_with_all = ["weekday", "yearly"])]
    day: Option<u32>,
    /// Weekly on this weekday (`mon`, `tue`, ...).
    #[arg(long, conflicts_with = "yearly")]
    weekday: Option<Weekday>,
    /// Yearly on `MM-DD`.
    #[arg(long)]
    yearly: Option<String>,
    #[arg(long)]
    start: NaiveDate,
    #[arg(long)]
    end: Option<NaiveDate>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
struct WorkspaceArgs {
    #[arg(long)]
    workspace: Uuid,
}

#[derive(Args, Debug)]
struct PeriodArgs {
    #[arg(long)]
    workspace: Uuid,
    /// `YYYY-MM`; defaults to the workspace's open period.
    #[arg(long)]
    period: Option<Period>,
}

#[derive(Args, Debug)]
struct RollOverArgs {
    #[arg(long)]
    workspace: Uuid,
    /// Defaults to today.
    #[arg(long)]
    today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
struct StatusArgs {
    #[arg(long)]
    workspace: Uuid,
    #[arg(long)]
    period: Option<Period>,
}

fn parse_kind(raw: &str) -> Result<TransactionKind, String> {
    TransactionKind::try_from(raw.to_lowercase().as_str()).map_err(|err| err.to_string())
}

fn parse_schedule(args: &TemplateCreateArgs) -> Result<Schedule, Box<dyn Error + Send + Sync>> {
    if let Some(day) = args.day {
        return Ok(Schedule::monthly(day)?);
    }
    if let Some(weekday) = args.weekday {
        return Ok(Schedule::weekly(weekday));
    }
    if let Some(raw) = args.yearly.as_deref() {
        let (month, day) = raw
            .split_once('-')
            .ok_or_else(|| format!("expected MM-DD, got {raw:?}"))?;
        return Ok(Schedule::yearly(month.parse()?, day.parse()?)?);
    }
    Err("one of --day, --weekday or --yearly is required".into())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn resolve_period(
    engine: &Engine,
    workspace: Uuid,
    period: Option<Period>,
) -> Result<Period, Box<dyn Error + Send + Sync>> {
    match period {
        Some(period) => Ok(period),
        None => Ok(engine.current_open_period(workspace).await?.period),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;
    let now = Utc::now();

    match cli.command {
        Command::Workspace(Workspace {
            command: WorkspaceCommand::Create(args),
        }) => {
            let period = args
                .period
                .unwrap_or_else(|| Period::containing(now.date_naive()));
            let workspace = engine.create_workspace(&args.name, period, now).await?;
            println!(
                "created workspace: {} ({}) open at {period}",
                workspace.name, workspace.id
            );
        }
        Command::Workspace(Workspace {
            command: WorkspaceCommand::List,
        }) => {
            print_json(&engine.active_workspaces().await?)?;
        }
        Command::Category(Category {
            command: CategoryCommand::Create(args),
        }) => {
            let category = engine
                .create_category(args.workspace, &args.name, args.kind)
                .await?;
            println!("created category: {} ({})", category.name, category.id);
        }
        Command::Template(Template {
            command: TemplateCommand::Create(args),
        }) => {
            let schedule = parse_schedule(&args)?;
            let mut cmd = NewTemplate::new(
                args.workspace,
                args.category,
                args.description.clone(),
                args.amount,
                args.kind,
                schedule,
                args.start,
            );
            if let Some(end) = args.end {
                cmd = cmd.end_date(end);
            }
            if let Some(notes) = args.notes.clone() {
                cmd = cmd.notes(notes);
            }
            let template = engine.create_template(cmd, now).await?;
            println!(
                "created template: {} ({})",
                template.description, template.id
            );
        }
        Command::Expand(args) => {
            let period = resolve_period(&engine, args.workspace, args.period).await?;
            let created = engine.expand_recurring(args.workspace, period, now).await?;
            print_json(&created)?;
        }
        Command::Close(args) => {
            let period = resolve_period(&engine, args.workspace, args.period).await?;
            let closed = engine.close_month(args.workspace, period, now).await?;
            print_json(&closed)?;
        }
        Command::RollOver(args) => {
            let today = args.today.unwrap_or_else(|| now.date_naive());
            let closed = engine.roll_over(args.workspace, today, now).await?;
            print_json(&closed)?;
        }
        Command::Status(args) => {
            let period = resolve_period(&engine, args.workspace, args.period).await?;
            print_json(&engine.period_summary(args.workspace, period).await?)?;
        }
        Command::History(args) => {
            print_json(&engine.closure_history(args.workspace).await?)?;
        }
    }

    Ok(())
}
