//! `cradle log <kind> ...`

use crate::app::{print_json, App};
use anyhow::bail;
use clap::{Args, Subcommand};
use cradle_storage::logs::{
    DiaperKind, DiaperLog, FeedingLog, FeedingMethod, HealthCategory, HealthLog, Milestone,
    NursingLog, NursingSide, SleepLog,
};
use cradle_storage::{now_timestamp, Field, FieldCodec, LogRecord, Record};
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Subcommand)]
pub enum LogCommand {
    /// Sleep sessions
    Sleep {
        #[command(subcommand)]
        action: SleepAction,
    },
    /// Bottle and solid feeds
    Feeding {
        #[command(subcommand)]
        action: FeedingAction,
    },
    /// Nursing sessions
    Nursing {
        #[command(subcommand)]
        action: NursingAction,
    },
    /// Diaper changes
    Diaper {
        #[command(subcommand)]
        action: DiaperAction,
    },
    /// Health observations
    Health {
        #[command(subcommand)]
        action: HealthAction,
    },
    /// Milestones
    Milestone {
        #[command(subcommand)]
        action: MilestoneAction,
    },
}

// =============================================================================
// Per-kind arguments
// =============================================================================

#[derive(Subcommand)]
pub enum SleepAction {
    /// Log a sleep session
    Add(SleepArgs),
    /// List entries for the active child
    List,
    /// Delete an entry
    Delete { id: String },
}

#[derive(Args)]
pub struct SleepArgs {
    /// Start time (RFC 3339), defaults to now
    #[arg(long)]
    start: Option<String>,
    /// End time (RFC 3339)
    #[arg(long)]
    end: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Subcommand)]
pub enum FeedingAction {
    /// Log a feed
    Add(FeedingArgs),
    /// List entries for the active child
    List,
    /// Delete an entry
    Delete { id: String },
}

#[derive(Args)]
pub struct FeedingArgs {
    /// bottle, breast-milk, formula or solids
    #[arg(long, value_parser = parse_choice::<FeedingMethod>)]
    method: FeedingMethod,
    /// Amount, e.g. "120 ml"
    #[arg(long)]
    amount: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    /// Feed time (RFC 3339), defaults to now
    #[arg(long)]
    at: Option<String>,
}

#[derive(Subcommand)]
pub enum NursingAction {
    /// Log a nursing session
    Add(NursingArgs),
    /// List entries for the active child
    List,
    /// Delete an entry
    Delete { id: String },
}

#[derive(Args)]
pub struct NursingArgs {
    /// left, right or both
    #[arg(long, value_parser = parse_choice::<NursingSide>)]
    side: NursingSide,
    /// Duration in minutes
    #[arg(long)]
    duration: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    /// Start time (RFC 3339), defaults to now
    #[arg(long)]
    at: Option<String>,
}

#[derive(Subcommand)]
pub enum DiaperAction {
    /// Log a diaper change
    Add(DiaperArgs),
    /// List entries for the active child
    List,
    /// Delete an entry
    Delete { id: String },
}

#[derive(Args)]
pub struct DiaperArgs {
    /// wet, dirty, mixed or dry
    #[arg(long, value_parser = parse_choice::<DiaperKind>)]
    kind: DiaperKind,
    /// Amount, e.g. "small"
    #[arg(long)]
    amount: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    /// Change time (RFC 3339), defaults to now
    #[arg(long)]
    at: Option<String>,
}

#[derive(Subcommand)]
pub enum HealthAction {
    /// Log a health observation
    Add(HealthArgs),
    /// List entries for the active child
    List,
    /// Delete an entry
    Delete { id: String },
}

#[derive(Args)]
pub struct HealthArgs {
    /// temperature, medication, weight, height, symptom or vaccination
    #[arg(long, value_parser = parse_choice::<HealthCategory>)]
    category: HealthCategory,
    /// Reading or description, e.g. "37.8 C"
    #[arg(long)]
    value: String,
    #[arg(long)]
    notes: Option<String>,
    /// Observation time (RFC 3339), defaults to now
    #[arg(long)]
    at: Option<String>,
}

#[derive(Subcommand)]
pub enum MilestoneAction {
    /// Record a milestone
    Add(MilestoneArgs),
    /// List entries for the active child
    List,
    /// Delete an entry
    Delete { id: String },
}

#[derive(Args)]
pub struct MilestoneArgs {
    /// e.g. "First steps"
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: Option<String>,
    /// Date achieved (YYYY-MM-DD), defaults to today
    #[arg(long)]
    date: Option<String>,
}

// =============================================================================
// Dispatch
// =============================================================================

pub fn run(app: &App, command: LogCommand) -> anyhow::Result<()> {
    match command {
        LogCommand::Sleep { action } => match action {
            SleepAction::Add(args) => {
                let child_id = app.active_child_id()?;
                let start = args.start.unwrap_or_else(now_timestamp);
                add(
                    app,
                    &SleepLog::new(
                        &app.codec,
                        &child_id,
                        &start,
                        args.end.as_deref(),
                        args.notes.as_deref(),
                    )?,
                )
            }
            SleepAction::List => list::<SleepLog>(app),
            SleepAction::Delete { id } => delete::<SleepLog>(app, &id),
        },
        LogCommand::Feeding { action } => match action {
            FeedingAction::Add(args) => {
                let child_id = app.active_child_id()?;
                let at = args.at.unwrap_or_else(now_timestamp);
                add(
                    app,
                    &FeedingLog::new(
                        &app.codec,
                        &child_id,
                        &at,
                        args.method,
                        args.amount.as_deref(),
                        args.notes.as_deref(),
                    )?,
                )
            }
            FeedingAction::List => list::<FeedingLog>(app),
            FeedingAction::Delete { id } => delete::<FeedingLog>(app, &id),
        },
        LogCommand::Nursing { action } => match action {
            NursingAction::Add(args) => {
                let child_id = app.active_child_id()?;
                let at = args.at.unwrap_or_else(now_timestamp);
                add(
                    app,
                    &NursingLog::new(
                        &app.codec,
                        &child_id,
                        &at,
                        args.side,
                        args.duration.as_deref(),
                        args.notes.as_deref(),
                    )?,
                )
            }
            NursingAction::List => list::<NursingLog>(app),
            NursingAction::Delete { id } => delete::<NursingLog>(app, &id),
        },
        LogCommand::Diaper { action } => match action {
            DiaperAction::Add(args) => {
                let child_id = app.active_child_id()?;
                let at = args.at.unwrap_or_else(now_timestamp);
                add(
                    app,
                    &DiaperLog::new(
                        &app.codec,
                        &child_id,
                        &at,
                        args.kind,
                        args.amount.as_deref(),
                        args.notes.as_deref(),
                    )?,
                )
            }
            DiaperAction::List => list::<DiaperLog>(app),
            DiaperAction::Delete { id } => delete::<DiaperLog>(app, &id),
        },
        LogCommand::Health { action } => match action {
            HealthAction::Add(args) => {
                let child_id = app.active_child_id()?;
                let at = args.at.unwrap_or_else(now_timestamp);
                add(
                    app,
                    &HealthLog::new(
                        &app.codec,
                        &child_id,
                        &at,
                        args.category,
                        &args.value,
                        args.notes.as_deref(),
                    )?,
                )
            }
            HealthAction::List => list::<HealthLog>(app),
            HealthAction::Delete { id } => delete::<HealthLog>(app, &id),
        },
        LogCommand::Milestone { action } => match action {
            MilestoneAction::Add(args) => {
                let child_id = app.active_child_id()?;
                let date = args
                    .date
                    .unwrap_or_else(|| chrono::Local::now().date_naive().to_string());
                add(
                    app,
                    &Milestone::new(
                        &app.codec,
                        &child_id,
                        &date,
                        &args.title,
                        args.description.as_deref(),
                    )?,
                )
            }
            MilestoneAction::List => list::<Milestone>(app),
            MilestoneAction::Delete { id } => delete::<Milestone>(app, &id),
        },
    }
}

fn add<T: LogRecord>(app: &App, entry: &T) -> anyhow::Result<()> {
    let record = app.session.store().table::<T>().insert(entry)?;
    tracing::info!("Logged entry in {}", T::TABLE);
    println!("{}", record.id);
    Ok(())
}

fn list<T: LogRecord>(app: &App) -> anyhow::Result<()> {
    let child_id = app.active_child_id()?;
    let records = app.session.store().table::<T>().list_for_child(&child_id);

    let view = records
        .iter()
        .map(|record| revealed(record, &app.codec))
        .collect::<anyhow::Result<Vec<_>>>()?;
    print_json(&view)
}

fn delete<T: LogRecord>(app: &App, id: &str) -> anyhow::Result<()> {
    let child_id = app.active_child_id()?;
    if !app
        .session
        .store()
        .table::<T>()
        .delete_for_child(&child_id, id)?
    {
        bail!("No {} entry with id {} for the active child", T::TABLE, id);
    }
    println!("Deleted {}", id);
    Ok(())
}

/// Record as JSON with sealed fields replaced by their plaintext
fn revealed<T: LogRecord>(record: &Record<T>, codec: &FieldCodec) -> anyhow::Result<Value> {
    let mut value = serde_json::to_value(record)?;
    if let Value::Object(fields) = &mut value {
        for slot in fields.values_mut() {
            if !slot.is_object() {
                continue;
            }
            if let Ok(field) = serde_json::from_value::<Field>(slot.clone()) {
                if field.is_encrypted() {
                    *slot = Value::String(field.display(codec));
                }
            }
        }
    }
    Ok(value)
}

/// Parse a kebab- or snake-case choice into a stored enum
fn parse_choice<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_value(Value::String(raw.replace('-', "_")))
        .map_err(|_| format!("unrecognized value '{}'", raw))
}
