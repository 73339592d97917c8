//! Infant-care log records
//!
//! Each record type lives in its own table. Ids, child ids, timestamps and
//! enumerated kinds stay in the clear so they can be filtered on; free text
//! and measurements are [`Field`]s, sealed by the constructors.

use crate::field::{seal_optional, Field};
use crate::security::FieldCodec;
use crate::table::{LogRecord, TableRecord};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Log kinds, one table each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// Sleep sessions
    Sleep,
    /// Bottle and solid feeds
    Feeding,
    /// Nursing sessions
    Nursing,
    /// Diaper changes
    Diaper,
    /// Health observations
    Health,
    /// Milestones
    Milestone,
}

impl LogKind {
    /// Table backing this kind
    pub fn table(&self) -> &'static str {
        match self {
            LogKind::Sleep => SleepLog::TABLE,
            LogKind::Feeding => FeedingLog::TABLE,
            LogKind::Nursing => NursingLog::TABLE,
            LogKind::Diaper => DiaperLog::TABLE,
            LogKind::Health => HealthLog::TABLE,
            LogKind::Milestone => Milestone::TABLE,
        }
    }

    /// All kinds
    pub fn all() -> &'static [LogKind] {
        &[
            LogKind::Sleep,
            LogKind::Feeding,
            LogKind::Nursing,
            LogKind::Diaper,
            LogKind::Health,
            LogKind::Milestone,
        ]
    }
}

// =============================================================================
// Sleep
// =============================================================================

/// Sleep session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepLog {
    /// Child id
    pub child_id: String,
    /// Start time (RFC 3339)
    pub started_at: String,
    /// End time, absent while still asleep
    pub ended_at: Option<String>,
    /// Notes
    pub notes: Option<Field>,
}

impl SleepLog {
    /// New sleep entry with sealed notes
    pub fn new(
        codec: &FieldCodec,
        child_id: &str,
        started_at: &str,
        ended_at: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            child_id: child_id.to_string(),
            started_at: started_at.to_string(),
            ended_at: ended_at.map(str::to_string),
            notes: seal_optional(codec, notes)?,
        })
    }
}

impl TableRecord for SleepLog {
    const TABLE: &'static str = "sleep_logs";
}

impl LogRecord for SleepLog {
    fn child_id(&self) -> &str {
        &self.child_id
    }
}

// =============================================================================
// Feeding
// =============================================================================

/// Feeding method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedingMethod {
    /// Bottle (unspecified content)
    Bottle,
    /// Expressed breast milk
    BreastMilk,
    /// Formula
    Formula,
    /// Solid food
    Solids,
}

/// Bottle or solid feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedingLog {
    /// Child id
    pub child_id: String,
    /// Feed time (RFC 3339)
    pub fed_at: String,
    /// Method
    pub method: FeedingMethod,
    /// Amount as entered (e.g. "120 ml")
    pub amount: Option<Field>,
    /// Notes
    pub notes: Option<Field>,
}

impl FeedingLog {
    /// New feeding entry with sealed amount and notes
    pub fn new(
        codec: &FieldCodec,
        child_id: &str,
        fed_at: &str,
        method: FeedingMethod,
        amount: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            child_id: child_id.to_string(),
            fed_at: fed_at.to_string(),
            method,
            amount: seal_optional(codec, amount)?,
            notes: seal_optional(codec, notes)?,
        })
    }
}

impl TableRecord for FeedingLog {
    const TABLE: &'static str = "feeding_logs";
}

impl LogRecord for FeedingLog {
    fn child_id(&self) -> &str {
        &self.child_id
    }
}

// =============================================================================
// Nursing
// =============================================================================

/// Breast used for a nursing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NursingSide {
    /// Left
    Left,
    /// Right
    Right,
    /// Both
    Both,
}

/// Nursing session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NursingLog {
    /// Child id
    pub child_id: String,
    /// Start time (RFC 3339)
    pub started_at: String,
    /// Side
    pub side: NursingSide,
    /// Duration in minutes, as entered
    pub duration_minutes: Option<Field>,
    /// Notes
    pub notes: Option<Field>,
}

impl NursingLog {
    /// New nursing entry with sealed duration and notes
    pub fn new(
        codec: &FieldCodec,
        child_id: &str,
        started_at: &str,
        side: NursingSide,
        duration_minutes: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            child_id: child_id.to_string(),
            started_at: started_at.to_string(),
            side,
            duration_minutes: seal_optional(codec, duration_minutes)?,
            notes: seal_optional(codec, notes)?,
        })
    }
}

impl TableRecord for NursingLog {
    const TABLE: &'static str = "nursing_logs";
}

impl LogRecord for NursingLog {
    fn child_id(&self) -> &str {
        &self.child_id
    }
}

// =============================================================================
// Diaper
// =============================================================================

/// Diaper contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiaperKind {
    /// Wet
    Wet,
    /// Dirty
    Dirty,
    /// Wet and dirty
    Mixed,
    /// Dry
    Dry,
}

/// Diaper change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaperLog {
    /// Child id
    pub child_id: String,
    /// Change time (RFC 3339)
    pub changed_at: String,
    /// Contents
    pub kind: DiaperKind,
    /// Amount as entered (e.g. "small")
    pub amount: Option<Field>,
    /// Notes
    pub notes: Option<Field>,
}

impl DiaperLog {
    /// New diaper entry with sealed amount and notes
    pub fn new(
        codec: &FieldCodec,
        child_id: &str,
        changed_at: &str,
        kind: DiaperKind,
        amount: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            child_id: child_id.to_string(),
            changed_at: changed_at.to_string(),
            kind,
            amount: seal_optional(codec, amount)?,
            notes: seal_optional(codec, notes)?,
        })
    }
}

impl TableRecord for DiaperLog {
    const TABLE: &'static str = "diaper_logs";
}

impl LogRecord for DiaperLog {
    fn child_id(&self) -> &str {
        &self.child_id
    }
}

// =============================================================================
// Health
// =============================================================================

/// Kind of health observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthCategory {
    /// Body temperature
    Temperature,
    /// Medication given
    Medication,
    /// Weight
    Weight,
    /// Height / length
    Height,
    /// Symptom
    Symptom,
    /// Vaccination
    Vaccination,
}

/// Health observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthLog {
    /// Child id
    pub child_id: String,
    /// Observation time (RFC 3339)
    pub recorded_at: String,
    /// Category
    pub category: HealthCategory,
    /// Reading or description (e.g. "37.8 C", "paracetamol 2.5 ml")
    pub value: Field,
    /// Notes
    pub notes: Option<Field>,
}

impl HealthLog {
    /// New health entry with sealed value and notes
    pub fn new(
        codec: &FieldCodec,
        child_id: &str,
        recorded_at: &str,
        category: HealthCategory,
        value: &str,
        notes: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            child_id: child_id.to_string(),
            recorded_at: recorded_at.to_string(),
            category,
            value: Field::seal(codec, value)?,
            notes: seal_optional(codec, notes)?,
        })
    }
}

impl TableRecord for HealthLog {
    const TABLE: &'static str = "health_logs";
}

impl LogRecord for HealthLog {
    fn child_id(&self) -> &str {
        &self.child_id
    }
}

// =============================================================================
// Milestones
// =============================================================================

/// Developmental milestone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// Child id
    pub child_id: String,
    /// Date achieved (YYYY-MM-DD)
    pub achieved_on: String,
    /// Title (e.g. "First steps")
    pub title: Field,
    /// Longer description
    pub description: Option<Field>,
}

impl Milestone {
    /// New milestone with sealed title and description
    pub fn new(
        codec: &FieldCodec,
        child_id: &str,
        achieved_on: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            child_id: child_id.to_string(),
            achieved_on: achieved_on.to_string(),
            title: Field::seal(codec, title)?,
            description: seal_optional(codec, description)?,
        })
    }
}

impl TableRecord for Milestone {
    const TABLE: &'static str = "milestones";
}

impl LogRecord for Milestone {
    fn child_id(&self) -> &str {
        &self.child_id
    }
}
