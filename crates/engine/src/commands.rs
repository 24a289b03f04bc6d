//! Command structs for engine operations.
//!
//! These types group parameters for write operations (transactions and
//! templates), keeping call sites readable and avoiding long argument lists.

use chrono::{NaiveDate, Weekday};
use uuid::Uuid;

use crate::{MoneyCents, ResultEngine, Schedule, TransactionKind};

/// Record a transaction by hand.
#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub workspace_id: Uuid,
    pub category_id: Uuid,
    pub description: String,
    pub amount: MoneyCents,
    pub kind: TransactionKind,
    pub occurred_on: NaiveDate,
    pub is_fixed: bool,
    pub paid_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl NewTransaction {
    #[must_use]
    pub fn new(
        workspace_id: Uuid,
        category_id: Uuid,
        description: impl Into<String>,
        amount: MoneyCents,
        kind: TransactionKind,
        occurred_on: NaiveDate,
    ) -> Self {
        Self {
            workspace_id,
            category_id,
            description: description.into(),
            amount,
            kind,
            occurred_on,
            is_fixed: false,
            paid_on: None,
            notes: None,
        }
    }

    /// Marks the expense as fixed so month closure carries it forward.
    #[must_use]
    pub fn fixed(mut self) -> Self {
        self.is_fixed = true;
        self
    }

    #[must_use]
    pub fn paid_on(mut self, paid_on: NaiveDate) -> Self {
        self.paid_on = Some(paid_on);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Partial update of a transaction. `None` leaves the field unchanged.
#[derive(Clone, Debug)]
pub struct TransactionPatch {
    pub workspace_id: Uuid,
    pub transaction_id: Uuid,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub amount: Option<MoneyCents>,
    pub occurred_on: Option<NaiveDate>,
    pub is_fixed: Option<bool>,
    /// `Some("")` clears the notes.
    pub notes: Option<String>,
}

impl TransactionPatch {
    #[must_use]
    pub fn new(workspace_id: Uuid, transaction_id: Uuid) -> Self {
        Self {
            workspace_id,
            transaction_id,
            category_id: None,
            description: None,
            amount: None,
            occurred_on: None,
            is_fixed: None,
            notes: None,
        }
    }

    #[must_use]
    pub fn category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: MoneyCents) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn occurred_on(mut self, occurred_on: NaiveDate) -> Self {
        self.occurred_on = Some(occurred_on);
        self
    }

    #[must_use]
    pub fn fixed(mut self, is_fixed: bool) -> Self {
        self.is_fixed = Some(is_fixed);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Create a recurring template.
#[derive(Clone, Debug)]
pub struct NewTemplate {
    pub workspace_id: Uuid,
    pub category_id: Uuid,
    pub description: String,
    pub amount: MoneyCents,
    pub kind: TransactionKind,
    pub schedule: Schedule,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl NewTemplate {
    #[must_use]
    pub fn new(
        workspace_id: Uuid,
        category_id: Uuid,
        description: impl Into<String>,
        amount: MoneyCents,
        kind: TransactionKind,
        schedule: Schedule,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            workspace_id,
            category_id,
            description: description.into(),
            amount,
            kind,
            schedule,
            start_date,
            end_date: None,
            notes: None,
        }
    }

    /// Monthly template anchored on `day`.
    pub fn monthly(
        workspace_id: Uuid,
        category_id: Uuid,
        description: impl Into<String>,
        amount: MoneyCents,
        kind: TransactionKind,
        day: u32,
        start_date: NaiveDate,
    ) -> ResultEngine<Self> {
        Ok(Self::new(
            workspace_id,
            category_id,
            description,
            amount,
            kind,
            Schedule::monthly(day)?,
            start_date,
        ))
    }

    #[must_use]
    pub fn weekly(
        workspace_id: Uuid,
        category_id: Uuid,
        description: impl Into<String>,
        amount: MoneyCents,
        kind: TransactionKind,
        weekday: Weekday,
        start_date: NaiveDate,
    ) -> Self {
        Self::new(
            workspace_id,
            category_id,
            description,
            amount,
            kind,
            Schedule::weekly(weekday),
            start_date,
        )
    }

    #[must_use]
    pub fn end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Partial update of a template. Only expansions made after the update see
/// the new values.
#[derive(Clone, Debug)]
pub struct TemplatePatch {
    pub workspace_id: Uuid,
    pub template_id: Uuid,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub amount: Option<MoneyCents>,
    pub schedule: Option<Schedule>,
    /// `Some(None)` removes the end date.
    pub end_date: Option<Option<NaiveDate>>,
    /// `Some("")` clears the notes.
    pub notes: Option<String>,
}

impl TemplatePatch {
    #[must_use]
    pub fn new(workspace_id: Uuid, template_id: Uuid) -> Self {
        Self {
            workspace_id,
            template_id,
            category_id: None,
            description: None,
            amount: None,
            schedule: None,
            end_date: None,
            notes: None,
        }
    }

    #[must_use]
    pub fn category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: MoneyCents) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    #[must_use]
    pub fn end_date(mut self, end_date: Option<NaiveDate>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
