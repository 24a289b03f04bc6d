//! Recurring-transaction expansion and monthly closure for personal and family
//! ledgers.
//!
//! [`Engine`] is the entry point: it owns the database connection and runs
//! every write under a per-workspace lock inside one database transaction.
//! The components it drives ([`RecurrenceExpander`], [`MonthlyClosureManager`],
//! [`FixedExpenseCarryForward`] and [`aggregate`]) only see the
//! [`LedgerStore`] trait.

pub use balance::{Totals, aggregate};
pub use carry_forward::FixedExpenseCarryForward;
pub use categories::Category;
pub use closure::{ClosedMonth, MonthlyClosureManager};
pub use closures::{ClosureStatus, MonthlyClosure};
pub use commands::{NewTemplate, NewTransaction, TemplatePatch, TransactionPatch};
pub use error::EngineError;
pub use money::MoneyCents;
pub use ops::{ClosureDetails, Engine, EngineBuilder, EngineConfig, PeriodSummary};
pub use period::Period;
pub use recurrence::{
    ExpansionOutcome, Occurrence, RecurrenceExpander, SkipReason, SkippedOccurrence,
    occurrence_key, occurrences,
};
pub use snapshots::FixedExpenseSnapshot;
pub use store::{LedgerStore, SqlLedger};
pub use templates::{RecurringTemplate, Schedule};
pub use transactions::{Transaction, TransactionKind};
pub use workspaces::Workspace;

mod balance;
mod carry_forward;
mod categories;
mod closure;
mod closures;
mod commands;
mod error;
mod exclusions;
mod money;
mod ops;
mod period;
mod recurrence;
mod snapshots;
mod store;
mod templates;
mod transactions;
mod util;
mod workspaces;

pub type ResultEngine<T> = Result<T, EngineError>;
