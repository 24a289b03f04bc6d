//! The narrow read/write contract the closure engine needs from durable
//! storage.
//!
//! Every lookup is keyed explicitly (workspace, period, entity id); relations
//! are plain foreign keys resolved through this trait, never traversed lazily.
//! Implementations are expected to run inside one database transaction per
//! engine operation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    Category, FixedExpenseSnapshot, MonthlyClosure, Period, RecurringTemplate, ResultEngine,
    Transaction, Workspace,
};

mod sql;

pub use sql::SqlLedger;

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn workspace(&self, workspace_id: Uuid) -> ResultEngine<Workspace>;

    async fn category(&self, workspace_id: Uuid, category_id: Uuid) -> ResultEngine<Category>;

    async fn template(
        &self,
        workspace_id: Uuid,
        template_id: Uuid,
    ) -> ResultEngine<Option<RecurringTemplate>>;

    async fn active_templates(&self, workspace_id: Uuid) -> ResultEngine<Vec<RecurringTemplate>>;

    async fn transaction(&self, workspace_id: Uuid, transaction_id: Uuid)
    -> ResultEngine<Transaction>;

    /// Transactions dated within `[from, to]`, oldest first.
    async fn transactions_between(
        &self,
        workspace_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultEngine<Vec<Transaction>>;

    async fn generated_exists(&self, template_id: Uuid, occurrence_key: &str)
    -> ResultEngine<bool>;

    async fn generated_in(
        &self,
        workspace_id: Uuid,
        template_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultEngine<Vec<Transaction>>;

    async fn is_excluded(&self, template_id: Uuid, occurrence_key: &str) -> ResultEngine<bool>;

    async fn insert_exclusion(
        &self,
        workspace_id: Uuid,
        template_id: Uuid,
        occurrence_key: &str,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<()>;

    async fn insert_transaction(&self, tx: &Transaction) -> ResultEngine<()>;

    /// Inserts a template-generated transaction unless its
    /// `(template_id, occurrence_key)` is already taken. Fails with
    /// `DuplicateExpansion` when the key was taken.
    async fn insert_generated(&self, tx: &Transaction) -> ResultEngine<()>;

    async fn update_transaction(&self, tx: &Transaction) -> ResultEngine<()>;

    /// Sets only the paid columns, leaving a concurrent closure stamp intact.
    async fn mark_paid(&self, transaction_id: Uuid, paid_on: NaiveDate) -> ResultEngine<()>;

    async fn delete_transaction(&self, transaction_id: Uuid) -> ResultEngine<()>;

    /// Points every unstamped transaction dated in `period` at `closure_id`.
    async fn stamp_closure(
        &self,
        workspace_id: Uuid,
        period: Period,
        closure_id: Uuid,
    ) -> ResultEngine<u64>;

    async fn open_closure(&self, workspace_id: Uuid) -> ResultEngine<Option<MonthlyClosure>>;

    async fn closure_for(
        &self,
        workspace_id: Uuid,
        period: Period,
    ) -> ResultEngine<Option<MonthlyClosure>>;

    async fn closure(&self, workspace_id: Uuid, closure_id: Uuid) -> ResultEngine<MonthlyClosure>;

    async fn closed_closures(&self, workspace_id: Uuid) -> ResultEngine<Vec<MonthlyClosure>>;

    async fn insert_closure(&self, closure: &MonthlyClosure) -> ResultEngine<()>;

    /// Writes `sealed` over its row only while that row is still open.
    /// Returns `false` when someone else closed it first.
    async fn seal_closure(&self, sealed: &MonthlyClosure) -> ResultEngine<bool>;

    async fn snapshot_exists(&self, source_transaction_id: Uuid, closure_id: Uuid)
    -> ResultEngine<bool>;

    async fn insert_snapshot(&self, snapshot: &FixedExpenseSnapshot) -> ResultEngine<()>;

    async fn snapshots_into(&self, closure_id: Uuid) -> ResultEngine<Vec<FixedExpenseSnapshot>>;

    /// Detaches snapshots from a source transaction that is about to be deleted.
    async fn release_snapshot_source(&self, source_transaction_id: Uuid) -> ResultEngine<()>;
}
