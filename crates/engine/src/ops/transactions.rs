use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::TransactionTrait;
use tracing::info;
use uuid::Uuid;

use crate::{
    Period, ResultEngine, Transaction,
    closure::MonthlyClosureManager,
    commands::{NewTransaction, TransactionPatch},
    store::{LedgerStore, SqlLedger},
    util::{ensure_positive_amount, normalize_optional_text, normalize_required_name},
};

use super::{Engine, with_tx};

impl Engine {
    /// Record a transaction by hand. Dates inside a closed period are
    /// rejected with `PeriodClosed`.
    pub async fn record_transaction(
        &self,
        cmd: NewTransaction,
        now: DateTime<Utc>,
    ) -> ResultEngine<Transaction> {
        let description = normalize_required_name(&cmd.description, "transaction")?;
        ensure_positive_amount(cmd.amount)?;
        let _guard = self.lock_workspace(cmd.workspace_id).await?;
        with_tx!(self, |db_tx| {
            let store = SqlLedger::new(&db_tx);
            store
                .category(cmd.workspace_id, cmd.category_id)
                .await?
                .ensure_kind(cmd.kind)?;
            MonthlyClosureManager::new(&store)
                .ensure_writable(cmd.workspace_id, cmd.occurred_on)
                .await?;

            let mut tx = Transaction::new(
                cmd.workspace_id,
                cmd.category_id,
                description,
                cmd.amount,
                cmd.kind,
                cmd.occurred_on,
                now,
            );
            tx.is_fixed = cmd.is_fixed;
            tx.is_paid = cmd.paid_on.is_some();
            tx.paid_on = cmd.paid_on;
            tx.notes = normalize_optional_text(cmd.notes.as_deref());
            store.insert_transaction(&tx).await?;
            Ok(tx)
        })
    }

    pub async fn transaction(
        &self,
        workspace_id: Uuid,
        transaction_id: Uuid,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            SqlLedger::new(&db_tx)
                .transaction(workspace_id, transaction_id)
                .await
        })
    }

    /// Transactions dated inside `period`, oldest first.
    pub async fn transactions_in(
        &self,
        workspace_id: Uuid,
        period: Period,
    ) -> ResultEngine<Vec<Transaction>> {
        with_tx!(self, |db_tx| {
            SqlLedger::new(&db_tx)
                .transactions_between(workspace_id, period.first_day()?, period.last_day()?)
                .await
        })
    }

    /// Apply a partial update. Both the current and the new date must lie in
    /// periods that are still open.
    pub async fn update_transaction(&self, patch: TransactionPatch) -> ResultEngine<Transaction> {
        let _guard = self.lock_workspace(patch.workspace_id).await?;
        with_tx!(self, |db_tx| {
            let store = SqlLedger::new(&db_tx);
            let closures = MonthlyClosureManager::new(&store);
            let mut tx = store
                .transaction(patch.workspace_id, patch.transaction_id)
                .await?;
            closures
                .ensure_writable(tx.workspace_id, tx.occurred_on)
                .await?;

            if let Some(occurred_on) = patch.occurred_on {
                closures
                    .ensure_writable(tx.workspace_id, occurred_on)
                    .await?;
                tx.occurred_on = occurred_on;
            }
            if let Some(description) = patch.description.as_deref() {
                tx.description = normalize_required_name(description, "transaction")?;
            }
            if let Some(amount) = patch.amount {
                ensure_positive_amount(amount)?;
                tx.amount = amount;
            }
            if let Some(category_id) = patch.category_id {
                store
                    .category(tx.workspace_id, category_id)
                    .await?
                    .ensure_kind(tx.kind)?;
                tx.category_id = category_id;
            }
            if let Some(is_fixed) = patch.is_fixed {
                tx.is_fixed = is_fixed;
            }
            if let Some(notes) = patch.notes.as_deref() {
                tx.notes = normalize_optional_text(Some(notes));
            }
            store.update_transaction(&tx).await?;
            Ok(tx)
        })
    }

    /// Delete a transaction of an open period. Deleting a generated instance
    /// excludes its occurrence, so the next expansion does not bring it back.
    pub async fn delete_transaction(
        &self,
        workspace_id: Uuid,
        transaction_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let _guard = self.lock_workspace(workspace_id).await?;
        with_tx!(self, |db_tx| {
            let store = SqlLedger::new(&db_tx);
            let tx = store.transaction(workspace_id, transaction_id).await?;
            MonthlyClosureManager::new(&store)
                .ensure_writable(workspace_id, tx.occurred_on)
                .await?;

            if let (Some(template_id), Some(key)) = (tx.template_id, tx.occurrence_key.as_deref()) {
                store
                    .insert_exclusion(workspace_id, template_id, key, now)
                    .await?;
            }
            store.release_snapshot_source(tx.id).await?;
            store.delete_transaction(tx.id).await?;
            info!(%workspace_id, %transaction_id, "transaction deleted");
            Ok(())
        })
    }

    /// Mark a transaction paid. The only change allowed once its period is
    /// closed: totals do not depend on the paid state.
    pub async fn mark_paid(
        &self,
        workspace_id: Uuid,
        transaction_id: Uuid,
        paid_on: NaiveDate,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let store = SqlLedger::new(&db_tx);
            store.transaction(workspace_id, transaction_id).await?;
            store.mark_paid(transaction_id, paid_on).await?;
            store.transaction(workspace_id, transaction_id).await
        })
    }
}
