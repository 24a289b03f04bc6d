//! Carrying fixed expenses from a closed month into the next one.
//!
//! Expenses generated by a template that still exists are skipped: the
//! template produces next month's instance itself, and copying it here too
//! would book the expense twice.

use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, info};

use crate::{
    EngineError, FixedExpenseSnapshot, MonthlyClosure, ResultEngine, Transaction,
    store::LedgerStore,
};

pub struct FixedExpenseCarryForward<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> FixedExpenseCarryForward<'a, S>
where
    S: LedgerStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Mirrors the fixed expenses of `closed` into `next` and returns the
    /// snapshots created by this call. Pairs already carried are left alone,
    /// so running it twice is a no-op.
    pub async fn carry_forward(
        &self,
        closed: &MonthlyClosure,
        next: &MonthlyClosure,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<FixedExpenseSnapshot>> {
        if closed.is_open() {
            return Err(EngineError::InvalidPeriod(format!(
                "{} is still open",
                closed.period
            )));
        }
        if closed.workspace_id != next.workspace_id || next.period != closed.period.next()? {
            return Err(EngineError::InvalidPeriod(format!(
                "{} does not follow {}",
                next.period, closed.period
            )));
        }
        if !next.is_open() {
            return Err(EngineError::PeriodClosed(format!(
                "{} is closed",
                next.period
            )));
        }

        let sources = self
            .store
            .transactions_between(
                closed.workspace_id,
                closed.period.first_day()?,
                closed.period.last_day()?,
            )
            .await?;

        let mut carried = Vec::new();
        for source in sources.iter().filter(|tx| tx.is_fixed_expense()) {
            if let Some(template_id) = source.template_id
                && self
                    .store
                    .template(source.workspace_id, template_id)
                    .await?
                    .is_some()
            {
                debug!(transaction_id = %source.id, %template_id, "left to template expansion");
                continue;
            }
            if self.store.snapshot_exists(source.id, next.id).await? {
                continue;
            }

            let mut mirror = Transaction::new(
                source.workspace_id,
                source.category_id,
                source.description.clone(),
                source.amount,
                source.kind,
                next.period.clamped_day(source.occurred_on.day())?,
                now,
            );
            mirror.is_fixed = true;
            mirror.is_auto_loaded = true;
            mirror.closure_id = Some(next.id);
            mirror.notes = source.notes.clone();
            self.store.insert_transaction(&mirror).await?;

            let snapshot = FixedExpenseSnapshot::capture(source, next.id, mirror.id, now);
            self.store.insert_snapshot(&snapshot).await?;
            carried.push(snapshot);
        }

        if !carried.is_empty() {
            info!(
                workspace_id = %closed.workspace_id,
                from = %closed.period,
                to = %next.period,
                count = carried.len(),
                "fixed expenses carried forward"
            );
        }
        Ok(carried)
    }
}
