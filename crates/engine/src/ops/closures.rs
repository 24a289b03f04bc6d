use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::TransactionTrait;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    ClosureStatus, EngineError, FixedExpenseSnapshot, MonthlyClosure, Period, ResultEngine,
    Totals, Transaction, aggregate,
    carry_forward::FixedExpenseCarryForward,
    closure::{ClosedMonth, MonthlyClosureManager},
    recurrence::RecurrenceExpander,
    store::{LedgerStore, SqlLedger},
};

use super::{Engine, with_tx};

/// Totals of one period: frozen once closed, live otherwise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PeriodSummary {
    pub period: Period,
    /// `None` when no closure row exists for the period yet.
    pub status: Option<ClosureStatus>,
    pub totals: Totals,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClosureDetails {
    pub closure: MonthlyClosure,
    pub transactions: Vec<Transaction>,
    /// Snapshots of the fixed expenses carried into this period.
    pub carried_in: Vec<FixedExpenseSnapshot>,
}

impl Engine {
    /// Materialize the recurring templates of a workspace for `period`.
    /// Returns only the transactions created by this call.
    pub async fn expand_recurring(
        &self,
        workspace_id: Uuid,
        period: Period,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<Transaction>> {
        let _guard = self.lock_workspace(workspace_id).await?;
        with_tx!(self, |db_tx| {
            let store = SqlLedger::new(&db_tx);
            store.workspace(workspace_id).await?;
            MonthlyClosureManager::new(&store)
                .ensure_writable(workspace_id, period.first_day()?)
                .await?;
            let outcome = RecurrenceExpander::new(&store)
                .expand_all(workspace_id, period, now)
                .await?;
            if !outcome.created.is_empty() {
                info!(%workspace_id, %period, created = outcome.created.len(), "recurring expanded");
            }
            Ok(outcome.created)
        })
    }

    /// Close the open `period` of a workspace.
    ///
    /// All or nothing: the expansion, the sealing, the next period and the
    /// carried expenses commit together.
    pub async fn close_month(
        &self,
        workspace_id: Uuid,
        period: Period,
        now: DateTime<Utc>,
    ) -> ResultEngine<ClosedMonth> {
        let _guard = self.lock_workspace(workspace_id).await?;
        self.close_locked(workspace_id, period, now).await
    }

    async fn close_locked(
        &self,
        workspace_id: Uuid,
        period: Period,
        now: DateTime<Utc>,
    ) -> ResultEngine<ClosedMonth> {
        with_tx!(self, |db_tx| {
            let store = SqlLedger::new(&db_tx);
            MonthlyClosureManager::new(&store)
                .close(workspace_id, period, now)
                .await
        })
    }

    pub async fn current_open_period(&self, workspace_id: Uuid) -> ResultEngine<MonthlyClosure> {
        with_tx!(self, |db_tx| {
            let store = SqlLedger::new(&db_tx);
            MonthlyClosureManager::new(&store)
                .current_open(workspace_id)
                .await
        })
    }

    /// Close every open period that precedes `today`'s month, oldest first.
    /// Each period commits on its own, so a failure keeps the months already
    /// closed.
    pub async fn roll_over(
        &self,
        workspace_id: Uuid,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<ClosedMonth>> {
        let current = Period::containing(today);
        let _guard = self.lock_workspace(workspace_id).await?;
        let mut closed = Vec::new();
        loop {
            let open = self.current_open_period(workspace_id).await?;
            if open.period >= current {
                break;
            }
            let month = self.close_locked(workspace_id, open.period, now).await?;
            info!(%workspace_id, period = %month.closure.period, "rolled over");
            closed.push(month);
        }
        Ok(closed)
    }

    /// Re-run the carry-forward of a closed period into its successor.
    /// Returns only the snapshots created by this call.
    pub async fn carry_forward_fixed_expenses(
        &self,
        workspace_id: Uuid,
        closed_period: Period,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<FixedExpenseSnapshot>> {
        let _guard = self.lock_workspace(workspace_id).await?;
        with_tx!(self, |db_tx| {
            let store = SqlLedger::new(&db_tx);
            let closed = store
                .closure_for(workspace_id, closed_period)
                .await?
                .ok_or_else(|| {
                    EngineError::InvalidPeriod(format!("{closed_period} has no closure"))
                })?;
            let next_period = closed_period.next()?;
            let next = store
                .closure_for(workspace_id, next_period)
                .await?
                .ok_or_else(|| {
                    EngineError::InvalidPeriod(format!("{next_period} has no closure"))
                })?;
            FixedExpenseCarryForward::new(&store)
                .carry_forward(&closed, &next, now)
                .await
        })
    }

    /// Totals of `period`. A closed period reports the totals frozen at close.
    pub async fn period_summary(
        &self,
        workspace_id: Uuid,
        period: Period,
    ) -> ResultEngine<PeriodSummary> {
        with_tx!(self, |db_tx| {
            let store = SqlLedger::new(&db_tx);
            let closure = store.closure_for(workspace_id, period).await?;
            let totals = match &closure {
                Some(closure) if !closure.is_open() => closure.totals(),
                _ => {
                    let transactions = store
                        .transactions_between(
                            workspace_id,
                            period.first_day()?,
                            period.last_day()?,
                        )
                        .await?;
                    aggregate(&transactions)?
                }
            };
            Ok(PeriodSummary {
                period,
                status: closure.map(|closure| closure.status),
                totals,
            })
        })
    }

    /// Closed periods of a workspace, newest first.
    pub async fn closure_history(&self, workspace_id: Uuid) -> ResultEngine<Vec<MonthlyClosure>> {
        with_tx!(self, |db_tx| {
            SqlLedger::new(&db_tx).closed_closures(workspace_id).await
        })
    }

    pub async fn closure_details(
        &self,
        workspace_id: Uuid,
        closure_id: Uuid,
    ) -> ResultEngine<ClosureDetails> {
        with_tx!(self, |db_tx| {
            let store = SqlLedger::new(&db_tx);
            let closure = store.closure(workspace_id, closure_id).await?;
            let transactions = store
                .transactions_between(
                    workspace_id,
                    closure.period.first_day()?,
                    closure.period.last_day()?,
                )
                .await?;
            let carried_in = store.snapshots_into(closure.id).await?;
            Ok(ClosureDetails {
                closure,
                transactions,
                carried_in,
            })
        })
    }
}
