//! The open → closed state machine of a workspace's monthly periods.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    EngineError, FixedExpenseSnapshot, MonthlyClosure, Period, ResultEngine, Transaction,
    aggregate, carry_forward::FixedExpenseCarryForward, recurrence::RecurrenceExpander,
    store::LedgerStore,
};

/// Everything a successful `close` produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClosedMonth {
    /// The sealed closure with its frozen totals.
    pub closure: MonthlyClosure,
    /// The open closure of the following period.
    pub next_period: MonthlyClosure,
    /// Instances the safety-net expansion had to create before sealing.
    pub expanded: Vec<Transaction>,
    pub carried: Vec<FixedExpenseSnapshot>,
}

pub struct MonthlyClosureManager<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> MonthlyClosureManager<'a, S>
where
    S: LedgerStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn current_open(&self, workspace_id: Uuid) -> ResultEngine<MonthlyClosure> {
        self.store
            .open_closure(workspace_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("open period not exists".to_string()))
    }

    /// Fails with `PeriodClosed` when `date` falls in a closed period.
    pub async fn ensure_writable(&self, workspace_id: Uuid, date: NaiveDate) -> ResultEngine<()> {
        let period = Period::containing(date);
        match self.store.closure_for(workspace_id, period).await? {
            Some(closure) if !closure.is_open() => Err(EngineError::PeriodClosed(format!(
                "{period} is closed"
            ))),
            _ => Ok(()),
        }
    }

    /// Seals `period`, opens its successor and carries fixed expenses forward.
    ///
    /// `period` must be the workspace's open period. Sealing is conditional on
    /// the row still being open, so two concurrent closers cannot both win.
    pub async fn close(
        &self,
        workspace_id: Uuid,
        period: Period,
        now: DateTime<Utc>,
    ) -> ResultEngine<ClosedMonth> {
        let closure = match self.store.closure_for(workspace_id, period).await? {
            Some(closure) if closure.is_open() => closure,
            Some(_) => return Err(EngineError::AlreadyClosed(period.to_string())),
            None => {
                return Err(EngineError::InvalidPeriod(format!(
                    "{period} is not the open period"
                )));
            }
        };

        let expanded = RecurrenceExpander::new(self.store)
            .expand_all(workspace_id, period, now)
            .await?
            .created;

        let transactions = self
            .store
            .transactions_between(workspace_id, period.first_day()?, period.last_day()?)
            .await?;
        let sealed = closure.sealed(aggregate(&transactions)?, now);
        if !self.store.seal_closure(&sealed).await? {
            return Err(EngineError::ConcurrencyConflict(format!(
                "{period} was closed concurrently"
            )));
        }
        self.store
            .stamp_closure(workspace_id, period, sealed.id)
            .await?;

        let next_period = self.open_next(&sealed, now).await?;
        let carried = FixedExpenseCarryForward::new(self.store)
            .carry_forward(&sealed, &next_period, now)
            .await?;

        info!(
            %workspace_id,
            %period,
            income = %sealed.total_income,
            expense = %sealed.total_expense,
            balance = %sealed.balance,
            expanded = expanded.len(),
            carried = carried.len(),
            "period closed"
        );
        Ok(ClosedMonth {
            closure: sealed,
            next_period,
            expanded,
            carried,
        })
    }

    async fn open_next(
        &self,
        closed: &MonthlyClosure,
        now: DateTime<Utc>,
    ) -> ResultEngine<MonthlyClosure> {
        let period = closed.period.next()?;
        match self.store.closure_for(closed.workspace_id, period).await? {
            Some(next) if next.is_open() => Ok(next),
            Some(_) => Err(EngineError::AlreadyClosed(period.to_string())),
            None => {
                let next = MonthlyClosure::open(closed.workspace_id, period, now);
                self.store.insert_closure(&next).await?;
                Ok(next)
            }
        }
    }
}
