//! Template expansion: turning a recurring template into concrete transactions
//! for one period.
//!
//! Every occurrence has an idempotency key derived from the schedule and the
//! occurrence date only (`YYYY-MM` monthly, `YYYY` yearly, ISO week `YYYY-Www`
//! weekly). The store refuses a second transaction for the same
//! `(template, key)`, so expanding the same period any number of times yields
//! one instance per occurrence.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::{
    EngineError, Period, RecurringTemplate, ResultEngine, Schedule, Transaction, TransactionKind,
    store::LedgerStore,
};

/// One date a schedule fires on inside a period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Occurrence {
    pub date: NaiveDate,
    pub key: String,
}

/// The occurrences of `schedule` in `period`, in date order. Empty when the
/// schedule is not due this period (a yearly template in another month).
pub fn occurrences(schedule: Schedule, period: Period) -> ResultEngine<Vec<Occurrence>> {
    let dates = match schedule {
        Schedule::Monthly { day } => vec![period.clamped_day(day)?],
        Schedule::Yearly { month, day } => {
            if month != period.month() {
                return Ok(Vec::new());
            }
            vec![period.clamped_day(day)?]
        }
        Schedule::Weekly { weekday } => {
            let last = period.last_day()?;
            period
                .first_day()?
                .iter_days()
                .take_while(|date| *date <= last)
                .filter(|date| date.weekday() == weekday)
                .collect()
        }
    };
    Ok(dates
        .into_iter()
        .map(|date| Occurrence {
            key: occurrence_key(schedule, date),
            date,
        })
        .collect())
}

#[must_use]
pub fn occurrence_key(schedule: Schedule, date: NaiveDate) -> String {
    match schedule {
        Schedule::Monthly { .. } => format!("{:04}-{:02}", date.year(), date.month()),
        Schedule::Yearly { .. } => format!("{:04}", date.year()),
        Schedule::Weekly { .. } => {
            let week = date.iso_week();
            format!("{:04}-W{:02}", week.year(), week.week())
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Inactive,
    OutsideWindow,
    NotDue,
    CategoryInactive,
    Excluded,
    AlreadyMaterialized,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedOccurrence {
    pub template_id: Uuid,
    /// `None` when the whole template was skipped for the period.
    pub occurrence_key: Option<String>,
    pub reason: SkipReason,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExpansionOutcome {
    pub created: Vec<Transaction>,
    pub skipped: Vec<SkippedOccurrence>,
}

impl ExpansionOutcome {
    fn skip(&mut self, template_id: Uuid, occurrence_key: Option<String>, reason: SkipReason) {
        debug!(%template_id, ?occurrence_key, ?reason, "occurrence skipped");
        self.skipped.push(SkippedOccurrence {
            template_id,
            occurrence_key,
            reason,
        });
    }

    fn merge(&mut self, other: Self) {
        self.created.extend(other.created);
        self.skipped.extend(other.skipped);
    }
}

pub struct RecurrenceExpander<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> RecurrenceExpander<'a, S>
where
    S: LedgerStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Materializes the missing occurrences of `template` in `period`.
    ///
    /// Fails with `CategoryMismatch` if the template's category has the other
    /// kind; every other reason not to create an instance is reported in
    /// `skipped`.
    pub async fn expand(
        &self,
        template: &RecurringTemplate,
        period: Period,
        now: DateTime<Utc>,
    ) -> ResultEngine<ExpansionOutcome> {
        let mut outcome = ExpansionOutcome::default();
        if !template.active {
            outcome.skip(template.id, None, SkipReason::Inactive);
            return Ok(outcome);
        }
        if !template.window_overlaps(period)? {
            outcome.skip(template.id, None, SkipReason::OutsideWindow);
            return Ok(outcome);
        }
        let occurrences = occurrences(template.schedule, period)?;
        if occurrences.is_empty() {
            outcome.skip(template.id, None, SkipReason::NotDue);
            return Ok(outcome);
        }

        let category = self
            .store
            .category(template.workspace_id, template.category_id)
            .await?;
        category.ensure_kind(template.kind)?;
        if !category.active {
            outcome.skip(template.id, None, SkipReason::CategoryInactive);
            return Ok(outcome);
        }

        for occurrence in occurrences {
            if !template.window_contains(occurrence.date) {
                outcome.skip(
                    template.id,
                    Some(occurrence.key),
                    SkipReason::OutsideWindow,
                );
                continue;
            }
            if self.store.is_excluded(template.id, &occurrence.key).await? {
                outcome.skip(template.id, Some(occurrence.key), SkipReason::Excluded);
                continue;
            }
            if self
                .store
                .generated_exists(template.id, &occurrence.key)
                .await?
            {
                outcome.skip(
                    template.id,
                    Some(occurrence.key),
                    SkipReason::AlreadyMaterialized,
                );
                continue;
            }

            let tx = instantiate(template, &occurrence, now);
            match self.store.insert_generated(&tx).await {
                Ok(()) => outcome.created.push(tx),
                Err(EngineError::DuplicateExpansion(reason)) => {
                    debug!(%reason, "lost expansion race, keeping existing instance");
                    outcome.skip(
                        template.id,
                        Some(occurrence.key),
                        SkipReason::AlreadyMaterialized,
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(outcome)
    }

    /// Expands every active template of the workspace, oldest template first.
    pub async fn expand_all(
        &self,
        workspace_id: Uuid,
        period: Period,
        now: DateTime<Utc>,
    ) -> ResultEngine<ExpansionOutcome> {
        let mut outcome = ExpansionOutcome::default();
        for template in self.store.active_templates(workspace_id).await? {
            outcome.merge(self.expand(&template, period, now).await?);
        }
        Ok(outcome)
    }
}

fn instantiate(
    template: &RecurringTemplate,
    occurrence: &Occurrence,
    now: DateTime<Utc>,
) -> Transaction {
    let mut tx = Transaction::new(
        template.workspace_id,
        template.category_id,
        template.description.clone(),
        template.amount,
        template.kind,
        occurrence.date,
        now,
    );
    tx.is_fixed = template.kind == TransactionKind::Expense;
    tx.template_id = Some(template.id);
    tx.occurrence_key = Some(occurrence.key.clone());
    tx.notes = template.notes.clone();
    tx
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(y: i32, m: u32) -> Period {
        Period::new(y, m).unwrap()
    }

    #[test]
    fn monthly_clamps_to_short_months() {
        let schedule = Schedule::monthly(31).unwrap();
        let occ = occurrences(schedule, period(2025, 4)).unwrap();
        assert_eq!(
            occ,
            vec![Occurrence {
                date: date(2025, 4, 30),
                key: "2025-04".to_string()
            }]
        );
        let occ = occurrences(schedule, period(2024, 2)).unwrap();
        assert_eq!(occ[0].date, date(2024, 2, 29));
    }

    #[test]
    fn monthly_key_ignores_the_anchor_day() {
        let a = occurrences(Schedule::monthly(5).unwrap(), period(2025, 2)).unwrap();
        let b = occurrences(Schedule::monthly(20).unwrap(), period(2025, 2)).unwrap();
        assert_eq!(a[0].key, b[0].key);
        assert_ne!(a[0].date, b[0].date);
    }

    #[test]
    fn yearly_only_fires_in_its_month() {
        let schedule = Schedule::yearly(2, 29).unwrap();
        assert!(occurrences(schedule, period(2025, 3)).unwrap().is_empty());
        let occ = occurrences(schedule, period(2025, 2)).unwrap();
        assert_eq!(occ[0].date, date(2025, 2, 28));
        assert_eq!(occ[0].key, "2025");
    }

    #[test]
    fn weekly_fires_on_every_matching_weekday() {
        let occ = occurrences(Schedule::weekly(Weekday::Mon), period(2025, 2)).unwrap();
        let dates: Vec<_> = occ.iter().map(|o| o.date).collect();
        assert_eq!(
            dates,
            vec![
                date(2025, 2, 3),
                date(2025, 2, 10),
                date(2025, 2, 17),
                date(2025, 2, 24)
            ]
        );
        let keys: Vec<_> = occ.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["2025-W06", "2025-W07", "2025-W08", "2025-W09"]);
    }

    #[test]
    fn weekly_key_uses_the_iso_year() {
        let occ = occurrences(Schedule::weekly(Weekday::Mon), period(2025, 12)).unwrap();
        assert_eq!(occ.len(), 5);
        assert_eq!(occ[0].key, "2025-W49");
        assert_eq!(occ[4].date, date(2025, 12, 29));
        assert_eq!(occ[4].key, "2026-W01");
    }
}
