//! Recurring templates (salary, rent, subscriptions...).
//!
//! A template never touches past periods by itself: editing it only changes
//! what future expansions produce.

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, Period, ResultEngine, TransactionKind, util::parse_uuid,
};

const MONTHLY: &str = "monthly";
const WEEKLY: &str = "weekly";
const YEARLY: &str = "yearly";

/// When a template fires. The anchor is part of the variant, so a weekly
/// template cannot carry a day of month and vice versa.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frequency", rename_all = "snake_case")]
pub enum Schedule {
    /// Day of month; days past the end of a short month clamp to its last day.
    Monthly { day: u32 },
    Weekly { weekday: Weekday },
    Yearly { month: u32, day: u32 },
}

impl Schedule {
    pub fn monthly(day: u32) -> ResultEngine<Self> {
        let schedule = Self::Monthly { day };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn weekly(weekday: Weekday) -> Self {
        Self::Weekly { weekday }
    }

    pub fn yearly(month: u32, day: u32) -> ResultEngine<Self> {
        let schedule = Self::Yearly { month, day };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn frequency(&self) -> &'static str {
        match self {
            Self::Monthly { .. } => MONTHLY,
            Self::Weekly { .. } => WEEKLY,
            Self::Yearly { .. } => YEARLY,
        }
    }

    pub(crate) fn validate(&self) -> ResultEngine<()> {
        match *self {
            Self::Monthly { day } => ensure_day_of_month(day),
            Self::Weekly { .. } => Ok(()),
            Self::Yearly { month, day } => {
                if !(1..=12).contains(&month) {
                    return Err(EngineError::InvalidTemplate(format!(
                        "month must be within 1..=12, got {month}"
                    )));
                }
                ensure_day_of_month(day)
            }
        }
    }

    fn from_columns(
        frequency: &str,
        day_of_month: Option<i32>,
        day_of_week: Option<i32>,
        month_of_year: Option<i32>,
    ) -> ResultEngine<Self> {
        let column = |value: Option<i32>, name: &str| -> ResultEngine<u32> {
            value
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| EngineError::InvalidTemplate(format!("{frequency} needs {name}")))
        };
        let schedule = match frequency {
            MONTHLY => Self::Monthly {
                day: column(day_of_month, "day_of_month")?,
            },
            WEEKLY => {
                let index = column(day_of_week, "day_of_week")?;
                let weekday = u8::try_from(index)
                    .ok()
                    .and_then(|i| Weekday::try_from(i).ok())
                    .ok_or_else(|| {
                        EngineError::InvalidTemplate(format!("invalid day_of_week {index}"))
                    })?;
                Self::Weekly { weekday }
            }
            YEARLY => Self::Yearly {
                month: column(month_of_year, "month_of_year")?,
                day: column(day_of_month, "day_of_month")?,
            },
            other => {
                return Err(EngineError::InvalidTemplate(format!(
                    "invalid frequency: {other}"
                )));
            }
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// `(day_of_month, day_of_week, month_of_year)` columns; weekdays are
    /// stored Monday = 0.
    fn to_columns(self) -> (Option<i32>, Option<i32>, Option<i32>) {
        let to_i32 = |v: u32| i32::try_from(v).ok();
        match self {
            Self::Monthly { day } => (to_i32(day), None, None),
            Self::Weekly { weekday } => (None, to_i32(weekday.num_days_from_monday()), None),
            Self::Yearly { month, day } => (to_i32(day), None, to_i32(month)),
        }
    }
}

fn ensure_day_of_month(day: u32) -> ResultEngine<()> {
    if !(1..=31).contains(&day) {
        return Err(EngineError::InvalidTemplate(format!(
            "day must be within 1..=31, got {day}"
        )));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringTemplate {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub category_id: Uuid,
    pub description: String,
    pub amount: MoneyCents,
    pub kind: TransactionKind,
    pub schedule: Schedule,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringTemplate {
    /// Whether any day of `period` lies inside `[start_date, end_date]`.
    pub fn window_overlaps(&self, period: Period) -> ResultEngine<bool> {
        let (first, last) = (period.first_day()?, period.last_day()?);
        Ok(self.start_date <= last && self.end_date.is_none_or(|end| end >= first))
    }

    #[must_use]
    pub fn window_contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.is_none_or(|end| date <= end)
    }

    pub(crate) fn validate(&self) -> ResultEngine<()> {
        self.schedule.validate()?;
        if let Some(end) = self.end_date
            && end < self.start_date
        {
            return Err(EngineError::InvalidTemplate(format!(
                "end_date {end} precedes start_date {}",
                self.start_date
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recurring_templates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub workspace_id: String,
    pub category_id: String,
    pub description: String,
    pub amount_minor: i64,
    pub kind: String,
    pub frequency: String,
    pub day_of_month: Option<i32>,
    pub day_of_week: Option<i32>,
    pub month_of_year: Option<i32>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub active: bool,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&RecurringTemplate> for ActiveModel {
    fn from(template: &RecurringTemplate) -> Self {
        let (day_of_month, day_of_week, month_of_year) = template.schedule.to_columns();
        Self {
            id: ActiveValue::Set(template.id.to_string()),
            workspace_id: ActiveValue::Set(template.workspace_id.to_string()),
            category_id: ActiveValue::Set(template.category_id.to_string()),
            description: ActiveValue::Set(template.description.clone()),
            amount_minor: ActiveValue::Set(template.amount.cents()),
            kind: ActiveValue::Set(template.kind.as_str().to_string()),
            frequency: ActiveValue::Set(template.schedule.frequency().to_string()),
            day_of_month: ActiveValue::Set(day_of_month),
            day_of_week: ActiveValue::Set(day_of_week),
            month_of_year: ActiveValue::Set(month_of_year),
            start_date: ActiveValue::Set(template.start_date),
            end_date: ActiveValue::Set(template.end_date),
            active: ActiveValue::Set(template.active),
            notes: ActiveValue::Set(template.notes.clone()),
            created_at: ActiveValue::Set(template.created_at),
            updated_at: ActiveValue::Set(template.updated_at),
        }
    }
}

impl TryFrom<Model> for RecurringTemplate {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "template")?,
            workspace_id: parse_uuid(&model.workspace_id, "workspace")?,
            category_id: parse_uuid(&model.category_id, "category")?,
            description: model.description,
            amount: MoneyCents::new(model.amount_minor),
            kind: TransactionKind::try_from(model.kind.as_str())?,
            schedule: Schedule::from_columns(
                model.frequency.as_str(),
                model.day_of_month,
                model.day_of_week,
                model.month_of_year,
            )?,
            start_date: model.start_date,
            end_date: model.end_date,
            active: model.active,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
