//! Monthly closures: one row per workspace and period.
//!
//! An open closure is the workspace's current period. A closed one is a frozen
//! snapshot of the month's totals and is never reopened.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, Period, Totals,
    util::{model_period, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureStatus {
    Open,
    Closed,
}

impl ClosureStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl TryFrom<&str> for ClosureStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(EngineError::InvalidPeriod(format!(
                "invalid closure status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyClosure {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub period: Period,
    pub status: ClosureStatus,
    pub total_income: MoneyCents,
    pub total_expense: MoneyCents,
    pub balance: MoneyCents,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl MonthlyClosure {
    /// A fresh open period with zero totals.
    pub fn open(workspace_id: Uuid, period: Period, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            period,
            status: ClosureStatus::Open,
            total_income: MoneyCents::ZERO,
            total_expense: MoneyCents::ZERO,
            balance: MoneyCents::ZERO,
            closed_at: None,
            created_at,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == ClosureStatus::Open
    }

    /// The closed version of this closure, freezing `totals`.
    #[must_use]
    pub fn sealed(&self, totals: Totals, closed_at: DateTime<Utc>) -> Self {
        Self {
            status: ClosureStatus::Closed,
            total_income: totals.income,
            total_expense: totals.expense,
            balance: totals.balance,
            closed_at: Some(closed_at),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn totals(&self) -> Totals {
        Totals {
            income: self.total_income,
            expense: self.total_expense,
            balance: self.balance,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "monthly_closures")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub workspace_id: String,
    pub year: i32,
    pub month: i32,
    pub status: String,
    pub total_income_minor: i64,
    pub total_expense_minor: i64,
    pub balance_minor: i64,
    pub closed_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::workspaces::Entity",
        from = "Column::WorkspaceId",
        to = "super::workspaces::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Workspace,
    #[sea_orm(has_many = "super::snapshots::Entity")]
    Snapshots,
}

impl Related<super::workspaces::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Workspace.def()
    }
}

impl Related<super::snapshots::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Snapshots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&MonthlyClosure> for ActiveModel {
    fn from(closure: &MonthlyClosure) -> Self {
        Self {
            id: ActiveValue::Set(closure.id.to_string()),
            workspace_id: ActiveValue::Set(closure.workspace_id.to_string()),
            year: ActiveValue::Set(closure.period.year()),
            month: ActiveValue::Set(i32::try_from(closure.period.month()).unwrap_or_default()),
            status: ActiveValue::Set(closure.status.as_str().to_string()),
            total_income_minor: ActiveValue::Set(closure.total_income.cents()),
            total_expense_minor: ActiveValue::Set(closure.total_expense.cents()),
            balance_minor: ActiveValue::Set(closure.balance.cents()),
            closed_at: ActiveValue::Set(closure.closed_at),
            created_at: ActiveValue::Set(closure.created_at),
        }
    }
}

impl TryFrom<Model> for MonthlyClosure {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "closure")?,
            workspace_id: parse_uuid(&model.workspace_id, "workspace")?,
            period: model_period(model.year, model.month)?,
            status: ClosureStatus::try_from(model.status.as_str())?,
            total_income: MoneyCents::new(model.total_income_minor),
            total_expense: MoneyCents::new(model.total_expense_minor),
            balance: MoneyCents::new(model.balance_minor),
            closed_at: model.closed_at,
            created_at: model.created_at,
        })
    }
}
