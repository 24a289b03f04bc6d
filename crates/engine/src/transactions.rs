//! Transaction primitives.
//!
//! A `Transaction` is a concrete financial event dated inside one period. It is
//! entered by hand, generated from a recurring template, or carried forward
//! from a closed month as a fixed expense.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::InvalidKind(format!(
                "unknown transaction kind {other:?}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub category_id: Uuid,
    pub description: String,
    pub amount: MoneyCents,
    pub kind: TransactionKind,
    pub occurred_on: NaiveDate,
    pub is_paid: bool,
    pub paid_on: Option<NaiveDate>,
    pub is_fixed: bool,
    /// Set on the mirrors a month closure carries into the next period.
    pub is_auto_loaded: bool,
    pub template_id: Option<Uuid>,
    /// Idempotency key of a generated instance, unique per template.
    pub occurrence_key: Option<String>,
    pub closure_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        workspace_id: Uuid,
        category_id: Uuid,
        description: String,
        amount: MoneyCents,
        kind: TransactionKind,
        occurred_on: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            category_id,
            description,
            amount,
            kind,
            occurred_on,
            is_paid: false,
            paid_on: None,
            is_fixed: false,
            is_auto_loaded: false,
            template_id: None,
            occurrence_key: None,
            closure_id: None,
            notes: None,
            created_at,
        }
    }

    #[must_use]
    pub fn is_fixed_expense(&self) -> bool {
        self.is_fixed && self.kind == TransactionKind::Expense
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub workspace_id: String,
    pub category_id: String,
    pub description: String,
    pub amount_minor: i64,
    pub kind: String,
    pub occurred_on: Date,
    pub is_paid: bool,
    pub paid_on: Option<Date>,
    pub is_fixed: bool,
    pub is_auto_loaded: bool,
    pub template_id: Option<String>,
    pub occurrence_key: Option<String>,
    pub closure_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            workspace_id: ActiveValue::Set(tx.workspace_id.to_string()),
            category_id: ActiveValue::Set(tx.category_id.to_string()),
            description: ActiveValue::Set(tx.description.clone()),
            amount_minor: ActiveValue::Set(tx.amount.cents()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            occurred_on: ActiveValue::Set(tx.occurred_on),
            is_paid: ActiveValue::Set(tx.is_paid),
            paid_on: ActiveValue::Set(tx.paid_on),
            is_fixed: ActiveValue::Set(tx.is_fixed),
            is_auto_loaded: ActiveValue::Set(tx.is_auto_loaded),
            template_id: ActiveValue::Set(tx.template_id.map(|id| id.to_string())),
            occurrence_key: ActiveValue::Set(tx.occurrence_key.clone()),
            closure_id: ActiveValue::Set(tx.closure_id.map(|id| id.to_string())),
            notes: ActiveValue::Set(tx.notes.clone()),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            workspace_id: parse_uuid(&model.workspace_id, "workspace")?,
            category_id: parse_uuid(&model.category_id, "category")?,
            description: model.description,
            amount: MoneyCents::new(model.amount_minor),
            kind: TransactionKind::try_from(model.kind.as_str())?,
            occurred_on: model.occurred_on,
            is_paid: model.is_paid,
            paid_on: model.paid_on,
            is_fixed: model.is_fixed,
            is_auto_loaded: model.is_auto_loaded,
            template_id: parse_optional_uuid(model.template_id.as_deref(), "template")?,
            occurrence_key: model.occurrence_key,
            closure_id: parse_optional_uuid(model.closure_id.as_deref(), "closure")?,
            notes: model.notes,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_storage_names() {
        for kind in [TransactionKind::Income, TransactionKind::Expense] {
            assert_eq!(TransactionKind::try_from(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_is_rejected_as_a_kind() {
        assert_eq!(
            TransactionKind::try_from("transfer"),
            Err(EngineError::InvalidKind(
                "unknown transaction kind \"transfer\"".to_string()
            ))
        );
    }
}
