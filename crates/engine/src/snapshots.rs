//! Fixed-expense snapshots: the immutable record of a fixed expense carried
//! from a closed month into the next one.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, Transaction,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedExpenseSnapshot {
    pub id: Uuid,
    /// Destination closure (the period the expense was carried into).
    pub closure_id: Uuid,
    /// `None` once the source transaction has been deleted.
    pub source_transaction_id: Option<Uuid>,
    pub carried_transaction_id: Uuid,
    pub description: String,
    pub amount: MoneyCents,
    pub category_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl FixedExpenseSnapshot {
    pub fn capture(
        source: &Transaction,
        closure_id: Uuid,
        carried_transaction_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            closure_id,
            source_transaction_id: Some(source.id),
            carried_transaction_id,
            description: source.description.clone(),
            amount: source.amount,
            category_id: source.category_id,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "fixed_expense_snapshots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub closure_id: String,
    pub source_transaction_id: Option<String>,
    pub carried_transaction_id: String,
    pub description: String,
    pub amount_minor: i64,
    pub category_id: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::closures::Entity",
        from = "Column::ClosureId",
        to = "super::closures::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Closure,
}

impl Related<super::closures::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Closure.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&FixedExpenseSnapshot> for ActiveModel {
    fn from(snapshot: &FixedExpenseSnapshot) -> Self {
        Self {
            id: ActiveValue::Set(snapshot.id.to_string()),
            closure_id: ActiveValue::Set(snapshot.closure_id.to_string()),
            source_transaction_id: ActiveValue::Set(
                snapshot.source_transaction_id.map(|id| id.to_string()),
            ),
            carried_transaction_id: ActiveValue::Set(snapshot.carried_transaction_id.to_string()),
            description: ActiveValue::Set(snapshot.description.clone()),
            amount_minor: ActiveValue::Set(snapshot.amount.cents()),
            category_id: ActiveValue::Set(snapshot.category_id.to_string()),
            created_at: ActiveValue::Set(snapshot.created_at),
        }
    }
}

impl TryFrom<Model> for FixedExpenseSnapshot {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "snapshot")?,
            closure_id: parse_uuid(&model.closure_id, "closure")?,
            source_transaction_id: parse_optional_uuid(
                model.source_transaction_id.as_deref(),
                "transaction",
            )?,
            carried_transaction_id: parse_uuid(&model.carried_transaction_id, "transaction")?,
            description: model.description,
            amount: MoneyCents::new(model.amount_minor),
            category_id: parse_uuid(&model.category_id, "category")?,
            created_at: model.created_at,
        })
    }
}
