//! Occurrences of a template that were removed on purpose and must not be
//! generated again.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recurrence_exclusions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub workspace_id: String,
    pub template_id: String,
    pub occurrence_key: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn new_exclusion(
    workspace_id: Uuid,
    template_id: Uuid,
    occurrence_key: &str,
    created_at: DateTime<Utc>,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::Set(Uuid::new_v4().to_string()),
        workspace_id: ActiveValue::Set(workspace_id.to_string()),
        template_id: ActiveValue::Set(template_id.to_string()),
        occurrence_key: ActiveValue::Set(occurrence_key.to_string()),
        created_at: ActiveValue::Set(created_at),
    }
}
