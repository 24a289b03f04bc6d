//! Workspaces: the personal or family accounting context everything else
//! belongs to.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Workspace {
    pub fn new(name: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            active: true,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "workspaces")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::categories::Entity")]
    Categories,
    #[sea_orm(has_many = "super::closures::Entity")]
    Closures,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl Related<super::closures::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Closures.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Workspace> for ActiveModel {
    fn from(workspace: &Workspace) -> Self {
        Self {
            id: ActiveValue::Set(workspace.id.to_string()),
            name: ActiveValue::Set(workspace.name.clone()),
            active: ActiveValue::Set(workspace.active),
            created_at: ActiveValue::Set(workspace.created_at),
        }
    }
}

impl TryFrom<Model> for Workspace {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "workspace")?,
            name: model.name,
            active: model.active,
            created_at: model.created_at,
        })
    }
}
