//! Category registry per workspace.
//!
//! A category's kind is fixed at creation: flipping it would reclassify every
//! transaction already filed under it.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, TransactionKind, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub kind: TransactionKind,
    pub active: bool,
}

impl Category {
    pub fn new(workspace_id: Uuid, name: String, kind: TransactionKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            name,
            kind,
            active: true,
        }
    }

    /// Fails with `CategoryMismatch` when `kind` disagrees with the category.
    pub fn ensure_kind(&self, kind: TransactionKind) -> ResultEngine<()> {
        if self.kind != kind {
            return Err(EngineError::CategoryMismatch(format!(
                "category '{}' is {}, got {}",
                self.name,
                self.kind.as_str(),
                kind.as_str()
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    pub kind: String,
    pub active: bool,
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
}

impl Related<super::workspaces::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Workspace.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Category> for ActiveModel {
    fn from(category: &Category) -> Self {
        Self {
            id: ActiveValue::Set(category.id.to_string()),
            workspace_id: ActiveValue::Set(category.workspace_id.to_string()),
            name: ActiveValue::Set(category.name.clone()),
            kind: ActiveValue::Set(category.kind.as_str().to_string()),
            active: ActiveValue::Set(category.active),
        }
    }
}

impl TryFrom<Model> for Category {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "category")?,
            workspace_id: parse_uuid(&model.workspace_id, "workspace")?,
            name: model.name,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            active: model.active,
        })
    }
}
