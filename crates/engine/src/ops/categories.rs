use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Category, EngineError, ResultEngine, TransactionKind, categories,
    store::{LedgerStore, SqlLedger},
    util::normalize_required_name,
};

use super::{Engine, with_tx};

impl Engine {
    /// Add a category to a workspace. Names are unique among the active
    /// categories of a workspace, case-insensitively.
    pub async fn create_category(
        &self,
        workspace_id: Uuid,
        name: &str,
        kind: TransactionKind,
    ) -> ResultEngine<Category> {
        let name = normalize_required_name(name, "category")?;
        with_tx!(self, |db_tx| {
            SqlLedger::new(&db_tx).workspace(workspace_id).await?;

            let existing = categories::Entity::find()
                .filter(categories::Column::WorkspaceId.eq(workspace_id.to_string()))
                .filter(categories::Column::Active.eq(true))
                .all(&db_tx)
                .await?;
            if existing
                .iter()
                .any(|model| model.name.to_lowercase() == name.to_lowercase())
            {
                return Err(EngineError::InvalidName(format!(
                    "category '{name}' already exists"
                )));
            }

            let category = Category::new(workspace_id, name, kind);
            categories::ActiveModel::from(&category)
                .insert(&db_tx)
                .await?;
            Ok(category)
        })
    }

    /// The `{kind, active}` lookup used by expansion and validation.
    pub async fn category(&self, workspace_id: Uuid, category_id: Uuid) -> ResultEngine<Category> {
        with_tx!(self, |db_tx| {
            SqlLedger::new(&db_tx)
                .category(workspace_id, category_id)
                .await
        })
    }

    pub async fn categories(&self, workspace_id: Uuid) -> ResultEngine<Vec<Category>> {
        with_tx!(self, |db_tx| {
            categories::Entity::find()
                .filter(categories::Column::WorkspaceId.eq(workspace_id.to_string()))
                .order_by_asc(categories::Column::Name)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Category::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Templates filed under an inactive category stop expanding; existing
    /// transactions keep it.
    pub async fn deactivate_category(
        &self,
        workspace_id: Uuid,
        category_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = categories::Entity::find_by_id(category_id.to_string())
                .filter(categories::Column::WorkspaceId.eq(workspace_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))?;
            let mut active: categories::ActiveModel = model.into();
            active.active = ActiveValue::Set(false);
            active.update(&db_tx).await?;
            Ok(())
        })
    }
}
