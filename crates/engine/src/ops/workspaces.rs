use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

use crate::{
    EngineError, MonthlyClosure, Period, ResultEngine, Workspace, closures,
    store::{LedgerStore, SqlLedger},
    util::normalize_required_name,
    workspaces,
};

use super::{Engine, with_tx};

impl Engine {
    /// Create a workspace together with the open closure of `opening_period`.
    pub async fn create_workspace(
        &self,
        name: &str,
        opening_period: Period,
        now: DateTime<Utc>,
    ) -> ResultEngine<Workspace> {
        let name = normalize_required_name(name, "workspace")?;
        let workspace = Workspace::new(name, now);
        with_tx!(self, |db_tx| {
            workspaces::ActiveModel::from(&workspace)
                .insert(&db_tx)
                .await?;
            closures::ActiveModel::from(&MonthlyClosure::open(workspace.id, opening_period, now))
                .insert(&db_tx)
                .await?;
            info!(workspace_id = %workspace.id, %opening_period, "workspace created");
            Ok(workspace)
        })
    }

    /// Return a workspace from DB.
    pub async fn workspace(&self, workspace_id: Uuid) -> ResultEngine<Workspace> {
        with_tx!(self, |db_tx| {
            SqlLedger::new(&db_tx).workspace(workspace_id).await
        })
    }

    /// Workspaces are never deleted; a deactivated one is ignored by the
    /// scheduler.
    pub async fn deactivate_workspace(&self, workspace_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = workspaces::Entity::find_by_id(workspace_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("workspace not exists".to_string()))?;
            let mut active: workspaces::ActiveModel = model.into();
            active.active = ActiveValue::Set(false);
            active.update(&db_tx).await?;
            info!(%workspace_id, "workspace deactivated");
            Ok(())
        })
    }

    pub async fn active_workspaces(&self) -> ResultEngine<Vec<Workspace>> {
        with_tx!(self, |db_tx| {
            workspaces::Entity::find()
                .filter(workspaces::Column::Active.eq(true))
                .order_by_asc(workspaces::Column::CreatedAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Workspace::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
