use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, prelude::*, sea_query::OnConflict,
};
use uuid::Uuid;

use crate::{
    Category, ClosureStatus, EngineError, FixedExpenseSnapshot, MonthlyClosure, Period,
    RecurringTemplate, ResultEngine, Transaction, Workspace, categories, closures, exclusions,
    snapshots, templates, transactions, workspaces,
};

use super::LedgerStore;

/// `LedgerStore` over any sea-orm connection; the engine hands it the open
/// `DatabaseTransaction` of the current operation.
pub struct SqlLedger<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> SqlLedger<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }
}

fn convert_all<M, T>(models: Vec<M>) -> ResultEngine<Vec<T>>
where
    T: TryFrom<M, Error = EngineError>,
{
    models.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl<C> LedgerStore for SqlLedger<'_, C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn workspace(&self, workspace_id: Uuid) -> ResultEngine<Workspace> {
        workspaces::Entity::find_by_id(workspace_id.to_string())
            .one(self.conn)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("workspace not exists".to_string()))?
            .try_into()
    }

    async fn category(&self, workspace_id: Uuid, category_id: Uuid) -> ResultEngine<Category> {
        categories::Entity::find_by_id(category_id.to_string())
            .filter(categories::Column::WorkspaceId.eq(workspace_id.to_string()))
            .one(self.conn)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))?
            .try_into()
    }

    async fn template(
        &self,
        workspace_id: Uuid,
        template_id: Uuid,
    ) -> ResultEngine<Option<RecurringTemplate>> {
        templates::Entity::find_by_id(template_id.to_string())
            .filter(templates::Column::WorkspaceId.eq(workspace_id.to_string()))
            .one(self.conn)
            .await?
            .map(RecurringTemplate::try_from)
            .transpose()
    }

    async fn active_templates(&self, workspace_id: Uuid) -> ResultEngine<Vec<RecurringTemplate>> {
        let models = templates::Entity::find()
            .filter(templates::Column::WorkspaceId.eq(workspace_id.to_string()))
            .filter(templates::Column::Active.eq(true))
            .order_by_asc(templates::Column::CreatedAt)
            .order_by_asc(templates::Column::Id)
            .all(self.conn)
            .await?;
        convert_all(models)
    }

    async fn transaction(
        &self,
        workspace_id: Uuid,
        transaction_id: Uuid,
    ) -> ResultEngine<Transaction> {
        transactions::Entity::find_by_id(transaction_id.to_string())
            .filter(transactions::Column::WorkspaceId.eq(workspace_id.to_string()))
            .one(self.conn)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?
            .try_into()
    }

    async fn transactions_between(
        &self,
        workspace_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultEngine<Vec<Transaction>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::WorkspaceId.eq(workspace_id.to_string()))
            .filter(transactions::Column::OccurredOn.between(from, to))
            .order_by_asc(transactions::Column::OccurredOn)
            .order_by_asc(transactions::Column::CreatedAt)
            .all(self.conn)
            .await?;
        convert_all(models)
    }

    async fn generated_exists(
        &self,
        template_id: Uuid,
        occurrence_key: &str,
    ) -> ResultEngine<bool> {
        Ok(transactions::Entity::find()
            .filter(transactions::Column::TemplateId.eq(template_id.to_string()))
            .filter(transactions::Column::OccurrenceKey.eq(occurrence_key))
            .one(self.conn)
            .await?
            .is_some())
    }

    async fn generated_in(
        &self,
        workspace_id: Uuid,
        template_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultEngine<Vec<Transaction>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::WorkspaceId.eq(workspace_id.to_string()))
            .filter(transactions::Column::TemplateId.eq(template_id.to_string()))
            .filter(transactions::Column::OccurredOn.between(from, to))
            .all(self.conn)
            .await?;
        convert_all(models)
    }

    async fn is_excluded(&self, template_id: Uuid, occurrence_key: &str) -> ResultEngine<bool> {
        Ok(exclusions::Entity::find()
            .filter(exclusions::Column::TemplateId.eq(template_id.to_string()))
            .filter(exclusions::Column::OccurrenceKey.eq(occurrence_key))
            .one(self.conn)
            .await?
            .is_some())
    }

    async fn insert_exclusion(
        &self,
        workspace_id: Uuid,
        template_id: Uuid,
        occurrence_key: &str,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        exclusions::Entity::insert(exclusions::new_exclusion(
            workspace_id,
            template_id,
            occurrence_key,
            created_at,
        ))
        .on_conflict(
            OnConflict::columns([
                exclusions::Column::TemplateId,
                exclusions::Column::OccurrenceKey,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(self.conn)
        .await?;
        Ok(())
    }

    async fn insert_transaction(&self, tx: &Transaction) -> ResultEngine<()> {
        transactions::ActiveModel::from(tx).insert(self.conn).await?;
        Ok(())
    }

    async fn insert_generated(&self, tx: &Transaction) -> ResultEngine<()> {
        let inserted = transactions::Entity::insert(transactions::ActiveModel::from(tx))
            .on_conflict(
                OnConflict::columns([
                    transactions::Column::TemplateId,
                    transactions::Column::OccurrenceKey,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await?;
        if inserted == 0 {
            return Err(EngineError::DuplicateExpansion(format!(
                "template {} already has occurrence {}",
                tx.template_id.map(|id| id.to_string()).unwrap_or_default(),
                tx.occurrence_key.as_deref().unwrap_or_default()
            )));
        }
        Ok(())
    }

    async fn update_transaction(&self, tx: &Transaction) -> ResultEngine<()> {
        transactions::ActiveModel::from(tx).update(self.conn).await?;
        Ok(())
    }

    async fn mark_paid(&self, transaction_id: Uuid, paid_on: NaiveDate) -> ResultEngine<()> {
        let paid = transactions::ActiveModel {
            is_paid: ActiveValue::Set(true),
            paid_on: ActiveValue::Set(Some(paid_on)),
            ..Default::default()
        };
        transactions::Entity::update_many()
            .set(paid)
            .filter(transactions::Column::Id.eq(transaction_id.to_string()))
            .exec(self.conn)
            .await?;
        Ok(())
    }

    async fn delete_transaction(&self, transaction_id: Uuid) -> ResultEngine<()> {
        transactions::Entity::delete_by_id(transaction_id.to_string())
            .exec(self.conn)
            .await?;
        Ok(())
    }

    async fn stamp_closure(
        &self,
        workspace_id: Uuid,
        period: Period,
        closure_id: Uuid,
    ) -> ResultEngine<u64> {
        let stamp = transactions::ActiveModel {
            closure_id: ActiveValue::Set(Some(closure_id.to_string())),
            ..Default::default()
        };
        let result = transactions::Entity::update_many()
            .set(stamp)
            .filter(transactions::Column::WorkspaceId.eq(workspace_id.to_string()))
            .filter(
                transactions::Column::OccurredOn.between(period.first_day()?, period.last_day()?),
            )
            .filter(transactions::Column::ClosureId.is_null())
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    async fn open_closure(&self, workspace_id: Uuid) -> ResultEngine<Option<MonthlyClosure>> {
        closures::Entity::find()
            .filter(closures::Column::WorkspaceId.eq(workspace_id.to_string()))
            .filter(closures::Column::Status.eq(ClosureStatus::Open.as_str()))
            .one(self.conn)
            .await?
            .map(MonthlyClosure::try_from)
            .transpose()
    }

    async fn closure_for(
        &self,
        workspace_id: Uuid,
        period: Period,
    ) -> ResultEngine<Option<MonthlyClosure>> {
        closures::Entity::find()
            .filter(closures::Column::WorkspaceId.eq(workspace_id.to_string()))
            .filter(closures::Column::Year.eq(period.year()))
            .filter(closures::Column::Month.eq(period.month()))
            .one(self.conn)
            .await?
            .map(MonthlyClosure::try_from)
            .transpose()
    }

    async fn closure(&self, workspace_id: Uuid, closure_id: Uuid) -> ResultEngine<MonthlyClosure> {
        closures::Entity::find_by_id(closure_id.to_string())
            .filter(closures::Column::WorkspaceId.eq(workspace_id.to_string()))
            .one(self.conn)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("closure not exists".to_string()))?
            .try_into()
    }

    async fn closed_closures(&self, workspace_id: Uuid) -> ResultEngine<Vec<MonthlyClosure>> {
        let models = closures::Entity::find()
            .filter(closures::Column::WorkspaceId.eq(workspace_id.to_string()))
            .filter(closures::Column::Status.eq(ClosureStatus::Closed.as_str()))
            .order_by_desc(closures::Column::Year)
            .order_by_desc(closures::Column::Month)
            .all(self.conn)
            .await?;
        convert_all(models)
    }

    async fn insert_closure(&self, closure: &MonthlyClosure) -> ResultEngine<()> {
        closures::ActiveModel::from(closure).insert(self.conn).await?;
        Ok(())
    }

    async fn seal_closure(&self, sealed: &MonthlyClosure) -> ResultEngine<bool> {
        let changes = closures::ActiveModel {
            status: ActiveValue::Set(ClosureStatus::Closed.as_str().to_string()),
            total_income_minor: ActiveValue::Set(sealed.total_income.cents()),
            total_expense_minor: ActiveValue::Set(sealed.total_expense.cents()),
            balance_minor: ActiveValue::Set(sealed.balance.cents()),
            closed_at: ActiveValue::Set(sealed.closed_at),
            ..Default::default()
        };
        let result = closures::Entity::update_many()
            .set(changes)
            .filter(closures::Column::Id.eq(sealed.id.to_string()))
            .filter(closures::Column::Status.eq(ClosureStatus::Open.as_str()))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    async fn snapshot_exists(
        &self,
        source_transaction_id: Uuid,
        closure_id: Uuid,
    ) -> ResultEngine<bool> {
        Ok(snapshots::Entity::find()
            .filter(snapshots::Column::SourceTransactionId.eq(source_transaction_id.to_string()))
            .filter(snapshots::Column::ClosureId.eq(closure_id.to_string()))
            .one(self.conn)
            .await?
            .is_some())
    }

    async fn insert_snapshot(&self, snapshot: &FixedExpenseSnapshot) -> ResultEngine<()> {
        snapshots::ActiveModel::from(snapshot)
            .insert(self.conn)
            .await?;
        Ok(())
    }

    async fn snapshots_into(&self, closure_id: Uuid) -> ResultEngine<Vec<FixedExpenseSnapshot>> {
        let models = snapshots::Entity::find()
            .filter(snapshots::Column::ClosureId.eq(closure_id.to_string()))
            .order_by_asc(snapshots::Column::CreatedAt)
            .order_by_asc(snapshots::Column::Description)
            .all(self.conn)
            .await?;
        convert_all(models)
    }

    async fn release_snapshot_source(&self, source_transaction_id: Uuid) -> ResultEngine<()> {
        let detach = snapshots::ActiveModel {
            source_transaction_id: ActiveValue::Set(None),
            ..Default::default()
        };
        snapshots::Entity::update_many()
            .set(detach)
            .filter(snapshots::Column::SourceTransactionId.eq(source_transaction_id.to_string()))
            .exec(self.conn)
            .await?;
        Ok(())
    }
}
