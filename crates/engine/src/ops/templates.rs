use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

use crate::{
    EngineError, Period, RecurringTemplate, ResultEngine,
    closure::MonthlyClosureManager,
    commands::{NewTemplate, TemplatePatch},
    recurrence::{ExpansionOutcome, RecurrenceExpander, occurrences},
    store::{LedgerStore, SqlLedger},
    templates,
    util::{ensure_positive_amount, normalize_optional_text, normalize_required_name},
};

use super::{Engine, with_tx};

impl Engine {
    /// Create a recurring template. Nothing is generated until the next
    /// expansion.
    pub async fn create_template(
        &self,
        cmd: NewTemplate,
        now: DateTime<Utc>,
    ) -> ResultEngine<RecurringTemplate> {
        let description = normalize_required_name(&cmd.description, "template")?;
        ensure_positive_amount(cmd.amount)?;
        let template = RecurringTemplate {
            id: Uuid::new_v4(),
            workspace_id: cmd.workspace_id,
            category_id: cmd.category_id,
            description,
            amount: cmd.amount,
            kind: cmd.kind,
            schedule: cmd.schedule,
            start_date: cmd.start_date,
            end_date: cmd.end_date,
            active: true,
            notes: normalize_optional_text(cmd.notes.as_deref()),
            created_at: now,
            updated_at: now,
        };
        template.validate()?;

        with_tx!(self, |db_tx| {
            let store = SqlLedger::new(&db_tx);
            store.workspace(template.workspace_id).await?;
            store
                .category(template.workspace_id, template.category_id)
                .await?
                .ensure_kind(template.kind)?;
            templates::ActiveModel::from(&template)
                .insert(&db_tx)
                .await?;
            info!(
                template_id = %template.id,
                workspace_id = %template.workspace_id,
                frequency = template.schedule.frequency(),
                "template created"
            );
            Ok(template)
        })
    }

    pub async fn template(
        &self,
        workspace_id: Uuid,
        template_id: Uuid,
    ) -> ResultEngine<RecurringTemplate> {
        with_tx!(self, |db_tx| {
            SqlLedger::new(&db_tx)
                .template(workspace_id, template_id)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("template not exists".to_string()))
        })
    }

    /// Every template of the workspace, active or not.
    pub async fn templates(&self, workspace_id: Uuid) -> ResultEngine<Vec<RecurringTemplate>> {
        with_tx!(self, |db_tx| {
            templates::Entity::find()
                .filter(templates::Column::WorkspaceId.eq(workspace_id.to_string()))
                .order_by_asc(templates::Column::CreatedAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(RecurringTemplate::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Apply a partial update. Instances already generated keep their values.
    pub async fn update_template(
        &self,
        patch: TemplatePatch,
        now: DateTime<Utc>,
    ) -> ResultEngine<RecurringTemplate> {
        with_tx!(self, |db_tx| {
            let store = SqlLedger::new(&db_tx);
            let mut template = store
                .template(patch.workspace_id, patch.template_id)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("template not exists".to_string()))?;

            if let Some(description) = patch.description.as_deref() {
                template.description = normalize_required_name(description, "template")?;
            }
            if let Some(amount) = patch.amount {
                ensure_positive_amount(amount)?;
                template.amount = amount;
            }
            if let Some(category_id) = patch.category_id {
                template.category_id = category_id;
            }
            if let Some(schedule) = patch.schedule {
                template.schedule = schedule;
            }
            if let Some(end_date) = patch.end_date {
                template.end_date = end_date;
            }
            if let Some(notes) = patch.notes.as_deref() {
                template.notes = normalize_optional_text(Some(notes));
            }
            template.updated_at = now;
            template.validate()?;
            store
                .category(template.workspace_id, template.category_id)
                .await?
                .ensure_kind(template.kind)?;

            templates::ActiveModel::from(&template)
                .update(&db_tx)
                .await?;
            Ok(template)
        })
    }

    pub async fn set_template_active(
        &self,
        workspace_id: Uuid,
        template_id: Uuid,
        active: bool,
        now: DateTime<Utc>,
    ) -> ResultEngine<RecurringTemplate> {
        with_tx!(self, |db_tx| {
            let mut template = SqlLedger::new(&db_tx)
                .template(workspace_id, template_id)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("template not exists".to_string()))?;
            template.active = active;
            template.updated_at = now;
            templates::ActiveModel::from(&template)
                .update(&db_tx)
                .await?;
            info!(%template_id, active, "template toggled");
            Ok(template)
        })
    }

    /// Expand one template into `period`.
    ///
    /// Unlike the workspace-wide expansion, a period outside the template's
    /// validity window is a caller error here.
    pub async fn expand_template(
        &self,
        workspace_id: Uuid,
        template_id: Uuid,
        period: Period,
        now: DateTime<Utc>,
    ) -> ResultEngine<ExpansionOutcome> {
        let _guard = self.lock_workspace(workspace_id).await?;
        with_tx!(self, |db_tx| {
            let store = SqlLedger::new(&db_tx);
            let template = store
                .template(workspace_id, template_id)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("template not exists".to_string()))?;
            if !template.window_overlaps(period)? {
                return Err(EngineError::InvalidPeriod(format!(
                    "{period} is outside the validity window of template {template_id}"
                )));
            }
            MonthlyClosureManager::new(&store)
                .ensure_writable(workspace_id, period.first_day()?)
                .await?;
            RecurrenceExpander::new(&store)
                .expand(&template, period, now)
                .await
        })
    }

    /// Skip the occurrences of a template in `period` without touching the
    /// template. Instances already generated there are removed. Returns the
    /// excluded occurrence keys.
    pub async fn exclude_occurrence(
        &self,
        workspace_id: Uuid,
        template_id: Uuid,
        period: Period,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<String>> {
        let _guard = self.lock_workspace(workspace_id).await?;
        with_tx!(self, |db_tx| {
            let store = SqlLedger::new(&db_tx);
            let template = store
                .template(workspace_id, template_id)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("template not exists".to_string()))?;
            MonthlyClosureManager::new(&store)
                .ensure_writable(workspace_id, period.first_day()?)
                .await?;

            let mut keys = Vec::new();
            for occurrence in occurrences(template.schedule, period)? {
                store
                    .insert_exclusion(workspace_id, template_id, &occurrence.key, now)
                    .await?;
                keys.push(occurrence.key);
            }
            let generated = store
                .generated_in(
                    workspace_id,
                    template_id,
                    period.first_day()?,
                    period.last_day()?,
                )
                .await?;
            for tx in &generated {
                if let Some(key) = tx.occurrence_key.as_ref()
                    && !keys.contains(key)
                {
                    store
                        .insert_exclusion(workspace_id, template_id, key, now)
                        .await?;
                    keys.push(key.clone());
                }
                store.release_snapshot_source(tx.id).await?;
                store.delete_transaction(tx.id).await?;
            }
            info!(%workspace_id, %template_id, %period, removed = generated.len(), "occurrences excluded");
            Ok(keys)
        })
    }
}
