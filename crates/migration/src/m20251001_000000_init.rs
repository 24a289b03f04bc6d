//! Initial schema: workspaces, categories, recurring templates and
//! transactions.
//!
//! Generated transactions are unique per `(template_id, occurrence_key)`;
//! hand-entered ones leave both columns NULL and are not constrained.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Workspaces {
    Table,
    Id,
    Name,
    Active,
    CreatedAt,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    WorkspaceId,
    Name,
    Kind,
    Active,
}

#[derive(Iden)]
enum RecurringTemplates {
    Table,
    Id,
    WorkspaceId,
    CategoryId,
    Description,
    AmountMinor,
    Kind,
    Frequency,
    DayOfMonth,
    DayOfWeek,
    MonthOfYear,
    StartDate,
    EndDate,
    Active,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    WorkspaceId,
    CategoryId,
    Description,
    AmountMinor,
    Kind,
    OccurredOn,
    IsPaid,
    PaidOn,
    IsFixed,
    IsAutoLoaded,
    TemplateId,
    OccurrenceKey,
    ClosureId,
    Notes,
    CreatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Workspaces
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Workspaces::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Workspaces::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Workspaces::Name).string().not_null())
                    .col(
                        ColumnDef::new(Workspaces::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Workspaces::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Categories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::WorkspaceId).string().not_null())
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Categories::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-categories-workspace_id")
                            .from(Categories::Table, Categories::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-categories-workspace_id")
                    .table(Categories::Table)
                    .col(Categories::WorkspaceId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Recurring templates
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(RecurringTemplates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecurringTemplates::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RecurringTemplates::WorkspaceId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringTemplates::CategoryId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringTemplates::Description)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringTemplates::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringTemplates::Kind).string().not_null())
                    .col(
                        ColumnDef::new(RecurringTemplates::Frequency)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringTemplates::DayOfMonth).integer())
                    .col(ColumnDef::new(RecurringTemplates::DayOfWeek).integer())
                    .col(ColumnDef::new(RecurringTemplates::MonthOfYear).integer())
                    .col(
                        ColumnDef::new(RecurringTemplates::StartDate)
                            .date()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringTemplates::EndDate).date())
                    .col(
                        ColumnDef::new(RecurringTemplates::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(RecurringTemplates::Notes).string())
                    .col(
                        ColumnDef::new(RecurringTemplates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringTemplates::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recurring_templates-workspace_id")
                            .from(RecurringTemplates::Table, RecurringTemplates::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recurring_templates-category_id")
                            .from(RecurringTemplates::Table, RecurringTemplates::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-recurring_templates-workspace_id-active")
                    .table(RecurringTemplates::Table)
                    .col(RecurringTemplates::WorkspaceId)
                    .col(RecurringTemplates::Active)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::WorkspaceId).string().not_null())
                    .col(ColumnDef::new(Transactions::CategoryId).string().not_null())
                    .col(ColumnDef::new(Transactions::Description).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(ColumnDef::new(Transactions::OccurredOn).date().not_null())
                    .col(
                        ColumnDef::new(Transactions::IsPaid)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Transactions::PaidOn).date())
                    .col(
                        ColumnDef::new(Transactions::IsFixed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Transactions::IsAutoLoaded)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Transactions::TemplateId).string())
                    .col(ColumnDef::new(Transactions::OccurrenceKey).string())
                    .col(ColumnDef::new(Transactions::ClosureId).string())
                    .col(ColumnDef::new(Transactions::Notes).string())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-workspace_id")
                            .from(Transactions::Table, Transactions::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-category_id")
                            .from(Transactions::Table, Transactions::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-workspace_id-occurred_on")
                    .table(Transactions::Table)
                    .col(Transactions::WorkspaceId)
                    .col(Transactions::OccurredOn)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-template_id-occurrence_key-unique")
                    .table(Transactions::Table)
                    .col(Transactions::TemplateId)
                    .col(Transactions::OccurrenceKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RecurringTemplates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Workspaces::Table).to_owned())
            .await?;
        Ok(())
    }
}
