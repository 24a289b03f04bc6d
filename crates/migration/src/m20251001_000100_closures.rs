//! Monthly closures and the fixed-expense snapshots carried between them.
//!
//! - one closure per `(workspace_id, year, month)`
//! - at most one open closure per workspace (partial unique index)
//! - one snapshot per `(source_transaction_id, closure_id)`

use sea_orm::ConnectionTrait;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum MonthlyClosures {
    Table,
    Id,
    WorkspaceId,
    Year,
    Month,
    Status,
    TotalIncomeMinor,
    TotalExpenseMinor,
    BalanceMinor,
    ClosedAt,
    CreatedAt,
}

#[derive(Iden)]
enum FixedExpenseSnapshots {
    Table,
    Id,
    ClosureId,
    SourceTransactionId,
    CarriedTransactionId,
    Description,
    AmountMinor,
    CategoryId,
    CreatedAt,
}

#[derive(Iden)]
enum Workspaces {
    Table,
    Id,
}

const OPEN_CLOSURE_INDEX: &str = "idx-monthly_closures-workspace_id-open-unique";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MonthlyClosures::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MonthlyClosures::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MonthlyClosures::WorkspaceId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MonthlyClosures::Year).integer().not_null())
                    .col(ColumnDef::new(MonthlyClosures::Month).integer().not_null())
                    .col(ColumnDef::new(MonthlyClosures::Status).string().not_null())
                    .col(
                        ColumnDef::new(MonthlyClosures::TotalIncomeMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(MonthlyClosures::TotalExpenseMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(MonthlyClosures::BalanceMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(MonthlyClosures::ClosedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(MonthlyClosures::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-monthly_closures-workspace_id")
                            .from(MonthlyClosures::Table, MonthlyClosures::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-monthly_closures-workspace_id-period-unique")
                    .table(MonthlyClosures::Table)
                    .col(MonthlyClosures::WorkspaceId)
                    .col(MonthlyClosures::Year)
                    .col(MonthlyClosures::Month)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS \"{OPEN_CLOSURE_INDEX}\" \
                 ON \"monthly_closures\" (\"workspace_id\") WHERE \"status\" = 'open'"
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FixedExpenseSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FixedExpenseSnapshots::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FixedExpenseSnapshots::ClosureId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FixedExpenseSnapshots::SourceTransactionId).string())
                    .col(
                        ColumnDef::new(FixedExpenseSnapshots::CarriedTransactionId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FixedExpenseSnapshots::Description)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FixedExpenseSnapshots::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FixedExpenseSnapshots::CategoryId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FixedExpenseSnapshots::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-fixed_expense_snapshots-closure_id")
                            .from(FixedExpenseSnapshots::Table, FixedExpenseSnapshots::ClosureId)
                            .to(MonthlyClosures::Table, MonthlyClosures::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-fixed_expense_snapshots-source-closure-unique")
                    .table(FixedExpenseSnapshots::Table)
                    .col(FixedExpenseSnapshots::SourceTransactionId)
                    .col(FixedExpenseSnapshots::ClosureId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FixedExpenseSnapshots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MonthlyClosures::Table).to_owned())
            .await?;
        Ok(())
    }
}
