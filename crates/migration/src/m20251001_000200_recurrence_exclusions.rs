use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum RecurrenceExclusions {
    Table,
    Id,
    WorkspaceId,
    TemplateId,
    OccurrenceKey,
    CreatedAt,
}

#[derive(Iden)]
enum RecurringTemplates {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RecurrenceExclusions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecurrenceExclusions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RecurrenceExclusions::WorkspaceId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurrenceExclusions::TemplateId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurrenceExclusions::OccurrenceKey)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurrenceExclusions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recurrence_exclusions-template_id")
                            .from(RecurrenceExclusions::Table, RecurrenceExclusions::TemplateId)
                            .to(RecurringTemplates::Table, RecurringTemplates::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-recurrence_exclusions-template_id-occurrence_key-unique")
                    .table(RecurrenceExclusions::Table)
                    .col(RecurrenceExclusions::TemplateId)
                    .col(RecurrenceExclusions::OccurrenceKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RecurrenceExclusions::Table).to_owned())
            .await?;
        Ok(())
    }
}
