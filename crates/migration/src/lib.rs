pub use sea_orm_migration::prelude::*;

mod m20251001_000000_init;
mod m20251001_000100_closures;
mod m20251001_000200_recurrence_exclusions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251001_000000_init::Migration),
            Box::new(m20251001_000100_closures::Migration),
            Box::new(m20251001_000200_recurrence_exclusions::Migration),
        ]
    }
}
