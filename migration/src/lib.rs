pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_users;
mod m20250301_000002_create_driver_profiles;
mod m20250301_000003_create_trips;
mod m20250301_000004_create_assignments;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users::Migration),
            Box::new(m20250301_000002_create_driver_profiles::Migration),
            Box::new(m20250301_000003_create_trips::Migration),
            Box::new(m20250301_000004_create_assignments::Migration),
        ]
    }
}
