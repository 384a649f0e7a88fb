use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20250301_000001_create_users::User;
use super::m20250301_000003_create_trips::Trip;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(AssignmentState::Enum)
                    .values([AssignmentState::Assigned, AssignmentState::Released])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Assignment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Assignment::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(big_integer(Assignment::TripId).not_null())
                    .col(uuid(Assignment::DriverId).not_null())
                    .col(
                        ColumnDef::new(Assignment::State)
                            .custom(AssignmentState::Enum)
                            .not_null(),
                    )
                    .col(
                        timestamp_with_time_zone(Assignment::AssignedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(Assignment::ReleasedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assignment_trip")
                            .from(Assignment::Table, Assignment::TripId)
                            .to(Trip::Table, Trip::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assignment_driver")
                            .from(Assignment::Table, Assignment::DriverId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one active assignment per trip. Partial unique indexes are
        // not expressible through sea-query's index builder, so raw SQL it is.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX uniq_assignment_active_per_trip \
                 ON assignment (trip_id) WHERE state = 'assigned'",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS uniq_assignment_active_per_trip")
            .await?;

        manager
            .drop_table(Table::drop().table(Assignment::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(AssignmentState::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Assignment {
    Table,
    Id,
    TripId,
    DriverId,
    State,
    AssignedAt,
    ReleasedAt,
}

#[derive(DeriveIden)]
pub enum AssignmentState {
    #[sea_orm(iden = "assignment_state")]
    Enum,
    #[sea_orm(iden = "assigned")]
    Assigned,
    #[sea_orm(iden = "released")]
    Released,
}
