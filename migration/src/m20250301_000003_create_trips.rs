use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20250301_000001_create_users::User;
use super::m20250301_000002_create_driver_profiles::VehicleClass;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(ServiceKind::Enum)
                    .values([ServiceKind::Transport, ServiceKind::PackageDelivery])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(TripState::Enum)
                    .values([
                        TripState::Pending,
                        TripState::Accepted,
                        TripState::InProgress,
                        TripState::Completed,
                        TripState::Cancelled,
                        TripState::Expired,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Trip::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Trip::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(uuid(Trip::PublicId).not_null().unique_key())
                    .col(uuid(Trip::RiderId).not_null())
                    .col(
                        ColumnDef::new(Trip::ServiceKind)
                            .custom(ServiceKind::Enum)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Trip::VehicleClass)
                            .custom(VehicleClass::Enum)
                            .not_null(),
                    )
                    .col(double(Trip::OriginLat).not_null())
                    .col(double(Trip::OriginLng).not_null())
                    .col(string_len(Trip::OriginAddress, 255).not_null())
                    .col(double(Trip::DestLat).not_null())
                    .col(double(Trip::DestLng).not_null())
                    .col(string_len(Trip::DestAddress, 255).not_null())
                    .col(double(Trip::DistanceKm).not_null())
                    .col(integer(Trip::DurationMin).not_null())
                    .col(double(Trip::EstimatedFare).not_null())
                    .col(
                        ColumnDef::new(Trip::State)
                            .custom(TripState::Enum)
                            .not_null(),
                    )
                    .col(
                        timestamp_with_time_zone(Trip::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Trip::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trip_rider")
                            .from(Trip::Table, Trip::RiderId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Matching queries scan recent pending trips by class
        manager
            .create_index(
                Index::create()
                    .name("idx_trip_state_created")
                    .table(Trip::Table)
                    .col(Trip::State)
                    .col(Trip::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Trip::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(TripState::Enum).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(ServiceKind::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Trip {
    Table,
    Id,
    PublicId,
    RiderId,
    ServiceKind,
    VehicleClass,
    OriginLat,
    OriginLng,
    OriginAddress,
    DestLat,
    DestLng,
    DestAddress,
    DistanceKm,
    DurationMin,
    EstimatedFare,
    State,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum ServiceKind {
    #[sea_orm(iden = "service_kind")]
    Enum,
    #[sea_orm(iden = "transport")]
    Transport,
    #[sea_orm(iden = "package_delivery")]
    PackageDelivery,
}

#[derive(DeriveIden)]
pub enum TripState {
    #[sea_orm(iden = "trip_state")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "accepted")]
    Accepted,
    #[sea_orm(iden = "in_progress")]
    InProgress,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "cancelled")]
    Cancelled,
    #[sea_orm(iden = "expired")]
    Expired,
}
