use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20250301_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(VehicleClass::Enum)
                    .values([
                        VehicleClass::Motorcycle,
                        VehicleClass::Car,
                        VehicleClass::Van,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(VerificationStatus::Enum)
                    .values([
                        VerificationStatus::Pending,
                        VerificationStatus::Approved,
                        VerificationStatus::Rejected,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DriverProfile::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DriverProfile::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(uuid(DriverProfile::UserId).not_null().unique_key())
                    .col(
                        ColumnDef::new(DriverProfile::VehicleClass)
                            .custom(VehicleClass::Enum)
                            .not_null(),
                    )
                    .col(string_len(DriverProfile::Plate, 20).not_null())
                    .col(
                        ColumnDef::new(DriverProfile::Verification)
                            .custom(VerificationStatus::Enum)
                            .not_null(),
                    )
                    .col(boolean(DriverProfile::Available).not_null().default(false))
                    .col(boolean(DriverProfile::OnTrip).not_null().default(false))
                    .col(double_null(DriverProfile::CurrentLat))
                    .col(double_null(DriverProfile::CurrentLng))
                    .col(timestamp_with_time_zone_null(DriverProfile::LocationUpdatedAt))
                    .col(
                        timestamp_with_time_zone(DriverProfile::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_driver_profile_user")
                            .from(DriverProfile::Table, DriverProfile::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DriverProfile::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(VerificationStatus::Enum).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(VehicleClass::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum DriverProfile {
    Table,
    Id,
    UserId,
    VehicleClass,
    Plate,
    Verification,
    Available,
    OnTrip,
    CurrentLat,
    CurrentLng,
    LocationUpdatedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum VehicleClass {
    #[sea_orm(iden = "vehicle_class")]
    Enum,
    #[sea_orm(iden = "motorcycle")]
    Motorcycle,
    #[sea_orm(iden = "car")]
    Car,
    #[sea_orm(iden = "van")]
    Van,
}

#[derive(DeriveIden)]
pub enum VerificationStatus {
    #[sea_orm(iden = "verification_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "approved")]
    Approved,
    #[sea_orm(iden = "rejected")]
    Rejected,
}
