use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::entities::driver_profile::{self, VehicleClass, VerificationStatus};
use crate::entities::user;

use super::now;

pub async fn find_profile<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<Option<driver_profile::Model>, DbErr> {
    driver_profile::Entity::find()
        .filter(driver_profile::Column::UserId.eq(user_id))
        .one(conn)
        .await
}

/// Drivers that could serve a trip of the given class: approved, available,
/// not already on a trip, and reporting a location. Distance filtering
/// happens on top of this in the matching layer.
pub async fn list_matchable<C: ConnectionTrait>(
    conn: &C,
    vehicle_class: VehicleClass,
) -> Result<Vec<(driver_profile::Model, Option<user::Model>)>, DbErr> {
    driver_profile::Entity::find()
        .filter(driver_profile::Column::VehicleClass.eq(vehicle_class))
        .filter(driver_profile::Column::Verification.eq(VerificationStatus::Approved))
        .filter(driver_profile::Column::Available.eq(true))
        .filter(driver_profile::Column::OnTrip.eq(false))
        .filter(driver_profile::Column::CurrentLat.is_not_null())
        .filter(driver_profile::Column::CurrentLng.is_not_null())
        .find_also_related(user::Entity)
        .all(conn)
        .await
}

/// Flip a driver onto a trip, guarded on them not already being on one.
/// Returns false if some concurrent acceptance got there first.
pub async fn mark_on_trip<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> Result<bool, DbErr> {
    let result = driver_profile::Entity::update_many()
        .set(driver_profile::ActiveModel {
            on_trip: Set(true),
            ..Default::default()
        })
        .filter(driver_profile::Column::UserId.eq(user_id))
        .filter(driver_profile::Column::OnTrip.eq(false))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Take a driver off their trip after the assignment is released. Guarded on
/// being on a trip so a double release never flips anything twice, and the
/// driver's own `available` choice is left untouched.
pub async fn clear_on_trip<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> Result<bool, DbErr> {
    let result = driver_profile::Entity::update_many()
        .set(driver_profile::ActiveModel {
            on_trip: Set(false),
            ..Default::default()
        })
        .filter(driver_profile::Column::UserId.eq(user_id))
        .filter(driver_profile::Column::OnTrip.eq(true))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Driver-initiated availability toggle, optionally refreshing the reported
/// location at the same time. Going available is guarded on not being
/// mid-trip inside the same UPDATE, so a concurrent acceptance can never
/// slip between a profile read and this write.
pub async fn set_availability<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    available: bool,
    location: Option<(f64, f64)>,
) -> Result<bool, DbErr> {
    let mut update = driver_profile::ActiveModel {
        available: Set(available),
        ..Default::default()
    };
    if let Some((lat, lng)) = location {
        update.current_lat = Set(Some(lat));
        update.current_lng = Set(Some(lng));
        update.location_updated_at = Set(Some(now()));
    }

    let mut query = driver_profile::Entity::update_many()
        .set(update)
        .filter(driver_profile::Column::UserId.eq(user_id));
    if available {
        query = query.filter(driver_profile::Column::OnTrip.eq(false));
    }

    let result = query.exec(conn).await?;

    Ok(result.rows_affected == 1)
}

pub async fn set_verification<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    status: VerificationStatus,
) -> Result<bool, DbErr> {
    let result = driver_profile::Entity::update_many()
        .set(driver_profile::ActiveModel {
            verification: Set(status),
            ..Default::default()
        })
        .filter(driver_profile::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}
