use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use uuid::Uuid;

use crate::entities::assignment::{self, AssignmentState};
use crate::entities::trip;

use super::now;

/// Insert the active assignment for a freshly accepted trip. The partial
/// unique index on (trip_id, state = 'assigned') makes a second active row
/// for the same trip a constraint violation rather than a silent overlap.
pub async fn create_assigned<C: ConnectionTrait>(
    conn: &C,
    trip_id: i64,
    driver_id: Uuid,
) -> Result<assignment::Model, DbErr> {
    assignment::ActiveModel {
        trip_id: Set(trip_id),
        driver_id: Set(driver_id),
        state: Set(AssignmentState::Assigned),
        assigned_at: Set(now()),
        released_at: Set(None),
        ..Default::default()
    }
    .insert(conn)
    .await
}

pub async fn find_active_for_trip<C: ConnectionTrait>(
    conn: &C,
    trip_id: i64,
) -> Result<Option<assignment::Model>, DbErr> {
    assignment::Entity::find()
        .filter(assignment::Column::TripId.eq(trip_id))
        .filter(assignment::Column::State.eq(AssignmentState::Assigned))
        .one(conn)
        .await
}

/// Close the active assignment of a trip, guarded on it still being active.
/// Returns false when there was nothing to release.
pub async fn release_active<C: ConnectionTrait>(conn: &C, trip_id: i64) -> Result<bool, DbErr> {
    let result = assignment::Entity::update_many()
        .set(assignment::ActiveModel {
            state: Set(AssignmentState::Released),
            released_at: Set(Some(now())),
            ..Default::default()
        })
        .filter(assignment::Column::TripId.eq(trip_id))
        .filter(assignment::Column::State.eq(AssignmentState::Assigned))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}

/// All assignments a driver has held, newest first, with the trips attached.
pub async fn list_for_driver<C: ConnectionTrait>(
    conn: &C,
    driver_id: Uuid,
) -> Result<Vec<(assignment::Model, Option<trip::Model>)>, DbErr> {
    assignment::Entity::find()
        .filter(assignment::Column::DriverId.eq(driver_id))
        .order_by_desc(assignment::Column::AssignedAt)
        .find_also_related(trip::Entity)
        .all(conn)
        .await
}
