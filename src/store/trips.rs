use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::entities::driver_profile::VehicleClass;
use crate::entities::trip::{self, ServiceKind, TripState};
use crate::entities::user;

use super::now;

pub struct NewTrip {
    pub rider_id: Uuid,
    pub service_kind: ServiceKind,
    pub vehicle_class: VehicleClass,
    pub origin_lat: f64,
    pub origin_lng: f64,
    pub origin_address: String,
    pub dest_lat: f64,
    pub dest_lng: f64,
    pub dest_address: String,
    pub distance_km: f64,
    pub duration_min: i32,
    pub estimated_fare: f64,
}

pub async fn create<C: ConnectionTrait>(conn: &C, new: NewTrip) -> Result<trip::Model, DbErr> {
    let created = now();
    trip::ActiveModel {
        public_id: Set(Uuid::new_v4()),
        rider_id: Set(new.rider_id),
        service_kind: Set(new.service_kind),
        vehicle_class: Set(new.vehicle_class),
        origin_lat: Set(new.origin_lat),
        origin_lng: Set(new.origin_lng),
        origin_address: Set(new.origin_address),
        dest_lat: Set(new.dest_lat),
        dest_lng: Set(new.dest_lng),
        dest_address: Set(new.dest_address),
        distance_km: Set(new.distance_km),
        duration_min: Set(new.duration_min),
        estimated_fare: Set(new.estimated_fare),
        state: Set(TripState::Pending),
        created_at: Set(created),
        updated_at: Set(created),
        ..Default::default()
    }
    .insert(conn)
    .await
}

pub async fn find_by_public_id<C: ConnectionTrait>(
    conn: &C,
    public_id: Uuid,
) -> Result<Option<trip::Model>, DbErr> {
    trip::Entity::find()
        .filter(trip::Column::PublicId.eq(public_id))
        .one(conn)
        .await
}

/// Compare-and-swap on the trip state: applies `from -> to` as one
/// conditional UPDATE and reports whether the guard held. This is the only
/// way trip state ever changes, so concurrent callers racing on the same trip
/// resolve to exactly one winner at the storage layer, with no external lock.
pub async fn transition_state<C: ConnectionTrait>(
    conn: &C,
    trip_id: i64,
    from: TripState,
    to: TripState,
) -> Result<bool, DbErr> {
    debug_assert!(from.can_transition_to(to), "{from:?} -> {to:?}");

    let result = trip::Entity::update_many()
        .set(trip::ActiveModel {
            state: Set(to),
            updated_at: Set(now()),
            ..Default::default()
        })
        .filter(trip::Column::Id.eq(trip_id))
        .filter(trip::Column::State.eq(from))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Expire every pending trip older than the timeout window. Returns how many
/// trips were swept.
pub async fn expire_older_than<C: ConnectionTrait>(
    conn: &C,
    timeout_minutes: i64,
) -> Result<u64, DbErr> {
    let cutoff = Utc::now() - Duration::minutes(timeout_minutes);

    let result = trip::Entity::update_many()
        .set(trip::ActiveModel {
            state: Set(TripState::Expired),
            updated_at: Set(now()),
            ..Default::default()
        })
        .filter(trip::Column::State.eq(TripState::Pending))
        .filter(trip::Column::CreatedAt.lt(cutoff))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}

/// Recent pending trips of one vehicle class, newest first, with the
/// requesting rider attached. Feeds the driver-facing request list.
pub async fn list_recent_pending<C: ConnectionTrait>(
    conn: &C,
    vehicle_class: VehicleClass,
    max_age_minutes: i64,
    limit: u64,
) -> Result<Vec<(trip::Model, Option<user::Model>)>, DbErr> {
    let since = Utc::now() - Duration::minutes(max_age_minutes);

    trip::Entity::find()
        .filter(trip::Column::State.eq(TripState::Pending))
        .filter(trip::Column::VehicleClass.eq(vehicle_class))
        .filter(trip::Column::CreatedAt.gte(since))
        .order_by_desc(trip::Column::CreatedAt)
        .limit(limit)
        .find_also_related(user::Entity)
        .all(conn)
        .await
}

pub async fn list_for_rider<C: ConnectionTrait>(
    conn: &C,
    rider_id: Uuid,
) -> Result<Vec<trip::Model>, DbErr> {
    trip::Entity::find()
        .filter(trip::Column::RiderId.eq(rider_id))
        .order_by_desc(trip::Column::CreatedAt)
        .all(conn)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn transition_state_reports_guard_outcome() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
            ])
            .into_connection();

        let won = transition_state(&db, 1, TripState::Pending, TripState::Accepted)
            .await
            .unwrap();
        assert!(won);

        // Same CAS issued again: the row is no longer pending, guard fails.
        let won = transition_state(&db, 1, TripState::Pending, TripState::Accepted)
            .await
            .unwrap();
        assert!(!won);
    }
}
