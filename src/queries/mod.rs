//! Read-side projections for polling clients.

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;
use uuid::Uuid;

use crate::dispatch;
use crate::entities::driver_profile::VehicleClass;
use crate::entities::trip::{self, ServiceKind, TripState};
use crate::entities::user;
use crate::error::{AppError, AppResult};
use crate::store;
use crate::utils::geo::{eta_minutes, haversine_distance};

#[derive(Debug, Serialize)]
pub struct PlaceView {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct DriverLocationView {
    pub lat: f64,
    pub lng: f64,
}

/// Public profile of the assigned driver as shown to the rider, with a rough
/// arrival estimate (haversine over an assumed urban speed, nothing smarter).
#[derive(Debug, Serialize)]
pub struct AssignedDriverView {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub vehicle_class: VehicleClass,
    pub plate: String,
    pub location: Option<DriverLocationView>,
    pub distance_km: Option<f64>,
    pub eta_minutes: Option<i64>,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TripStatusView {
    pub trip_id: Uuid,
    pub state: TripState,
    pub service_kind: ServiceKind,
    pub vehicle_class: VehicleClass,
    pub origin: PlaceView,
    pub destination: PlaceView,
    pub distance_km: f64,
    pub duration_min: i32,
    pub estimated_fare: f64,
    pub created_at: DateTime<Utc>,
    /// Absent until an assignment exists.
    pub driver: Option<AssignedDriverView>,
}

/// Current status of a trip: trip record, active assignment if any, driver
/// public profile, and computed ETA. Applies lazy expiry so a poller never
/// sees a pending trip older than the timeout window.
pub async fn trip_status(
    db: &DatabaseConnection,
    trip_public_id: Uuid,
    pending_timeout_minutes: i64,
) -> AppResult<TripStatusView> {
    let mut trip = store::trips::find_by_public_id(db, trip_public_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    if dispatch::is_stale(&trip, pending_timeout_minutes) {
        store::trips::transition_state(db, trip.id, TripState::Pending, TripState::Expired)
            .await?;
        trip = store::trips::find_by_public_id(db, trip_public_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;
    }

    let driver = match store::assignments::find_active_for_trip(db, trip.id).await? {
        Some(assignment) => {
            let user = user::Entity::find_by_id(assignment.driver_id).one(db).await?;
            let profile = store::drivers::find_profile(db, assignment.driver_id).await?;
            match (user, profile) {
                (Some(user), Some(profile)) => {
                    let location = profile
                        .current_lat
                        .zip(profile.current_lng)
                        .map(|(lat, lng)| DriverLocationView { lat, lng });
                    let distance_km = location.as_ref().map(|loc| {
                        let d =
                            haversine_distance(loc.lat, loc.lng, trip.origin_lat, trip.origin_lng);
                        (d * 100.0).round() / 100.0
                    });
                    let eta = location.as_ref().map(|loc| {
                        eta_minutes(loc.lat, loc.lng, trip.origin_lat, trip.origin_lng)
                    });
                    Some(AssignedDriverView {
                        id: user.id,
                        name: user.name,
                        phone: user.phone,
                        vehicle_class: profile.vehicle_class,
                        plate: profile.plate,
                        location,
                        distance_km,
                        eta_minutes: eta,
                        assigned_at: assignment.assigned_at.with_timezone(&Utc),
                    })
                }
                _ => None,
            }
        }
        None => None,
    };

    Ok(view_from(trip, driver))
}

fn view_from(trip: trip::Model, driver: Option<AssignedDriverView>) -> TripStatusView {
    TripStatusView {
        trip_id: trip.public_id,
        state: trip.state,
        service_kind: trip.service_kind,
        vehicle_class: trip.vehicle_class,
        origin: PlaceView {
            lat: trip.origin_lat,
            lng: trip.origin_lng,
            address: trip.origin_address,
        },
        destination: PlaceView {
            lat: trip.dest_lat,
            lng: trip.dest_lng,
            address: trip.dest_address,
        },
        distance_km: trip.distance_km,
        duration_min: trip.duration_min,
        estimated_fare: trip.estimated_fare,
        created_at: trip.created_at.with_timezone(&Utc),
        driver,
    }
}
