use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dispatch;
use crate::entities::trip::TripState;
use crate::error::{AppError, AppResult};
use crate::store;
use crate::utils::geo::{haversine_distance, valid_coords};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SetAvailabilityRequest {
    pub available: bool,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SetAvailabilityResponse {
    pub success: bool,
    pub message: String,
    pub available: bool,
}

/// Toggle availability and optionally refresh the reported location.
pub async fn set_availability(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SetAvailabilityRequest>,
) -> AppResult<Json<SetAvailabilityResponse>> {
    let location = match (payload.lat, payload.lng) {
        (Some(lat), Some(lng)) => {
            if !valid_coords(lat, lng) {
                return Err(AppError::Validation(vec![
                    "lat/lng are out of range".to_string(),
                ]));
            }
            Some((lat, lng))
        }
        (None, None) => None,
        _ => {
            return Err(AppError::Validation(vec![
                "lat and lng must be provided together".to_string(),
            ]));
        }
    };

    store::drivers::find_profile(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver profile not found".to_string()))?;

    // Going available while mid-trip is refused by the update's own guard,
    // not by a profile read that a concurrent acceptance could outrun.
    let updated =
        store::drivers::set_availability(&state.db, claims.sub, payload.available, location)
            .await?;
    if !updated {
        return Err(AppError::Conflict(
            "Finish or cancel your active trip first".to_string(),
        ));
    }

    Ok(Json(SetAvailabilityResponse {
        success: true,
        message: "Availability updated".to_string(),
        available: payload.available,
    }))
}

#[derive(Debug, Serialize)]
pub struct PendingRequestView {
    pub trip_id: Uuid,
    pub rider_name: String,
    pub rider_phone: String,
    pub service_kind: String,
    pub origin_address: String,
    pub dest_address: String,
    pub distance_km: f64,
    pub duration_min: i32,
    pub estimated_fare: f64,
    pub distance_to_pickup_km: f64,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PendingRequestsResponse {
    pub success: bool,
    pub message: Option<String>,
    pub total: usize,
    pub requests: Vec<PendingRequestView>,
}

/// Recent pending trips of the driver's vehicle class within pickup range,
/// newest first. Unavailable drivers get an empty list, not an error.
pub async fn pending_requests(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<PendingRequestsResponse>> {
    let profile = store::drivers::find_profile(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver profile not found".to_string()))?;

    let location = profile.current_lat.zip(profile.current_lng);
    let (Some((driver_lat, driver_lng)), true) = (location, profile.is_matchable()) else {
        return Ok(Json(PendingRequestsResponse {
            success: true,
            message: Some("Driver is not available for requests".to_string()),
            total: 0,
            requests: Vec::new(),
        }));
    };

    let rows = store::trips::list_recent_pending(
        &state.db,
        profile.vehicle_class,
        state.config.pending_timeout_minutes,
        state.config.match_limit,
    )
    .await?;

    let requests: Vec<PendingRequestView> = rows
        .into_iter()
        .filter_map(|(trip, rider)| {
            let rider = rider?;
            let pickup_km =
                haversine_distance(driver_lat, driver_lng, trip.origin_lat, trip.origin_lng);
            if pickup_km > state.config.match_radius_km {
                return None;
            }
            Some(PendingRequestView {
                trip_id: trip.public_id,
                rider_name: rider.name,
                rider_phone: rider.phone,
                service_kind: trip.service_kind.to_value(),
                origin_address: trip.origin_address,
                dest_address: trip.dest_address,
                distance_km: trip.distance_km,
                duration_min: trip.duration_min,
                estimated_fare: trip.estimated_fare,
                distance_to_pickup_km: (pickup_km * 100.0).round() / 100.0,
                requested_at: trip.created_at.with_timezone(&Utc),
            })
        })
        .collect();

    Ok(Json(PendingRequestsResponse {
        success: true,
        message: None,
        total: requests.len(),
        requests,
    }))
}

#[derive(Debug, Serialize)]
pub struct TripActionResponse {
    pub success: bool,
    pub message: String,
    pub trip_id: Uuid,
    pub state: TripState,
}

/// Accept a pending trip. Exactly one driver wins; everyone else is told the
/// trip is gone.
pub async fn accept_trip(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<Uuid>,
) -> AppResult<Json<TripActionResponse>> {
    let trip = dispatch::accept_trip(
        &state.db,
        &state.notifier,
        trip_id,
        claims.sub,
        state.config.pending_timeout_minutes,
    )
    .await?;

    Ok(Json(TripActionResponse {
        success: true,
        message: "Trip accepted".to_string(),
        trip_id: trip.public_id,
        state: trip.state,
    }))
}

/// Start an accepted trip.
pub async fn start_trip(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<Uuid>,
) -> AppResult<Json<TripActionResponse>> {
    let trip = dispatch::begin_trip(&state.db, &state.notifier, trip_id, claims.sub).await?;

    Ok(Json(TripActionResponse {
        success: true,
        message: "Trip started".to_string(),
        trip_id: trip.public_id,
        state: trip.state,
    }))
}

/// Complete an in-progress trip, freeing the driver.
pub async fn complete_trip(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<Uuid>,
) -> AppResult<Json<TripActionResponse>> {
    let trip = dispatch::complete_trip(&state.db, &state.notifier, trip_id, claims.sub).await?;

    Ok(Json(TripActionResponse {
        success: true,
        message: "Trip completed".to_string(),
        trip_id: trip.public_id,
        state: trip.state,
    }))
}

/// Abandon an accepted or in-progress trip.
pub async fn cancel_trip(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<Uuid>,
) -> AppResult<Json<TripActionResponse>> {
    let trip = dispatch::cancel_trip(
        &state.db,
        &state.notifier,
        trip_id,
        claims.sub,
        claims.role,
    )
    .await?;

    Ok(Json(TripActionResponse {
        success: true,
        message: "Trip cancelled".to_string(),
        trip_id: trip.public_id,
        state: trip.state,
    }))
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub trip_id: Uuid,
    pub trip_state: String,
    pub assignment_state: String,
    pub origin_address: String,
    pub dest_address: String,
    pub estimated_fare: f64,
    pub assigned_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

/// The driver's assignment history, newest first.
pub async fn history(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<HistoryEntry>>> {
    let rows = store::assignments::list_for_driver(&state.db, claims.sub).await?;

    let entries: Vec<HistoryEntry> = rows
        .into_iter()
        .filter_map(|(assignment, trip)| {
            let trip = trip?;
            Some(HistoryEntry {
                trip_id: trip.public_id,
                trip_state: trip.state.to_value(),
                assignment_state: assignment.state.to_value(),
                origin_address: trip.origin_address,
                dest_address: trip.dest_address,
                estimated_fare: trip.estimated_fare,
                assigned_at: assignment.assigned_at.with_timezone(&Utc),
                released_at: assignment.released_at.map(|t| t.with_timezone(&Utc)),
            })
        })
        .collect();

    Ok(Json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::entities::driver_profile::{self, VehicleClass, VerificationStatus};
    use crate::entities::user::UserRole;
    use crate::notify::Notifier;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            jwt_secret: "secret".to_string(),
            jwt_expiration_hours: 24,
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            match_radius_km: 5.0,
            match_limit: 10,
            pending_timeout_minutes: 10,
            notify_webhook_url: None,
        }
    }

    fn state_with(db: DatabaseConnection) -> Arc<AppState> {
        Arc::new(AppState {
            db,
            config: test_config(),
            notifier: Notifier::Noop,
        })
    }

    fn claims_for(driver_id: Uuid) -> Claims {
        Claims {
            sub: driver_id,
            email: "driver@example.com".to_string(),
            role: UserRole::Driver,
            exp: 0,
            iat: 0,
        }
    }

    fn profile(driver_id: Uuid) -> driver_profile::Model {
        driver_profile::Model {
            id: 1,
            user_id: driver_id,
            vehicle_class: VehicleClass::Motorcycle,
            plate: "ABC123".to_string(),
            verification: VerificationStatus::Approved,
            available: false,
            on_trip: false,
            current_lat: Some(6.25),
            current_lng: Some(-75.58),
            location_updated_at: Some(Utc::now().into()),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn going_available_mid_trip_is_refused_by_the_guarded_update() {
        let driver_id = Uuid::from_u128(7);
        // The profile read predates a concurrent acceptance, so it still
        // shows the driver as free; only the update's own guard can catch
        // that, and here it reports no row matched.
        let stale = profile(driver_id);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![stale]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let err = set_availability(
            State(state_with(db)),
            Extension(claims_for(driver_id)),
            Json(SetAvailabilityRequest {
                available: true,
                lat: Some(6.25),
                lng: Some(-75.58),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn going_available_succeeds_when_not_on_a_trip() {
        let driver_id = Uuid::from_u128(7);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![profile(driver_id)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let response = set_availability(
            State(state_with(db)),
            Extension(claims_for(driver_id)),
            Json(SetAvailabilityRequest {
                available: true,
                lat: Some(6.25),
                lng: Some(-75.58),
            }),
        )
        .await
        .unwrap();
        assert!(response.0.available);
    }
}
