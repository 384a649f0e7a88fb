use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dispatch;
use crate::entities::driver_profile::VehicleClass;
use crate::entities::trip::{self, ServiceKind, TripState};
use crate::error::{AppError, AppResult};
use crate::matching::{self, Candidate, Point};
use crate::queries::{self, TripStatusView};
use crate::store::{self, trips::NewTrip};
use crate::utils::fare::estimate_fare;
use crate::utils::geo::valid_coords;
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LocationPayload {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct RequestTripRequest {
    pub origin: LocationPayload,
    pub destination: LocationPayload,
    pub service_kind: String,
    pub vehicle_class: String,
    /// Client-side route estimates, used for fare calculation only.
    pub distance_km: f64,
    pub duration_min: i32,
}

#[derive(Debug)]
struct ValidatedTripRequest {
    service_kind: ServiceKind,
    vehicle_class: VehicleClass,
}

fn validate_trip_request(payload: &RequestTripRequest) -> Result<ValidatedTripRequest, AppError> {
    let mut errors = Vec::new();

    if !valid_coords(payload.origin.lat, payload.origin.lng) {
        errors.push("origin coordinates are out of range".to_string());
    }
    if !valid_coords(payload.destination.lat, payload.destination.lng) {
        errors.push("destination coordinates are out of range".to_string());
    }
    if payload.origin.address.trim().is_empty() {
        errors.push("origin.address must not be empty".to_string());
    }
    if payload.destination.address.trim().is_empty() {
        errors.push("destination.address must not be empty".to_string());
    }
    if !payload.distance_km.is_finite() || payload.distance_km <= 0.0 {
        errors.push("distance_km must be a positive number".to_string());
    }
    if payload.duration_min <= 0 {
        errors.push("duration_min must be a positive number".to_string());
    }

    let service_kind = ServiceKind::from_client(&payload.service_kind);
    if service_kind.is_none() {
        errors.push("service_kind is not a known service kind".to_string());
    }
    let vehicle_class = VehicleClass::from_client(&payload.vehicle_class);
    if vehicle_class.is_none() {
        errors.push("vehicle_class is not a known vehicle class".to_string());
    }

    match (service_kind, vehicle_class) {
        (Some(service_kind), Some(vehicle_class)) if errors.is_empty() => Ok(ValidatedTripRequest {
            service_kind,
            vehicle_class,
        }),
        _ => Err(AppError::Validation(errors)),
    }
}

#[derive(Debug, Serialize)]
pub struct RequestTripResponse {
    pub success: bool,
    pub message: String,
    pub trip_id: Uuid,
    pub state: TripState,
    pub estimated_fare: f64,
    pub candidates_found: usize,
    pub candidates: Vec<Candidate>,
}

/// Create a trip request and return the nearby-driver shortlist for it.
pub async fn request_trip(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<RequestTripRequest>,
) -> AppResult<Json<RequestTripResponse>> {
    let validated = validate_trip_request(&payload)?;

    let estimated_fare = estimate_fare(
        validated.vehicle_class,
        payload.distance_km,
        payload.duration_min,
    );

    let trip = store::trips::create(
        &state.db,
        NewTrip {
            rider_id: claims.sub,
            service_kind: validated.service_kind,
            vehicle_class: validated.vehicle_class,
            origin_lat: payload.origin.lat,
            origin_lng: payload.origin.lng,
            origin_address: payload.origin.address.trim().to_string(),
            dest_lat: payload.destination.lat,
            dest_lng: payload.destination.lng,
            dest_address: payload.destination.address.trim().to_string(),
            distance_km: payload.distance_km,
            duration_min: payload.duration_min,
            estimated_fare,
        },
    )
    .await?;

    let origin = Point::new(trip.origin_lat, trip.origin_lng)
        .ok_or_else(|| AppError::Internal("stored origin failed coordinate check".to_string()))?;

    let candidates = matching::find_candidates(
        &state.db,
        origin,
        trip.vehicle_class,
        state.config.match_radius_km,
        state.config.match_limit,
    )
    .await?;

    tracing::info!(
        trip = %trip.public_id,
        rider = %claims.sub,
        candidates = candidates.len(),
        "trip requested"
    );

    Ok(Json(RequestTripResponse {
        success: true,
        message: "Trip request created".to_string(),
        trip_id: trip.public_id,
        state: trip.state,
        estimated_fare,
        candidates_found: candidates.len(),
        candidates,
    }))
}

#[derive(Debug, Deserialize)]
pub struct NearbyDriversQuery {
    pub lat: f64,
    pub lng: f64,
    pub vehicle_class: String,
    pub radius_km: Option<f64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct NearbyDriversResponse {
    pub success: bool,
    pub total: usize,
    pub drivers: Vec<Candidate>,
}

/// Clients may ask for fewer results than the configured cap, never more.
fn effective_limit(requested: Option<u64>, cap: u64) -> u64 {
    requested.unwrap_or(cap).min(cap)
}

/// Available drivers of a class around a point, nearest first.
pub async fn nearby_drivers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NearbyDriversQuery>,
) -> AppResult<Json<NearbyDriversResponse>> {
    let mut errors = Vec::new();
    let origin = Point::new(query.lat, query.lng);
    if origin.is_none() {
        errors.push("lat/lng are out of range".to_string());
    }
    let vehicle_class = VehicleClass::from_client(&query.vehicle_class);
    if vehicle_class.is_none() {
        errors.push("vehicle_class is not a known vehicle class".to_string());
    }
    let radius_km = query.radius_km.unwrap_or(state.config.match_radius_km);
    if !radius_km.is_finite() || radius_km <= 0.0 {
        errors.push("radius_km must be a positive number".to_string());
    }
    let (Some(origin), Some(vehicle_class)) = (origin, vehicle_class) else {
        return Err(AppError::Validation(errors));
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let drivers = matching::find_candidates(
        &state.db,
        origin,
        vehicle_class,
        radius_km,
        effective_limit(query.limit, state.config.match_limit),
    )
    .await?;

    Ok(Json(NearbyDriversResponse {
        success: true,
        total: drivers.len(),
        drivers,
    }))
}

/// Poll the status of one of the rider's trips.
pub async fn trip_status(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<Uuid>,
) -> AppResult<Json<TripStatusView>> {
    let trip = store::trips::find_by_public_id(&state.db, trip_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    if trip.rider_id != claims.sub {
        return Err(AppError::Forbidden(
            "You can only view your own trips".to_string(),
        ));
    }

    let view = queries::trip_status(&state.db, trip_id, state.config.pending_timeout_minutes)
        .await?;
    Ok(Json(view))
}

#[derive(Debug, Serialize)]
pub struct CancelTripResponse {
    pub success: bool,
    pub message: String,
    pub state: TripState,
}

/// Cancel one of the rider's trips.
pub async fn cancel_trip(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<Uuid>,
) -> AppResult<Json<CancelTripResponse>> {
    let trip = dispatch::cancel_trip(
        &state.db,
        &state.notifier,
        trip_id,
        claims.sub,
        claims.role,
    )
    .await?;

    Ok(Json(CancelTripResponse {
        success: true,
        message: "Trip cancelled".to_string(),
        state: trip.state,
    }))
}

#[derive(Debug, Serialize)]
pub struct TripSummary {
    pub trip_id: Uuid,
    pub state: String,
    pub origin_address: String,
    pub dest_address: String,
    pub estimated_fare: f64,
    pub created_at: DateTime<Utc>,
}

/// The rider's trips, newest first.
pub async fn my_trips(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<TripSummary>>> {
    let trips = store::trips::list_for_rider(&state.db, claims.sub).await?;

    let summaries = trips.into_iter().map(summarize).collect();
    Ok(Json(summaries))
}

fn summarize(t: trip::Model) -> TripSummary {
    TripSummary {
        trip_id: t.public_id,
        state: t.state.to_value(),
        origin_address: t.origin_address,
        dest_address: t.dest_address,
        estimated_fare: t.estimated_fare,
        created_at: t.created_at.with_timezone(&Utc),
    }
}
