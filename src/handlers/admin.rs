use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::driver_profile::{self, VehicleClass, VerificationStatus};
use crate::entities::trip::{self, TripState};
use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::store;
use crate::AppState;

// ============ Driver Management ============

#[derive(Debug, Serialize)]
pub struct DriverOverview {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub vehicle_class: VehicleClass,
    pub plate: String,
    pub verification: VerificationStatus,
    pub available: bool,
    pub registered_at: DateTime<Utc>,
}

/// List every driver with their profile and verification state.
pub async fn list_drivers(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<DriverOverview>>> {
    let rows = driver_profile::Entity::find()
        .find_also_related(user::Entity)
        .all(&state.db)
        .await?;

    let overviews: Vec<DriverOverview> = rows
        .into_iter()
        .filter_map(|(profile, user)| {
            let user = user?;
            Some(DriverOverview {
                id: user.id,
                name: user.name,
                email: user.email,
                phone: user.phone,
                vehicle_class: profile.vehicle_class,
                plate: profile.plate,
                verification: profile.verification,
                available: profile.available,
                registered_at: user.created_at.with_timezone(&Utc),
            })
        })
        .collect();

    Ok(Json(overviews))
}

#[derive(Debug, Deserialize)]
pub struct SetVerificationRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct SetVerificationResponse {
    pub success: bool,
    pub message: String,
    pub verification: VerificationStatus,
}

/// Set a driver's verification status. Only approved drivers are matchable.
pub async fn set_verification(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<Uuid>,
    Json(payload): Json<SetVerificationRequest>,
) -> AppResult<Json<SetVerificationResponse>> {
    let status = VerificationStatus::from_client(&payload.status).ok_or_else(|| {
        AppError::Validation(vec![
            "status must be 'pending', 'approved' or 'rejected'".to_string(),
        ])
    })?;

    let updated = store::drivers::set_verification(&state.db, driver_id, status).await?;
    if !updated {
        return Err(AppError::NotFound("Driver profile not found".to_string()));
    }

    tracing::info!(driver = %driver_id, status = ?status, "driver verification updated");

    Ok(Json(SetVerificationResponse {
        success: true,
        message: "Verification status updated".to_string(),
        verification: status,
    }))
}

// ============ Trips ============

#[derive(Debug, Serialize)]
pub struct AdminTripView {
    pub trip_id: Uuid,
    pub rider_id: Uuid,
    pub state: TripState,
    pub vehicle_class: VehicleClass,
    pub origin_address: String,
    pub dest_address: String,
    pub estimated_fare: f64,
    pub created_at: DateTime<Utc>,
}

/// List trips, newest first.
pub async fn list_trips(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<AdminTripView>>> {
    let trips = trip::Entity::find()
        .order_by_desc(trip::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let views: Vec<AdminTripView> = trips
        .into_iter()
        .map(|t| AdminTripView {
            trip_id: t.public_id,
            rider_id: t.rider_id,
            state: t.state,
            vehicle_class: t.vehicle_class,
            origin_address: t.origin_address,
            dest_address: t.dest_address,
            estimated_fare: t.estimated_fare,
            created_at: t.created_at.with_timezone(&Utc),
        })
        .collect();

    Ok(Json(views))
}

// ============ Dashboard ============

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub riders: u64,
    pub drivers: u64,
    pub drivers_approved: u64,
    pub drivers_available: u64,
    pub trips_pending: u64,
    pub trips_active: u64,
    pub trips_completed: u64,
    pub trips_cancelled: u64,
    pub trips_expired: u64,
}

/// Aggregate counts for the admin dashboard.
pub async fn dashboard_stats(State(state): State<Arc<AppState>>) -> AppResult<Json<DashboardStats>> {
    let riders = user::Entity::find()
        .filter(user::Column::Role.eq(UserRole::Rider))
        .count(&state.db)
        .await?;
    let drivers = user::Entity::find()
        .filter(user::Column::Role.eq(UserRole::Driver))
        .count(&state.db)
        .await?;
    let drivers_approved = driver_profile::Entity::find()
        .filter(driver_profile::Column::Verification.eq(VerificationStatus::Approved))
        .count(&state.db)
        .await?;
    let drivers_available = driver_profile::Entity::find()
        .filter(driver_profile::Column::Available.eq(true))
        .count(&state.db)
        .await?;

    let count_state = |s: TripState| {
        trip::Entity::find()
            .filter(trip::Column::State.eq(s))
            .count(&state.db)
    };

    let trips_pending = count_state(TripState::Pending).await?;
    let trips_active = count_state(TripState::Accepted).await?
        + count_state(TripState::InProgress).await?;
    let trips_completed = count_state(TripState::Completed).await?;
    let trips_cancelled = count_state(TripState::Cancelled).await?;
    let trips_expired = count_state(TripState::Expired).await?;

    Ok(Json(DashboardStats {
        riders,
        drivers,
        drivers_approved,
        drivers_available,
        trips_pending,
        trips_active,
        trips_completed,
        trips_cancelled,
        trips_expired,
    }))
}
