use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handlers::{admin, auth, driver, rider};
use crate::middleware::auth::{auth_middleware, require_admin, require_driver, require_rider};
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Public routes
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    // Rider routes (requires auth + rider role)
    let rider_routes = Router::new()
        .route("/trips", post(rider::request_trip))
        .route("/trips", get(rider::my_trips))
        .route("/trips/{id}", get(rider::trip_status))
        .route("/trips/{id}/cancel", post(rider::cancel_trip))
        .route("/drivers/nearby", get(rider::nearby_drivers))
        .layer(middleware::from_fn(require_rider))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Driver routes (requires auth + driver role)
    let driver_routes = Router::new()
        .route("/availability", put(driver::set_availability))
        .route("/requests", get(driver::pending_requests))
        .route("/trips/{id}/accept", post(driver::accept_trip))
        .route("/trips/{id}/start", post(driver::start_trip))
        .route("/trips/{id}/complete", post(driver::complete_trip))
        .route("/trips/{id}/cancel", post(driver::cancel_trip))
        .route("/history", get(driver::history))
        .layer(middleware::from_fn(require_driver))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin routes (requires auth + admin role)
    let admin_routes = Router::new()
        .route("/drivers", get(admin::list_drivers))
        .route("/drivers/{id}/verification", put(admin::set_verification))
        .route("/trips", get(admin::list_trips))
        .route("/stats", get(admin::dashboard_stats))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/rider", rider_routes)
        .nest("/api/driver", driver_routes)
        .nest("/api/admin", admin_routes)
        .with_state(state)
}
