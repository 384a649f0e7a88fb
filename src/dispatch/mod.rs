//! Trip lifecycle coordination: acceptance, start, completion, cancellation,
//! and expiry.
//!
//! Workers on different hosts call into here concurrently, so none of these
//! functions hold in-process locks. Exclusivity comes from the trip store's
//! conditional state update: whichever caller's guard holds at commit time
//! wins, everyone else gets a definitive failure immediately.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::{ActiveEnum, DatabaseConnection, TransactionTrait};
use serde_json::json;
use uuid::Uuid;

use crate::entities::trip::{self, TripState};
use crate::entities::user::UserRole;
use crate::entities::driver_profile::VerificationStatus;
use crate::error::{AppError, AppResult};
use crate::notify::{Event, Notifier};
use crate::store;
use crate::AppState;

pub(crate) fn is_stale(trip: &trip::Model, timeout_minutes: i64) -> bool {
    trip.state == TripState::Pending
        && Utc::now() - trip.created_at.with_timezone(&Utc) > Duration::minutes(timeout_minutes)
}

/// A driver accepts a pending trip.
///
/// Eligibility is re-validated here even though candidate lists were already
/// filtered: the list a driver acted on may be minutes old. The acceptance
/// itself is three writes (trip state, assignment row, driver occupancy)
/// in one transaction, entered through the `pending -> accepted` guard; if
/// any write fails the whole acceptance rolls back, so an `accepted` trip
/// without an assignment is never durable.
pub async fn accept_trip(
    db: &DatabaseConnection,
    notifier: &Notifier,
    trip_public_id: Uuid,
    driver_id: Uuid,
    pending_timeout_minutes: i64,
) -> AppResult<trip::Model> {
    let trip = store::trips::find_by_public_id(db, trip_public_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    if is_stale(&trip, pending_timeout_minutes) {
        // Expire lazily; the sweep may not have seen it yet. Losing this CAS
        // just means someone else resolved the state first.
        store::trips::transition_state(db, trip.id, TripState::Pending, TripState::Expired)
            .await?;
        return Err(AppError::TripAlreadyTaken);
    }

    if trip.state != TripState::Pending {
        return Err(AppError::TripAlreadyTaken);
    }

    let profile = store::drivers::find_profile(db, driver_id)
        .await?
        .ok_or_else(|| {
            AppError::DriverNotEligible("Driver has no registered profile".to_string())
        })?;

    if profile.verification != VerificationStatus::Approved {
        return Err(AppError::DriverNotEligible(
            "Driver is not verified".to_string(),
        ));
    }
    if !profile.available {
        return Err(AppError::DriverNotEligible(
            "Driver is not available".to_string(),
        ));
    }
    if profile.on_trip {
        return Err(AppError::DriverNotEligible(
            "Driver is already on a trip".to_string(),
        ));
    }
    if profile.vehicle_class != trip.vehicle_class {
        return Err(AppError::DriverNotEligible(format!(
            "Trip requires a {}, driver has a {}",
            trip.vehicle_class.to_value(),
            profile.vehicle_class.to_value(),
        )));
    }

    let txn = db.begin().await?;

    // The race everyone is protecting against: exactly one acceptor gets
    // rows_affected = 1 here.
    if !store::trips::transition_state(&txn, trip.id, TripState::Pending, TripState::Accepted)
        .await?
    {
        txn.rollback().await?;
        return Err(AppError::TripAlreadyTaken);
    }

    store::assignments::create_assigned(&txn, trip.id, driver_id).await?;

    // The driver may have accepted a different trip between the eligibility
    // check and now; the guarded flip catches that.
    if !store::drivers::mark_on_trip(&txn, driver_id).await? {
        txn.rollback().await?;
        return Err(AppError::DriverNotEligible(
            "Driver is already on a trip".to_string(),
        ));
    }

    txn.commit().await?;

    tracing::info!(trip = %trip_public_id, driver = %driver_id, "trip accepted");

    notifier.notify(
        trip.rider_id,
        Event::TripAccepted,
        json!({ "trip_id": trip_public_id, "driver_id": driver_id }),
    );

    Ok(trip::Model {
        state: TripState::Accepted,
        ..trip
    })
}

/// The assigned driver starts the trip (`accepted -> in_progress`).
pub async fn begin_trip(
    db: &DatabaseConnection,
    notifier: &Notifier,
    trip_public_id: Uuid,
    driver_id: Uuid,
) -> AppResult<trip::Model> {
    let trip = store::trips::find_by_public_id(db, trip_public_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    let assignment = store::assignments::find_active_for_trip(db, trip.id)
        .await?
        .ok_or_else(|| {
            AppError::InvalidStateTransition("Trip has no active assignment".to_string())
        })?;

    if assignment.driver_id != driver_id {
        return Err(AppError::Forbidden(
            "Trip is assigned to another driver".to_string(),
        ));
    }

    if !store::trips::transition_state(db, trip.id, TripState::Accepted, TripState::InProgress)
        .await?
    {
        return Err(AppError::InvalidStateTransition(format!(
            "Trip cannot start from state '{}'",
            trip.state.to_value(),
        )));
    }

    tracing::info!(trip = %trip_public_id, driver = %driver_id, "trip started");

    notifier.notify(
        trip.rider_id,
        Event::TripStarted,
        json!({ "trip_id": trip_public_id }),
    );

    Ok(trip::Model {
        state: TripState::InProgress,
        ..trip
    })
}

/// The assigned driver completes the trip. Releases the assignment and frees
/// the driver in the same transaction as the state change.
pub async fn complete_trip(
    db: &DatabaseConnection,
    notifier: &Notifier,
    trip_public_id: Uuid,
    driver_id: Uuid,
) -> AppResult<trip::Model> {
    let trip = store::trips::find_by_public_id(db, trip_public_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    let assignment = store::assignments::find_active_for_trip(db, trip.id)
        .await?
        .ok_or_else(|| {
            AppError::InvalidStateTransition("Trip has no active assignment".to_string())
        })?;

    if assignment.driver_id != driver_id {
        return Err(AppError::Forbidden(
            "Trip is assigned to another driver".to_string(),
        ));
    }

    let txn = db.begin().await?;

    if !store::trips::transition_state(&txn, trip.id, TripState::InProgress, TripState::Completed)
        .await?
    {
        txn.rollback().await?;
        return Err(AppError::InvalidStateTransition(format!(
            "Trip cannot complete from state '{}'",
            trip.state.to_value(),
        )));
    }

    store::assignments::release_active(&txn, trip.id).await?;
    store::drivers::clear_on_trip(&txn, driver_id).await?;

    txn.commit().await?;

    tracing::info!(trip = %trip_public_id, driver = %driver_id, "trip completed");

    notifier.notify(
        trip.rider_id,
        Event::TripCompleted,
        json!({ "trip_id": trip_public_id }),
    );

    Ok(trip::Model {
        state: TripState::Completed,
        ..trip
    })
}

/// Rider, assigned driver, or admin cancels a trip.
///
/// Cancelling `pending` releases nothing. Cancelling `accepted` or
/// `in_progress` releases the assignment and frees the driver, exactly once:
/// the state CAS is the gate, so a second cancel lands on a terminal trip and
/// gets InvalidStateTransition without touching the driver again. A cancel
/// racing an accept resolves to whichever guard commits first; a cancel that
/// loses re-reads and cancels the now-accepted trip instead.
pub async fn cancel_trip(
    db: &DatabaseConnection,
    notifier: &Notifier,
    trip_public_id: Uuid,
    actor_id: Uuid,
    actor_role: UserRole,
) -> AppResult<trip::Model> {
    let trip = store::trips::find_by_public_id(db, trip_public_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    let active = store::assignments::find_active_for_trip(db, trip.id).await?;

    let authorized = match actor_role {
        UserRole::Admin => true,
        UserRole::Rider => trip.rider_id == actor_id,
        UserRole::Driver => active.as_ref().is_some_and(|a| a.driver_id == actor_id),
    };
    if !authorized {
        return Err(AppError::Forbidden(
            "You cannot cancel this trip".to_string(),
        ));
    }

    if trip.state.is_terminal() {
        return Err(AppError::InvalidStateTransition(format!(
            "Trip is already '{}'",
            trip.state.to_value(),
        )));
    }

    if trip.state == TripState::Pending {
        if store::trips::transition_state(db, trip.id, TripState::Pending, TripState::Cancelled)
            .await?
        {
            tracing::info!(trip = %trip_public_id, actor = %actor_id, "pending trip cancelled");
            notifier.notify(
                trip.rider_id,
                Event::TripCancelled,
                json!({ "trip_id": trip_public_id }),
            );
            return Ok(trip::Model {
                state: TripState::Cancelled,
                ..trip
            });
        }

        // Lost the race against an accept (or the expiry sweep). Re-read and
        // cancel the assignment-holding trip if it is still live.
        let trip = store::trips::find_by_public_id(db, trip_public_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;
        if trip.state.is_terminal() {
            return Err(AppError::InvalidStateTransition(format!(
                "Trip is already '{}'",
                trip.state.to_value(),
            )));
        }
        return cancel_assigned(db, notifier, trip, trip_public_id).await;
    }

    cancel_assigned(db, notifier, trip, trip_public_id).await
}

async fn cancel_assigned(
    db: &DatabaseConnection,
    notifier: &Notifier,
    trip: trip::Model,
    trip_public_id: Uuid,
) -> AppResult<trip::Model> {
    let txn = db.begin().await?;

    if !store::trips::transition_state(&txn, trip.id, trip.state, TripState::Cancelled).await? {
        txn.rollback().await?;
        return Err(AppError::InvalidStateTransition(
            "Trip changed state concurrently; cancellation did not apply".to_string(),
        ));
    }

    let assignment = store::assignments::find_active_for_trip(&txn, trip.id).await?;
    if let Some(assignment) = &assignment {
        store::assignments::release_active(&txn, trip.id).await?;
        store::drivers::clear_on_trip(&txn, assignment.driver_id).await?;
    }

    txn.commit().await?;

    tracing::info!(trip = %trip_public_id, "trip cancelled");

    notifier.notify(
        trip.rider_id,
        Event::TripCancelled,
        json!({ "trip_id": trip_public_id }),
    );
    if let Some(assignment) = assignment {
        notifier.notify(
            assignment.driver_id,
            Event::TripCancelled,
            json!({ "trip_id": trip_public_id }),
        );
    }

    Ok(trip::Model {
        state: TripState::Cancelled,
        ..trip
    })
}

/// Background sweep turning stale pending trips into `expired`. Acceptance
/// also expires lazily on read, so the sweep is a backstop, not a hot path.
pub async fn run_expiry_sweep(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
    loop {
        interval.tick().await;
        let timeout = state.config.pending_timeout_minutes;
        match store::trips::expire_older_than(&state.db, timeout).await {
            Ok(0) => {}
            Ok(count) => tracing::info!(count, "expired stale pending trips"),
            Err(err) => tracing::error!(error = %err, "expiry sweep failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::assignment::{self, AssignmentState};
    use crate::entities::driver_profile::{self, VehicleClass};
    use crate::entities::trip::ServiceKind;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    const TIMEOUT_MIN: i64 = 10;

    fn pending_trip(age_minutes: i64) -> trip::Model {
        let created = (Utc::now() - Duration::minutes(age_minutes)).into();
        trip::Model {
            id: 1,
            public_id: Uuid::from_u128(0xA11CE),
            rider_id: Uuid::from_u128(10),
            service_kind: ServiceKind::Transport,
            vehicle_class: VehicleClass::Motorcycle,
            origin_lat: 6.2442,
            origin_lng: -75.5812,
            origin_address: "Parque Berrío".to_string(),
            dest_lat: 6.1760,
            dest_lng: -75.5917,
            dest_address: "Envigado".to_string(),
            distance_km: 8.0,
            duration_min: 22,
            estimated_fare: 11700.0,
            state: TripState::Pending,
            created_at: created,
            updated_at: created,
        }
    }

    fn eligible_profile() -> driver_profile::Model {
        driver_profile::Model {
            id: 1,
            user_id: Uuid::from_u128(20),
            vehicle_class: VehicleClass::Motorcycle,
            plate: "ABC123".to_string(),
            verification: VerificationStatus::Approved,
            available: true,
            on_trip: false,
            current_lat: Some(6.25),
            current_lng: Some(-75.58),
            location_updated_at: Some(Utc::now().into()),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn accept_succeeds_for_eligible_driver() {
        let trip = pending_trip(1);
        let profile = eligible_profile();
        let driver_id = profile.user_id;
        let trip_public_id = trip.public_id;

        let inserted = assignment::Model {
            id: 1,
            trip_id: trip.id,
            driver_id,
            state: AssignmentState::Assigned,
            assigned_at: Utc::now().into(),
            released_at: None,
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![trip]])
            .append_query_results([vec![profile]])
            .append_query_results([vec![inserted]])
            .append_exec_results([
                MockExecResult { last_insert_id: 0, rows_affected: 1 }, // trip CAS
                MockExecResult { last_insert_id: 1, rows_affected: 1 },
                MockExecResult { last_insert_id: 0, rows_affected: 1 }, // driver onto the trip
            ])
            .into_connection();

        let result = accept_trip(&db, &Notifier::Noop, trip_public_id, driver_id, TIMEOUT_MIN)
            .await
            .unwrap();
        assert_eq!(result.state, TripState::Accepted);
    }

    #[tokio::test]
    async fn accept_fails_with_taken_when_cas_guard_fails() {
        let trip = pending_trip(1);
        let profile = eligible_profile();
        let driver_id = profile.user_id;
        let trip_public_id = trip.public_id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![trip]])
            .append_query_results([vec![profile]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0, // another driver won
            }])
            .into_connection();

        let err = accept_trip(&db, &Notifier::Noop, trip_public_id, driver_id, TIMEOUT_MIN)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TripAlreadyTaken));
    }

    #[tokio::test]
    async fn accept_rejects_unverified_driver() {
        let trip = pending_trip(1);
        let trip_public_id = trip.public_id;
        let profile = driver_profile::Model {
            verification: VerificationStatus::Pending,
            ..eligible_profile()
        };
        let driver_id = profile.user_id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![trip]])
            .append_query_results([vec![profile]])
            .into_connection();

        let err = accept_trip(&db, &Notifier::Noop, trip_public_id, driver_id, TIMEOUT_MIN)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DriverNotEligible(_)));
    }

    #[tokio::test]
    async fn accept_rejects_vehicle_class_mismatch() {
        let trip = pending_trip(1);
        let trip_public_id = trip.public_id;
        let profile = driver_profile::Model {
            vehicle_class: VehicleClass::Car,
            ..eligible_profile()
        };
        let driver_id = profile.user_id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![trip]])
            .append_query_results([vec![profile]])
            .into_connection();

        let err = accept_trip(&db, &Notifier::Noop, trip_public_id, driver_id, TIMEOUT_MIN)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DriverNotEligible(_)));
    }

    #[tokio::test]
    async fn accept_expires_stale_pending_trip() {
        let trip = pending_trip(TIMEOUT_MIN + 5);
        let trip_public_id = trip.public_id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![trip]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1, // pending -> expired
            }])
            .into_connection();

        let err = accept_trip(
            &db,
            &Notifier::Noop,
            trip_public_id,
            Uuid::from_u128(20),
            TIMEOUT_MIN,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::TripAlreadyTaken));
    }

    #[tokio::test]
    async fn cancel_accepted_releases_driver_exactly_once() {
        let driver_id = Uuid::from_u128(20);
        let trip = trip::Model {
            state: TripState::Accepted,
            ..pending_trip(1)
        };
        let trip_public_id = trip.public_id;
        let rider_id = trip.rider_id;
        let active = assignment::Model {
            id: 1,
            trip_id: trip.id,
            driver_id,
            state: AssignmentState::Assigned,
            assigned_at: Utc::now().into(),
            released_at: None,
        };
        let cancelled = trip::Model {
            state: TripState::Cancelled,
            ..trip.clone()
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // First cancel: trip read, authorization read, then the in-txn
            // assignment read before release.
            .append_query_results([vec![trip]])
            .append_query_results([vec![active.clone()]])
            .append_query_results([vec![active]])
            .append_exec_results([
                MockExecResult { last_insert_id: 0, rows_affected: 1 }, // accepted -> cancelled
                MockExecResult { last_insert_id: 0, rows_affected: 1 }, // assignment released
                MockExecResult { last_insert_id: 0, rows_affected: 1 }, // driver freed
            ])
            // Second cancel: the trip is terminal now; no release runs (the
            // mock has no exec results left, so one would fail the test).
            .append_query_results([vec![cancelled]])
            .append_query_results([Vec::<assignment::Model>::new()])
            .into_connection();

        let result = cancel_trip(
            &db,
            &Notifier::Noop,
            trip_public_id,
            rider_id,
            UserRole::Rider,
        )
        .await
        .unwrap();
        assert_eq!(result.state, TripState::Cancelled);

        let err = cancel_trip(
            &db,
            &Notifier::Noop,
            trip_public_id,
            rider_id,
            UserRole::Rider,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));
    }

    #[tokio::test]
    async fn cancel_rejects_completed_trip() {
        let trip = trip::Model {
            state: TripState::Completed,
            ..pending_trip(1)
        };
        let trip_public_id = trip.public_id;
        let rider_id = trip.rider_id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![trip]])
            .append_query_results([Vec::<assignment::Model>::new()])
            .into_connection();

        let err = cancel_trip(
            &db,
            &Notifier::Noop,
            trip_public_id,
            rider_id,
            UserRole::Rider,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));
    }
}
