//! Proximity search over driver last-known locations.
//!
//! Eligibility filtering happens twice on purpose: once in SQL when fetching
//! matchable drivers, and again in [`shortlist`] so the ranking step is a
//! pure function that can be exercised without a database.

use sea_orm::{ConnectionTrait, DbErr};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::driver_profile::{self, VehicleClass};
use crate::entities::user;
use crate::store;
use crate::utils::geo::{haversine_distance, valid_coords};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        valid_coords(lat, lng).then_some(Self { lat, lng })
    }
}

/// A driver ranked by distance to a trip origin. The public profile fields a
/// rider is allowed to see, nothing more.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub driver_id: Uuid,
    pub name: String,
    pub phone: String,
    pub vehicle_class: VehicleClass,
    pub plate: String,
    pub lat: f64,
    pub lng: f64,
    pub distance_km: f64,
}

/// Filter and rank fetched drivers around an origin: requested class only,
/// matchable only, within the radius, ascending distance, ties broken by
/// driver id so equal-distance results are deterministic.
pub fn shortlist(
    origin: Point,
    drivers: Vec<(driver_profile::Model, user::Model)>,
    vehicle_class: VehicleClass,
    radius_km: f64,
    limit: usize,
) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = drivers
        .into_iter()
        .filter_map(|(profile, user)| {
            if profile.vehicle_class != vehicle_class || !profile.is_matchable() {
                return None;
            }
            let (lat, lng) = (profile.current_lat?, profile.current_lng?);
            let distance_km = haversine_distance(origin.lat, origin.lng, lat, lng);
            if distance_km > radius_km {
                return None;
            }
            Some(Candidate {
                driver_id: profile.user_id,
                name: user.name,
                phone: user.phone,
                vehicle_class: profile.vehicle_class,
                plate: profile.plate,
                lat,
                lng,
                distance_km: (distance_km * 100.0).round() / 100.0,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| a.driver_id.cmp(&b.driver_id))
    });
    candidates.truncate(limit);
    candidates
}

/// Find available drivers of the requested class within `radius_km` of the
/// origin, nearest first. An empty list is a normal outcome.
pub async fn find_candidates<C: ConnectionTrait>(
    conn: &C,
    origin: Point,
    vehicle_class: VehicleClass,
    radius_km: f64,
    limit: u64,
) -> Result<Vec<Candidate>, DbErr> {
    let rows = store::drivers::list_matchable(conn, vehicle_class).await?;
    let drivers = rows
        .into_iter()
        .filter_map(|(profile, user)| user.map(|u| (profile, u)))
        .collect();

    Ok(shortlist(origin, drivers, vehicle_class, radius_km, limit as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::driver_profile::VerificationStatus;
    use chrono::Utc;

    fn driver(
        id: u128,
        name: &str,
        class: VehicleClass,
        verification: VerificationStatus,
        available: bool,
        lat: f64,
        lng: f64,
    ) -> (driver_profile::Model, user::Model) {
        let user_id = Uuid::from_u128(id);
        let created = Utc::now().into();
        (
            driver_profile::Model {
                id: id as i64,
                user_id,
                vehicle_class: class,
                plate: format!("ABC{id:03}"),
                verification,
                available,
                on_trip: false,
                current_lat: Some(lat),
                current_lng: Some(lng),
                location_updated_at: Some(created),
                created_at: created,
            },
            user::Model {
                id: user_id,
                email: format!("{name}@example.com"),
                password_hash: String::new(),
                name: name.to_string(),
                phone: "3000000000".to_string(),
                role: user::UserRole::Driver,
                created_at: created,
            },
        )
    }

    // Medellín city center
    const ORIGIN: Point = Point {
        lat: 6.2442,
        lng: -75.5812,
    };

    // Offsets chosen so haversine distance lands where the name says.
    // 1 degree of latitude is ~111.19 km.
    fn point_at_km(km: f64) -> (f64, f64) {
        (ORIGIN.lat + km / 111.19, ORIGIN.lng)
    }

    #[test]
    fn ranks_eligible_drivers_by_distance_and_skips_unapproved() {
        let (lat_12, lng_12) = point_at_km(1.2);
        let (lat_48, lng_48) = point_at_km(4.8);
        let (lat_05, lng_05) = point_at_km(0.5);

        let drivers = vec![
            driver(2, "far", VehicleClass::Motorcycle, VerificationStatus::Approved, true, lat_48, lng_48),
            driver(1, "near", VehicleClass::Motorcycle, VerificationStatus::Approved, true, lat_12, lng_12),
            // Closest of the three, but unapproved: must not appear.
            driver(3, "unverified", VehicleClass::Motorcycle, VerificationStatus::Pending, true, lat_05, lng_05),
        ];

        let result = shortlist(ORIGIN, drivers, VehicleClass::Motorcycle, 5.0, 10);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].name, "near");
        assert!((result[0].distance_km - 1.2).abs() < 0.05);
        assert_eq!(result[1].name, "far");
        assert!((result[1].distance_km - 4.8).abs() < 0.05);
    }

    #[test]
    fn never_returns_drivers_beyond_the_radius() {
        let (lat, lng) = point_at_km(5.2);
        let drivers = vec![driver(
            1, "outside", VehicleClass::Car, VerificationStatus::Approved, true, lat, lng,
        )];

        let result = shortlist(ORIGIN, drivers, VehicleClass::Car, 5.0, 10);
        assert!(result.is_empty());
    }

    #[test]
    fn filters_unavailable_on_trip_and_wrong_class() {
        let (lat, lng) = point_at_km(1.0);
        let (on_trip_profile, on_trip_user) =
            driver(3, "ontrip", VehicleClass::Car, VerificationStatus::Approved, true, lat, lng);
        let drivers = vec![
            driver(1, "offline", VehicleClass::Car, VerificationStatus::Approved, false, lat, lng),
            driver(2, "moto", VehicleClass::Motorcycle, VerificationStatus::Approved, true, lat, lng),
            (
                driver_profile::Model {
                    on_trip: true,
                    ..on_trip_profile
                },
                on_trip_user,
            ),
        ];

        let result = shortlist(ORIGIN, drivers, VehicleClass::Car, 5.0, 10);
        assert!(result.is_empty());
    }

    #[test]
    fn equal_distances_tie_break_on_driver_id() {
        let (lat, lng) = point_at_km(2.0);
        let drivers = vec![
            driver(9, "second", VehicleClass::Car, VerificationStatus::Approved, true, lat, lng),
            driver(4, "first", VehicleClass::Car, VerificationStatus::Approved, true, lat, lng),
        ];

        let result = shortlist(ORIGIN, drivers, VehicleClass::Car, 5.0, 10);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].driver_id, Uuid::from_u128(4));
        assert_eq!(result[1].driver_id, Uuid::from_u128(9));
    }

    #[test]
    fn truncates_to_limit() {
        let drivers = (1..=5u128)
            .map(|i| {
                let (lat, lng) = point_at_km(i as f64 * 0.5);
                driver(i, "d", VehicleClass::Car, VerificationStatus::Approved, true, lat, lng)
            })
            .collect();

        let result = shortlist(ORIGIN, drivers, VehicleClass::Car, 5.0, 3);
        assert_eq!(result.len(), 3);
        assert!(result[0].distance_km <= result[1].distance_km);
        assert!(result[1].distance_km <= result[2].distance_km);
    }

    #[test]
    fn rejects_malformed_origin() {
        assert!(Point::new(91.0, 0.0).is_none());
        assert!(Point::new(0.0, 181.0).is_none());
        assert!(Point::new(f64::NAN, 0.0).is_none());
        assert!(Point::new(6.2442, -75.5812).is_some());
    }
}
