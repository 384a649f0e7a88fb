use crate::entities::driver_profile::VehicleClass;

/// Per-class tariff: base fare plus per-km and per-minute components, with a
/// floor. Amounts are in COP.
struct Tariff {
    base: f64,
    per_km: f64,
    per_min: f64,
    minimum: f64,
}

fn tariff_for(class: VehicleClass) -> Tariff {
    match class {
        VehicleClass::Motorcycle => Tariff {
            base: 2000.0,
            per_km: 800.0,
            per_min: 150.0,
            minimum: 4000.0,
        },
        VehicleClass::Car => Tariff {
            base: 3500.0,
            per_km: 1200.0,
            per_min: 200.0,
            minimum: 6000.0,
        },
        VehicleClass::Van => Tariff {
            base: 5000.0,
            per_km: 1500.0,
            per_min: 250.0,
            minimum: 9000.0,
        },
    }
}

/// Estimate the fare for a trip from its estimated distance and duration,
/// rounded to the nearest 100 COP.
pub fn estimate_fare(class: VehicleClass, distance_km: f64, duration_min: i32) -> f64 {
    let t = tariff_for(class);
    let raw = t.base + t.per_km * distance_km + t.per_min * f64::from(duration_min);
    let fare = raw.max(t.minimum);
    (fare / 100.0).round() * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_trips_hit_the_minimum_fare() {
        assert_eq!(estimate_fare(VehicleClass::Motorcycle, 0.5, 2), 4000.0);
        assert_eq!(estimate_fare(VehicleClass::Car, 0.5, 2), 6000.0);
    }

    #[test]
    fn fare_grows_with_distance_and_duration() {
        // 10 km, 25 min by motorcycle: 2000 + 8000 + 3750 = 13750 -> 13800
        assert_eq!(estimate_fare(VehicleClass::Motorcycle, 10.0, 25), 13800.0);

        let short = estimate_fare(VehicleClass::Car, 3.0, 10);
        let long = estimate_fare(VehicleClass::Car, 12.0, 35);
        assert!(long > short);
    }

    #[test]
    fn fare_is_rounded_to_hundreds() {
        let fare = estimate_fare(VehicleClass::Van, 7.3, 18);
        assert_eq!(fare % 100.0, 0.0);
    }
}
