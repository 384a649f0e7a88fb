use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Vehicle classes a trip can require. Client payloads historically used a few
/// synonyms for these, so parsing goes through [`VehicleClass::from_client`]
/// instead of a serde rename; unknown input is rejected at validation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "vehicle_class")]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    #[sea_orm(string_value = "motorcycle")]
    Motorcycle,
    #[sea_orm(string_value = "car")]
    Car,
    #[sea_orm(string_value = "van")]
    Van,
}

impl VehicleClass {
    /// Map a client-supplied vehicle class string to the closed enum.
    /// Cargo variants ride on the nearest physical vehicle.
    pub fn from_client(value: &str) -> Option<Self> {
        match value {
            "motorcycle" | "moto" | "cargo_moto" => Some(Self::Motorcycle),
            "car" => Some(Self::Car),
            "van" | "cargo_car" => Some(Self::Van),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "verification_status")]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl VerificationStatus {
    pub fn from_client(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "driver_profile")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    pub vehicle_class: VehicleClass,
    pub plate: String,
    pub verification: VerificationStatus,
    /// The driver's chosen availability. Whether they are mid-trip is tracked
    /// separately in `on_trip`, so finishing a trip never overrides a driver
    /// who went offline along the way.
    pub available: bool,
    pub on_trip: bool,
    pub current_lat: Option<f64>,
    pub current_lng: Option<f64>,
    pub location_updated_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// A driver can be offered trips only when verified, free, not already on
    /// a trip, and reporting a known location.
    pub fn is_matchable(&self) -> bool {
        self.verification == VerificationStatus::Approved
            && self.available
            && !self.on_trip
            && self.current_lat.is_some()
            && self.current_lng.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_class_accepts_known_synonyms() {
        assert_eq!(VehicleClass::from_client("moto"), Some(VehicleClass::Motorcycle));
        assert_eq!(VehicleClass::from_client("cargo_moto"), Some(VehicleClass::Motorcycle));
        assert_eq!(VehicleClass::from_client("car"), Some(VehicleClass::Car));
        assert_eq!(VehicleClass::from_client("cargo_car"), Some(VehicleClass::Van));
        assert_eq!(VehicleClass::from_client("van"), Some(VehicleClass::Van));
    }

    #[test]
    fn vehicle_class_rejects_unknown_input() {
        assert_eq!(VehicleClass::from_client("truck"), None);
        assert_eq!(VehicleClass::from_client(""), None);
        assert_eq!(VehicleClass::from_client("Motorcycle"), None);
    }

    #[test]
    fn drivers_on_a_trip_are_never_matchable() {
        let profile = Model {
            id: 1,
            user_id: Uuid::from_u128(1),
            vehicle_class: VehicleClass::Car,
            plate: "ABC123".to_string(),
            verification: VerificationStatus::Approved,
            available: true,
            on_trip: false,
            current_lat: Some(6.2442),
            current_lng: Some(-75.5812),
            location_updated_at: None,
            created_at: chrono::Utc::now().into(),
        };
        assert!(profile.is_matchable());

        let busy = Model {
            on_trip: true,
            ..profile.clone()
        };
        assert!(!busy.is_matchable());

        let offline = Model {
            available: false,
            ..profile
        };
        assert!(!offline.is_matchable());
    }
}
