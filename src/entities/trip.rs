use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::driver_profile::VehicleClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "service_kind")]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    #[sea_orm(string_value = "transport")]
    Transport,
    #[sea_orm(string_value = "package_delivery")]
    PackageDelivery,
}

impl ServiceKind {
    /// Map a client-supplied service kind string to the closed enum.
    pub fn from_client(value: &str) -> Option<Self> {
        match value {
            "transport" | "ride" | "trip" => Some(Self::Transport),
            "package_delivery" | "package" | "parcel" => Some(Self::PackageDelivery),
            _ => None,
        }
    }
}

/// Trip lifecycle state.
///
/// ```text
/// pending --> accepted --> in_progress --> completed
///    |            |             |
///    |            +--> cancelled <--+
///    +--> expired / cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "trip_state")]
#[serde(rename_all = "snake_case")]
pub enum TripState {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "expired")]
    Expired,
}

impl TripState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Expired)
    }

    /// Whether `self -> to` is an edge of the lifecycle graph. Every state
    /// change in the system goes through a conditional update guarded by the
    /// `from` state, so an illegal transition is never observable even when
    /// callers race.
    pub fn can_transition_to(self, to: TripState) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Accepted)
                | (Self::Pending, Self::Cancelled)
                | (Self::Pending, Self::Expired)
                | (Self::Accepted, Self::InProgress)
                | (Self::Accepted, Self::Cancelled)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Cancelled)
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trip")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub public_id: Uuid,
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
    pub state: TripState,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::RiderId",
        to = "super::user::Column::Id"
    )]
    Rider,
    #[sea_orm(has_many = "super::assignment::Entity")]
    Assignments,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rider.def()
    }
}

impl Related<super::assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn service_kind_accepts_known_synonyms() {
        assert_eq!(ServiceKind::from_client("ride"), Some(ServiceKind::Transport));
        assert_eq!(ServiceKind::from_client("trip"), Some(ServiceKind::Transport));
        assert_eq!(ServiceKind::from_client("transport"), Some(ServiceKind::Transport));
        assert_eq!(ServiceKind::from_client("parcel"), Some(ServiceKind::PackageDelivery));
        assert_eq!(ServiceKind::from_client("package"), Some(ServiceKind::PackageDelivery));
    }

    #[test]
    fn service_kind_rejects_unknown_input() {
        assert_eq!(ServiceKind::from_client("freight"), None);
        assert_eq!(ServiceKind::from_client(""), None);
    }

    #[test]
    fn only_lifecycle_edges_are_legal() {
        use TripState::*;
        let legal = [
            (Pending, Accepted),
            (Pending, Cancelled),
            (Pending, Expired),
            (Accepted, InProgress),
            (Accepted, Cancelled),
            (InProgress, Completed),
            (InProgress, Cancelled),
        ];

        for from in TripState::iter() {
            for to in TripState::iter() {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        use TripState::*;
        for from in [Completed, Cancelled, Expired] {
            assert!(from.is_terminal());
            for to in TripState::iter() {
                assert!(!from.can_transition_to(to), "{from:?} -> {to:?}");
            }
        }
        assert!(!Pending.is_terminal());
        assert!(!Accepted.is_terminal());
        assert!(!InProgress.is_terminal());
    }
}
