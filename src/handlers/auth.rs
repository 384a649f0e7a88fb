use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, Json};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::driver_profile::{self, VehicleClass, VerificationStatus};
use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::create_token;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: String,
    /// "rider" or "driver"; drivers must supply vehicle details.
    pub role: String,
    pub vehicle_class: Option<String>,
    pub plate: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

#[derive(Debug)]
struct ValidatedRegistration {
    role: UserRole,
    vehicle: Option<(VehicleClass, String)>,
}

/// Validate the whole registration payload, collecting every problem instead
/// of stopping at the first.
fn validate_registration(payload: &RegisterRequest) -> Result<ValidatedRegistration, AppError> {
    let mut errors = Vec::new();

    if payload.email.trim().is_empty() || !payload.email.contains('@') {
        errors.push("email is not a valid address".to_string());
    }
    if payload.password.len() < 8 {
        errors.push("password must be at least 8 characters".to_string());
    }
    if payload.name.trim().is_empty() {
        errors.push("name must not be empty".to_string());
    }
    if payload.phone.trim().is_empty() {
        errors.push("phone must not be empty".to_string());
    }

    let role = match payload.role.as_str() {
        "rider" => Some(UserRole::Rider),
        "driver" => Some(UserRole::Driver),
        _ => {
            errors.push("role must be 'rider' or 'driver'".to_string());
            None
        }
    };

    let mut vehicle = None;
    if role == Some(UserRole::Driver) {
        match payload.vehicle_class.as_deref().map(VehicleClass::from_client) {
            Some(Some(class)) => match payload.plate.as_deref() {
                Some(plate) if !plate.trim().is_empty() => {
                    vehicle = Some((class, plate.trim().to_string()));
                }
                _ => errors.push("plate is required for drivers".to_string()),
            },
            Some(None) => errors.push("vehicle_class is not a known vehicle class".to_string()),
            None => errors.push("vehicle_class is required for drivers".to_string()),
        }
    }

    match role {
        Some(role) if errors.is_empty() => Ok(ValidatedRegistration { role, vehicle }),
        _ => Err(AppError::Validation(errors)),
    }
}

/// Register a rider or driver account. Drivers start unverified and
/// unavailable; an admin must approve them before they can be matched.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    let validated = validate_registration(&payload)?;

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&payload.email))
        .one(&state.db)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?
        .to_string();

    let user_id = Uuid::new_v4();
    let new_user = user::ActiveModel {
        id: Set(user_id),
        email: Set(payload.email.clone()),
        password_hash: Set(password_hash),
        name: Set(payload.name.trim().to_string()),
        phone: Set(payload.phone.trim().to_string()),
        role: Set(validated.role),
        ..Default::default()
    };

    let user = new_user.insert(&state.db).await?;

    if let Some((vehicle_class, plate)) = validated.vehicle {
        driver_profile::ActiveModel {
            user_id: Set(user.id),
            vehicle_class: Set(vehicle_class),
            plate: Set(plate),
            verification: Set(VerificationStatus::Pending),
            available: Set(false),
            ..Default::default()
        }
        .insert(&state.db)
        .await?;
    }

    let token = create_token(
        user.id,
        &user.email,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;

    tracing::info!(user = %user.id, role = ?user.role, "account registered");

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: UserInfo {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        },
    }))
}

/// Login with email and password
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = user::Entity::find()
        .filter(user::Column::Email.eq(&payload.email))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::Internal(format!("Failed to parse password hash: {}", e)))?;

    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let token = create_token(
        user.id,
        &user.email,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: UserInfo {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_payload() -> RegisterRequest {
        RegisterRequest {
            email: "rider@example.com".to_string(),
            password: "correcthorse".to_string(),
            name: "Ana".to_string(),
            phone: "3001234567".to_string(),
            role: "rider".to_string(),
            vehicle_class: None,
            plate: None,
        }
    }

    #[test]
    fn collects_every_invalid_field() {
        let payload = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            role: "pilot".to_string(),
            ..base_payload()
        };

        let err = validate_registration(&payload).unwrap_err();
        match err {
            AppError::Validation(details) => {
                assert_eq!(details.len(), 3);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn driver_requires_vehicle_details() {
        let payload = RegisterRequest {
            role: "driver".to_string(),
            ..base_payload()
        };

        let err = validate_registration(&payload).unwrap_err();
        match err {
            AppError::Validation(details) => {
                assert!(details.iter().any(|d| d.contains("vehicle_class")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn driver_with_vehicle_synonym_passes() {
        let payload = RegisterRequest {
            role: "driver".to_string(),
            vehicle_class: Some("moto".to_string()),
            plate: Some("XYZ789".to_string()),
            ..base_payload()
        };

        let validated = validate_registration(&payload).unwrap();
        assert_eq!(validated.role, UserRole::Driver);
        assert_eq!(
            validated.vehicle,
            Some((VehicleClass::Motorcycle, "XYZ789".to_string()))
        );
    }
}
