use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{entities::staff::StaffRole, errors::ApiError, AppState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Staff id.
    pub sub: i32,
    pub role: StaffRole,
    pub iat: i64,
    pub exp: i64,
}

/// Token issuing / verification and password hashing.
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl AuthService {
    pub fn new(secret: &str, expiration_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs,
        }
    }

    pub fn issue_token(&self, staff_id: i32, role: StaffRole) -> Result<String, ApiError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: staff_id,
            role,
            iat: now,
            exp: now + self.expiration_secs,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| ApiError::InternalServerError)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| ApiError::Unauthorized)
    }

    pub fn hash_password(&self, password: &str) -> Result<String, ApiError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|_| ApiError::InternalServerError)
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

/// The caller identity extracted from the `Authorization: Bearer` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedStaff {
    pub staff_id: i32,
    pub role: StaffRole,
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedStaff {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;
        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        let claims = state.auth.verify_token(token)?;
        Ok(AuthenticatedStaff {
            staff_id: claims.sub,
            role: claims.role,
        })
    }
}

/// Capability matrix for execution updates on a route:
///
/// | role       | own route | other routes |
/// |------------|-----------|--------------|
/// | buyer      | yes       | no           |
/// | supervisor | yes       | yes          |
/// | admin      | yes       | yes          |
pub fn can_update_stop(actor: &AuthenticatedStaff, route_staff_id: i32) -> bool {
    match actor.role {
        StaffRole::Supervisor | StaffRole::Admin => true,
        StaffRole::Buyer => actor.staff_id == route_staff_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buyer_can_only_touch_own_route() {
        let buyer = AuthenticatedStaff {
            staff_id: 7,
            role: StaffRole::Buyer,
        };
        assert!(can_update_stop(&buyer, 7));
        assert!(!can_update_stop(&buyer, 8));
    }

    #[test]
    fn supervisor_and_admin_can_touch_any_route() {
        for role in [StaffRole::Supervisor, StaffRole::Admin] {
            let actor = AuthenticatedStaff {
                staff_id: 1,
                role,
            };
            assert!(can_update_stop(&actor, 99));
        }
    }

    #[test]
    fn token_round_trip_preserves_identity() {
        let auth = AuthService::new("test-secret-key-material", 3600);
        let token = auth.issue_token(42, StaffRole::Buyer).unwrap();
        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, StaffRole::Buyer);
    }

    #[test]
    fn password_hash_round_trip() {
        let auth = AuthService::new("test-secret-key-material", 3600);
        let hash = auth.hash_password("kaidashi").unwrap();
        assert!(auth.verify_password("kaidashi", &hash));
        assert!(!auth.verify_password("wrong", &hash));
    }
}
