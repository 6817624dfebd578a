use crate::domain::DriverId;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Deserialize)]
struct DriverClaims {
    #[serde(default)]
    driver_id: Option<Value>,
}

pub struct IdentityVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl IdentityVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // `exp` and `nbf` are checked when present but not required
        validation.required_spec_claims.clear();
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.leeway = 0;

        IdentityVerifier {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    #[instrument(skip_all)]
    pub fn verify(&self, authorization: Option<&str>) -> Result<DriverId, AuthError> {
        let token = authorization
            .and_then(|header| header.strip_prefix(BEARER_PREFIX))
            .ok_or(AuthError::MissingBearerToken)?;

        let token_data = decode::<DriverClaims>(token, &self.key, &self.validation).map_err(|e| {
            debug!("🔑 Rejected token: {}", e);
            AuthError::InvalidToken(e)
        })?;

        token_data
            .claims
            .driver_id
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|driver_id| DriverId::parse(driver_id))
            .ok_or(AuthError::MissingDriverIdClaim)
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingBearerToken,
    #[error("invalid token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("driver_id claim required")]
    MissingDriverIdClaim,
}
