use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_core::UserId;

use crate::Role;

/// JWT claims model (transport-agnostic).
///
/// The minimal set of claims the storefront expects once a token has been
/// decoded and its signature verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    /// Roles granted to the user.
    #[serde(default)]
    pub roles: Vec<Role>,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("invalid token signature")]
    InvalidSignature,
}

/// Deterministically validate JWT claims.
///
/// Validates the time window only; signature checks live in [`crate::jwt`].
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims_at(issued_at: DateTime<Utc>, ttl: Duration) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(),
            roles: vec![Role::CUSTOMER],
            issued_at,
            expires_at: issued_at + ttl,
        }
    }

    #[test]
    fn accepts_claims_inside_window() {
        let now = Utc::now();
        let claims = claims_at(now - Duration::minutes(1), Duration::minutes(10));
        assert_eq!(validate_claims(&claims, now), Ok(()));
    }

    #[test]
    fn rejects_expired_future_and_inverted_windows() {
        let now = Utc::now();
        assert_eq!(
            validate_claims(&claims_at(now - Duration::hours(2), Duration::hours(1)), now),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_claims(&claims_at(now + Duration::hours(1), Duration::hours(1)), now),
            Err(TokenValidationError::NotYetValid)
        );
        assert_eq!(
            validate_claims(&claims_at(now, Duration::zero()), now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn roles_default_to_empty() {
        let json = format!(
            r#"{{"sub":"{}","issued_at":"2024-01-01T00:00:00Z","expires_at":"2024-01-01T01:00:00Z"}}"#,
            UserId::new()
        );
        let claims: JwtClaims = serde_json::from_str(&json).unwrap();
        assert!(claims.roles.is_empty());
    }
}
