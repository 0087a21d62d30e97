//! Identity Provider
//!
//! Authenticates callers from a bearer session token and resolves their role
//! from the `profiles` table. Callers without a profile row are voters.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::database::Database;
use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Voter,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Voter => "voter",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voter" => Ok(Role::Voter),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// An authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), LedgerError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(LedgerError::Forbidden(format!(
                "{} is not an administrator",
                self.user_id
            )))
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    iss: String,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct IdentityProvider {
    database: Database,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    token_ttl_secs: u64,
}

impl IdentityProvider {
    pub fn new(database: Database, auth: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[auth.issuer.as_str()]);

        Self {
            database,
            encoding_key: EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
            validation,
            issuer: auth.issuer.clone(),
            token_ttl_secs: auth.token_ttl_secs,
        }
    }

    /// Issue a session token for `user_id`.
    pub fn issue_token(&self, user_id: &str) -> Result<String, LedgerError> {
        if user_id.trim().is_empty() {
            return Err(LedgerError::InvalidRequest("user id must not be empty".to_string()));
        }

        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now + self.token_ttl_secs as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| LedgerError::SerializationError(format!("Failed to sign token: {}", e)))
    }

    /// Validate a session token and resolve the caller's role.
    pub async fn authenticate(&self, token: &str) -> Result<Identity, LedgerError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            warn!("Rejected session token: {}", e);
            LedgerError::Unauthorized("invalid or expired session".to_string())
        })?;

        let user_id = data.claims.sub;
        if user_id.trim().is_empty() {
            return Err(LedgerError::Unauthorized("session has no subject".to_string()));
        }

        let role = match self.database.get_role(&user_id).await? {
            Some(role) => role
                .parse::<Role>()
                .map_err(LedgerError::DatabaseError)?,
            None => Role::Voter,
        };

        debug!("Authenticated {} as {}", user_id, role);
        Ok(Identity { user_id, role })
    }

    /// Authenticate from an `Authorization: Bearer <token>` header.
    pub async fn authenticate_headers(&self, headers: &HeaderMap) -> Result<Identity, LedgerError> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| LedgerError::Unauthorized("missing bearer token".to_string()))?;

        self.authenticate(token).await
    }
}
