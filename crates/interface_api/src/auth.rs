//! Authentication and authorization

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::UserId;
use domain_directory::{Actor, Role};

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user UUID)
    pub sub: String,
    /// Platform role, e.g. `AGENT`
    pub role: String,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

impl Claims {
    /// The user and role the token speaks for
    pub fn actor(&self) -> Result<Actor, AuthError> {
        let user_id = self
            .sub
            .parse::<UserId>()
            .map_err(|_| AuthError::InvalidClaims(format!("subject '{}' is not a UUID", self.sub)))?;
        let role = self
            .role
            .parse::<Role>()
            .map_err(|e| AuthError::InvalidClaims(e.to_string()))?;
        Ok(Actor::new(user_id, role))
    }
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid claims: {0}")]
    InvalidClaims(String),
    #[error("Missing role: {0}")]
    MissingRole(String),
}

/// Creates a signed HS256 token for `user_id` acting as `role`
pub fn create_token(
    user_id: UserId,
    role: Role,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let lifetime = i64::try_from(expiration_secs).map_err(|_| AuthError::InvalidToken)?;
    let exp = now + Duration::seconds(lifetime);

    let claims = Claims {
        sub: user_id.as_uuid().to_string(),
        role: role.as_str().to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Checks that the actor holds one of `allowed`
pub fn require_role(actor: &Actor, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&actor.role) {
        return Ok(());
    }
    let names: Vec<&str> = allowed.iter().map(Role::as_str).collect();
    Err(AuthError::MissingRole(format!(
        "role {} is not one of {}",
        actor.role,
        names.join(", ")
    )))
}

/// Role sets shared by several routes
pub mod roles {
    use domain_directory::Role;

    pub const FINANCE_READERS: &[Role] = &[
        Role::Agent,
        Role::GovernorateManager,
        Role::Admin,
        Role::Supervisor,
        Role::Accountant,
    ];
    pub const BACK_OFFICE: &[Role] = &[Role::Admin, Role::Supervisor];
    pub const AGENT_SETTLEMENT_READERS: &[Role] =
        &[Role::Agent, Role::GovernorateManager, Role::Admin, Role::Accountant];
    pub const MANAGER_SETTLEMENT_READERS: &[Role] =
        &[Role::GovernorateManager, Role::Admin, Role::Accountant];
    pub const RENEWAL_WORKERS: &[Role] = &[Role::Agent, Role::Admin, Role::Supervisor];
    pub const ACCOUNTING: &[Role] = &[Role::Accountant, Role::Admin];
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_round_trip_yields_actor() {
        let user = UserId::new();
        let token = create_token(user, Role::GovernorateManager, SECRET, 60).unwrap();
        let actor = validate_token(&token, SECRET).unwrap().actor().unwrap();

        assert_eq!(actor.user_id, user);
        assert_eq!(actor.role, Role::GovernorateManager);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token(UserId::new(), Role::Agent, SECRET, 60).unwrap();
        assert!(matches!(
            validate_token(&token, "other"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_unknown_role_claim_rejected() {
        let claims = Claims {
            sub: UserId::new().as_uuid().to_string(),
            role: "JANITOR".into(),
            exp: 0,
            iat: 0,
        };
        assert!(matches!(claims.actor(), Err(AuthError::InvalidClaims(_))));
    }

    #[test]
    fn test_require_role() {
        let agent = Actor::new(UserId::new(), Role::Agent);
        assert!(require_role(&agent, roles::RENEWAL_WORKERS).is_ok());
        assert!(matches!(
            require_role(&agent, roles::ACCOUNTING),
            Err(AuthError::MissingRole(_))
        ));
    }
}
