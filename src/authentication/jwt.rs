use chrono::Duration;
use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::error::{Error, HtmlError};
use crate::database::schema::{Id, User, UserRole};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    pub is_moderator: bool,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(HtmlError::Unauthorized.default());
        }
        Ok(())
    }

    /// Owners may always act on their own rows; everyone else needs `action`.
    pub fn authenticate_owner(&self, owner_id: Id, action: ActionType) -> Result<(), Error> {
        if owner_id == self.user_id {
            return Ok(());
        }
        self.authenticate(action)
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            username: value.username,
            user_id: value.user_id,
            is_moderator: value.role == UserRole::Moderator,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

/// Signing key and lifetime of session tokens.
#[derive(Clone)]
pub struct SessionKey {
    key: Hmac<Sha256>,
    lifetime: Duration,
}

impl SessionKey {
    pub fn new(secret: &[u8], lifetime: Duration) -> Result<Self, Error> {
        let key = Hmac::new_from_slice(secret)
            .map_err(|_| HtmlError::InternalServerError.new("Invalid session secret"))?;

        Ok(Self { key, lifetime })
    }

    pub fn generate_jwt_session(&self, user: &User) -> Result<String, Error> {
        let claims = JwtSessionData::new(
            user.id,
            user.username.to_owned(),
            user.role.to_owned(),
            self.lifetime,
        );

        claims.sign_with_key(&self.key).map_err(|e| {
            log::error!("Failed to sign session: {e}");
            HtmlError::InternalServerError.new("Failed to sign session")
        })
    }

    pub fn verify_jwt_session(&self, token: &str) -> Result<JwtSessionData, Error> {
        let session: JwtSessionData = token
            .verify_with_key(&self.key)
            .map_err(|_| HtmlError::InvalidSession.new("Invalid session; Invalid token"))?;

        if session.is_expired() {
            return Err(HtmlError::InvalidSession.new("Invalid session; Token expired"));
        }

        Ok(session)
    }
}
