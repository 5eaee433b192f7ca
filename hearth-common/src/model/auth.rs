use crate::model::{Id, user::UserMarker};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

/// Name of the cookie carrying the identity token.
pub const TOKEN_COOKIE: &str = "token";

#[derive(Debug, Error)]
#[error("Identity token rejected: {0}")]
pub struct TokenError(#[from] jsonwebtoken::errors::Error);

impl TokenError {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(
            self.0.kind(),
            jsonwebtoken::errors::ErrorKind::ExpiredSignature
        )
    }
}

/// Decoded payload of a verified identity token.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Claims {
    pub id: Id<UserMarker>,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys derived from the process-wide secret.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenKeys {
    #[must_use]
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Signs a token for `user` that expires after `lifetime`.
    pub fn issue(&self, user: Id<UserMarker>, lifetime: Duration) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            id: user,
            is_admin: false,
            iat: now.unix_timestamp(),
            exp: (now + lifetime).unix_timestamp(),
        };

        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Checks signature and expiry, then returns the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}

impl Debug for TokenKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("encoding", &"[redacted]")
            .field("decoding", &"[redacted]")
            .finish_non_exhaustive()
    }
}
