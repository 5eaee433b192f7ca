use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::Cookie;
use hearth_common::model::{
    Id,
    auth::{TOKEN_COOKIE, TokenKeys},
    user::UserMarker,
};
use std::{convert::Infallible, sync::Arc};
use tracing::warn;

type CookieHeader = TypedHeader<Cookie>;

/// The raw identity token from the request cookie, not yet verified.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct SessionCookie(Option<String>);

impl SessionCookie {
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Resolves the viewer of a public page. Any verification failure is
    /// logged and treated as an anonymous viewer.
    #[must_use]
    pub fn viewer(&self, keys: &TokenKeys) -> Option<Id<UserMarker>> {
        let token = self.token()?;

        match keys.verify(token) {
            Ok(claims) => Some(claims.id),
            Err(err) => {
                warn!(error = %err, "Ignoring identity token that failed verification");
                None
            }
        }
    }
}

impl<S> FromRequestParts<S> for SessionCookie
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = match CookieHeader::from_request_parts(parts, state).await {
            Ok(TypedHeader(cookie)) => cookie.get(TOKEN_COOKIE).map(str::to_owned),
            Err(rejection) => {
                if !rejection.is_missing() {
                    warn!(error = %rejection, "Ignoring malformed cookie header");
                }
                None
            }
        };

        Ok(Self(token.filter(|token| !token.is_empty())))
    }
}

/// The acting user of a write request, established from a verified token.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AuthenticatedUser {
    id: Id<UserMarker>,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(self) -> Id<UserMarker> {
        self.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<TokenKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(session) = SessionCookie::from_request_parts(parts, state).await;
        let token = session.token().ok_or(ServerError::NotAuthenticated)?;

        let claims = Arc::<TokenKeys>::from_ref(state).verify(token)?;

        Ok(Self { id: claims.id })
    }
}
