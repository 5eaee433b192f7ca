use axum::{
    Router,
    extract::{FromRef, Request, rejection::JsonRejection, rejection::PathRejection},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use hearth_common::model::{
    Id, auth::TokenError, auth::TokenKeys, filter::InvalidFilterError, post::PostMarker,
};
use hearth_db::{client::DbError, store::PostStore};
use json::Json;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::error;

pub mod auth;
mod json;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub store: Arc<dyn PostStore>,
    pub token_keys: Arc<TokenKeys>,
}

impl ServerState {
    #[must_use]
    pub fn new(store: Arc<dyn PostStore>, token_keys: TokenKeys) -> Self {
        Self {
            store,
            token_keys: Arc::new(token_keys),
        }
    }
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

/// The complete application with state and request tracing attached.
pub fn app(state: ServerState) -> Router {
    routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

/// Why an operation failed after it was accepted for processing.
#[derive(Debug, Error)]
pub enum Failure {
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Request body rejected: {0}")]
    Payload(#[from] JsonRejection),
    #[error(transparent)]
    Filter(#[from] InvalidFilterError),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("No identity token was provided")]
    NotAuthenticated,
    #[error(transparent)]
    InvalidToken(#[from] TokenError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("Acting user does not own post {0}")]
    NotPostOwner(Id<PostMarker>),
    #[error("Listing posts failed: {0}")]
    ListPosts(#[source] Failure),
    #[error("Fetching post failed: {0}")]
    GetPost(#[source] Failure),
    #[error("Creating post failed: {0}")]
    CreatePost(#[source] Failure),
    #[error("Updating post failed: {0}")]
    UpdatePost(#[source] Failure),
    #[error("Deleting post failed: {0}")]
    DeletePost(#[source] Failure),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            ServerError::InvalidToken(_) | ServerError::NotPostOwner(_) => StatusCode::FORBIDDEN,
            ServerError::JsonResponse(_)
            | ServerError::ListPosts(_)
            | ServerError::GetPost(_)
            | ServerError::CreatePost(_)
            | ServerError::UpdatePost(_)
            | ServerError::DeletePost(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The human-readable message sent to the client.
    pub fn message(&self) -> &'static str {
        match self {
            ServerError::UnknownRoute(_) | ServerError::PathRejection(_) => "Not found",
            ServerError::JsonResponse(_) => "Failed to serialize response",
            ServerError::NotAuthenticated => "Not Authenticated!",
            ServerError::InvalidToken(_) => "Token is not Valid!",
            ServerError::PostByIdNotFound(_) => "Post not found",
            ServerError::NotPostOwner(_) => "Not Authorized!",
            ServerError::ListPosts(_) => "Failed to get posts",
            ServerError::GetPost(_) => "Failed to get post",
            ServerError::CreatePost(_) => "Failed to create post",
            ServerError::UpdatePost(_) => "Failed to update post",
            ServerError::DeletePost(_) => "Failed to delete post",
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub(crate) struct MessageResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageResponse {
    pub(crate) fn new(message: &'static str) -> Self {
        Self {
            message,
            error: None,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error = match &self {
            ServerError::DeletePost(failure) => Some(failure.to_string()),
            _ => None,
        };
        let error_response = MessageResponse {
            message: self.message(),
            error,
        };
        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database_failure() -> Failure {
        Failure::Database(DbError::Sqlx(sqlx::Error::PoolTimedOut))
    }

    #[test]
    fn operation_failures_are_internal_errors() {
        for error in [
            ServerError::ListPosts(database_failure()),
            ServerError::GetPost(database_failure()),
            ServerError::CreatePost(database_failure()),
            ServerError::UpdatePost(database_failure()),
            ServerError::DeletePost(database_failure()),
        ] {
            assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn ownership_and_lookup_errors_map_to_client_statuses() {
        let id = Id::generate();

        assert_eq!(
            ServerError::PostByIdNotFound(id).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ServerError::NotPostOwner(id).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ServerError::NotAuthenticated.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    async fn body_of(error: ServerError) -> serde_json::Value {
        let response = error.into_response();
        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn only_delete_failures_carry_error_detail() {
        let delete = body_of(ServerError::DeletePost(database_failure())).await;
        let update = body_of(ServerError::UpdatePost(database_failure())).await;

        assert_eq!(delete["message"], "Failed to delete post");
        assert!(delete["error"].is_string());
        assert_eq!(update["message"], "Failed to update post");
        assert!(update.get("error").is_none());
    }
}
