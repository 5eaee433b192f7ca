use crate::server::{
    MessageResponse, Result, ServerError, ServerRouter,
    auth::{AuthenticatedUser, SessionCookie},
    json::Json,
};
use axum::{
    Json as JsonBody,
    extract::{Query, State, rejection::JsonRejection},
};
use axum_extra::routing::{RouterExt, TypedPath};
use hearth_common::model::{
    Id,
    auth::TokenKeys,
    filter::{FilterParams, PostFilter},
    post::{CreatePost, FullPost, Post, PostMarker, PostUpdate},
};
use hearth_db::store::PostStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_put(update_post)
        .typed_delete(delete_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

/// A post as shown to a particular viewer.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostView {
    #[serde(flatten)]
    post: FullPost,
    is_saved: bool,
}

async fn list_posts(
    PostsPath(): PostsPath,
    State(store): State<Arc<dyn PostStore>>,
    Query(params): Query<FilterParams>,
) -> Result<Json<Vec<Post>>> {
    let filter = PostFilter::try_from(params).map_err(|err| ServerError::ListPosts(err.into()))?;

    let posts = store
        .list_posts(&filter)
        .await
        .map_err(|err| ServerError::ListPosts(err.into()))?;

    Ok(Json(posts))
}

async fn get_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<dyn PostStore>>,
    State(token_keys): State<Arc<TokenKeys>>,
    session: SessionCookie,
) -> Result<Json<PostView>> {
    let post = store
        .fetch_full_post(id)
        .await
        .map_err(|err| ServerError::GetPost(err.into()))?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    let is_saved = match session.viewer(&token_keys) {
        Some(viewer) => store.is_post_saved(viewer, id).await.unwrap_or_else(|err| {
            warn!(error = %err, post_id = %id, "Could not look up saved state");
            false
        }),
        None => false,
    };

    Ok(Json(PostView { post, is_saved }))
}

async fn create_post(
    PostsPath(): PostsPath,
    State(store): State<Arc<dyn PostStore>>,
    user: AuthenticatedUser,
    body: Result<JsonBody<CreatePost>, JsonRejection>,
) -> Result<Json<Post>> {
    let JsonBody(request) = body.map_err(|err| ServerError::CreatePost(err.into()))?;

    let post = store
        .create_post(&request, user.user_id())
        .await
        .map_err(|err| ServerError::CreatePost(err.into()))?;

    debug!(post_id = %post.id, user_id = %post.user_id, "Created post");

    Ok(Json(post))
}

async fn update_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<dyn PostStore>>,
    user: AuthenticatedUser,
    body: Result<JsonBody<PostUpdate>, JsonRejection>,
) -> Result<Json<Post>> {
    let post = store
        .fetch_post(id)
        .await
        .map_err(|err| ServerError::UpdatePost(err.into()))?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    if !post.is_owned_by(user.user_id()) {
        return Err(ServerError::NotPostOwner(id));
    }

    // Existence and ownership are answered before the body is looked at.
    let JsonBody(update) = body.map_err(|err| ServerError::UpdatePost(err.into()))?;

    let post = store
        .update_post(id, &update)
        .await
        .map_err(|err| ServerError::UpdatePost(err.into()))?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<dyn PostStore>>,
    user: AuthenticatedUser,
) -> Result<Json<MessageResponse>> {
    let post = store
        .fetch_post(id)
        .await
        .map_err(|err| ServerError::DeletePost(err.into()))?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    if !post.is_owned_by(user.user_id()) {
        return Err(ServerError::NotPostOwner(id));
    }

    let deleted = store
        .delete_post(id)
        .await
        .map_err(|err| ServerError::DeletePost(err.into()))?;
    if !deleted {
        return Err(ServerError::PostByIdNotFound(id));
    }

    Ok(Json(MessageResponse::new("Post deleted successfully")))
}
