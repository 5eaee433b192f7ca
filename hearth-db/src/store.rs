use crate::client::Result;
use async_trait::async_trait;
use hearth_common::model::{
    Id,
    filter::PostFilter,
    post::{CreatePost, FullPost, Post, PostMarker, PostUpdate},
    user::UserMarker,
};

/// The persistence operations the post routes rely on.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// All posts matching every clause of `filter`, in storage order.
    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>>;

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>>;

    /// The post with its detail and the public projection of its owner.
    async fn fetch_full_post(&self, post_id: Id<PostMarker>) -> Result<Option<FullPost>>;

    async fn is_post_saved(&self, user_id: Id<UserMarker>, post_id: Id<PostMarker>)
    -> Result<bool>;

    /// Creates the post and its detail atomically, owned by `author`.
    async fn create_post(&self, post: &CreatePost, author: Id<UserMarker>) -> Result<Post>;

    /// Returns `None` if the post no longer exists.
    async fn update_post(&self, post_id: Id<PostMarker>, update: &PostUpdate)
    -> Result<Option<Post>>;

    /// Removes the post's details, then the post. Returns whether a post was removed.
    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool>;
}
