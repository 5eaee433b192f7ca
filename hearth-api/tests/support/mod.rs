#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use hearth_api::server::{self, ServerState};
use hearth_common::model::{
    Id,
    auth::TokenKeys,
    filter::PostFilter,
    post::{CreatePost, FullPost, Post, PostDetail, PostMarker, PostUpdate},
    user::{UserMarker, UserSummary},
};
use hearth_db::{
    client::{DbError, Result},
    store::PostStore,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;

pub const SECRET: &[u8] = b"test-secret";

#[derive(Default)]
struct Tables {
    posts: Vec<Post>,
    details: Vec<PostDetail>,
    users: HashMap<Id<UserMarker>, UserSummary>,
    saved: HashSet<(Id<UserMarker>, Id<PostMarker>)>,
}

/// A `PostStore` backed by plain collections.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    saved_lookups: AtomicUsize,
}

impl MemoryStore {
    pub fn add_user(&self, username: &str) -> Id<UserMarker> {
        let id = Id::generate();
        self.tables.lock().unwrap().users.insert(
            id,
            UserSummary {
                username: username.to_owned(),
                avatar: Some(format!("/avatars/{username}.png")),
            },
        );
        id
    }

    pub fn save_post(&self, user: Id<UserMarker>, post: Id<PostMarker>) {
        self.tables.lock().unwrap().saved.insert((user, post));
    }

    pub fn post(&self, post_id: Id<PostMarker>) -> Option<Post> {
        let tables = self.tables.lock().unwrap();
        tables.posts.iter().find(|post| post.id == post_id).cloned()
    }

    pub fn detail_count(&self, post_id: Id<PostMarker>) -> usize {
        let tables = self.tables.lock().unwrap();
        tables
            .details
            .iter()
            .filter(|detail| detail.post_id == post_id)
            .count()
    }

    pub fn saved_lookups(&self) -> usize {
        self.saved_lookups.load(Ordering::SeqCst)
    }
}

fn missing_user() -> DbError {
    DbError::Sqlx(sqlx::Error::RowNotFound)
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .posts
            .iter()
            .filter(|post| filter.matches(post))
            .cloned()
            .collect())
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        Ok(self.post(post_id))
    }

    async fn fetch_full_post(&self, post_id: Id<PostMarker>) -> Result<Option<FullPost>> {
        let tables = self.tables.lock().unwrap();
        let Some(post) = tables.posts.iter().find(|post| post.id == post_id) else {
            return Ok(None);
        };
        let user = tables
            .users
            .get(&post.user_id)
            .cloned()
            .ok_or_else(missing_user)?;
        let post_detail = tables
            .details
            .iter()
            .find(|detail| detail.post_id == post_id)
            .cloned();

        Ok(Some(FullPost {
            post: post.clone(),
            post_detail,
            user,
        }))
    }

    async fn is_post_saved(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<bool> {
        self.saved_lookups.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().unwrap();
        Ok(tables.saved.contains(&(user_id, post_id)))
    }

    async fn create_post(&self, post: &CreatePost, author: Id<UserMarker>) -> Result<Post> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.users.contains_key(&author) {
            return Err(missing_user());
        }

        let created = Post::from_content(
            Id::generate(),
            post.post_data.clone(),
            author,
            OffsetDateTime::now_utc(),
        );
        let detail =
            PostDetail::from_content(Id::generate(), post.post_detail.clone(), created.id);

        tables.posts.push(created.clone());
        tables.details.push(detail);
        Ok(created)
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        update: &PostUpdate,
    ) -> Result<Option<Post>> {
        let mut tables = self.tables.lock().unwrap();
        let Some(post) = tables.posts.iter_mut().find(|post| post.id == post_id) else {
            return Ok(None);
        };
        post.apply(update);
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let mut tables = self.tables.lock().unwrap();
        tables.details.retain(|detail| detail.post_id != post_id);
        let before = tables.posts.len();
        tables.posts.retain(|post| post.id != post_id);
        Ok(tables.posts.len() < before)
    }
}

/// A `PostStore` whose every call fails like an unreachable database.
pub struct FailingStore;

fn unavailable() -> DbError {
    DbError::Sqlx(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl PostStore for FailingStore {
    async fn list_posts(&self, _filter: &PostFilter) -> Result<Vec<Post>> {
        Err(unavailable())
    }

    async fn fetch_post(&self, _post_id: Id<PostMarker>) -> Result<Option<Post>> {
        Err(unavailable())
    }

    async fn fetch_full_post(&self, _post_id: Id<PostMarker>) -> Result<Option<FullPost>> {
        Err(unavailable())
    }

    async fn is_post_saved(
        &self,
        _user_id: Id<UserMarker>,
        _post_id: Id<PostMarker>,
    ) -> Result<bool> {
        Err(unavailable())
    }

    async fn create_post(&self, _post: &CreatePost, _author: Id<UserMarker>) -> Result<Post> {
        Err(unavailable())
    }

    async fn update_post(
        &self,
        _post_id: Id<PostMarker>,
        _update: &PostUpdate,
    ) -> Result<Option<Post>> {
        Err(unavailable())
    }

    async fn delete_post(&self, _post_id: Id<PostMarker>) -> Result<bool> {
        Err(unavailable())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    keys: TokenKeys,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let router = server::app(ServerState::new(
            store.clone(),
            TokenKeys::from_secret(SECRET),
        ));

        Self {
            router,
            store,
            keys: TokenKeys::from_secret(SECRET),
        }
    }

    pub fn token_for(&self, user: Id<UserMarker>) -> String {
        self.keys.issue(user, Duration::hours(1)).unwrap()
    }

    pub fn expired_token_for(&self, user: Id<UserMarker>) -> String {
        self.keys.issue(user, Duration::hours(-1)).unwrap()
    }

    /// Creates a post through the store, bypassing HTTP.
    pub async fn seed_post(&self, owner: Id<UserMarker>, post_data: Value) -> Post {
        let request: CreatePost = serde_json::from_value(json!({
            "postData": post_data,
            "postDetail": { "desc": "seeded" },
        }))
        .unwrap();
        self.store.create_post(&request, owner).await.unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        send(&self.router, request).await
    }
}

pub fn app_with_failing_store() -> Router {
    server::app(ServerState::new(
        Arc::new(FailingStore),
        TokenKeys::from_secret(SECRET),
    ))
}

pub fn post_data(title: &str, price: i32, city: &str) -> Value {
    json!({
        "title": title,
        "price": price,
        "images": ["/img/1.jpg"],
        "address": "1 High Street",
        "city": city,
        "bedroom": 2,
        "bathroom": 1,
        "type": "rent",
        "property": "apartment",
    })
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("token={token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
