use crate::{
    record::{FullPostRecord, PostRecord},
    store::PostStore,
};
use async_trait::async_trait;
use hearth_common::model::{
    Id, ModelValidationError,
    filter::{FilterClause, PostFilter},
    post::{CreatePost, FullPost, Post, PostDetailMarker, PostMarker, PostUpdate},
    user::UserMarker,
};
use sqlx::{PgPool, Postgres, QueryBuilder, migrate::MigrateError, query, query_as, query_scalar};
use thiserror::Error;
use tracing::debug;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Clone, Debug)]
pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl PostStore for DbClient {
    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "
            SELECT
                posts.id,
                posts.title,
                posts.price,
                posts.images,
                posts.address,
                posts.city,
                posts.bedroom,
                posts.bathroom,
                posts.latitude,
                posts.longitude,
                posts.listing_type,
                posts.property,
                posts.created_at,
                posts.user_id
            FROM
                posts
            WHERE
                TRUE
            ",
        );

        for clause in filter.clauses() {
            match clause {
                FilterClause::City(city) => {
                    builder.push(" AND posts.city = ").push_bind(city.clone());
                }
                FilterClause::ListingType(listing_type) => {
                    builder
                        .push(" AND posts.listing_type = ")
                        .push_bind(listing_type.as_str());
                }
                FilterClause::Property(property) => {
                    builder
                        .push(" AND posts.property = ")
                        .push_bind(property.as_str());
                }
                FilterClause::Bedroom(bedroom) => {
                    builder.push(" AND posts.bedroom = ").push_bind(*bedroom);
                }
                FilterClause::MinPrice(min) => {
                    builder.push(" AND posts.price >= ").push_bind(*min);
                }
                FilterClause::MaxPrice(max) => {
                    builder.push(" AND posts.price <= ").push_bind(*max);
                }
            }
        }

        let records = builder
            .build_query_as::<PostRecord>()
            .fetch_all(&self.pool)
            .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(
            "
            SELECT
                posts.id,
                posts.title,
                posts.price,
                posts.images,
                posts.address,
                posts.city,
                posts.bedroom,
                posts.bathroom,
                posts.latitude,
                posts.longitude,
                posts.listing_type,
                posts.property,
                posts.created_at,
                posts.user_id
            FROM
                posts
            WHERE
                posts.id = $1
            ",
        )
        .bind(post_id.uuid())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    async fn fetch_full_post(&self, post_id: Id<PostMarker>) -> Result<Option<FullPost>> {
        let record = query_as::<_, FullPostRecord>(
            "
            SELECT
                posts.id,
                posts.title,
                posts.price,
                posts.images,
                posts.address,
                posts.city,
                posts.bedroom,
                posts.bathroom,
                posts.latitude,
                posts.longitude,
                posts.listing_type,
                posts.property,
                posts.created_at,
                posts.user_id,
                post_details.id AS detail_id,
                post_details.description AS detail_description,
                post_details.utilities AS detail_utilities,
                post_details.pet AS detail_pet,
                post_details.income AS detail_income,
                post_details.size AS detail_size,
                post_details.school AS detail_school,
                post_details.bus AS detail_bus,
                post_details.restaurant AS detail_restaurant,
                users.username,
                users.avatar
            FROM
                posts
                JOIN users ON users.id = posts.user_id
                LEFT JOIN post_details ON post_details.post_id = posts.id
            WHERE
                posts.id = $1
            ",
        )
        .bind(post_id.uuid())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(FullPost::try_from).transpose()?;
        Ok(post)
    }

    async fn is_post_saved(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<bool> {
        let saved = query_scalar::<_, bool>(
            "
            SELECT EXISTS (
                SELECT 1
                FROM saved_posts
                WHERE saved_posts.user_id = $1 AND saved_posts.post_id = $2
            )
            ",
        )
        .bind(user_id.uuid())
        .bind(post_id.uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }

    async fn create_post(&self, post: &CreatePost, author: Id<UserMarker>) -> Result<Post> {
        let post_id = Id::<PostMarker>::generate();
        let detail_id = Id::<PostDetailMarker>::generate();
        let content = &post.post_data;
        let detail = &post.post_detail;

        let mut transaction = self.pool.begin().await?;

        let record = query_as::<_, PostRecord>(
            "
            INSERT INTO posts (
                id, title, price, images, address, city, bedroom, bathroom,
                latitude, longitude, listing_type, property, user_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING
                posts.id,
                posts.title,
                posts.price,
                posts.images,
                posts.address,
                posts.city,
                posts.bedroom,
                posts.bathroom,
                posts.latitude,
                posts.longitude,
                posts.listing_type,
                posts.property,
                posts.created_at,
                posts.user_id
            ",
        )
        .bind(post_id.uuid())
        .bind(&content.title)
        .bind(content.price)
        .bind(&content.images)
        .bind(&content.address)
        .bind(&content.city)
        .bind(content.bedroom)
        .bind(content.bathroom)
        .bind(&content.latitude)
        .bind(&content.longitude)
        .bind(content.listing_type.as_str())
        .bind(content.property.as_str())
        .bind(author.uuid())
        .fetch_one(&mut *transaction)
        .await?;

        query(
            "
            INSERT INTO post_details (
                id, description, utilities, pet, income, size, school, bus, restaurant, post_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(detail_id.uuid())
        .bind(&detail.description)
        .bind(&detail.utilities)
        .bind(&detail.pet)
        .bind(&detail.income)
        .bind(detail.size)
        .bind(detail.school)
        .bind(detail.bus)
        .bind(detail.restaurant)
        .bind(post_id.uuid())
        .execute(&mut *transaction)
        .await?;

        transaction.commit().await?;

        let post = Post::try_from(record)?;
        Ok(post)
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        update: &PostUpdate,
    ) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(
            "
            UPDATE posts
            SET
                title = COALESCE($2, posts.title),
                price = COALESCE($3, posts.price)
            WHERE
                posts.id = $1
            RETURNING
                posts.id,
                posts.title,
                posts.price,
                posts.images,
                posts.address,
                posts.city,
                posts.bedroom,
                posts.bathroom,
                posts.latitude,
                posts.longitude,
                posts.listing_type,
                posts.property,
                posts.created_at,
                posts.user_id
            ",
        )
        .bind(post_id.uuid())
        .bind(&update.title)
        .bind(update.price)
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let mut transaction = self.pool.begin().await?;

        let details = query("DELETE FROM post_details WHERE post_details.post_id = $1")
            .bind(post_id.uuid())
            .execute(&mut *transaction)
            .await?;

        let posts = query("DELETE FROM posts WHERE posts.id = $1")
            .bind(post_id.uuid())
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;

        debug!(
            %post_id,
            details = details.rows_affected(),
            posts = posts.rows_affected(),
            "Deleted post"
        );

        Ok(posts.rows_affected() > 0)
    }
}
