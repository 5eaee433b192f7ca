use hearth_common::model::{
    ModelValidationError,
    post::{FullPost, Post, PostDetail},
    user::UserSummary,
};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub id: Uuid,
    pub title: String,
    pub price: i32,
    pub images: Vec<String>,
    pub address: String,
    pub city: String,
    pub bedroom: i32,
    pub bathroom: i32,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub listing_type: String,
    pub property: String,
    pub created_at: OffsetDateTime,
    pub user_id: Uuid,
}

/// A post row joined with its (optional) detail row and its owner.
#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct FullPostRecord {
    #[sqlx(flatten)]
    pub post: PostRecord,
    pub detail_id: Option<Uuid>,
    pub detail_description: Option<String>,
    pub detail_utilities: Option<String>,
    pub detail_pet: Option<String>,
    pub detail_income: Option<String>,
    pub detail_size: Option<i32>,
    pub detail_school: Option<i32>,
    pub detail_bus: Option<i32>,
    pub detail_restaurant: Option<i32>,
    pub username: String,
    pub avatar: Option<String>,
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            title: value.title,
            price: value.price,
            images: value.images,
            address: value.address,
            city: value.city,
            bedroom: value.bedroom,
            bathroom: value.bathroom,
            latitude: value.latitude,
            longitude: value.longitude,
            listing_type: value.listing_type.parse()?,
            property: value.property.parse()?,
            created_at: value.created_at,
            user_id: value.user_id.into(),
        })
    }
}

impl TryFrom<FullPostRecord> for FullPost {
    type Error = ModelValidationError;

    fn try_from(value: FullPostRecord) -> Result<Self, Self::Error> {
        let post_id = value.post.id.into();
        let post_detail = match (value.detail_id, value.detail_description) {
            (Some(id), Some(description)) => Some(PostDetail {
                id: id.into(),
                description,
                utilities: value.detail_utilities,
                pet: value.detail_pet,
                income: value.detail_income,
                size: value.detail_size,
                school: value.detail_school,
                bus: value.detail_bus,
                restaurant: value.detail_restaurant,
                post_id,
            }),
            _ => None,
        };

        Ok(Self {
            post: value.post.try_into()?,
            post_detail,
            user: UserSummary {
                username: value.username,
                avatar: value.avatar,
            },
        })
    }
}
