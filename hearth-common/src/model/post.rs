use crate::model::{
    Id,
    user::{UserMarker, UserSummary},
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostDetailMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Buy,
    Rent,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Apartment,
    House,
    Condo,
    Land,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown listing type: {0:?}")]
pub struct InvalidListingTypeError(pub String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown property kind: {0:?}")]
pub struct InvalidPropertyKindError(pub String);

impl ListingType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ListingType::Buy => "buy",
            ListingType::Rent => "rent",
        }
    }
}

impl FromStr for ListingType {
    type Err = InvalidListingTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(ListingType::Buy),
            "rent" => Ok(ListingType::Rent),
            other => Err(InvalidListingTypeError(other.to_owned())),
        }
    }
}

impl Display for ListingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PropertyKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyKind::Apartment => "apartment",
            PropertyKind::House => "house",
            PropertyKind::Condo => "condo",
            PropertyKind::Land => "land",
        }
    }
}

impl FromStr for PropertyKind {
    type Err = InvalidPropertyKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "apartment" => Ok(PropertyKind::Apartment),
            "house" => Ok(PropertyKind::House),
            "condo" => Ok(PropertyKind::Condo),
            "land" => Ok(PropertyKind::Land),
            other => Err(InvalidPropertyKindError(other.to_owned())),
        }
    }
}

impl Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A listing as stored, without its detail or owner projection.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id<PostMarker>,
    pub title: String,
    pub price: i32,
    pub images: Vec<String>,
    pub address: String,
    pub city: String,
    pub bedroom: i32,
    pub bathroom: i32,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    #[serde(rename = "type")]
    pub listing_type: ListingType,
    pub property: PropertyKind,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user_id: Id<UserMarker>,
}

/// The caller-supplied fields of a new post. Ownership is never taken from here.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostContent {
    pub title: String,
    pub price: i32,
    #[serde(default)]
    pub images: Vec<String>,
    pub address: String,
    pub city: String,
    pub bedroom: i32,
    pub bathroom: i32,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
    #[serde(rename = "type")]
    pub listing_type: ListingType,
    pub property: PropertyKind,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    pub id: Id<PostDetailMarker>,
    #[serde(rename = "desc")]
    pub description: String,
    pub utilities: Option<String>,
    pub pet: Option<String>,
    pub income: Option<String>,
    pub size: Option<i32>,
    pub school: Option<i32>,
    pub bus: Option<i32>,
    pub restaurant: Option<i32>,
    pub post_id: Id<PostMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetailContent {
    #[serde(rename = "desc")]
    pub description: String,
    #[serde(default)]
    pub utilities: Option<String>,
    #[serde(default)]
    pub pet: Option<String>,
    #[serde(default)]
    pub income: Option<String>,
    #[serde(default)]
    pub size: Option<i32>,
    #[serde(default)]
    pub school: Option<i32>,
    #[serde(default)]
    pub bus: Option<i32>,
    #[serde(default)]
    pub restaurant: Option<i32>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePost {
    pub post_data: PostContent,
    pub post_detail: PostDetailContent,
}

/// The only fields an owner may change after creation. Anything else in the
/// request body is dropped during deserialization.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<i32>,
}

/// A post together with its detail and the public projection of its owner.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullPost {
    #[serde(flatten)]
    pub post: Post,
    pub post_detail: Option<PostDetail>,
    pub user: UserSummary,
}

impl Post {
    /// Builds the stored form of a new post.
    #[must_use]
    pub fn from_content(
        id: Id<PostMarker>,
        content: PostContent,
        owner: Id<UserMarker>,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            title: content.title,
            price: content.price,
            images: content.images,
            address: content.address,
            city: content.city,
            bedroom: content.bedroom,
            bathroom: content.bathroom,
            latitude: content.latitude,
            longitude: content.longitude,
            listing_type: content.listing_type,
            property: content.property,
            created_at,
            user_id: owner,
        }
    }

    #[must_use]
    pub fn is_owned_by(&self, user: Id<UserMarker>) -> bool {
        self.user_id == user
    }

    /// Applies an update; fields missing from it keep their current value.
    pub fn apply(&mut self, update: &PostUpdate) {
        if let Some(title) = &update.title {
            title.clone_into(&mut self.title);
        }
        if let Some(price) = update.price {
            self.price = price;
        }
    }
}

impl PostDetail {
    #[must_use]
    pub fn from_content(
        id: Id<PostDetailMarker>,
        content: PostDetailContent,
        post_id: Id<PostMarker>,
    ) -> Self {
        Self {
            id,
            description: content.description,
            utilities: content.utilities,
            pet: content.pet,
            income: content.income,
            size: content.size,
            school: content.school,
            bus: content.bus,
            restaurant: content.restaurant,
            post_id,
        }
    }
}
