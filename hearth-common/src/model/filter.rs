//! Listing filters.
//!
//! A filter is an explicit list of clauses. A query parameter that is absent or
//! empty contributes no clause at all, so an empty filter matches every post.

use crate::model::{
    ModelValidationError,
    post::{ListingType, Post, PropertyKind},
};
use serde::{Deserialize, Serialize};
use std::num::ParseIntError;
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum InvalidFilterError {
    #[error("Filter {field} is not an integer: {source}")]
    NotAnInteger {
        field: &'static str,
        source: ParseIntError,
    },
    #[error(transparent)]
    Model(#[from] ModelValidationError),
}

/// Raw listing query parameters as they arrive on the query string.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    pub city: Option<String>,
    #[serde(rename = "type")]
    pub listing_type: Option<String>,
    pub property: Option<String>,
    pub bedroom: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum FilterClause {
    City(String),
    ListingType(ListingType),
    Property(PropertyKind),
    Bedroom(i32),
    /// Inclusive lower bound on price.
    MinPrice(i32),
    /// Inclusive upper bound on price.
    MaxPrice(i32),
}

impl FilterClause {
    #[must_use]
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            FilterClause::City(city) => post.city == *city,
            FilterClause::ListingType(listing_type) => post.listing_type == *listing_type,
            FilterClause::Property(property) => post.property == *property,
            FilterClause::Bedroom(bedroom) => post.bedroom == *bedroom,
            FilterClause::MinPrice(min) => post.price >= *min,
            FilterClause::MaxPrice(max) => post.price <= *max,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostFilter {
    clauses: Vec<FilterClause>,
}

impl PostFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, clause: FilterClause) -> Self {
        self.clauses.push(clause);
        self
    }

    #[must_use]
    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    #[must_use]
    pub fn matches(&self, post: &Post) -> bool {
        self.clauses.iter().all(|clause| clause.matches(post))
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// Reads the leading integer of `value`, ignoring anything after its digits,
/// so `"2abc"` is 2 while `"abc"` is an error.
fn parse_int(field: &'static str, value: &str) -> Result<i32, InvalidFilterError> {
    let value = value.trim_start();
    let sign = usize::from(value.starts_with(['+', '-']));
    let end = value[sign..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(value.len(), |digits| sign + digits);

    value[..end]
        .parse()
        .map_err(|source| InvalidFilterError::NotAnInteger { field, source })
}

impl TryFrom<FilterParams> for PostFilter {
    type Error = InvalidFilterError;

    fn try_from(params: FilterParams) -> Result<Self, Self::Error> {
        let mut clauses = Vec::new();

        if let Some(city) = present(params.city) {
            clauses.push(FilterClause::City(city));
        }
        if let Some(listing_type) = present(params.listing_type) {
            let listing_type = listing_type
                .parse::<ListingType>()
                .map_err(ModelValidationError::from)?;
            clauses.push(FilterClause::ListingType(listing_type));
        }
        if let Some(property) = present(params.property) {
            let property = property
                .parse::<PropertyKind>()
                .map_err(ModelValidationError::from)?;
            clauses.push(FilterClause::Property(property));
        }
        if let Some(bedroom) = present(params.bedroom) {
            clauses.push(FilterClause::Bedroom(parse_int("bedroom", &bedroom)?));
        }
        if let Some(min_price) = present(params.min_price) {
            clauses.push(FilterClause::MinPrice(parse_int("minPrice", &min_price)?));
        }
        if let Some(max_price) = present(params.max_price) {
            clauses.push(FilterClause::MaxPrice(parse_int("maxPrice", &max_price)?));
        }

        Ok(Self { clauses })
    }
}
