//! Tour model: the stored record, write payloads and aggregate rows.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_with::skip_serializing_none;
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use super::enums::Difficulty;
use crate::error::{AppError, AppResult};

pub const DEFAULT_RATINGS_AVERAGE: f64 = 4.0;

/// Tour record
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Tour {
    pub id: Uuid,
    pub name: String,
    /// Derived from `name` before every save
    pub slug: String,
    /// Length in days
    pub duration: i32,
    pub max_group_size: i32,
    pub difficulty: Difficulty,
    pub ratings_average: f64,
    pub ratings_quantity: i32,
    pub price: f64,
    pub price_discount: Option<f64>,
    pub summary: String,
    pub description: Option<String>,
    pub image_cover: String,
    pub images: Vec<String>,
    /// Hidden from serialized output
    pub created_at: DateTime<Utc>,
    pub start_dates: Vec<DateTime<Utc>>,
    pub secret_tour: bool,
}

impl Tour {
    /// Virtual property, never persisted.
    pub fn duration_weeks(&self) -> f64 {
        f64::from(self.duration) / 7.0
    }
}

/// Serialized shape of a tour: camelCase, with `durationWeeks` and without `createdAt`.
#[skip_serializing_none]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TourDocument<'a> {
    id: &'a Uuid,
    name: &'a str,
    slug: &'a str,
    duration: i32,
    max_group_size: i32,
    difficulty: Difficulty,
    ratings_average: f64,
    ratings_quantity: i32,
    price: f64,
    price_discount: Option<f64>,
    summary: &'a str,
    description: Option<&'a str>,
    image_cover: &'a str,
    images: &'a [String],
    start_dates: &'a [DateTime<Utc>],
    secret_tour: bool,
    duration_weeks: f64,
}

impl Serialize for Tour {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TourDocument {
            id: &self.id,
            name: &self.name,
            slug: &self.slug,
            duration: self.duration,
            max_group_size: self.max_group_size,
            difficulty: self.difficulty,
            ratings_average: self.ratings_average,
            ratings_quantity: self.ratings_quantity,
            price: self.price,
            price_discount: self.price_discount,
            summary: &self.summary,
            description: self.description.as_deref(),
            image_cover: &self.image_cover,
            images: &self.images,
            start_dates: &self.start_dates,
            secret_tour: self.secret_tour,
            duration_weeks: self.duration_weeks(),
        }
        .serialize(serializer)
    }
}

/// Create tour request.
///
/// Every field is optional at the type level so that a missing required field
/// surfaces as a validation message rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TourInput {
    #[validate(
        required(message = "A tour must have a name"),
        length(min = 10, max = 40, message = "A tour name must have between 10 and 40 characters")
    )]
    pub name: Option<String>,
    #[validate(required(message = "A tour must have a duration"))]
    pub duration: Option<i32>,
    #[validate(required(message = "A tour must have a group size"))]
    pub max_group_size: Option<i32>,
    /// One of easy, medium, difficult
    #[validate(required(message = "A tour must have a difficulty"))]
    pub difficulty: Option<String>,
    #[validate(range(min = 1.0, max = 5.0, message = "Rating must be between 1.0 and 5.0"))]
    pub ratings_average: Option<f64>,
    pub ratings_quantity: Option<i32>,
    #[validate(required(message = "A tour must have a price"))]
    pub price: Option<f64>,
    pub price_discount: Option<f64>,
    #[validate(required(message = "A tour must have a summary"))]
    pub summary: Option<String>,
    pub description: Option<String>,
    #[validate(required(message = "A tour must have a cover image"))]
    pub image_cover: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub start_dates: Vec<DateTime<Utc>>,
    pub secret_tour: Option<bool>,
}

impl TourInput {
    /// Trim `summary` and `description`; an empty required string counts as missing.
    pub fn normalize(&mut self) {
        self.name = non_empty(self.name.take());
        self.difficulty = non_empty(self.difficulty.take());
        self.summary = non_empty(self.summary.take().map(|s| s.trim().to_string()));
        self.description = self.description.take().map(|s| s.trim().to_string());
        self.image_cover = non_empty(self.image_cover.take());
    }

    /// Run every field check and report all violations at once.
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(e) => e,
        };

        if let Some(difficulty) = &self.difficulty {
            if difficulty.parse::<Difficulty>().is_err() {
                errors.add(
                    "difficulty",
                    message_error("enum", "Difficulty is either: easy, medium, difficult"),
                );
            }
        }

        if let (Some(discount), Some(price)) = (self.price_discount, self.price) {
            if discount >= price {
                let mut err = message_error(
                    "price_discount",
                    format!("Discount price ({}) should be below regular price", discount),
                );
                err.add_param(Cow::from("value"), &discount);
                err.add_param(Cow::from("price"), &price);
                errors.add("price_discount", err);
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Normalize, validate and fill in defaults. The slug is left empty for the pre-save hook.
    pub fn into_tour(mut self, id: Uuid, created_at: DateTime<Utc>) -> AppResult<Tour> {
        self.normalize();
        self.check()?;

        let (
            Some(name),
            Some(duration),
            Some(max_group_size),
            Some(difficulty),
            Some(price),
            Some(summary),
            Some(image_cover),
        ) = (
            self.name,
            self.duration,
            self.max_group_size,
            self.difficulty,
            self.price,
            self.summary,
            self.image_cover,
        )
        else {
            return Err(AppError::Internal(
                "validated tour is missing a required field".to_string(),
            ));
        };

        Ok(Tour {
            id,
            name,
            slug: String::new(),
            duration,
            max_group_size,
            difficulty: difficulty.parse().map_err(AppError::Internal)?,
            ratings_average: self.ratings_average.unwrap_or(DEFAULT_RATINGS_AVERAGE),
            ratings_quantity: self.ratings_quantity.unwrap_or(0),
            price,
            price_discount: self.price_discount,
            summary,
            description: self.description,
            image_cover,
            images: self.images,
            created_at,
            start_dates: self.start_dates,
            secret_tour: self.secret_tour.unwrap_or(false),
        })
    }

    /// Overlay a patch; fields absent from the patch keep their current value.
    pub fn apply(&mut self, patch: UpdateTour) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if let Some(value) = patch.$field { self.$field = Some(value); })*
            };
        }

        overlay!(
            name,
            duration,
            max_group_size,
            difficulty,
            ratings_average,
            ratings_quantity,
            price,
            summary,
            image_cover,
            secret_tour
        );

        if let Some(discount) = patch.price_discount {
            self.price_discount = discount;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(images) = patch.images {
            self.images = images;
        }
        if let Some(start_dates) = patch.start_dates {
            self.start_dates = start_dates;
        }
    }
}

impl From<&Tour> for TourInput {
    fn from(tour: &Tour) -> Self {
        Self {
            name: Some(tour.name.clone()),
            duration: Some(tour.duration),
            max_group_size: Some(tour.max_group_size),
            difficulty: Some(tour.difficulty.to_string()),
            ratings_average: Some(tour.ratings_average),
            ratings_quantity: Some(tour.ratings_quantity),
            price: Some(tour.price),
            price_discount: tour.price_discount,
            summary: Some(tour.summary.clone()),
            description: tour.description.clone(),
            image_cover: Some(tour.image_cover.clone()),
            images: tour.images.clone(),
            start_dates: tour.start_dates.clone(),
            secret_tour: Some(tour.secret_tour),
        }
    }
}

/// Update tour request. `null` clears `priceDiscount` and `description`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTour {
    pub name: Option<String>,
    pub duration: Option<i32>,
    pub max_group_size: Option<i32>,
    pub difficulty: Option<String>,
    pub ratings_average: Option<f64>,
    pub ratings_quantity: Option<i32>,
    pub price: Option<f64>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub price_discount: Option<Option<f64>>,
    pub summary: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    pub image_cover: Option<String>,
    pub images: Option<Vec<String>>,
    pub start_dates: Option<Vec<DateTime<Utc>>>,
    pub secret_tour: Option<bool>,
}

/// Per-difficulty statistics over well rated tours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct TourStats {
    /// Upper-cased difficulty
    #[serde(alias = "key")]
    pub difficulty: String,
    pub num_tours: i64,
    pub num_ratings: i64,
    pub avg_rating: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}

/// Tour starts in one month of a year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct MonthlyPlan {
    /// 1 = January
    #[serde(alias = "key")]
    pub month: i32,
    pub num_tour_starts: i64,
    pub tours: Vec<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn message_error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}
