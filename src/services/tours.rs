//! Tours service: the tour model's operations, with validation and lifecycle hooks

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    hooks,
    models::{MonthlyPlan, Tour, TourInput, TourStats, UpdateTour},
    query::{Accumulator, Filter, FindQuery, GroupKey, Pipeline, SortKey},
    repository::TourStore,
};

#[derive(Clone)]
pub struct ToursService {
    store: Arc<dyn TourStore>,
}

impl ToursService {
    pub fn new(store: Arc<dyn TourStore>) -> Self {
        Self { store }
    }

    /// Validate and insert a new tour
    pub async fn create(&self, input: TourInput) -> AppResult<Tour> {
        let mut tour = input.into_tour(Uuid::new_v4(), Utc::now())?;
        self.save(&mut tour, false).await
    }

    pub async fn find(&self, mut query: FindQuery) -> AppResult<Vec<Tour>> {
        let started = hooks::pre_find(&mut query);
        let tours = self.store.find(&query).await?;
        hooks::post_find(&tours, started);
        Ok(tours)
    }

    pub async fn find_one(&self, query: FindQuery) -> AppResult<Option<Tour>> {
        let tours = self.find(query.limit(1)).await?;
        Ok(tours.into_iter().next())
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Tour> {
        self.find_one(FindQuery::by_id(id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tour {} not found", id)))
    }

    pub async fn find_by_slug(&self, slug: &str) -> AppResult<Tour> {
        self.find_one(FindQuery::by_slug(slug))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tour {} not found", slug)))
    }

    /// Apply a patch and save the merged tour.
    ///
    /// The whole tour is validated again, so a discount is checked against the
    /// merged price, and the slug follows a renamed tour.
    pub async fn update(&self, id: Uuid, patch: UpdateTour) -> AppResult<Tour> {
        let existing = self.find_by_id(id).await?;
        let mut input = TourInput::from(&existing);
        input.apply(patch);
        let mut tour = input.into_tour(existing.id, existing.created_at)?;
        self.save(&mut tour, true).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut query = FindQuery::by_id(id);
        let started = hooks::pre_find(&mut query);
        let deleted = self.store.delete(&query).await?;
        hooks::post_delete(deleted, started);

        if deleted == 0 {
            return Err(AppError::NotFound(format!("Tour {} not found", id)));
        }
        Ok(())
    }

    /// Delete every tour, secret ones included
    pub async fn purge(&self) -> AppResult<u64> {
        let deleted = self.store.delete_all().await?;
        tracing::info!("Purged {} tours", deleted);
        Ok(deleted)
    }

    pub async fn aggregate(&self, mut pipeline: Pipeline) -> AppResult<Vec<Value>> {
        hooks::pre_aggregate(&mut pipeline);
        self.store.aggregate(&pipeline).await
    }

    /// Per-difficulty statistics over tours rated 4.5 and above, cheapest first
    pub async fn tour_stats(&self) -> AppResult<Vec<TourStats>> {
        let pipeline = Pipeline::new()
            .matching(Filter::new().and_ge("ratings_average", 4.5))
            .group(
                GroupKey::Upper("difficulty".into()),
                [
                    ("num_tours", Accumulator::Count),
                    ("num_ratings", Accumulator::Sum("ratings_quantity".into())),
                    ("avg_rating", Accumulator::Avg("ratings_average".into())),
                    ("avg_price", Accumulator::Avg("price".into())),
                    ("min_price", Accumulator::Min("price".into())),
                    ("max_price", Accumulator::Max("price".into())),
                ],
            )
            .sort(vec![SortKey::asc("avg_price")]);

        decode_rows(self.aggregate(pipeline).await?)
    }

    /// Tour starts per month of `year`, busiest month first
    pub async fn monthly_plan(&self, year: i32) -> AppResult<Vec<MonthlyPlan>> {
        let pipeline = Pipeline::new()
            .unwind("start_dates", "start_date")
            .matching(
                Filter::new()
                    .and_ge("start_date", start_of_year(year)?)
                    .and_lt("start_date", start_of_year(year + 1)?),
            )
            .group(
                GroupKey::Month("start_date".into()),
                [
                    ("num_tour_starts", Accumulator::Count),
                    ("tours", Accumulator::Push("name".into())),
                ],
            )
            .sort(vec![SortKey::desc("num_tour_starts"), SortKey::asc("key")])
            .limit(12);

        decode_rows(self.aggregate(pipeline).await?)
    }

    /// Create every tour in order, stopping at the first failure
    pub async fn import(&self, inputs: Vec<TourInput>) -> AppResult<Vec<Tour>> {
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            created.push(self.create(input).await?);
        }
        tracing::info!("Imported {} tours", created.len());
        Ok(created)
    }

    /// Import from a JSON array of tours
    pub async fn import_json(&self, json: &str) -> AppResult<Vec<Tour>> {
        let inputs: Vec<TourInput> = serde_json::from_str(json)
            .map_err(|e| AppError::BadRequest(format!("Invalid tours file: {}", e)))?;
        self.import(inputs).await
    }

    async fn save(&self, tour: &mut Tour, existing: bool) -> AppResult<Tour> {
        hooks::pre_save(tour);
        let saved = if existing {
            self.store.replace(tour).await?
        } else {
            self.store.insert(tour).await?
        };
        hooks::post_save(&saved);
        Ok(saved)
    }
}

fn start_of_year(year: i32) -> AppResult<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| AppError::BadRequest(format!("Invalid year: {}", year)))
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> AppResult<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| AppError::Internal(format!("Unexpected aggregate row: {}", e)))
        })
        .collect()
}
