//! Tours repository

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, Pool, Postgres};

use super::TourStore;
use crate::{
    error::{AppError, AppResult},
    models::Tour,
    query::{FindQuery, Pipeline},
};

#[derive(Clone)]
pub struct ToursRepository {
    pool: Pool<Postgres>,
}

impl ToursRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TourStore for ToursRepository {
    async fn insert(&self, tour: &Tour) -> AppResult<Tour> {
        sqlx::query_as::<_, Tour>(
            r#"
            INSERT INTO tours (
                id, name, slug, duration, max_group_size, difficulty,
                ratings_average, ratings_quantity, price, price_discount,
                summary, description, image_cover, images,
                created_at, start_dates, secret_tour
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(tour.id)
        .bind(&tour.name)
        .bind(&tour.slug)
        .bind(tour.duration)
        .bind(tour.max_group_size)
        .bind(tour.difficulty)
        .bind(tour.ratings_average)
        .bind(tour.ratings_quantity)
        .bind(tour.price)
        .bind(tour.price_discount)
        .bind(&tour.summary)
        .bind(&tour.description)
        .bind(&tour.image_cover)
        .bind(&tour.images)
        .bind(tour.created_at)
        .bind(&tour.start_dates)
        .bind(tour.secret_tour)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, &tour.name))
    }

    async fn find(&self, query: &FindQuery) -> AppResult<Vec<Tour>> {
        let mut builder = query.select_sql()?;
        let rows = builder
            .build_query_as::<Tour>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn replace(&self, tour: &Tour) -> AppResult<Tour> {
        sqlx::query_as::<_, Tour>(
            r#"
            UPDATE tours SET
                name = $2, slug = $3, duration = $4, max_group_size = $5,
                difficulty = $6, ratings_average = $7, ratings_quantity = $8,
                price = $9, price_discount = $10, summary = $11, description = $12,
                image_cover = $13, images = $14, start_dates = $15, secret_tour = $16
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(tour.id)
        .bind(&tour.name)
        .bind(&tour.slug)
        .bind(tour.duration)
        .bind(tour.max_group_size)
        .bind(tour.difficulty)
        .bind(tour.ratings_average)
        .bind(tour.ratings_quantity)
        .bind(tour.price)
        .bind(tour.price_discount)
        .bind(&tour.summary)
        .bind(&tour.description)
        .bind(&tour.image_cover)
        .bind(&tour.images)
        .bind(&tour.start_dates)
        .bind(tour.secret_tour)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, &tour.name))?
        .ok_or_else(|| AppError::NotFound(format!("Tour {} not found", tour.id)))
    }

    async fn delete(&self, query: &FindQuery) -> AppResult<u64> {
        let mut builder = query.delete_sql()?;
        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_all(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM tours")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> AppResult<Vec<Value>> {
        let mut builder = pipeline.to_sql()?;
        let rows = builder
            .build_query_scalar::<Json<Value>>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|Json(doc)| doc).collect())
    }
}
