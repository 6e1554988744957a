//! Repository layer for database operations

pub mod tours;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    config::DatabaseConfig,
    error::AppResult,
    models::Tour,
    query::{FindQuery, Pipeline},
};

/// Embedded schema migrations
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Storage primitives behind the tour model.
///
/// Queries arrive here already rewritten by the lifecycle hooks; implementations
/// run them as given.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TourStore: Send + Sync {
    async fn insert(&self, tour: &Tour) -> AppResult<Tour>;

    async fn find(&self, query: &FindQuery) -> AppResult<Vec<Tour>>;

    /// Overwrite the stored tour with the same id
    async fn replace(&self, tour: &Tour) -> AppResult<Tour>;

    /// Returns the number of deleted tours
    async fn delete(&self, query: &FindQuery) -> AppResult<u64>;

    async fn delete_all(&self) -> AppResult<u64>;

    /// One JSON object per output row
    async fn aggregate(&self, pipeline: &Pipeline) -> AppResult<Vec<Value>>;
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub tours: tours::ToursRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            tours: tours::ToursRepository::new(pool.clone()),
            pool,
        }
    }

    /// Open a connection pool
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> AppResult<()> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }
}
