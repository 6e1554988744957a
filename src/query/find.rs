//! Find-family queries over the `tours` table

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::{push_order_by, Filter, SortKey};
use crate::error::{AppError, AppResult};

/// Columns a find query may filter or sort on
pub const TOUR_COLUMNS: &[&str] = &[
    "id",
    "name",
    "slug",
    "duration",
    "max_group_size",
    "difficulty",
    "ratings_average",
    "ratings_quantity",
    "price",
    "price_discount",
    "summary",
    "description",
    "image_cover",
    "created_at",
    "secret_tour",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub sort: Vec<SortKey>,
    pub limit: Option<i64>,
}

impl FindQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: Uuid) -> Self {
        Self::new().filter(Filter::new().and_eq("id", id))
    }

    pub fn by_slug(slug: &str) -> Self {
        Self::new().filter(Filter::new().and_eq("slug", slug))
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn sort(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    fn check_fields(&self) -> AppResult<()> {
        let fields = self
            .filter
            .conditions()
            .iter()
            .map(|c| c.field.as_str())
            .chain(self.sort.iter().map(|k| k.field.as_str()));

        for field in fields {
            if !TOUR_COLUMNS.contains(&field) {
                return Err(AppError::BadRequest(format!("Unknown tour field: {}", field)));
            }
        }
        Ok(())
    }

    pub(crate) fn select_sql(&self) -> AppResult<QueryBuilder<'static, Postgres>> {
        self.check_fields()?;
        let mut qb = QueryBuilder::new("SELECT * FROM tours");
        self.filter.push_where(&mut qb, None)?;
        push_order_by(&mut qb, &self.sort, None)?;
        if let Some(limit) = self.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        Ok(qb)
    }

    /// Sort and limit do not apply to deletes.
    pub(crate) fn delete_sql(&self) -> AppResult<QueryBuilder<'static, Postgres>> {
        self.check_fields()?;
        let mut qb = QueryBuilder::new("DELETE FROM tours");
        self.filter.push_where(&mut qb, None)?;
        Ok(qb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_sql() {
        let query = FindQuery::new()
            .filter(Filter::new().and_lt("price", 1000.0).and_eq("difficulty", "easy"))
            .sort(SortKey::desc("ratings_average"))
            .sort(SortKey::asc("price"))
            .limit(5);
        let qb = query.select_sql().unwrap();
        assert_eq!(
            qb.sql(),
            "SELECT * FROM tours WHERE \"price\" < $1 AND \"difficulty\" = $2 \
             ORDER BY \"ratings_average\" DESC, \"price\" ASC LIMIT $3"
        );
    }

    #[test]
    fn test_delete_sql() {
        let qb = FindQuery::by_id(Uuid::nil()).delete_sql().unwrap();
        assert_eq!(qb.sql(), "DELETE FROM tours WHERE \"id\" = $1");
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let by_filter = FindQuery::new().filter(Filter::new().and_eq("num_tours", 1));
        assert!(matches!(by_filter.select_sql(), Err(AppError::BadRequest(_))));

        let by_sort = FindQuery::new().sort(SortKey::asc("duration_weeks"));
        assert!(matches!(by_sort.delete_sql(), Err(AppError::BadRequest(_))));
        assert!(matches!(by_sort.select_sql(), Err(AppError::BadRequest(_))));
    }
}
