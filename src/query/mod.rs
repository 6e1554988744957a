//! Query builders for tours.
//!
//! Find queries and aggregation pipelines are plain values. They are compiled to
//! parameterized SQL by the repository, after the lifecycle hooks have had a
//! chance to rewrite them.

pub mod filter;
pub mod find;
pub mod pipeline;

pub use filter::{Condition, Filter, Op, Value};
pub use find::FindQuery;
pub use pipeline::{Accumulator, GroupKey, Pipeline, Stage};

use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{Postgres, QueryBuilder};

use crate::error::{AppError, AppResult};

/// Regex for a bare SQL identifier.
static IDENTIFIER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_]*$").expect("fail to create a regex for the SQL identifier")
});

/// Quote a field name, rejecting anything that is not a bare identifier.
pub(crate) fn quote_ident(name: &str) -> AppResult<String> {
    if IDENTIFIER_PATTERN.is_match(name) {
        Ok(format!("\"{}\"", name))
    } else {
        Err(AppError::BadRequest(format!("Invalid field name: {}", name)))
    }
}

/// Field reference, optionally qualified by a subquery alias.
pub(crate) fn column(alias: Option<&str>, name: &str) -> AppResult<String> {
    let quoted = quote_ident(name)?;
    Ok(match alias {
        Some(alias) => format!("{}.{}", alias, quoted),
        None => quoted,
    })
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// One `ORDER BY` key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }

    /// Parse a comma separated sort list; a leading `-` sorts descending.
    ///
    /// `"-price,ratings_average"` sorts by price descending, then rating ascending.
    pub fn parse_list(list: &str) -> Vec<SortKey> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix('-') {
                Some(field) => SortKey::desc(field),
                None => SortKey::asc(s),
            })
            .collect()
    }
}

pub(crate) fn push_order_by(
    qb: &mut QueryBuilder<'_, Postgres>,
    keys: &[SortKey],
    alias: Option<&str>,
) -> AppResult<()> {
    for (i, key) in keys.iter().enumerate() {
        qb.push(if i == 0 { " ORDER BY " } else { ", " });
        qb.push(column(alias, &key.field)?);
        qb.push(match key.direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        });
    }
    Ok(())
}
