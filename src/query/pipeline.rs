//! Aggregation pipelines.
//!
//! Stages run in order. Each stage compiles to a subquery wrapping the previous
//! one, and every output row is returned as a JSON object:
//!
//! ```text
//! match  -> SELECT * FROM (prev) AS sN WHERE ...
//! unwind -> SELECT sN.*, uN."into" FROM (prev) AS sN CROSS JOIN LATERAL unnest(sN."path") AS uN("into")
//! group  -> SELECT <key> AS "key", <accumulators> FROM (prev) AS sN GROUP BY 1
//! sort   -> SELECT * FROM (prev) AS sN ORDER BY ...
//! limit  -> SELECT * FROM (prev) AS sN LIMIT n
//! ```
//!
//! A subquery does not pin the row order of its outer select, so the keys of
//! the last `sort` stage (when only `limit` stages follow it) are applied
//! again to the outermost select.

use sqlx::{Postgres, QueryBuilder};

use super::{column, push_order_by, quote_ident, Filter, SortKey};
use crate::error::{AppError, AppResult};

/// What a `group` stage groups by. The key is exposed as the `key` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKey {
    /// A single group over every row
    All,
    Field(String),
    /// Upper-cased text field
    Upper(String),
    /// Month (1-12) of a timestamp field
    Month(String),
}

impl GroupKey {
    fn as_sql(&self, alias: &str) -> AppResult<String> {
        Ok(match self {
            GroupKey::All => "NULL".to_string(),
            GroupKey::Field(field) => column(Some(alias), field)?,
            GroupKey::Upper(field) => format!("UPPER({})", column(Some(alias), field)?),
            GroupKey::Month(field) => {
                format!("EXTRACT(MONTH FROM {})::int", column(Some(alias), field)?)
            }
        })
    }
}

/// Per-group accumulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accumulator {
    Count,
    Sum(String),
    Avg(String),
    Min(String),
    Max(String),
    /// Collects the field values of the group into an array
    Push(String),
}

impl Accumulator {
    fn as_sql(&self, alias: &str) -> AppResult<String> {
        let (function, field) = match self {
            Accumulator::Count => return Ok("COUNT(*)".to_string()),
            Accumulator::Sum(field) => ("SUM", field),
            Accumulator::Avg(field) => ("AVG", field),
            Accumulator::Min(field) => ("MIN", field),
            Accumulator::Max(field) => ("MAX", field),
            Accumulator::Push(field) => ("array_agg", field),
        };
        Ok(format!("{}({})", function, column(Some(alias), field)?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    /// One row per element of the array field `path`, exposed as `into`
    Unwind { path: String, into: String },
    Group {
        key: GroupKey,
        fields: Vec<(String, Accumulator)>,
    },
    Sort(Vec<SortKey>),
    Limit(i64),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matching(mut self, filter: Filter) -> Self {
        self.stages.push(Stage::Match(filter));
        self
    }

    pub fn unwind(mut self, path: impl Into<String>, into: impl Into<String>) -> Self {
        self.stages.push(Stage::Unwind {
            path: path.into(),
            into: into.into(),
        });
        self
    }

    pub fn group<I, S>(mut self, key: GroupKey, fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Accumulator)>,
        S: Into<String>,
    {
        self.stages.push(Stage::Group {
            key,
            fields: fields.into_iter().map(|(n, a)| (n.into(), a)).collect(),
        });
        self
    }

    pub fn sort(mut self, keys: Vec<SortKey>) -> Self {
        self.stages.push(Stage::Sort(keys));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.stages.push(Stage::Limit(limit));
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Insert a stage in front of every other stage.
    pub fn unshift(&mut self, stage: Stage) {
        self.stages.insert(0, stage);
    }

    pub(crate) fn to_sql(&self) -> AppResult<QueryBuilder<'static, Postgres>> {
        let mut qb = QueryBuilder::new("SELECT row_to_json(t) AS doc FROM (");
        push_stages(&mut qb, &self.stages)?;
        qb.push(") AS t");
        if let Some(keys) = self.output_order() {
            push_order_by(&mut qb, keys, Some("t"))?;
        }
        Ok(qb)
    }

    /// Sort keys that still hold for the final rows
    fn output_order(&self) -> Option<&[SortKey]> {
        for stage in self.stages.iter().rev() {
            match stage {
                Stage::Limit(_) => continue,
                Stage::Sort(keys) => return Some(keys),
                _ => return None,
            }
        }
        None
    }
}

fn push_stages(qb: &mut QueryBuilder<'_, Postgres>, stages: &[Stage]) -> AppResult<()> {
    let Some((last, inner)) = stages.split_last() else {
        qb.push("SELECT * FROM tours");
        return Ok(());
    };
    let n = stages.len();
    let alias = format!("s{}", n);

    match last {
        Stage::Match(filter) => {
            qb.push("SELECT * FROM (");
            push_stages(qb, inner)?;
            qb.push(format!(") AS {}", alias));
            filter.push_where(qb, Some(&alias))?;
        }
        Stage::Unwind { path, into } => {
            if path == into {
                return Err(AppError::BadRequest(format!(
                    "Unwind of {} needs a different output field",
                    path
                )));
            }
            let into = quote_ident(into)?;
            qb.push(format!("SELECT {}.*, u{}.{} FROM (", alias, n, into));
            push_stages(qb, inner)?;
            qb.push(format!(
                ") AS {} CROSS JOIN LATERAL unnest({}) AS u{}({})",
                alias,
                column(Some(&alias), path)?,
                n,
                into
            ));
        }
        Stage::Group { key, fields } => {
            qb.push(format!("SELECT {} AS \"key\"", key.as_sql(&alias)?));
            for (name, accumulator) in fields {
                qb.push(format!(
                    ", {} AS {}",
                    accumulator.as_sql(&alias)?,
                    quote_ident(name)?
                ));
            }
            qb.push(" FROM (");
            push_stages(qb, inner)?;
            qb.push(format!(") AS {}", alias));
            if *key != GroupKey::All {
                qb.push(" GROUP BY 1");
            }
        }
        Stage::Sort(keys) => {
            qb.push("SELECT * FROM (");
            push_stages(qb, inner)?;
            qb.push(format!(") AS {}", alias));
            push_order_by(qb, keys, Some(&alias))?;
        }
        Stage::Limit(limit) => {
            qb.push("SELECT * FROM (");
            push_stages(qb, inner)?;
            qb.push(format!(") AS {} LIMIT ", alias));
            qb.push_bind(*limit);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Op;

    #[test]
    fn test_empty_pipeline_returns_every_row() {
        let qb = Pipeline::new().to_sql().unwrap();
        assert_eq!(
            qb.sql(),
            "SELECT row_to_json(t) AS doc FROM (SELECT * FROM tours) AS t"
        );
    }

    #[test]
    fn test_match_then_group_then_sort() {
        let pipeline = Pipeline::new()
            .matching(Filter::new().and_ge("ratings_average", 4.5))
            .group(
                GroupKey::Upper("difficulty".into()),
                [
                    ("num_tours", Accumulator::Count),
                    ("avg_price", Accumulator::Avg("price".into())),
                ],
            )
            .sort(vec![SortKey::asc("avg_price")]);

        assert_eq!(
            pipeline.to_sql().unwrap().sql(),
            "SELECT row_to_json(t) AS doc FROM (\
             SELECT * FROM (\
             SELECT UPPER(s2.\"difficulty\") AS \"key\", COUNT(*) AS \"num_tours\", \
             AVG(s2.\"price\") AS \"avg_price\" FROM (\
             SELECT * FROM (SELECT * FROM tours) AS s1 WHERE s1.\"ratings_average\" >= $1\
             ) AS s2 GROUP BY 1\
             ) AS s3 ORDER BY s3.\"avg_price\" ASC\
             ) AS t ORDER BY t.\"avg_price\" ASC"
        );
    }

    #[test]
    fn test_outer_order_follows_last_sort() {
        let sorted_then_limited = Pipeline::new()
            .sort(vec![SortKey::desc("num_tour_starts"), SortKey::asc("key")])
            .limit(12);
        let sql = sorted_then_limited.to_sql().unwrap().sql().to_string();
        assert!(sql.ends_with(
            ") AS t ORDER BY t.\"num_tour_starts\" DESC, t.\"key\" ASC"
        ));

        let regrouped = Pipeline::new()
            .sort(vec![SortKey::asc("price")])
            .group(GroupKey::All, [("total", Accumulator::Count)]);
        assert!(regrouped.to_sql().unwrap().sql().ends_with(") AS t"));
    }

    #[test]
    fn test_unwind_and_limit() {
        let pipeline = Pipeline::new()
            .unwind("start_dates", "start_date")
            .group(GroupKey::Month("start_date".into()), [("tours", Accumulator::Push("name".into()))])
            .limit(12);

        assert_eq!(
            pipeline.to_sql().unwrap().sql(),
            "SELECT row_to_json(t) AS doc FROM (\
             SELECT * FROM (\
             SELECT EXTRACT(MONTH FROM s2.\"start_date\")::int AS \"key\", \
             array_agg(s2.\"name\") AS \"tours\" FROM (\
             SELECT s1.*, u1.\"start_date\" FROM (SELECT * FROM tours) AS s1 \
             CROSS JOIN LATERAL unnest(s1.\"start_dates\") AS u1(\"start_date\")\
             ) AS s2 GROUP BY 1\
             ) AS s3 LIMIT $1\
             ) AS t"
        );
    }

    #[test]
    fn test_group_all_has_no_group_by() {
        let pipeline = Pipeline::new().group(GroupKey::All, [("total", Accumulator::Count)]);
        let qb = pipeline.to_sql().unwrap();
        assert!(qb.sql().contains("SELECT NULL AS \"key\", COUNT(*) AS \"total\""));
        assert!(!qb.sql().contains("GROUP BY"));
    }

    #[test]
    fn test_unshift_puts_stage_first() {
        let mut pipeline = Pipeline::new().limit(3);
        let stage = Stage::Match(Filter::new().and(crate::query::Condition::new(
            "secret_tour",
            Op::Ne,
            true,
        )));
        pipeline.unshift(stage.clone());
        assert_eq!(pipeline.stages()[0], stage);
        assert_eq!(pipeline.stages().len(), 2);
    }

    #[test]
    fn test_invalid_stages_are_rejected() {
        assert!(Pipeline::new().unwind("images", "images").to_sql().is_err());
        assert!(Pipeline::new()
            .group(GroupKey::Field("difficulty".into()), [("Bad Name", Accumulator::Count)])
            .to_sql()
            .is_err());
    }
}
