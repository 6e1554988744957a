//! Filter conditions shared by find queries and `match` stages.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::column;
use crate::error::AppResult;

/// A bound comparison value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

/// Comparison operator.
///
/// `Ne` treats NULL as "not equal", so a missing value never hides a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    fn as_sql(&self) -> &'static str {
        match self {
            Op::Eq => " = ",
            Op::Ne => " IS DISTINCT FROM ",
            Op::Lt => " < ",
            Op::Le => " <= ",
            Op::Gt => " > ",
            Op::Ge => " >= ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Op,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

/// Conjunction of conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.push(condition);
        self
    }

    pub fn and_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Condition::new(field, Op::Eq, value))
    }

    pub fn and_ne(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Condition::new(field, Op::Ne, value))
    }

    pub fn and_lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Condition::new(field, Op::Lt, value))
    }

    pub fn and_le(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Condition::new(field, Op::Le, value))
    }

    pub fn and_gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Condition::new(field, Op::Gt, value))
    }

    pub fn and_ge(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Condition::new(field, Op::Ge, value))
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn contains(&self, condition: &Condition) -> bool {
        self.conditions.contains(condition)
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Append ` WHERE a AND b ...`; nothing when the filter is empty.
    pub(crate) fn push_where(
        &self,
        qb: &mut QueryBuilder<'_, Postgres>,
        alias: Option<&str>,
    ) -> AppResult<()> {
        for (i, condition) in self.conditions.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            qb.push(column(alias, &condition.field)?);
            qb.push(condition.op.as_sql());
            push_value(qb, &condition.value);
        }
        Ok(())
    }
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &Value) {
    match value.clone() {
        Value::Bool(v) => qb.push_bind(v),
        Value::Int(v) => qb.push_bind(v),
        Value::Float(v) => qb.push_bind(v),
        Value::Text(v) => qb.push_bind(v),
        Value::Uuid(v) => qb.push_bind(v),
        Value::Timestamp(v) => qb.push_bind(v),
    };
}
