//! Error types for Tourbook

use thiserror::Error;
use validator::ValidationErrors;

/// Postgres SQLSTATE for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input data. {}", validation_summary(.0))]
    Validation(#[from] ValidationErrors),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Turn a unique-constraint violation into a `Conflict`, naming the duplicate value.
    /// Any other database error is passed through.
    pub fn from_write(err: sqlx::Error, value: &str) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return AppError::Conflict(format!(
                    "Duplicate field value: \"{}\". Please use another value",
                    value
                ));
            }
        }
        AppError::Database(err)
    }

    /// Per-field validation messages, sorted by field name.
    /// Empty for every variant other than `Validation`.
    pub fn field_messages(&self) -> Vec<(String, String)> {
        match self {
            AppError::Validation(errors) => field_messages(errors),
            _ => Vec::new(),
        }
    }
}

fn field_messages(errors: &ValidationErrors) -> Vec<(String, String)> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                (field.clone(), message)
            })
        })
        .collect()
}

fn validation_summary(errors: &ValidationErrors) -> String {
    field_messages(errors)
        .into_iter()
        .map(|(_, message)| message)
        .collect::<Vec<_>>()
        .join(". ")
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
