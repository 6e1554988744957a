//! Tourbook
//!
//! The tour catalog model: validated tour records, slugs derived on save, and
//! find/aggregate queries that never return secret tours.

pub mod config;
pub mod error;
pub mod hooks;
pub mod models;
pub mod query;
pub mod repository;
pub mod services;
pub mod slug;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
