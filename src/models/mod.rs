//! Data models for Tourbook

pub mod enums;
pub mod tour;

// Re-export commonly used types
pub use enums::Difficulty;
pub use tour::{MonthlyPlan, Tour, TourInput, TourStats, UpdateTour};
