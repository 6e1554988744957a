//! Business logic services

pub mod tours;

use std::sync::Arc;

use crate::repository::Repository;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub tours: tours::ToursService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository) -> Self {
        Self {
            tours: tours::ToursService::new(Arc::new(repository.tours)),
        }
    }
}
