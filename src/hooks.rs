//! Tour lifecycle hooks.
//!
//! Save hooks run around every insert and replace, find hooks around every
//! find-family query (find, find one, delete by id) and the aggregate hook
//! before every pipeline. A delete logs its removed count through
//! `post_delete` in place of `post_find`. All of them are plain functions over
//! the value they rewrite.

use std::time::Instant;

use crate::{
    models::Tour,
    query::{Condition, Filter, FindQuery, Op, Pipeline, Stage},
    slug::slugify,
};

/// Condition hiding secret tours from queries
pub fn secret_tour_exclusion() -> Condition {
    Condition::new("secret_tour", Op::Ne, true)
}

/// Derive the slug from the name.
pub fn pre_save(tour: &mut Tour) {
    tour.slug = slugify(&tour.name);
}

pub fn post_save(tour: &Tour) {
    tracing::info!("Saved tour {} ({})", tour.slug, tour.id);
    tracing::debug!("Saved document: {:?}", tour);
}

/// Hide secret tours and start the query clock.
pub fn pre_find(query: &mut FindQuery) -> Instant {
    let exclusion = secret_tour_exclusion();
    if !query.filter.contains(&exclusion) {
        query.filter.push(exclusion);
    }
    Instant::now()
}

pub fn post_find(tours: &[Tour], started: Instant) {
    tracing::debug!("Matched documents: {:?}", tours);
    tracing::info!(
        "Query matched {} tours and took {} milliseconds",
        tours.len(),
        started.elapsed().as_millis()
    );
}

/// Log the outcome of a find-family delete.
pub fn post_delete(deleted: u64, started: Instant) {
    tracing::info!(
        "Delete removed {} tours and took {} milliseconds",
        deleted,
        started.elapsed().as_millis()
    );
}

/// Put a secret-tour `match` stage in front of the pipeline.
pub fn pre_aggregate(pipeline: &mut Pipeline) {
    let stage = Stage::Match(Filter::new().and(secret_tour_exclusion()));
    if pipeline.stages().first() != Some(&stage) {
        pipeline.unshift(stage);
    }
}
