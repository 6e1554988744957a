//! Database integration tests
//!
//! These need a PostgreSQL database reachable through `DATABASE_URL`.
//! Run with: cargo test -- --ignored

mod tours;
