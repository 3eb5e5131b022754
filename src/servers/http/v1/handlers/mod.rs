//! Axum handlers for the HTTP tracker.
pub mod announce;
pub mod index;
pub mod scrape;
