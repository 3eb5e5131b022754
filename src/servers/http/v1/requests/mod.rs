//! Parsers for the HTTP tracker requests.
pub mod announce;
pub mod scrape;
