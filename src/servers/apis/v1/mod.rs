//! Admin API, version 1.
pub mod handlers;
pub mod responses;
pub mod routes;
