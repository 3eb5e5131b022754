//! Delivery layers: the HTTP tracker and the admin API.
pub mod apis;
pub mod http;
