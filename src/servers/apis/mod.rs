//! The admin JSON API: operational state and registry management over HTTP.
pub mod server;
pub mod v1;
