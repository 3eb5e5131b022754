//! Startup wiring: configuration loading, logging and job spawning.
pub mod app;
pub mod jobs;
pub mod logging;
