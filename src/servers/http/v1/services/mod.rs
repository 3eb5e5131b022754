//! Application services used by the HTTP tracker handlers.
pub mod peer_addr_resolver;
