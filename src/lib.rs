//! A `BitTorrent` tracker that serves identical announce and scrape
//! semantics over clearnet, I2P (via a SAM bridge) and Lokinet.
//!
//! The crate is split into:
//!
//! - [`core`]: the tracker engine. The in-memory sharded swarm store, the
//!   announce/scrape state machines, the peer lifecycle (join, active,
//!   leave/reap, snatch), the client whitelist, the stats pipeline and the
//!   optional backend driver.
//! - [`network`]: the transport abstraction the delivery layer runs over.
//! - [`servers`]: the HTTP delivery layer (bencoded announce/scrape) and the
//!   admin JSON API.
//! - [`bootstrap`] and [`app`]: process startup and the long-lived jobs.
//! - [`config`] and [`shared`]: configuration and common primitives.
pub mod app;
pub mod bootstrap;
pub mod config;
pub mod core;
pub mod network;
pub mod servers;
pub mod shared;
