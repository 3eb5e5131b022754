//! Application bootstrap: configuration, logging and the shared services.
use std::sync::Arc;

use anyhow::Context;

use crate::config::Configuration;
use crate::core::services::tracker_factory;
use crate::core::Tracker;
use crate::network::{self, Network};
use crate::bootstrap;

/// The wired application: everything the jobs need.
pub struct App {
    pub config: Arc<Configuration>,
    pub tracker: Arc<Tracker>,
    pub network: Arc<dyn Network>,
}

/// It loads the configuration, initializes logging, builds the tracker and
/// sets the network transport up.
///
/// # Errors
///
/// Will return an error if the configuration cannot be loaded or the
/// transport cannot be initialized.
pub async fn setup(config_toml_path: Option<&str>) -> anyhow::Result<App> {
    let config = Configuration::load(config_toml_path).context("invalid configuration")?;

    bootstrap::logging::setup(&config);

    let tracker = Arc::new(tracker_factory(&config));

    let net = network::build(&config.network).context("cannot build the network transport")?;
    net.setup().await.context("cannot set the network transport up")?;

    Ok(App {
        config: Arc::new(config),
        tracker,
        network: net,
    })
}
