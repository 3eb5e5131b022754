//! Statistics setup: it builds the keeper task and hands the tracker the
//! event-sender half.
use crate::config::Configuration;
use crate::core::statistics;

/// It starts the statistics keeper and returns the sender plus the shared
/// metrics repository.
#[must_use]
pub fn setup(config: &Configuration) -> (Option<Box<dyn statistics::EventSender>>, statistics::Repo) {
    let buffer_size = if config.stats.buffer_size == 0 {
        statistics::DEFAULT_CHANNEL_BUFFER_SIZE
    } else {
        config.stats.buffer_size
    };

    let (sender, repository) = statistics::Keeper::new_active_instance(buffer_size);

    (Some(sender), repository)
}

#[cfg(test)]
mod tests {
    use crate::config::Configuration;
    use crate::core::services::statistics::setup;
    use crate::core::statistics::Event;

    #[tokio::test]
    async fn it_should_hand_out_a_live_event_sender() {
        let (sender, repository) = setup(&Configuration::default());

        sender.unwrap().send_event(Event::Announce).await.unwrap().unwrap();

        // Let the keeper drain the channel.
        tokio::task::yield_now().await;

        let _ = repository;
    }
}
