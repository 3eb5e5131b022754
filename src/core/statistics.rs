//! Structs to collect and keep tracker metrics.
//!
//! The data is collected by using an `event-sender -> event listener` model.
//! A single keeper task owns all counters; the rest of the tracker reaches
//! them only through three bounded channels: general events, peer lifecycle
//! events and response-time samples. When a channel fills up the producer
//! blocks until the keeper drains it, which is acceptable back-pressure
//! because the keeper performs only arithmetic.
//!
//! Latency samples feed three running percentile estimators (p50, p90, p95).
//! Snapshots render either the nested [`Metrics`] view or a flattened
//! key/value map.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::{mpsc, RwLock, RwLockReadGuard};

/// Fallback channel capacity when the configuration does not set one.
pub const DEFAULT_CHANNEL_BUFFER_SIZE: usize = 4096;

/// How many recent latency samples each percentile estimator keeps.
const PERCENTILE_WINDOW: usize = 512;

/// A general statistics event.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Event {
    Announce,
    Scrape,
    NewTorrent,
    DeletedTorrent,
    ReapedTorrent,
    HandledRequest,
    ErroredRequest,
    ClientError,
}

/// A peer lifecycle event.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PeerEvent {
    /// A leecher became a seeder.
    Completed,
    NewLeech,
    DeletedLeech,
    ReapedLeech,
    NewSeed,
    DeletedSeed,
    ReapedSeed,
}

/// Counters for one class of peers (all peers, or seeds only).
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize)]
pub struct PeerClassStats {
    /// Current peer count.
    pub current: i64,
    /// Peers that announced.
    pub joined: u64,
    /// Peers that paused or stopped.
    pub left: u64,
    /// Peers cleaned up after inactivity.
    pub reaped: u64,
}

/// Peer counters, overall and for seeds alone.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize)]
pub struct PeerStats {
    #[serde(rename = "peers")]
    pub all: PeerClassStats,
    pub seeds: PeerClassStats,
    /// Number of transitions from leech to seed.
    pub completed: u64,
}

/// A running percentile estimator over a sliding window of the most recent
/// samples. Precise enough for operational dashboards; the window bounds both
/// memory and skew from ancient requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Percentile {
    fraction: f64,
    samples: Vec<f64>,
    cursor: usize,
}

impl Percentile {
    #[must_use]
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction,
            samples: Vec::new(),
            cursor: 0,
        }
    }

    pub fn add_sample(&mut self, sample: f64) {
        if self.samples.len() < PERCENTILE_WINDOW {
            self.samples.push(sample);
        } else {
            self.samples[self.cursor] = sample;
            self.cursor = (self.cursor + 1) % PERCENTILE_WINDOW;
        }
    }

    /// The current estimate, `0.0` before the first sample.
    #[must_use]
    pub fn value(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let index = (self.fraction * (sorted.len() - 1) as f64).round() as usize;
        sorted[index]
    }
}

impl Serialize for Percentile {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value())
    }
}

/// Response-time percentiles, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileTimes {
    pub p50: Percentile,
    pub p90: Percentile,
    pub p95: Percentile,
}

impl Default for PercentileTimes {
    fn default() -> Self {
        Self {
            p50: Percentile::new(0.5),
            p90: Percentile::new(0.9),
            p95: Percentile::new(0.95),
        }
    }
}

/// Metrics collected by the tracker.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Metrics {
    #[serde(rename = "trackerAnnounces")]
    pub announces: u64,
    #[serde(rename = "trackerScrapes")]
    pub scrapes: u64,

    #[serde(rename = "torrentsSize")]
    pub torrents_size: u64,
    #[serde(rename = "torrentsAdded")]
    pub torrents_added: u64,
    #[serde(rename = "torrentsRemoved")]
    pub torrents_removed: u64,
    #[serde(rename = "torrentsReaped")]
    pub torrents_reaped: u64,

    #[serde(rename = "requestsHandled")]
    pub requests_handled: u64,
    #[serde(rename = "requestsErrored")]
    pub requests_errored: u64,
    /// Requests answered with a client-visible failure reason.
    #[serde(rename = "requestsBad")]
    pub client_errors: u64,

    pub peers: PeerStats,

    #[serde(rename = "responseTime")]
    pub response_time: PercentileTimes,
}

/// The service responsible for keeping tracker metrics: it listens to
/// statistics events and drives the counters.
pub struct Keeper {
    pub repository: Repo,
}

impl Default for Keeper {
    fn default() -> Self {
        Self::new()
    }
}

impl Keeper {
    #[must_use]
    pub fn new() -> Self {
        Self { repository: Repo::new() }
    }

    #[must_use]
    pub fn new_active_instance(channel_buffer_size: usize) -> (Box<dyn EventSender>, Repo) {
        let mut keeper = Self::new();

        let sender = keeper.run_event_listener(channel_buffer_size);

        (sender, keeper.repository)
    }

    pub fn run_event_listener(&mut self, channel_buffer_size: usize) -> Box<dyn EventSender> {
        let buffer = channel_buffer_size.max(1);
        let (events_tx, events_rx) = mpsc::channel::<Event>(buffer);
        let (peer_events_tx, peer_events_rx) = mpsc::channel::<PeerEvent>(buffer);
        let (timings_tx, timings_rx) = mpsc::channel::<Duration>(buffer);

        let repository = self.repository.clone();

        tokio::spawn(async move { event_listener(events_rx, peer_events_rx, timings_rx, repository).await });

        Box::new(Sender {
            events: events_tx,
            peer_events: peer_events_tx,
            timings: timings_tx,
        })
    }
}

async fn event_listener(
    mut events: mpsc::Receiver<Event>,
    mut peer_events: mpsc::Receiver<PeerEvent>,
    mut timings: mpsc::Receiver<Duration>,
    repository: Repo,
) {
    loop {
        tokio::select! {
            Some(event) = events.recv() => event_handler(event, &repository).await,
            Some(event) = peer_events.recv() => peer_event_handler(event, &repository).await,
            Some(duration) = timings.recv() => timing_handler(duration, &repository).await,
            else => break,
        }
    }
}

async fn event_handler(event: Event, repository: &Repo) {
    let mut stats = repository.stats.write().await;

    match event {
        Event::Announce => stats.announces += 1,
        Event::Scrape => stats.scrapes += 1,
        Event::NewTorrent => {
            stats.torrents_added += 1;
            stats.torrents_size += 1;
        }
        Event::DeletedTorrent => {
            stats.torrents_removed += 1;
            stats.torrents_size = stats.torrents_size.saturating_sub(1);
        }
        Event::ReapedTorrent => {
            stats.torrents_reaped += 1;
            stats.torrents_size = stats.torrents_size.saturating_sub(1);
        }
        Event::HandledRequest => stats.requests_handled += 1,
        Event::ErroredRequest => stats.requests_errored += 1,
        Event::ClientError => stats.client_errors += 1,
    }
}

async fn peer_event_handler(event: PeerEvent, repository: &Repo) {
    let mut stats = repository.stats.write().await;
    let peers = &mut stats.peers;

    match event {
        PeerEvent::Completed => {
            peers.completed += 1;
            peers.seeds.current += 1;
        }
        PeerEvent::NewLeech => {
            peers.all.joined += 1;
            peers.all.current += 1;
        }
        PeerEvent::DeletedLeech => {
            peers.all.left += 1;
            peers.all.current -= 1;
        }
        PeerEvent::ReapedLeech => {
            peers.all.reaped += 1;
            peers.all.current -= 1;
        }
        PeerEvent::NewSeed => {
            peers.seeds.joined += 1;
            peers.seeds.current += 1;
            peers.all.joined += 1;
            peers.all.current += 1;
        }
        PeerEvent::DeletedSeed => {
            peers.seeds.left += 1;
            peers.seeds.current -= 1;
            peers.all.left += 1;
            peers.all.current -= 1;
        }
        PeerEvent::ReapedSeed => {
            peers.seeds.reaped += 1;
            peers.seeds.current -= 1;
            peers.all.reaped += 1;
            peers.all.current -= 1;
        }
    }
}

async fn timing_handler(duration: Duration, repository: &Repo) {
    let millis = duration.as_secs_f64() * 1000.0;

    let mut stats = repository.stats.write().await;
    stats.response_time.p50.add_sample(millis);
    stats.response_time.p90.add_sample(millis);
    stats.response_time.p95.add_sample(millis);
}

/// A trait to allow sending statistics events.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait EventSender: Sync + Send {
    async fn send_event(&self, event: Event) -> Option<Result<(), SendError<Event>>>;
    async fn send_peer_event(&self, event: PeerEvent) -> Option<Result<(), SendError<PeerEvent>>>;
    async fn send_timing(&self, duration: Duration) -> Option<Result<(), SendError<Duration>>>;
}

/// An [`EventSender`] implementation backed by the keeper's bounded channels.
pub struct Sender {
    events: mpsc::Sender<Event>,
    peer_events: mpsc::Sender<PeerEvent>,
    timings: mpsc::Sender<Duration>,
}

#[async_trait]
impl EventSender for Sender {
    async fn send_event(&self, event: Event) -> Option<Result<(), SendError<Event>>> {
        Some(self.events.send(event).await)
    }

    async fn send_peer_event(&self, event: PeerEvent) -> Option<Result<(), SendError<PeerEvent>>> {
        Some(self.peer_events.send(event).await)
    }

    async fn send_timing(&self, duration: Duration) -> Option<Result<(), SendError<Duration>>> {
        Some(self.timings.send(duration).await)
    }
}

/// A repository for the tracker metrics.
#[derive(Clone)]
pub struct Repo {
    pub stats: Arc<RwLock<Metrics>>,
}

impl Default for Repo {
    fn default() -> Self {
        Self::new()
    }
}

impl Repo {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stats: Arc::new(RwLock::new(Metrics::default())),
        }
    }

    pub async fn get_stats(&self) -> RwLockReadGuard<'_, Metrics> {
        self.stats.read().await
    }
}

/// It flattens a nested JSON snapshot into dotted keys, e.g.
/// `peers.seeds.current`.
#[must_use]
pub fn flatten(value: &serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    let mut flattened = serde_json::Map::new();
    flatten_into(&mut flattened, "", value);
    flattened
}

fn flatten_into(target: &mut serde_json::Map<String, serde_json::Value>, prefix: &str, value: &serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, nested) in map {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(target, &key, nested);
            }
        }
        leaf => {
            target.insert(prefix.to_string(), leaf.clone());
        }
    }
}

#[cfg(test)]
mod tests {

    mod stats_keeper {
        use crate::core::statistics::{Event, Keeper, Metrics};

        #[tokio::test]
        async fn should_contain_the_tracker_statistics() {
            let keeper = Keeper::new();

            let stats = keeper.repository.get_stats().await;

            assert_eq!(stats.announces, Metrics::default().announces);
        }

        #[tokio::test]
        async fn should_create_an_event_sender_to_send_statistical_events() {
            let mut keeper = Keeper::new();

            let event_sender = keeper.run_event_listener(16);

            let result = event_sender.send_event(Event::Announce).await;

            assert!(result.is_some());
        }
    }

    mod event_handlers {
        use std::time::Duration;

        use crate::core::statistics::{event_handler, peer_event_handler, timing_handler, Event, PeerEvent, Repo};

        #[tokio::test]
        async fn should_increase_the_announces_counter_when_it_receives_an_announce_event() {
            let repository = Repo::new();

            event_handler(Event::Announce, &repository).await;

            assert_eq!(repository.get_stats().await.announces, 1);
        }

        #[tokio::test]
        async fn should_increase_the_scrapes_counter_when_it_receives_a_scrape_event() {
            let repository = Repo::new();

            event_handler(Event::Scrape, &repository).await;

            assert_eq!(repository.get_stats().await.scrapes, 1);
        }

        #[tokio::test]
        async fn should_track_the_torrent_count_across_add_and_reap_events() {
            let repository = Repo::new();

            event_handler(Event::NewTorrent, &repository).await;
            event_handler(Event::NewTorrent, &repository).await;
            event_handler(Event::ReapedTorrent, &repository).await;

            let stats = repository.get_stats().await;
            assert_eq!(stats.torrents_size, 1);
            assert_eq!(stats.torrents_added, 2);
            assert_eq!(stats.torrents_reaped, 1);
        }

        #[tokio::test]
        async fn should_count_a_new_seed_in_both_peer_classes() {
            let repository = Repo::new();

            peer_event_handler(PeerEvent::NewSeed, &repository).await;

            let stats = repository.get_stats().await;
            assert_eq!(stats.peers.all.current, 1);
            assert_eq!(stats.peers.seeds.current, 1);
        }

        #[tokio::test]
        async fn should_move_a_completing_peer_into_the_seed_class() {
            let repository = Repo::new();

            peer_event_handler(PeerEvent::NewLeech, &repository).await;
            peer_event_handler(PeerEvent::Completed, &repository).await;

            let stats = repository.get_stats().await;
            assert_eq!(stats.peers.completed, 1);
            assert_eq!(stats.peers.all.current, 1);
            assert_eq!(stats.peers.seeds.current, 1);
        }

        #[tokio::test]
        async fn should_count_reaped_peers() {
            let repository = Repo::new();

            peer_event_handler(PeerEvent::NewLeech, &repository).await;
            peer_event_handler(PeerEvent::ReapedLeech, &repository).await;

            let stats = repository.get_stats().await;
            assert_eq!(stats.peers.all.current, 0);
            assert_eq!(stats.peers.all.reaped, 1);
        }

        #[tokio::test]
        async fn should_feed_latency_samples_to_all_three_percentiles() {
            let repository = Repo::new();

            timing_handler(Duration::from_millis(10), &repository).await;

            let stats = repository.get_stats().await;
            assert!((stats.response_time.p50.value() - 10.0).abs() < f64::EPSILON);
            assert!((stats.response_time.p95.value() - 10.0).abs() < f64::EPSILON);
        }
    }

    mod percentile {
        use crate::core::statistics::Percentile;

        #[test]
        fn it_should_return_zero_before_any_sample() {
            assert!(Percentile::new(0.5).value().abs() < f64::EPSILON);
        }

        #[test]
        fn it_should_estimate_the_median_of_a_uniform_sequence() {
            let mut percentile = Percentile::new(0.5);
            for i in 1..=101 {
                percentile.add_sample(f64::from(i));
            }

            assert!((percentile.value() - 51.0).abs() < f64::EPSILON);
        }

        #[test]
        fn it_should_estimate_high_percentiles() {
            let mut percentile = Percentile::new(0.9);
            for i in 1..=101 {
                percentile.add_sample(f64::from(i));
            }

            assert!((percentile.value() - 91.0).abs() < 2.0);
        }

        #[test]
        fn it_should_slide_its_window_over_recent_samples() {
            let mut percentile = Percentile::new(0.5);
            for _ in 0..2000 {
                percentile.add_sample(1.0);
            }
            for _ in 0..2000 {
                percentile.add_sample(100.0);
            }

            assert!((percentile.value() - 100.0).abs() < f64::EPSILON);
        }
    }

    mod flattened_snapshots {
        use crate::core::statistics::{flatten, Metrics};

        #[test]
        fn it_should_flatten_nested_objects_into_dotted_keys() {
            let snapshot = serde_json::to_value(Metrics::default()).unwrap();

            let flattened = flatten(&snapshot);

            assert!(flattened.contains_key("trackerAnnounces"));
            assert!(flattened.contains_key("peers.seeds.current"));
            assert!(flattened.contains_key("responseTime.p50"));
        }
    }
}
