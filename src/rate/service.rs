//! Rate loading strategy
//!
//! `RateService` owns the single authoritative current rate. A load consults the
//! cache first, then the network, then falls back to a stale cached value, and
//! finally gives up. Consumers never see raw errors, only the resulting state,
//! which is broadcast as a [`RateEvent`].

use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::{RateFetcher, RateRecord};
use crate::cache::RateCache;
use crate::config::ADVISORY_DISPLAY;

/// Where the current rate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateOrigin {
    /// A fresh cache entry; the network was not called
    Cache,
    /// A successful fetch in this load
    Network,
}

/// Load state of the service
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    /// No load has run yet
    Idle,
    /// A load is in progress
    Loading,
    /// A current rate is available
    Ready { record: RateRecord, origin: RateOrigin },
    /// The network failed; a stale cached rate is shown instead
    Degraded { record: RateRecord },
    /// The network failed and nothing is cached; conversion is unavailable
    Failed,
}

impl LoadState {
    /// The rate carried by this state, if any
    pub fn record(&self) -> Option<&RateRecord> {
        match self {
            LoadState::Ready { record, .. } | LoadState::Degraded { record } => Some(record),
            LoadState::Idle | LoadState::Loading | LoadState::Failed => None,
        }
    }
}

/// Notifications published to subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum RateEvent {
    /// The load state changed
    StateChanged(LoadState),
    /// A transient advisory to show for `display_for`
    Advisory { message: String, display_for: Duration },
}

/// Message shown alongside a stale rate
pub const STALE_ADVISORY: &str = "Offline: showing last known rate";

/// Capacity of the event channel; slow subscribers skip older events
const EVENT_CAPACITY: usize = 16;

/// Orchestrates the rate cache and the rate fetcher
///
/// `load` takes `&mut self`, so overlapping loads on one service cannot happen.
pub struct RateService {
    cache: RateCache,
    source: Box<dyn RateFetcher>,
    state: LoadState,
    current: Option<RateRecord>,
    events: broadcast::Sender<RateEvent>,
}

impl RateService {
    /// Creates a service over the given cache and fetcher
    pub fn new(cache: RateCache, source: impl RateFetcher + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            cache,
            source: Box::new(source),
            state: LoadState::Idle,
            current: None,
            events,
        }
    }

    /// Subscribes to state changes and advisories
    pub fn subscribe(&self) -> broadcast::Receiver<RateEvent> {
        self.events.subscribe()
    }

    /// Current load state
    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// The current rate, or `None` when conversion is unavailable
    pub fn current_rate(&self) -> Option<f64> {
        self.current.as_ref().map(RateRecord::value)
    }

    /// The current rate record, including its publication date
    pub fn current_record(&self) -> Option<&RateRecord> {
        self.current.as_ref()
    }

    /// The cache this service reads and writes
    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    /// Runs one load cycle and returns the resulting state
    ///
    /// # Behavior
    /// - A fresh cache entry is used without calling the network (`Ready`)
    /// - Otherwise the fetcher is called; on success the record is cached and then
    ///   surfaced (`Ready`)
    /// - On fetch failure a stale cache entry is surfaced with an advisory (`Degraded`)
    /// - With nothing cached the current rate is cleared (`Failed`)
    pub async fn load(&mut self) -> &LoadState {
        self.transition(LoadState::Loading);

        if let Some(cached) = self.cache.get() {
            debug!(valor = cached.record.value(), "Using cached rate");
            self.current = Some(cached.record.clone());
            self.transition(LoadState::Ready {
                record: cached.record,
                origin: RateOrigin::Cache,
            });
            return &self.state;
        }

        debug!("Rate cache missing or stale, fetching");
        match self.source.fetch().await {
            Ok(record) => {
                if let Err(e) = self.cache.set(&record) {
                    warn!(error = %e, "Failed to persist rate, continuing with in-memory value");
                }
                info!(valor = record.value(), fecha = record.as_of_date(), "Rate loaded");
                self.current = Some(record.clone());
                self.transition(LoadState::Ready {
                    record,
                    origin: RateOrigin::Network,
                });
            }
            Err(fetch_error) => {
                error!(error = %fetch_error, "Failed to load rate");
                self.recover();
            }
        }

        &self.state
    }

    /// Whether a reload is warranted because no fresh cache entry exists
    pub fn needs_reload(&self) -> bool {
        self.cache.get().is_none()
    }

    /// Reloads only when no fresh cache entry exists; returns whether a load ran
    ///
    /// This is the re-check to call when the user returns to the app.
    pub async fn reload_if_needed(&mut self) -> bool {
        if self.needs_reload() {
            info!("No fresh rate cached, reloading");
            self.load().await;
            true
        } else {
            false
        }
    }

    /// Falls back to a stale cache entry, or fails
    fn recover(&mut self) {
        match self.cache.get_ignoring_ttl() {
            Some(stale) => {
                warn!(
                    valor = stale.record.value(),
                    fetched_at = %stale.fetched_at,
                    "Using expired cached rate"
                );
                self.current = Some(stale.record.clone());
                self.transition(LoadState::Degraded {
                    record: stale.record,
                });
                self.publish(RateEvent::Advisory {
                    message: STALE_ADVISORY.to_string(),
                    display_for: ADVISORY_DISPLAY,
                });
            }
            None => {
                error!("No rate available (no cache and no connection)");
                self.current = None;
                self.transition(LoadState::Failed);
            }
        }
    }

    fn transition(&mut self, state: LoadState) {
        self.state = state.clone();
        self.publish(RateEvent::StateChanged(state));
    }

    fn publish(&self, event: RateEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}
