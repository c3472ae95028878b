//! Scheduled rate reloads
//!
//! The rate service never reloads on its own. This module runs the interval timer
//! outside of it and reports ticks over a tokio channel; the event loop decides
//! what to do with them.

use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::REFRESH_INTERVAL;

/// Messages sent from the scheduler to the main loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMessage {
    /// The reload interval elapsed
    IntervalElapsed,
}

/// Configuration for the reload scheduler
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Interval between scheduled reloads
    pub interval: Duration,
    /// Whether scheduled reloads are enabled
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: REFRESH_INTERVAL, // 30 minutes
            enabled: true,
        }
    }
}

/// Handle for controlling the reload scheduler
pub struct RefreshHandle {
    /// Channel for receiving scheduler messages
    pub receiver: mpsc::Receiver<RefreshMessage>,
    /// Signals the timer task to stop
    shutdown_tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Spawns the timer task and returns a handle to it
    ///
    /// The first tick fires one full interval after spawning; the initial load is
    /// the caller's job.
    pub fn spawn(config: RefreshConfig) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(8);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        if config.enabled {
            let period = config.interval;
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                // Skip the first tick (immediate)
                interval.tick().await;

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            if msg_tx.send(RefreshMessage::IntervalElapsed).await.is_err() {
                                break;
                            }
                        }
                        _ = shutdown_rx.recv() => {
                            break;
                        }
                    }
                }
            });
        }

        Self {
            receiver: msg_rx,
            shutdown_tx,
        }
    }

    /// Returns a pending message without blocking
    pub fn try_recv(&mut self) -> Option<RefreshMessage> {
        self.receiver.try_recv().ok()
    }

    /// Stops the timer task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_config_default() {
        let config = RefreshConfig::default();
        assert_eq!(config.interval, Duration::from_secs(1800));
        assert!(config.enabled);
    }

    #[tokio::test]
    async fn test_refresh_handle_spawn_disabled() {
        let config = RefreshConfig {
            enabled: false,
            ..Default::default()
        };

        let mut handle = RefreshHandle::spawn(config);

        assert!(handle.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_refresh_handle_ticks_after_interval() {
        let config = RefreshConfig {
            interval: Duration::from_millis(20),
            enabled: true,
        };
        let mut handle = RefreshHandle::spawn(config);

        assert!(handle.try_recv().is_none(), "first tick is skipped");

        let message = tokio::time::timeout(Duration::from_secs(2), handle.receiver.recv())
            .await
            .expect("tick within timeout");
        assert_eq!(message, Some(RefreshMessage::IntervalElapsed));

        handle.shutdown().await;
    }
}
