//! Heartbeat watchdog.
//!
//! While a session is bound and a heartbeat interval is configured, the
//! watchdog checks once per interval whether a heartbeat meta event was
//! seen since the previous check; if not it force-disconnects the session
//! with reason `"Heartbeat timeout."`. The task starts only after the
//! session binds and dies with the session's cancellation token, so a
//! stale timer can never fire into a later session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::{ConnCore, ConnState};

/// Hunger tracker fed by heartbeat events.
#[derive(Debug)]
pub(crate) struct WatchDog {
    fed: AtomicBool,
}

impl WatchDog {
    /// A fresh watchdog counts as fed, so the first check window starts
    /// at session bind.
    pub(crate) fn new() -> Self {
        Self {
            fed: AtomicBool::new(true),
        }
    }

    pub(crate) fn feed(&self) {
        self.fed.store(true, Ordering::Relaxed);
    }

    /// Consumes the fed flag; true when nothing fed the dog since the
    /// previous check.
    pub(crate) fn starved(&self) -> bool {
        !self.fed.swap(false, Ordering::Relaxed)
    }
}

/// Spawns the watchdog task for one bound session.
///
/// The feeder subscription is removed and the task exits when `token` is
/// cancelled (session teardown) or the connection leaves `Connected`.
pub(crate) fn spawn_watchdog(
    core: Arc<ConnCore>,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    let dog = Arc::new(WatchDog::new());
    let feeder = {
        let dog = Arc::clone(&dog);
        core.bus().subscribe("meta_event.heartbeat", move |_| {
            dog.feed();
            None
        })
    };

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {
                    if core.state() != ConnState::Connected {
                        break;
                    }
                    if dog.starved() {
                        warn!(interval = ?interval, "no heartbeat within interval, disconnecting");
                        if let Err(error) = core.disconnect("Heartbeat timeout.").await {
                            warn!(%error, "heartbeat disconnect failed");
                        }
                        break;
                    }
                }
            }
        }
        core.bus().unsubscribe(feeder);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_fed_and_starves_without_feeding() {
        let dog = WatchDog::new();
        assert!(!dog.starved());
        assert!(dog.starved());
    }

    #[test]
    fn feeding_resets_hunger() {
        let dog = WatchDog::new();
        assert!(!dog.starved());
        dog.feed();
        assert!(!dog.starved());
        assert!(dog.starved());
    }
}
