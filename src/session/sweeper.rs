//! Periodic removal of abandoned sessions.
//!
//! Lookup only deletes the record it was asked about; tokens a client never
//! presents again are collected here instead.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::session::manager::SessionManager;

/// Sweep `manager` every `every` until `stop` fires (or its sender is dropped).
pub fn spawn_sweeper(
    manager: Arc<SessionManager>,
    every: Duration,
    mut stop: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // `interval` panics on a zero period.
        let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = stop.recv() => break,
                _ = ticker.tick() => {
                    if let Err(err) = manager.sweep().await {
                        tracing::warn!(error = %err, "Session sweep failed");
                    }
                }
            }
        }
        tracing::debug!("Session sweeper stopped");
    })
}
