//! Change event bridge - turns filesystem bursts into engine commands
//!
//! The [`ChangeEventBridge`] sits between the
//! [`FileWatcher`](super::watcher::FileWatcher) and the
//! [`ReconciliationEngine`](super::engine::ReconciliationEngine). It
//! filters qualifying events into a
//! [`DebouncedChangeQueue`](super::watcher::DebouncedChangeQueue) and sends
//! one [`EngineCommand::LocalChange`] per settled burst.
//!
//! ## Flow
//!
//! ```text
//! FileWatcher ──→ mpsc::Receiver ──→ ChangeEventBridge ──→ mpsc::Sender<EngineCommand>
//!                                        │
//!                                  DebouncedChangeQueue
//! ```
//!
//! The bridge never sleeps per event; it waits on whichever comes first,
//! the next event or the current batch's settle deadline.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::engine::EngineCommand;
use crate::watcher::{ChangeEvent, DebouncedChangeQueue};

/// Debounces filesystem events into reconciliation triggers
pub struct ChangeEventBridge {
    /// Receiver for change events from the FileWatcher
    change_rx: mpsc::Receiver<ChangeEvent>,
    /// Queue that coalesces rapid-fire events
    queue: DebouncedChangeQueue,
    /// Where triggers are delivered
    commands: mpsc::Sender<EngineCommand>,
}

impl ChangeEventBridge {
    /// Creates a new bridge
    ///
    /// # Arguments
    /// * `change_rx` - Channel receiver for filesystem change events
    /// * `commands` - Engine command queue
    /// * `settle_delay` - How long a burst must be quiet before triggering
    pub fn new(
        change_rx: mpsc::Receiver<ChangeEvent>,
        commands: mpsc::Sender<EngineCommand>,
        settle_delay: Duration,
    ) -> Self {
        info!(
            settle_ms = settle_delay.as_millis() as u64,
            "Creating change event bridge"
        );

        Self {
            change_rx,
            queue: DebouncedChangeQueue::new(settle_delay),
            commands,
        }
    }

    /// Adds an event to the queue if it qualifies
    ///
    /// Returns true if the event was queued.
    pub fn enqueue(&mut self, event: ChangeEvent) -> bool {
        if !event.qualifies() {
            trace!(path = %event.path.display(), kind = ?event.kind, "Ignoring change event");
            return false;
        }
        self.queue.push(event);
        true
    }

    /// Main loop of the bridge
    ///
    /// Runs until `shutdown` is cancelled, the watcher channel closes, or
    /// the engine stops accepting commands. When the watcher channel closes
    /// any pending batch is sent before returning.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Change event bridge starting");

        loop {
            let deadline = self.queue.deadline();

            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Shutdown requested, bridge stopping");
                    break;
                }

                event = self.change_rx.recv() => {
                    match event {
                        Some(change) => {
                            self.enqueue(change);
                        }
                        None => {
                            info!("Change channel closed, bridge shutting down");
                            let pending = self.queue.drain();
                            if !pending.is_empty() {
                                info!(count = pending.len(), "Flushing pending changes before shutdown");
                                let _ = self.send(pending).await;
                            }
                            break;
                        }
                    }
                }

                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    let settled = self.queue.poll();
                    if !settled.is_empty() && !self.send(settled).await {
                        break;
                    }
                }
            }
        }

        info!("Change event bridge stopped");
    }

    /// Sends one trigger for `settled`; returns false if the engine is gone
    async fn send(&self, settled: Vec<ChangeEvent>) -> bool {
        info!(count = settled.len(), "Local changes settled, requesting reconciliation");
        for event in &settled {
            debug!(path = %event.path.display(), kind = ?event.kind, "Settled");
        }

        let paths = settled.into_iter().map(|e| e.path).collect();
        if self
            .commands
            .send(EngineCommand::LocalChange { paths })
            .await
            .is_err()
        {
            debug!("Engine command channel closed");
            return false;
        }
        true
    }
}
