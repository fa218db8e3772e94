//! Per-scale worker threads and the event stream they feed.
//!
//! Each physical scale gets one thread that owns its coordinator outright;
//! scales share nothing but the event channel. A stuck device therefore
//! stalls at most its own worker, and only up to the transport's read
//! timeout.
//!
//! Safety: each `ScaleWorker` spawns exactly one thread that is shut down
//! when the worker is stopped or dropped, preventing thread leaks.

use crate::coordinator::{ScaleCoordinator, TickOutcome};
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use weigh_traits::{Clock, DisplaySink, Transport, WeighingRecord};

/// What a scale worker reports to the session that owns it.
#[derive(Debug, Clone)]
pub enum ScaleEvent {
    /// Live weight for display; dropped when the consumer lags.
    Weight { scale: String, kg: f64 },
    /// Link status edge.
    Link {
        scale: String,
        connected: bool,
        port: Option<String>,
        baud: Option<u32>,
    },
    /// A weighing was persisted.
    Recorded {
        scale: String,
        record: WeighingRecord,
    },
    /// A capture fired but persistence rejected it.
    StoreFailed { scale: String, message: String },
    /// Retries used up; the link needs manual attention.
    LinkExhausted { scale: String },
}

/// `DisplaySink` that forwards into the shared event channel.
///
/// Pushes use `try_send`: a full channel drops the update rather than
/// stalling the poll loop or flooding a slow consumer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    scale: String,
    tx: xch::Sender<ScaleEvent>,
}

impl ChannelSink {
    pub fn new(scale: impl Into<String>, tx: xch::Sender<ScaleEvent>) -> Self {
        Self {
            scale: scale.into(),
            tx,
        }
    }
}

impl DisplaySink for ChannelSink {
    fn on_weight_sample(&mut self, kg: f64) {
        let _ = self.tx.try_send(ScaleEvent::Weight {
            scale: self.scale.clone(),
            kg,
        });
    }

    fn on_connection_status(&mut self, connected: bool, port: Option<&str>, baud: Option<u32>) {
        let _ = self.tx.try_send(ScaleEvent::Link {
            scale: self.scale.clone(),
            connected,
            port: port.map(str::to_string),
            baud,
        });
    }
}

/// A bounded channel sized for live weight traffic plus lifecycle events.
pub fn event_channel() -> (xch::Sender<ScaleEvent>, xch::Receiver<ScaleEvent>) {
    xch::bounded(64)
}

pub struct ScaleWorker {
    name: String,
    /// Shutdown flag for immediate response (atomic for lock-free check)
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl ScaleWorker {
    /// Spawn the poll loop for one scale. The coordinator moves into the
    /// thread; lifecycle outcomes are delivered over `tx`.
    pub fn spawn<T, C>(
        name: impl Into<String>,
        mut coordinator: ScaleCoordinator<T>,
        period: Duration,
        clock: C,
        tx: xch::Sender<ScaleEvent>,
    ) -> Self
    where
        T: Transport + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let name = name.into();
        let scale = name.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let join_handle = std::thread::spawn(move || {
            loop {
                // Immediate shutdown check (lock-free atomic)
                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }

                let event = match coordinator.tick() {
                    TickOutcome::Idle | TickOutcome::Sampled => None,
                    TickOutcome::Recorded(record) => Some(ScaleEvent::Recorded {
                        scale: scale.clone(),
                        record,
                    }),
                    TickOutcome::StoreFailed(message) => Some(ScaleEvent::StoreFailed {
                        scale: scale.clone(),
                        message,
                    }),
                    TickOutcome::LinkDown => Some(ScaleEvent::LinkExhausted {
                        scale: scale.clone(),
                    }),
                };
                if let Some(event) = event
                    && tx.send(event).is_err()
                {
                    tracing::debug!(scale = %scale, "worker consumer disconnected, exiting");
                    break;
                }

                // Check shutdown before sleep to avoid unnecessary delay
                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(period);
            }
            // Release the link before the thread exits so no decision can be
            // delivered after shutdown.
            coordinator.disconnect();
            tracing::trace!(scale = %scale, "scale worker exiting");
        });

        Self {
            name,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signal the worker to stop and join its thread. Joining waits at most
    /// one tick plus the transport read timeout.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!(scale = %self.name, "worker joined");
                }
                Err(e) => {
                    tracing::warn!(?e, scale = %self.name, "worker panicked during shutdown");
                }
            }
        }
    }
}

impl Drop for ScaleWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
