//! Link supervision: keep a scale usably connected without operator
//! babysitting.
//!
//! Loss detection here is a polling heuristic, not a protocol heartbeat:
//! the indicator streams continuously, so "no frame and no error for longer
//! than the silence window" is read as a dead link. Implementers wiring a
//! different transport should size the window accordingly (see
//! [`silence_window`]).

use crate::config::SupervisorCfg;
use crate::protocol::ProtocolKind;
use std::time::{Duration, Instant};
use weigh_traits::Transport;

/// Where a scale's link currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected { port: String, baud: u32 },
    /// Link lost; reconnecting. `attempts` counts failed reconnects so far.
    Degraded { attempts: u32 },
    /// Retries used up. Terminal until a manual `connect`.
    Exhausted,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }
}

/// Saved link parameters; re-applied in full on every reconnect attempt so
/// configuration survives any number of retry cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub port: String,
    pub baud: u32,
    pub protocol: ProtocolKind,
}

/// Silence window sized so that one missed frame or one full blocking read
/// cannot look like link loss.
#[inline]
pub fn silence_window(read_timeout: Duration, poll_period: Duration) -> Duration {
    fast_threshold(read_timeout).max(two_periods(poll_period))
}

/// Quick loss threshold derived from the per-read timeout.
#[inline]
fn fast_threshold(read_timeout: Duration) -> Duration {
    read_timeout.saturating_mul(4)
}

/// At least two poll periods, so a single empty tick never trips.
#[inline]
fn two_periods(poll_period: Duration) -> Duration {
    poll_period.saturating_mul(2)
}

/// Wraps a [`Transport`] with bounded, fixed-backoff reconnection.
pub struct LinkSupervisor<T: Transport> {
    transport: T,
    cfg: SupervisorCfg,
    target: Option<LinkTarget>,
    state: ConnectionState,
    last_frame_at: Option<Instant>,
    next_retry_at: Option<Instant>,
    state_dirty: bool,
}

impl<T: Transport> LinkSupervisor<T> {
    pub fn new(transport: T, cfg: SupervisorCfg) -> Self {
        Self {
            transport,
            cfg,
            target: None,
            state: ConnectionState::Disconnected,
            last_frame_at: None,
            next_retry_at: None,
            // Dirty from the start so the owner pushes an initial status.
            state_dirty: true,
        }
    }

    /// Manual connect. Stores `target` whether or not the attempt succeeds,
    /// so a later retry or reconnect re-applies the same parameters.
    pub fn connect(&mut self, target: LinkTarget, now: Instant) -> crate::error::Result<()> {
        match self.transport.connect(&target.port, target.baud) {
            Ok(()) => {
                self.set_state(ConnectionState::Connected {
                    port: target.port.clone(),
                    baud: target.baud,
                });
                self.last_frame_at = Some(now);
                self.next_retry_at = None;
                self.target = Some(target);
                Ok(())
            }
            Err(e) => {
                let mapped = crate::link_error::map_link_error(&*e);
                self.target = Some(target);
                self.set_state(ConnectionState::Disconnected);
                Err(eyre::Report::new(mapped))
            }
        }
    }

    /// Manual disconnect. Releases the transport handle immediately.
    pub fn disconnect(&mut self) {
        self.transport.disconnect();
        self.last_frame_at = None;
        self.next_retry_at = None;
        self.set_state(ConnectionState::Disconnected);
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn target(&self) -> Option<&LinkTarget> {
        self.target.as_ref()
    }

    /// State if it changed since the last call; consumes the change flag.
    pub fn take_state_change(&mut self) -> Option<ConnectionState> {
        if self.state_dirty {
            self.state_dirty = false;
            Some(self.state.clone())
        } else {
            None
        }
    }

    /// One poll step: pull a frame when connected, drive the retry schedule
    /// when degraded, do nothing when disconnected or exhausted.
    pub fn poll_frame(&mut self, now: Instant) -> Option<String> {
        match self.state {
            ConnectionState::Connected { .. } => self.poll_connected(now),
            ConnectionState::Degraded { .. } => {
                self.maybe_retry(now);
                None
            }
            ConnectionState::Disconnected | ConnectionState::Exhausted => None,
        }
    }

    fn poll_connected(&mut self, now: Instant) -> Option<String> {
        match self.transport.try_read_line() {
            Ok(Some(line)) => {
                self.last_frame_at = Some(now);
                Some(line)
            }
            Ok(None) => {
                if let Some(last) = self.last_frame_at {
                    let silent = now.saturating_duration_since(last);
                    if silent > self.cfg.silence_timeout {
                        tracing::warn!(
                            silent_ms = silent.as_millis() as u64,
                            "read silence, treating link as lost"
                        );
                        self.degrade(now);
                    }
                }
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "link read failed");
                self.degrade(now);
                None
            }
        }
    }

    fn degrade(&mut self, now: Instant) {
        self.transport.disconnect();
        self.set_state(ConnectionState::Degraded { attempts: 0 });
        self.next_retry_at = Some(now + self.cfg.retry_delay);
    }

    fn maybe_retry(&mut self, now: Instant) {
        let due = matches!(self.next_retry_at, Some(at) if now >= at);
        if !due {
            return;
        }
        let attempts = match &self.state {
            ConnectionState::Degraded { attempts } => *attempts,
            _ => return,
        };
        let Some(target) = self.target.clone() else {
            self.set_state(ConnectionState::Disconnected);
            return;
        };
        tracing::info!(
            port = %target.port,
            baud = target.baud,
            attempt = attempts + 1,
            "reconnecting"
        );
        match self.transport.connect(&target.port, target.baud) {
            Ok(()) => {
                self.set_state(ConnectionState::Connected {
                    port: target.port.clone(),
                    baud: target.baud,
                });
                self.last_frame_at = Some(now);
                self.next_retry_at = None;
            }
            Err(e) => {
                let attempts = attempts + 1;
                if attempts >= self.cfg.max_retries {
                    tracing::error!(error = %e, attempts, "link retries used up");
                    self.transport.disconnect();
                    self.next_retry_at = None;
                    self.set_state(ConnectionState::Exhausted);
                } else {
                    tracing::warn!(error = %e, attempts, "reconnect failed, will retry");
                    self.next_retry_at = Some(now + self.cfg.retry_delay);
                    self.set_state(ConnectionState::Degraded { attempts });
                }
            }
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            self.state = state;
            self.state_dirty = true;
        }
    }
}

#[cfg(test)]
mod threshold_tests {
    use super::*;

    #[test]
    fn fast_threshold_scales_by_four() {
        assert_eq!(fast_threshold(Duration::ZERO), Duration::ZERO);
        assert_eq!(
            fast_threshold(Duration::from_millis(150)),
            Duration::from_millis(600)
        );
    }

    #[test]
    fn two_periods_is_double_period() {
        assert_eq!(
            two_periods(Duration::from_millis(50)),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn window_takes_the_larger_bound() {
        // fast=4s dominates two periods of 50ms
        assert_eq!(
            silence_window(Duration::from_secs(1), Duration::from_millis(50)),
            Duration::from_secs(4)
        );
        // two periods dominate a tiny read timeout
        assert_eq!(
            silence_window(Duration::from_millis(10), Duration::from_millis(500)),
            Duration::from_secs(1)
        );
    }
}
