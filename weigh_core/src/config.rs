//! Runtime configuration types for the weighing core.
//!
//! These are the structs the engine, supervisor, and coordinator actually
//! run on. They are separate from the TOML-deserialized schema in
//! `weigh_config`; `crate::conversions` bridges the two.

use crate::error::CoreError;
use crate::supervisor::LinkTarget;
use std::time::Duration;

/// Auto-capture thresholds and settle window.
#[derive(Debug, Clone, Copy)]
pub struct CaptureCfg {
    /// Noise floor (kg); non-zero samples below it are ignored.
    pub min_weight_kg: f64,
    /// Sensor-fault ceiling (kg); samples above it are ignored.
    pub max_weight_kg: f64,
    /// How long a weight must hold unchanged before capture.
    /// Clamped by the engine to 1..=30 s.
    pub settle: Duration,
}

impl Default for CaptureCfg {
    fn default() -> Self {
        Self {
            min_weight_kg: 0.1,
            max_weight_kg: 100_000.0,
            settle: Duration::from_secs(3),
        }
    }
}

/// Reconnection policy.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorCfg {
    /// Consecutive failed reconnects before the link is declared dead.
    pub max_retries: u32,
    /// Fixed delay between reconnect attempts.
    pub retry_delay: Duration,
    /// Read-silence window treated as link loss.
    pub silence_timeout: Duration,
}

impl Default for SupervisorCfg {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            // 4x the default 1 s transport read timeout.
            silence_timeout: Duration::from_secs(4),
        }
    }
}

/// Poll-loop cadence and rate limits.
#[derive(Debug, Clone, Copy)]
pub struct PollCfg {
    /// Tick period of the per-scale worker.
    pub period: Duration,
    /// Minimum gap between display pushes.
    pub display_min_gap: Duration,
    /// Minimum gap between samples fed to the capture engine.
    pub engine_min_gap: Duration,
    /// Frames drained from the link per tick, at most. Bounds tick work so
    /// a chatty device cannot starve sibling scales.
    pub max_frames_per_tick: u32,
}

impl Default for PollCfg {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(50),
            display_min_gap: Duration::from_millis(100),
            engine_min_gap: Duration::from_millis(100),
            max_frames_per_tick: 8,
        }
    }
}

/// Read-only lookup of saved link parameters, consulted at connect time.
pub trait ConfigStore {
    fn scale_link(&self, operator: &str, name: &str) -> Option<LinkTarget>;
}

/// `ConfigStore` over the roster rows loaded by `weigh_config`.
pub struct RosterConfigStore {
    entries: Vec<weigh_config::RosterEntry>,
}

impl RosterConfigStore {
    pub fn new(entries: Vec<weigh_config::RosterEntry>) -> Self {
        Self { entries }
    }

    pub fn load(path: &std::path::Path) -> eyre::Result<Self> {
        Ok(Self::new(weigh_config::load_roster_csv(path)?))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ConfigStore for RosterConfigStore {
    fn scale_link(&self, operator: &str, name: &str) -> Option<LinkTarget> {
        self.entries
            .iter()
            .find(|e| e.operator == operator && e.name == name)
            .map(|e| LinkTarget {
                port: e.port.clone(),
                baud: e.baud,
                protocol: e.protocol,
            })
    }
}

/// Look up a saved configuration, or fail with the typed error that aborts
/// a connect attempt.
pub fn resolve_link(
    store: &dyn ConfigStore,
    operator: &str,
    name: &str,
) -> crate::error::Result<LinkTarget> {
    store.scale_link(operator, name).ok_or_else(|| {
        eyre::Report::new(CoreError::ConfigNotFound {
            operator: operator.to_string(),
            name: name.to_string(),
        })
    })
}
