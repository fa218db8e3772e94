//! `From` implementations bridging `weigh_config` schemas to runtime types.
//!
//! These eliminate manual field-by-field mapping in the CLI.

use crate::config::{CaptureCfg, PollCfg, SupervisorCfg};
use crate::supervisor::{LinkTarget, silence_window};
use std::time::Duration;

// ── CaptureCfg ───────────────────────────────────────────────────────────────

impl From<&weigh_config::CaptureCfg> for CaptureCfg {
    fn from(c: &weigh_config::CaptureCfg) -> Self {
        Self {
            min_weight_kg: c.min_weight_kg,
            max_weight_kg: c.max_weight_kg,
            settle: Duration::from_secs(c.settle_secs),
        }
    }
}

// ── PollCfg ──────────────────────────────────────────────────────────────────

impl From<&weigh_config::PollCfg> for PollCfg {
    fn from(c: &weigh_config::PollCfg) -> Self {
        Self {
            period: Duration::from_millis(c.period_ms),
            display_min_gap: Duration::from_millis(c.display_min_gap_ms),
            engine_min_gap: Duration::from_millis(c.engine_min_gap_ms),
            max_frames_per_tick: c.max_frames_per_tick,
        }
    }
}

// ── SupervisorCfg ────────────────────────────────────────────────────────────

// Needs the whole config: a silence_timeout_ms of 0 means "derive from the
// read timeout and poll period".
impl From<&weigh_config::Config> for SupervisorCfg {
    fn from(c: &weigh_config::Config) -> Self {
        let silence_timeout = if c.supervisor.silence_timeout_ms == 0 {
            silence_window(
                Duration::from_millis(c.link.read_timeout_ms),
                Duration::from_millis(c.poll.period_ms),
            )
        } else {
            Duration::from_millis(c.supervisor.silence_timeout_ms)
        };
        Self {
            max_retries: c.supervisor.max_retries,
            retry_delay: Duration::from_millis(c.supervisor.retry_delay_ms),
            silence_timeout,
        }
    }
}

// ── LinkTarget ───────────────────────────────────────────────────────────────

impl From<&weigh_config::ScaleCfg> for LinkTarget {
    fn from(c: &weigh_config::ScaleCfg) -> Self {
        Self {
            port: c.port.clone(),
            baud: c.baud,
            protocol: c.protocol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_silence_config_derives_the_window() {
        let cfg = weigh_config::load_toml("").unwrap();
        let sup: SupervisorCfg = (&cfg).into();
        // 4 x 1000ms read timeout beats 2 x 50ms poll period.
        assert_eq!(sup.silence_timeout, Duration::from_secs(4));
    }

    #[test]
    fn explicit_silence_config_is_taken_verbatim() {
        let cfg = weigh_config::load_toml("[supervisor]\nsilence_timeout_ms = 1500\n").unwrap();
        let sup: SupervisorCfg = (&cfg).into();
        assert_eq!(sup.silence_timeout, Duration::from_millis(1500));
    }
}
