//! Auto-capture decision engine.
//!
//! Consumes validated weight samples and decides when one real, completed
//! weighing has occurred. All state lives in an explicit struct advanced by
//! a single synchronous method; there are no timers or callbacks in here.

use crate::config::CaptureCfg;
use std::time::{Duration, Instant};

/// Settle-window bounds; out-of-range values are clamped, never rejected.
pub const MIN_SETTLE: Duration = Duration::from_secs(1);
pub const MAX_SETTLE: Duration = Duration::from_secs(30);

/// A settled weight that should be persisted as one weighing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureDecision {
    pub weight_kg: f64,
    pub at: Instant,
}

/// Per-scale capture state machine.
///
/// A capture fires when a non-zero weight holds unchanged for the settle
/// window, and only if the platform has read exactly zero since the last
/// save. That zero-crossing rule is the sole duplicate-save guard and it
/// is deliberately coarse: a second load stacked on top of the first,
/// without the reading ever returning to zero, will not re-trigger.
#[derive(Debug)]
pub struct AutoCapture {
    cfg: CaptureCfg,
    last_weight: Option<f64>,
    last_weight_at: Option<Instant>,
    stable_for: Duration,
    weight_was_zero: bool,
    last_saved: Option<f64>,
}

impl AutoCapture {
    pub fn new(cfg: CaptureCfg) -> Self {
        let cfg = CaptureCfg {
            settle: cfg.settle.clamp(MIN_SETTLE, MAX_SETTLE),
            ..cfg
        };
        Self {
            cfg,
            last_weight: None,
            last_weight_at: None,
            stable_for: Duration::ZERO,
            weight_was_zero: true,
            last_saved: None,
        }
    }

    /// Change the settle window, clamped to `[MIN_SETTLE, MAX_SETTLE]`.
    pub fn set_settle(&mut self, settle: Duration) {
        self.cfg.settle = settle.clamp(MIN_SETTLE, MAX_SETTLE);
    }

    pub fn settle(&self) -> Duration {
        self.cfg.settle
    }

    /// Feed one sample; returns a decision at most once per
    /// zero-to-settled-nonzero cycle.
    pub fn process_sample(&mut self, kg: f64, now: Instant) -> Option<CaptureDecision> {
        if !kg.is_finite() || kg < 0.0 {
            return None;
        }

        // Exactly zero always re-arms, even though it sits below the noise
        // floor: it is the unload signal, not a weighing.
        if kg == 0.0 {
            self.weight_was_zero = true;
            self.clear_tracking();
            return None;
        }

        // Noise floor and sensor-fault ceiling. Rejection leaves all state
        // untouched, including the armed flag.
        if kg < self.cfg.min_weight_kg || kg > self.cfg.max_weight_kg {
            return None;
        }

        // Not unloaded since the last save: ignore until a zero is seen.
        if !self.weight_was_zero && self.last_saved.is_some() {
            return None;
        }

        // Exact comparison on purpose: indicators quantize their output, so
        // any real fluctuation shows up as a digit change.
        if self.last_weight != Some(kg) {
            self.last_weight = Some(kg);
            self.last_weight_at = Some(now);
            self.stable_for = Duration::ZERO;
        } else if let Some(at) = self.last_weight_at {
            self.stable_for = now.saturating_duration_since(at);
        }

        if self.stable_for >= self.cfg.settle && self.weight_was_zero {
            self.last_saved = Some(kg);
            self.weight_was_zero = false;
            tracing::debug!(weight_kg = kg, "weight settled, capture decided");
            return Some(CaptureDecision { weight_kg: kg, at: now });
        }
        None
    }

    /// Re-arm and drop weight/time tracking. Called on manual save and on
    /// disconnect; the last saved weight is kept.
    pub fn reset(&mut self) {
        self.weight_was_zero = true;
        self.clear_tracking();
    }

    /// Record a manual save, then re-arm (the manual flow saves whatever is
    /// on the platform and starts a fresh cycle).
    pub fn note_manual_save(&mut self, kg: f64) {
        self.last_saved = Some(kg);
        self.reset();
    }

    /// Whether a zero has been seen since the last save.
    pub fn armed(&self) -> bool {
        self.weight_was_zero
    }

    pub fn last_saved(&self) -> Option<f64> {
        self.last_saved
    }

    pub fn stable_for(&self) -> Duration {
        self.stable_for
    }

    fn clear_tracking(&mut self) {
        self.last_weight = None;
        self.last_weight_at = None;
        self.stable_for = Duration::ZERO;
    }
}

impl Default for AutoCapture {
    fn default() -> Self {
        Self::new(CaptureCfg::default())
    }
}

#[cfg(test)]
mod settle_clamp_tests {
    use super::*;

    #[test]
    fn construction_clamps_both_ends() {
        let low = AutoCapture::new(CaptureCfg {
            settle: Duration::from_millis(10),
            ..CaptureCfg::default()
        });
        assert_eq!(low.settle(), MIN_SETTLE);

        let high = AutoCapture::new(CaptureCfg {
            settle: Duration::from_secs(900),
            ..CaptureCfg::default()
        });
        assert_eq!(high.settle(), MAX_SETTLE);
    }

    #[test]
    fn set_settle_clamps_too() {
        let mut engine = AutoCapture::default();
        engine.set_settle(Duration::ZERO);
        assert_eq!(engine.settle(), MIN_SETTLE);
        engine.set_settle(Duration::from_secs(5));
        assert_eq!(engine.settle(), Duration::from_secs(5));
    }
}
