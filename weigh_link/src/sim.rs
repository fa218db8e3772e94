//! Deterministic scale indicator for demos and CI.

use crate::error::LinkError;
use std::time::{Duration, Instant};
use weigh_traits::Transport;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

// One load cycle: empty platform, load arriving, load at rest, unloaded.
const ZERO_FRAMES: u32 = 10;
const RAMP_FRAMES: u32 = 5;
const HOLD_FRAMES: u32 = 45;
const CYCLE_FRAMES: u32 = ZERO_FRAMES + RAMP_FRAMES + HOLD_FRAMES;

/// Emits a repeating zero → ramp → hold cycle in the legacy `ww…kg` framing,
/// paced like a real ~10 Hz indicator.
#[derive(Debug)]
pub struct SimulatedIndicator {
    plateau_kg: f64,
    emit_period: Duration,
    step: u32,
    last_emit: Option<Instant>,
    open: bool,
}

impl SimulatedIndicator {
    pub fn new(plateau_kg: f64) -> Self {
        Self::with_period(plateau_kg, Duration::from_millis(100))
    }

    /// `emit_period` of zero produces a frame on every poll (tests).
    pub fn with_period(plateau_kg: f64, emit_period: Duration) -> Self {
        Self {
            plateau_kg,
            emit_period,
            step: 0,
            last_emit: None,
            open: false,
        }
    }

    fn frame_weight(&self, step: u32) -> f64 {
        let phase = step % CYCLE_FRAMES;
        if phase < ZERO_FRAMES {
            0.0
        } else if phase < ZERO_FRAMES + RAMP_FRAMES {
            let progress = f64::from(phase - ZERO_FRAMES + 1);
            let ramped = self.plateau_kg * progress / f64::from(RAMP_FRAMES + 1);
            (ramped * 100.0).round() / 100.0
        } else {
            self.plateau_kg
        }
    }
}

impl Transport for SimulatedIndicator {
    fn connect(&mut self, port: &str, baud: u32) -> Result<(), BoxError> {
        tracing::info!(port, baud, "simulated indicator attached");
        self.open = true;
        self.step = 0;
        self.last_emit = None;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.open = false;
    }

    fn try_read_line(&mut self) -> Result<Option<String>, BoxError> {
        if !self.open {
            return Err(Box::new(LinkError::NotOpen));
        }
        let now = Instant::now();
        if let Some(last) = self.last_emit
            && now.saturating_duration_since(last) < self.emit_period
        {
            return Ok(None);
        }
        self.last_emit = Some(now);
        let kg = self.frame_weight(self.step);
        self.step = self.step.wrapping_add(1);
        Ok(Some(format!("ww{kg:08.2}kg")))
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
