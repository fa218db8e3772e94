pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use std::time::SystemTime;

/// One completed weighing, ready for persistence.
///
/// Free-form fields default to `"-"`; callers fill them in when the
/// operator supplied real values.
#[derive(Debug, Clone, PartialEq)]
pub struct WeighingRecord {
    pub recorded_at: SystemTime,
    pub weight_kg: f64,
    pub operator: String,
    pub mode: WeighingMode,
    pub cargo_name: String,
    pub sender: String,
    pub recipient: String,
    pub comment: String,
    pub scale_name: String,
}

impl WeighingRecord {
    /// A record with placeholder metadata, as produced by auto-capture.
    pub fn automatic(weight_kg: f64, operator: &str, scale_name: &str) -> Self {
        Self {
            recorded_at: SystemTime::now(),
            weight_kg,
            operator: operator.to_string(),
            mode: WeighingMode::Automatic,
            cargo_name: "-".to_string(),
            sender: "-".to_string(),
            recipient: "-".to_string(),
            comment: "-".to_string(),
            scale_name: scale_name.to_string(),
        }
    }
}

/// How a weighing was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeighingMode {
    Automatic,
    Manual,
}

impl WeighingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeighingMode::Automatic => "Automatic",
            WeighingMode::Manual => "Manual",
        }
    }
}

/// A line-oriented serial link to a scale indicator.
///
/// Implementations own the OS handle. `try_read_line` must return promptly
/// whether or not a full line is available; any per-read wait is bounded by
/// the implementation's read timeout.
pub trait Transport {
    fn connect(
        &mut self,
        port: &str,
        baud: u32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    fn disconnect(&mut self);

    /// Next complete line from the device, stripped of terminators, or
    /// `Ok(None)` when no full line is buffered yet.
    fn try_read_line(&mut self)
    -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;

    fn is_open(&self) -> bool;
}

/// Persistence collaborator. The core writes records and never reads back.
pub trait WeighingStore {
    fn record_weighing(
        &mut self,
        record: &WeighingRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Display collaborator; push-only, rendering is out of the core's sight.
pub trait DisplaySink {
    fn on_weight_sample(&mut self, kg: f64);
    fn on_connection_status(&mut self, connected: bool, port: Option<&str>, baud: Option<u32>);
}
