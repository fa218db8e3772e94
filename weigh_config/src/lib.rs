#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and the link roster for the weighing station.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The roster CSV loader enforces headers and yields per-operator
//!   `(port, baud, protocol)` link entries, one row per saved configuration.

use serde::Deserialize;
use serde::de::{self, Deserializer};

/// Wire protocol a scale indicator uses to embed a weight in a frame.
///
/// Selected per physical scale by the operator; never inferred from traffic.
/// Accepts the numeric encoding used by older rosters (1, 2) as well as
/// names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolKind {
    /// `ww<digits>[.<digits>]kg` with optional whitespace between tokens.
    #[default]
    LegacyPrefixed,
    /// `<status>,GS,[sign]<digits>[.<digits>]kg`, e.g. `ST,GS,+000005kg`.
    StGsTagged,
}

impl ProtocolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolKind::LegacyPrefixed => "legacy",
            ProtocolKind::StGsTagged => "stgs",
        }
    }
}

impl std::fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProtocolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "legacy" | "legacy_prefixed" | "legacyprefixed" | "ww" => {
                Ok(ProtocolKind::LegacyPrefixed)
            }
            "2" | "stgs" | "st_gs" | "st-gs" | "st_gs_tagged" | "stgstagged" => {
                Ok(ProtocolKind::StGsTagged)
            }
            other => Err(format!(
                "unknown protocol '{other}' (expected 1, 2, 'legacy' or 'stgs')"
            )),
        }
    }
}

// Accept either the numeric roster encoding or a name.
impl<'de> Deserialize<'de> for ProtocolKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(1) => Ok(ProtocolKind::LegacyPrefixed),
            Raw::Number(2) => Ok(ProtocolKind::StGsTagged),
            Raw::Number(n) => Err(de::Error::custom(format!(
                "unknown protocol number {n} (expected 1 or 2)"
            ))),
            Raw::Name(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

/// One configured physical scale.
#[derive(Debug, Deserialize, Clone)]
pub struct ScaleCfg {
    /// Display name, also stamped into persisted weighings.
    pub name: String,
    /// OS serial device identifier, e.g. `COM3` or `/dev/ttyUSB0`.
    pub port: String,
    pub baud: u32,
    #[serde(default)]
    pub protocol: ProtocolKind,
}

/// Auto-capture thresholds and settle window.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct CaptureCfg {
    /// Noise floor; samples below this (other than exactly zero) are ignored.
    pub min_weight_kg: f64,
    /// Sensor-fault ceiling; samples above this are ignored.
    pub max_weight_kg: f64,
    /// Seconds a weight must hold unchanged before capture.
    /// Out-of-range values are clamped to 1..=30 downstream, never rejected.
    pub settle_secs: u64,
}

impl Default for CaptureCfg {
    fn default() -> Self {
        Self {
            min_weight_kg: 0.1,
            max_weight_kg: 100_000.0,
            settle_secs: 3,
        }
    }
}

/// Serial transport knobs.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct LinkCfg {
    /// Upper bound on a single blocking read inside the transport (ms).
    pub read_timeout_ms: u64,
}

impl Default for LinkCfg {
    fn default() -> Self {
        Self {
            read_timeout_ms: 1000,
        }
    }
}

/// Reconnection policy.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SupervisorCfg {
    /// Consecutive failed reconnects before the link is declared dead.
    pub max_retries: u32,
    /// Fixed delay between reconnect attempts (ms).
    pub retry_delay_ms: u64,
    /// Read-silence window treated as connection loss (ms).
    /// 0 derives the window from the read timeout and poll period.
    pub silence_timeout_ms: u64,
}

impl Default for SupervisorCfg {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 2000,
            silence_timeout_ms: 0,
        }
    }
}

/// Poll-loop cadence and rate limits.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct PollCfg {
    /// Tick period per scale worker (ms).
    pub period_ms: u64,
    /// Minimum gap between display pushes (ms).
    pub display_min_gap_ms: u64,
    /// Minimum gap between samples fed to the capture engine (ms).
    pub engine_min_gap_ms: u64,
    /// Frames drained from the link per tick, at most.
    pub max_frames_per_tick: u32,
}

impl Default for PollCfg {
    fn default() -> Self {
        Self {
            period_ms: 50,
            display_min_gap_ms: 100,
            engine_min_gap_ms: 100,
            max_frames_per_tick: 8,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct JournalCfg {
    /// Path of the JSONL weighing journal.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Physical scales, one worker each.
    #[serde(default)]
    pub scales: Vec<ScaleCfg>,
    #[serde(default)]
    pub capture: CaptureCfg,
    #[serde(default)]
    pub link: LinkCfg,
    #[serde(default)]
    pub supervisor: SupervisorCfg,
    #[serde(default)]
    pub poll: PollCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub journal: JournalCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        for (idx, scale) in self.scales.iter().enumerate() {
            if scale.name.trim().is_empty() {
                eyre::bail!("scales[{idx}].name must not be empty");
            }
            if scale.port.trim().is_empty() {
                eyre::bail!("scales[{idx}].port must not be empty");
            }
            if scale.baud == 0 {
                eyre::bail!("scales[{idx}].baud must be > 0");
            }
        }

        // Capture. settle_secs is intentionally unchecked: the engine clamps.
        if !self.capture.min_weight_kg.is_finite() || self.capture.min_weight_kg < 0.0 {
            eyre::bail!("capture.min_weight_kg must be finite and >= 0");
        }
        if !self.capture.max_weight_kg.is_finite()
            || self.capture.max_weight_kg <= self.capture.min_weight_kg
        {
            eyre::bail!("capture.max_weight_kg must be finite and > capture.min_weight_kg");
        }

        // Link
        if self.link.read_timeout_ms == 0 {
            eyre::bail!("link.read_timeout_ms must be >= 1");
        }
        if self.link.read_timeout_ms > 10_000 {
            eyre::bail!("link.read_timeout_ms is unreasonably large (>10s)");
        }

        // Supervisor
        if self.supervisor.max_retries == 0 {
            eyre::bail!("supervisor.max_retries must be >= 1");
        }
        if self.supervisor.retry_delay_ms == 0 {
            eyre::bail!("supervisor.retry_delay_ms must be >= 1");
        }

        // Poll
        if self.poll.period_ms == 0 {
            eyre::bail!("poll.period_ms must be >= 1");
        }
        if self.poll.period_ms > 1000 {
            eyre::bail!("poll.period_ms is unreasonably large (>1s)");
        }
        if self.poll.max_frames_per_tick == 0 {
            eyre::bail!("poll.max_frames_per_tick must be >= 1");
        }

        Ok(())
    }
}

/// Roster CSV schema.
///
/// Expected headers:
/// operator,name,port,baud,protocol
///
/// Example:
/// operator,name,port,baud,protocol
/// petrov,Main gate,COM3,9600,1
/// petrov,Warehouse,COM7,19200,stgs
#[derive(Debug, Deserialize, Clone)]
pub struct RosterEntry {
    pub operator: String,
    pub name: String,
    pub port: String,
    pub baud: u32,
    pub protocol: ProtocolKind,
}

pub fn load_roster_csv(path: &std::path::Path) -> eyre::Result<Vec<RosterEntry>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open roster CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["operator", "name", "port", "baud", "protocol"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "roster CSV must have headers 'operator,name,port,baud,protocol', got: {}",
            actual.join(",")
        );
    }

    let mut entries = Vec::new();
    for (idx, rec) in rdr.deserialize::<RosterEntry>().enumerate() {
        match rec {
            Ok(entry) => {
                if entry.baud == 0 {
                    eyre::bail!("invalid CSV row {}: baud must be > 0", idx + 2);
                }
                entries.push(entry);
            }
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    Ok(entries)
}
