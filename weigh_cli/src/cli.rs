//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "weigh", version, about = "Scale station CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/weigh.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Wire protocol selector for `decode`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ProtocolArg {
    /// `ww<digits>[.<digits>]kg`
    Legacy,
    /// `ST,GS,+000005kg` status-tagged framing
    Stgs,
}

impl From<ProtocolArg> for weigh_core::ProtocolKind {
    fn from(p: ProtocolArg) -> Self {
        match p {
            ProtocolArg::Legacy => weigh_core::ProtocolKind::LegacyPrefixed,
            ProtocolArg::Stgs => weigh_core::ProtocolKind::StGsTagged,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch configured scales and record settled weighings automatically
    Watch {
        /// Operator name stamped into every recorded weighing
        #[arg(long)]
        operator: String,

        /// Run against a built-in simulated indicator instead of hardware
        #[arg(long, action = ArgAction::SetTrue)]
        simulate: bool,

        /// Plateau weight of the simulated indicator, in kg
        #[arg(long, value_name = "KG", default_value_t = 12.5)]
        simulate_kg: f64,

        /// Resolve the link from a roster CSV instead of [[scales]]
        #[arg(long, value_name = "FILE", conflicts_with = "simulate")]
        roster: Option<PathBuf>,

        /// Saved configuration name to look up in the roster
        #[arg(long, value_name = "NAME", requires = "roster")]
        link_name: Option<String>,

        /// Override the settle window in seconds (clamped to 1..=30)
        #[arg(long, value_name = "SECS")]
        settle_secs: Option<u64>,

        /// Override the journal path from the config
        #[arg(long, value_name = "FILE")]
        journal: Option<PathBuf>,

        /// Exit after this many milliseconds (0 = run until Ctrl-C)
        #[arg(long, value_name = "MS", default_value_t = 0)]
        duration_ms: u64,
    },

    /// List serial devices present on this machine
    Ports,

    /// Decode a single frame and print the weight in kg
    Decode {
        /// Wire protocol to decode with
        #[arg(long, value_enum, default_value = "legacy")]
        protocol: ProtocolArg,

        /// Raw frame text, terminators already stripped
        frame: String,
    },
}
