#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core auto-weighing logic (transport-agnostic).
//!
//! This crate turns raw serial frames from an industrial scale indicator
//! into at most one persisted weighing per physical load. All hardware
//! interaction goes through `weigh_traits::Transport`; persistence and
//! display go through `weigh_traits::WeighingStore` / `DisplaySink`.
//!
//! ## Architecture
//!
//! - **Decoding**: protocol-selected frame parsing (`protocol` module)
//! - **Capture**: zero-crossing settle state machine (`engine`)
//! - **Supervision**: bounded fixed-backoff reconnection (`supervisor`)
//! - **Orchestration**: bounded poll ticks, throttles, persistence
//!   call-out (`coordinator`)
//! - **Workers**: one thread per scale, event channel out (`runner`)
//!
//! Weights are `f64` kilograms exactly as decoded; the engine's stability
//! comparison is exact equality, matching the quantized output of real
//! indicators.

pub mod config;
pub mod conversions;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod link_error;
pub mod mocks;
pub mod protocol;
pub mod runner;
pub mod supervisor;

pub use config::{CaptureCfg, ConfigStore, PollCfg, RosterConfigStore, SupervisorCfg, resolve_link};
pub use coordinator::{CoordinatorBuilder, ManualFields, ScaleCoordinator, TickOutcome};
pub use engine::{AutoCapture, CaptureDecision};
pub use error::{BuildError, CoreError};
pub use protocol::{ProtocolKind, parse_frame};
pub use runner::{ChannelSink, ScaleEvent, ScaleWorker, event_channel};
pub use supervisor::{ConnectionState, LinkSupervisor, LinkTarget, silence_window};
