//! Orchestration: one coordinator per physical scale.
//!
//! The coordinator is the only component that touches collaborators. On
//! each tick it drains a bounded number of frames from the supervised link,
//! decodes them, forwards live samples to the display sink, feeds the
//! capture engine on its own rate limit, and turns each capture decision
//! into exactly one persistence call.

use crate::config::{CaptureCfg, PollCfg, SupervisorCfg};
use crate::engine::{AutoCapture, CaptureDecision};
use crate::error::{BuildError, CoreError};
use crate::protocol::{ProtocolKind, parse_frame};
use crate::supervisor::{ConnectionState, LinkSupervisor, LinkTarget, silence_window};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use weigh_traits::{Clock, DisplaySink, MonotonicClock, Transport, WeighingMode, WeighingRecord, WeighingStore};

/// Default transport read timeout assumed when deriving the silence window
/// at build time.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// What one poll tick amounted to.
#[derive(Debug)]
pub enum TickOutcome {
    /// No complete frame was available.
    Idle,
    /// Samples decoded and forwarded; nothing settled.
    Sampled,
    /// A settled weight was persisted.
    Recorded(WeighingRecord),
    /// A capture fired but the store rejected it; reported, not retried.
    StoreFailed(String),
    /// Retries used up; the link needs manual attention.
    LinkDown,
}

/// Operator-supplied metadata for a manual weighing.
#[derive(Debug, Clone)]
pub struct ManualFields {
    pub cargo_name: String,
    pub sender: String,
    pub recipient: String,
    pub comment: String,
}

impl Default for ManualFields {
    fn default() -> Self {
        Self {
            cargo_name: "-".to_string(),
            sender: "-".to_string(),
            recipient: "-".to_string(),
            comment: "-".to_string(),
        }
    }
}

pub struct ScaleCoordinator<T: Transport> {
    supervisor: LinkSupervisor<T>,
    engine: AutoCapture,
    protocol: ProtocolKind,
    store: Box<dyn WeighingStore + Send>,
    display: Box<dyn DisplaySink + Send>,
    on_recorded: Option<Box<dyn FnMut() + Send>>,
    clock: Arc<dyn Clock + Send + Sync>,
    poll: PollCfg,
    operator: String,
    scale_name: String,
    last_display_at: Option<Instant>,
    last_engine_at: Option<Instant>,
}

impl<T: Transport> std::fmt::Debug for ScaleCoordinator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScaleCoordinator")
            .field("scale_name", &self.scale_name)
            .field("operator", &self.operator)
            .field("protocol", &self.protocol)
            .field("state", self.supervisor.state())
            .finish()
    }
}

impl<T: Transport> ScaleCoordinator<T> {
    /// Start building a coordinator around `transport`.
    pub fn builder(transport: T) -> CoordinatorBuilder<T, Missing, Missing> {
        CoordinatorBuilder::new(transport)
    }

    /// Open the link described by `target` and adopt its protocol.
    pub fn connect(&mut self, target: LinkTarget) -> crate::error::Result<()> {
        self.protocol = target.protocol;
        let now = self.clock.now();
        self.supervisor.connect(target, now)
    }

    /// Stop polling this scale: release the transport, re-arm the engine,
    /// and drop in-flight tracking so nothing fires after disconnect.
    pub fn disconnect(&mut self) {
        self.supervisor.disconnect();
        self.engine.reset();
        self.last_display_at = None;
        self.last_engine_at = None;
        self.flush_status();
    }

    pub fn state(&self) -> &ConnectionState {
        self.supervisor.state()
    }

    pub fn protocol(&self) -> ProtocolKind {
        self.protocol
    }

    pub fn scale_name(&self) -> &str {
        &self.scale_name
    }

    /// Change the settle window (clamped by the engine).
    pub fn set_settle(&mut self, settle: Duration) {
        self.engine.set_settle(settle);
    }

    /// One bounded poll cycle. Never blocks beyond the transport's read
    /// timeout and never propagates a persistence failure as a panic or a
    /// retry.
    pub fn tick(&mut self) -> TickOutcome {
        let now = self.clock.now();
        let mut outcome = TickOutcome::Idle;
        let mut frames = 0u32;
        while frames < self.poll.max_frames_per_tick {
            let Some(line) = self.supervisor.poll_frame(now) else {
                break;
            };
            frames += 1;
            // An undecodable frame is expected continuous noise, not a fault.
            let Some(kg) = parse_frame(&line, self.protocol) else {
                tracing::trace!(frame = %line, "frame dropped");
                continue;
            };
            if matches!(outcome, TickOutcome::Idle) {
                outcome = TickOutcome::Sampled;
            }
            if self.display_due(now) {
                self.display.on_weight_sample(kg);
            }
            if self.engine_due(now)
                && let Some(decision) = self.engine.process_sample(kg, now)
            {
                outcome = self.persist_capture(decision);
            }
        }
        if let Some(state) = self.supervisor.take_state_change() {
            self.push_status(&state);
            if state == ConnectionState::Exhausted {
                outcome = TickOutcome::LinkDown;
            }
        }
        outcome
    }

    /// Persist a weighing the operator entered by hand, then re-arm the
    /// auto-capture cycle exactly as the original manual-save flow did.
    pub fn record_manual(
        &mut self,
        weight_kg: f64,
        fields: ManualFields,
    ) -> crate::error::Result<WeighingRecord> {
        if !weight_kg.is_finite() || weight_kg <= 0.0 {
            return Err(eyre::Report::new(CoreError::State(
                "manual weighing requires a positive weight".to_string(),
            )));
        }
        let record = WeighingRecord {
            recorded_at: SystemTime::now(),
            weight_kg,
            operator: self.operator.clone(),
            mode: WeighingMode::Manual,
            cargo_name: fields.cargo_name,
            sender: fields.sender,
            recipient: fields.recipient,
            comment: fields.comment,
            scale_name: self.scale_name.clone(),
        };
        self.store
            .record_weighing(&record)
            .map_err(|e| eyre::Report::new(CoreError::Storage(e.to_string())))?;
        self.engine.note_manual_save(weight_kg);
        if let Some(cb) = &mut self.on_recorded {
            cb();
        }
        Ok(record)
    }

    fn persist_capture(&mut self, decision: CaptureDecision) -> TickOutcome {
        let record =
            WeighingRecord::automatic(decision.weight_kg, &self.operator, &self.scale_name);
        match self.store.record_weighing(&record) {
            Ok(()) => {
                tracing::info!(
                    weight_kg = record.weight_kg,
                    scale = %self.scale_name,
                    "weighing recorded"
                );
                if let Some(cb) = &mut self.on_recorded {
                    cb();
                }
                TickOutcome::Recorded(record)
            }
            Err(e) => {
                // The engine latched this weight before the store was
                // called, so a failing store cannot start a capture flood.
                tracing::error!(
                    error = %e,
                    weight_kg = record.weight_kg,
                    "weighing not persisted"
                );
                TickOutcome::StoreFailed(e.to_string())
            }
        }
    }

    fn display_due(&mut self, now: Instant) -> bool {
        let due = self
            .last_display_at
            .is_none_or(|t| now.saturating_duration_since(t) >= self.poll.display_min_gap);
        if due {
            self.last_display_at = Some(now);
        }
        due
    }

    fn engine_due(&mut self, now: Instant) -> bool {
        let due = self
            .last_engine_at
            .is_none_or(|t| now.saturating_duration_since(t) >= self.poll.engine_min_gap);
        if due {
            self.last_engine_at = Some(now);
        }
        due
    }

    fn push_status(&mut self, state: &ConnectionState) {
        match state {
            ConnectionState::Connected { port, baud } => {
                self.display.on_connection_status(true, Some(port), Some(*baud));
            }
            _ => self.display.on_connection_status(false, None, None),
        }
    }

    fn flush_status(&mut self) {
        if let Some(state) = self.supervisor.take_state_change() {
            self.push_status(&state);
        }
    }
}

// Type-state markers for the builder
pub struct Missing;
pub struct Set;

/// Builder for [`ScaleCoordinator`]. The transport is supplied up front;
/// store and operator advance the type-state and are required to `build()`.
pub struct CoordinatorBuilder<T, St, Op> {
    transport: T,
    store: Option<Box<dyn WeighingStore + Send>>,
    operator: Option<String>,
    scale_name: Option<String>,
    display: Option<Box<dyn DisplaySink + Send>>,
    on_recorded: Option<Box<dyn FnMut() + Send>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    capture: Option<CaptureCfg>,
    supervisor: Option<SupervisorCfg>,
    poll: Option<PollCfg>,
    protocol: Option<ProtocolKind>,
    _st: PhantomData<St>,
    _op: PhantomData<Op>,
}

impl<T: Transport> CoordinatorBuilder<T, Missing, Missing> {
    fn new(transport: T) -> Self {
        Self {
            transport,
            store: None,
            operator: None,
            scale_name: None,
            display: None,
            on_recorded: None,
            clock: None,
            capture: None,
            supervisor: None,
            poll: None,
            protocol: None,
            _st: PhantomData,
            _op: PhantomData,
        }
    }
}

/// Chainable setters that do not affect type-state
impl<T, St, Op> CoordinatorBuilder<T, St, Op> {
    pub fn with_scale_name(mut self, name: impl Into<String>) -> Self {
        self.scale_name = Some(name.into());
        self
    }
    pub fn with_display(mut self, display: impl DisplaySink + Send + 'static) -> Self {
        self.display = Some(Box::new(display));
        self
    }
    pub fn with_on_recorded<F>(mut self, f: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_recorded = Some(Box::new(f));
        self
    }
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
    pub fn with_capture(mut self, capture: CaptureCfg) -> Self {
        self.capture = Some(capture);
        self
    }
    pub fn with_supervisor(mut self, supervisor: SupervisorCfg) -> Self {
        self.supervisor = Some(supervisor);
        self
    }
    pub fn with_poll(mut self, poll: PollCfg) -> Self {
        self.poll = Some(poll);
        self
    }
    pub fn with_protocol(mut self, protocol: ProtocolKind) -> Self {
        self.protocol = Some(protocol);
        self
    }
}

// Setters that advance type-state when providing mandatory components
impl<T, Op> CoordinatorBuilder<T, Missing, Op> {
    pub fn with_store(
        self,
        store: impl WeighingStore + Send + 'static,
    ) -> CoordinatorBuilder<T, Set, Op> {
        let CoordinatorBuilder {
            transport,
            store: _,
            operator,
            scale_name,
            display,
            on_recorded,
            clock,
            capture,
            supervisor,
            poll,
            protocol,
            _st: _,
            _op: _,
        } = self;
        CoordinatorBuilder {
            transport,
            store: Some(Box::new(store)),
            operator,
            scale_name,
            display,
            on_recorded,
            clock,
            capture,
            supervisor,
            poll,
            protocol,
            _st: PhantomData,
            _op: PhantomData,
        }
    }
}

impl<T, St> CoordinatorBuilder<T, St, Missing> {
    pub fn with_operator(self, operator: impl Into<String>) -> CoordinatorBuilder<T, St, Set> {
        let CoordinatorBuilder {
            transport,
            store,
            operator: _,
            scale_name,
            display,
            on_recorded,
            clock,
            capture,
            supervisor,
            poll,
            protocol,
            _st: _,
            _op: _,
        } = self;
        CoordinatorBuilder {
            transport,
            store,
            operator: Some(operator.into()),
            scale_name,
            display,
            on_recorded,
            clock,
            capture,
            supervisor,
            poll,
            protocol,
            _st: PhantomData,
            _op: PhantomData,
        }
    }
}

impl<T: Transport, St, Op> CoordinatorBuilder<T, St, Op> {
    /// Fallible build available in any type-state; returns detailed
    /// `BuildError` for missing pieces.
    pub fn try_build(self) -> crate::error::Result<ScaleCoordinator<T>> {
        let CoordinatorBuilder {
            transport,
            store,
            operator,
            scale_name,
            display,
            on_recorded,
            clock,
            capture,
            supervisor,
            poll,
            protocol,
            _st: _,
            _op: _,
        } = self;

        let store = store.ok_or_else(|| eyre::Report::new(BuildError::MissingStore))?;
        let operator = operator.ok_or_else(|| eyre::Report::new(BuildError::MissingOperator))?;
        if operator.trim().is_empty() {
            return Err(eyre::Report::new(BuildError::MissingOperator));
        }

        let capture = capture.unwrap_or_default();
        let mut supervisor_cfg = supervisor.unwrap_or_default();
        let poll = poll.unwrap_or_default();

        // Validate configs (non-panicking; return typed errors)
        if poll.period.is_zero() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "poll period must be > 0",
            )));
        }
        if poll.max_frames_per_tick == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "max_frames_per_tick must be >= 1",
            )));
        }
        if supervisor_cfg.max_retries == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "max_retries must be >= 1",
            )));
        }
        if supervisor_cfg.retry_delay.is_zero() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "retry_delay must be > 0",
            )));
        }
        if !capture.min_weight_kg.is_finite() || capture.min_weight_kg < 0.0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "min_weight_kg must be finite and >= 0",
            )));
        }
        if !capture.max_weight_kg.is_finite() || capture.max_weight_kg <= capture.min_weight_kg {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "max_weight_kg must be finite and > min_weight_kg",
            )));
        }
        if supervisor_cfg.silence_timeout.is_zero() {
            supervisor_cfg.silence_timeout = silence_window(DEFAULT_READ_TIMEOUT, poll.period);
        }

        let clock: Arc<dyn Clock + Send + Sync> = match clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };

        Ok(ScaleCoordinator {
            supervisor: LinkSupervisor::new(transport, supervisor_cfg),
            engine: AutoCapture::new(capture),
            protocol: protocol.unwrap_or_default(),
            store,
            display: display
                .unwrap_or_else(|| Box::new(crate::mocks::NullDisplay)),
            on_recorded,
            clock,
            poll,
            operator,
            scale_name: scale_name.unwrap_or_else(|| "-".to_string()),
            last_display_at: None,
            last_engine_at: None,
        })
    }
}

impl<T: Transport> CoordinatorBuilder<T, Set, Set> {
    /// Validate and build. Only available once store and operator are set.
    pub fn build(self) -> crate::error::Result<ScaleCoordinator<T>> {
        self.try_build()
    }
}
