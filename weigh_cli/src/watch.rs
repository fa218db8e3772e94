//! The `watch` command: one worker per configured scale, events to stdout.

use crate::journal::JsonlStore;
use crossbeam_channel::RecvTimeoutError;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use weigh_core::{
    CaptureCfg, ChannelSink, LinkTarget, PollCfg, ProtocolKind, RosterConfigStore,
    ScaleCoordinator, ScaleEvent, ScaleWorker, SupervisorCfg, event_channel, resolve_link,
};
use weigh_link::{SerialLink, SimulatedIndicator};
use weigh_traits::MonotonicClock;

pub struct WatchOpts {
    pub operator: String,
    pub simulate: bool,
    pub simulate_kg: f64,
    pub roster: Option<PathBuf>,
    pub link_name: Option<String>,
    pub settle_secs: Option<u64>,
    pub journal: Option<PathBuf>,
    pub duration_ms: u64,
}

pub fn run(cfg: &weigh_config::Config, opts: WatchOpts) -> eyre::Result<()> {
    let mut capture: CaptureCfg = (&cfg.capture).into();
    if let Some(secs) = opts.settle_secs {
        capture.settle = Duration::from_secs(secs);
    }
    let supervisor: SupervisorCfg = cfg.into();
    let poll: PollCfg = (&cfg.poll).into();
    let read_timeout = Duration::from_millis(cfg.link.read_timeout_ms);

    let journal_path = opts
        .journal
        .clone()
        .or_else(|| cfg.journal.path.clone().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("weighings.jsonl"));

    let (tx, rx) = event_channel();
    let mut workers: Vec<ScaleWorker> = Vec::new();

    let spawn_serial = |name: &str,
                        target: LinkTarget,
                        tx: &crossbeam_channel::Sender<ScaleEvent>|
     -> eyre::Result<ScaleWorker> {
        let mut coordinator = ScaleCoordinator::builder(SerialLink::new(read_timeout))
            .with_store(JsonlStore::open(&journal_path)?)
            .with_operator(&opts.operator)
            .with_scale_name(name)
            .with_display(ChannelSink::new(name, tx.clone()))
            .with_capture(capture)
            .with_supervisor(supervisor)
            .with_poll(poll)
            .build()?;
        coordinator.connect(target)?;
        Ok(ScaleWorker::spawn(
            name,
            coordinator,
            poll.period,
            MonotonicClock::new(),
            tx.clone(),
        ))
    };

    if opts.simulate {
        let name = "Simulated";
        let mut coordinator =
            ScaleCoordinator::builder(SimulatedIndicator::new(opts.simulate_kg))
                .with_store(JsonlStore::open(&journal_path)?)
                .with_operator(&opts.operator)
                .with_scale_name(name)
                .with_display(ChannelSink::new(name, tx.clone()))
                .with_capture(capture)
                .with_supervisor(supervisor)
                .with_poll(poll)
                .build()?;
        coordinator.connect(LinkTarget {
            port: "SIM".to_string(),
            baud: 9600,
            protocol: ProtocolKind::LegacyPrefixed,
        })?;
        workers.push(ScaleWorker::spawn(
            name,
            coordinator,
            poll.period,
            MonotonicClock::new(),
            tx.clone(),
        ));
    } else if let Some(roster_path) = &opts.roster {
        let name = opts
            .link_name
            .clone()
            .ok_or_else(|| eyre::eyre!("--roster requires --link-name"))?;
        let store = RosterConfigStore::load(roster_path)?;
        let target = resolve_link(&store, &opts.operator, &name)?;
        workers.push(spawn_serial(&name, target, &tx)?);
    } else {
        if cfg.scales.is_empty() {
            eyre::bail!("no [[scales]] configured; add one, or pass --roster or --simulate");
        }
        for scale in &cfg.scales {
            workers.push(spawn_serial(&scale.name, LinkTarget::from(scale), &tx)?);
        }
    }
    drop(tx);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))?;
    }

    tracing::info!(
        scales = workers.len(),
        journal = %journal_path.display(),
        "watching"
    );

    let deadline =
        (opts.duration_ms > 0).then(|| Instant::now() + Duration::from_millis(opts.duration_ms));
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        if let Some(deadline) = deadline
            && Instant::now() >= deadline
        {
            break;
        }
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => print_event(&event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // Close the event channel first: a worker blocked on a lifecycle send
    // sees the disconnect and exits instead of stalling the join below.
    drop(rx);
    for worker in &mut workers {
        worker.stop();
    }
    Ok(())
}

fn print_event(event: &ScaleEvent) {
    match event {
        ScaleEvent::Weight { scale, kg } => println!("{scale}: {kg:.2} kg"),
        ScaleEvent::Link {
            scale,
            connected: true,
            port,
            baud,
        } => {
            let port = port.as_deref().unwrap_or("?");
            let baud = baud.map_or_else(|| "?".to_string(), |b| b.to_string());
            println!("{scale}: receiving... Ok ({port}, {baud})");
        }
        ScaleEvent::Link {
            scale,
            connected: false,
            ..
        } => println!("{scale}: receiving... no link"),
        ScaleEvent::Recorded { scale, record } => println!(
            "{scale}: recorded {:.2} kg ({})",
            record.weight_kg,
            record.mode.as_str()
        ),
        ScaleEvent::StoreFailed { scale, message } => {
            eprintln!("{scale}: weighing NOT saved: {message}");
        }
        ScaleEvent::LinkExhausted { scale } => {
            eprintln!("{scale}: link lost and retries exhausted; reconnect manually");
        }
    }
}
