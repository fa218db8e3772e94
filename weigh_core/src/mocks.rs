//! Test and helper doubles for weigh_core.
#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use weigh_traits::{DisplaySink, Transport, WeighingRecord, WeighingStore};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Display sink that ignores everything; the builder default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn on_weight_sample(&mut self, _kg: f64) {}
    fn on_connection_status(&mut self, _connected: bool, _port: Option<&str>, _baud: Option<u32>) {}
}

/// One scripted `try_read_line` outcome.
#[derive(Debug, Clone)]
pub enum ScriptedRead {
    Line(String),
    /// No frame available this poll.
    Silence,
    Fail(String),
}

/// Transport driven by shared queues, for exercising the supervisor and
/// coordinator without hardware. Clones share the same script and logs.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    reads: Arc<Mutex<VecDeque<ScriptedRead>>>,
    connect_failures: Arc<Mutex<VecDeque<String>>>,
    /// Every `(port, baud)` passed to `connect`, successful or not.
    pub connect_log: Arc<Mutex<Vec<(String, u32)>>>,
    open: Arc<AtomicBool>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_line(&self, line: &str) {
        self.reads
            .lock()
            .unwrap()
            .push_back(ScriptedRead::Line(line.to_string()));
    }

    pub fn push_silence(&self) {
        self.reads.lock().unwrap().push_back(ScriptedRead::Silence);
    }

    pub fn push_read_failure(&self, message: &str) {
        self.reads
            .lock()
            .unwrap()
            .push_back(ScriptedRead::Fail(message.to_string()));
    }

    /// Queue `n` connect attempts to fail before later ones succeed.
    pub fn fail_next_connects(&self, n: usize, message: &str) {
        let mut q = self.connect_failures.lock().unwrap();
        for _ in 0..n {
            q.push_back(message.to_string());
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connect_log.lock().unwrap().len()
    }

    pub fn pending_reads(&self) -> usize {
        self.reads.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn connect(&mut self, port: &str, baud: u32) -> Result<(), BoxError> {
        self.connect_log
            .lock()
            .unwrap()
            .push((port.to_string(), baud));
        if let Some(message) = self.connect_failures.lock().unwrap().pop_front() {
            self.open.store(false, Ordering::Relaxed);
            return Err(Box::new(std::io::Error::other(message)));
        }
        self.open.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.open.store(false, Ordering::Relaxed);
    }

    fn try_read_line(&mut self) -> Result<Option<String>, BoxError> {
        if !self.open.load(Ordering::Relaxed) {
            return Err(Box::new(std::io::Error::other("scripted port not open")));
        }
        match self.reads.lock().unwrap().pop_front() {
            Some(ScriptedRead::Line(line)) => Ok(Some(line)),
            Some(ScriptedRead::Silence) | None => Ok(None),
            Some(ScriptedRead::Fail(message)) => Err(Box::new(std::io::Error::other(message))),
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }
}

/// Store keeping records in memory; clones share the record list, so tests
/// can inspect what a moved-away coordinator persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub records: Arc<Mutex<Vec<WeighingRecord>>>,
    fail_next: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write fail once.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WeighingStore for MemoryStore {
    fn record_weighing(&mut self, record: &WeighingRecord) -> Result<(), BoxError> {
        if self.fail_next.swap(false, Ordering::Relaxed) {
            return Err(Box::new(std::io::Error::other("journal unavailable")));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Display sink recording everything it is pushed; clones share storage.
#[derive(Debug, Clone, Default)]
pub struct CollectingDisplay {
    pub samples: Arc<Mutex<Vec<f64>>>,
    pub statuses: Arc<Mutex<Vec<(bool, Option<String>, Option<u32>)>>>,
}

impl DisplaySink for CollectingDisplay {
    fn on_weight_sample(&mut self, kg: f64) {
        self.samples.lock().unwrap().push(kg);
    }

    fn on_connection_status(&mut self, connected: bool, port: Option<&str>, baud: Option<u32>) {
        self.statuses
            .lock()
            .unwrap()
            .push((connected, port.map(str::to_string), baud));
    }
}
