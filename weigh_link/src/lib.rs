#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Serial transports for scale indicators.
//!
//! `SerialLink` wraps an OS serial handle behind `weigh_traits::Transport`:
//! non-blocking line polls, bounded per-read timeout, incremental line
//! assembly with a flood cap. `SimulatedIndicator` is a deterministic
//! stand-in for demos and CI.

pub mod error;
pub mod sim;

pub use sim::SimulatedIndicator;

use crate::error::LinkError;
use std::io::Read;
use std::time::Duration;
use weigh_traits::Transport;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Splits an incoming byte stream into `\n`-terminated lines.
///
/// The internal buffer is capped: a device spewing terminator-free garbage
/// (wrong baud rate, line noise) truncates to the most recent bytes instead
/// of growing without bound. Lines that are not valid UTF-8 are dropped,
/// matching the upstream contract that an undecodable frame is simply lost.
#[derive(Debug)]
pub struct LineAssembler {
    buf: Vec<u8>,
    cap: usize,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl LineAssembler {
    pub fn new(cap: usize) -> Self {
        Self {
            buf: Vec::new(),
            cap: cap.max(2),
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        if self.buf.len() > self.cap {
            let keep = self.cap / 2;
            let dropped = self.buf.len() - keep;
            tracing::warn!(dropped, "line buffer overflow, discarding stale bytes");
            self.buf.drain(..dropped);
        }
    }

    /// Next complete line, stripped of `\r\n`. Empty and undecodable lines
    /// are skipped.
    pub fn pop_line(&mut self) -> Option<String> {
        loop {
            let nl = self.buf.iter().position(|&b| b == b'\n')?;
            let mut line: Vec<u8> = self.buf.drain(..=nl).collect();
            line.pop(); // the '\n'
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            match std::str::from_utf8(&line) {
                Ok(s) if !s.is_empty() => return Some(s.to_string()),
                Ok(_) => continue,
                Err(_) => {
                    tracing::trace!("dropping undecodable frame");
                    continue;
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// `Transport` over a real OS serial device.
pub struct SerialLink {
    read_timeout: Duration,
    port_name: Option<String>,
    handle: Option<Box<dyn serialport::SerialPort>>,
    lines: LineAssembler,
}

impl SerialLink {
    pub fn new(read_timeout: Duration) -> Self {
        Self {
            read_timeout,
            port_name: None,
            handle: None,
            lines: LineAssembler::default(),
        }
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("port", &self.port_name)
            .field("open", &self.handle.is_some())
            .finish()
    }
}

impl Transport for SerialLink {
    fn connect(&mut self, port: &str, baud: u32) -> Result<(), BoxError> {
        self.disconnect();
        let handle = serialport::new(port, baud)
            .timeout(self.read_timeout)
            .open()
            .map_err(|e| {
                Box::new(LinkError::Open {
                    port: port.to_string(),
                    source: e,
                })
            })?;
        tracing::info!(port, baud, "serial link open");
        self.port_name = Some(port.to_string());
        self.handle = Some(handle);
        self.lines.clear();
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.handle.take().is_some() {
            tracing::info!(port = self.port_name.as_deref(), "serial link closed");
        }
        self.port_name = None;
        self.lines.clear();
    }

    fn try_read_line(&mut self) -> Result<Option<String>, BoxError> {
        if let Some(line) = self.lines.pop_line() {
            return Ok(Some(line));
        }
        let Some(handle) = self.handle.as_mut() else {
            return Err(Box::new(LinkError::NotOpen));
        };
        let avail = match handle.bytes_to_read() {
            Ok(n) => n as usize,
            Err(e) => return Err(Box::new(LinkError::Io(std::io::Error::other(e)))),
        };
        if avail == 0 {
            return Ok(None);
        }
        // One bounded read per call; the poll loop drains the rest on later
        // ticks, so a chatty device cannot monopolize a tick.
        let mut buf = [0u8; 256];
        let want = buf.len().min(avail);
        match handle.read(&mut buf[..want]) {
            Ok(0) => Ok(None),
            Ok(n) => {
                self.lines.push(&buf[..n]);
                Ok(self.lines.pop_line())
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(Box::new(LinkError::Io(e))),
        }
    }

    fn is_open(&self) -> bool {
        self.handle.is_some()
    }
}

/// Names of serial devices present on this machine.
pub fn available_ports() -> crate::error::Result<Vec<String>> {
    let ports = serialport::available_ports().map_err(LinkError::Enumerate)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
