//! JSONL weighing journal: one JSON object per completed weighing.

use chrono::{DateTime, Local};
use serde_json::json;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use weigh_traits::{WeighingRecord, WeighingStore};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Append-only journal file. Carries the operator-facing timestamp in the
/// journal's traditional `%d.%m.%Y %H:%M` form plus an RFC 3339 instant.
pub struct JsonlStore {
    out: BufWriter<File>,
}

impl JsonlStore {
    pub fn open(path: &Path) -> eyre::Result<Self> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)
                .map_err(|e| eyre::eyre!("create journal directory {:?}: {}", dir, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eyre::eyre!("open journal {:?}: {}", path, e))?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }
}

impl WeighingStore for JsonlStore {
    fn record_weighing(&mut self, record: &WeighingRecord) -> Result<(), BoxError> {
        let at: DateTime<Local> = record.recorded_at.into();
        let line = json!({
            "datetime": at.format("%d.%m.%Y %H:%M").to_string(),
            "recorded_at": at.to_rfc3339(),
            "weight_kg": record.weight_kg,
            "operator": record.operator,
            "mode": record.mode.as_str(),
            "cargo_name": record.cargo_name,
            "sender": record.sender,
            "recipient": record.recipient,
            "comment": record.comment,
            "scale_name": record.scale_name,
        });
        writeln!(self.out, "{line}")?;
        // Flush per record: the journal is the system of record and must
        // survive the process dying mid-session.
        self.out.flush()?;
        Ok(())
    }
}
