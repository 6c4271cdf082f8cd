//! Append-only JSONL event log.
//!
//! One JSON object per line, in append order. Lines are never rewritten; a
//! torn trailing line left by a crash is skipped on read.

use crate::error::{Result, VyuhaError};
use crate::paths;
use crate::types::{ActionCycle, RiskAssessment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Scan,
    Act,
}

/// What a scan produced: the assessment and how long the risk source took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub satellite_id: String,
    pub risk: RiskAssessment,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    Act(Box<ActionCycle>),
    Scan(ScanRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl Event {
    pub fn scan(record: ScanRecord) -> Self {
        Self {
            kind: EventKind::Scan,
            timestamp: Utc::now(),
            payload: EventPayload::Scan(record),
        }
    }

    pub fn act(cycle: ActionCycle) -> Self {
        Self {
            kind: EventKind::Act,
            timestamp: cycle.completed_at,
            payload: EventPayload::Act(Box::new(cycle)),
        }
    }

    pub fn as_scan(&self) -> Option<&ScanRecord> {
        match &self.payload {
            EventPayload::Scan(s) => Some(s),
            EventPayload::Act(_) => None,
        }
    }

    pub fn as_cycle(&self) -> Option<&ActionCycle> {
        match &self.payload {
            EventPayload::Act(c) => Some(c),
            EventPayload::Scan(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// EventStore
// ---------------------------------------------------------------------------

pub struct EventStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl EventStore {
    pub fn open(root: &Path) -> Self {
        Self::open_at(paths::events_path(root))
    }

    pub fn open_at(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durable once this returns `Ok`.
    pub fn append(&self, event: &Event) -> Result<()> {
        let line = serde_json::to_string(event)?;
        let _guard = self.lock.lock().map_err(|_| VyuhaError::LedgerPoisoned)?;
        crate::io::append_line(&self.path, &line)
    }

    /// Every readable event in append order. A missing log is empty.
    pub fn read_all(&self) -> Result<Vec<Event>> {
        let data = {
            let _guard = self.lock.lock().map_err(|_| VyuhaError::LedgerPoisoned)?;
            match std::fs::read_to_string(&self.path) {
                Ok(d) => d,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            }
        };

        let mut events = Vec::new();
        for (idx, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Event>(line) {
                Ok(event) => events.push(event),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    line = idx + 1,
                    error = %e,
                    "skipping unreadable event"
                ),
            }
        }
        Ok(events)
    }
}
