//! Append-only run log: one timestamped line per significant event.

use chrono::{SecondsFormat, Utc};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

pub trait LogSink: Send + Sync {
    fn record(&self, message: &str);
}

pub type SharedLog = Arc<dyn LogSink>;

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Writes `[timestamp] message` lines to a file and mirrors them to tracing.
pub struct FileRunLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileRunLog {
    /// Create (truncate) the log file and write the run header.
    pub fn create(path: &Path, session_id: &str) -> std::io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        writeln!(
            file,
            "=== dashpilot run {} started at {} ===",
            session_id,
            timestamp()
        )?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileRunLog {
    fn record(&self, message: &str) {
        info!("{}", message);
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(file, "[{}] {}", timestamp(), message).and_then(|_| file.flush())
        {
            warn!("Failed to write run log {}: {}", self.path.display(), e);
        }
    }
}

/// Keeps lines in memory; used by tests and dry runs.
#[derive(Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl LogSink for MemoryLog {
    fn record(&self, message: &str) {
        info!("{}", message);
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }
}
