use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::warn;

use crate::parser::events::{Event, Observer};

/// Append-only debug log shared by all workers. Each append holds the lock
/// for its whole batch of messages, so documents never interleave.
pub struct DebugLog {
    out: Mutex<BufWriter<File>>,
}

impl DebugLog {
    /// Starts a fresh log, replacing any previous run's file.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut out = BufWriter::new(file);
        writeln!(out, "Run started {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))?;
        Ok(DebugLog {
            out: Mutex::new(out),
        })
    }

    pub fn append<S: AsRef<str>>(&self, messages: &[S]) -> std::io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        for msg in messages {
            writeln!(out, "{}", msg.as_ref())?;
        }
        Ok(())
    }

    pub fn flush(&self) -> std::io::Result<()> {
        self.out.lock().unwrap_or_else(|e| e.into_inner()).flush()
    }
}

impl Observer for DebugLog {
    fn observe(&self, event: &Event<'_>) {
        if let Err(e) = self.append(&[event.to_string()]) {
            warn!("debug log write failed: {}", e);
        }
    }
}
