use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeDelta};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const LOG_FILE: &str = "processed_files.log";
const TIMESTAMP_FILE: &str = "last_process.timestamp";

/// Files already handled within a rolling window. Every recorded file
/// refreshes the window; once it lapses the log starts over.
#[derive(Debug)]
pub struct ProcessedLog {
    log_path: PathBuf,
    timestamp_path: PathBuf,
    entries: HashSet<String>,
}

impl ProcessedLog {
    pub fn load(state_dir: &Path, window: TimeDelta) -> Result<Self> {
        Self::load_at(state_dir, window, Local::now())
    }

    pub(crate) fn load_at(state_dir: &Path, window: TimeDelta, now: DateTime<Local>) -> Result<Self> {
        fs::create_dir_all(state_dir).with_context(|| {
            format!("Failed to create state directory: {}", state_dir.display())
        })?;

        let log_path = state_dir.join(LOG_FILE);
        let timestamp_path = state_dir.join(TIMESTAMP_FILE);

        let last = read_timestamp(&timestamp_path);
        let elapsed = now.timestamp_micros() as f64 / 1e6 - last;
        let mut entries = HashSet::new();

        if elapsed < window.num_milliseconds() as f64 / 1e3 {
            if log_path.exists() {
                let content = fs::read_to_string(&log_path)
                    .with_context(|| format!("Failed to read {}", log_path.display()))?;
                entries.extend(
                    content
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(String::from),
                );
            }
            debug!(entries = entries.len(), "processed log loaded");
        } else if log_path.exists() {
            fs::remove_file(&log_path)
                .with_context(|| format!("Failed to clear {}", log_path.display()))?;
            info!("processed log expired and was cleared");
        }

        Ok(Self {
            log_path,
            timestamp_path,
            entries,
        })
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains(&key(path))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn record(&mut self, path: &Path) -> Result<()> {
        self.record_at(path, Local::now())
    }

    pub(crate) fn record_at(&mut self, path: &Path, now: DateTime<Local>) -> Result<()> {
        let entry = key(path);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open {}", self.log_path.display()))?;
        writeln!(file, "{}", entry)
            .with_context(|| format!("Failed to write to {}", self.log_path.display()))?;

        let stamp = now.timestamp_micros() as f64 / 1e6;
        fs::write(&self.timestamp_path, format!("{:.6}", stamp))
            .with_context(|| format!("Failed to write {}", self.timestamp_path.display()))?;

        self.entries.insert(entry);
        Ok(())
    }
}

fn key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// Missing or unreadable timestamps count as "long ago".
fn read_timestamp(path: &Path) -> f64 {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}
