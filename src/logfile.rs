use crate::collectors::ResourceSnapshot;
use crate::rate::NetRates;
use crate::state::Metric;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to open log file {path}: {source}")]
    Open { path: String, source: io::Error },
    #[error("failed to write to log file: {0}")]
    Write(#[from] io::Error),
}

/// Size-bounded append-only status log. When a record would push the file
/// past `max_size_bytes`, backups shift up one slot (`.N` is dropped, the
/// live file becomes `.1`) and the record lands in a fresh file.
pub struct RotatingLog {
    path: PathBuf,
    max_size_bytes: u64,
    backup_count: u32,
    file: File,
    current_size: u64,
}

impl RotatingLog {
    pub fn open(
        path: impl Into<PathBuf>,
        max_size_bytes: u64,
        backup_count: u32,
    ) -> Result<Self, LogError> {
        let path = path.into();
        let file = open_for_append(&path).map_err(|source| LogError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            path,
            max_size_bytes,
            backup_count,
            file,
            current_size,
        })
    }

    pub fn append(&mut self, line: &str) -> Result<(), LogError> {
        let record_len = line.len() as u64 + 1;
        if self.current_size + record_len > self.max_size_bytes {
            if let Err(err) = self.rotate() {
                warn!(
                    error = %err,
                    path = %self.path.display(),
                    "log rotation failed, writing to the current file"
                );
            }
        }

        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.file.flush()?;
        self.current_size += record_len;
        Ok(())
    }

    fn backup_path(&self, index: u32) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        let oldest = self.backup_path(self.backup_count);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.backup_count).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        // The live handle is only replaced once the fresh file exists; if
        // this fails the triggering record still goes to the old handle.
        self.file = open_for_append(&self.path)?;
        self.current_size = 0;
        Ok(())
    }
}

fn open_for_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// One status record per cycle, with an alert marker naming the metrics
/// breached in that cycle.
pub fn status_record(
    timestamp: &str,
    hostname: &str,
    snapshot: &ResourceSnapshot,
    rates: NetRates,
    breached: &[Metric],
) -> String {
    let mut record = format!(
        "{timestamp} {hostname} CPU: {:.1}% | Memory: {:.1}% | Disk: {:.1}% | Net Sent: {:.2} MB/s | Net Recv: {:.2} MB/s",
        snapshot.cpu_percent,
        snapshot.memory_percent,
        snapshot.disk_percent,
        rates.sent_mb_s,
        rates.recv_mb_s
    );
    if !breached.is_empty() {
        let labels: Vec<&str> = breached.iter().map(|m| m.label()).collect();
        record.push_str(" | ALERT: ");
        record.push_str(&labels.join(", "));
    }
    record
}
