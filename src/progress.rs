//! Batch extraction progress reporting.
//!
//! Progress is counted in completed files (not bytes) and expressed as a
//! percentage suitable for a progress indicator. Reporters write to
//! **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Batch admitted; `total` files will be processed.
    Started { total: usize },
    /// One file finished (successfully or not).
    FileDone {
        name: String,
        succeeded: bool,
        completed: usize,
        total: usize,
        percent: u8,
    },
}

/// Receives progress events. Called from the batch coordinator only.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Percentage of `completed` out of `total`, rounded; an empty batch is 100%.
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let completed = completed.min(total);
    ((completed * 100 + total / 2) / total) as u8
}

/// Human-friendly progress on stderr: "extract  40%  2 / 5 files  report.pdf".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Started { total } => format!("extract  {} files queued\n", total),
            ProgressEvent::FileDone {
                name,
                succeeded,
                completed,
                total,
                percent,
            } => format!(
                "extract  {:>3}%  {} / {} files  {}{}\n",
                percent,
                completed,
                total,
                name,
                if *succeeded { "" } else { " (failed)" }
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Started { total } => serde_json::json!({
                "event": "progress",
                "phase": "started",
                "total": total
            }),
            ProgressEvent::FileDone {
                name,
                succeeded,
                completed,
                total,
                percent,
            } => serde_json::json!({
                "event": "progress",
                "phase": "file_done",
                "file": name,
                "ok": succeeded,
                "n": completed,
                "total": total,
                "percent": percent
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
