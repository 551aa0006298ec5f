use chrono::{DateTime, Utc};

use crate::models::results::ScanResults;
use crate::models::scan::{ProgressMessage, ScanStatus};

// State of the one in-flight scan. Mutated only by the dispatcher; everything
// else reads.
#[derive(Debug, Clone)]
pub struct ScanSession {
    scan_id: String,
    status: ScanStatus,
    progress: u8,
    current_task: String,
    results: Option<ScanResults>,
    started_at: DateTime<Utc>,
}

impl ScanSession {
    pub fn begin(scan_id: impl Into<String>) -> Self {
        Self {
            scan_id: scan_id.into(),
            status: ScanStatus::Initializing,
            progress: 0,
            current_task: "Starting scan".to_string(),
            results: None,
            started_at: Utc::now(),
        }
    }

    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }

    pub fn status(&self) -> ScanStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn current_task(&self) -> &str {
        &self.current_task
    }

    pub fn results(&self) -> Option<&ScanResults> {
        self.results.as_ref()
    }

    pub fn elapsed_seconds(&self) -> i64 {
        Utc::now().signed_duration_since(self.started_at).num_seconds()
    }

    // The message is authoritative: the server owns progress semantics, so a
    // lower value than the one recorded is adopted as-is.
    pub fn apply(&mut self, status: ScanStatus, message: &ProgressMessage) {
        self.status = status;
        self.progress = clamp_progress(message.progress);
        self.current_task = message.current_task.clone();

        if status == ScanStatus::Completed {
            self.progress = 100;
        }

        if let Some(results) = &message.results {
            self.results = Some(results.clone());
        }
    }
}

fn clamp_progress(raw: f32) -> u8 {
    raw.round().clamp(0.0, 100.0) as u8
}
