pub mod console;

use anyhow::Result;

use crate::models::results::{ScanResults, TreeNode};
use crate::models::scan::ScanStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

// Rendering contract the scan core pushes view-state into. Implementations
// read session-derived values and must not feed anything back.
pub trait PresentationSink {
    fn render_progress(&mut self, percent: u8, text: &str);
    fn render_status(&mut self, status: ScanStatus);
    fn render_results(&mut self, results: &ScanResults);
    fn render_tree(&mut self, root: &TreeNode);
    fn notify(&mut self, message: &str, severity: Severity);
    fn download_file(&mut self, name: &str, content: &str) -> Result<()>;
}

// Records every sink call so tests can assert on what the dispatcher and
// controller pushed out.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSink {
    pub progress: Vec<(u8, String)>,
    pub statuses: Vec<ScanStatus>,
    pub results_rendered: usize,
    pub trees_rendered: usize,
    pub notifications: Vec<(String, Severity)>,
    pub downloads: Vec<(String, String)>,
}

#[cfg(test)]
impl PresentationSink for RecordingSink {
    fn render_progress(&mut self, percent: u8, text: &str) {
        self.progress.push((percent, text.to_string()));
    }

    fn render_status(&mut self, status: ScanStatus) {
        self.statuses.push(status);
    }

    fn render_results(&mut self, _results: &ScanResults) {
        self.results_rendered += 1;
    }

    fn render_tree(&mut self, _root: &TreeNode) {
        self.trees_rendered += 1;
    }

    fn notify(&mut self, message: &str, severity: Severity) {
        self.notifications.push((message.to_string(), severity));
    }

    fn download_file(&mut self, name: &str, content: &str) -> Result<()> {
        self.downloads.push((name.to_string(), content.to_string()));
        Ok(())
    }
}
