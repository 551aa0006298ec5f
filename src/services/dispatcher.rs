use log::{info, warn};

use crate::models::scan::{ProgressMessage, ScanStatus};
use crate::render::{PresentationSink, Severity};
use crate::services::session::ScanSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Continue,
    Terminal,
}

pub struct ProgressDispatcher;

impl ProgressDispatcher {
    pub fn new() -> Self {
        Self
    }

    // Pure routing: classify the frame, update the session, push derived
    // view-state to the sink. Terminal outcomes tell the caller to close
    // the stream; no I/O happens here.
    pub fn dispatch(
        &self,
        session: &mut ScanSession,
        message: ProgressMessage,
        sink: &mut dyn PresentationSink,
    ) -> Dispatch {
        let status = match ScanStatus::parse(&message.status) {
            Some(status) => status,
            None => {
                warn!(
                    "ignoring progress frame with unrecognized status '{}'",
                    message.status
                );
                return Dispatch::Continue;
            }
        };

        session.apply(status, &message);
        sink.render_progress(session.progress(), session.current_task());
        sink.render_status(session.status());

        match status {
            ScanStatus::Initializing | ScanStatus::Running => Dispatch::Continue,
            ScanStatus::Completed => {
                if let Some(results) = session.results() {
                    sink.render_results(results);
                    sink.render_tree(&results.site_structure);
                }
                sink.notify("Scan completed successfully", Severity::Success);
                info!(
                    "scan {} completed in {}s",
                    session.scan_id(),
                    session.elapsed_seconds()
                );
                Dispatch::Terminal
            }
            ScanStatus::Failed => {
                let detail = message.error.as_deref().unwrap_or("Unknown error occurred");
                sink.notify(&format!("Scan failed: {}", detail), Severity::Error);
                Dispatch::Terminal
            }
        }
    }
}
