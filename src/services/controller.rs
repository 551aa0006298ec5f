use log::{info, warn};

use crate::errors::ClientError;
use crate::models::scan::{ScanRequest, ScanStatus};
use crate::render::{PresentationSink, Severity};
use crate::services::dispatcher::{Dispatch, ProgressDispatcher};
use crate::services::session::ScanSession;
use crate::services::transport::{ProgressStream, ScannerClient};

// Owns the one active scan: its session, its progress stream and the sink
// the dispatcher pushes view-state into. At most one stream is ever live.
pub struct ScanController<S: PresentationSink> {
    client: ScannerClient,
    dispatcher: ProgressDispatcher,
    sink: S,
    session: Option<ScanSession>,
    stream: Option<ProgressStream>,
}

impl<S: PresentationSink> ScanController<S> {
    pub fn new(client: ScannerClient, sink: S) -> Self {
        Self {
            client,
            dispatcher: ProgressDispatcher::new(),
            sink,
            session: None,
            stream: None,
        }
    }

    pub fn session(&self) -> Option<&ScanSession> {
        self.session.as_ref()
    }

    pub fn has_open_stream(&self) -> bool {
        self.stream.as_ref().is_some_and(|stream| stream.is_open())
    }

    // Submits the scan and subscribes to its progress feed. A scan that is
    // already being followed is superseded: its stream is closed before the
    // new request goes out.
    pub async fn start(&mut self, request: ScanRequest) -> Result<String, ClientError> {
        if let Some(mut stream) = self.stream.take() {
            info!("closing progress stream for superseded scan {}", stream.scan_id());
            stream.close().await;
        }
        self.session = None;

        let scan_id = self.client.start_scan(&request).await?;
        info!("starting scan {} for {}", scan_id, request.base_url);

        let session = ScanSession::begin(&scan_id);
        self.sink.render_progress(session.progress(), "Initializing scan...");
        self.sink.render_status(session.status());
        self.session = Some(session);

        let stream = self.client.open_progress_stream(&scan_id).await?;
        self.stream = Some(stream);

        Ok(scan_id)
    }

    // Consumes the stream one frame at a time, each handled to completion
    // before the next, until a terminal status arrives or the feed dies.
    pub async fn run_to_completion(&mut self) -> Result<ScanStatus, ClientError> {
        let mut stream = match self.stream.take() {
            Some(stream) => stream,
            None => {
                return Err(ClientError::Transport(
                    "no progress stream is open".to_string(),
                ));
            }
        };
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => {
                return Err(ClientError::Transport(
                    "no scan session is active".to_string(),
                ));
            }
        };

        let outcome = loop {
            match stream.next_message().await {
                Some(Ok(message)) => {
                    let outcome = self.dispatcher.dispatch(session, message, &mut self.sink);
                    if outcome == Dispatch::Terminal {
                        break Ok(session.status());
                    }
                }
                Some(Err(e)) => {
                    // The session keeps its last known state; only the feed
                    // is gone.
                    self.sink.notify(
                        &format!("Lost connection to scan stream: {}", e),
                        Severity::Error,
                    );
                    break Err(e);
                }
                None => {
                    warn!(
                        "progress stream for scan {} ended before a terminal status",
                        session.scan_id()
                    );
                    break Ok(session.status());
                }
            }
        };

        stream.close().await;
        outcome
    }

    // Fetches the persisted results for the scan this controller followed
    // and hands them to the sink as a JSON document.
    pub async fn export(&mut self) -> Result<(), ClientError> {
        let scan_id = match &self.session {
            Some(session) => session.scan_id().to_string(),
            None => {
                return Err(ClientError::Export(
                    "no scan results to export".to_string(),
                ));
            }
        };

        let results = self
            .client
            .fetch_results(&scan_id)
            .await
            .map_err(|e| ClientError::Export(e.to_string()))?;
        let content = serde_json::to_string_pretty(&results)
            .map_err(|e| ClientError::Export(e.to_string()))?;

        let name = format!("scan-results-{}.json", scan_id);
        self.sink
            .download_file(&name, &content)
            .map_err(|e| ClientError::Export(e.to_string()))?;
        self.sink
            .notify(&format!("Results exported to {}", name), Severity::Success);

        Ok(())
    }
}
