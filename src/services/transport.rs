use futures::StreamExt;
use log::{debug, error, info, warn};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::errors::ClientError;
use crate::models::scan::{ProgressMessage, ScanListing, ScanRequest, StartScanResponse};
use crate::models::results::ScanResults;
use crate::utils::validate::parse_target_url;

type WsConnection = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct ScannerClient {
    http: reqwest::Client,
    base_url: String,
    ws_base_url: String,
}

impl ScannerClient {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let ws_base_url = derive_ws_base(&base_url);

        Self {
            http: reqwest::Client::new(),
            base_url,
            ws_base_url,
        }
    }

    // The stream usually lives on the same host as the HTTP API; this is for
    // deployments (and tests) where it does not.
    pub fn with_ws_base_url(mut self, ws_base_url: &str) -> Self {
        self.ws_base_url = ws_base_url.trim_end_matches('/').to_string();
        self
    }

    pub async fn start_scan(&self, request: &ScanRequest) -> Result<String, ClientError> {
        // Target validation happens before anything touches the network.
        parse_target_url(&request.base_url)?;

        let url = format!("{}/scan", self.base_url);
        debug!("POST {}", url);
        let response = self.http.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let details = error_details(&body);
            error!("scan request failed with {}: {}", status, details);
            return Err(ClientError::Server { status, details });
        }

        let body: StartScanResponse = response.json().await?;
        if let Some(message) = &body.message {
            debug!("backend: {}", message);
        }
        info!("scan {} accepted", body.scan_id);
        Ok(body.scan_id)
    }

    pub async fn fetch_results(&self, scan_id: &str) -> Result<ScanResults, ClientError> {
        let url = format!("{}/results/{}", self.base_url, scan_id);
        debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let details = error_details(&body);
            error!("results fetch failed with {}: {}", status, details);
            return Err(ClientError::Server { status, details });
        }

        let results: ScanResults = response.json().await?;
        Ok(results)
    }

    pub async fn fetch_status(&self, scan_id: &str) -> Result<ProgressMessage, ClientError> {
        let url = format!("{}/status/{}", self.base_url, scan_id);
        debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let details = error_details(&body);
            return Err(ClientError::Server { status, details });
        }

        let status: ProgressMessage = response.json().await?;
        Ok(status)
    }

    pub async fn list_scans(&self) -> Result<ScanListing, ClientError> {
        let url = format!("{}/scans", self.base_url);
        debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let details = error_details(&body);
            return Err(ClientError::Server { status, details });
        }

        let listing: ScanListing = response.json().await?;
        Ok(listing)
    }

    pub async fn delete_scan(&self, scan_id: &str) -> Result<(), ClientError> {
        let url = format!("{}/scan/{}", self.base_url, scan_id);
        debug!("DELETE {}", url);
        let response = self.http.delete(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let details = error_details(&body);
            error!("scan delete failed with {}: {}", status, details);
            return Err(ClientError::Server { status, details });
        }

        Ok(())
    }

    pub async fn open_progress_stream(&self, scan_id: &str) -> Result<ProgressStream, ClientError> {
        let url = self.ws_url(scan_id);
        debug!("WS {}", url);
        let (ws, _) = connect_async(url.as_str())
            .await
            .map_err(ClientError::transport)?;
        info!("progress stream open for scan {}", scan_id);

        Ok(ProgressStream {
            scan_id: scan_id.to_string(),
            ws: Some(ws),
        })
    }

    fn ws_url(&self, scan_id: &str) -> String {
        format!("{}/ws/{}", self.ws_base_url, scan_id)
    }
}

fn derive_ws_base(base_url: &str) -> String {
    if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base_url.to_string()
    }
}

// The backend wraps FastAPI-style errors as {"detail": ...}; anything else
// is surfaced as-is.
fn error_details(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value
            .get("detail")
            .and_then(|detail| detail.as_str())
            .map(|detail| detail.to_string())
            .unwrap_or_else(|| value.to_string()),
        Err(_) => body.to_string(),
    }
}

// Live subscription to one scan's progress feed. The dispatcher decides when
// to stop consuming; the stream itself only knows how to read and close.
pub struct ProgressStream {
    scan_id: String,
    ws: Option<WsConnection>,
}

impl ProgressStream {
    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }

    pub fn is_open(&self) -> bool {
        self.ws.is_some()
    }

    pub async fn next_message(&mut self) -> Option<Result<ProgressMessage, ClientError>> {
        loop {
            let ws = self.ws.as_mut()?;
            match ws.next().await {
                Some(Ok(WsMessage::Text(raw))) => {
                    match serde_json::from_str::<ProgressMessage>(&raw) {
                        Ok(message) => return Some(Ok(message)),
                        Err(e) => {
                            warn!("discarding malformed progress frame: {}", e);
                            continue;
                        }
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    self.ws = None;
                    return None;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.ws = None;
                    return Some(Err(ClientError::transport(e)));
                }
            }
        }
    }

    // Safe to call repeatedly, including on an already-closed handle.
    pub async fn close(&mut self) {
        if let Some(mut ws) = self.ws.take() {
            if let Err(e) = ws.close(None).await {
                debug!("progress stream close for scan {}: {}", self.scan_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scan::ScanType;
    use futures::SinkExt;

    #[tokio::test]
    async fn test_start_scan_returns_scan_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/scan")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"scan_id": "abc123", "message": "Scan started successfully", "status": "initializing"}"#)
            .create_async()
            .await;

        let client = ScannerClient::new(&server.url());
        let request = ScanRequest::new("https://example.com", vec![ScanType::Full]);
        let scan_id = client.start_scan(&request).await.unwrap();

        assert_eq!(scan_id, "abc123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_start_scan_surfaces_server_error_detail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/scan")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "scraper exploded"}"#)
            .create_async()
            .await;

        let client = ScannerClient::new(&server.url());
        let request = ScanRequest::new("https://example.com", vec![]);
        let err = client.start_scan(&request).await.unwrap_err();

        match err {
            ClientError::Server { status, details } => {
                assert_eq!(status, 500);
                assert_eq!(details, "scraper exploded");
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_scan_rejects_invalid_target_without_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/scan")
            .expect(0)
            .create_async()
            .await;

        let client = ScannerClient::new(&server.url());
        let request = ScanRequest::new("not a url", vec![]);
        let err = client.start_scan(&request).await.unwrap_err();

        assert!(matches!(err, ClientError::Validation(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_results_rejected_while_running() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/results/abc123")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "Scan not completed. Current status: running"}"#)
            .create_async()
            .await;

        let client = ScannerClient::new(&server.url());
        let err = client.fetch_results("abc123").await.unwrap_err();

        match err {
            ClientError::Server { status, details } => {
                assert_eq!(status, 400);
                assert!(details.contains("not completed"));
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_status_parses_frame_shape() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/status/abc123")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "abc123", "status": "running", "progress": 40.0, "current_task": "Scanning forms"}"#)
            .create_async()
            .await;

        let client = ScannerClient::new(&server.url());
        let status = client.fetch_status("abc123").await.unwrap();

        assert_eq!(status.status, "running");
        assert_eq!(status.current_task, "Scanning forms");
    }

    #[tokio::test]
    async fn test_list_scans_parses_listing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/scans")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "20260805120000": {"status": "completed", "progress": 100.0,
                                       "start_time": "2026-08-05T12:00:00", "end_time": "2026-08-05T12:04:31"},
                    "20260805130000": {"status": "running", "progress": 35.0,
                                       "start_time": "2026-08-05T13:00:00", "end_time": null}
                }"#,
            )
            .create_async()
            .await;

        let client = ScannerClient::new(&server.url());
        let listing = client.list_scans().await.unwrap();

        assert_eq!(listing.len(), 2);
        assert_eq!(listing["20260805120000"].status, "completed");
        assert!(listing["20260805130000"].end_time.is_none());
    }

    #[tokio::test]
    async fn test_delete_scan_refused_while_active() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/scan/abc123")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "Cannot delete active scan"}"#)
            .create_async()
            .await;

        let client = ScannerClient::new(&server.url());
        let err = client.delete_scan("abc123").await.unwrap_err();

        assert!(matches!(err, ClientError::Server { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_progress_stream_reads_frames_in_order() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(WsMessage::Text(
                r#"{"status":"running","progress":40.0,"current_task":"Scanning forms"}"#.to_string(),
            ))
            .await
            .unwrap();
            ws.send(WsMessage::Text("not json".to_string())).await.unwrap();
            ws.send(WsMessage::Text(
                r#"{"status":"running","progress":60.0,"current_task":"Probing admin paths"}"#
                    .to_string(),
            ))
            .await
            .unwrap();
            ws.close(None).await.unwrap();
        });

        let client = ScannerClient::new(&format!("http://{}", addr));
        let mut stream = client.open_progress_stream("abc123").await.unwrap();
        assert_eq!(stream.scan_id(), "abc123");

        let first = stream.next_message().await.unwrap().unwrap();
        assert_eq!(first.progress, 40.0);
        assert_eq!(first.current_task, "Scanning forms");

        // The malformed frame in between is skipped, not fatal.
        let second = stream.next_message().await.unwrap().unwrap();
        assert_eq!(second.progress, 60.0);

        assert!(stream.next_message().await.is_none());
        assert!(!stream.is_open());
    }

    #[tokio::test]
    async fn test_progress_stream_close_is_idempotent() {
        let mut stream = ProgressStream {
            scan_id: "abc123".to_string(),
            ws: None,
        };

        stream.close().await;
        stream.close().await;
        assert!(!stream.is_open());
        assert!(stream.next_message().await.is_none());
    }

    #[test]
    fn test_ws_url_mirrors_http_scheme() {
        let client = ScannerClient::new("http://localhost:8001/");
        assert_eq!(client.ws_url("abc123"), "ws://localhost:8001/ws/abc123");

        let client = ScannerClient::new("https://scanner.internal");
        assert_eq!(client.ws_url("abc123"), "wss://scanner.internal/ws/abc123");

        let client = ScannerClient::new("http://localhost:8001")
            .with_ws_base_url("ws://stream.internal:9000/");
        assert_eq!(client.ws_url("abc123"), "ws://stream.internal:9000/ws/abc123");
    }
}
