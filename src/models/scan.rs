use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::models::results::ScanResults;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    Full,
    Urls,
    Login,
    Admin,
    ApiKeys,
    Wallet,
    Payment,
}

pub const SCAN_TYPE_NAMES: &[&str] = &[
    "full", "urls", "login", "admin", "api_keys", "wallet", "payment",
];

impl FromStr for ScanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(ScanType::Full),
            "urls" => Ok(ScanType::Urls),
            "login" => Ok(ScanType::Login),
            "admin" => Ok(ScanType::Admin),
            "api_keys" => Ok(ScanType::ApiKeys),
            "wallet" => Ok(ScanType::Wallet),
            "payment" => Ok(ScanType::Payment),
            other => Err(format!(
                "unknown scan option '{}' (valid options: {})",
                other,
                SCAN_TYPE_NAMES.join(", ")
            )),
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanType::Full => "full",
            ScanType::Urls => "urls",
            ScanType::Login => "login",
            ScanType::Admin => "admin",
            ScanType::ApiKeys => "api_keys",
            ScanType::Wallet => "wallet",
            ScanType::Payment => "payment",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ScanRequest {
    pub base_url: String,
    pub scan_options: Vec<ScanType>,
}

impl ScanRequest {
    // An empty selection means the backend should run everything.
    pub fn new(base_url: impl Into<String>, scan_options: Vec<ScanType>) -> Self {
        let scan_options = if scan_options.is_empty() {
            vec![ScanType::Full]
        } else {
            scan_options
        };

        Self {
            base_url: base_url.into(),
            scan_options,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Initializing,
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn parse(s: &str) -> Option<ScanStatus> {
        match s {
            "initializing" => Some(ScanStatus::Initializing),
            "running" => Some(ScanStatus::Running),
            "completed" => Some(ScanStatus::Completed),
            "failed" => Some(ScanStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Failed)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanStatus::Initializing => "initializing",
            ScanStatus::Running => "running",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

// One frame of the progress feed. The backend sends its full status record,
// so terminal frames also carry results or an error description.
#[derive(Debug, Deserialize, Clone)]
pub struct ProgressMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub progress: f32,
    #[serde(default)]
    pub current_task: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub results: Option<ScanResults>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StartScanResponse {
    pub scan_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanSummary {
    pub status: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub progress: f32,
}

pub type ScanListing = HashMap<String, ScanSummary>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_scan_options_default_to_full() {
        let request = ScanRequest::new("https://example.com", vec![]);
        assert_eq!(request.scan_options, vec![ScanType::Full]);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["scan_options"], serde_json::json!(["full"]));
    }

    #[test]
    fn test_scan_request_keeps_explicit_options() {
        let request = ScanRequest::new(
            "https://example.com",
            vec![ScanType::Urls, ScanType::ApiKeys],
        );

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["base_url"], "https://example.com");
        assert_eq!(json["scan_options"], serde_json::json!(["urls", "api_keys"]));
    }

    #[test]
    fn test_scan_type_round_trips_through_names() {
        for name in SCAN_TYPE_NAMES {
            let parsed: ScanType = name.parse().unwrap();
            assert_eq!(parsed.to_string(), *name);
        }
        assert!("everything".parse::<ScanType>().is_err());
    }

    #[test]
    fn test_status_parse_covers_known_states() {
        assert_eq!(ScanStatus::parse("initializing"), Some(ScanStatus::Initializing));
        assert_eq!(ScanStatus::parse("running"), Some(ScanStatus::Running));
        assert_eq!(ScanStatus::parse("completed"), Some(ScanStatus::Completed));
        assert_eq!(ScanStatus::parse("failed"), Some(ScanStatus::Failed));
        assert_eq!(ScanStatus::parse("paused"), None);
        assert!(ScanStatus::Completed.is_terminal());
        assert!(!ScanStatus::Running.is_terminal());
    }

    #[test]
    fn test_progress_message_tolerates_sparse_frames() {
        let message: ProgressMessage = serde_json::from_str(r#"{"status":"running"}"#).unwrap();
        assert_eq!(message.status, "running");
        assert_eq!(message.progress, 0.0);
        assert!(message.current_task.is_empty());
        assert!(message.results.is_none());
        assert!(message.error.is_none());
    }

    #[test]
    fn test_progress_message_carries_error_detail() {
        let message: ProgressMessage = serde_json::from_str(
            r#"{"id":"abc123","status":"failed","progress":40.0,"current_task":"Scanning forms","error":"timeout"}"#,
        )
        .unwrap();
        assert_eq!(message.id.as_deref(), Some("abc123"));
        assert_eq!(message.error.as_deref(), Some("timeout"));
    }
}
