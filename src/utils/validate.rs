use reqwest::Url;

use crate::errors::ClientError;

// The target must be an absolute http(s) URL with a host. Checked before
// anything touches the network.
pub fn parse_target_url(raw: &str) -> Result<Url, ClientError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| {
        ClientError::Validation(format!("'{}' is not a valid URL: {}", trimmed, e))
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ClientError::Validation(format!(
                "unsupported URL scheme '{}': expected http or https",
                other
            )));
        }
    }

    if url.host_str().is_none() {
        return Err(ClientError::Validation(format!(
            "'{}' has no host",
            trimmed
        )));
    }

    Ok(url)
}
