use thiserror::Error;

// Every error is terminal for the current scan attempt; nothing is retried.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid scan target: {0}")]
    Validation(String),

    #[error("server error {status}: {details}")]
    Server { status: u16, details: String },

    #[error("connection error: {0}")]
    Transport(String),

    #[error("export failed: {0}")]
    Export(String),
}

impl ClientError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}
