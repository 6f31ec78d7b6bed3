use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("prost encode error: {0}")]
    ProtoEncode(#[from] prost::EncodeError),
    #[error("prost decode error: {0}")]
    ProtoDecode(#[from] prost::DecodeError),
    #[error("recipe snapshot unavailable at {path:?}: {reason}")]
    StorageUnavailable { path: PathBuf, reason: String },
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("other: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RecError>;

impl RecError {
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn storage_unavailable<P: Into<PathBuf>>(path: P, err: impl ToString) -> Self {
        Self::StorageUnavailable {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}

impl From<anyhow::Error> for RecError {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(value.to_string())
    }
}
