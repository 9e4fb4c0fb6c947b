use std::io;

pub type Result<T> = std::result::Result<T, PagerError>;

/// Errors surfaced at the edges of the pager: viewport validation, content
/// loading and the persisted settings/progress files.
///
/// The pagination passes themselves never fail; lookups that find nothing
/// return `None` and structural transforms that don't match return an empty
/// result.
#[derive(Debug, thiserror::Error)]
pub enum PagerError {
    #[error("invalid viewport {width}x{height}: both sides must be positive")]
    InvalidViewport { width: f64, height: f64 },

    #[error("content error: {detail}")]
    Content { detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("settings file is malformed: {0}")]
    Settings(#[from] serde_yaml::Error),

    #[error("progress file is malformed: {0}")]
    Progress(#[from] serde_json::Error),
}

impl PagerError {
    pub fn content(msg: impl Into<String>) -> Self {
        Self::Content { detail: msg.into() }
    }
}
