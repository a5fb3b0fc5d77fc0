/// Core error type for the archiver.
///
/// Adapter crates map their specific errors into this type so the driver can
/// tell fatal setup failures apart from per-item fetch failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not resolve conversation {target}: {reason}")]
    Lookup { target: String, reason: String },

    #[error("message source error: {0}")]
    Source(String),

    #[error("media fetch failed: {0}")]
    Fetch(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
