/// Core error type.
///
/// The adapter crate maps its client-specific errors into `Transport` so the
/// retrieval logic can treat transport failures uniformly.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing credentials: session file, api id and api hash are all required")]
    MissingCredentials,

    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A per-item failure tagged with the offending work item's index.
    /// Only the runner's abort path produces this.
    #[error("item {index}: {source}")]
    Item {
        index: usize,
        #[source]
        source: Box<Error>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
