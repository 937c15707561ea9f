pub type FixtureResult<T> = Result<T, FixtureError>;

#[derive(thiserror::Error, Debug)]
pub enum FixtureError {
    /// The template movie contains no bootstrap (DoAbc) tag.
    #[error("bootstrap program not found in template movie")]
    BootstrapNotFound,

    #[error("invalid capture path: {0}")]
    InvalidPath(String),

    #[error("invalid capture width: {0}")]
    InvalidWidth(String),

    #[error("invalid capture height: {0}")]
    InvalidHeight(String),

    #[error("invalid capture body: expected {expected} bytes, got {actual}")]
    InvalidBody { expected: u64, actual: u64 },

    #[error("capture server error: {0}")]
    Server(String),

    #[error("renderer error: {0}")]
    Renderer(String),

    #[error("renderer timed out after {0:?}")]
    RendererTimeout(std::time::Duration),

    #[error("renderer exited before delivering a capture")]
    RendererExited,

    #[error("codec error: {0}")]
    Codec(String),

    #[error("document error: {0}")]
    Document(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FixtureError {
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    pub fn invalid_width(msg: impl Into<String>) -> Self {
        Self::InvalidWidth(msg.into())
    }

    pub fn invalid_height(msg: impl Into<String>) -> Self {
        Self::InvalidHeight(msg.into())
    }

    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    pub fn renderer(msg: impl Into<String>) -> Self {
        Self::Renderer(msg.into())
    }

    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document(msg.into())
    }

    /// True for errors that reject a single capture request (HTTP 500)
    /// without tearing the listener down.
    pub fn is_request_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidPath(_)
                | Self::InvalidWidth(_)
                | Self::InvalidHeight(_)
                | Self::InvalidBody { .. }
        )
    }
}
