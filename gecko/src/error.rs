use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeckoError {
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed response ({shape}): {detail}")]
    Malformed { detail: String, shape: String },

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl GeckoError {
    /// True when the API answered but the body could not be decoded.
    ///
    /// Callers recover from malformed bodies exactly like transport failures;
    /// the distinction only matters for diagnostics.
    pub fn is_malformed(&self) -> bool {
        matches!(self, GeckoError::Malformed { .. })
    }
}

pub type Result<T> = std::result::Result<T, GeckoError>;
