pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Json(serde_json::Error),
    /// A frame could not be matched to any recognised shape for the dialect;
    /// carries the offending discriminator value for the once-per-value log.
    UnknownDiscriminator(String),
    Unsupported(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Json(err) => write!(f, "JSON decode error: {}", err),
            Error::UnknownDiscriminator(tag) => write!(f, "unknown discriminator: {}", tag),
            Error::Unsupported(what) => write!(f, "unsupported: {}", what),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(err) => Some(err),
            Error::UnknownDiscriminator(_) | Error::Unsupported(_) => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
