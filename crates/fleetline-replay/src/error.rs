pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// The first line of the log didn't match any known dialect or envelope
    /// shape.
    UnrecognisedFormat(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnrecognisedFormat(msg) => write!(f, "unrecognised log format: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
