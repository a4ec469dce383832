pub type Result<T> = std::result::Result<T, Error>;

/// Engine-only terminal conditions, plus the failure modes of the
/// external collaborators this crate only specifies as traits.
#[derive(Debug)]
pub enum Error {
    FetchOrigin(String),
    Worktree(String),
    GitHub(String),
    Scan(String),
    Session(fleetline_runtime::Error),
    InvalidTransition(fleetline_types::issue::InvalidTransition),
    BudgetExceeded { spent_usd: f64, budget_usd: f64 },
    TimeExceeded,
    MaxIterationsReached(u32),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::FetchOrigin(msg) => write!(f, "failed to fetch origin: {msg}"),
            Error::Worktree(msg) => write!(f, "worktree error: {msg}"),
            Error::GitHub(msg) => write!(f, "GitHub error: {msg}"),
            Error::Scan(msg) => write!(f, "CI scan error: {msg}"),
            Error::Session(err) => write!(f, "session error: {err}"),
            Error::InvalidTransition(err) => write!(f, "{err}"),
            Error::BudgetExceeded { spent_usd, budget_usd } => {
                write!(f, "budget exceeded: spent ${spent_usd:.2} of ${budget_usd:.2}")
            }
            Error::TimeExceeded => write!(f, "time budget exceeded"),
            Error::MaxIterationsReached(n) => write!(f, "max iterations reached: {n}"),
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Session(err) => Some(err),
            Error::InvalidTransition(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<fleetline_runtime::Error> for Error {
    fn from(err: fleetline_runtime::Error) -> Self {
        Error::Session(err)
    }
}

impl From<fleetline_types::issue::InvalidTransition> for Error {
    fn from(err: fleetline_types::issue::InvalidTransition) -> Self {
        Error::InvalidTransition(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
