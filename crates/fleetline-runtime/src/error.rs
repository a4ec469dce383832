pub type Result<T> = std::result::Result<T, Error>;

/// Frame/request-local kinds are recovered from by the Session itself;
/// the rest are session-fatal and escalate to the Manager.
#[derive(Debug)]
pub enum Error {
    /// The child process could not be spawned.
    ProcessSpawn(std::io::Error),
    /// `Start`/`WriteFrame` called before the Supervisor was started.
    NotStarted,
    /// A second `Start` was attempted on an already-started Supervisor.
    AlreadyStarted,
    /// `WriteFrame` called after `Stop` was initiated.
    Stopping,
    /// The child exited (or stdout closed) mid-turn; carries the captured
    /// stderr tail.
    ChildExited { stderr_tail: String },
    /// A single line exceeded the codec's maximum frame size; the session
    /// continues, this only drops the one frame.
    FrameTooLarge { len: usize },
    /// The decoder could not parse a frame at all (distinct from an unknown
    /// discriminator, which decodes fine but isn't recognised).
    DecodeFrame(fleetline_providers::error::Error),
    /// An inbound-request handler returned an error; converted to a
    /// deny/JSON-RPC-error response by the Correlator, session continues.
    Handler(String),
    /// An outbound request outlived the session.
    CorrelationTimeout,
    /// The session's context was cancelled.
    Cancelled,
    /// No dialect is registered for the requested agent.
    UnknownDialect(String),
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ProcessSpawn(err) => write!(f, "failed to spawn agent process: {err}"),
            Error::NotStarted => write!(f, "supervisor not started"),
            Error::AlreadyStarted => write!(f, "supervisor already started"),
            Error::Stopping => write!(f, "supervisor is stopping"),
            Error::ChildExited { stderr_tail } => {
                write!(f, "child process exited unexpectedly: {stderr_tail}")
            }
            Error::FrameTooLarge { len } => write!(f, "frame too large: {len} bytes"),
            Error::DecodeFrame(err) => write!(f, "failed to decode frame: {err}"),
            Error::Handler(msg) => write!(f, "request handler error: {msg}"),
            Error::CorrelationTimeout => write!(f, "outbound request outlived its session"),
            Error::Cancelled => write!(f, "cancelled"),
            Error::UnknownDialect(name) => write!(f, "unknown agent dialect: {name}"),
            Error::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ProcessSpawn(err) | Error::Io(err) => Some(err),
            Error::DecodeFrame(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<fleetline_providers::error::Error> for Error {
    fn from(err: fleetline_providers::error::Error) -> Self {
        Error::DecodeFrame(err)
    }
}
