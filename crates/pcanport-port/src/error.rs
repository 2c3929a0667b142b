use pcanport_filter::FilterError;
use pcanport_frame::FrameError;
use pcanport_native::DriverError;
use serde::Serialize;

/// Invalid port configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested bit rate has no controller timing code.
    #[error("unsupported CAN rate {0} bit/s")]
    UnsupportedRate(u32),

    /// A filter is malformed or the list mixes identifier widths.
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    /// The configuration document could not be parsed.
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// An operation was invoked in a state that does not allow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("CAN port is not open")]
    NotOpen,

    #[error("CAN port is already open")]
    AlreadyOpen,

    /// Opening failed part way; the port must be closed.
    #[error("CAN port is faulted; close it before further use")]
    Faulted,

    /// The port was closed; a new port is required.
    #[error("CAN port was closed and cannot be reopened")]
    Retired,
}

/// Errors that can occur in port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// The frame cannot be sent as a classic CAN frame.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A native call failed while opening, closing or querying the channel.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    /// The native write failed. The port stays open.
    #[error("hardware write failed: {0}")]
    Write(DriverError),
}

impl From<FilterError> for PortError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::Driver(err) => Self::Driver(err),
            other => Self::Config(ConfigError::Filter(other)),
        }
    }
}

impl PortError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Lifecycle(_) => ErrorKind::Lifecycle,
            Self::Frame(FrameError::PayloadTooLong { .. }) => ErrorKind::PayloadTooLong,
            Self::Frame(_) => ErrorKind::InvalidFrame,
            Self::Driver(_) | Self::Write(_) => ErrorKind::Hardware,
        }
    }

    /// Cloneable rendering for event observers.
    pub fn info(&self) -> ErrorInfo {
        ErrorInfo {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Error categories reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Lifecycle,
    PayloadTooLong,
    InvalidFrame,
    Hardware,
}

/// A failure as delivered through [`PortEvent::Error`](crate::PortEvent::Error).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, PortError>;
