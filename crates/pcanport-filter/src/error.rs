use pcanport_native::DriverError;

/// Errors that can occur while checking or programming filters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// Standard and extended filters were configured on the same channel.
    #[error("cannot mix standard and extended filters on one channel")]
    MixedModes,

    /// A filter names no usable format or carries out-of-range values.
    #[error("invalid filter specification: {0}")]
    InvalidSpecification(String),

    /// The controller rejected a filter programming call.
    #[error("filter programming failed: {0}")]
    Driver(#[from] DriverError),
}

pub type Result<T> = std::result::Result<T, FilterError>;
