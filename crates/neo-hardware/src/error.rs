use thiserror::Error;

/// Hardware layer errors.
#[derive(Error, Debug)]
pub enum HardwareError {
    /// The servo board could not be opened.
    #[error("servo bus unavailable at {device}: {source}")]
    BusUnavailable {
        device: String,
        #[source]
        source: std::io::Error,
    },
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    /// A command was sent after [`ServoBus::close`](crate::ServoBus::close).
    #[error("servo bus is closed")]
    Closed,
    #[error("invalid servo pin {0}")]
    InvalidPin(u8),
}
