use std::fmt;

use pcanport_native::{CanDriver, ChannelHandle, StatusCode};
use tracing::{debug, warn};

/// Text reported for the no-error status.
pub const BUS_OK: &str = "Bus OK";

/// Bus status as seen by the port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub code: StatusCode,
    /// `"Bus OK"` for code 0, otherwise the driver's error text. Empty when
    /// the text lookup failed.
    pub text: String,
    pub is_error: bool,
}

impl StatusSnapshot {
    /// Describe a status code, looking up its text through the driver.
    ///
    /// A failed lookup is logged and leaves the text empty.
    pub fn describe<D>(driver: &D, code: StatusCode) -> Self
    where
        D: CanDriver + ?Sized,
    {
        if code.is_ok() {
            return Self {
                code,
                text: BUS_OK.to_string(),
                is_error: false,
            };
        }
        let text = match driver.error_text(code) {
            Ok(text) => text,
            Err(err) => {
                warn!(%code, error = %err, "status text lookup failed");
                String::new()
            }
        };
        Self {
            code,
            text,
            is_error: true,
        }
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}", self.text)
        }
    }
}

/// Tracks bus status and reports only changes.
///
/// The first observation always counts as a change.
#[derive(Debug, Default)]
pub struct StatusMonitor {
    current: Option<StatusSnapshot>,
}

impl StatusMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query the channel's status; returns a snapshot if it changed.
    pub fn poll<D>(&mut self, driver: &D, channel: ChannelHandle) -> Option<StatusSnapshot>
    where
        D: CanDriver + ?Sized,
    {
        let code = driver.status(channel);
        self.observe(driver, code)
    }

    /// Record a status code; returns a snapshot if it differs from the last.
    pub fn observe<D>(&mut self, driver: &D, code: StatusCode) -> Option<StatusSnapshot>
    where
        D: CanDriver + ?Sized,
    {
        if self.last_code() == Some(code) {
            return None;
        }
        let snapshot = StatusSnapshot::describe(driver, code);
        debug!(%code, text = %snapshot.text, "bus status changed");
        self.current = Some(snapshot.clone());
        Some(snapshot)
    }

    /// Last observed code, `None` before the first poll.
    pub fn last_code(&self) -> Option<StatusCode> {
        self.current.as_ref().map(|snapshot| snapshot.code)
    }

    pub fn current(&self) -> Option<&StatusSnapshot> {
        self.current.as_ref()
    }
}
