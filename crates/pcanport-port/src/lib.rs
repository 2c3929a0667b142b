//! A single PCAN channel as a stream of CAN frames.
//!
//! [`Port`] owns one channel for its open lifetime. Opening initializes the
//! channel, programs the configured filters and arms the driver's receive
//! event. Each event drains the controller's receive queue into
//! [`PortEvent::Data`], then checks the bus status and reports changes as
//! [`PortEvent::Status`].

pub mod config;
pub mod error;
pub mod event;
pub mod port;
pub mod status;

pub use config::{PortConfig, DEFAULT_CAN_RATE};
pub use error::{ConfigError, ErrorInfo, ErrorKind, LifecycleError, PortError, Result};
pub use event::{CloseReason, PortEvent, PortEvents};
pub use port::{Port, PortDescriptor, PortState};
pub use status::{StatusMonitor, StatusSnapshot, BUS_OK};
