//! Native capability surface of a PCAN-style CAN controller.
//!
//! This is the lowest layer of pcanport. It defines:
//! - the [`CanDriver`] trait, one synchronous call per native operation
//! - status codes, channel parameters and bit-rate codes
//! - the hardware message layout ([`WireFrame`])
//! - [`VirtualBus`], an in-memory bus used for tests and demos
//!
//! Everything else builds on the [`CanDriver`] trait.

pub mod acceptance;
pub mod driver;
pub mod error;
pub mod params;
pub mod status;
pub mod virtual_bus;
pub mod wire;

pub use acceptance::{bank_admits, AcceptanceRule};
pub use driver::{CanDriver, ChannelHandle, ChannelInfo, EventCallback};
pub use error::{DriverError, Result};
pub use params::{Baudrate, FilterMode, Parameter};
pub use status::StatusCode;
pub use virtual_bus::{DriverCall, VirtualBus};
pub use wire::WireFrame;
