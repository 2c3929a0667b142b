//! PCAN CAN-bus adapter exposed as a stream of frames.
//!
//! # Crate Structure
//!
//! - [`native`] — Native controller surface ([`native::CanDriver`]) and the
//!   in-memory [`native::VirtualBus`]
//! - [`frame`] — Application frames and their controller encoding
//! - [`filter`] — Receive filter specifications and compilation
//! - [`port`] — Channel lifecycle and event stream (behind `port` feature)
//! - [`logging`] — Subscriber setup for programs (behind `logging` feature)

/// Re-export native types.
pub mod native {
    pub use pcanport_native::*;
}

/// Re-export frame types.
pub mod frame {
    pub use pcanport_frame::*;
}

/// Re-export filter types.
pub mod filter {
    pub use pcanport_filter::*;
}

/// Re-export port types (requires `port` feature).
#[cfg(feature = "port")]
pub mod port {
    pub use pcanport_port::*;
}

#[cfg(feature = "logging")]
pub mod logging;
