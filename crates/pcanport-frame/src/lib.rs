//! Conversion between application CAN frames and the controller's message
//! layout.
//!
//! A [`Frame`] carries an identifier, an extended flag and up to 8 payload
//! bytes. Encoding maps the extended flag onto the `MESSAGE_EXTENDED` type bit;
//! decoding maps that bit back and drops every other type flag, including the
//! remote-request bit.

pub mod codec;
pub mod error;

pub use codec::{decode, encode, Frame, MAX_PAYLOAD};
pub use error::{FrameError, Result};
