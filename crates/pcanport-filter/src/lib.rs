//! Receive filters for CAN channels.
//!
//! A [`FilterSpec`] is the declarative form found in configuration: an
//! acceptance code and mask, an inclusive identifier range, or a textual
//! `"<from> <to>"` hex range. [`compile`] checks a list of them and programs
//! the controller's acceptance filter bank, returning an [`AcceptanceSet`]
//! that answers the same admission question in software.
//!
//! The controller's filter bank is single-mode, so a list mixing standard and
//! extended specifications is rejected before any native call is made.

pub mod acceptance;
pub mod compiler;
pub mod error;
pub mod filter;

pub use acceptance::AcceptanceSet;
pub use compiler::{compile, validate};
pub use error::{FilterError, Result};
pub use filter::FilterSpec;
