/// Errors that can occur while encoding a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit a classic CAN frame.
    #[error("payload too long ({len} bytes, max {max})")]
    PayloadTooLong { len: usize, max: usize },

    /// The identifier does not fit the frame's identifier width.
    #[error("identifier 0x{id:X} exceeds {} range", width(.extended))]
    IdOutOfRange { id: u32, extended: bool },
}

fn width(extended: &bool) -> &'static str {
    if *extended {
        "29-bit"
    } else {
        "11-bit"
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
