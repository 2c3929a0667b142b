//! Hardware message layout.

/// Message type flag: standard 11-bit frame (no bits set).
pub const MESSAGE_STANDARD: u8 = 0x00;
/// Message type flag: remote transmission request.
pub const MESSAGE_RTR: u8 = 0x01;
/// Message type flag: extended 29-bit frame.
pub const MESSAGE_EXTENDED: u8 = 0x02;
/// Message type flag: CAN-FD frame.
pub const MESSAGE_FD: u8 = 0x04;
/// Message type flag: error frame.
pub const MESSAGE_ERRFRAME: u8 = 0x40;
/// Message type flag: status frame.
pub const MESSAGE_STATUS: u8 = 0x80;

/// Maximum data length of a classic CAN message.
pub const MAX_DATA_LEN: usize = 8;

/// A CAN message as the controller stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireFrame {
    /// Raw identifier.
    pub id: u32,
    /// Message type flags (`MESSAGE_*`).
    pub msg_type: u8,
    /// Number of valid bytes in `data`.
    pub len: u8,
    /// Data bytes; only the first `len` are meaningful.
    pub data: [u8; MAX_DATA_LEN],
}

impl WireFrame {
    /// The valid portion of the data buffer.
    ///
    /// A length above 8 is clamped so the slice is always in bounds.
    pub fn payload(&self) -> &[u8] {
        let len = usize::from(self.len).min(MAX_DATA_LEN);
        &self.data[..len]
    }

    /// True when the extended flag is set, whatever other flags accompany it.
    pub fn has_extended_flag(&self) -> bool {
        self.msg_type & MESSAGE_EXTENDED != 0
    }
}
