use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::params::{acceptance_word, Baudrate, FilterMode, Parameter};
use crate::status::StatusCode;
use crate::wire::WireFrame;

/// Handle of a hardware channel (`PCAN_USBBUS1` is `0x51`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelHandle(pub u16);

impl ChannelHandle {
    /// First USB channel.
    pub const USBBUS1: Self = Self(0x51);
}

impl fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Device type reported for USB adapters.
pub const DEVICE_TYPE_USB: u8 = 0x05;

/// Channel condition: available to be initialized.
pub const CHANNEL_AVAILABLE: u32 = 0x01;
/// Channel condition: in use by another client.
pub const CHANNEL_OCCUPIED: u32 = 0x02;

/// Description of one channel as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub channel_handle: ChannelHandle,
    pub device_type: u8,
    pub controller_number: u8,
    pub device_features: u32,
    pub device_name: String,
    pub device_id: u32,
    pub channel_condition: u32,
}

/// Callback invoked by the driver when a channel has pending receive events.
///
/// Drivers may call it from any thread and must not hold internal locks while
/// doing so; the callback reads the channel back through the same driver.
pub type EventCallback = Arc<dyn Fn() + Send + Sync>;

/// The native capability surface of a CAN controller.
///
/// Every call is synchronous and keyed by channel handle. Implementations are
/// shared between the caller and the event callback, hence `Send + Sync`.
pub trait CanDriver: Send + Sync {
    /// Whether receive delivery must be switched off while a channel is
    /// configured and switched back on afterwards.
    fn needs_receive_toggle(&self) -> bool {
        false
    }

    /// Describe the channels attached to the system.
    fn channel_info(&self) -> Result<Vec<ChannelInfo>>;

    /// Bring a channel up at the given bit rate.
    fn initialize(&self, channel: ChannelHandle, baudrate: Baudrate) -> Result<()>;

    /// Release a channel.
    fn uninitialize(&self, channel: ChannelHandle) -> Result<()>;

    /// Clear the channel's queues and reset the controller.
    fn reset(&self, channel: ChannelHandle) -> Result<()>;

    /// Current bus status.
    fn status(&self, channel: ChannelHandle) -> StatusCode;

    /// Pop the oldest received message.
    ///
    /// An empty queue is reported as a `QRCVEMPTY` status error.
    fn read(&self, channel: ChannelHandle) -> Result<WireFrame>;

    /// Queue a message for transmission.
    fn write(&self, channel: ChannelHandle, frame: &WireFrame) -> Result<()>;

    /// Set a channel parameter.
    fn set_value(&self, channel: ChannelHandle, param: Parameter, value: &[u8]) -> Result<()>;

    /// Read a channel parameter.
    fn get_value(&self, channel: ChannelHandle, param: Parameter) -> Result<Vec<u8>>;

    /// Admit an inclusive identifier range through the acceptance filter.
    fn filter_messages(
        &self,
        channel: ChannelHandle,
        from: u32,
        to: u32,
        mode: FilterMode,
    ) -> Result<()>;

    /// Program the 11-bit acceptance code and mask.
    fn acceptance_filter_11bit(&self, channel: ChannelHandle, code: u32, mask: u32) -> Result<()> {
        let word = acceptance_word(code, mask);
        self.set_value(channel, Parameter::AcceptanceFilter11Bit, &word.to_le_bytes())
    }

    /// Program the 29-bit acceptance code and mask.
    fn acceptance_filter_29bit(&self, channel: ChannelHandle, code: u32, mask: u32) -> Result<()> {
        let word = acceptance_word(code, mask);
        self.set_value(channel, Parameter::AcceptanceFilter29Bit, &word.to_le_bytes())
    }

    /// Human-readable text for a status code.
    fn error_text(&self, code: StatusCode) -> Result<String>;

    /// Register the receive-event callback for a channel.
    fn enable_event(&self, channel: ChannelHandle, callback: EventCallback) -> Result<()>;

    /// Remove the receive-event callback for a channel.
    fn disable_event(&self, channel: ChannelHandle) -> Result<()>;
}
