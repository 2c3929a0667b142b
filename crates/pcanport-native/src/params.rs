//! Channel parameters, bit-rate codes and filter modes.

use std::fmt;

/// Channel parameters accepted by `set_value` / `get_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// Receive-event handle registration.
    ReceiveEvent,
    /// Message filter state (open / closed).
    MessageFilter,
    /// Automatic reset after bus-off.
    BusoffAutoreset,
    /// Listen-only (silent) mode.
    ListenOnly,
    /// Whether the channel delivers received frames at all.
    ReceiveStatus,
    /// Packed 11-bit acceptance code and mask.
    AcceptanceFilter11Bit,
    /// Packed 29-bit acceptance code and mask.
    AcceptanceFilter29Bit,
}

impl Parameter {
    /// Native parameter number.
    pub fn code(self) -> u8 {
        match self {
            Self::ReceiveEvent => 0x03,
            Self::MessageFilter => 0x04,
            Self::BusoffAutoreset => 0x07,
            Self::ListenOnly => 0x08,
            Self::ReceiveStatus => 0x0F,
            Self::AcceptanceFilter11Bit => 0x22,
            Self::AcceptanceFilter29Bit => 0x23,
        }
    }

    /// Native parameter name.
    pub fn name(self) -> &'static str {
        match self {
            Self::ReceiveEvent => "PCAN_RECEIVE_EVENT",
            Self::MessageFilter => "PCAN_MESSAGE_FILTER",
            Self::BusoffAutoreset => "PCAN_BUSOFF_AUTORESET",
            Self::ListenOnly => "PCAN_LISTEN_ONLY",
            Self::ReceiveStatus => "PCAN_RECEIVE_STATUS",
            Self::AcceptanceFilter11Bit => "PCAN_ACCEPTANCE_FILTER_11BIT",
            Self::AcceptanceFilter29Bit => "PCAN_ACCEPTANCE_FILTER_29BIT",
        }
    }

    /// Size in bytes of the parameter's value buffer.
    pub fn value_len(self) -> usize {
        match self {
            Self::AcceptanceFilter11Bit | Self::AcceptanceFilter29Bit => 8,
            Self::ReceiveEvent => 4,
            _ => 1,
        }
    }
}

/// Parameter value: feature off.
pub const PARAMETER_OFF: u8 = 0x00;
/// Parameter value: feature on.
pub const PARAMETER_ON: u8 = 0x01;

/// A native bit-rate register code (BTR0/BTR1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Baudrate(pub u16);

impl Baudrate {
    pub const BAUD_1M: Self = Self(0x0014);
    pub const BAUD_800K: Self = Self(0x0016);
    pub const BAUD_500K: Self = Self(0x001C);
    pub const BAUD_250K: Self = Self(0x011C);
    pub const BAUD_125K: Self = Self(0x031C);
    pub const BAUD_100K: Self = Self(0x432F);
    pub const BAUD_95K: Self = Self(0xC34E);
    pub const BAUD_83K: Self = Self(0x852B);
    pub const BAUD_50K: Self = Self(0x472F);
    pub const BAUD_47K: Self = Self(0x1414);
    pub const BAUD_33K: Self = Self(0x8B2F);
    pub const BAUD_20K: Self = Self(0x532F);
    pub const BAUD_10K: Self = Self(0x672F);
    pub const BAUD_5K: Self = Self(0x7F7F);

    /// Translate a rate in bits per second into its register code.
    ///
    /// Returns `None` for rates the controller cannot run at.
    pub fn from_bit_rate(bits_per_second: u32) -> Option<Self> {
        BIT_RATES
            .iter()
            .find(|(rate, _)| *rate == bits_per_second)
            .map(|(_, code)| *code)
    }

    /// The rate in bits per second this code selects, if it is a standard code.
    pub fn bit_rate(self) -> Option<u32> {
        BIT_RATES
            .iter()
            .find(|(_, code)| *code == self)
            .map(|(rate, _)| *rate)
    }

    /// All supported rates in bits per second, fastest first.
    pub fn supported_rates() -> impl Iterator<Item = u32> {
        BIT_RATES.iter().map(|(rate, _)| *rate)
    }
}

impl fmt::Display for Baudrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bit_rate() {
            Some(rate) => write!(f, "{rate} bit/s (0x{:04X})", self.0),
            None => write!(f, "0x{:04X}", self.0),
        }
    }
}

const BIT_RATES: &[(u32, Baudrate)] = &[
    (1_000_000, Baudrate::BAUD_1M),
    (800_000, Baudrate::BAUD_800K),
    (500_000, Baudrate::BAUD_500K),
    (250_000, Baudrate::BAUD_250K),
    (125_000, Baudrate::BAUD_125K),
    (100_000, Baudrate::BAUD_100K),
    (95_000, Baudrate::BAUD_95K),
    (83_000, Baudrate::BAUD_83K),
    (50_000, Baudrate::BAUD_50K),
    (47_000, Baudrate::BAUD_47K),
    (33_000, Baudrate::BAUD_33K),
    (20_000, Baudrate::BAUD_20K),
    (10_000, Baudrate::BAUD_10K),
    (5_000, Baudrate::BAUD_5K),
];

/// Identifier width used by the native range filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// 11-bit identifiers.
    Standard,
    /// 29-bit identifiers.
    Extended,
}

impl FilterMode {
    /// Native mode value.
    pub fn code(self) -> u8 {
        match self {
            Self::Standard => 0x00,
            Self::Extended => 0x02,
        }
    }

    /// Mode matching an extended flag.
    pub fn for_extended(extended: bool) -> Self {
        if extended {
            Self::Extended
        } else {
            Self::Standard
        }
    }

    /// True for the 29-bit mode.
    pub fn is_extended(self) -> bool {
        self == Self::Extended
    }

    /// Highest identifier representable in this mode.
    pub fn max_id(self) -> u32 {
        match self {
            Self::Standard => MAX_STANDARD_ID,
            Self::Extended => MAX_EXTENDED_ID,
        }
    }
}

/// Highest 11-bit identifier.
pub const MAX_STANDARD_ID: u32 = 0x7FF;
/// Highest 29-bit identifier.
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

/// Pack an acceptance code and mask into the native 64-bit filter word.
///
/// `mask` bits set to 1 are compared against `code`. The controller wants the
/// opposite polarity in the low word, so the mask is inverted here.
pub fn acceptance_word(code: u32, mask: u32) -> u64 {
    (u64::from(code) << 32) | u64::from(!mask)
}

/// Inverse of [`acceptance_word`]: returns `(code, mask)`.
pub fn split_acceptance_word(word: u64) -> (u32, u32) {
    let code = (word >> 32) as u32;
    let mask = !(word as u32);
    (code, mask)
}
