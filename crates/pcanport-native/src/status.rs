//! Native status codes.
//!
//! Status codes are bit values; the bus-state codes in particular may be
//! combined by the controller. `0` always means no error.

use std::fmt;

/// A native status code as returned by every driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(pub u32);

impl StatusCode {
    pub const OK: Self = Self(0x00000);
    pub const XMTFULL: Self = Self(0x00001);
    pub const OVERRUN: Self = Self(0x00002);
    pub const BUSLIGHT: Self = Self(0x00004);
    pub const BUSHEAVY: Self = Self(0x00008);
    pub const BUSWARNING: Self = Self::BUSHEAVY;
    pub const BUSPASSIVE: Self = Self(0x40000);
    pub const BUSOFF: Self = Self(0x00010);
    pub const ANYBUSERR: Self = Self(
        Self::BUSWARNING.0 | Self::BUSLIGHT.0 | Self::BUSHEAVY.0 | Self::BUSOFF.0 | Self::BUSPASSIVE.0,
    );
    pub const QRCVEMPTY: Self = Self(0x00020);
    pub const QOVERRUN: Self = Self(0x00040);
    pub const QXMTFULL: Self = Self(0x00080);
    pub const REGTEST: Self = Self(0x00100);
    pub const NODRIVER: Self = Self(0x00200);
    pub const HWINUSE: Self = Self(0x00400);
    pub const NETINUSE: Self = Self(0x00800);
    pub const ILLHW: Self = Self(0x01400);
    pub const ILLNET: Self = Self(0x01800);
    pub const ILLCLIENT: Self = Self(0x01C00);
    pub const ILLHANDLE: Self = Self(Self::ILLHW.0 | Self::ILLNET.0 | Self::ILLCLIENT.0);
    pub const RESOURCE: Self = Self(0x02000);
    pub const ILLPARAMTYPE: Self = Self(0x04000);
    pub const ILLPARAMVAL: Self = Self(0x08000);
    pub const UNKNOWN: Self = Self(0x10000);
    pub const ILLDATA: Self = Self(0x20000);
    pub const ILLMODE: Self = Self(0x80000);
    pub const CAUTION: Self = Self(0x2000000);
    pub const INITIALIZE: Self = Self(0x4000000);
    pub const ILLOPERATION: Self = Self(0x8000000);

    /// True for the no-error code.
    pub fn is_ok(self) -> bool {
        self == Self::OK
    }

    /// Symbolic name, or `"Status unknown"` for codes outside the table.
    pub fn name(self) -> &'static str {
        lookup(self).map_or(UNKNOWN_NAME, |entry| entry.1)
    }

    /// Human-readable description, if the code is a known single status.
    pub fn description(self) -> Option<&'static str> {
        lookup(self).map(|entry| entry.2)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:05X})", self.name(), self.0)
    }
}

const UNKNOWN_NAME: &str = "Status unknown";

// ILLHANDLE shares its value with the combination of the ILL* hardware codes,
// so only the combined name is listed.
const STATUSES: &[(StatusCode, &str, &str)] = &[
    (StatusCode::OK, "PCAN_ERROR_OK", "No error"),
    (
        StatusCode::XMTFULL,
        "PCAN_ERROR_XMTFULL",
        "Transmit buffer in CAN controller is full",
    ),
    (
        StatusCode::OVERRUN,
        "PCAN_ERROR_OVERRUN",
        "CAN controller was read too late",
    ),
    (
        StatusCode::BUSLIGHT,
        "PCAN_ERROR_BUSLIGHT",
        "Bus error: an error counter reached the 'light' limit",
    ),
    (
        StatusCode::BUSHEAVY,
        "PCAN_ERROR_BUSHEAVY",
        "Bus error: an error counter reached the 'heavy' limit",
    ),
    (
        StatusCode::BUSPASSIVE,
        "PCAN_ERROR_BUSPASSIVE",
        "Bus error: the CAN controller is error passive",
    ),
    (
        StatusCode::BUSOFF,
        "PCAN_ERROR_BUSOFF",
        "Bus error: the CAN controller is in bus-off state",
    ),
    (
        StatusCode::ANYBUSERR,
        "PCAN_ERROR_ANYBUSERR",
        "Mask for all bus errors",
    ),
    (
        StatusCode::QRCVEMPTY,
        "PCAN_ERROR_QRCVEMPTY",
        "Receive queue is empty",
    ),
    (
        StatusCode::QOVERRUN,
        "PCAN_ERROR_QOVERRUN",
        "Receive queue was read too late",
    ),
    (
        StatusCode::QXMTFULL,
        "PCAN_ERROR_QXMTFULL",
        "Transmit queue is full",
    ),
    (
        StatusCode::REGTEST,
        "PCAN_ERROR_REGTEST",
        "Test of the CAN controller hardware registers failed",
    ),
    (
        StatusCode::NODRIVER,
        "PCAN_ERROR_NODRIVER",
        "Driver not loaded",
    ),
    (
        StatusCode::HWINUSE,
        "PCAN_ERROR_HWINUSE",
        "Hardware already in use by a net",
    ),
    (
        StatusCode::NETINUSE,
        "PCAN_ERROR_NETINUSE",
        "A client is already connected to the net",
    ),
    (
        StatusCode::ILLHW,
        "PCAN_ERROR_ILLHW",
        "Hardware handle is invalid",
    ),
    (
        StatusCode::ILLNET,
        "PCAN_ERROR_ILLNET",
        "Net handle is invalid",
    ),
    (
        StatusCode::ILLCLIENT,
        "PCAN_ERROR_ILLHANDLE",
        "Client or channel handle is invalid",
    ),
    (
        StatusCode::RESOURCE,
        "PCAN_ERROR_RESOURCE",
        "Resource (FIFO, client, timeout) cannot be created",
    ),
    (
        StatusCode::ILLPARAMTYPE,
        "PCAN_ERROR_ILLPARAMTYPE",
        "Invalid parameter",
    ),
    (
        StatusCode::ILLPARAMVAL,
        "PCAN_ERROR_ILLPARAMVAL",
        "Invalid parameter value",
    ),
    (StatusCode::UNKNOWN, "PCAN_ERROR_UNKNOWN", "Unknown error"),
    (
        StatusCode::ILLDATA,
        "PCAN_ERROR_ILLDATA",
        "Invalid data, function, or action",
    ),
    (
        StatusCode::ILLMODE,
        "PCAN_ERROR_ILLMODE",
        "Driver object state is wrong for the attempted operation",
    ),
    (
        StatusCode::CAUTION,
        "PCAN_ERROR_CAUTION",
        "An operation was successfully carried out, however, irregularities were registered",
    ),
    (
        StatusCode::INITIALIZE,
        "PCAN_ERROR_INITIALIZE",
        "Channel is not initialized",
    ),
    (
        StatusCode::ILLOPERATION,
        "PCAN_ERROR_ILLOPERATION",
        "Invalid operation",
    ),
];

fn lookup(code: StatusCode) -> Option<&'static (StatusCode, &'static str, &'static str)> {
    STATUSES.iter().find(|entry| entry.0 == code)
}
