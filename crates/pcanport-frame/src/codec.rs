use bytes::Bytes;
use pcanport_native::params::{MAX_EXTENDED_ID, MAX_STANDARD_ID};
use pcanport_native::wire::{MAX_DATA_LEN, MESSAGE_EXTENDED, MESSAGE_STANDARD};
use pcanport_native::WireFrame;

use crate::error::{FrameError, Result};

/// Largest payload a classic CAN frame carries.
pub const MAX_PAYLOAD: usize = MAX_DATA_LEN;

/// An application-level CAN frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    /// Identifier; 11-bit for standard frames, 29-bit for extended ones.
    pub id: u32,
    /// Whether the identifier is extended.
    pub ext: bool,
    /// Payload, 0 to 8 bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(id: u32, ext: bool, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            ext,
            payload: payload.into(),
        }
    }

    /// A standard (11-bit) frame.
    pub fn standard(id: u32, payload: impl Into<Bytes>) -> Self {
        Self::new(id, false, payload)
    }

    /// An extended (29-bit) frame.
    pub fn extended(id: u32, payload: impl Into<Bytes>) -> Self {
        Self::new(id, true, payload)
    }
}

/// Encode a frame into the controller's message layout.
///
/// Fails before anything reaches hardware if the payload exceeds
/// [`MAX_PAYLOAD`] or the identifier does not fit its width.
pub fn encode(frame: &Frame) -> Result<WireFrame> {
    let len = frame.payload.len();
    if len > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLong {
            len,
            max: MAX_PAYLOAD,
        });
    }
    let max_id = if frame.ext {
        MAX_EXTENDED_ID
    } else {
        MAX_STANDARD_ID
    };
    if frame.id > max_id {
        return Err(FrameError::IdOutOfRange {
            id: frame.id,
            extended: frame.ext,
        });
    }

    let mut data = [0u8; MAX_DATA_LEN];
    data[..len].copy_from_slice(&frame.payload);
    Ok(WireFrame {
        id: frame.id,
        msg_type: if frame.ext {
            MESSAGE_EXTENDED
        } else {
            MESSAGE_STANDARD
        },
        len: len as u8,
        data,
    })
}

/// Decode a controller message into a frame.
///
/// `ext` is set only when the type is exactly `MESSAGE_EXTENDED`; any other
/// combination of flags (remote request, status, error frames) decodes as a
/// standard frame. Never fails.
pub fn decode(wire: &WireFrame) -> Frame {
    Frame {
        id: wire.id,
        ext: wire.msg_type == MESSAGE_EXTENDED,
        payload: Bytes::copy_from_slice(wire.payload()),
    }
}

#[cfg(test)]
mod tests {
    use pcanport_native::wire::{MESSAGE_RTR, MESSAGE_STATUS};

    use super::*;

    #[test]
    fn standard_and_extended_round_trip() {
        let frames = [
            Frame::standard(0x100, Bytes::new()),
            Frame::standard(0x7FF, vec![0xDE, 0xAD]),
            Frame::extended(0x10EF_8081, vec![1, 2, 3, 4, 5, 6, 7, 8]),
            Frame::extended(0, vec![0xFF]),
        ];
        for frame in frames {
            let wire = encode(&frame).expect("encode");
            assert_eq!(decode(&wire), frame);
        }
    }

    #[test]
    fn encode_sets_type_and_length() {
        let wire = encode(&Frame::extended(0x18FF_1234, vec![9, 8, 7])).unwrap();
        assert_eq!(wire.msg_type, MESSAGE_EXTENDED);
        assert_eq!(wire.len, 3);
        assert_eq!(wire.data, [9, 8, 7, 0, 0, 0, 0, 0]);

        let wire = encode(&Frame::standard(0x1, Bytes::new())).unwrap();
        assert_eq!(wire.msg_type, MESSAGE_STANDARD);
        assert_eq!(wire.len, 0);
    }

    #[test]
    fn payload_boundary() {
        assert!(encode(&Frame::standard(0x1, vec![0; 8])).is_ok());
        let err = encode(&Frame::standard(0x1, vec![0; 9])).unwrap_err();
        assert_eq!(err, FrameError::PayloadTooLong { len: 9, max: 8 });
    }

    #[test]
    fn identifier_width_is_checked() {
        assert!(encode(&Frame::standard(0x7FF, Bytes::new())).is_ok());
        assert!(matches!(
            encode(&Frame::standard(0x800, Bytes::new())),
            Err(FrameError::IdOutOfRange {
                id: 0x800,
                extended: false
            })
        ));
        assert!(encode(&Frame::extended(0x1FFF_FFFF, Bytes::new())).is_ok());
        assert!(encode(&Frame::extended(0x2000_0000, Bytes::new())).is_err());
    }

    #[test]
    fn other_type_flags_decode_as_standard() {
        for msg_type in [
            MESSAGE_RTR,
            MESSAGE_EXTENDED | MESSAGE_RTR,
            MESSAGE_STATUS,
        ] {
            let wire = WireFrame {
                id: 0x55,
                msg_type,
                len: 1,
                data: [0x42, 0, 0, 0, 0, 0, 0, 0],
            };
            let frame = decode(&wire);
            assert!(!frame.ext, "type 0x{msg_type:02X}");
            assert_eq!(frame.payload.as_ref(), &[0x42]);
        }
    }

    #[test]
    fn decode_clamps_bad_length() {
        let wire = WireFrame {
            id: 0x1,
            msg_type: MESSAGE_STANDARD,
            len: 12,
            data: [1; 8],
        };
        assert_eq!(decode(&wire).payload.len(), MAX_PAYLOAD);
    }
}
