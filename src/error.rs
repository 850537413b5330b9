use thiserror::Error;

/// Error taxonomy for the asset decoding pipeline. Every variant here is
/// fatal for the decode that raised it, except where noted on the call
/// site (`UnknownFaceType` is caught and retried by the WEP/SHP face
/// section parser; it only escapes here if the v2 retry also fails).
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("read past end of buffer: wanted {wanted} bytes at offset {offset}, buffer is {len} bytes")]
    OutOfBounds { offset: usize, wanted: usize, len: usize },

    #[error("constant mismatch at offset {offset}: expected {expected:02x?}, got {actual:02x?}")]
    ConstantMismatch { offset: usize, expected: Vec<u8>, actual: Vec<u8> },

    #[error("u32 field at offset {offset} had its sign bit set: {value:#010x}")]
    Overflow { offset: usize, value: u32 },

    #[error("unknown face type byte {0:#04x}")]
    UnknownFaceType(u8),

    #[error("SEQ slot {slot} out of range (animation count {animation_count})")]
    InvalidSlot { slot: u8, animation_count: usize },

    #[error("unknown SEQ action opcode {opcode:#04x} at frame {frame}")]
    UnknownAction { opcode: u8, frame: u8 },

    #[error("SEQ action frame {frame} exceeds animation length {length}")]
    InvalidActionFrame { frame: u8, length: u16 },
}

pub type Result<T> = std::result::Result<T, DecodeError>;
