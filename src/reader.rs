use crate::error::DecodeError;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Cursor over an immutable byte slice with typed little-/big-endian
/// integer reads and constant/padding assertions. Mirrors the cursor
/// used by the rest of the decoding pipeline: every higher-level format
/// reader (TIM, ZND, MPD, WEP/SHP, SEQ) advances one of these instead of
/// touching the underlying slice directly.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// The full underlying slice, independent of cursor position. Lets a
    /// format reader capture a handle it can later build fresh cursors
    /// over (TIM does this to re-seek into its payload on demand).
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    fn require(&self, n: usize) -> crate::error::Result<()> {
        if self.pos + n > self.data.len() {
            return Err(DecodeError::OutOfBounds {
                offset: self.pos,
                wanted: n,
                len: self.data.len(),
            });
        }
        Ok(())
    }

    /// Sets the cursor to an absolute position. Fails if past the end.
    pub fn seek(&mut self, pos: usize) -> crate::error::Result<()> {
        if pos > self.data.len() {
            return Err(DecodeError::OutOfBounds {
                offset: pos,
                wanted: 0,
                len: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Advances the cursor by `n` bytes without reading them.
    pub fn skip(&mut self, n: usize) -> crate::error::Result<()> {
        self.seek(self.pos + n)
    }

    pub fn u8(&mut self) -> crate::error::Result<u8> {
        self.require(1)?;
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn s8(&mut self) -> crate::error::Result<i8> {
        Ok(self.u8()? as i8)
    }

    /// Little-endian.
    pub fn u16(&mut self) -> crate::error::Result<u16> {
        self.require(2)?;
        let v = LittleEndian::read_u16(&self.data[self.pos..]);
        self.pos += 2;
        Ok(v)
    }

    /// Little-endian, sign-extended.
    pub fn s16(&mut self) -> crate::error::Result<i16> {
        self.require(2)?;
        let v = LittleEndian::read_i16(&self.data[self.pos..]);
        self.pos += 2;
        Ok(v)
    }

    /// Big-endian, sign-extended. Used by SEQ for rotation/translation
    /// bases and the bit-cascaded keyframe follow-up words.
    pub fn s16_big_endian(&mut self) -> crate::error::Result<i16> {
        self.require(2)?;
        let v = BigEndian::read_i16(&self.data[self.pos..]);
        self.pos += 2;
        Ok(v)
    }

    /// Little-endian. Fails with `Overflow` if bit 31 is set (the source
    /// format never stores a u32 field whose sign bit is set; treat it
    /// as a corrupt read rather than silently wrapping).
    pub fn u32(&mut self) -> crate::error::Result<u32> {
        self.require(4)?;
        let v = LittleEndian::read_u32(&self.data[self.pos..]);
        if v & 0x8000_0000 != 0 {
            return Err(DecodeError::Overflow { offset: self.pos, value: v });
        }
        self.pos += 4;
        Ok(v)
    }

    /// Little-endian, sign-extended.
    pub fn s32(&mut self) -> crate::error::Result<i32> {
        self.require(4)?;
        let v = LittleEndian::read_i32(&self.data[self.pos..]);
        self.pos += 4;
        Ok(v)
    }

    /// Reads `n` raw bytes.
    pub fn buffer(&mut self, n: usize) -> crate::error::Result<&'a [u8]> {
        self.require(n)?;
        let v = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(v)
    }

    /// Reads `expected.len()` bytes and fails with `ConstantMismatch` if
    /// any differ.
    pub fn constant(&mut self, expected: &[u8]) -> crate::error::Result<()> {
        let start = self.pos;
        let actual = self.buffer(expected.len())?;
        if let Some(i) = actual.iter().zip(expected).position(|(a, e)| a != e) {
            return Err(DecodeError::ConstantMismatch {
                offset: start + i,
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            });
        }
        Ok(())
    }

    /// Reads `n` bytes and fails unless every one equals `byte`.
    pub fn padding(&mut self, n: usize, byte: u8) -> crate::error::Result<()> {
        self.constant(&vec![byte; n])
    }

    /// Peeks `n` bytes ahead of the cursor without advancing it. Used by
    /// the WEP/SHP v2 face decoder, which must inspect byte 11 of a
    /// record before deciding how to read it.
    pub fn peek(&self, offset: usize, n: usize) -> crate::error::Result<&'a [u8]> {
        if self.pos + offset + n > self.data.len() {
            return Err(DecodeError::OutOfBounds {
                offset: self.pos + offset,
                wanted: n,
                len: self.data.len(),
            });
        }
        Ok(&self.data[self.pos + offset..self.pos + offset + n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reader_fails_out_of_bounds() {
        let mut r = ByteReader::new(&[]);
        assert!(matches!(r.u8(), Err(DecodeError::OutOfBounds { .. })));
        assert_eq!(r.pos(), 0);
    }

    #[test]
    fn little_endian_round_trip() {
        let mut r = ByteReader::new(&[0x34, 0x12, 0xff, 0xff]);
        assert_eq!(r.u16().unwrap(), 0x1234);
        assert_eq!(r.s16().unwrap(), -1);
    }

    #[test]
    fn big_endian_reverses_byte_order_vs_little_endian() {
        let mut le = ByteReader::new(&[0x01, 0x02]);
        let mut be = ByteReader::new(&[0x01, 0x02]);
        assert_eq!(le.s16().unwrap(), 0x0201);
        assert_eq!(be.s16_big_endian().unwrap(), 0x0102);
    }

    #[test]
    fn u32_rejects_sign_bit() {
        let mut r = ByteReader::new(&[0x00, 0x00, 0x00, 0x80]);
        assert!(matches!(r.u32(), Err(DecodeError::Overflow { .. })));
    }

    #[test]
    fn constant_mismatch_reports_offset() {
        let mut r = ByteReader::new(&[0x48, 0x30, 0x31, 0x01]);
        match r.constant(&[0x48, 0x30, 0x31, 0x00]) {
            Err(DecodeError::ConstantMismatch { offset, .. }) => assert_eq!(offset, 3),
            other => panic!("expected ConstantMismatch, got {other:?}"),
        }
    }

    #[test]
    fn peek_does_not_advance_cursor() {
        let mut r = ByteReader::new(&[1, 2, 3, 4]);
        assert_eq!(r.peek(2, 1).unwrap(), &[3]);
        assert_eq!(r.pos(), 0);
    }
}
