//! Byte cursor over an immutable MIDI buffer.
//!
//! Reads are big-endian and advance the cursor. A read that does not fit in the
//! remaining bytes fails with `UnexpectedEof` and leaves the cursor untouched.

use super::errors::{ImportError, Result};

/// Maximum number of bytes in a MIDI variable-length quantity
const MAX_VLQ_BYTES: usize = 4;

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, position: 0 }
    }

    /// Current cursor position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Total length of the underlying buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left after the cursor
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Move the cursor to an absolute position, clamped to the buffer end
    pub fn seek_to(&mut self, position: usize) {
        self.position = position.min(self.data.len());
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.read_bytes(count).map(|_| ())
    }

    /// Read `count` raw bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(count)
            .filter(|end| *end <= self.data.len())
            .ok_or(ImportError::UnexpectedEof {
                position: self.position,
            })?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a variable-length quantity.
    ///
    /// Accumulates 7 bits per byte while the top bit is set. An encoding that is
    /// still unterminated after 4 bytes is accepted and the accumulated value
    /// returned.
    pub fn read_vlq(&mut self) -> Result<u32> {
        let start = self.position;
        let mut value: u32 = 0;
        for _ in 0..MAX_VLQ_BYTES {
            let Ok(byte) = self.read_u8() else {
                self.position = start;
                return Err(ImportError::UnexpectedEof { position: start });
            };
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        log::debug!("VLQ at byte {} longer than {} bytes", start, MAX_VLQ_BYTES);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq(bytes: &[u8]) -> u32 {
        ByteReader::new(bytes).read_vlq().unwrap()
    }

    /// Standard MIDI VLQ encoding, used to check the decoder against known values
    fn encode_vlq(mut value: u32) -> Vec<u8> {
        let mut out = vec![(value & 0x7F) as u8];
        value >>= 7;
        while value > 0 {
            out.insert(0, (value & 0x7F) as u8 | 0x80);
            value >>= 7;
        }
        out
    }

    #[test]
    fn test_vlq_known_values() {
        assert_eq!(vlq(&[0x00]), 0);
        assert_eq!(vlq(&[0x7F]), 127);
        assert_eq!(vlq(&[0x81, 0x00]), 128);
        assert_eq!(vlq(&[0xC0, 0x00]), 8192);
        assert_eq!(vlq(&[0xFF, 0xFF, 0xFF, 0x7F]), 0x0FFF_FFFF);
    }

    #[test]
    fn test_vlq_boundaries_decode_to_encoded_value() {
        for value in [0, 1, 127, 128, 16_383, 16_384, 2_097_151, 2_097_152, 0x0FFF_FFFF] {
            let bytes = encode_vlq(value);
            let mut reader = ByteReader::new(&bytes);
            assert_eq!(reader.read_vlq().unwrap(), value);
            assert_eq!(reader.remaining(), 0);
        }
    }

    #[test]
    fn test_vlq_over_long_is_lenient() {
        let mut reader = ByteReader::new(&[0x81, 0x80, 0x80, 0x80, 0x00]);
        assert_eq!(reader.read_vlq().unwrap(), 0x0020_0000);
        assert_eq!(reader.position(), 4);
    }

    #[test]
    fn test_vlq_truncated() {
        let mut reader = ByteReader::new(&[0x81]);
        assert!(matches!(
            reader.read_vlq(),
            Err(ImportError::UnexpectedEof { position: 0 })
        ));

        // Cursor goes back to where the quantity started
        let mut reader = ByteReader::new(&[0x00, 0x81, 0x80]);
        assert_eq!(reader.read_vlq().unwrap(), 0);
        assert!(matches!(
            reader.read_vlq(),
            Err(ImportError::UnexpectedEof { position: 1 })
        ));
        assert_eq!(reader.position(), 1);
        assert_eq!(reader.remaining(), 2);
    }

    #[test]
    fn test_big_endian_reads() {
        let mut reader = ByteReader::new(&[0x12, 0x34, 0x00, 0x00, 0x01, 0xE0, 0xAA]);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 480);
        assert_eq!(reader.read_u8().unwrap(), 0xAA);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_read_past_end_does_not_advance() {
        let mut reader = ByteReader::new(&[0x01, 0x02, 0x03]);
        reader.skip(1).unwrap();
        assert!(matches!(
            reader.read_u32(),
            Err(ImportError::UnexpectedEof { position: 1 })
        ));
        assert_eq!(reader.position(), 1);
        assert_eq!(reader.read_bytes(2).unwrap(), &[0x02, 0x03]);
    }

    #[test]
    fn test_seek_is_clamped() {
        let mut reader = ByteReader::new(&[0; 4]);
        reader.seek_to(100);
        assert_eq!(reader.position(), 4);
        assert!(reader.read_u8().is_err());
    }
}
