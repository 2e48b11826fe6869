// Positional binary codec
// This file implements the big-endian cursor used to read route buffers and
// adapter parameter blobs, plus the matching writer helpers
//
// Numan Thabit 2025 Nov

use alloy_primitives::{Address, B256, U256};

use crate::errors::DecodeError;

/// Read-only cursor over a byte buffer. Every read is bounds checked and
/// reports the offset it failed at.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u24(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub fn read_address(&mut self) -> Result<Address, DecodeError> {
        Ok(Address::from_slice(self.take(20)?))
    }

    pub fn read_u256(&mut self) -> Result<U256, DecodeError> {
        Ok(U256::from_be_slice(self.take(32)?))
    }

    pub fn read_b256(&mut self) -> Result<B256, DecodeError> {
        Ok(B256::from_slice(self.take(32)?))
    }

    /// Reads a `u16` length prefix followed by that many bytes.
    pub fn read_prefixed(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_u16()? as usize;
        self.take(len)
    }

    /// Fails when bytes are left over. Adapters use this to reject padded params.
    pub fn finish(self) -> Result<(), DecodeError> {
        if self.is_exhausted() {
            Ok(())
        } else {
            Err(DecodeError::TrailingBytes {
                offset: self.pos,
                count: self.remaining(),
            })
        }
    }
}

pub fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_be_bytes());
}

pub fn put_u24(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes()[1..]);
}

pub fn put_address(buf: &mut Vec<u8>, address: Address) {
    buf.extend_from_slice(address.as_slice());
}

pub fn put_u256(buf: &mut Vec<u8>, value: U256) {
    buf.extend_from_slice(&value.to_be_bytes::<32>());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_primitives_in_order() {
        let mut buf = vec![0x01];
        put_u16(&mut buf, 0xABCD);
        put_u24(&mut buf, 0x0102_03);
        put_address(&mut buf, Address::repeat_byte(0x11));
        put_u256(&mut buf, U256::from(1_000_000u64));

        let mut cur = Cursor::new(&buf);
        assert_eq!(cur.read_u8().unwrap(), 0x01);
        assert_eq!(cur.read_u16().unwrap(), 0xABCD);
        assert_eq!(cur.read_u24().unwrap(), 0x0102_03);
        assert_eq!(cur.read_address().unwrap(), Address::repeat_byte(0x11));
        assert_eq!(cur.read_u256().unwrap(), U256::from(1_000_000u64));
        assert!(cur.finish().is_ok());
    }

    #[test]
    fn truncated_read_reports_offset_and_shortfall() {
        let buf = [0u8; 5];
        let mut cur = Cursor::new(&buf);
        cur.read_u16().unwrap();
        let err = cur.read_address().unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                offset: 2,
                needed: 20,
                available: 3
            }
        );
        // failed read does not advance
        assert_eq!(cur.position(), 2);
    }

    #[test]
    fn prefixed_blob_and_trailing_bytes() {
        let mut buf = Vec::new();
        put_u16(&mut buf, 3);
        buf.extend_from_slice(&[7, 8, 9, 10]);
        let mut cur = Cursor::new(&buf);
        assert_eq!(cur.read_prefixed().unwrap(), &[7, 8, 9]);
        assert_eq!(
            cur.finish(),
            Err(DecodeError::TrailingBytes {
                offset: 5,
                count: 1
            })
        );
    }
}
