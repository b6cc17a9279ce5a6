//! Low-level wire primitives for the snapshot codecs.
//!
//! The replication payloads are bit-exact: integers are fixed-width signed
//! 32-bit big-endian, strings are i32-length-prefixed UTF-8, booleans are a
//! single byte. Decode failures surface as [`WireError`], never a panic.

use bytes::{BufMut, BytesMut};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("payload truncated: needed {needed} more byte(s)")]
    Truncated { needed: usize },

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("negative string length {0}")]
    NegativeLength(i32),

    #[error("invalid bool byte {0:#04x}")]
    InvalidBool(u8),

    #[error("unknown packet id {0}")]
    UnknownPacketId(i32),
}

pub type WireResult<T> = Result<T, WireError>;

/// Append-only writer producing a snapshot payload.
#[derive(Debug, Default)]
pub struct PacketWriter {
    buf: BytesMut,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(value as u8);
    }

    pub fn write_str(&mut self, value: &str) {
        self.write_i32(value.len() as i32);
        self.buf.put_slice(value.as_bytes());
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

/// Cursor over a received payload. Every read mirrors a writer call
/// field-for-field; reordering either side is a breaking wire change.
#[derive(Debug)]
pub struct PacketReader<'a> {
    buf: &'a [u8],
}

impl<'a> PacketReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn take(&mut self, n: usize) -> WireResult<&'a [u8]> {
        if self.buf.len() < n {
            return Err(WireError::Truncated {
                needed: n - self.buf.len(),
            });
        }
        let (head, rest) = self.buf.split_at(n);
        self.buf = rest;
        Ok(head)
    }

    pub fn read_i32(&mut self) -> WireResult<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_bool(&mut self) -> WireResult<bool> {
        match self.take(1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError::InvalidBool(other)),
        }
    }

    pub fn read_str(&mut self) -> WireResult<String> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(WireError::NegativeLength(len));
        }
        let bytes = self.take(len as usize)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| WireError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_roundtrip() {
        let mut writer = PacketWriter::new();
        writer.write_i32(-42);
        writer.write_bool(true);
        writer.write_bool(false);
        writer.write_str("combat_mode");
        writer.write_str("");
        let data = writer.into_vec();

        let mut reader = PacketReader::new(&data);
        assert_eq!(reader.read_i32().unwrap(), -42);
        assert!(reader.read_bool().unwrap());
        assert!(!reader.read_bool().unwrap());
        assert_eq!(reader.read_str().unwrap(), "combat_mode");
        assert_eq!(reader.read_str().unwrap(), "");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_i32_is_big_endian() {
        let mut writer = PacketWriter::new();
        writer.write_i32(0x0102_0304);
        assert_eq!(writer.into_vec(), vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_string_layout() {
        let mut writer = PacketWriter::new();
        writer.write_str("hi");
        assert_eq!(writer.into_vec(), vec![0, 0, 0, 2, b'h', b'i']);
    }

    #[test]
    fn test_truncated_read() {
        let mut reader = PacketReader::new(&[0, 0]);
        assert_eq!(reader.read_i32(), Err(WireError::Truncated { needed: 2 }));
    }

    #[test]
    fn test_invalid_bool_byte() {
        let mut reader = PacketReader::new(&[7]);
        assert_eq!(reader.read_bool(), Err(WireError::InvalidBool(7)));
    }

    #[test]
    fn test_negative_string_length() {
        let data = (-1i32).to_be_bytes();
        let mut reader = PacketReader::new(&data);
        assert_eq!(reader.read_str(), Err(WireError::NegativeLength(-1)));
    }

    #[test]
    fn test_invalid_utf8() {
        let data = [0, 0, 0, 2, 0xff, 0xfe];
        let mut reader = PacketReader::new(&data);
        assert_eq!(reader.read_str(), Err(WireError::InvalidUtf8));
    }
}
