//! Binary reading and writing utilities for the game protocol.
//!
//! All values are little-endian. Strings are null-terminated UTF-8.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use glam::Vec2;

use crate::ProtocolError;

/// A cursor over a received frame.
///
/// Every read is bounds-checked; a short buffer yields
/// [`ProtocolError::UnexpectedEof`] instead of panicking, so a truncated
/// frame from the server can never take a session down.
#[derive(Debug, Clone)]
pub struct BinaryReader {
    buf: Bytes,
}

impl BinaryReader {
    /// Create a new reader from raw bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { buf: data.into() }
    }

    /// Returns remaining bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    #[inline]
    pub fn has_remaining(&self) -> bool {
        self.buf.has_remaining()
    }

    #[inline]
    fn ensure(&self, n: usize) -> Result<(), ProtocolError> {
        if self.buf.remaining() >= n {
            Ok(())
        } else {
            Err(ProtocolError::UnexpectedEof)
        }
    }

    /// Skip `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<(), ProtocolError> {
        self.ensure(n)?;
        self.buf.advance(n);
        Ok(())
    }

    /// Split off the next `n` bytes as their own buffer.
    pub fn get_bytes(&mut self, n: usize) -> Result<Bytes, ProtocolError> {
        self.ensure(n)?;
        Ok(self.buf.split_to(n))
    }

    /// Read a single byte, or `None` at the end of the buffer.
    #[inline]
    pub fn try_get_u8(&mut self) -> Option<u8> {
        if self.buf.has_remaining() {
            Some(self.buf.get_u8())
        } else {
            None
        }
    }

    #[inline]
    pub fn get_u8(&mut self) -> Result<u8, ProtocolError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    #[inline]
    pub fn get_bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.get_u8()? != 0)
    }

    #[inline]
    pub fn get_u16(&mut self) -> Result<u16, ProtocolError> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_le())
    }

    #[inline]
    pub fn get_u32(&mut self) -> Result<u32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    #[inline]
    pub fn get_f32(&mut self) -> Result<f32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_f32_le())
    }

    #[inline]
    pub fn get_vec2(&mut self) -> Result<Vec2, ProtocolError> {
        let x = self.get_f32()?;
        let y = self.get_f32()?;
        Ok(Vec2::new(x, y))
    }

    /// Read a null-terminated UTF-8 string.
    ///
    /// Invalid UTF-8 is replaced lossily; a missing terminator is an EOF.
    pub fn get_string(&mut self) -> Result<String, ProtocolError> {
        let len = self
            .buf
            .iter()
            .position(|&b| b == 0)
            .ok_or(ProtocolError::UnexpectedEof)?;
        let bytes = self.buf.split_to(len);
        self.buf.advance(1);
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// A writer for building binary protocol messages.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    buf: BytesMut,
}

impl BinaryWriter {
    /// Create a new writer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new writer with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Returns the current length.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    #[inline]
    pub fn put_bool(&mut self, v: bool) {
        self.buf.put_u8(v as u8);
    }

    #[inline]
    pub fn put_u16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    #[inline]
    pub fn put_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    #[inline]
    pub fn put_f32(&mut self, v: f32) {
        self.buf.put_f32_le(v);
    }

    #[inline]
    pub fn put_vec2(&mut self, v: Vec2) {
        self.put_f32(v.x);
        self.put_f32(v.y);
    }

    /// Write a null-terminated UTF-8 string.
    pub fn put_string(&mut self, s: &str) {
        self.buf.put_slice(s.as_bytes());
        self.buf.put_u8(0);
    }

    /// Write raw bytes.
    pub fn put_slice(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    /// Consume the writer and return the built buffer.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    /// Get current buffer as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_u32() {
        let mut w = BinaryWriter::new();
        w.put_u32(0xDEADBEEF);
        let data = w.finish();
        let mut r = BinaryReader::new(data);
        assert_eq!(r.get_u32().unwrap(), 0xDEADBEEF);
    }

    #[test]
    fn test_string_utf8() {
        let mut w = BinaryWriter::new();
        w.put_string("hello");
        w.put_u8(7);
        let data = w.finish();
        let mut r = BinaryReader::new(data);
        assert_eq!(r.get_string().unwrap(), "hello");
        assert_eq!(r.get_u8().unwrap(), 7);
        assert!(!r.has_remaining());
    }

    #[test]
    fn test_short_reads_are_errors() {
        let mut r = BinaryReader::new(vec![0x01, 0x02]);
        assert!(matches!(r.get_u32(), Err(ProtocolError::UnexpectedEof)));
        // A failed read leaves the cursor where it was.
        assert_eq!(r.get_u16().unwrap(), 0x0201);
        assert_eq!(r.try_get_u8(), None);
    }

    #[test]
    fn test_unterminated_string() {
        let mut r = BinaryReader::new(b"abc".to_vec());
        assert!(matches!(r.get_string(), Err(ProtocolError::UnexpectedEof)));
    }
}
