//! Rookery binary protocol frame builder

use bytes::{BufMut, Bytes, BytesMut};

use super::command::{fits_length_field, Command, Ttl, TAG_LEN};
use crate::error::ProtocolError;

/// Frame writer for the binary wire protocol.
///
/// Every frame starts with the raw session token, then a three-byte command
/// tag. Variable-length fields carry a 4-byte big-endian length prefix; the
/// SET TTL is a bare 4-byte big-endian integer with no prefix.
///
/// A failed append leaves the buffer exactly as it was, so a frame is either
/// fully present or absent.
pub struct FrameWriter {
    token: Bytes,
    buf: BytesMut,
}

impl FrameWriter {
    /// Create a new frame writer with the given session token and capacity
    pub fn new(token: impl Into<Bytes>, capacity: usize) -> Self {
        Self {
            token: token.into(),
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Get the internal buffer
    pub fn buffer(&self) -> &[u8] {
        &self.buf
    }

    /// Take the buffer, leaving an empty buffer in its place
    pub fn take(&mut self) -> BytesMut {
        std::mem::take(&mut self.buf)
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Returns true if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Write the bare session token, the implicit handshake expected by the
    /// server as the first bytes of a fresh connection
    pub fn handshake(&mut self) {
        self.buf.extend_from_slice(&self.token);
    }

    /// Write a SET frame
    /// Format: <token>SET<keylen u32be><key><vallen u32be><value><ttl u32be>
    pub fn set(&mut self, key: &[u8], value: &[u8], ttl: Ttl) -> Result<(), ProtocolError> {
        if !fits_length_field(key.len()) {
            return Err(ProtocolError::KeyTooLong);
        }
        if !fits_length_field(value.len()) {
            return Err(ProtocolError::ValueTooLarge);
        }
        self.start_frame(b"SET");
        self.put_field(key);
        self.put_field(value);
        self.buf.extend_from_slice(&ttl.to_be_bytes());
        Ok(())
    }

    /// Write a GET frame
    /// Format: <token>GET<keylen u32be><key>
    pub fn get(&mut self, key: &[u8]) -> Result<(), ProtocolError> {
        if !fits_length_field(key.len()) {
            return Err(ProtocolError::KeyTooLong);
        }
        self.start_frame(b"GET");
        self.put_field(key);
        Ok(())
    }

    /// Write a DEL frame
    /// Format: <token>DEL<keylen u32be><key>
    pub fn del(&mut self, key: &[u8]) -> Result<(), ProtocolError> {
        if !fits_length_field(key.len()) {
            return Err(ProtocolError::KeyTooLong);
        }
        self.start_frame(b"DEL");
        self.put_field(key);
        Ok(())
    }

    /// Write a RAL frame, the tag alone with no payload
    pub fn ral(&mut self) {
        self.start_frame(b"RAL");
    }

    /// Write any command frame
    pub fn command(&mut self, cmd: &Command<'_>) -> Result<(), ProtocolError> {
        match cmd {
            Command::Set { key, value, ttl } => self.set(key, value, *ttl),
            Command::Get { key } => self.get(key),
            Command::Del { key } => self.del(key),
            Command::Ral => {
                self.ral();
                Ok(())
            }
        }
    }

    fn start_frame(&mut self, tag: &[u8; TAG_LEN]) {
        self.buf.extend_from_slice(&self.token);
        self.buf.extend_from_slice(tag);
    }

    fn put_field(&mut self, field: &[u8]) {
        self.buf.put_u32(field.len() as u32);
        self.buf.extend_from_slice(field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer() -> FrameWriter {
        FrameWriter::new(&b"penguins"[..], 256)
    }

    #[test]
    fn test_handshake() {
        let mut w = writer();
        w.handshake();
        assert_eq!(w.buffer(), b"penguins");
    }

    #[test]
    fn test_set_frame() {
        let mut w = writer();
        w.set(b"foo", b"bar", Ttl::from_secs(10)).unwrap();
        assert_eq!(
            w.buffer(),
            b"penguinsSET\x00\x00\x00\x03foo\x00\x00\x00\x03bar\x00\x00\x00\x0A"
        );
    }

    #[test]
    fn test_get_frame() {
        let mut w = writer();
        w.get(b"foo").unwrap();
        assert_eq!(w.buffer(), b"penguinsGET\x00\x00\x00\x03foo");
    }

    #[test]
    fn test_del_frame() {
        let mut w = writer();
        w.del(b"foo").unwrap();
        assert_eq!(w.buffer(), b"penguinsDEL\x00\x00\x00\x03foo");
    }

    #[test]
    fn test_ral_frame() {
        let mut w = writer();
        w.ral();
        assert_eq!(w.buffer(), b"penguinsRAL");
        assert_eq!(w.buffer().len(), 11);
    }

    #[test]
    fn test_zero_length_fields() {
        let mut w = writer();
        w.set(b"", b"", Ttl::NONE).unwrap();
        assert_eq!(
            w.buffer(),
            b"penguinsSET\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00"
        );

        w.clear();
        w.get(b"").unwrap();
        assert_eq!(w.buffer(), b"penguinsGET\x00\x00\x00\x00");
    }

    #[test]
    fn test_binary_fields_pass_through() {
        let mut w = writer();
        let key = [0x00, 0xFF, 0x0A, 0x80];
        let value = [0xDE, 0xAD, 0xBE, 0xEF, 0x00];
        w.set(&key, &value, Ttl::from_secs(1)).unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(b"penguinsSET");
        expected.extend_from_slice(&[0, 0, 0, 4]);
        expected.extend_from_slice(&key);
        expected.extend_from_slice(&[0, 0, 0, 5]);
        expected.extend_from_slice(&value);
        expected.extend_from_slice(&[0, 0, 0, 1]);
        assert_eq!(w.buffer(), &expected[..]);
    }

    #[test]
    fn test_frames_concatenate_in_order() {
        let mut w = writer();
        w.set(b"k", b"v", Ttl::from_secs(1)).unwrap();
        w.get(b"k").unwrap();
        w.ral();

        let mut expected = Vec::new();
        expected.extend_from_slice(b"penguinsSET\x00\x00\x00\x01k\x00\x00\x00\x01v\x00\x00\x00\x01");
        expected.extend_from_slice(b"penguinsGET\x00\x00\x00\x01k");
        expected.extend_from_slice(b"penguinsRAL");
        assert_eq!(w.buffer(), &expected[..]);
    }

    #[test]
    fn test_take_and_clear() {
        let mut w = writer();
        w.ral();
        assert!(!w.is_empty());

        let frame = w.take();
        assert_eq!(frame.as_ref(), b"penguinsRAL");
        assert!(w.is_empty());

        w.get(b"x").unwrap();
        w.clear();
        assert!(w.is_empty());
    }

    #[test]
    fn test_empty_token() {
        let mut w = FrameWriter::new(Bytes::new(), 64);
        w.get(b"foo").unwrap();
        assert_eq!(w.buffer(), b"GET\x00\x00\x00\x03foo");
    }
}
