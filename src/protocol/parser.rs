//! Rookery binary protocol frame parser
//!
//! Frames carry no outer length header. A frame is recognized by its fixed
//! session-token prefix and three-byte tag; 4-byte big-endian length prefixes
//! then say how much payload follows. The parser walks a buffer of
//! concatenated frames and reports how many bytes each complete frame
//! consumed, so callers can advance and parse the next one.

use crate::ProtocolError;
use crate::protocol::command::{Command, TAG_LEN, Ttl};
use std::borrow::Cow;

/// Result of parsing
#[derive(Debug)]
pub enum ParseResult<'a> {
    /// Frame fully parsed, with the number of bytes it consumed
    Complete(Command<'a>, usize),
    /// Need more data to complete parsing
    NeedMoreData,
    /// Parse error
    Error(ProtocolError),
}

/// Parse one frame from the front of `buf`.
///
/// `token` is the session token every frame must start with. A buffer that
/// diverges from the token is rejected as soon as the mismatch is visible,
/// without waiting for the full prefix to arrive.
pub fn parse<'a>(buf: &'a [u8], token: &[u8]) -> ParseResult<'a> {
    if buf.len() < token.len() {
        if token.starts_with(buf) {
            return ParseResult::NeedMoreData;
        }
        return ParseResult::Error(ProtocolError::InvalidToken);
    }
    if &buf[..token.len()] != token {
        return ParseResult::Error(ProtocolError::InvalidToken);
    }

    let pos = token.len();
    let tag = match buf.get(pos..pos + TAG_LEN) {
        Some(tag) => tag,
        None => return ParseResult::NeedMoreData,
    };
    let pos = pos + TAG_LEN;

    match tag {
        b"SET" => parse_set(buf, pos),
        b"GET" => parse_get(buf, pos),
        b"DEL" => parse_del(buf, pos),
        b"RAL" => ParseResult::Complete(Command::Ral, pos),
        _ => ParseResult::Error(ProtocolError::InvalidCommand(
            String::from_utf8_lossy(tag).to_string(),
        )),
    }
}

/// Parse one frame, treating a short buffer as an error.
///
/// Useful when the caller already knows the buffer holds a whole frame.
pub fn decode_frame<'a>(
    buf: &'a [u8],
    token: &[u8],
) -> Result<(Command<'a>, usize), ProtocolError> {
    match parse(buf, token) {
        ParseResult::Complete(cmd, consumed) => Ok((cmd, consumed)),
        ParseResult::NeedMoreData => Err(ProtocolError::IncompleteFrame),
        ParseResult::Error(e) => Err(e),
    }
}

/// Parse the payload of a SET frame: key field, value field, 4-byte TTL
fn parse_set(buf: &[u8], pos: usize) -> ParseResult<'_> {
    let (key, pos) = match take_field(buf, pos) {
        Some(x) => x,
        None => return ParseResult::NeedMoreData,
    };
    let (value, pos) = match take_field(buf, pos) {
        Some(x) => x,
        None => return ParseResult::NeedMoreData,
    };
    let ttl = match read_u32(buf, pos) {
        Some(ttl) => ttl,
        None => return ParseResult::NeedMoreData,
    };

    ParseResult::Complete(
        Command::Set {
            key: Cow::Borrowed(key),
            value: Cow::Borrowed(value),
            ttl: Ttl::from_secs(ttl),
        },
        pos + 4,
    )
}

fn parse_get(buf: &[u8], pos: usize) -> ParseResult<'_> {
    match take_field(buf, pos) {
        Some((key, pos)) => ParseResult::Complete(
            Command::Get {
                key: Cow::Borrowed(key),
            },
            pos,
        ),
        None => ParseResult::NeedMoreData,
    }
}

fn parse_del(buf: &[u8], pos: usize) -> ParseResult<'_> {
    match take_field(buf, pos) {
        Some((key, pos)) => ParseResult::Complete(
            Command::Del {
                key: Cow::Borrowed(key),
            },
            pos,
        ),
        None => ParseResult::NeedMoreData,
    }
}

/// Read one length-prefixed field at `pos`.
/// None means the buffer does not yet hold the whole field.
fn take_field(buf: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    let len = read_u32(buf, pos)? as usize;
    let start = pos + 4;
    let end = start.checked_add(len)?;
    let field = buf.get(start..end)?;
    Some((field, end))
}

/// Read a big-endian u32 at `pos`
fn read_u32(buf: &[u8], pos: usize) -> Option<u32> {
    let bytes = buf.get(pos..pos + 4)?;
    Some(u32::from_be_bytes(bytes.try_into().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::writer::FrameWriter;

    const TOKEN: &[u8] = b"penguins";

    fn encode(build: impl FnOnce(&mut FrameWriter)) -> Vec<u8> {
        let mut w = FrameWriter::new(TOKEN, 256);
        build(&mut w);
        w.buffer().to_vec()
    }

    #[test]
    fn test_parse_set() {
        let buf = b"penguinsSET\x00\x00\x00\x03foo\x00\x00\x00\x03bar\x00\x00\x00\x0A";
        match parse(buf, TOKEN) {
            ParseResult::Complete(Command::Set { key, value, ttl }, consumed) => {
                assert_eq!(key.as_ref(), b"foo");
                assert_eq!(value.as_ref(), b"bar");
                assert_eq!(ttl, Ttl::from_secs(10));
                assert_eq!(consumed, buf.len());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_get() {
        let buf = b"penguinsGET\x00\x00\x00\x03foo";
        match parse(buf, TOKEN) {
            ParseResult::Complete(Command::Get { key }, consumed) => {
                assert_eq!(key.as_ref(), b"foo");
                assert_eq!(consumed, buf.len());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_del() {
        let buf = b"penguinsDEL\x00\x00\x00\x03foo";
        match parse(buf, TOKEN) {
            ParseResult::Complete(Command::Del { key }, consumed) => {
                assert_eq!(key.as_ref(), b"foo");
                assert_eq!(consumed, buf.len());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_ral() {
        let buf = b"penguinsRAL";
        match parse(buf, TOKEN) {
            ParseResult::Complete(Command::Ral, consumed) => {
                assert_eq!(consumed, 11);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_round_trip_all_commands() {
        let commands = [
            Command::Set {
                key: Cow::Borrowed(&b"alpha"[..]),
                value: Cow::Borrowed(&b"beta"[..]),
                ttl: Ttl::from_secs(3600),
            },
            Command::Get {
                key: Cow::Borrowed(&b"alpha"[..]),
            },
            Command::Del {
                key: Cow::Borrowed(&b"alpha"[..]),
            },
            Command::Ral,
        ];

        for cmd in &commands {
            let buf = encode(|w| w.command(cmd).unwrap());
            let (decoded, consumed) = decode_frame(&buf, TOKEN).unwrap();
            assert_eq!(&decoded, cmd);
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn test_stream_of_frames_splits_in_order() {
        let buf = encode(|w| {
            w.set(b"k1", b"v1", Ttl::from_secs(5)).unwrap();
            w.get(b"").unwrap();
            w.del(b"k2").unwrap();
            w.ral();
        });

        let mut pos = 0;
        let mut names = Vec::new();
        while pos < buf.len() {
            match parse(&buf[pos..], TOKEN) {
                ParseResult::Complete(cmd, consumed) => {
                    names.push(cmd.name());
                    pos += consumed;
                }
                other => panic!("unexpected at {pos}: {:?}", other),
            }
        }
        assert_eq!(names, ["SET", "GET", "DEL", "RAL"]);
        assert_eq!(pos, buf.len());
    }

    #[test]
    fn test_every_truncation_needs_more_data() {
        let buf = encode(|w| w.set(b"foo", b"bar", Ttl::from_secs(10)).unwrap());
        for cut in 0..buf.len() {
            match parse(&buf[..cut], TOKEN) {
                ParseResult::NeedMoreData => {}
                other => panic!("unexpected at cut {cut}: {:?}", other),
            }
        }
    }

    #[test]
    fn test_wrong_token() {
        let buf = b"walrusesGET\x00\x00\x00\x03foo";
        match parse(buf, TOKEN) {
            ParseResult::Error(ProtocolError::InvalidToken) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_token_mismatch_detected_early() {
        // One byte is enough to rule out the token prefix.
        match parse(b"x", TOKEN) {
            ParseResult::Error(ProtocolError::InvalidToken) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_tag() {
        let buf = b"penguinsXYZ";
        match parse(buf, TOKEN) {
            ParseResult::Error(ProtocolError::InvalidCommand(tag)) => {
                assert_eq!(tag, "XYZ");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_zero_length_fields() {
        let buf = encode(|w| w.set(b"", b"", Ttl::NONE).unwrap());
        match parse(&buf, TOKEN) {
            ParseResult::Complete(Command::Set { key, value, ttl }, consumed) => {
                assert!(key.is_empty());
                assert!(value.is_empty());
                assert_eq!(ttl, Ttl::NONE);
                assert_eq!(consumed, buf.len());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_payload_may_contain_token_bytes() {
        // Lengths, not delimiters, bound the fields; a value that happens to
        // contain the token must not confuse the parser.
        let buf = encode(|w| {
            w.set(b"penguins", b"penguinsSET", Ttl::from_secs(1)).unwrap();
            w.ral();
        });

        let (cmd, consumed) = decode_frame(&buf, TOKEN).unwrap();
        match cmd {
            Command::Set { key, value, .. } => {
                assert_eq!(key.as_ref(), b"penguins");
                assert_eq!(value.as_ref(), b"penguinsSET");
            }
            other => panic!("unexpected: {:?}", other),
        }
        match parse(&buf[consumed..], TOKEN) {
            ParseResult::Complete(Command::Ral, _) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_decode_frame_rejects_short_buffer() {
        let buf = encode(|w| w.get(b"foo").unwrap());
        match decode_frame(&buf[..buf.len() - 1], TOKEN) {
            Err(ProtocolError::IncompleteFrame) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }
}
