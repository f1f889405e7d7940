//! Rookery binary protocol command types

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;

/// Every command tag is exactly three ASCII bytes
pub const TAG_LEN: usize = 3;

/// Largest field length representable in the 4-byte big-endian prefix
pub const MAX_FIELD_LEN: usize = u32::MAX as usize;

/// One cache command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// SET <key> <value> <ttl>
    Set {
        key: Cow<'a, [u8]>,
        value: Cow<'a, [u8]>,
        ttl: Ttl,
    },

    /// GET <key>
    Get { key: Cow<'a, [u8]> },

    /// DEL <key>
    Del { key: Cow<'a, [u8]> },

    /// RAL, no payload
    Ral,
}

impl<'a> Command<'a> {
    /// The three-byte wire tag for this command
    pub fn tag(&self) -> &'static [u8; TAG_LEN] {
        match self {
            Command::Set { .. } => b"SET",
            Command::Get { .. } => b"GET",
            Command::Del { .. } => b"DEL",
            Command::Ral => b"RAL",
        }
    }

    /// Human-readable tag, for logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::Del { .. } => "DEL",
            Command::Ral => "RAL",
        }
    }
}

/// Check that a field length fits the 4-byte length prefix
pub fn fits_length_field(len: usize) -> bool {
    len <= MAX_FIELD_LEN
}

/// Time-to-live in whole seconds, carried on the wire as a big-endian u32.
///
/// Zero means the entry never expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ttl(u32);

impl Ttl {
    /// No expiry
    pub const NONE: Ttl = Ttl(0);

    pub const fn from_secs(secs: u32) -> Self {
        Ttl(secs)
    }

    pub const fn as_secs(self) -> u32 {
        self.0
    }

    /// Wire encoding of the TTL field
    pub const fn to_be_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl From<u32> for Ttl {
    fn from(secs: u32) -> Self {
        Ttl(secs)
    }
}

impl FromStr for Ttl {
    type Err = ProtocolError;

    /// Strict base-10 parse. Anything that is not a non-negative integer
    /// within u32 range is rejected rather than silently encoded as garbage.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<u32>()
            .map(Ttl)
            .map_err(|_| ProtocolError::InvalidTtl(s.to_string()))
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_tags() {
        assert_eq!(
            Command::Set {
                key: Cow::Borrowed(b"k"),
                value: Cow::Borrowed(b"v"),
                ttl: Ttl::NONE,
            }
            .tag(),
            b"SET"
        );
        assert_eq!(Command::Get { key: Cow::Borrowed(b"k") }.tag(), b"GET");
        assert_eq!(Command::Del { key: Cow::Borrowed(b"k") }.tag(), b"DEL");
        assert_eq!(Command::Ral.tag(), b"RAL");
        assert_eq!(Command::Ral.name(), "RAL");
    }

    #[test]
    fn test_ttl_parse_valid() {
        assert_eq!("0".parse::<Ttl>().unwrap(), Ttl::NONE);
        assert_eq!("10".parse::<Ttl>().unwrap(), Ttl::from_secs(10));
        assert_eq!(
            "4294967295".parse::<Ttl>().unwrap(),
            Ttl::from_secs(u32::MAX)
        );
    }

    #[test]
    fn test_ttl_parse_rejects_garbage() {
        for input in ["", "abc", "-1", "1.5", "10s", "4294967296"] {
            match input.parse::<Ttl>() {
                Err(ProtocolError::InvalidTtl(s)) => assert_eq!(s, input),
                other => panic!("Expected InvalidTtl for {input:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_ttl_wire_encoding() {
        assert_eq!(Ttl::from_secs(10).to_be_bytes(), [0x00, 0x00, 0x00, 0x0A]);
        assert_eq!(Ttl::NONE.to_be_bytes(), [0x00; 4]);
        assert_eq!(Ttl::from_secs(u32::MAX).to_be_bytes(), [0xFF; 4]);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_fits_length_field() {
        assert!(fits_length_field(0));
        assert!(fits_length_field(MAX_FIELD_LEN));
        assert!(!fits_length_field(MAX_FIELD_LEN + 1));
    }
}
