//! Rookery binary wire protocol implementation

pub mod command;
pub mod parser;
pub mod writer;

pub use command::{Command, MAX_FIELD_LEN, TAG_LEN, Ttl, fits_length_field};
pub use parser::{ParseResult, decode_frame, parse};
pub use writer::FrameWriter;
