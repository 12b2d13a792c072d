//! Framed, CRC-protected codec for quaternary color-coded light pulse links.
//!
//! This is the core value-add layer of lumipack. Payload bytes travel as
//! colored light pulses over an infrared or visible-light point-to-point
//! link, two bits per pulse:
//! - A preamble (one long color mark, one long Off space) synchronizes the
//!   receiver onto an asynchronous, variable-rate stream
//! - A 9-byte envelope (magic, version, length, CRC-16, ender) frames each
//!   payload
//! - Duration-ratio matching with a configurable drift tolerance absorbs
//!   clock skew on both ends
//!
//! The [`Decoder`] never errors and never wedges: junk between frames only
//! increments rejection counters.

pub mod config;
pub mod crc;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod signal;
pub mod symbol;

pub use config::{
    ProtocolConfig, FRAME_OVERHEAD, MAX_FRAME_BYTES, MAX_PAYLOAD, MAX_SIGNAL_CHANGES,
};
pub use crc::compute_crc16;
pub use decoder::{DataCallback, Decoder, DecoderStats};
pub use encoder::Encoder;
pub use error::{ProtocolError, Result};
pub use signal::{LightLevel, SignalChange};
pub use symbol::{color_to_symbol, symbol_to_color, SYMBOLS_PER_BYTE};
