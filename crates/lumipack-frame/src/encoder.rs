//! Payload → frame bytes → pulse sequence.

use bytes::{BufMut, BytesMut};

use crate::config::{ProtocolConfig, FRAME_OVERHEAD, MAX_SIGNAL_CHANGES};
use crate::crc::compute_crc16;
use crate::error::{ProtocolError, Result};
use crate::signal::{LightLevel, SignalChange};
use crate::symbol::{symbol_to_color, SYMBOLS_PER_BYTE};

/// Serialize a payload into its 9+L frame image (big-endian fields).
pub(crate) fn serialize_frame(config: &ProtocolConfig, payload: &[u8]) -> BytesMut {
    let mut frame = BytesMut::with_capacity(FRAME_OVERHEAD + payload.len());
    frame.put_u16(config.magic);
    frame.put_u8(config.version);
    frame.put_u16(payload.len() as u16);
    frame.put_u16(compute_crc16(payload));
    frame.put_slice(payload);
    frame.put_u16(config.ender);
    frame
}

/// Translates payloads into pulse sequences for the optical emitter.
///
/// Encoding is deterministic given the configuration and payload, and
/// transactional: on any failure the destination buffer is left empty.
#[derive(Debug, Clone)]
pub struct Encoder {
    config: ProtocolConfig,
}

impl Encoder {
    /// Create an encoder, validating the configuration.
    pub fn new(config: ProtocolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Current configuration.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Replace the configuration after revalidation.
    pub fn configure(&mut self, config: ProtocolConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Encode `payload` into a freshly allocated pulse sequence.
    pub fn encode(&self, payload: &[u8]) -> Result<Vec<SignalChange>> {
        let mut out = Vec::new();
        self.encode_into(payload, &mut out)?;
        Ok(out)
    }

    /// Encode `payload` into `dst`, replacing its contents.
    ///
    /// `dst` is empty after any failure; a partial frame is never surfaced.
    pub fn encode_into(&self, payload: &[u8], dst: &mut Vec<SignalChange>) -> Result<()> {
        dst.clear();
        if let Err(err) = self.emit_frame(payload, dst) {
            dst.clear();
            return Err(err);
        }
        Ok(())
    }

    fn emit_frame(&self, payload: &[u8], dst: &mut Vec<SignalChange>) -> Result<()> {
        let config = &self.config;
        if payload.len() > config.max_payload_bytes {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload.len(),
                max: config.max_payload_bytes,
            });
        }

        let frame = serialize_frame(config, payload);
        dst.reserve(frame.len() * SYMBOLS_PER_BYTE * 2 + 3);

        let mut writer = SignalWriter {
            unit_duration_micros: config.unit_duration_micros,
            out: dst,
        };

        writer.emit(config.preamble_color, config.preamble_mark_units)?;
        writer.emit(LightLevel::Off, config.preamble_space_units)?;

        // MSB pair first: shifts 6, 4, 2, 0.
        for &byte in frame.iter() {
            for shift in [6u8, 4, 2, 0] {
                let symbol = (byte >> shift) & 0b11;
                writer.emit(symbol_to_color(symbol), config.symbol_mark_units)?;
                writer.emit(LightLevel::Off, config.separator_units)?;
            }
        }

        writer.emit(LightLevel::Off, config.frame_gap_units)?;
        Ok(())
    }
}

/// Append-only pulse sink bounded by [`MAX_SIGNAL_CHANGES`].
struct SignalWriter<'a> {
    unit_duration_micros: u32,
    out: &'a mut Vec<SignalChange>,
}

impl SignalWriter<'_> {
    fn emit(&mut self, level: LightLevel, units: u32) -> Result<()> {
        if self.out.len() >= MAX_SIGNAL_CHANGES {
            return Err(ProtocolError::SignalOverflow {
                max: MAX_SIGNAL_CHANGES,
            });
        }
        let duration = units
            .checked_mul(self.unit_duration_micros)
            .ok_or(ProtocolError::DurationOverflow)?;
        self.out.push(SignalChange::new(level, duration));
        Ok(())
    }
}
