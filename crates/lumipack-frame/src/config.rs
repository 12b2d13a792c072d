//! Tunable wire parameters and the frame layout constants they bound.

use crate::error::{ProtocolError, Result};
use crate::signal::LightLevel;

/// Hard cap on payload size, independent of configuration.
pub const MAX_PAYLOAD: usize = 512;

/// Fixed bytes around the payload: magic (2) + version (1) + length (2) +
/// CRC (2) + ender (2).
pub const FRAME_OVERHEAD: usize = 9;

/// Largest possible serialized frame.
pub const MAX_FRAME_BYTES: usize = FRAME_OVERHEAD + MAX_PAYLOAD;

/// Upper bound on signal changes emitted for one frame: two pulses per
/// symbol, four symbols per byte, plus preamble and gap headroom.
pub const MAX_SIGNAL_CHANGES: usize = (MAX_PAYLOAD + FRAME_OVERHEAD) * 8 + 32;

/// Drift fractions below this floor are clamped up by [`ProtocolConfig::tolerance`].
const MIN_DRIFT_FRACTION: f64 = 0.01;

// Byte offsets within the serialized frame.
pub(crate) const VERSION_OFFSET: usize = 2;
pub(crate) const LENGTH_OFFSET: usize = 3;
pub(crate) const CRC_OFFSET: usize = 5;
pub(crate) const PAYLOAD_OFFSET: usize = 7;

/// All tunable parameters of the pulse wire format.
///
/// The defaults are normative for interoperability: changing `magic`,
/// `ender`, `version`, or any timing parameter changes the wire.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProtocolConfig {
    /// Base timing quantum in microseconds. All durations on the wire are
    /// integer multiples of this, give or take drift.
    pub unit_duration_micros: u32,
    /// Length of the preamble mark, in units.
    pub preamble_mark_units: u32,
    /// Length of the Off space following the preamble mark, in units.
    pub preamble_space_units: u32,
    /// Length of each symbol mark, in units.
    pub symbol_mark_units: u32,
    /// Length of the Off space separating symbols, in units.
    pub separator_units: u32,
    /// Length of the trailing Off gap after a frame, in units.
    pub frame_gap_units: u32,
    /// Color of the preamble mark. Must not be `Off`.
    pub preamble_color: LightLevel,
    /// Fraction of the expected duration a pulse may deviate and still be
    /// accepted. Values below 0.01 are clamped up.
    pub allowed_drift_fraction: f64,
    /// Per-frame payload cap; at most [`MAX_PAYLOAD`].
    pub max_payload_bytes: usize,
    /// 16-bit frame start marker.
    pub magic: u16,
    /// 16-bit frame trailer, a structural check beyond the CRC.
    pub ender: u16,
    /// Protocol version byte carried in every frame.
    pub version: u8,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            unit_duration_micros: 600,
            preamble_mark_units: 16,
            preamble_space_units: 8,
            symbol_mark_units: 1,
            separator_units: 1,
            frame_gap_units: 12,
            preamble_color: LightLevel::White,
            allowed_drift_fraction: 0.20,
            max_payload_bytes: MAX_PAYLOAD,
            magic: 0xC39A,
            ender: 0x51AA,
            version: 1,
        }
    }
}

impl ProtocolConfig {
    /// Check every invariant the codec relies on.
    pub fn validate(&self) -> Result<()> {
        if self.unit_duration_micros == 0 {
            return Err(ProtocolError::InvalidUnitDuration);
        }
        let unit_counts = [
            ("preamble mark units", self.preamble_mark_units),
            ("preamble space units", self.preamble_space_units),
            ("symbol mark units", self.symbol_mark_units),
            ("separator units", self.separator_units),
            ("frame gap units", self.frame_gap_units),
        ];
        for (name, value) in unit_counts {
            if value == 0 {
                return Err(ProtocolError::InvalidUnitCount(name));
            }
        }
        if self.max_payload_bytes == 0 || self.max_payload_bytes > MAX_PAYLOAD {
            return Err(ProtocolError::InvalidPayloadCap {
                cap: self.max_payload_bytes,
                max: MAX_PAYLOAD,
            });
        }
        if !self.allowed_drift_fraction.is_finite() || self.allowed_drift_fraction < 0.0 {
            return Err(ProtocolError::InvalidDriftFraction(
                self.allowed_drift_fraction,
            ));
        }
        if self.preamble_color == LightLevel::Off {
            return Err(ProtocolError::InvalidPreambleColor);
        }
        Ok(())
    }

    /// Accepted deviation, in whole units, for a pulse expected to span
    /// `expected_units`.
    ///
    /// Large expected counts (the preamble) absorb proportionally large
    /// absolute drift; single-unit marks keep a floor of one unit.
    pub fn tolerance(&self, expected_units: u32) -> u32 {
        let raw = (f64::from(expected_units) * self.drift_limit()).round();
        (raw as u32).max(1)
    }

    /// Effective per-pulse drift fraction with the floor applied.
    pub(crate) fn drift_limit(&self) -> f64 {
        self.allowed_drift_fraction.max(MIN_DRIFT_FRACTION)
    }
}
