//! Light-level vocabulary shared by every pulse-based codec in this
//! workspace, and the pulse description fed to and produced by the core.

use std::fmt;

/// Discrete output level of the optical emitter.
///
/// `Off` is the idle/space level between marks. The four colors carry data;
/// `White` doubles as the default preamble marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LightLevel {
    Off,
    White,
    Red,
    Green,
    Blue,
}

impl LightLevel {
    /// Human-readable level name.
    pub fn name(self) -> &'static str {
        match self {
            LightLevel::Off => "off",
            LightLevel::White => "white",
            LightLevel::Red => "red",
            LightLevel::Green => "green",
            LightLevel::Blue => "blue",
        }
    }

    /// True for any level other than `Off`.
    pub fn is_mark(self) -> bool {
        self != LightLevel::Off
    }
}

impl fmt::Display for LightLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One observed or emitted pulse: a level held for a duration.
///
/// Durations are integer microseconds and must be strictly positive on the
/// wire; a zero-duration change is not a pulse and decoders ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalChange {
    pub level: LightLevel,
    pub duration_micros: u32,
}

impl SignalChange {
    /// Create a pulse description.
    pub fn new(level: LightLevel, duration_micros: u32) -> Self {
        Self {
            level,
            duration_micros,
        }
    }
}
