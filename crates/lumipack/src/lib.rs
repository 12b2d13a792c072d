//! Umbrella crate for the lumipack light-pulse codec.
//!
//! lumipack transmits byte payloads over a quaternary color-coded timing
//! channel: colored light pulses on an infrared or visible-light
//! point-to-point link, two bits per pulse.
//!
//! # Crate Structure
//!
//! - [`frame`] — The framed, CRC-protected, preamble-synchronized codec

/// Re-export codec types.
pub mod frame {
    pub use lumipack_frame::*;
}
