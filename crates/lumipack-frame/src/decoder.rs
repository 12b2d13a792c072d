//! Pulse stream → frame state machine → payload callback.
//!
//! The decoder consumes one [`SignalChange`] at a time from an asynchronous,
//! variable-rate source. It resynchronizes on the preamble, quantizes every
//! duration against the configured unit with a drift tolerance, and rejects
//! malformed timing without ever surfacing an error to the feeder: junk can
//! neither produce a false frame nor wedge the receiver.

use bytes::{BufMut, BytesMut};

use crate::config::{
    ProtocolConfig, CRC_OFFSET, FRAME_OVERHEAD, LENGTH_OFFSET, MAX_FRAME_BYTES, PAYLOAD_OFFSET,
    VERSION_OFFSET,
};
use crate::crc::compute_crc16;
use crate::error::Result;
use crate::signal::{LightLevel, SignalChange};
use crate::symbol::color_to_symbol;

/// Payload sink invoked synchronously from [`Decoder::feed`].
///
/// The slice is only valid for the duration of the call; the closure runs on
/// the feeder's context and must not call back into the same decoder.
pub type DataCallback = Box<dyn FnMut(&[u8])>;

/// Monotonic counters for every distinct rejection category plus the
/// successful-frame count.
///
/// Counters survive [`Decoder::reset`] and reconfiguration; they are zeroed
/// only at construction or via [`Decoder::reset_stats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecoderStats {
    /// Frames delivered through the callback.
    pub frames_decoded: u64,
    /// Completed frames whose magic did not match.
    pub magic_mismatches: u64,
    /// Version mismatches and too-short completed frames.
    pub header_rejects: u64,
    /// Length fields exceeding the configured payload cap.
    pub length_violations: u64,
    /// Completed frames failing the payload CRC.
    pub crc_failures: u64,
    /// Completed frames with a wrong trailer.
    pub ender_mismatches: u64,
    /// Pulses with unusable timing (and colored pulses where a space was due).
    pub duration_rejections: u64,
    /// Pulses that were not a valid symbol mark where one was due.
    pub mark_rejections: u64,
    /// In-progress frames abandoned for any reason.
    pub truncated_frames: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    WaitSpace,
    ReadMark,
    ReadSpace,
}

/// Frame decoder over an observed pulse stream.
///
/// `feed` is synchronous, non-blocking, and infallible; its runtime is O(1)
/// except for the O(L) CRC check when a frame completes. The decoder assumes
/// exclusive access by its caller for the duration of each call.
pub struct Decoder {
    config: ProtocolConfig,
    callback: Option<DataCallback>,
    stats: DecoderStats,
    state: State,
    frame: BytesMut,
    current_byte: u8,
    bits_filled: u8,
    expected_payload_len: usize,
    payload_len_known: bool,
    pending_symbol: u8,
    frame_active: bool,
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("stats", &self.stats)
            .field("frame_len", &self.frame.len())
            .finish_non_exhaustive()
    }
}

impl Decoder {
    /// Create a decoder with no callback, validating the configuration.
    pub fn new(config: ProtocolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            callback: None,
            stats: DecoderStats::default(),
            state: State::Idle,
            frame: BytesMut::with_capacity(MAX_FRAME_BYTES),
            current_byte: 0,
            bits_filled: 0,
            expected_payload_len: 0,
            payload_len_known: false,
            pending_symbol: 0,
            frame_active: false,
        })
    }

    /// Create a decoder that delivers payloads to `callback`.
    pub fn with_callback(
        config: ProtocolConfig,
        callback: impl FnMut(&[u8]) + 'static,
    ) -> Result<Self> {
        let mut decoder = Self::new(config)?;
        decoder.set_callback(callback);
        Ok(decoder)
    }

    /// Install or replace the payload callback.
    pub fn set_callback(&mut self, callback: impl FnMut(&[u8]) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Current configuration.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Counter snapshot.
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Replace the configuration after revalidation.
    ///
    /// Discards any in-progress frame; counters are preserved.
    pub fn configure(&mut self, config: ProtocolConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        self.reset();
        Ok(())
    }

    /// Return to `Idle`, discarding any in-progress frame.
    ///
    /// Counters are preserved; hosts may call this to time out a partially
    /// decoded frame.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.frame.clear();
        self.current_byte = 0;
        self.bits_filled = 0;
        self.expected_payload_len = 0;
        self.payload_len_known = false;
        self.pending_symbol = 0;
        self.frame_active = false;
    }

    /// Zero all counters.
    pub fn reset_stats(&mut self) {
        self.stats = DecoderStats::default();
    }

    /// Consume one observed pulse.
    ///
    /// Never fails: malformed input increments the matching counter and the
    /// machine recovers to `Idle`, or straight to the preamble-armed state
    /// when the offending pulse is itself a plausible preamble mark, so a
    /// transient glitch does not cost a full preamble period.
    pub fn feed(&mut self, change: SignalChange) {
        if change.duration_micros == 0 {
            return;
        }

        let ratio =
            f64::from(change.duration_micros) / f64::from(self.config.unit_duration_micros);
        let units = ratio.round() as i64;
        let error = (ratio - units as f64).abs();

        if units <= 0 || error > self.config.drift_limit() {
            self.stats.duration_rejections += 1;
            self.abort_frame();
            // A slightly-off preamble mark may still latch for resync.
            self.try_arm_preamble(change.level, units);
            return;
        }

        match self.state {
            State::Idle => {
                if self.is_preamble_mark(change.level, units) {
                    self.state = State::WaitSpace;
                }
            }
            State::WaitSpace => {
                if change.level == LightLevel::Off
                    && self.matches(units, self.config.preamble_space_units)
                {
                    self.start_frame();
                } else if self.is_preamble_mark(change.level, units) {
                    self.state = State::WaitSpace;
                } else {
                    self.abort_frame();
                    self.try_arm_preamble(change.level, units);
                }
            }
            State::ReadMark => match self.decode_symbol(change.level, units) {
                Some(symbol) => {
                    self.pending_symbol = symbol;
                    self.state = State::ReadSpace;
                }
                None => {
                    self.stats.mark_rejections += 1;
                    self.abort_frame();
                    self.try_arm_preamble(change.level, units);
                }
            },
            State::ReadSpace => {
                if change.level != LightLevel::Off {
                    self.stats.duration_rejections += 1;
                    self.abort_frame();
                    self.try_arm_preamble(change.level, units);
                } else if !self.matches(units, self.config.separator_units)
                    && units < i64::from(self.config.separator_units)
                {
                    // Longer spaces pass as inter-symbol idle; only a short
                    // non-matching space is a timing fault.
                    self.stats.duration_rejections += 1;
                    self.abort_frame();
                } else {
                    let symbol = self.pending_symbol;
                    self.handle_symbol(symbol);
                    if self.state == State::ReadSpace {
                        self.state = State::ReadMark;
                    }
                }
            }
        }
    }

    fn matches(&self, units: i64, expected: u32) -> bool {
        (units - i64::from(expected)).unsigned_abs() <= u64::from(self.config.tolerance(expected))
    }

    fn is_preamble_mark(&self, level: LightLevel, units: i64) -> bool {
        level == self.config.preamble_color && self.matches(units, self.config.preamble_mark_units)
    }

    fn try_arm_preamble(&mut self, level: LightLevel, units: i64) {
        if self.is_preamble_mark(level, units) {
            self.state = State::WaitSpace;
        }
    }

    fn decode_symbol(&self, level: LightLevel, units: i64) -> Option<u8> {
        if !self.matches(units, self.config.symbol_mark_units) {
            return None;
        }
        color_to_symbol(level)
    }

    fn start_frame(&mut self) {
        self.frame.clear();
        self.current_byte = 0;
        self.bits_filled = 0;
        self.expected_payload_len = 0;
        self.payload_len_known = false;
        self.pending_symbol = 0;
        self.frame_active = true;
        self.state = State::ReadMark;
    }

    fn abort_frame(&mut self) {
        if self.frame_active {
            self.stats.truncated_frames += 1;
        }
        self.reset();
    }

    fn handle_symbol(&mut self, symbol: u8) {
        self.current_byte = (self.current_byte << 2) | (symbol & 0b11);
        self.bits_filled += 2;
        if self.bits_filled < 8 {
            return;
        }

        if self.frame.len() >= MAX_FRAME_BYTES {
            self.abort_frame();
            return;
        }
        self.frame.put_u8(self.current_byte);
        self.current_byte = 0;
        self.bits_filled = 0;

        // The length field is complete after the fifth byte.
        if self.frame.len() == LENGTH_OFFSET + 2 {
            let length = read_length(&self.frame);
            if length > self.config.max_payload_bytes {
                self.stats.length_violations += 1;
                self.abort_frame();
                return;
            }
            self.expected_payload_len = length;
            self.payload_len_known = true;
        }

        if self.payload_len_known {
            let total = FRAME_OVERHEAD + self.expected_payload_len;
            if self.frame.len() > total {
                self.abort_frame();
            } else if self.frame.len() == total {
                self.finalize_frame();
            }
        }
    }

    fn finalize_frame(&mut self) {
        if self.frame.len() < FRAME_OVERHEAD {
            self.stats.header_rejects += 1;
            self.abort_frame();
            return;
        }

        let magic = u16::from_be_bytes([self.frame[0], self.frame[1]]);
        if magic != self.config.magic {
            self.stats.magic_mismatches += 1;
            self.abort_frame();
            return;
        }

        if self.frame[VERSION_OFFSET] != self.config.version {
            self.stats.header_rejects += 1;
            self.abort_frame();
            return;
        }

        let payload_len = read_length(&self.frame);
        if payload_len > self.config.max_payload_bytes {
            self.stats.length_violations += 1;
            self.abort_frame();
            return;
        }

        if self.frame.len() != FRAME_OVERHEAD + payload_len {
            self.stats.truncated_frames += 1;
            self.abort_frame();
            return;
        }

        let ender = u16::from_be_bytes([
            self.frame[self.frame.len() - 2],
            self.frame[self.frame.len() - 1],
        ]);
        if ender != self.config.ender {
            self.stats.ender_mismatches += 1;
            self.abort_frame();
            return;
        }

        let expected_crc = u16::from_be_bytes([self.frame[CRC_OFFSET], self.frame[CRC_OFFSET + 1]]);
        if compute_crc16(&self.frame[PAYLOAD_OFFSET..PAYLOAD_OFFSET + payload_len]) != expected_crc
        {
            self.stats.crc_failures += 1;
            self.abort_frame();
            return;
        }

        if let Some(callback) = self.callback.as_mut() {
            callback(&self.frame[PAYLOAD_OFFSET..PAYLOAD_OFFSET + payload_len]);
        }
        self.stats.frames_decoded += 1;
        self.reset();
    }
}

fn read_length(frame: &BytesMut) -> usize {
    usize::from(frame[LENGTH_OFFSET]) << 8 | usize::from(frame[LENGTH_OFFSET + 1])
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::encoder::Encoder;

    fn capture() -> (Rc<RefCell<Vec<Vec<u8>>>>, Decoder) {
        let received: Rc<RefCell<Vec<Vec<u8>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        let decoder = Decoder::with_callback(ProtocolConfig::default(), move |payload| {
            sink.borrow_mut().push(payload.to_vec());
        })
        .unwrap();
        (received, decoder)
    }

    fn feed_all(decoder: &mut Decoder, pulses: &[SignalChange]) {
        for &pulse in pulses {
            decoder.feed(pulse);
        }
    }

    #[test]
    fn decodes_encoded_frame() {
        let (received, mut decoder) = capture();
        let pulses = Encoder::new(ProtocolConfig::default())
            .unwrap()
            .encode(b"Hi")
            .unwrap();
        feed_all(&mut decoder, &pulses);

        assert_eq!(received.borrow().as_slice(), &[b"Hi".to_vec()]);
        assert_eq!(decoder.stats().frames_decoded, 1);
        assert_eq!(decoder.stats().truncated_frames, 0);
    }

    #[test]
    fn idle_ignores_everything_but_preamble() {
        let (received, mut decoder) = capture();
        decoder.feed(SignalChange::new(LightLevel::Red, 600));
        decoder.feed(SignalChange::new(LightLevel::Off, 4800));
        decoder.feed(SignalChange::new(LightLevel::Blue, 1200));

        assert!(received.borrow().is_empty());
        assert_eq!(decoder.stats(), DecoderStats::default());
    }

    #[test]
    fn zero_duration_is_ignored() {
        let (_, mut decoder) = capture();
        decoder.feed(SignalChange::new(LightLevel::White, 0));
        assert_eq!(decoder.stats(), DecoderStats::default());
    }

    #[test]
    fn timing_invalid_pulse_counts_duration_rejection() {
        let (_, mut decoder) = capture();
        // 1.5 units: round to 2, error 0.5 > 0.2.
        decoder.feed(SignalChange::new(LightLevel::Red, 900));
        assert_eq!(decoder.stats().duration_rejections, 1);
    }

    #[test]
    fn rejected_preamble_mark_still_arms_resync() {
        let (received, mut decoder) = capture();
        // 16.5 units: timing-invalid, but the rounded count is within the
        // preamble tolerance, so the decoder latches for resync anyway.
        decoder.feed(SignalChange::new(LightLevel::White, 9900));
        assert_eq!(decoder.stats().duration_rejections, 1);

        // Continue with a clean frame body after the glitchy preamble.
        let pulses = Encoder::new(ProtocolConfig::default())
            .unwrap()
            .encode(b"ok")
            .unwrap();
        feed_all(&mut decoder, &pulses[1..]);
        assert_eq!(received.borrow().as_slice(), &[b"ok".to_vec()]);
    }

    #[test]
    fn repeated_preamble_marks_rearm_wait_space() {
        let (received, mut decoder) = capture();
        let pulses = Encoder::new(ProtocolConfig::default())
            .unwrap()
            .encode(b"x")
            .unwrap();
        decoder.feed(pulses[0]);
        decoder.feed(pulses[0]);
        decoder.feed(pulses[0]);
        feed_all(&mut decoder, &pulses[1..]);

        assert_eq!(received.borrow().len(), 1);
        assert_eq!(decoder.stats().truncated_frames, 0);
    }

    #[test]
    fn off_during_mark_counts_mark_rejection() {
        let (_, mut decoder) = capture();
        decoder.feed(SignalChange::new(LightLevel::White, 9600));
        decoder.feed(SignalChange::new(LightLevel::Off, 4800));
        // A space where a symbol mark is due.
        decoder.feed(SignalChange::new(LightLevel::Off, 600));

        let stats = decoder.stats();
        assert_eq!(stats.mark_rejections, 1);
        assert_eq!(stats.truncated_frames, 1);
    }

    #[test]
    fn wrong_mark_length_counts_mark_rejection() {
        let (_, mut decoder) = capture();
        decoder.feed(SignalChange::new(LightLevel::White, 9600));
        decoder.feed(SignalChange::new(LightLevel::Off, 4800));
        // Three units is outside the ±1 floor around one unit.
        decoder.feed(SignalChange::new(LightLevel::Green, 1800));

        assert_eq!(decoder.stats().mark_rejections, 1);
    }

    #[test]
    fn color_during_space_counts_duration_rejection() {
        let (_, mut decoder) = capture();
        decoder.feed(SignalChange::new(LightLevel::White, 9600));
        decoder.feed(SignalChange::new(LightLevel::Off, 4800));
        decoder.feed(SignalChange::new(LightLevel::Green, 600));
        decoder.feed(SignalChange::new(LightLevel::Blue, 600));

        let stats = decoder.stats();
        assert_eq!(stats.duration_rejections, 1);
        assert_eq!(stats.truncated_frames, 1);
    }

    #[test]
    fn long_separator_tolerated() {
        let (received, mut decoder) = capture();
        let config = ProtocolConfig::default();
        let pulses = Encoder::new(config.clone()).unwrap().encode(b"Z").unwrap();
        for &pulse in &pulses {
            if pulse.level == LightLevel::Off && pulse.duration_micros == 600 {
                // Stretch every separator to five units of idle.
                decoder.feed(SignalChange::new(LightLevel::Off, 3000));
            } else {
                decoder.feed(pulse);
            }
        }
        assert_eq!(received.borrow().as_slice(), &[b"Z".to_vec()]);
    }

    #[test]
    fn reset_preserves_stats_and_discards_frame() {
        let (_, mut decoder) = capture();
        decoder.feed(SignalChange::new(LightLevel::Red, 900));
        assert_eq!(decoder.stats().duration_rejections, 1);

        decoder.feed(SignalChange::new(LightLevel::White, 9600));
        decoder.feed(SignalChange::new(LightLevel::Off, 4800));
        decoder.feed(SignalChange::new(LightLevel::Green, 600));
        decoder.reset();

        let stats = decoder.stats();
        assert_eq!(stats.duration_rejections, 1);
        // Manual reset is not an abort; nothing counts as truncated.
        assert_eq!(stats.truncated_frames, 0);
    }

    #[test]
    fn reset_stats_zeroes_counters() {
        let (_, mut decoder) = capture();
        decoder.feed(SignalChange::new(LightLevel::Red, 900));
        decoder.reset_stats();
        assert_eq!(decoder.stats(), DecoderStats::default());
    }

    #[test]
    fn configure_keeps_stats() {
        let (_, mut decoder) = capture();
        decoder.feed(SignalChange::new(LightLevel::Red, 900));
        decoder
            .configure(ProtocolConfig {
                unit_duration_micros: 300,
                ..ProtocolConfig::default()
            })
            .unwrap();
        assert_eq!(decoder.stats().duration_rejections, 1);
        assert_eq!(decoder.config().unit_duration_micros, 300);
    }

    #[test]
    fn length_violation_detected_at_fifth_byte() {
        let (received, mut decoder) = capture();
        // Encode with a permissive config, decode with a tight payload cap:
        // the length field 0x0008 > 4 must be caught mid-frame.
        let pulses = Encoder::new(ProtocolConfig::default())
            .unwrap()
            .encode(&[0u8; 8])
            .unwrap();
        decoder
            .configure(ProtocolConfig {
                max_payload_bytes: 4,
                ..ProtocolConfig::default()
            })
            .unwrap();
        feed_all(&mut decoder, &pulses);

        let stats = decoder.stats();
        assert_eq!(stats.length_violations, 1);
        assert_eq!(stats.frames_decoded, 0);
        assert!(received.borrow().is_empty());
    }

    #[test]
    fn callback_can_be_installed_late() {
        let mut decoder = Decoder::new(ProtocolConfig::default()).unwrap();
        let pulses = Encoder::new(ProtocolConfig::default())
            .unwrap()
            .encode(b"late")
            .unwrap();

        // No callback yet: the frame still counts.
        feed_all(&mut decoder, &pulses);
        assert_eq!(decoder.stats().frames_decoded, 1);

        let received: Rc<RefCell<Vec<Vec<u8>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        decoder.set_callback(move |payload| sink.borrow_mut().push(payload.to_vec()));
        feed_all(&mut decoder, &pulses);

        assert_eq!(decoder.stats().frames_decoded, 2);
        assert_eq!(received.borrow().as_slice(), &[b"late".to_vec()]);
    }

    #[test]
    fn invalid_config_rejected_at_construction() {
        assert!(Decoder::new(ProtocolConfig {
            preamble_mark_units: 0,
            ..ProtocolConfig::default()
        })
        .is_err());
    }
}
