//! Round-trip laws: whatever the encoder emits, the decoder delivers back,
//! exactly once per frame, for every legal payload size.

use std::cell::RefCell;
use std::rc::Rc;

use lumipack_frame::{
    Decoder, Encoder, LightLevel, ProtocolConfig, SignalChange, MAX_PAYLOAD,
};

fn pipeline(config: ProtocolConfig) -> (Encoder, Decoder, Rc<RefCell<Vec<Vec<u8>>>>) {
    let encoder = Encoder::new(config.clone()).unwrap();
    let received: Rc<RefCell<Vec<Vec<u8>>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&received);
    let decoder = Decoder::with_callback(config, move |payload| {
        sink.borrow_mut().push(payload.to_vec());
    })
    .unwrap();
    (encoder, decoder, received)
}

fn feed_all(decoder: &mut Decoder, pulses: &[SignalChange]) {
    for &pulse in pulses {
        decoder.feed(pulse);
    }
}

#[test]
fn empty_payload_round_trips() {
    let (encoder, mut decoder, received) = pipeline(ProtocolConfig::default());
    let pulses = encoder.encode(&[]).unwrap();

    // One long white mark, one long space, 36 mark/separator pairs for the
    // nine envelope bytes, one trailing gap.
    assert_eq!(pulses.len(), 75);
    assert_eq!(pulses[0], SignalChange::new(LightLevel::White, 9600));
    assert_eq!(pulses[1], SignalChange::new(LightLevel::Off, 4800));
    assert_eq!(*pulses.last().unwrap(), SignalChange::new(LightLevel::Off, 7200));

    feed_all(&mut decoder, &pulses);
    assert_eq!(received.borrow().as_slice(), &[Vec::<u8>::new()]);
    assert_eq!(decoder.stats().frames_decoded, 1);
}

#[test]
fn text_payload_round_trips() {
    let (encoder, mut decoder, received) = pipeline(ProtocolConfig::default());
    feed_all(&mut decoder, &encoder.encode(b"Hi").unwrap());
    assert_eq!(received.borrow().as_slice(), &[vec![0x48, 0x69]]);
}

#[test]
fn max_payload_round_trips() {
    let (encoder, mut decoder, received) = pipeline(ProtocolConfig::default());
    let payload: Vec<u8> = (0..MAX_PAYLOAD).map(|i| i as u8).collect();
    feed_all(&mut decoder, &encoder.encode(&payload).unwrap());

    assert_eq!(received.borrow().as_slice(), &[payload]);
    assert_eq!(decoder.stats().frames_decoded, 1);
}

#[test]
fn oversized_payload_fails_encode() {
    let (encoder, _, _) = pipeline(ProtocolConfig::default());
    assert!(encoder.encode(&vec![0u8; MAX_PAYLOAD + 1]).is_err());
}

#[test]
fn every_byte_value_survives() {
    let (encoder, mut decoder, received) = pipeline(ProtocolConfig::default());
    let payload: Vec<u8> = (0..=255u8).collect();
    feed_all(&mut decoder, &encoder.encode(&payload).unwrap());
    assert_eq!(received.borrow().as_slice(), &[payload]);
}

#[test]
fn consecutive_frames_decode_in_order() {
    let (encoder, mut decoder, received) = pipeline(ProtocolConfig::default());
    feed_all(&mut decoder, &encoder.encode(b"A").unwrap());
    feed_all(&mut decoder, &encoder.encode(b"B").unwrap());

    assert_eq!(
        received.borrow().as_slice(),
        &[b"A".to_vec(), b"B".to_vec()]
    );
    assert_eq!(decoder.stats().frames_decoded, 2);
    assert_eq!(decoder.stats().truncated_frames, 0);
}

#[test]
fn frame_gap_is_optional() {
    let (encoder, mut decoder, received) = pipeline(ProtocolConfig::default());
    let mut first = encoder.encode(b"A").unwrap();
    first.pop(); // drop the trailing gap; the next preamble resynchronizes
    feed_all(&mut decoder, &first);
    feed_all(&mut decoder, &encoder.encode(b"B").unwrap());

    assert_eq!(
        received.borrow().as_slice(),
        &[b"A".to_vec(), b"B".to_vec()]
    );
}

#[test]
fn round_trips_under_alternate_config() {
    let config = ProtocolConfig {
        unit_duration_micros: 250,
        preamble_mark_units: 20,
        preamble_space_units: 10,
        symbol_mark_units: 2,
        separator_units: 2,
        frame_gap_units: 8,
        preamble_color: LightLevel::Blue,
        magic: 0xBEEF,
        ender: 0x0DD0,
        version: 7,
        ..ProtocolConfig::default()
    };
    let (encoder, mut decoder, received) = pipeline(config);
    feed_all(&mut decoder, &encoder.encode(b"alt").unwrap());
    assert_eq!(received.borrow().as_slice(), &[b"alt".to_vec()]);
}

#[test]
fn constant_jitter_within_drift_still_decodes() {
    let (encoder, mut decoder, received) = pipeline(ProtocolConfig::default());
    // Every pulse arrives 100µs late: one sixth of a unit of quantization
    // error, inside the default 20% band regardless of pulse length.
    for pulse in encoder.encode(b"drift").unwrap() {
        decoder.feed(SignalChange::new(pulse.level, pulse.duration_micros + 100));
    }
    assert_eq!(received.borrow().as_slice(), &[b"drift".to_vec()]);
    assert_eq!(decoder.stats().duration_rejections, 0);
}

#[test]
fn single_unit_pulse_at_band_edge_accepted() {
    let (encoder, mut decoder, received) = pipeline(ProtocolConfig::default());
    // Scale only the single-unit pulses to 120% of nominal; the preamble and
    // gap stay exact. The edge of the band is still accepted.
    for pulse in encoder.encode(b"edge").unwrap() {
        let duration = if pulse.duration_micros == 600 {
            720
        } else {
            pulse.duration_micros
        };
        decoder.feed(SignalChange::new(pulse.level, duration));
    }
    assert_eq!(received.borrow().as_slice(), &[b"edge".to_vec()]);
    assert_eq!(decoder.stats().duration_rejections, 0);
}

#[test]
fn pulse_duration_outside_drift_rejected() {
    let (_, mut decoder, _) = pipeline(ProtocolConfig::default());
    // 1.25 units: nearest count is 1, error 0.25 > 0.20.
    decoder.feed(SignalChange::new(LightLevel::Red, 750));
    assert_eq!(decoder.stats().duration_rejections, 1);
}

#[test]
fn stats_accumulate_across_frames() {
    let (encoder, mut decoder, _) = pipeline(ProtocolConfig::default());
    for i in 0..10u8 {
        feed_all(&mut decoder, &encoder.encode(&[i]).unwrap());
    }
    assert_eq!(decoder.stats().frames_decoded, 10);
}
