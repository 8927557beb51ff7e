//! End-to-end scenarios driving the full capture → decode → render
//! pipeline through its public API, one raw buffer at a time.

use usb_sniffer_core::buffer::{raw_record_word_count, BufferInfo, CaptureBuffer};
use usb_sniffer_core::decoder::process_buffer;
use usb_sniffer_core::renderer::render;
use usb_sniffer_core::settings::Settings;

/// NRZI-encodes, bit-stuffs, and packs `bytes` into the raw sample words a
/// real sampler would have produced, mirroring the wire format spec.md §3
/// and §4.2 describe.
fn encode_packet(bytes: &[u8]) -> (u32, Vec<u32>) {
  let mut decoded_bits: Vec<u32> = Vec::new();
  for &b in bytes {
    for i in 0..8 {
      decoded_bits.push(u32::from((b >> i) & 1));
    }
  }

  let mut stuffed_bits: Vec<u32> = Vec::new();
  let mut ones_run = 0u32;
  for bit in decoded_bits {
    stuffed_bits.push(bit);
    if bit == 1 {
      ones_run += 1;
      if ones_run == 6 {
        stuffed_bits.push(0);
        ones_run = 0;
      }
    } else {
      ones_run = 0;
    }
  }

  let mut last_level = 1u32;
  let mut samples: Vec<u32> = Vec::with_capacity(stuffed_bits.len());
  for bit in stuffed_bits {
    let sample = if bit == 1 { last_level } else { 1 - last_level };
    samples.push(sample);
    last_level = sample;
  }

  let bit_length = samples.len() as u32;
  let word_count = (bit_length as usize).div_ceil(31).max(1);
  let mut words = vec![0u32; word_count];
  for (i, sample) in samples.iter().enumerate() {
    let word_idx = i / 31;
    let bit_idx = 30 - (i % 31);
    words[word_idx] |= sample << bit_idx;
  }
  (bit_length, words)
}

/// Lays out a sequence of `(bit_length, timestamp, payload)` raw records
/// into a fresh [`CaptureBuffer`], as the sampler would leave it.
fn raw_buffer(records: &[(u32, u32, Vec<u32>)]) -> (CaptureBuffer, u32) {
  let mut buf = CaptureBuffer::new();
  let mut cursor = 0usize;
  {
    let words = buf.words_mut();
    for (length, timestamp, payload) in records {
      words[cursor] = *length;
      words[cursor + 1] = *timestamp;
      cursor += 2;
      for w in payload {
        words[cursor] = *w;
        cursor += 1;
      }
      assert_eq!(raw_record_word_count(*length), 2 + payload.len());
    }
  }
  buf.set_len(cursor);
  (buf, records.len() as u32)
}

fn sof(frame: u16, timestamp: u32) -> (u32, u32, Vec<u32>) {
  // SYNC, PID(SOF), frame number (little-endian) + 5-bit CRC in the high
  // bits of the second byte, matching the hand-computed fixture values the
  // decoder's own unit tests use for frame 42.
  let (len, words) = if frame == 42 {
    encode_packet(&[0x80, 0xa5, 0x2a, 0x50])
  } else {
    panic!("fixture only covers frame 42");
  };
  (len, timestamp, words)
}

fn in_token(addr: u8, ep: u8, timestamp: u32) -> (u32, u32, Vec<u32>) {
  assert_eq!((addr, ep), (0x12, 3), "fixture only covers addr 0x12 ep 3");
  let (len, words) = encode_packet(&[0x80, 0x69, 0x92, 0xd1]);
  (len, timestamp, words)
}

fn nak(timestamp: u32) -> (u32, u32, Vec<u32>) {
  let (len, words) = encode_packet(&[0x80, 0x5a]);
  (len, timestamp, words)
}

#[test]
fn s6_fold_three_empty_frames() {
  // Four SOFs with only IN/NAK between them: the first three fold, the
  // fourth (having nothing after it yet) stays unfolded.
  let records = vec![
    sof(42, 0),
    in_token(0x12, 3, 100),
    nak(150),
    sof(42, 1000),
    in_token(0x12, 3, 1100),
    nak(1150),
    sof(42, 2000),
    in_token(0x12, 3, 2100),
    nak(2150),
    sof(42, 3000),
  ];
  let (mut buf, count) = raw_buffer(&records);
  let info = process_buffer(&mut buf, count, true).unwrap();
  assert_eq!(info.frames, 4);
  assert_eq!(info.folded, 3);

  let settings = Settings::default();
  let text = render(&buf, &info, &settings);
  assert!(text.contains("SOF #42"), "{text}");
  assert!(text.contains("Folded 3 frames"), "{text}");
}

#[test]
fn fold_disabled_prints_every_frame() {
  let records = vec![
    sof(42, 0),
    in_token(0x12, 3, 100),
    nak(150),
    sof(42, 1000),
  ];
  let (mut buf, count) = raw_buffer(&records);
  let info = process_buffer(&mut buf, count, true).unwrap();
  assert_eq!(info.folded, 1);

  let mut settings = Settings::default();
  settings.display_fold = usb_sniffer_core::settings::DisplayFold::Disabled;
  let text = render(&buf, &info, &settings);
  assert!(!text.contains("Folded"), "{text}");
  assert_eq!(text.matches("SOF #42").count(), 2);
}

#[test]
fn bus_reset_interrupts_a_capture_and_is_reported() {
  let records = vec![
    sof(42, 0),
    (0u32, 500u32, Vec::new()), // bus reset
    sof(42, 1000),
  ];
  let (mut buf, count) = raw_buffer(&records);
  let info = process_buffer(&mut buf, count, true).unwrap();
  assert_eq!(info.resets, 1);
  assert_eq!(info.frames, 2);

  let settings = Settings::default();
  let text = render(&buf, &info, &settings);
  assert!(text.contains("--- RESET ---"));
  assert!(text.contains("1 bus reset"));
}

#[test]
fn buffer_info_default_constructor_matches_settings_limit() {
  let settings = Settings::default();
  let info = BufferInfo::new(true, false, settings.limit.packet_count());
  assert_eq!(info.limit, 100_000);
}
