//! Formats a decoded capture buffer as the text the operator's console
//! shows.
//!
//! Grounded on `examples/original_source/firmware/display.c`: one pass
//! over the processed buffer, computing a display-relative timestamp per
//! record, collapsing foldable SOF runs, and dispatching to a per-PID
//! formatter. Kept entirely free of the hardware/console transport this
//! crate doesn't own (spec.md §1's "Out of scope"); callers push the
//! returned `String` out to the console byte by byte themselves.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::buffer::{processed_record_word_count, record_bytes, BufferInfo, CaptureBuffer};
use crate::flags::Flags;
use crate::pid::Pid;
use crate::settings::{DisplayData, DisplayFold, DisplayTime, Settings};

/// A record's timestamp is declared corrupt if it jumps by more than this
/// many microseconds from the previous record, per spec.md §4.3.
const MAX_PACKET_DELTA_US: u32 = 10_000;

/// Renders an entire processed buffer as CRLF-terminated text, per
/// spec.md §6's "Output is CRLF-terminated ASCII".
#[must_use]
pub fn render(buffer: &CaptureBuffer, info: &BufferInfo, settings: &Settings) -> String {
  if buffer.is_empty() {
    return String::from("\r\nCapture buffer is empty\r\n");
  }

  let mut out = String::new();
  let mut reference_time: Option<u32> = None;
  let mut previous_time: Option<u32> = None;
  let mut check_delta = true;
  let mut folding = false;
  let mut fold_count: u32 = 0;

  for (flags, timestamp, payload) in RecordIter::new(buffer.words()) {
    if check_delta {
      if let Some(prev) = previous_time {
        let delta = timestamp.wrapping_sub(prev) as i32;
        if delta > MAX_PACKET_DELTA_US as i32 {
          out.push_str(
            "Time delta between packets is too large, possible buffer corruption.\r\n",
          );
          return out;
        }
      }
    }
    previous_time = Some(timestamp);
    check_delta = true;

    let pid = record_pid(flags, payload);
    // A Low-Speed SOF keep-alive is treated as an SOF for folding and
    // reference-time purposes, matching `examples/original_source/
    // firmware/display.c`'s `if (flags & CAPTURE_LS_SOF) pid = Pid_Sof;`.
    let effective_pid = if flags.ls_sof() { Some(Pid::Sof) } else { pid };
    let is_sof = effective_pid == Some(Pid::Sof);
    let is_reset = flags.reset();

    let display_time = timestamp.wrapping_sub(reference_time.unwrap_or(timestamp));
    update_reference_time(&mut reference_time, settings, timestamp, is_sof, is_reset);

    if folding {
      if effective_pid != Some(Pid::Sof) {
        // Every record between two foldable SOFs is silently dropped,
        // not merely counted — matching `display.c`'s `print_packet`:
        // `if (g_folding) { if (pid != Pid_Sof) return true; ... }`.
        continue;
      }
      if flags.may_fold() {
        fold_count += 1;
        continue;
      }
      out.push_str(&fold_summary_line(fold_count));
      folding = false;
      fold_count = 0;
      // Falls through to print this SOF normally: it cannot also start a
      // new fold run, since `flags.may_fold()` just tested false above.
    } else if flags.may_fold() && settings.display_fold == DisplayFold::Enabled {
      folding = true;
      fold_count = 1;
      continue;
    }

    // `format_dec` (`utils.c:70-96`) right-justifies with spaces, not
    // zeros: it pushes digits then pads with `size` spaces before
    // reversing the buffer.
    out.push_str(&format!("{display_time:6} : "));
    out.push_str(&format_record(flags, pid, payload, settings.display_data));
    out.push_str("\r\n");

    if is_reset {
      // The record immediately following a reset skips the delta-sanity
      // check, since the gap across a bus reset is not bounded the way
      // in-session gaps are.
      check_delta = false;
    }
  }

  if folding && fold_count > 0 {
    out.push_str(&fold_summary_line(fold_count));
  }

  out.push_str(&trailer(info));
  out
}

fn update_reference_time(
  reference_time: &mut Option<u32>,
  settings: &Settings,
  timestamp: u32,
  is_sof: bool,
  is_reset: bool,
) {
  match settings.display_time {
    DisplayTime::FirstPacket => {
      if reference_time.is_none() {
        *reference_time = Some(timestamp);
      }
    }
    DisplayTime::PreviousPacket => *reference_time = Some(timestamp),
    DisplayTime::Sof => {
      if is_sof {
        *reference_time = Some(timestamp);
      }
    }
    DisplayTime::Reset => {
      if is_reset {
        *reference_time = Some(timestamp);
      }
    }
  }
}

fn record_pid(flags: Flags, payload: &[u32]) -> Option<Pid> {
  if flags.reset() || flags.ls_sof() || flags.size() < 2 {
    return None;
  }
  let bytes = record_bytes(payload, flags.size());
  Some(Pid::from_nibble(bytes[1] & 0x0f))
}

fn format_record(flags: Flags, pid: Option<Pid>, payload: &[u32], display_data: DisplayData) -> String {
  if flags.reset() {
    return String::from("--- RESET ---");
  }
  if flags.ls_sof() {
    return String::from("LS SOF");
  }

  let bytes = record_bytes(payload, flags.size());

  if flags.has_error() {
    return format_error(flags, bytes);
  }

  match pid {
    Some(Pid::Sof) => {
      let raw16 = u16::from(bytes[2]) | (u16::from(bytes[3]) << 8);
      format!("SOF #{}", raw16 & 0x7ff)
    }
    Some(p @ (Pid::In | Pid::Out | Pid::Setup)) => {
      let raw16 = u16::from(bytes[2]) | (u16::from(bytes[3]) << 8);
      let addr = raw16 & 0x7f;
      let ep = (raw16 >> 7) & 0x0f;
      format!("{}: 0x{addr:02x}/{ep}", p.name())
    }
    Some(Pid::Split) => {
      let hub_addr = bytes[2] & 0x7f;
      let sc = (bytes[2] >> 7) & 1;
      let port = bytes[3] & 0x7f;
      let s = (bytes[3] >> 7) & 1;
      let e = bytes[4] & 1;
      let et = (bytes[4] >> 1) & 0x3;
      format!("SPLIT: HubAddr=0x{hub_addr:02x}, SC={sc}, Port=0x{port:02x}, S={s}, E={e}, ET={et}")
    }
    Some(p @ (Pid::Ack | Pid::Nak | Pid::Stall | Pid::Nyet)) => String::from(p.name()),
    Some(p @ (Pid::Data0 | Pid::Data1 | Pid::Data2 | Pid::MData)) => {
      format_data(p, &bytes[2..bytes.len() - 2], display_data)
    }
    Some(p) => String::from(p.name()),
    None => String::new(),
  }
}

fn format_data(pid: Pid, data: &[u8], display_data: DisplayData) -> String {
  if data.is_empty() {
    return format!("{}: ZLP", pid.name());
  }
  let limit = display_data.limit().unwrap_or(data.len());
  let shown = &data[..data.len().min(limit)];
  let mut hex = String::new();
  for b in shown {
    hex.push_str(&format!("{b:02x} "));
  }
  let truncated = shown.len() < data.len();
  format!(
    "{} ({}): {}{}",
    pid.name(),
    data.len(),
    hex,
    if truncated { "..." } else { "" }
  )
}

/// Errored records always truncate their raw-byte dump to 16 bytes,
/// independent of the `display_data` setting, per spec.md §4.3.
const ERROR_DATA_SIZE_LIMIT: usize = 16;

fn format_error(flags: Flags, bytes: &[u8]) -> String {
  let names: Vec<&str> = flags.error_names().collect();
  let mut s = format!("ERROR [{}]: ", names.join(", "));
  if !bytes.is_empty() {
    s.push_str(&format!("SYNC=0x{:02x}, ", bytes[0]));
  }
  if bytes.len() >= 2 {
    s.push_str(&format!("PID=0x{:02x}, ", bytes[1]));
  }
  s.push_str("DATA: ");
  let shown = &bytes[..bytes.len().min(ERROR_DATA_SIZE_LIMIT)];
  for b in shown {
    s.push_str(&format!("{b:02x} "));
  }
  if bytes.len() > ERROR_DATA_SIZE_LIMIT {
    s.push_str("...");
  }
  s
}

fn fold_summary_line(count: u32) -> String {
  format!("   ... : Folded {}\r\n", display_value("frame", count))
}

/// Appends `s` to `label` unless `count == 1`, matching the original
/// firmware's `display_value`.
fn display_value(label: &str, count: u32) -> String {
  if count == 1 {
    format!("1 {label}")
  } else {
    format!("{count} {label}s")
  }
}

fn trailer(info: &BufferInfo) -> String {
  let packet_label = if info.full_speed { "FS packet" } else { "LS packet" };
  format!(
    "Total: {}, {}, {}, {}, {}\r\n",
    display_value("error", info.errors),
    display_value("bus reset", info.resets),
    display_value(packet_label, info.count),
    display_value("frame", info.frames),
    display_value("empty frame", info.folded),
  )
}

struct RecordIter<'a> {
  words: &'a [u32],
  pos: usize,
}

impl<'a> RecordIter<'a> {
  fn new(words: &'a [u32]) -> Self {
    Self { words, pos: 0 }
  }
}

impl<'a> Iterator for RecordIter<'a> {
  type Item = (Flags, u32, &'a [u32]);

  fn next(&mut self) -> Option<Self::Item> {
    if self.pos >= self.words.len() {
      return None;
    }
    let flags = Flags::from_bits(self.words[self.pos]);
    let timestamp = self.words[self.pos + 1];
    let word_count = processed_record_word_count(flags.size());
    let payload = &self.words[self.pos + 2..self.pos + word_count];
    self.pos += word_count;
    Some((flags, timestamp, payload))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::buffer::BUFFER_WORDS;

  fn one_record_buffer(flags: Flags, timestamp: u32, bytes: &[u8]) -> CaptureBuffer {
    let mut buf = CaptureBuffer::new();
    {
      let words = buf.words_mut();
      words[0] = flags.into_bits();
      words[1] = timestamp;
      for (i, chunk) in bytes.chunks(4).enumerate() {
        let mut w = 0u32;
        for (j, &b) in chunk.iter().enumerate() {
          w |= (b as u32) << (8 * j);
        }
        words[2 + i] = w;
      }
    }
    buf.set_len(2 + bytes.len().div_ceil(4));
    let _ = BUFFER_WORDS;
    buf
  }

  #[test]
  fn empty_buffer_message() {
    let buf = CaptureBuffer::new();
    let info = BufferInfo::new(true, false, 0);
    let settings = Settings::default();
    assert_eq!(render(&buf, &info, &settings), "\r\nCapture buffer is empty\r\n");
  }

  #[test]
  fn s1_full_speed_sof_42() {
    let bytes = [0x80u8, 0xa5, 0x2a, 0x50];
    let flags = Flags::new().with_size(bytes.len() as u16);
    let buf = one_record_buffer(flags, 0, &bytes);
    let info = BufferInfo::new(true, false, 0);
    let settings = Settings::default();
    let text = render(&buf, &info, &settings);
    assert!(text.contains("SOF #42"), "{text}");
  }

  #[test]
  fn s2_in_to_address_0x12_endpoint_3() {
    let bytes = [0x80u8, 0x69, 0x92, 0xd1];
    let flags = Flags::new().with_size(bytes.len() as u16);
    let buf = one_record_buffer(flags, 0, &bytes);
    let info = BufferInfo::new(true, false, 0);
    let settings = Settings::default();
    let text = render(&buf, &info, &settings);
    assert!(text.contains("IN: 0x12/3"), "{text}");
  }

  #[test]
  fn s3_ack_handshake() {
    let bytes = [0x80u8, 0xd2];
    let flags = Flags::new().with_size(bytes.len() as u16);
    let buf = one_record_buffer(flags, 0, &bytes);
    let info = BufferInfo::new(true, false, 0);
    let settings = Settings::default();
    let text = render(&buf, &info, &settings);
    assert!(text.contains("ACK"), "{text}");
  }

  #[test]
  fn s4_data0_zlp() {
    let bytes = [0x80u8, 0xc3, 0x00, 0x00];
    let flags = Flags::new().with_size(bytes.len() as u16);
    let buf = one_record_buffer(flags, 0, &bytes);
    let info = BufferInfo::new(true, false, 0);
    let settings = Settings::default();
    let text = render(&buf, &info, &settings);
    assert!(text.contains("DATA0: ZLP"), "{text}");
  }

  #[test]
  fn display_time_is_space_padded_not_zero_padded() {
    let bytes = [0x80u8, 0xd2];
    let flags = Flags::new().with_size(bytes.len() as u16);
    let buf = one_record_buffer(flags, 0, &bytes);
    let info = BufferInfo::new(true, false, 0);
    let settings = Settings::default();
    let text = render(&buf, &info, &settings);
    assert!(text.contains("     0 : "), "{text}");
    assert!(!text.contains("000000"), "{text}");
  }

  #[test]
  fn s5_reset_record() {
    let flags = Flags::new().with_reset(true);
    let buf = one_record_buffer(flags, 0, &[]);
    let mut info = BufferInfo::new(true, false, 0);
    info.resets = 1;
    let settings = Settings::default();
    let text = render(&buf, &info, &settings);
    assert!(text.contains("--- RESET ---"));
    assert!(text.contains("1 bus reset"));
  }

  #[test]
  fn folding_silently_drops_intervening_non_sof_records() {
    // SOF1 (foldable) -> IN -> SOF2 (not foldable, nothing confirms it).
    // The IN token must never reach the output: once a fold run starts,
    // every non-SOF record until the closing SOF is dropped outright, not
    // merely treated as "not itself foldable".
    let mut buf = CaptureBuffer::new();
    {
      let words = buf.words_mut();
      let sof_flags = Flags::new().with_size(4).with_may_fold(true);
      words[0] = sof_flags.into_bits();
      words[1] = 0;
      words[2] = u32::from_le_bytes([0x80, 0xa5, 0x2a, 0x50]);

      let in_flags = Flags::new().with_size(4);
      words[3] = in_flags.into_bits();
      words[4] = 100;
      words[5] = u32::from_le_bytes([0x80, 0x69, 0x92, 0xd1]);

      let sof2_flags = Flags::new().with_size(4);
      words[6] = sof2_flags.into_bits();
      words[7] = 1000;
      words[8] = u32::from_le_bytes([0x80, 0xa5, 0x2a, 0x50]);
    }
    buf.set_len(9);

    let info = BufferInfo::new(true, false, 0);
    let settings = Settings::default();
    let text = render(&buf, &info, &settings);
    assert!(!text.contains("IN:"), "{text}");
    assert!(text.contains("Folded 1 frame"), "{text}");
    assert_eq!(text.matches("SOF #42").count(), 1, "{text}");
  }

  #[test]
  fn backward_timestamp_jump_is_not_corruption() {
    // A backward jump is a negative `delta` in the original's signed `int`
    // comparison (`display.c:275-283`), not a huge unsigned one — it must
    // not trip the corruption check.
    let mut buf = CaptureBuffer::new();
    {
      let words = buf.words_mut();
      let flags = Flags::new().with_size(2);
      words[0] = flags.into_bits();
      words[1] = 1000;
      words[2] = u32::from_le_bytes([0x80, 0xd2, 0, 0]);

      words[3] = flags.into_bits();
      words[4] = 990;
      words[5] = u32::from_le_bytes([0x80, 0xd2, 0, 0]);
    }
    buf.set_len(6);

    let info = BufferInfo::new(true, false, 0);
    let settings = Settings::default();
    let text = render(&buf, &info, &settings);
    assert!(!text.contains("possible buffer corruption"), "{text}");
  }

  #[test]
  fn large_forward_timestamp_jump_is_corruption() {
    let mut buf = CaptureBuffer::new();
    {
      let words = buf.words_mut();
      let flags = Flags::new().with_size(2);
      words[0] = flags.into_bits();
      words[1] = 0;
      words[2] = u32::from_le_bytes([0x80, 0xd2, 0, 0]);

      words[3] = flags.into_bits();
      words[4] = MAX_PACKET_DELTA_US + 1;
      words[5] = u32::from_le_bytes([0x80, 0xd2, 0, 0]);
    }
    buf.set_len(6);

    let info = BufferInfo::new(true, false, 0);
    let settings = Settings::default();
    let text = render(&buf, &info, &settings);
    assert!(
      text.contains("Time delta between packets is too large, possible buffer corruption.\r\n")
    );
  }

  #[test]
  fn trailer_pluralizes_independently() {
    let buf = one_record_buffer(Flags::new().with_reset(true), 0, &[]);
    let mut info = BufferInfo::new(true, false, 0);
    info.errors = 1;
    info.resets = 2;
    info.frames = 0;
    info.folded = 0;
    let settings = Settings::default();
    let text = render(&buf, &info, &settings);
    assert!(text.contains("1 error"));
    assert!(text.contains("2 bus resets"));
  }
}
