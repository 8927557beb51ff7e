//! The line-level sampler's contract with the rest of the pipeline.
//!
//! spec.md §4.1 describes the sampler as an independent hardware state
//! machine (the RP2040's PIO block, per
//! `examples/original_source/firmware/pio_asm.h`) that streams raw,
//! time-stamped bit-words into the capture buffer at wire speed. This
//! module does not reimplement that state machine (see [`program`] for the
//! portable, testable part of it, and the `on_device`-gated `hw` submodule
//! for the register glue); it defines the traits the capture core drains
//! the hardware FIFO through, and [`run_capture`], which generalizes
//! `examples/original_source/firmware/capture.c`'s `capture_buffer()` over
//! those traits so it can run against a mock FIFO under `cargo test`.

pub mod program;

#[cfg(feature = "on_device")]
#[cfg_attr(feature = "doc_cfg", doc(cfg(feature = "on_device")))]
pub mod hw;

use alloc::vec::Vec;

use crate::buffer::CaptureBuffer;

/// A sampler- or acquisition-level failure that aborts the whole capture
/// session, as opposed to a per-packet decode error recorded in a record's
/// flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFault {
  /// A raw record's bit count exceeded `0xFFFF`, per spec.md §4.1 —
  /// evidence the configured bus speed does not match the signal actually
  /// being sampled.
  SynchronizationError,
}

impl core::fmt::Display for CaptureFault {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      Self::SynchronizationError => write!(f, "synchronization error, check speed setting"),
    }
  }
}

/// The sampler's hardware FIFO, one 32-bit word at a time.
///
/// A word with its MSB set is a control word marking the end of a packet
/// (the inverted bit count, per spec.md §4.1); all other words carry 31
/// bits of raw sample payload.
pub trait SampleFifo {
  /// Returns the next available word, or `None` if the FIFO is currently
  /// empty (the caller is expected to busy-wait by calling again).
  fn try_read(&mut self) -> Option<u32>;
}

/// A microsecond-resolution free-running counter, latched at EOP.
pub trait Clock {
  /// The current time, in microseconds, relative to whatever epoch the
  /// capture session started at.
  fn now_us(&mut self) -> u32;
}

/// Drains `fifo` into `buffer`, reassembling raw records in the
/// `[length, timestamp, word0, word1, ...]` layout spec.md §3 requires,
/// until either `limit` packets have been captured, the buffer is full, or
/// `should_stop` reports a cancellation request.
///
/// `should_stop` is polled only when the FIFO has no word immediately
/// available, matching spec.md §5's "busy-waits on (a) the sampler FIFO
/// having data, and (b) the command FIFO for operator input" and "exit
/// after the current FIFO drain pass" cancellation semantics: a `true`
/// result never truncates a packet that is already in flight.
///
/// Returns the number of raw records written (`BufferInfo::count`).
pub fn run_capture(
  buffer: &mut CaptureBuffer,
  fifo: &mut impl SampleFifo,
  clock: &mut impl Clock,
  limit: u32,
  mut should_stop: impl FnMut() -> bool,
) -> u32 {
  let capacity = buffer.capacity();
  let mut cursor = 0usize;
  let mut record_count = 0u32;
  let mut pending: Vec<u32> = Vec::new();

  'outer: loop {
    if record_count >= limit {
      break;
    }

    let word = loop {
      if let Some(w) = fifo.try_read() {
        break w;
      }
      if should_stop() {
        break 'outer;
      }
    };

    if word & 0x8000_0000 != 0 {
      let bit_length = 0xffff_ffffu32.wrapping_sub(word);
      let timestamp = clock.now_us();
      if cursor + 2 + pending.len() > capacity {
        break;
      }
      let words = buffer.words_mut();
      words[cursor] = bit_length;
      words[cursor + 1] = timestamp;
      words[cursor + 2..cursor + 2 + pending.len()].copy_from_slice(&pending);
      cursor += 2 + pending.len();
      pending.clear();
      record_count += 1;
    } else {
      pending.push(word & 0x7fff_ffff);
    }
  }

  buffer.set_len(cursor);
  record_count
}

#[cfg(test)]
mod tests {
  use super::*;
  use alloc::collections::VecDeque;

  struct MockFifo(VecDeque<u32>);
  impl SampleFifo for MockFifo {
    fn try_read(&mut self) -> Option<u32> {
      self.0.pop_front()
    }
  }

  struct MockClock(u32);
  impl Clock for MockClock {
    fn now_us(&mut self) -> u32 {
      self.0 += 1;
      self.0
    }
  }

  #[test]
  fn reassembles_one_record_with_header_before_payload() {
    let mut buf = CaptureBuffer::new();
    let mut fifo = MockFifo(VecDeque::from([0x1111_1111u32, 0x2222_2222, 0xffff_fffd]));
    let mut clock = MockClock(0);
    let mut stopped = false;
    let count = run_capture(&mut buf, &mut fifo, &mut clock, 10, || {
      let was = stopped;
      stopped = true;
      was
    });
    assert_eq!(count, 1);
    let words = buf.words();
    assert_eq!(words[0], 2); // 0xffffffff - 0xfffffffd
    assert_eq!(words[2], 0x1111_1111);
    assert_eq!(words[3], 0x2222_2222);
  }

  #[test]
  fn stops_after_limit_packets() {
    let mut buf = CaptureBuffer::new();
    let mut fifo =
      MockFifo(VecDeque::from([0xffff_ffffu32, 0xffff_ffffu32, 0xffff_ffffu32]));
    let mut clock = MockClock(0);
    let count = run_capture(&mut buf, &mut fifo, &mut clock, 2, || true);
    assert_eq!(count, 2);
  }

  #[test]
  fn cancellation_only_checked_when_fifo_is_empty() {
    let mut buf = CaptureBuffer::new();
    let mut fifo = MockFifo(VecDeque::from([0xffff_ffffu32]));
    let mut clock = MockClock(0);
    let count = run_capture(&mut buf, &mut fifo, &mut clock, 100, || true);
    assert_eq!(count, 1);
  }
}
