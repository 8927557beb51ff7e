//! The capture buffer and its accompanying bookkeeping record.
//!
//! Grounded on spec.md §3's two-lifetime buffer (`raw phase` / `processed
//! phase` sharing one backing store) and on
//! `examples/rust-console-gba/src/base/color.rs`'s `bytemuck`-based
//! reinterpretation of a `[u32]` region as bytes, used here the other
//! direction: a processed record's payload words are viewed as a `[u8]`
//! slice for the renderer without copying.
//!
//! This module owns storage and the word-count arithmetic both the decoder
//! and the renderer need to walk records; it does not itself decide where
//! record boundaries fall at runtime (that is `decoder`'s job) or interpret
//! annotation bits (that is `flags`'s job).

use alloc::vec;
use alloc::vec::Vec;

/// `232 KiB` of 32-bit words, matching the original firmware's
/// `BUFFER_SIZE = (232 * 1024) / sizeof(uint32_t)`.
pub const BUFFER_WORDS: usize = (232 * 1024) / 4;

/// Number of words a raw-phase record occupies: a `[length, timestamp]`
/// header plus one word per 31 raw bits (the sampler packs 31 payload bits
/// per word, reserving the MSB as its own control-word marker per spec.md
/// §4.1).
///
/// `bit_length` of `0` (bus reset) or `1` (Low-Speed SOF / Full-Speed
/// discard marker) carries no payload words, matching the original's
/// synthetic zero-payload records.
#[inline]
#[must_use]
pub const fn raw_record_word_count(bit_length: u32) -> usize {
  if bit_length <= 1 {
    2
  } else {
    2 + ceil_div(bit_length as usize, 31)
  }
}

/// Number of words a processed-phase record occupies: a `[flags,
/// timestamp]` header plus one word per 4 decoded bytes.
#[inline]
#[must_use]
pub const fn processed_record_word_count(byte_size: u16) -> usize {
  2 + ceil_div(byte_size as usize, 4)
}

#[inline]
const fn ceil_div(a: usize, b: usize) -> usize {
  (a + b - 1) / b
}

/// Views a processed record's payload words as the little-endian byte
/// stream the renderer and decoder both want, trimmed to exactly
/// `byte_size` bytes.
///
/// `payload_words` must be at least `ceil(byte_size / 4)` words; this is
/// the caller's responsibility (it always holds for a record written by
/// [`crate::decoder`]).
#[must_use]
pub fn record_bytes(payload_words: &[u32], byte_size: u16) -> &[u8] {
  let bytes: &[u8] = bytemuck::cast_slice(payload_words);
  &bytes[..byte_size as usize]
}

/// The capture buffer: a flat word store shared, in turn, by the raw
/// sampler output and the processed decoder output.
///
/// Allocated once at [`Self::new`] and reused across capture sessions
/// (the original firmware's single static `g_buffer`, made an owned,
/// explicitly-passed value per spec.md §9's "Global mutable state" design
/// note).
pub struct CaptureBuffer {
  words: Vec<u32>,
  /// Number of words currently holding meaningful data, starting at index
  /// 0. Set by the sampler at the end of raw acquisition, then shrunk by
  /// the decoder as it rewrites the buffer in place.
  len: usize,
}

impl CaptureBuffer {
  /// Allocates a zeroed buffer of [`BUFFER_WORDS`] words.
  #[must_use]
  pub fn new() -> Self {
    Self { words: vec![0u32; BUFFER_WORDS], len: 0 }
  }

  /// Total capacity in words.
  #[inline]
  #[must_use]
  pub fn capacity(&self) -> usize {
    self.words.len()
  }

  /// Number of words currently valid.
  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.len
  }

  /// Whether the buffer holds no valid words.
  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// The full backing store, writable, for the sampler to fill during raw
  /// acquisition and for the decoder to rewrite in place.
  #[inline]
  #[must_use]
  pub fn words_mut(&mut self) -> &mut [u32] {
    &mut self.words
  }

  /// The valid prefix of the buffer, read-only.
  #[inline]
  #[must_use]
  pub fn words(&self) -> &[u32] {
    &self.words[..self.len]
  }

  /// Records how many words are valid. Called by the sampler after raw
  /// acquisition ends, and by the decoder after it finishes rewriting the
  /// buffer in place (the processed form is always the same length or
  /// shorter).
  #[inline]
  pub fn set_len(&mut self, len: usize) {
    debug_assert!(len <= self.words.len());
    self.len = len;
  }
}

impl Default for CaptureBuffer {
  fn default() -> Self {
    Self::new()
  }
}

/// Bookkeeping that accompanies a capture buffer: the original's
/// `buffer_info_t`, generalized from bitfields to plain fields since this
/// crate is not register-packed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferInfo {
  /// `true` if this capture ran at Full-Speed, `false` for Low-Speed.
  pub full_speed: bool,
  /// Whether the session waited for an external trigger.
  pub triggered: bool,
  /// The configured packet limit in effect for this session.
  pub limit: u32,
  /// Number of raw records the sampler produced.
  pub count: u32,
  /// Number of decoded records with any error bit set.
  pub errors: u32,
  /// Number of bus-reset records.
  pub resets: u32,
  /// Number of SOF (frame) records.
  pub frames: u32,
  /// Number of SOF records folded into a summary line.
  pub folded: u32,
}

impl BufferInfo {
  /// A fresh, zeroed record for a new session, matching spec.md §3's
  /// "Reset of capture state ... occurs at the start of `process_buffer`".
  #[must_use]
  pub fn new(full_speed: bool, triggered: bool, limit: u32) -> Self {
    Self { full_speed, triggered, limit, count: 0, errors: 0, resets: 0, frames: 0, folded: 0 }
  }
}
