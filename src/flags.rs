//! The processed-record annotation word.
//!
//! Grounded on `examples/rust-console-gba/src/dma.rs`'s `DmaControl` and
//! `examples/rust-console-gba/src/interrupts/mod.rs`'s `IrqBits`: a
//! `#[repr(transparent)]` wrapper over the raw register/record value, with
//! `bitfrob`-backed bit accessors and `with_*` builder methods instead of
//! hand-rolled shifts scattered through the decoder.
//!
//! Bit layout is fixed by spec.md §6 and must not change:
//! `flags.size` occupies bits `0..=15`; bits `23..=31` are single-bit
//! annotations.

use bitfrob::{u32_get_bit, u32_get_value, u32_with_bit, u32_with_value};

/// `word 0` of a processed record: packet size in the low 16 bits, plus
/// error/annotation bits in the high byte-and-change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct Flags(pub(crate) u32);

// SAFETY: `Flags` is `repr(transparent)` over `u32`, which is `Pod`.
unsafe impl bytemuck::Zeroable for Flags {}
// SAFETY: same as above; all bit patterns of `u32` are valid `Flags`.
unsafe impl bytemuck::Pod for Flags {}

impl Flags {
  /// An empty flags word: size `0`, no annotations.
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self(0)
  }

  /// Builds a flags word from its raw bit pattern (as read back out of the
  /// capture buffer).
  #[inline]
  #[must_use]
  pub const fn from_bits(bits: u32) -> Self {
    Self(bits)
  }

  /// The raw bit pattern, as stored in the capture buffer.
  #[inline]
  #[must_use]
  pub const fn into_bits(self) -> u32 {
    self.0
  }

  /// Number of decoded payload bytes, including SYNC and PID.
  #[inline]
  #[must_use]
  pub fn size(self) -> u16 {
    u32_get_value::<0, 15>(self.0) as u16
  }

  /// Sets the decoded payload size.
  #[inline]
  #[must_use]
  pub fn with_size(self, size: u16) -> Self {
    Self(u32_with_value::<0, 15>(self.0, size as u32))
  }

  /// Seventh consecutive `1` was not followed by a stuffed `0`.
  #[inline]
  #[must_use]
  pub fn error_stuff(self) -> bool {
    u32_get_bit::<31>(self.0)
  }

  /// Sets/clears [`Self::error_stuff`].
  #[inline]
  #[must_use]
  pub fn with_error_stuff(self, b: bool) -> Self {
    Self(u32_with_bit::<31>(self.0, b))
  }

  /// CRC5 or CRC16 residue mismatch.
  #[inline]
  #[must_use]
  pub fn error_crc(self) -> bool {
    u32_get_bit::<30>(self.0)
  }

  /// Sets/clears [`Self::error_crc`].
  #[inline]
  #[must_use]
  pub fn with_error_crc(self, b: bool) -> Self {
    Self(u32_with_bit::<30>(self.0, b))
  }

  /// PID nibble did not match its complement, or was `RESERVED`.
  #[inline]
  #[must_use]
  pub fn error_pid(self) -> bool {
    u32_get_bit::<29>(self.0)
  }

  /// Sets/clears [`Self::error_pid`].
  #[inline]
  #[must_use]
  pub fn with_error_pid(self, b: bool) -> Self {
    Self(u32_with_bit::<29>(self.0, b))
  }

  /// Byte 0 did not match the speed-specific SYNC pattern.
  #[inline]
  #[must_use]
  pub fn error_sync(self) -> bool {
    u32_get_bit::<28>(self.0)
  }

  /// Sets/clears [`Self::error_sync`].
  #[inline]
  #[must_use]
  pub fn with_error_sync(self, b: bool) -> Self {
    Self(u32_with_bit::<28>(self.0, b))
  }

  /// Payload ended mid-byte.
  #[inline]
  #[must_use]
  pub fn error_nbit(self) -> bool {
    u32_get_bit::<27>(self.0)
  }

  /// Sets/clears [`Self::error_nbit`].
  #[inline]
  #[must_use]
  pub fn with_error_nbit(self, b: bool) -> Self {
    Self(u32_with_bit::<27>(self.0, b))
  }

  /// Decoded size inconsistent with the packet family.
  #[inline]
  #[must_use]
  pub fn error_size(self) -> bool {
    u32_get_bit::<26>(self.0)
  }

  /// Sets/clears [`Self::error_size`].
  #[inline]
  #[must_use]
  pub fn with_error_size(self, b: bool) -> Self {
    Self(u32_with_bit::<26>(self.0, b))
  }

  /// This record is a bus reset marker, not a decoded packet.
  #[inline]
  #[must_use]
  pub fn reset(self) -> bool {
    u32_get_bit::<25>(self.0)
  }

  /// Sets/clears [`Self::reset`].
  #[inline]
  #[must_use]
  pub fn with_reset(self, b: bool) -> Self {
    Self(u32_with_bit::<25>(self.0, b))
  }

  /// This record is a Low-Speed SOF keep-alive marker, not a decoded packet.
  #[inline]
  #[must_use]
  pub fn ls_sof(self) -> bool {
    u32_get_bit::<24>(self.0)
  }

  /// Sets/clears [`Self::ls_sof`].
  #[inline]
  #[must_use]
  pub fn with_ls_sof(self, b: bool) -> Self {
    Self(u32_with_bit::<24>(self.0, b))
  }

  /// This SOF record is eligible to be folded into a summary line.
  #[inline]
  #[must_use]
  pub fn may_fold(self) -> bool {
    u32_get_bit::<23>(self.0)
  }

  /// Sets/clears [`Self::may_fold`].
  #[inline]
  #[must_use]
  pub fn with_may_fold(self, b: bool) -> Self {
    Self(u32_with_bit::<23>(self.0, b))
  }

  /// Any of the six error bits is set.
  #[inline]
  #[must_use]
  pub fn has_error(self) -> bool {
    self.error_stuff()
      || self.error_crc()
      || self.error_pid()
      || self.error_sync()
      || self.error_nbit()
      || self.error_size()
  }

  /// Iterates the set error bits in spec.md's canonical display order
  /// (`STUFF, CRC, PID, SYNC, NBIT, SIZE`), each paired with its display
  /// name, for the renderer's `ERROR [...]` line.
  pub fn error_names(self) -> impl Iterator<Item = &'static str> {
    const ORDER: [(fn(Flags) -> bool, &str); 6] = [
      (Flags::error_stuff, "STUFF"),
      (Flags::error_crc, "CRC"),
      (Flags::error_pid, "PID"),
      (Flags::error_sync, "SYNC"),
      (Flags::error_nbit, "NBIT"),
      (Flags::error_size, "SIZE"),
    ];
    ORDER.into_iter().filter(move |(f, _)| f(self)).map(|(_, name)| name)
  }
}
