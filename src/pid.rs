//! USB packet identifiers.
//!
//! Grounded on `examples/original_source/firmware/globals.h`'s `Pid_*`
//! enum; the numeric values are part of the USB 2.0 wire format and must
//! match exactly.

/// A 4-bit USB packet identifier.
///
/// The low nibble of byte 1 of every packet. The high nibble must be its
/// bitwise complement (checked by the decoder, not by this type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Pid {
  /// Reserved / invalid PID. Decoding a packet with this PID always raises
  /// `ERROR_PID`.
  Reserved = 0,
  /// OUT token.
  Out = 1,
  /// ACK handshake.
  Ack = 2,
  /// DATA0.
  Data0 = 3,
  /// PING special token.
  Ping = 4,
  /// Start-Of-Frame token.
  Sof = 5,
  /// NYET handshake.
  Nyet = 6,
  /// DATA2.
  Data2 = 7,
  /// SPLIT special token.
  Split = 8,
  /// IN token.
  In = 9,
  /// NAK handshake.
  Nak = 10,
  /// DATA1.
  Data1 = 11,
  /// PRE (token) / ERR (handshake), context dependent, single PID value.
  PreErr = 12,
  /// SETUP token.
  Setup = 13,
  /// STALL handshake.
  Stall = 14,
  /// MDATA.
  MData = 15,
}

impl Pid {
  /// Recovers a [`Pid`] from a 4-bit nibble. Every value `0..=15` is a
  /// legal discriminant (including `Reserved`); this never fails.
  #[inline]
  #[must_use]
  pub const fn from_nibble(nibble: u8) -> Self {
    // SAFETY: `Pid` is `repr(u8)` and covers every value of `0..=15`.
    unsafe { core::mem::transmute(nibble & 0x0f) }
  }

  /// The nibble this PID encodes as.
  #[inline]
  #[must_use]
  pub const fn nibble(self) -> u8 {
    self as u8
  }

  /// Whether this is one of the four token PIDs that take a 5-bit CRC over
  /// a 2-byte address/endpoint/frame field and must total 4 bytes
  /// (SOF/IN/OUT/SETUP/PING), matching spec.md's "Token" size/CRC family.
  #[inline]
  #[must_use]
  pub const fn is_token(self) -> bool {
    matches!(self, Pid::Out | Pid::In | Pid::Sof | Pid::Setup | Pid::Ping)
  }

  /// Whether this is the SPLIT special token, which shares the token CRC5
  /// family but is one byte longer.
  #[inline]
  #[must_use]
  pub const fn is_split(self) -> bool {
    matches!(self, Pid::Split)
  }

  /// Whether this is one of the four data PIDs (CRC16 family, `size >= 4`).
  #[inline]
  #[must_use]
  pub const fn is_data(self) -> bool {
    matches!(self, Pid::Data0 | Pid::Data1 | Pid::Data2 | Pid::MData)
  }

  /// Whether this is one of the four handshake PIDs (no size or CRC rule
  /// beyond SYNC+PID).
  #[inline]
  #[must_use]
  pub const fn is_handshake(self) -> bool {
    matches!(self, Pid::Ack | Pid::Nak | Pid::Stall | Pid::Nyet)
  }

  /// Display name, exactly as printed by the renderer.
  #[must_use]
  pub const fn name(self) -> &'static str {
    match self {
      Pid::Reserved => "RESERVED",
      Pid::Out => "OUT",
      Pid::Ack => "ACK",
      Pid::Data0 => "DATA0",
      Pid::Ping => "PING",
      Pid::Sof => "SOF",
      Pid::Nyet => "NYET",
      Pid::Data2 => "DATA2",
      Pid::Split => "SPLIT",
      Pid::In => "IN",
      Pid::Nak => "NAK",
      Pid::Data1 => "DATA1",
      Pid::PreErr => "PRE/ERR",
      Pid::Setup => "SETUP",
      Pid::Stall => "STALL",
      Pid::MData => "MDATA",
    }
  }
}

/// A pseudo-PID used only to drive the folding state machine, named
/// explicitly per spec.md's Open Questions rather than encoded as a magic
/// `-1` the way `examples/original_source/firmware/capture.c`'s
/// `handle_folding(-1, 0)` does.
///
/// The decoder feeds every real packet's [`Pid`] into folding, but a bus
/// reset is not a packet and carries no PID; [`FoldEvent::Reset`] is how it
/// tells the folder "this disqualifies folding, but is not itself an
/// error".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldEvent {
  /// A real, PID-bearing packet was decoded.
  Packet(Pid),
  /// A bus reset record was encountered.
  Reset,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trips_every_nibble() {
    for n in 0u8..16 {
      assert_eq!(Pid::from_nibble(n).nibble(), n);
    }
  }

  #[test]
  fn families_are_disjoint_and_exhaustive() {
    for n in 0u8..16 {
      let pid = Pid::from_nibble(n);
      let families = [pid.is_token(), pid.is_split(), pid.is_data(), pid.is_handshake()];
      let count = families.iter().filter(|b| **b).count();
      assert!(count <= 1, "{pid:?} claims more than one family");
    }
  }

  #[test]
  fn known_values_match_usb_spec() {
    assert_eq!(Pid::Out.nibble(), 1);
    assert_eq!(Pid::In.nibble(), 9);
    assert_eq!(Pid::Sof.nibble(), 5);
    assert_eq!(Pid::Setup.nibble(), 13);
    assert_eq!(Pid::Data0.nibble(), 3);
    assert_eq!(Pid::Data1.nibble(), 11);
    assert_eq!(Pid::Data2.nibble(), 7);
    assert_eq!(Pid::MData.nibble(), 15);
    assert_eq!(Pid::Ack.nibble(), 2);
    assert_eq!(Pid::Nak.nibble(), 10);
    assert_eq!(Pid::Stall.nibble(), 14);
    assert_eq!(Pid::Nyet.nibble(), 6);
    assert_eq!(Pid::Ping.nibble(), 4);
    assert_eq!(Pid::PreErr.nibble(), 12);
    assert_eq!(Pid::Split.nibble(), 8);
    assert_eq!(Pid::Reserved.nibble(), 0);
  }
}
