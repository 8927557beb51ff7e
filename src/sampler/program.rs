//! The oversampling/edge-resync microprogram, as portable data.
//!
//! Grounded on `examples/original_source/firmware/pio_asm.h` and
//! `capture.c`'s `pio0_ops`/`pio1_ops` instruction-memory arrays: the
//! original hand-assembles a small state machine program for the RP2040's
//! PIO block that idles until SOP, then samples the D+/D- pair at 4×
//! oversampling, re-synchronizing to the bit clock on every D- edge during
//! the `read1` phase, and raises the MSB-marked control word described in
//! spec.md §4.1 at EOP.
//!
//! The actual PIO instruction encoding is hardware-specific and lives in
//! the `on_device`-gated `hw` submodule's assembly; what belongs here, and
//! is worth keeping portable and testable, is the *shape* of the program:
//! how many instructions it takes, what each does, and the jump structure
//! that realizes "wait for idle, wait for SOP, sample, resync on edge,
//! detect EOP". Modeling it as data lets a test assert the program is
//! internally consistent (every jump target is in range, every label is
//! reachable) without needing a PIO simulator.

/// One pseudo-instruction of the sampler microprogram.
///
/// This is not a 1:1 mirror of the RP2040 PIO instruction set; it names
/// the operations the original assembly actually performs, at the
/// granularity the rest of this crate's documentation and tests reason
/// about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
  /// Spin until the D+/D- pair reads idle (both high for Full-Speed, both
  /// low is never idle — the speed-specific idle level is a microprogram
  /// parameter, not encoded here).
  WaitIdle,
  /// Spin until a Start-Of-Packet transition is observed.
  WaitSop,
  /// Sample the 2-bit D+/D- group into the input shift register.
  Sample,
  /// If the D- line has an edge relative to the last sample, jump to
  /// `target` to re-synchronize bit timing; otherwise fall through.
  JumpOnEdge {
    /// Index into the owning program's instruction slice.
    target: u8,
  },
  /// Unconditional jump to `target`.
  Jump {
    /// Index into the owning program's instruction slice.
    target: u8,
  },
  /// Test for two consecutive SE0 samples (both lines low); if found, the
  /// packet has ended.
  CheckEop {
    /// Where to resume sampling if this was not actually an EOP.
    not_eop_target: u8,
  },
  /// Push the accumulated 31-bit shift register out to the RX FIFO and
  /// start a new one.
  PushShiftRegister,
  /// Emit the MSB-marked control word (inverted bit count) and the latched
  /// EOP timestamp, then return to [`Op::WaitIdle`].
  EmitEndOfPacketMarker,
}

/// Full-Speed (12 Mb/s, 4× = 48 MHz sample clock) sampler microprogram.
pub const FULL_SPEED_PROGRAM: &[Op] = &[
  Op::WaitIdle,               // 0
  Op::WaitSop,                // 1
  Op::Sample,                 // 2
  Op::JumpOnEdge { target: 2 }, // 3: resync without losing the sample just taken
  Op::CheckEop { not_eop_target: 2 }, // 4
  Op::PushShiftRegister,       // 5
  Op::EmitEndOfPacketMarker,   // 6
  Op::Jump { target: 0 },      // 7
];

/// Low-Speed (1.5 Mb/s, 4× = 6 MHz sample clock) sampler microprogram.
///
/// Identical shape to [`FULL_SPEED_PROGRAM`]; the original firmware
/// reaches this by reloading the PIO clock divider rather than by loading
/// a different program, but representing both explicitly here keeps the
/// two speeds independently testable and documents that they share a
/// structure.
pub const LOW_SPEED_PROGRAM: &[Op] = FULL_SPEED_PROGRAM;

/// The maximum number of instructions the RP2040's PIO instruction memory
/// can hold per state machine.
pub const PIO_INSTRUCTION_MEMORY_WORDS: usize = 32;

#[cfg(test)]
mod tests {
  use super::*;

  fn jump_targets_in_range(program: &[Op]) {
    for (i, op) in program.iter().enumerate() {
      let target = match op {
        Op::JumpOnEdge { target } | Op::Jump { target } => Some(*target),
        Op::CheckEop { not_eop_target } => Some(*not_eop_target),
        _ => None,
      };
      if let Some(t) = target {
        assert!(
          (t as usize) < program.len(),
          "instruction {i} jumps to out-of-range target {t}"
        );
      }
    }
  }

  #[test]
  fn full_speed_program_fits_instruction_memory() {
    assert!(FULL_SPEED_PROGRAM.len() <= PIO_INSTRUCTION_MEMORY_WORDS);
  }

  #[test]
  fn full_speed_program_jumps_are_in_range() {
    jump_targets_in_range(FULL_SPEED_PROGRAM);
  }

  #[test]
  fn program_ends_with_a_path_back_to_wait_idle() {
    assert!(matches!(FULL_SPEED_PROGRAM.last(), Some(Op::Jump { target: 0 })));
  }

  #[test]
  fn low_speed_shares_full_speed_shape() {
    assert_eq!(LOW_SPEED_PROGRAM.len(), FULL_SPEED_PROGRAM.len());
  }
}
