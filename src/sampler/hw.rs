//! Register-level glue for the RP2040 PIO/timer peripherals.
//!
//! Only compiled with `feature = "on_device"`; `cargo test` never touches
//! this module, the same split the teacher crate draws between its
//! portable arithmetic/data-structure code and its `cfg(not(test))`
//! hardware paths (`asm_runtime.rs`, `bios.rs`). Grounded on
//! `examples/rust-console-gba/src/mmio.rs`'s `def_mmio!` pattern, adapted
//! from the GBA's fixed MMIO window to the RP2040's peripheral bus.

use voladdress::{Safe, VolAddress};

const PIO0_BASE: usize = 0x5020_0000;
const PIO1_BASE: usize = 0x5030_0000;
const TIMER_BASE: usize = 0x4005_4000;

macro_rules! def_mmio {
  ($addr:expr => $name:ident : $t:ty) => {
    #[allow(missing_docs)]
    pub const $name: VolAddress<$t, Safe, Safe> = unsafe { VolAddress::new($addr) };
  };
}

// PIO0, state machine 0 receive FIFO: the Full-Speed sampler's output.
def_mmio!(PIO0_BASE + 0x20 => PIO0_RXF0: u32);
// PIO1, state machine 0 receive FIFO: the Low-Speed sampler's output.
def_mmio!(PIO1_BASE + 0x20 => PIO1_RXF0: u32);
// PIO0 FIFO status (used to poll "is RXF0 non-empty" without blocking).
def_mmio!(PIO0_BASE + 0x04 => PIO0_FSTAT: u32);
def_mmio!(PIO1_BASE + 0x04 => PIO1_FSTAT: u32);
// Free-running 1 MHz timer, low half.
def_mmio!(TIMER_BASE + 0x0c => TIMER_TIMELR: u32);

const FSTAT_RXEMPTY_SM0_BIT: u32 = 1 << 8;

/// Drives the RP2040 PIO0 (Full-Speed) or PIO1 (Low-Speed) hardware
/// sampler FIFO and the shared microsecond timer.
///
/// Implements [`crate::sampler::SampleFifo`] and [`crate::sampler::Clock`]
/// so [`crate::sampler::run_capture`] can drive real hardware with the
/// exact same loop that `cargo test` exercises against a mock.
pub struct HardwareSampler {
  full_speed: bool,
}

impl HardwareSampler {
  /// Binds to the PIO block for the given capture speed.
  ///
  /// # Safety
  /// The caller must ensure the corresponding PIO state machine has
  /// already been loaded with the sampler microprogram (see
  /// [`crate::sampler::program`]) and started, and that no other code
  /// concurrently drains the same RX FIFO.
  #[must_use]
  pub unsafe fn new(full_speed: bool) -> Self {
    Self { full_speed }
  }
}

impl crate::sampler::SampleFifo for HardwareSampler {
  fn try_read(&mut self) -> Option<u32> {
    let (fstat, rxf0) = if self.full_speed {
      (PIO0_FSTAT, PIO0_RXF0)
    } else {
      (PIO1_FSTAT, PIO1_RXF0)
    };
    if fstat.read() & FSTAT_RXEMPTY_SM0_BIT != 0 {
      None
    } else {
      Some(rxf0.read())
    }
  }
}

impl crate::sampler::Clock for HardwareSampler {
  fn now_us(&mut self) -> u32 {
    TIMER_TIMELR.read()
  }
}
