//! Capture and display settings.
//!
//! Six independent enumerated options (spec.md §3), each rotated by its own
//! control-loop command. Grounded on
//! `examples/original_source/firmware/capture.c`'s `g_capture_speed` /
//! `g_capture_trigger` / `g_capture_limit` / `g_display_time` /
//! `g_display_data` / `g_display_fold` globals and their `*_str` label
//! tables, folded into one `Settings` record per spec.md §9's "Global
//! mutable state" design note (settings live in a configuration record
//! read once at session start, not as free-standing statics).

/// A rotatable setting: wraps modular `next()` plus the two label strings
/// the control loop's settings summary and change-echo need.
pub trait Setting: Sized + Copy {
  /// The setting's name, as printed in the `h`/`?` summary and in the
  /// change-echo line (`"<name> changed to <value>"`).
  const NAME: &'static str;

  /// Advances to the next value, wrapping back to the first after the
  /// last.
  #[must_use]
  fn next(self) -> Self;

  /// The value's display label.
  #[must_use]
  fn label(self) -> &'static str;
}

/// Bus speed to sample at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureSpeed {
  /// 1.5 Mb/s.
  Low,
  /// 12 Mb/s.
  #[default]
  Full,
}

impl Setting for CaptureSpeed {
  const NAME: &'static str = "Capture speed";

  fn next(self) -> Self {
    match self {
      Self::Low => Self::Full,
      Self::Full => Self::Low,
    }
  }

  fn label(self) -> &'static str {
    match self {
      Self::Low => "Low",
      Self::Full => "Full",
    }
  }
}

/// Whether to wait for the external trigger before sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureTrigger {
  /// Start immediately.
  #[default]
  Disabled,
  /// Wait for a logic-0 on the trigger pin (or a `p` command) first.
  Enabled,
}

impl Setting for CaptureTrigger {
  const NAME: &'static str = "Capture trigger";

  fn next(self) -> Self {
    match self {
      Self::Disabled => Self::Enabled,
      Self::Enabled => Self::Disabled,
    }
  }

  fn label(self) -> &'static str {
    match self {
      Self::Disabled => "Disabled",
      Self::Enabled => "Enabled",
    }
  }
}

/// Configured packet-count ceiling for a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureLimit {
  /// 100 packets.
  P100,
  /// 200 packets.
  P200,
  /// 500 packets.
  P500,
  /// 1000 packets.
  P1000,
  /// 2000 packets.
  P2000,
  /// 5000 packets.
  P5000,
  /// 10000 packets.
  P10000,
  /// Effectively unbounded: 100000 packets.
  #[default]
  Unlimited,
}

impl CaptureLimit {
  /// The numeric packet count this limit corresponds to, matching the
  /// original firmware's `capture_limit_value()`.
  #[must_use]
  pub const fn packet_count(self) -> u32 {
    match self {
      Self::P100 => 100,
      Self::P200 => 200,
      Self::P500 => 500,
      Self::P1000 => 1000,
      Self::P2000 => 2000,
      Self::P5000 => 5000,
      Self::P10000 => 10_000,
      Self::Unlimited => 100_000,
    }
  }
}

impl Setting for CaptureLimit {
  const NAME: &'static str = "Capture limit";

  fn next(self) -> Self {
    match self {
      Self::P100 => Self::P200,
      Self::P200 => Self::P500,
      Self::P500 => Self::P1000,
      Self::P1000 => Self::P2000,
      Self::P2000 => Self::P5000,
      Self::P5000 => Self::P10000,
      Self::P10000 => Self::Unlimited,
      Self::Unlimited => Self::P100,
    }
  }

  fn label(self) -> &'static str {
    match self {
      Self::P100 => "100 packets",
      Self::P200 => "200 packets",
      Self::P500 => "500 packets",
      Self::P1000 => "1000 packets",
      Self::P2000 => "2000 packets",
      Self::P5000 => "5000 packets",
      Self::P10000 => "10000 packets",
      Self::Unlimited => "Unlimited",
    }
  }
}

/// What each record's display timestamp is taken relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayTime {
  /// Relative to the first packet in the buffer.
  FirstPacket,
  /// Relative to the immediately preceding printed packet.
  PreviousPacket,
  /// Relative to the most recent SOF.
  #[default]
  Sof,
  /// Relative to the most recent bus reset.
  Reset,
}

impl Setting for DisplayTime {
  const NAME: &'static str = "Time display format";

  fn next(self) -> Self {
    match self {
      Self::FirstPacket => Self::PreviousPacket,
      Self::PreviousPacket => Self::Sof,
      Self::Sof => Self::Reset,
      Self::Reset => Self::FirstPacket,
    }
  }

  fn label(self) -> &'static str {
    match self {
      Self::FirstPacket => "Relative to the first packet",
      Self::PreviousPacket => "Relative to the previous packet",
      Self::Sof => "Relative to the SOF",
      Self::Reset => "Relative to the bus reset",
    }
  }
}

/// How much of a data packet's payload to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayData {
  /// Print the entire payload.
  #[default]
  Full,
  /// Truncate to 16 bytes.
  Limit16,
  /// Truncate to 64 bytes.
  Limit64,
  /// Print no payload bytes at all.
  None,
}

impl DisplayData {
  /// The byte limit this setting imposes, or `None` for no limit.
  #[must_use]
  pub const fn limit(self) -> Option<usize> {
    match self {
      Self::Full => None,
      Self::Limit16 => Some(16),
      Self::Limit64 => Some(64),
      Self::None => Some(0),
    }
  }
}

impl Setting for DisplayData {
  const NAME: &'static str = "Data display format";

  fn next(self) -> Self {
    match self {
      Self::Full => Self::Limit16,
      Self::Limit16 => Self::Limit64,
      Self::Limit64 => Self::None,
      Self::None => Self::Full,
    }
  }

  fn label(self) -> &'static str {
    match self {
      Self::Full => "Full",
      Self::Limit16 => "Limit to 16 bytes",
      Self::Limit64 => "Limit to 64 bytes",
      Self::None => "Do not display data",
    }
  }
}

/// Whether runs of empty frames collapse into a summary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayFold {
  /// Never fold; print every SOF.
  Disabled,
  /// Collapse runs of idle frames.
  #[default]
  Enabled,
}

impl Setting for DisplayFold {
  const NAME: &'static str = "Fold empty frames";

  fn next(self) -> Self {
    match self {
      Self::Disabled => Self::Enabled,
      Self::Enabled => Self::Disabled,
    }
  }

  fn label(self) -> &'static str {
    match self {
      Self::Disabled => "Disabled",
      Self::Enabled => "Enabled",
    }
  }
}

/// All six settings, aggregated into one explicitly-owned record in place
/// of the original's free-standing `g_capture_*` / `g_display_*` globals.
///
/// Per spec.md §5 "Ordering": "settings changes take effect on the next
/// session only — a running capture observes its own snapshot". Callers
/// should clone a `Settings` at session start rather than reading the live
/// control-loop copy mid-capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
  /// Bus speed to sample at.
  pub speed: CaptureSpeed,
  /// Whether to wait for a trigger before sampling.
  pub trigger: CaptureTrigger,
  /// Packet-count ceiling.
  pub limit: CaptureLimit,
  /// Display timestamp reference.
  pub display_time: DisplayTime,
  /// Payload print limit.
  pub display_data: DisplayData,
  /// Whether to fold empty frames.
  pub display_fold: DisplayFold,
}
