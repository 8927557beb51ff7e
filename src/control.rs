//! Single-character command dispatch, per spec.md §4.4.
//!
//! Grounded on `examples/original_source/firmware/capture.c`'s
//! `core1_main`/`change_setting`/`print_help`: a case-insensitive,
//! one-character command alphabet that rotates one of the six
//! [`crate::settings::Settings`] fields and echoes the change, or triggers
//! a capture/redraw/stop/help action. Unrecognized characters are silently
//! ignored, matching the original rather than treated as an error (see
//! SPEC_FULL.md's supplemented-behavior note on this).
//!
//! This module only covers parsing and the settings/text side of
//! dispatch; wiring a command to an actual capture run is
//! [`crate::session::Session`]'s job, and owning the keystroke transport
//! itself is out of scope (spec.md §1).

use alloc::format;
use alloc::string::String;

use crate::settings::{CaptureLimit, CaptureSpeed, CaptureTrigger, DisplayData, DisplayFold, DisplayTime, Setting, Settings};

/// One dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
  /// `h` / `?`: print help and the settings summary.
  Help,
  /// `b`: re-render the existing buffer.
  Redraw,
  /// `s`: start a capture.
  Start,
  /// `p`: stop the running capture, or abort a pending trigger wait.
  Stop,
  /// `e`: rotate capture speed.
  RotateSpeed,
  /// `g`: rotate trigger mode.
  RotateTrigger,
  /// `l`: rotate capture limit.
  RotateLimit,
  /// `t`: rotate display time base.
  RotateDisplayTime,
  /// `a`: rotate display data mode.
  RotateDisplayData,
  /// `f`: rotate fold-empty-frames mode.
  RotateDisplayFold,
}

/// Parses one input byte into a [`Command`], case-folding letters first.
///
/// Returns `None` for any byte that is not a recognized command — the
/// original firmware's dispatcher silently drops these rather than
/// treating them as errors, and this preserves that.
#[must_use]
pub fn parse_command(byte: u8) -> Option<Command> {
  match byte.to_ascii_lowercase() {
    b'h' | b'?' => Some(Command::Help),
    b'b' => Some(Command::Redraw),
    b's' => Some(Command::Start),
    b'p' => Some(Command::Stop),
    b'e' => Some(Command::RotateSpeed),
    b'g' => Some(Command::RotateTrigger),
    b'l' => Some(Command::RotateLimit),
    b't' => Some(Command::RotateDisplayTime),
    b'a' => Some(Command::RotateDisplayData),
    b'f' => Some(Command::RotateDisplayFold),
    _ => None,
  }
}

/// Rotates the one setting `command` names and returns the change-echo
/// line (`"<Name> changed to <value>\r\n"`). Returns `None` for a command
/// that does not rotate a setting (`Help`/`Redraw`/`Start`/`Stop`).
pub fn rotate(settings: &mut Settings, command: Command) -> Option<String> {
  match command {
    Command::RotateSpeed => Some(rotate_one(&mut settings.speed)),
    Command::RotateTrigger => Some(rotate_one(&mut settings.trigger)),
    Command::RotateLimit => Some(rotate_one(&mut settings.limit)),
    Command::RotateDisplayTime => Some(rotate_one(&mut settings.display_time)),
    Command::RotateDisplayData => Some(rotate_one(&mut settings.display_data)),
    Command::RotateDisplayFold => Some(rotate_one(&mut settings.display_fold)),
    Command::Help | Command::Redraw | Command::Start | Command::Stop => None,
  }
}

fn rotate_one<S: Setting>(field: &mut S) -> String {
  *field = field.next();
  format!("{} changed to {}\r\n", S::NAME, field.label())
}

/// The `h`/`?` banner: a settings summary followed by the command list,
/// reproducing `examples/original_source/firmware/capture.c`'s
/// `print_help` verbatim (per SPEC_FULL.md §11 item 1).
#[must_use]
pub fn help_text(settings: &Settings) -> String {
  let mut s = String::new();
  s.push_str("\r\n-------------------------------------------------------------------\r\n");
  s.push_str("USB Sniffer Lite.\r\n");
  s.push_str("\r\n");
  s.push_str("Settings:\r\n");
  s.push_str(&format!("  e - {:<20}: {}\r\n", CaptureSpeed::NAME, settings.speed.label()));
  s.push_str(&format!("  g - {:<20}: {}\r\n", CaptureTrigger::NAME, settings.trigger.label()));
  s.push_str(&format!("  l - {:<20}: {}\r\n", CaptureLimit::NAME, settings.limit.label()));
  s.push_str(&format!("  t - {:<20}: {}\r\n", DisplayTime::NAME, settings.display_time.label()));
  s.push_str(&format!("  a - {:<20}: {}\r\n", DisplayData::NAME, settings.display_data.label()));
  s.push_str(&format!("  f - {:<20}: {}\r\n", DisplayFold::NAME, settings.display_fold.label()));
  s.push_str("\r\n");
  s.push_str("Commands:\r\n");
  s.push_str("  h - Print this help message\r\n");
  s.push_str("  b - Display buffer\r\n");
  s.push_str("  s - Start capture\r\n");
  s.push_str("  p - Stop capture\r\n");
  s.push_str("\r\n");
  s
}
