//! The owning session record.
//!
//! Replaces the original firmware's free-standing `g_buffer` /
//! `g_buffer_info` / `g_rd_ptr` / `g_wr_ptr` globals (see
//! `examples/original_source/firmware/capture.c`) with a single explicitly
//! owned value, per spec.md §9's "Global mutable state" design note.
//! `Session` is the one thing a firmware binary needs to hold to run this
//! crate's whole pipeline: settings, the capture buffer, and the
//! bookkeeping from the most recent capture.

use alloc::string::String;

use crate::buffer::{BufferInfo, CaptureBuffer};
use crate::decoder;
use crate::renderer;
use crate::sampler::{self, CaptureFault, Clock, SampleFifo};
use crate::settings::{CaptureSpeed, Settings};

/// Outcome of waiting for the external trigger, per spec.md §4.1's
/// "Trigger" behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
  /// The trigger pin asserted; proceed with acquisition.
  Triggered,
  /// A cancellation (`p` command) arrived first; abort the session.
  Cancelled,
}

/// Busy-waits for either the trigger condition or a cancellation request,
/// polling both every iteration (there is nothing else to do while
/// waiting, per spec.md §5's cooperative, interrupt-free scheduling
/// model).
pub fn wait_for_trigger(
  mut trigger_asserted: impl FnMut() -> bool,
  mut should_stop: impl FnMut() -> bool,
) -> TriggerOutcome {
  loop {
    if trigger_asserted() {
      return TriggerOutcome::Triggered;
    }
    if should_stop() {
      return TriggerOutcome::Cancelled;
    }
  }
}

/// Everything one capture-and-render cycle needs: live settings, the
/// backing buffer, and the bookkeeping from whatever was last captured
/// into it.
///
/// Per spec.md §5 "Ordering": settings changes only take effect on the
/// *next* session — [`Session::capture`] snapshots `self.settings` at the
/// moment it is called, so a control-loop command that mutates
/// `session.settings` mid-capture (impossible in this cooperative model,
/// but worth stating) would never be observed by the running capture.
pub struct Session {
  /// Live capture/display settings, mutated by the control loop.
  pub settings: Settings,
  buffer: CaptureBuffer,
  last_info: Option<BufferInfo>,
}

impl Session {
  /// Builds a fresh session: default settings, an empty capture buffer,
  /// nothing yet rendered.
  #[must_use]
  pub fn new() -> Self {
    Self { settings: Settings::default(), buffer: CaptureBuffer::new(), last_info: None }
  }

  /// Runs one full acquire-then-decode cycle: drains `fifo` into the
  /// buffer via [`sampler::run_capture`], then rewrites it in place via
  /// [`decoder::process_buffer`].
  ///
  /// # Errors
  /// Propagates [`CaptureFault`] if the decoder detects a desynchronized
  /// capture; the session's buffer and settings are left as they were
  /// before the call (the next `b` command will still re-render whatever
  /// was captured previously).
  pub fn capture(
    &mut self,
    fifo: &mut impl SampleFifo,
    clock: &mut impl Clock,
    should_stop: impl FnMut() -> bool,
  ) -> Result<(), CaptureFault> {
    let settings = self.settings;
    let full_speed = matches!(settings.speed, CaptureSpeed::Full);
    let limit = settings.limit.packet_count();

    let record_count = sampler::run_capture(&mut self.buffer, fifo, clock, limit, should_stop);
    let mut info = decoder::process_buffer(&mut self.buffer, record_count, full_speed)?;
    info.triggered = matches!(settings.trigger, crate::settings::CaptureTrigger::Enabled);
    info.limit = limit;
    self.last_info = Some(info);
    Ok(())
  }

  /// Renders the most recently captured buffer, or the empty-buffer
  /// message if nothing has been captured yet — the `b` (redraw) command's
  /// entire implementation.
  #[must_use]
  pub fn render(&self) -> String {
    match &self.last_info {
      Some(info) => renderer::render(&self.buffer, info, &self.settings),
      None => String::from("\r\nCapture buffer is empty\r\n"),
    }
  }
}

impl Default for Session {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fresh_session_renders_empty_message() {
    let session = Session::new();
    assert_eq!(session.render(), "\r\nCapture buffer is empty\r\n");
  }

  #[test]
  fn wait_for_trigger_prefers_trigger_over_cancel_on_same_tick() {
    let outcome = wait_for_trigger(|| true, || true);
    assert_eq!(outcome, TriggerOutcome::Triggered);
  }

  #[test]
  fn wait_for_trigger_reports_cancellation() {
    let mut calls = 0;
    let outcome = wait_for_trigger(
      || false,
      || {
        calls += 1;
        calls > 2
      },
    );
    assert_eq!(outcome, TriggerOutcome::Cancelled);
  }
}
