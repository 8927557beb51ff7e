#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![allow(clippy::cast_lossless)]

//! Capture pipeline for a low-cost USB 1.x bus sniffer.
//!
//! This crate is the CORE of the sniffer: it turns a stream of raw,
//! time-stamped NRZI bit-words sampled off the D+/D- pair into fully
//! decoded, error-classified USB packets, and renders those packets as
//! human-readable text. It does not itself bring up the sampling hardware,
//! talk to a USB-CDC console, or own a command prompt; those are the
//! firmware's job, and this crate only describes the contracts at those
//! boundaries (see [`sampler`] and [`control`]).
//!
//! # SAFETY POLICY
//!
//! The [`sampler::hw`] module is a thin, safe-by-convention wrapper around
//! the RP2040's PIO and timer peripherals. It only exists, and only
//! compiles, when the `on_device` feature is enabled. Everything else in
//! this crate — buffer bookkeeping, the decoder, the renderer, the control
//! loop — is plain, portable Rust with no hardware assumptions, and is
//! exercised directly by `cargo test`.
//!
//! # TESTING POLICY
//!
//! As in the hardware crate this one is modeled on, the goal is that
//! `cargo test` exercises as much of the crate as possible on the host.
//! `#![cfg_attr(not(test), no_std)]` plus `extern crate alloc` achieves
//! this: only [`sampler::hw`] (gated behind `on_device`, never built by
//! `cargo test`) touches real memory-mapped registers.

extern crate alloc;

pub mod buffer;
pub mod control;
pub mod crc;
pub mod decoder;
pub mod fixed_point;
pub mod flags;
pub mod pid;
pub mod renderer;
pub mod sampler;
pub mod session;
pub mod settings;

pub use buffer::{BufferInfo, CaptureBuffer, BUFFER_WORDS};
pub use pid::Pid;
pub use session::Session;
pub use settings::Settings;
