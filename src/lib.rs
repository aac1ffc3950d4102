//! Host-side serial bootloader protocol engine for ROM-bootloader-equipped
//! microcontrollers.
//!
//! This crate is the core described in SPEC_FULL.md: it discovers an
//! attached target over a serial port, forces it into its ROM download mode,
//! uploads a RAM-resident command-handler stub, and then drives flash read,
//! flash write (optionally deflate-compressed, with per-block verify and
//! retry), flash verification, and register/SPI-flash inspection. Chip
//! model, silicon revision, and feature set are identified by reading
//! on-chip efuse bits and peripheral registers through a per-family
//! [`targets::TargetDescriptor`].
//!
//! The single entry point for consumers is [`session::Session`]. Everything
//! else is plumbing it composes: SLIP framing ([`slip`]), the serial
//! adapter ([`serial`]), the reset sequencer ([`reset`]), the command
//! transport ([`transport`]), stub loading ([`stub`]), the rebaud handshake
//! ([`rebaud`]), the flash pipelines ([`flash`]), and SPI user-command
//! programming ([`spi`]).
//!
//! This is deliberately a blocking, single-threaded design (SPEC_FULL §5):
//! a [`Session`](session::Session) owns its serial port exclusively and
//! issues one command at a time. Consumers that want overlap with other
//! work (a GUI event loop, an async runtime) should run a session on its
//! own thread or task rather than expect the core itself to become
//! concurrent.

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod digest;
pub mod error;
pub mod flash;
pub mod rebaud;
pub mod reset;
pub mod serial;
pub mod session;
pub mod slip;
pub mod spi;
pub mod stub;
pub mod targets;
pub mod transport;

pub use crate::error::{Error, Result};
pub use crate::reset::ResetStrategy;
pub use crate::session::{Session, TargetInfo};
