// SPDX-License-Identifier: MIT OR Apache-2.0

//! # MCU Console
//!
//! Framing, CRC, variable-length argument encoding and command dispatch for
//! a host-to-microcontroller serial command link.
//!
//! ## Design Constraints
//!
//! - No heap allocations in the core (const generics / `heapless` for fixed
//!   buffers).
//! - `no_std` compatible; the `std` feature lifts that for host-side tests.
//! - Single-threaded, cooperative: the dispatcher never suspends and never
//!   blocks — every tick either completes at most one inbound frame or
//!   returns idle.
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------+
//! |  Registry (commands, encoders)          |
//! +-----------------------------------------+
//!           v                    ^
//! +-----------------------------------------+
//! |  Dispatcher (frame -> args -> handler)  |
//! +-----------------------------------------+
//!           v                    ^
//! +-----------------------------------------+
//! |  Frame layer (sync, seq, CRC, resync)   |
//! +-----------------------------------------+
//!           v                    ^
//! +-----------------------------------------+
//! |  Console (UART / USB CDC / RingConsole) |
//! +-----------------------------------------+
//! ```
//!
//! ## Feature Flags
//!
//! - `std` -- enable for host-side testing (lifts `no_std`, exercises
//!   `RingConsole` and `SystemScheduler` directly from `#[cfg(test)]`).
//! - `rp2040` -- pulls in the RP2040/RP235x HAL stack and enables the
//!   firmware binary and its USB/UART transport adapters.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Variable-length quantity codec for signed 32-bit integers.
pub mod vlq;

/// CRC-16/CCITT over the wire frame.
pub mod crc;

/// Wire-level type tags and the descriptor model the registry is built from.
pub mod types;

/// The `Console` byte-queue interface and a host-testable ring-buffer impl.
pub mod console;

/// The `Scheduler` shutdown-latch interface and a single-process impl.
pub mod sched;

/// Frame synchronization, sequencing, CRC verification and ack/nak.
pub mod frame;

/// Inbound argument-vector parsing.
pub mod args;

/// Outbound message encoding (`sendf`).
pub mod encode;

/// The per-tick dispatcher that ties frame, args and the registry together.
pub mod dispatch;

/// Example command handlers exercised by the dispatcher and its tests.
pub mod handlers;

/// The hand-authored command index and encoder table.
pub mod registry;

/// USB CDC-ACM transport adapter (firmware only).
#[cfg(feature = "rp2040")]
pub mod transport_usb;

/// Blocking UART transport adapter (firmware only, alternate to USB).
#[cfg(feature = "rp2040")]
pub mod transport_uart;

/// RP2040 GPIO-backed implementation of [`handlers::DigitalIo`] (firmware only).
#[cfg(feature = "rp2040")]
pub mod pins_rp2040;

pub use args::parse_args;
pub use console::{Console, RingConsole};
pub use dispatch::{Context, DispatchOutcome, Dispatcher};
pub use encode::{encode_message, Arg, SendOutcome};
pub use sched::{Fault, Scheduler, SystemScheduler};
pub use types::{CommandEncoder, CommandParser, ParamType, ParserFlags};
