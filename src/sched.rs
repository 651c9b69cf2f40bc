//! The `Scheduler` shutdown-latch interface and a single-process
//! implementation.
//!
//! The rest of the firmware's task scheduling is out of scope; only the
//! shutdown-state surface the command dispatcher reads and writes is
//! specified here.

/// A fatal condition the dispatcher has latched into. Once set, the
/// dispatcher never dispatches another command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Fault {
    /// An inbound command id had no registered descriptor.
    InvalidCommand = 1,
    /// Argument parsing ran past the end of the payload.
    CommandParserError = 2,
    /// A handler's outbound message didn't fit its descriptor's bounds.
    MessageEncodeError = 3,
}

/// The shutdown-state surface the dispatcher reads before running a
/// non-exempt command, and writes when it hits a fatal fault.
///
/// In the original firmware, calling into the equivalent of
/// [`Scheduler::shutdown`] never returns: interrupts are disabled and
/// control never comes back to the caller. That can't be modeled directly
/// in host-testable Rust, so this crate adapts it to a latch: `shutdown`
/// records the fault and returns normally, and it is the *dispatcher's* job
/// (see [`crate::dispatch::Dispatcher::tick`]) to check the latch first and
/// refuse to process another frame once it's set.
pub trait Scheduler {
    /// Whether the system is currently in (graceful or fatal) shutdown.
    fn is_shutdown(&self) -> bool;

    /// The reason code reported to peers in `is_shutdown` notifications.
    fn shutdown_reason(&self) -> u16;

    /// Latch a fatal condition. Idempotent: once shut down, later calls are
    /// no-ops.
    fn shutdown(&mut self, fault: Fault, reason: &'static str);
}

/// The scheduler implementation this crate ships: a single in-process
/// latch, set at most once.
#[derive(Debug, Default)]
pub struct SystemScheduler {
    shutdown: bool,
    fault: Option<Fault>,
    reason_text: Option<&'static str>,
}

impl SystemScheduler {
    /// A scheduler that has not shut down.
    pub const fn new() -> Self {
        Self { shutdown: false, fault: None, reason_text: None }
    }

    /// The fault that triggered shutdown, if any.
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    /// The human-readable reason passed to [`Scheduler::shutdown`], if any.
    pub fn reason_text(&self) -> Option<&'static str> {
        self.reason_text
    }
}

impl Scheduler for SystemScheduler {
    fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    fn shutdown_reason(&self) -> u16 {
        self.fault.map(|f| f as u16).unwrap_or(0)
    }

    fn shutdown(&mut self, fault: Fault, reason: &'static str) {
        if self.shutdown {
            return;
        }
        defmt::error!("fatal shutdown: {}", reason);
        self.shutdown = true;
        self.fault = Some(fault);
        self.reason_text = Some(reason);
    }
}
