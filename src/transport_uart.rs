//! Blocking UART transport adapter implementing the [`Console`] interface.
//!
//! Simpler alternative to [`crate::transport_usb`] for boards wired to a
//! plain UART instead of native USB. Unlike the USB adapter's `pump`, which
//! only ever drains what a background task already received,
//! [`UartConsole::blocking_pump`] blocks until at least one byte arrives —
//! the same tradeoff the reference blocking UART loop makes. Run it from a
//! dedicated polling loop, not interleaved with the dispatcher's tick.

use embassy_rp::uart::{Blocking, Uart};

use crate::console::{drop_front, Console};

/// A [`Console`] backed by a blocking UART peripheral.
pub struct UartConsole<'a, const N: usize> {
    uart: Uart<'a, Blocking>,
    input: heapless::Vec<u8, N>,
    scratch: heapless::Vec<u8, N>,
    sent: heapless::Vec<u8, N>,
}

impl<'a, const N: usize> UartConsole<'a, N> {
    /// Wrap an already-configured blocking UART.
    pub fn new(uart: Uart<'a, Blocking>) -> Self {
        Self { uart, input: heapless::Vec::new(), scratch: heapless::Vec::new(), sent: heapless::Vec::new() }
    }

    /// Block until at least one byte arrives, then append whatever's
    /// available to the input queue.
    pub fn blocking_pump(&mut self) {
        let mut chunk = [0u8; 64];
        match self.uart.read(&mut chunk) {
            Ok(n) if n > 0 => {
                if self.input.extend_from_slice(&chunk[..n]).is_err() {
                    defmt::warn!("uart console input overflow, dropping buffered bytes");
                }
            }
            Ok(_) => {}
            Err(_) => defmt::warn!("uart read error"),
        }
    }

    /// Write out everything committed since the last flush.
    pub fn flush(&mut self) {
        if !self.sent.is_empty() {
            let _ = self.uart.write(&self.sent);
            self.sent.clear();
        }
    }
}

impl<'a, const N: usize> Console for UartConsole<'a, N> {
    fn input_peek(&self) -> &[u8] {
        &self.input
    }

    fn input_pop(&mut self, n: usize) {
        drop_front(&mut self.input, n);
    }

    fn output_reserve(&mut self, n: usize) -> Option<&mut [u8]> {
        self.scratch.clear();
        self.scratch.resize(n, 0).ok()?;
        Some(&mut self.scratch[..n])
    }

    fn output_commit(&mut self, n: usize) {
        let _ = self.sent.extend_from_slice(&self.scratch[..n]);
    }
}
