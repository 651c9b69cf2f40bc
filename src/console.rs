//! The `Console` byte-queue interface and a host-testable ring-buffer
//! implementation.
//!
//! The console's own I/O plumbing (interrupts, DMA, USB endpoints) is out
//! of scope here; only the interface the frame layer and dispatcher need is
//! specified, mirroring the stream buffer `Parser` kept internally.

/// The byte-queue interface the frame layer and dispatcher consume.
///
/// Implementations own two independent queues: an inbound byte stream the
/// frame layer peeks into and pops from as frames are recognized, and an
/// outbound reservation the encoder writes a whole frame into before
/// committing it atomically.
pub trait Console {
    /// Borrow whatever bytes are currently queued for input, in order.
    fn input_peek(&self) -> &[u8];

    /// Discard the first `n` bytes of the input queue.
    fn input_pop(&mut self, n: usize);

    /// Reserve `n` contiguous bytes of output buffer to write a message
    /// into. Returns `None` if the output buffer can't accommodate the
    /// request (message silently dropped by the caller).
    fn output_reserve(&mut self, n: usize) -> Option<&mut [u8]>;

    /// Make the first `n` bytes written into the last reservation visible
    /// to the transport.
    fn output_commit(&mut self, n: usize);
}

/// Shift `buf` left by `count` bytes, discarding the dropped prefix.
pub(crate) fn drop_front<const N: usize>(buf: &mut heapless::Vec<u8, N>, count: usize) {
    let len = buf.len();
    if count >= len {
        buf.clear();
        return;
    }
    for i in 0..(len - count) {
        buf[i] = buf[i + count];
    }
    buf.truncate(len - count);
}

/// A `Console` backed by fixed-capacity `heapless` buffers, for host tests
/// and as the reference implementation the firmware adapters mirror.
///
/// `IN` bounds the inbound byte queue; `OUT` bounds both the output
/// reservation scratch space and the log of everything committed since the
/// last [`RingConsole::clear_sent`].
pub struct RingConsole<const IN: usize, const OUT: usize> {
    input: heapless::Vec<u8, IN>,
    scratch: heapless::Vec<u8, OUT>,
    sent: heapless::Vec<u8, OUT>,
}

impl<const IN: usize, const OUT: usize> Default for RingConsole<IN, OUT> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const IN: usize, const OUT: usize> RingConsole<IN, OUT> {
    /// An empty console with nothing queued in either direction.
    pub const fn new() -> Self {
        Self { input: heapless::Vec::new(), scratch: heapless::Vec::new(), sent: heapless::Vec::new() }
    }

    /// Append `bytes` to the inbound queue, as if received from the wire.
    /// Returns the number of bytes actually accepted.
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        let room = IN - self.input.len();
        let n = bytes.len().min(room);
        let _ = self.input.extend_from_slice(&bytes[..n]);
        n
    }

    /// Everything committed to the output side since the last clear.
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    /// Drop everything recorded by [`RingConsole::sent`].
    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }
}

impl<const IN: usize, const OUT: usize> Console for RingConsole<IN, OUT> {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_and_pop_round_trip() {
        let mut c: RingConsole<16, 16> = RingConsole::new();
        assert_eq!(c.feed(b"hello"), 5);
        assert_eq!(c.input_peek(), b"hello");
        c.input_pop(2);
        assert_eq!(c.input_peek(), b"llo");
    }

    #[test]
    fn feed_respects_capacity() {
        let mut c: RingConsole<4, 16> = RingConsole::new();
        assert_eq!(c.feed(b"abcdef"), 4);
        assert_eq!(c.input_peek(), b"abcd");
    }

    #[test]
    fn reserve_and_commit_records_sent_bytes() {
        let mut c: RingConsole<4, 16> = RingConsole::new();
        {
            let buf = c.output_reserve(3).unwrap();
            buf.copy_from_slice(&[1, 2, 3]);
        }
        c.output_commit(3);
        assert_eq!(c.sent(), &[1, 2, 3]);
        c.clear_sent();
        assert_eq!(c.sent(), &[]);
    }

    #[test]
    fn reserve_beyond_capacity_returns_none() {
        let mut c: RingConsole<4, 4> = RingConsole::new();
        assert!(c.output_reserve(5).is_none());
    }
}
