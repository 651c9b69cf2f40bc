//! Frame synchronization, sequencing, CRC verification and ack/nak.
//!
//! Wire shape: `LEN(1) SEQ(1) PAYLD(0..=59) CRC(2, big-endian) SYNC(1=0x7E)`.
//! `SEQ`'s top nibble carries a destination marker (`0x10`); the bottom
//! nibble is a 4-bit rolling counter the peer must echo exactly to have a
//! frame accepted.

use crate::console::Console;
use crate::encode::encode_message;
use crate::registry::EMPTY_ENCODER;

/// Minimum total frame size: header(2) + trailer(3), empty payload.
pub const MESSAGE_MIN: usize = 5;
/// Maximum total frame size.
pub const MESSAGE_MAX: usize = 64;

const DEST: u8 = 0x10;
const SEQ_MASK: u8 = 0x0f;
const SYNC_BYTE: u8 = 0x7E;

const NEED_SYNC: u8 = 1 << 0;
const NEED_VALID: u8 = 1 << 1;

/// Sequencing and resync state carried between ticks.
pub struct DispatchState {
    /// The sequence byte (including the `DEST` marker) the next inbound
    /// frame is expected to carry, and the value stamped onto every
    /// outbound message.
    pub next_sequence: u8,
    sync_state: u8,
}

impl Default for DispatchState {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchState {
    /// Fresh state: synchronized, awaiting sequence `DEST`.
    pub const fn new() -> Self {
        Self { next_sequence: DEST, sync_state: 0 }
    }
}

/// The result of one attempt to recognize a frame in the console's input
/// queue.
pub enum FrameEvent {
    /// No complete, valid frame is available this tick.
    Idle,
    /// A complete frame was recognized, acked, and is ready to dispatch.
    /// The caller is responsible for popping `MESSAGE_MIN`..=`MESSAGE_MAX`
    /// bytes (the frame's own `LEN`) from the console once it has finished
    /// reading out the commands inside.
    Frame(heapless::Vec<u8, MESSAGE_MAX>),
}

enum Attempt {
    NeedMore,
    Frame(usize),
    SeqMismatch(usize),
    Error,
}

fn try_parse(buf: &[u8], next_sequence: u8) -> Attempt {
    if buf.len() < MESSAGE_MIN {
        return Attempt::NeedMore;
    }
    let len = buf[0] as usize;
    if !(MESSAGE_MIN..=MESSAGE_MAX).contains(&len) {
        return Attempt::Error;
    }
    let seq = buf[1];
    if seq & 0xf0 != DEST {
        return Attempt::Error;
    }
    if buf.len() < len {
        return Attempt::NeedMore;
    }
    if buf[len - 1] != SYNC_BYTE {
        return Attempt::Error;
    }
    let crc = crate::crc::crc16_ccitt(&buf[..len - 3]);
    let got = ((buf[len - 3] as u16) << 8) | buf[len - 2] as u16;
    if crc != got {
        return Attempt::Error;
    }
    if seq != next_sequence {
        return Attempt::SeqMismatch(len);
    }
    Attempt::Frame(len)
}

/// Attempt to recognize one frame out of `console`'s input queue, advancing
/// `state` and emitting acks/naks as needed.
pub fn next_frame<C: Console>(console: &mut C, state: &mut DispatchState) -> FrameEvent {
    let have_data = !console.input_peek().is_empty();
    if have_data && state.sync_state & NEED_SYNC != 0 {
        resync(console, state);
        return FrameEvent::Idle;
    }

    let snapshot: heapless::Vec<u8, MESSAGE_MAX> = {
        let peek = console.input_peek();
        let take = peek.len().min(MESSAGE_MAX);
        let mut tmp = heapless::Vec::new();
        let _ = tmp.extend_from_slice(&peek[..take]);
        tmp
    };
    if snapshot.is_empty() {
        return FrameEvent::Idle;
    }

    match try_parse(&snapshot, state.next_sequence) {
        Attempt::NeedMore => FrameEvent::Idle,
        Attempt::Frame(len) => {
            state.sync_state &= !NEED_VALID;
            state.next_sequence = (state.next_sequence.wrapping_add(1) & SEQ_MASK) | DEST;
            let _ = encode_message(console, state.next_sequence, &EMPTY_ENCODER, &[]);
            let mut out = heapless::Vec::new();
            let _ = out.extend_from_slice(&snapshot[..len]);
            FrameEvent::Frame(out)
        }
        Attempt::SeqMismatch(len) => {
            state.sync_state &= !NEED_VALID;
            console.input_pop(len);
            let _ = encode_message(console, state.next_sequence, &EMPTY_ENCODER, &[]);
            FrameEvent::Idle
        }
        Attempt::Error => {
            handle_error(console, &snapshot, state);
            FrameEvent::Idle
        }
    }
}

fn handle_error<C: Console>(console: &mut C, snapshot: &[u8], state: &mut DispatchState) {
    if snapshot.first() == Some(&SYNC_BYTE) {
        console.input_pop(1);
        return;
    }
    state.sync_state |= NEED_SYNC;
    resync(console, state);
}

fn resync<C: Console>(console: &mut C, state: &mut DispatchState) {
    let pos = console.input_peek().iter().position(|&b| b == SYNC_BYTE);
    match pos {
        Some(idx) => {
            state.sync_state &= !NEED_SYNC;
            console.input_pop(idx + 1);
        }
        None => {
            let len = console.input_peek().len();
            console.input_pop(len);
        }
    }
    if state.sync_state & NEED_VALID != 0 {
        return;
    }
    state.sync_state |= NEED_VALID;
    let _ = encode_message(console, state.next_sequence, &EMPTY_ENCODER, &[]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::RingConsole;

    fn build_frame(seq: u8, payload: &[u8]) -> heapless::Vec<u8, MESSAGE_MAX> {
        let len = (payload.len() + MESSAGE_MIN) as u8;
        let mut body = heapless::Vec::<u8, MESSAGE_MAX>::new();
        let _ = body.push(len);
        let _ = body.push(seq);
        let _ = body.extend_from_slice(payload);
        let crc = crate::crc::crc16_ccitt(&body);
        let _ = body.push((crc >> 8) as u8);
        let _ = body.push((crc & 0xff) as u8);
        let _ = body.push(0x7E);
        body
    }

    #[test]
    fn idle_on_empty_input() {
        let mut console: RingConsole<64, 64> = RingConsole::new();
        let mut state = DispatchState::new();
        assert!(matches!(next_frame(&mut console, &mut state), FrameEvent::Idle));
    }

    #[test]
    fn recognizes_valid_frame_and_acks() {
        let mut console: RingConsole<64, 64> = RingConsole::new();
        let mut state = DispatchState::new();
        let frame = build_frame(DEST, &[0x20]);
        console.feed(&frame);
        match next_frame(&mut console, &mut state) {
            FrameEvent::Frame(bytes) => assert_eq!(bytes.as_slice(), frame.as_slice()),
            FrameEvent::Idle => panic!("expected a frame"),
        }
        // An ack went out, stamped with the advanced sequence.
        assert!(!console.sent().is_empty());
        assert_eq!(state.next_sequence, (DEST + 1) & SEQ_MASK | DEST);
    }

    #[test]
    fn needs_more_on_partial_frame() {
        let mut console: RingConsole<64, 64> = RingConsole::new();
        let mut state = DispatchState::new();
        let frame = build_frame(DEST, &[0x20]);
        console.feed(&frame[..frame.len() - 2]);
        assert!(matches!(next_frame(&mut console, &mut state), FrameEvent::Idle));
    }

    #[test]
    fn bad_crc_resyncs_to_the_trailing_sync_byte() {
        // No spurious 0x7E appears before the genuine trailing sync byte,
        // so resync discards the whole corrupted frame in one go.
        let mut console: RingConsole<64, 64> = RingConsole::new();
        let mut state = DispatchState::new();
        let mut frame = build_frame(DEST, &[0x20]);
        let crc_lo = frame.len() - 2;
        frame[crc_lo] ^= 0xff;
        console.feed(&frame);
        assert!(matches!(next_frame(&mut console, &mut state), FrameEvent::Idle));
        assert!(console.input_peek().is_empty());
    }

    #[test]
    fn leading_sync_byte_with_bad_crc_is_dropped_one_at_a_time() {
        // The buffer itself starts with 0x7E, so the fast path in the error
        // handler pops a single byte instead of scanning for resync.
        let mut console: RingConsole<64, 64> = RingConsole::new();
        let mut state = DispatchState::new();
        let mut frame = build_frame(DEST, &[0x20]);
        frame[0] = 0x7E;
        let before = frame.len();
        console.feed(&frame);
        assert!(matches!(next_frame(&mut console, &mut state), FrameEvent::Idle));
        assert_eq!(console.input_peek().len(), before - 1);
    }

    #[test]
    fn stale_sequence_is_nakked_and_popped() {
        let mut console: RingConsole<64, 64> = RingConsole::new();
        let mut state = DispatchState::new();
        state.next_sequence = (DEST + 1) & SEQ_MASK | DEST;
        let frame = build_frame(DEST, &[0x20]);
        console.feed(&frame);
        assert!(matches!(next_frame(&mut console, &mut state), FrameEvent::Idle));
        assert!(console.input_peek().is_empty());
        assert!(!console.sent().is_empty());
    }

    #[test]
    fn garbage_prefix_is_resynced_to_next_sync_byte() {
        let mut console: RingConsole<64, 64> = RingConsole::new();
        let mut state = DispatchState::new();
        let mut garbage: heapless::Vec<u8, 64> = heapless::Vec::new();
        let _ = garbage.extend_from_slice(&[0x01, 0x02, 0x03, 0x7E]);
        let frame = build_frame(DEST, &[0x20]);
        let _ = garbage.extend_from_slice(&frame);
        console.feed(&garbage);
        assert!(matches!(next_frame(&mut console, &mut state), FrameEvent::Idle));
        assert_eq!(console.input_peek(), frame.as_slice());
        match next_frame(&mut console, &mut state) {
            FrameEvent::Frame(bytes) => assert_eq!(bytes.as_slice(), frame.as_slice()),
            FrameEvent::Idle => panic!("expected a frame after resync"),
        }
    }

    #[test]
    fn garbage_with_no_sync_byte_discards_everything_and_still_naks() {
        let mut console: RingConsole<64, 64> = RingConsole::new();
        let mut state = DispatchState::new();
        console.feed(&[0x01, 0x02, 0x03, 0x04]);
        assert!(matches!(next_frame(&mut console, &mut state), FrameEvent::Idle));
        assert!(console.input_peek().is_empty());
        assert!(!console.sent().is_empty());
    }
}
