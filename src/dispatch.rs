//! The per-tick dispatcher: recognizes one frame, parses and runs each
//! command inside it, and feeds the fault latch on fatal errors.

use crate::args::parse_args;
use crate::console::Console;
use crate::encode::{encode_message, Arg, SendOutcome};
use crate::frame::{next_frame, DispatchState, FrameEvent};
use crate::handlers::DigitalIo;
use crate::registry::{CommandIndex, IS_SHUTDOWN_ENCODER};
use crate::sched::{Fault, Scheduler};
use crate::types::ParserFlags;

/// Commands with more than this many `u32` argument slots can't be
/// registered; large enough for every descriptor this crate ships.
const MAX_ARGS: usize = 8;

/// Everything one handler invocation needs: where to send responses, the
/// digital I/O it may act on, the sequencing state for stamping responses,
/// and the raw payload bytes backing any `Buffer` arguments.
pub struct Context<'a> {
    console: &'a mut dyn Console,
    pins: &'a mut dyn DigitalIo,
    next_sequence: u8,
    payload: &'a [u8],
    uptime_millis: u32,
    encode_fault: &'a mut Option<Fault>,
}

impl<'a> Context<'a> {
    /// Encode and send a message using the sequence number stamped on the
    /// frame currently being processed.
    ///
    /// A payload-overrun error from the encoder is recorded on this context
    /// in addition to being returned, so [`Dispatcher::tick`] can latch the
    /// fatal shutdown the error table requires even though `HandlerFn` has
    /// no return channel of its own.
    pub fn send(&mut self, encoder: &crate::types::CommandEncoder, args: &[Arg]) -> Result<SendOutcome, Fault> {
        let result = encode_message(self.console, self.next_sequence, encoder, args);
        if let Err(fault) = result {
            *self.encode_fault = Some(fault);
        }
        result
    }

    /// Mutable access to the digital I/O surface, for handlers that toggle
    /// or read pins.
    pub fn pins(&mut self) -> &mut dyn DigitalIo {
        self.pins
    }

    /// Resolve a `Buffer`/`ProgmemBuffer` argument pair back into a slice
    /// of this command's payload.
    pub fn buffer_arg(&self, args: &[u32], slot: usize) -> &'a [u8] {
        crate::args::buffer_arg(self.payload, args, slot)
    }

    /// Milliseconds since boot, as of the tick this command is running in.
    pub fn uptime_millis(&self) -> u32 {
        self.uptime_millis
    }
}

/// What a [`Dispatcher::tick`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No complete frame was available.
    Idle,
    /// A frame was recognized and this many commands inside it ran.
    Dispatched(usize),
    /// A fatal fault was hit (on this tick or a prior one); the dispatcher
    /// will not process another frame.
    Shutdown(Fault),
}

/// Owns frame-sequencing state and the fatal-fault latch across ticks.
pub struct Dispatcher {
    state: DispatchState,
    latched_fault: Option<Fault>,
    ticks: u32,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// A fresh dispatcher: synchronized, not shut down, uptime at zero.
    pub const fn new() -> Self {
        Self { state: DispatchState::new(), latched_fault: None, ticks: 0 }
    }

    /// Monotonic millisecond counter `get_uptime` reports; advanced by the
    /// caller's main loop, not by `tick` itself.
    pub fn set_uptime_millis(&mut self, millis: u32) {
        self.ticks = millis;
    }

    /// Run one non-blocking step: recognize at most one frame, dispatch
    /// every command inside it, and return what happened.
    ///
    /// Never suspends. Once a fatal fault has been latched (by this call or
    /// a prior one) every subsequent call returns immediately without
    /// touching the console — this crate's adaptation of "shutdown never
    /// returns" into something a test can observe. See
    /// [`crate::sched::Scheduler`].
    pub fn tick<C: Console, S: Scheduler, D: DigitalIo>(
        &mut self,
        console: &mut C,
        scheduler: &mut S,
        pins: &mut D,
        index: &CommandIndex,
    ) -> DispatchOutcome {
        if let Some(fault) = self.latched_fault {
            return DispatchOutcome::Shutdown(fault);
        }

        let frame = match next_frame(console, &mut self.state) {
            FrameEvent::Idle => return DispatchOutcome::Idle,
            FrameEvent::Frame(bytes) => bytes,
        };

        let msglen = frame.len();
        let end = msglen - 3;
        let payload = &frame[2..end];
        let mut p = 0usize;
        let mut dispatched = 0usize;

        while p < payload.len() {
            let cmd_id = payload[p];
            p += 1;

            let parser = match index.lookup(cmd_id) {
                Some(parser) => parser,
                None => {
                    self.latch(scheduler, Fault::InvalidCommand, "Invalid command");
                    console.input_pop(msglen);
                    return DispatchOutcome::Shutdown(Fault::InvalidCommand);
                }
            };

            if scheduler.is_shutdown() && !parser.flags.contains(ParserFlags::IN_SHUTDOWN) {
                let reason = scheduler.shutdown_reason();
                let _ = encode_message(console, self.state.next_sequence, &IS_SHUTDOWN_ENCODER, &[Arg::U16(reason)]);
                break;
            }

            let mut args = [0u32; MAX_ARGS];
            let slots = parser.num_args as usize;
            match parse_args(payload, p, parser, &mut args[..slots]) {
                Ok(newp) => {
                    p = newp;
                    let mut encode_fault = None;
                    let mut ctx = Context {
                        console,
                        pins,
                        next_sequence: self.state.next_sequence,
                        payload,
                        uptime_millis: self.ticks,
                        encode_fault: &mut encode_fault,
                    };
                    (parser.func)(&mut ctx, &args[..slots]);
                    if let Some(fault) = encode_fault {
                        self.latch(scheduler, fault, "Message encode error");
                        console.input_pop(msglen);
                        return DispatchOutcome::Shutdown(fault);
                    }
                    dispatched += 1;
                }
                Err(_) => {
                    self.latch(scheduler, Fault::CommandParserError, "Command parser error");
                    console.input_pop(msglen);
                    return DispatchOutcome::Shutdown(Fault::CommandParserError);
                }
            }
        }

        console.input_pop(msglen);
        DispatchOutcome::Dispatched(dispatched)
    }

    fn latch<S: Scheduler>(&mut self, scheduler: &mut S, fault: Fault, reason: &'static str) {
        self.latched_fault = Some(fault);
        scheduler.shutdown(fault, reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::RingConsole;
    use crate::handlers::tests::SimPins;
    use crate::registry::COMMAND_INDEX;
    use crate::sched::SystemScheduler;

    fn build_frame(seq: u8, cmds: &[&[u8]]) -> heapless::Vec<u8, 64> {
        let mut payload = heapless::Vec::<u8, 64>::new();
        for cmd in cmds {
            let _ = payload.extend_from_slice(cmd);
        }
        let len = (payload.len() + 5) as u8;
        let mut body = heapless::Vec::<u8, 64>::new();
        let _ = body.push(len);
        let _ = body.push(seq);
        let _ = body.extend_from_slice(&payload);
        let crc = crate::crc::crc16_ccitt(&body);
        let _ = body.push((crc >> 8) as u8);
        let _ = body.push((crc & 0xff) as u8);
        let _ = body.push(0x7E);
        body
    }

    #[test]
    fn idle_with_no_data() {
        let mut console: RingConsole<64, 64> = RingConsole::new();
        let mut scheduler = SystemScheduler::new();
        let mut pins = SimPins::<8>::new();
        let mut dispatcher = Dispatcher::new();
        let outcome = dispatcher.tick(&mut console, &mut scheduler, &mut pins, &COMMAND_INDEX);
        assert_eq!(outcome, DispatchOutcome::Idle);
    }

    #[test]
    fn dispatches_get_uptime() {
        let mut console: RingConsole<64, 64> = RingConsole::new();
        let mut scheduler = SystemScheduler::new();
        let mut pins = SimPins::<8>::new();
        let mut dispatcher = Dispatcher::new();
        dispatcher.set_uptime_millis(42);
        let frame = build_frame(0x10, &[&[0x20]]);
        console.feed(&frame);
        let outcome = dispatcher.tick(&mut console, &mut scheduler, &mut pins, &COMMAND_INDEX);
        assert_eq!(outcome, DispatchOutcome::Dispatched(1));
        // Two messages went out: the frame ack, then the uptime response.
        assert!(console.sent().len() > 5);
    }

    #[test]
    fn unknown_command_id_latches_a_fault() {
        let mut console: RingConsole<64, 64> = RingConsole::new();
        let mut scheduler = SystemScheduler::new();
        let mut pins = SimPins::<8>::new();
        let mut dispatcher = Dispatcher::new();
        let frame = build_frame(0x10, &[&[0xFF]]);
        console.feed(&frame);
        let outcome = dispatcher.tick(&mut console, &mut scheduler, &mut pins, &COMMAND_INDEX);
        assert_eq!(outcome, DispatchOutcome::Shutdown(Fault::InvalidCommand));
        assert!(scheduler.is_shutdown());

        // Never resumes: a perfectly good follow-up frame is ignored too.
        let good = build_frame(0x11, &[&[0x20]]);
        console.feed(&good);
        let outcome = dispatcher.tick(&mut console, &mut scheduler, &mut pins, &COMMAND_INDEX);
        assert_eq!(outcome, DispatchOutcome::Shutdown(Fault::InvalidCommand));
    }

    #[test]
    fn set_and_get_digital_pin_round_trip() {
        let mut console: RingConsole<64, 64> = RingConsole::new();
        let mut scheduler = SystemScheduler::new();
        let mut pins = SimPins::<8>::new();
        let mut dispatcher = Dispatcher::new();

        let set_frame = build_frame(0x10, &[&[0x10, 0x03, 0x01]]);
        console.feed(&set_frame);
        dispatcher.tick(&mut console, &mut scheduler, &mut pins, &COMMAND_INDEX);
        console.clear_sent();

        let get_frame = build_frame(0x11, &[&[0x11, 0x03]]);
        console.feed(&get_frame);
        let outcome = dispatcher.tick(&mut console, &mut scheduler, &mut pins, &COMMAND_INDEX);
        assert_eq!(outcome, DispatchOutcome::Dispatched(1));
        assert!(console.sent().len() > 5);
    }

    #[test]
    fn identify_honors_the_requested_offset() {
        let mut console: RingConsole<64, 64> = RingConsole::new();
        let mut scheduler = SystemScheduler::new();
        let mut pins = SimPins::<8>::new();
        let mut dispatcher = Dispatcher::new();

        // cmd 0x01, buffer len=1, offset byte=4: skip past "mcu-".
        let frame = build_frame(0x10, &[&[0x01, 0x01, 0x04]]);
        console.feed(&frame);
        let outcome = dispatcher.tick(&mut console, &mut scheduler, &mut pins, &COMMAND_INDEX);
        assert_eq!(outcome, DispatchOutcome::Dispatched(1));

        let sent = console.sent();
        // ack frame (5 bytes) first, then the identify_response frame:
        // LEN SEQ msg_id len-byte data... CRC SYNC.
        let response = &sent[5..];
        assert_eq!(response[3] as usize, 12);
        assert_eq!(&response[4..4 + 12], b"console v0.1");
    }
}
