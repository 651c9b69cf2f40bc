//! Example command handlers exercised by the dispatcher and its tests.
//!
//! These aren't part of the protocol core — they exist to give the
//! registry real commands to dispatch to, the way a firmware image wires
//! real GPIO/ADC/stepper handlers behind the same descriptors.

use crate::dispatch::Context;
use crate::encode::Arg;
use crate::registry;

/// The digital I/O surface handlers act on. Out of scope for the protocol
/// itself — only this interface is specified — so both a hardware-backed
/// implementation ([`crate::pins_rp2040`]) and a host-testable one
/// ([`tests::SimPins`]) can stand in for it.
pub trait DigitalIo {
    /// Drive `pin` high or low.
    fn set_pin(&mut self, pin: u16, high: bool);
    /// Read the current level of `pin`.
    fn read_pin(&mut self, pin: u16) -> bool;
}

const FIRMWARE_IDENTITY: &[u8] = b"mcu-console v0.1";

/// `identify`: the inbound buffer's first byte is an offset into
/// [`FIRMWARE_IDENTITY`]; responds with the identity data from that offset
/// onward, letting the host page through it a chunk at a time. An offset
/// past the end of the identity string yields an empty response. Exempt
/// from shutdown so the host can always ask what it's talking to.
pub fn identify(ctx: &mut Context, args: &[u32]) {
    let request = ctx.buffer_arg(args, 0);
    let offset = request.first().copied().unwrap_or(0) as usize;
    let data = FIRMWARE_IDENTITY.get(offset..).unwrap_or(&[]);
    let _ = ctx.send(registry::encoder(registry::ENC_IDENTIFY_RESPONSE), &[Arg::Buffer(data)]);
}

/// `set_digital_out pin value`: drives a pin, no individual response (the
/// frame-level ack is the only acknowledgement).
pub fn set_digital_out(ctx: &mut Context, args: &[u32]) {
    let pin = args[0] as u16;
    let value = args[1] != 0;
    ctx.pins().set_pin(pin, value);
}

/// `get_digital_in pin`: reads a pin and reports its level back.
pub fn get_digital_in(ctx: &mut Context, args: &[u32]) {
    let pin = args[0] as u16;
    let value = if ctx.pins().read_pin(pin) { 1u8 } else { 0u8 };
    let _ = ctx.send(registry::encoder(registry::ENC_DIGITAL_IN_STATE), &[Arg::U16(pin), Arg::Byte(value)]);
}

/// `get_uptime`: reports milliseconds since boot. Exempt from shutdown.
pub fn get_uptime(ctx: &mut Context, _args: &[u32]) {
    let millis = ctx.uptime_millis();
    let _ = ctx.send(registry::encoder(registry::ENC_UPTIME), &[Arg::U32(millis)]);
}
