//! Wire-level type tags and the immutable descriptor model the registry is
//! built from.

/// Parameter type tag carried in a command's or message's wire-format
/// parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Unsigned 32-bit integer, VLQ-encoded.
    U32,
    /// Signed 32-bit integer, VLQ-encoded.
    I32,
    /// Unsigned 16-bit integer, masked to 16 bits before VLQ encoding.
    U16,
    /// Signed 16-bit integer, masked to 16 bits before VLQ encoding.
    I16,
    /// Single byte, masked to 16 bits before VLQ encoding.
    Byte,
    /// Outbound only: length-prefixed string, length byte then raw bytes.
    String,
    /// Length-prefixed opaque byte buffer.
    Buffer,
    /// Length-prefixed byte buffer sourced from read-only/flash storage.
    /// Carries the same wire shape as `Buffer`; the tag exists for fidelity
    /// with firmware that distinguishes RAM and flash sources at the call
    /// site, not because the wire format cares.
    ProgmemBuffer,
}

/// Parser descriptor flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserFlags(u8);

impl ParserFlags {
    /// No flags set.
    pub const NONE: ParserFlags = ParserFlags(0);
    /// The command is still dispatched while the system is latched into
    /// shutdown (e.g. `identify`, `get_uptime`).
    pub const IN_SHUTDOWN: ParserFlags = ParserFlags(1 << 0);

    /// True if every bit set in `other` is also set in `self`.
    pub const fn contains(self, other: ParserFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A handler invoked once per dispatched command, given the parsed argument
/// vector for that command.
pub type HandlerFn = fn(&mut crate::dispatch::Context, &[u32]);

/// Immutable, build-time description of one inbound command.
pub struct CommandParser {
    /// The wire-format command id this descriptor answers for.
    pub cmd_id: u8,
    /// Number of wire-format parameters (may differ from `num_args`: a
    /// `Buffer` parameter contributes two argument slots).
    pub num_params: u8,
    /// Number of `u32` slots the parsed argument vector occupies.
    pub num_args: u8,
    /// The parameter type sequence, in wire order.
    pub param_types: &'static [ParamType],
    /// Dispatch-eligibility flags.
    pub flags: ParserFlags,
    /// The handler to invoke once arguments are parsed.
    pub func: HandlerFn,
}

/// Immutable, build-time description of one outbound message.
pub struct CommandEncoder {
    /// The wire-format message id written after `LEN`/`SEQ`. Unused (and
    /// not emitted) when `max_size` is zero.
    pub msg_id: u8,
    /// Number of parameters the caller must supply.
    pub num_params: u8,
    /// The parameter type sequence, in wire order.
    pub param_types: &'static [ParamType],
    /// Maximum payload size in bytes, not counting the 2-byte header or
    /// 3-byte trailer. Zero marks the header/trailer-only empty message
    /// used for frame-level ack/nak.
    pub max_size: u8,
}
