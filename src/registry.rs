//! The hand-authored command index and encoder table.
//!
//! In the original firmware this table is emitted by a build-time code
//! generator walking `DECL_COMMAND`/`DECL_MESSAGE` declarations scattered
//! across the source tree. Generating it is out of scope here; these
//! descriptors are written out directly, which is also why
//! [`validate`] exists — with no generator to enforce invariants at build
//! time, a test has to.

use crate::handlers;
use crate::types::{CommandEncoder, CommandParser, ParamType, ParserFlags};

/// Highest command id any descriptor below uses; sizes [`COMMAND_ENTRIES`].
const MAX_CMD_ID: usize = 0x20;

pub(crate) static IDENTIFY_PARSER: CommandParser = CommandParser {
    cmd_id: 0x01,
    num_params: 1,
    num_args: 2,
    param_types: &[ParamType::Buffer],
    flags: ParserFlags::IN_SHUTDOWN,
    func: handlers::identify,
};

pub(crate) static SET_DIGITAL_OUT_PARSER: CommandParser = CommandParser {
    cmd_id: 0x10,
    num_params: 2,
    num_args: 2,
    param_types: &[ParamType::U16, ParamType::Byte],
    flags: ParserFlags::NONE,
    func: handlers::set_digital_out,
};

pub(crate) static GET_DIGITAL_IN_PARSER: CommandParser = CommandParser {
    cmd_id: 0x11,
    num_params: 1,
    num_args: 1,
    param_types: &[ParamType::U16],
    flags: ParserFlags::NONE,
    func: handlers::get_digital_in,
};

pub(crate) static GET_UPTIME_PARSER: CommandParser = CommandParser {
    cmd_id: 0x20,
    num_params: 0,
    num_args: 0,
    param_types: &[],
    flags: ParserFlags::IN_SHUTDOWN,
    func: handlers::get_uptime,
};

/// The empty ack/nak message: header and trailer only, no `msg_id` byte.
pub const EMPTY_ENCODER: CommandEncoder = CommandEncoder { msg_id: 0, num_params: 0, param_types: &[], max_size: 0 };

/// `is_shutdown reason`: sent in place of dispatching a non-exempt command
/// while shut down.
pub const IS_SHUTDOWN_ENCODER: CommandEncoder =
    CommandEncoder { msg_id: 0xF0, num_params: 1, param_types: &[ParamType::U16], max_size: 4 };

const IDENTIFY_RESPONSE_ENCODER: CommandEncoder =
    CommandEncoder { msg_id: 0x81, num_params: 1, param_types: &[ParamType::Buffer], max_size: 40 };

const DIGITAL_IN_STATE_ENCODER: CommandEncoder = CommandEncoder {
    msg_id: 0x91,
    num_params: 2,
    param_types: &[ParamType::U16, ParamType::Byte],
    max_size: 6,
};

const UPTIME_ENCODER: CommandEncoder =
    CommandEncoder { msg_id: 0xA0, num_params: 1, param_types: &[ParamType::U32], max_size: 5 };

/// Index into [`ENCODERS`] for the identify response.
pub const ENC_IDENTIFY_RESPONSE: usize = 0;
/// Index into [`ENCODERS`] for the digital-in state report.
pub const ENC_DIGITAL_IN_STATE: usize = 1;
/// Index into [`ENCODERS`] for the uptime report.
pub const ENC_UPTIME: usize = 2;

static ENCODERS: [CommandEncoder; 3] = [IDENTIFY_RESPONSE_ENCODER, DIGITAL_IN_STATE_ENCODER, UPTIME_ENCODER];

/// Look up one of the non-empty, non-`is_shutdown` encoders by its
/// `ENC_*` id.
pub fn encoder(id: usize) -> &'static CommandEncoder {
    &ENCODERS[id]
}

/// O(1) lookup from wire-format command id to its descriptor.
pub struct CommandIndex {
    entries: &'static [Option<&'static CommandParser>],
}

impl CommandIndex {
    /// The descriptor registered for `cmd_id`, if any.
    pub fn lookup(&self, cmd_id: u8) -> Option<&'static CommandParser> {
        self.entries.get(cmd_id as usize).copied().flatten()
    }
}

const fn build_index() -> [Option<&'static CommandParser>; MAX_CMD_ID + 1] {
    let mut table: [Option<&'static CommandParser>; MAX_CMD_ID + 1] = [None; MAX_CMD_ID + 1];
    table[IDENTIFY_PARSER.cmd_id as usize] = Some(&IDENTIFY_PARSER);
    table[SET_DIGITAL_OUT_PARSER.cmd_id as usize] = Some(&SET_DIGITAL_OUT_PARSER);
    table[GET_DIGITAL_IN_PARSER.cmd_id as usize] = Some(&GET_DIGITAL_IN_PARSER);
    table[GET_UPTIME_PARSER.cmd_id as usize] = Some(&GET_UPTIME_PARSER);
    table
}

static COMMAND_ENTRIES: [Option<&'static CommandParser>; MAX_CMD_ID + 1] = build_index();

/// The command index this crate ships.
pub static COMMAND_INDEX: CommandIndex = CommandIndex { entries: &COMMAND_ENTRIES };

/// Check every registered descriptor's `param_types` against invariants a
/// build-time generator would otherwise enforce: `String` never appears
/// inbound, and `num_args` matches what `param_types` actually produces
/// (one slot per integer, two per buffer).
pub fn validate(index: &[&'static CommandParser]) -> Result<(), &'static str> {
    for parser in index {
        let mut slots = 0u8;
        for ty in parser.param_types {
            match ty {
                ParamType::String => return Err("String is outbound-only, not valid in an inbound descriptor"),
                ParamType::Buffer | ParamType::ProgmemBuffer => slots += 2,
                _ => slots += 1,
            }
        }
        if slots != parser.num_args {
            return Err("num_args does not match the slots param_types actually produces");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_descriptors_pass_validation() {
        let all = [&IDENTIFY_PARSER, &SET_DIGITAL_OUT_PARSER, &GET_DIGITAL_IN_PARSER, &GET_UPTIME_PARSER];
        assert!(validate(&all).is_ok());
    }

    #[test]
    fn lookup_finds_registered_commands() {
        assert!(COMMAND_INDEX.lookup(0x01).is_some());
        assert!(COMMAND_INDEX.lookup(0x10).is_some());
        assert!(COMMAND_INDEX.lookup(0x11).is_some());
        assert!(COMMAND_INDEX.lookup(0x20).is_some());
    }

    #[test]
    fn lookup_rejects_unregistered_ids() {
        assert!(COMMAND_INDEX.lookup(0x02).is_none());
        assert!(COMMAND_INDEX.lookup(0xFF).is_none());
    }

    #[test]
    fn validate_rejects_inbound_string() {
        static BAD: CommandParser = CommandParser {
            cmd_id: 0x30,
            num_params: 1,
            num_args: 1,
            param_types: &[ParamType::String],
            flags: ParserFlags::NONE,
            func: handlers::get_uptime,
        };
        assert!(validate(&[&BAD]).is_err());
    }
}
