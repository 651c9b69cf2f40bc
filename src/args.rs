//! Inbound argument-vector parsing.
//!
//! Each command's payload is a packed sequence of VLQ integers and
//! length-prefixed buffers, described by its [`CommandParser`]'s
//! `param_types`. Parsing produces a flat `u32` argument vector: integer
//! types contribute one slot, `Buffer`/`ProgmemBuffer` contribute two
//! (length, then an offset into the frame's payload).

use crate::sched::Fault;
use crate::types::{CommandParser, ParamType};

/// Resolve a previously-parsed `Buffer`/`ProgmemBuffer` argument pair back
/// into a byte slice of the original payload.
pub fn buffer_arg<'a>(payload: &'a [u8], args: &[u32], slot: usize) -> &'a [u8] {
    let len = args[slot] as usize;
    let off = args[slot + 1] as usize;
    &payload[off..off + len]
}

/// Parse `descriptor.param_types` out of `payload` starting at `offset`,
/// filling `args_out` and returning the offset just past the last
/// parameter consumed.
pub fn parse_args(
    payload: &[u8],
    offset: usize,
    descriptor: &CommandParser,
    args_out: &mut [u32],
) -> Result<usize, Fault> {
    let end = payload.len();
    let mut p = offset;
    let mut slot = 0;
    for &ty in descriptor.param_types {
        if p > end {
            return Err(Fault::CommandParserError);
        }
        match ty {
            ParamType::U32 | ParamType::I32 | ParamType::U16 | ParamType::I16 | ParamType::Byte => {
                let (v, consumed) =
                    crate::vlq::parse_int(&payload[p..]).map_err(|_| Fault::CommandParserError)?;
                args_out[slot] = v as u32;
                slot += 1;
                p += consumed;
            }
            ParamType::Buffer | ParamType::ProgmemBuffer => {
                let len = *payload.get(p).ok_or(Fault::CommandParserError)? as usize;
                p += 1;
                if p + len > end {
                    return Err(Fault::CommandParserError);
                }
                args_out[slot] = len as u32;
                args_out[slot + 1] = p as u32;
                slot += 2;
                p += len;
            }
            ParamType::String => {
                // Outbound only: a command descriptor naming this tag is a
                // build-time mistake, caught by `registry::validate`.
                return Err(Fault::CommandParserError);
            }
        }
    }
    if p > end {
        return Err(Fault::CommandParserError);
    }
    Ok(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParserFlags;

    fn noop_handler(_ctx: &mut crate::dispatch::Context, _args: &[u32]) {}

    #[test]
    fn parses_two_integers() {
        let descriptor = CommandParser {
            cmd_id: 0x10,
            num_params: 2,
            num_args: 2,
            param_types: &[ParamType::U16, ParamType::Byte],
            flags: ParserFlags::NONE,
            func: noop_handler,
        };
        // pin=5, value=1, both single-byte VLQs.
        let payload = [0x10, 0x05, 0x01];
        let mut args = [0u32; 2];
        let p = parse_args(&payload, 1, &descriptor, &mut args).unwrap();
        assert_eq!(p, 3);
        assert_eq!(args, [5, 1]);
    }

    #[test]
    fn parses_a_buffer_argument() {
        let descriptor = CommandParser {
            cmd_id: 0x01,
            num_params: 1,
            num_args: 2,
            param_types: &[ParamType::Buffer],
            flags: ParserFlags::IN_SHUTDOWN,
            func: noop_handler,
        };
        let payload = [0x01, 0x03, b'a', b'b', b'c'];
        let mut args = [0u32; 2];
        let p = parse_args(&payload, 1, &descriptor, &mut args).unwrap();
        assert_eq!(p, 5);
        assert_eq!(buffer_arg(&payload, &args, 0), b"abc");
    }

    #[test]
    fn truncated_buffer_length_is_an_error() {
        let descriptor = CommandParser {
            cmd_id: 0x01,
            num_params: 1,
            num_args: 2,
            param_types: &[ParamType::Buffer],
            flags: ParserFlags::NONE,
            func: noop_handler,
        };
        let payload = [0x01, 0x05, b'a'];
        let mut args = [0u32; 2];
        assert_eq!(parse_args(&payload, 1, &descriptor, &mut args), Err(Fault::CommandParserError));
    }

    #[test]
    fn string_param_type_is_rejected_inbound() {
        let descriptor = CommandParser {
            cmd_id: 0x01,
            num_params: 1,
            num_args: 1,
            param_types: &[ParamType::String],
            flags: ParserFlags::NONE,
            func: noop_handler,
        };
        let payload = [0x01, 0x00];
        let mut args = [0u32; 1];
        assert_eq!(parse_args(&payload, 1, &descriptor, &mut args), Err(Fault::CommandParserError));
    }
}
