//! Outbound message encoding.
//!
//! Builds one complete frame — `LEN SEQ [MSG_ID PARAMS...] CRC SYNC` — into
//! the console's output reservation and commits it. Replaces the original
//! variadic `sendf(fmt, ...)` call with a typed [`Arg`] slice matched
//! positionally against the encoder descriptor's `param_types`.

use crate::console::Console;
use crate::sched::Fault;
use crate::types::{CommandEncoder, ParamType};
use crate::vlq::encode_int;

const HEADER: usize = 2; // LEN, SEQ
const TRAILER: usize = 3; // CRC(2), SYNC(1)
const SYNC_BYTE: u8 = 0x7E;

/// One positional argument to an outbound message, tagged by the same
/// shape the wire format uses.
pub enum Arg<'a> {
    /// `ParamType::U32`.
    U32(u32),
    /// `ParamType::I32`.
    I32(i32),
    /// `ParamType::U16`.
    U16(u16),
    /// `ParamType::I16`.
    I16(i16),
    /// `ParamType::Byte`.
    Byte(u8),
    /// `ParamType::String`.
    Str(&'a str),
    /// `ParamType::Buffer`.
    Buffer(&'a [u8]),
    /// `ParamType::ProgmemBuffer`.
    ProgmemBuffer(&'a [u8]),
}

/// What happened to an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The message was written and committed.
    Sent,
    /// The console's output buffer had no room; the message was dropped.
    Dropped,
}

/// Encode `args` per `encoder.param_types` and commit the resulting frame
/// to `console`, stamped with `next_sequence`.
pub fn encode_message<C: Console + ?Sized>(
    console: &mut C,
    next_sequence: u8,
    encoder: &CommandEncoder,
    args: &[Arg],
) -> Result<SendOutcome, Fault> {
    let max_size = encoder.max_size as usize;
    let reserve_len = max_size + HEADER + TRAILER;
    let buf = match console.output_reserve(reserve_len) {
        Some(b) => b,
        None => {
            defmt::warn!("output buffer full, dropping message");
            return Ok(SendOutcome::Dropped);
        }
    };

    let mut p = HEADER;
    if max_size > 0 {
        if args.len() != encoder.param_types.len() || args.len() != encoder.num_params as usize {
            return Err(Fault::MessageEncodeError);
        }
        let maxend = HEADER + 1 + max_size;
        buf[p] = encoder.msg_id;
        p += 1;
        for (ty, arg) in encoder.param_types.iter().zip(args) {
            if p > maxend {
                return Err(Fault::MessageEncodeError);
            }
            p = encode_one(buf, p, maxend, *ty, arg)?;
        }
    }

    let msglen = p + TRAILER;
    buf[0] = msglen as u8;
    buf[1] = next_sequence;
    let crc = crate::crc::crc16_ccitt(&buf[..p]);
    buf[p] = (crc >> 8) as u8;
    buf[p + 1] = (crc & 0xff) as u8;
    buf[p + 2] = SYNC_BYTE;
    console.output_commit(msglen);
    Ok(SendOutcome::Sent)
}

fn encode_one(buf: &mut [u8], p: usize, maxend: usize, ty: ParamType, arg: &Arg) -> Result<usize, Fault> {
    match (ty, arg) {
        (ParamType::U32, Arg::U32(v)) => write_vlq(buf, p, *v as i32, maxend),
        (ParamType::I32, Arg::I32(v)) => write_vlq(buf, p, *v, maxend),
        (ParamType::U16, Arg::U16(v)) => write_vlq(buf, p, (*v as i32) & 0xffff, maxend),
        (ParamType::I16, Arg::I16(v)) => write_vlq(buf, p, (*v as i32) & 0xffff, maxend),
        (ParamType::Byte, Arg::Byte(v)) => write_vlq(buf, p, (*v as i32) & 0xffff, maxend),
        (ParamType::String, Arg::Str(s)) => write_string(buf, p, maxend, s.as_bytes()),
        (ParamType::Buffer, Arg::Buffer(data)) | (ParamType::ProgmemBuffer, Arg::ProgmemBuffer(data)) => {
            write_buffer(buf, p, maxend, data)
        }
        _ => Err(Fault::MessageEncodeError),
    }
}

fn write_vlq(buf: &mut [u8], p: usize, v: i32, maxend: usize) -> Result<usize, Fault> {
    let encoded = encode_int(v);
    let end = p + encoded.len();
    if end > maxend {
        return Err(Fault::MessageEncodeError);
    }
    buf[p..end].copy_from_slice(&encoded);
    Ok(end)
}

fn write_string(buf: &mut [u8], p: usize, maxend: usize, bytes: &[u8]) -> Result<usize, Fault> {
    if p >= maxend {
        return Err(Fault::MessageEncodeError);
    }
    let lenp = p;
    let mut cursor = p + 1;
    let mut n = 0usize;
    while n < bytes.len() && cursor < maxend {
        buf[cursor] = bytes[n];
        cursor += 1;
        n += 1;
    }
    buf[lenp] = n as u8;
    Ok(cursor)
}

fn write_buffer(buf: &mut [u8], p: usize, maxend: usize, data: &[u8]) -> Result<usize, Fault> {
    if p >= maxend {
        return Err(Fault::MessageEncodeError);
    }
    let lenp = p;
    let cursor = p + 1;
    let avail = maxend - cursor;
    let n = data.len().min(avail);
    buf[lenp] = n as u8;
    buf[cursor..cursor + n].copy_from_slice(&data[..n]);
    Ok(cursor + n)
}
