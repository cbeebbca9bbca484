// I/O utilities for walking and copying tag bytes

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::error::{RepairError, Result};

/// Largest value a 4-byte synchsafe integer can hold (28 bits).
pub const SYNCHSAFE_MAX: u32 = 0x0FFF_FFFF;

/// Decode a synchsafe integer (7 bits per byte, most significant byte first)
pub fn decode_synchsafe(bytes: [u8; 4]) -> u32 {
    ((bytes[0] as u32 & 0x7F) << 21)
        | ((bytes[1] as u32 & 0x7F) << 14)
        | ((bytes[2] as u32 & 0x7F) << 7)
        | (bytes[3] as u32 & 0x7F)
}

/// Encode a value as a synchsafe integer.
///
/// Values that need more than 28 bits are rejected instead of being truncated.
pub fn encode_synchsafe(value: u32) -> Result<[u8; 4]> {
    if value > SYNCHSAFE_MAX {
        return Err(RepairError::SizeOverflow(value));
    }
    Ok([
        ((value >> 21) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        (value & 0x7F) as u8,
    ])
}

pub fn decode_be32(bytes: [u8; 4]) -> u32 {
    u32::from_be_bytes(bytes)
}

pub fn encode_be32(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

/// Read exactly `N` bytes, reporting a short read as truncated input
pub fn read_array<R: Read, const N: usize>(reader: &mut R, what: &'static str) -> Result<[u8; N]> {
    let mut buffer = [0u8; N];
    reader.read_exact(&mut buffer).map_err(|e| truncated(e, what))?;
    Ok(buffer)
}

pub fn read_u8<R: Read>(reader: &mut R, what: &'static str) -> Result<u8> {
    let [byte] = read_array::<R, 1>(reader, what)?;
    Ok(byte)
}

/// Read big-endian 32-bit integer
pub fn read_be_u32<R: Read>(reader: &mut R, what: &'static str) -> Result<u32> {
    Ok(decode_be32(read_array(reader, what)?))
}

/// Read synchsafe 32-bit integer (7 bits per byte)
pub fn read_synchsafe_u32<R: Read>(reader: &mut R, what: &'static str) -> Result<u32> {
    Ok(decode_synchsafe(read_array(reader, what)?))
}

/// Consume exactly `n` bytes without keeping them
pub fn skip_exact<R: Read>(reader: &mut R, n: u64, what: &'static str) -> Result<()> {
    copy_exact(reader, &mut io::sink(), n, what)
}

/// Copy exactly `n` bytes from `reader` to `writer`
pub fn copy_exact<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    n: u64,
    what: &'static str,
) -> Result<()> {
    let copied = io::copy(&mut reader.by_ref().take(n), writer)?;
    if copied != n {
        return Err(RepairError::TruncatedInput(what));
    }
    Ok(())
}

/// Copy everything left in `reader`, returning the byte count
pub fn copy_remaining<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> Result<u64> {
    Ok(io::copy(reader, writer)?)
}

/// Run `f` and seek back to the starting position afterwards, whatever `f` returned.
///
/// A failed restore wins over the closure's own result: the caller can no
/// longer trust the cursor in that case.
pub fn peek<R, T, F>(reader: &mut R, f: F) -> Result<T>
where
    R: Read + Seek,
    F: FnOnce(&mut R) -> Result<T>,
{
    let pos = reader.stream_position()?;
    let result = f(reader);
    reader.seek(SeekFrom::Start(pos))?;
    result
}

fn truncated(e: io::Error, what: &'static str) -> RepairError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        RepairError::TruncatedInput(what)
    } else {
        RepairError::Io(e)
    }
}
