// ID3v2.3 structural decoder and encoder

use std::io::{Read, Write};

use crate::error::{RepairError, Result};
use crate::id3::frames::FrameId;
use crate::utils::io::{
    decode_be32, encode_be32, encode_synchsafe, read_array, read_be_u32, read_synchsafe_u32,
    skip_exact,
};

/// ID3v2 header structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagHeader {
    pub id: [u8; 3],
    pub version: (u8, u8),
    pub flags: u8,
    /// Bytes following the 10-byte header: extended header, frames and padding
    pub size: u32,
}

impl TagHeader {
    pub const SIZE: usize = 10;
    const ID: [u8; 3] = [b'I', b'D', b'3'];
    const SUPPORTED_MAJOR: u8 = 3;

    pub const FLAG_UNSYNCHRONISATION: u8 = 0x80;
    pub const FLAG_EXTENDED_HEADER: u8 = 0x40;
    pub const FLAG_EXPERIMENTAL: u8 = 0x20;

    /// Read ID3v2 header from reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let buffer: [u8; 6] = read_array(reader, "tag header")?;
        let size = read_synchsafe_u32(reader, "tag header")?;

        Ok(TagHeader {
            id: [buffer[0], buffer[1], buffer[2]],
            version: (buffer[3], buffer[4]),
            flags: buffer[5],
            size,
        })
    }

    /// Reject anything that is not an ID3v2.3 tag
    pub fn validate(&self) -> Result<()> {
        if self.id != Self::ID {
            return Err(RepairError::UnsupportedFormat(
                "no ID3v2 tag at start of input".to_string(),
            ));
        }
        if self.version.0 != Self::SUPPORTED_MAJOR {
            return Err(RepairError::UnsupportedFormat(format!(
                "ID3v2.{}.{} (only ID3v2.3 is handled)",
                self.version.0, self.version.1
            )));
        }
        Ok(())
    }

    pub fn has_extended_header(&self) -> bool {
        self.flags & Self::FLAG_EXTENDED_HEADER != 0
    }

    pub fn is_unsynchronised(&self) -> bool {
        self.flags & Self::FLAG_UNSYNCHRONISATION != 0
    }

    /// Copy of this header declaring a different size
    pub fn with_size(&self, size: u32) -> Self {
        TagHeader { size, ..self.clone() }
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buffer = [0u8; Self::SIZE];
        buffer[0..3].copy_from_slice(&self.id);
        buffer[3] = self.version.0;
        buffer[4] = self.version.1;
        buffer[5] = self.flags;
        buffer[6..10].copy_from_slice(&encode_synchsafe(self.size)?);
        writer.write_all(&buffer)?;
        Ok(())
    }
}

/// ID3v2.3 extended header
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtendedHeader {
    pub size: u32,
    pub flags: [u8; 2],
    pub padding_size: u32,
}

impl ExtendedHeader {
    pub const SIZE: usize = 10;
    pub const FLAG_CRC: u8 = 0x80;

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let size = read_be_u32(reader, "extended header")?;
        let flags: [u8; 2] = read_array(reader, "extended header")?;
        let padding_size = read_be_u32(reader, "extended header")?;

        if flags[0] & Self::FLAG_CRC != 0 {
            return Err(RepairError::UnsupportedCrc);
        }

        Ok(ExtendedHeader {
            size,
            flags,
            padding_size,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&encode_be32(self.size))?;
        writer.write_all(&self.flags)?;
        writer.write_all(&encode_be32(self.padding_size))?;
        Ok(())
    }
}

const FRAME_HEADER_LEN: usize = 10;

/// ID3v2.3 frame header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub id: FrameId,
    /// Payload length, excluding this 10-byte header
    pub size: u32,
    pub flags: [u8; 2],
    raw: [u8; FRAME_HEADER_LEN],
}

impl FrameHeader {
    pub const SIZE: usize = FRAME_HEADER_LEN;

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let raw: [u8; Self::SIZE] = read_array(reader, "frame header")?;

        Ok(FrameHeader {
            id: FrameId::new([raw[0], raw[1], raw[2], raw[3]]),
            size: decode_be32([raw[4], raw[5], raw[6], raw[7]]),
            flags: [raw[8], raw[9]],
            raw,
        })
    }

    pub fn new(id: FrameId, size: u32, flags: [u8; 2]) -> Self {
        let mut raw = [0u8; Self::SIZE];
        raw[0..4].copy_from_slice(id.as_bytes());
        raw[4..8].copy_from_slice(&encode_be32(size));
        raw[8..10].copy_from_slice(&flags);
        FrameHeader {
            id,
            size,
            flags,
            raw,
        }
    }

    /// A zero first identifier byte means we walked into the padding region
    pub fn is_padding(&self) -> bool {
        self.id.as_bytes()[0] == 0
    }

    /// The 10 bytes exactly as they were read
    pub fn raw(&self) -> &[u8; Self::SIZE] {
        &self.raw
    }

    /// Bytes this frame occupies in the tag, header included
    pub fn total_size(&self) -> u64 {
        Self::SIZE as u64 + self.size as u64
    }

    /// Write this header with a different payload size
    pub fn write_with_size<W: Write>(&self, writer: &mut W, size: u32) -> Result<()> {
        writer.write_all(self.id.as_bytes())?;
        writer.write_all(&encode_be32(size))?;
        writer.write_all(&self.flags)?;
        Ok(())
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.write_with_size(writer, self.size)
    }
}

/// Move past a frame payload without looking at it
pub fn advance_past_frame<R: Read>(reader: &mut R, size: u32) -> Result<()> {
    skip_exact(reader, size as u64, "frame payload")
}
