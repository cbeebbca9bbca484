// ID3v2.3 frame identifiers and the APIC payload inspector

use std::fmt;
use std::io::{Read, Seek};
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{RepairError, Result};
use crate::utils::io::{peek, read_array, read_u8};

/// Four-byte frame identifier such as `TIT2` or `APIC`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId([u8; 4]);

impl FrameId {
    pub const APIC: FrameId = FrameId(*b"APIC");

    pub const fn new(bytes: [u8; 4]) -> Self {
        FrameId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl FromStr for FrameId {
    type Err = RepairError;

    /// Accepts exactly four uppercase ASCII letters or digits
    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        let valid = bytes.len() == 4
            && bytes
                .iter()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        if !valid {
            return Err(RepairError::InvalidFrameId(s.to_string()));
        }
        Ok(FrameId([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl Serialize for FrameId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// APIC picture types (ID3v2.3 section 4.15)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PictureType {
    Other = 0,
    FileIcon = 1,
    OtherFileIcon = 2,
    CoverFront = 3,
    CoverBack = 4,
    LeafletPage = 5,
    Media = 6,
    LeadArtist = 7,
    Artist = 8,
    Conductor = 9,
    Band = 10,
    Composer = 11,
    Lyricist = 12,
    RecordingLocation = 13,
    DuringRecording = 14,
    DuringPerformance = 15,
    VideoScreenCapture = 16,
    BrightColouredFish = 17,
    Illustration = 18,
    BandLogo = 19,
    PublisherLogo = 20,
}

impl PictureType {
    /// Number of defined picture types; codes at or above this are undefined
    pub const COUNT: u8 = 21;
}

impl TryFrom<u8> for PictureType {
    type Error = RepairError;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => PictureType::Other,
            1 => PictureType::FileIcon,
            2 => PictureType::OtherFileIcon,
            3 => PictureType::CoverFront,
            4 => PictureType::CoverBack,
            5 => PictureType::LeafletPage,
            6 => PictureType::Media,
            7 => PictureType::LeadArtist,
            8 => PictureType::Artist,
            9 => PictureType::Conductor,
            10 => PictureType::Band,
            11 => PictureType::Composer,
            12 => PictureType::Lyricist,
            13 => PictureType::RecordingLocation,
            14 => PictureType::DuringRecording,
            15 => PictureType::DuringPerformance,
            16 => PictureType::VideoScreenCapture,
            17 => PictureType::BrightColouredFish,
            18 => PictureType::Illustration,
            19 => PictureType::BandLogo,
            20 => PictureType::PublisherLogo,
            _ => return Err(RepairError::UndefinedPictureType(value)),
        })
    }
}

/// Room reserved for the MIME string, terminator included
pub const MIMETYPE_MAXSIZE: usize = 64;

/// Bytes read before the corruption check: `"ima"` plus the suspect separator
const MIME_HEAD_LEN: usize = 4;

/// Offset of the injected separator inside the MIME string
pub const MIME_SEPARATOR_INDEX: usize = 3;

/// Result of looking at an APIC MIME string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeStatus {
    Ok,
    /// `"ima ge/..."`: one stray byte sits after `"ima"`
    Corrupted,
    /// No terminator within `MIMETYPE_MAXSIZE`
    Malformed,
}

/// Whether `byte` can be the stray byte of the `"ima ge"` corruption
pub fn is_mime_separator(byte: u8) -> bool {
    byte == 0x00 || byte == b' '
}

/// Consume the remainder of a MIME string after its first four bytes.
///
/// Returns `false` when no terminator shows up within the size bound.
fn skip_mime_tail<R: Read>(reader: &mut R) -> Result<bool> {
    for _ in MIME_HEAD_LEN..MIMETYPE_MAXSIZE {
        if read_u8(reader, "APIC MIME type")? == 0 {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Read the picture type of the APIC payload starting at the cursor.
///
/// The cursor is left where it was, on success and on error.
pub fn peek_picture_type<R: Read + Seek>(reader: &mut R) -> Result<PictureType> {
    peek(reader, |r| {
        let offset = r.stream_position()?;
        let _encoding = read_u8(r, "APIC text encoding")?;
        // the first four bytes may hold the injected separator, so never stop there
        let _head: [u8; MIME_HEAD_LEN] = read_array(r, "APIC MIME type")?;
        if !skip_mime_tail(r)? {
            return Err(mime_too_long(offset));
        }
        PictureType::try_from(read_u8(r, "APIC picture type")?)
    })
}

/// Check the APIC MIME string for the `"ima ge"` corruption.
///
/// Only the byte at [`MIME_SEPARATOR_INDEX`] is inspected; the surrounding
/// `"ima"`/`"ge"` characters are not verified. The cursor is left where it was.
pub fn classify_mime<R: Read + Seek>(reader: &mut R) -> Result<MimeStatus> {
    peek(reader, |r| {
        let _encoding = read_u8(r, "APIC text encoding")?;
        let head: [u8; MIME_HEAD_LEN] = read_array(r, "APIC MIME type")?;

        if is_mime_separator(head[MIME_SEPARATOR_INDEX]) {
            return Ok(MimeStatus::Corrupted);
        }

        if skip_mime_tail(r)? {
            Ok(MimeStatus::Ok)
        } else {
            Ok(MimeStatus::Malformed)
        }
    })
}

pub(crate) fn mime_too_long(offset: u64) -> RepairError {
    RepairError::MalformedFrame {
        offset,
        reason: format!("APIC MIME type exceeds {} bytes", MIMETYPE_MAXSIZE - 1),
    }
}
