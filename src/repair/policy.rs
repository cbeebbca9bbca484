// Per-frame repair decision shared by the planning and rewriting passes

use std::collections::HashSet;
use std::io::{Read, Seek};

use log::debug;

use crate::error::{RepairError, Result};
use crate::id3::frames::{self, classify_mime, peek_picture_type};
use crate::id3::{FrameHeader, FrameId, MimeStatus, PictureType};
use crate::RepairOptions;

/// Encoding byte, `"ima"` and the separator must all lie inside the payload
pub const REPAIR_MIN_PAYLOAD: u64 = 5;

/// What a pass does with one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    /// Padding signal, iteration ends
    Padding,
    /// Frame type selected for deletion
    Delete,
    /// APIC with a picture type that was already kept
    DropDuplicate(PictureType),
    /// APIC whose MIME type reads `"ima ge/..."`
    RepairMime,
    Keep,
}

impl FrameAction {
    /// Bytes this action removes from the tag
    pub fn reclaimed(&self, header: &FrameHeader) -> u64 {
        match self {
            FrameAction::Delete | FrameAction::DropDuplicate(_) => header.total_size(),
            FrameAction::RepairMime => 1,
            FrameAction::Padding | FrameAction::Keep => 0,
        }
    }
}

/// Decides the fate of each frame.
///
/// Each pass owns its own policy so the dedupe bookkeeping starts empty and
/// both passes reach the same decision for the same frame.
#[derive(Debug)]
pub struct FramePolicy<'a> {
    options: &'a RepairOptions,
    seen: HashSet<PictureType>,
}

impl<'a> FramePolicy<'a> {
    pub fn new(options: &'a RepairOptions) -> Self {
        FramePolicy {
            options,
            seen: HashSet::new(),
        }
    }

    /// Classify the frame whose header was just read; `reader` sits at its payload.
    ///
    /// The payload is only peeked at, the cursor is unchanged on return.
    pub fn classify<R: Read + Seek>(
        &mut self,
        header: &FrameHeader,
        reader: &mut R,
    ) -> Result<FrameAction> {
        if header.is_padding() {
            return Ok(FrameAction::Padding);
        }

        if self.options.delete_frame_type == Some(header.id) {
            debug!("{}: selected for deletion", header.id);
            return Ok(FrameAction::Delete);
        }

        if header.id != FrameId::APIC {
            return Ok(FrameAction::Keep);
        }

        if self.options.dedupe_apic {
            let picture_type = peek_picture_type(reader)?;
            if !self.seen.insert(picture_type) {
                debug!("APIC: duplicate picture type {:?}", picture_type);
                return Ok(FrameAction::DropDuplicate(picture_type));
            }
        }

        match classify_mime(reader)? {
            MimeStatus::Ok => Ok(FrameAction::Keep),
            MimeStatus::Corrupted if (header.size as u64) < REPAIR_MIN_PAYLOAD => {
                Err(RepairError::MalformedFrame {
                    offset: reader.stream_position()?,
                    reason: format!("APIC payload of {} bytes is too short to repair", header.size),
                })
            }
            MimeStatus::Corrupted => {
                debug!("APIC: MIME type needs repair");
                Ok(FrameAction::RepairMime)
            }
            MimeStatus::Malformed => Err(frames::mime_too_long(reader.stream_position()?)),
        }
    }
}
