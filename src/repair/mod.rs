// Two-pass tag repair: size the result first, then rewrite it
//
// The planner and the rewriter walk the same frames with the same
// `FramePolicy`, so the size written in the new header is the size the
// rewriter ends up producing.

pub mod planner;
pub mod policy;
pub mod rewriter;

pub use planner::{plan_repair, Plan};
pub use policy::{FrameAction, FramePolicy};
pub use rewriter::{rewrite_tag, FrameEvent, FrameEventKind, RewriteReport};

use std::io::{Read, Seek};

use log::{debug, warn};

use crate::error::{RepairError, Result};
use crate::id3::{ExtendedHeader, TagHeader};

/// Everything in front of the first frame
#[derive(Debug, Clone)]
pub(crate) struct TagPrelude {
    pub header: TagHeader,
    pub extended: Option<ExtendedHeader>,
    /// Absolute offset where frame data ends and the padding region begins
    pub frames_end: u64,
}

impl TagPrelude {
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let start = reader.stream_position()?;

        let header = TagHeader::read(reader)?;
        header.validate()?;
        if header.is_unsynchronised() {
            warn!("tag is unsynchronised; frames are processed as stored");
        }

        let extended = if header.has_extended_header() {
            Some(ExtendedHeader::read(reader)?)
        } else {
            None
        };

        let padding = extended.as_ref().map_or(0, |ext| ext.padding_size);
        let data_len = header.size.checked_sub(padding).ok_or_else(|| {
            RepairError::MalformedHeader(format!(
                "padding size {} exceeds tag size {}",
                padding, header.size
            ))
        })?;
        let frames_end = start + TagHeader::SIZE as u64 + data_len as u64;

        debug!(
            "ID3v2.{}.{} tag: size={} extended={} frames end at {:#010X}",
            header.version.0,
            header.version.1,
            header.size,
            extended.is_some(),
            frames_end
        );

        Ok(TagPrelude {
            header,
            extended,
            frames_end,
        })
    }
}

/// Take `reclaimed` bytes off the running tag size
pub(crate) fn shrink(running: u64, reclaimed: u64) -> Result<u64> {
    running.checked_sub(reclaimed).ok_or_else(|| {
        RepairError::MalformedHeader("frames exceed the declared tag size".to_string())
    })
}
