// Dry-run pass: compute the tag size the rewrite will produce

use std::io::{Read, Seek};

use log::debug;
use serde::Serialize;

use crate::error::{RepairError, Result};
use crate::id3::v2::advance_past_frame;
use crate::id3::FrameHeader;
use crate::repair::policy::{FrameAction, FramePolicy};
use crate::repair::{shrink, TagPrelude};
use crate::RepairOptions;

/// Outcome of the planning pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Plan {
    /// Nothing to repair, the file must be left alone
    Unchanged { size: u32 },
    /// The tag shrinks from `original_size` to `new_size`
    Resize { original_size: u32, new_size: u32 },
}

impl Plan {
    /// Size to hand to the rewriter, `None` when no rewrite is needed
    pub fn new_size(&self) -> Option<u32> {
        match self {
            Plan::Unchanged { .. } => None,
            Plan::Resize { new_size, .. } => Some(*new_size),
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Plan::Unchanged { .. })
    }
}

/// Walk every frame once without writing anything and work out the new tag size.
///
/// `reader` must be positioned at the start of the tag. Errors abort the whole
/// repair; a file that fails planning must not be rewritten.
pub fn plan_repair<R: Read + Seek>(reader: &mut R, options: &RepairOptions) -> Result<Plan> {
    let prelude = TagPrelude::read(reader)?;
    let original_size = prelude.header.size;

    let mut policy = FramePolicy::new(options);
    let mut running = original_size as u64;

    while reader.stream_position()? < prelude.frames_end {
        let header = FrameHeader::read(reader)?;
        let action = policy.classify(&header, reader)?;
        if action == FrameAction::Padding {
            break;
        }

        running = shrink(running, action.reclaimed(&header))?;
        advance_past_frame(reader, header.size)?;
    }

    let new_size = u32::try_from(running)
        .map_err(|_| RepairError::MalformedHeader(format!("tag size {} out of range", running)))?;

    debug!("planned tag size {} -> {}", original_size, new_size);

    if new_size == original_size {
        Ok(Plan::Unchanged {
            size: original_size,
        })
    } else {
        Ok(Plan::Resize {
            original_size,
            new_size,
        })
    }
}
