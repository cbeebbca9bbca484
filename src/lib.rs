//! Repairs broken ID3v2.3 tags in place.
//!
//! Three fixes are applied to the tag at the start of a file:
//!
//! * `APIC` frames whose MIME type was mangled to `"ima ge/..."` get the stray
//!   byte removed,
//! * optionally, later `APIC` frames repeating an already seen picture type
//!   are dropped,
//! * optionally, every frame of one type is dropped.
//!
//! The repair runs in two passes. [`plan_repair`] sizes the new tag without
//! writing; [`rewrite_tag`] then writes it. [`repair_file`] wraps both around a
//! backup-then-replace of the file on disk.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;

pub mod error;
pub mod id3;
pub mod repair;
mod utils;

pub use error::{RepairError, Result};
pub use id3::{FrameId, PictureType};
pub use repair::{plan_repair, rewrite_tag, FrameEvent, FrameEventKind, Plan, RewriteReport};

/// What to repair besides the `"ima ge"` MIME corruption
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairOptions {
    /// Drop `APIC` frames repeating a picture type already kept
    pub dedupe_apic: bool,
    /// Drop every frame with this identifier
    pub delete_frame_type: Option<FrameId>,
    /// Print one line per removed or repaired frame to stdout
    pub verbose: bool,
}

/// Result of [`repair_file`]
#[derive(Debug, Clone, Serialize)]
pub struct RepairOutcome {
    pub plan: Plan,
    /// Where the original file now lives, when it was rewritten
    pub backup: Option<PathBuf>,
    pub report: Option<RewriteReport>,
}

/// `<path>.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Run the planning pass on a file without modifying it
pub fn plan_file(path: &Path, options: &RepairOptions) -> Result<Plan> {
    let mut reader = BufReader::new(File::open(path)?);
    plan_repair(&mut reader, options)
}

/// Repair the tag of `path` in place.
///
/// The file is left untouched when planning fails or finds nothing to do.
/// Otherwise it is renamed to `<path>.bak` and the repaired copy is written
/// to `path`. If that write fails the partial output is removed and the
/// backup is the only copy left.
pub fn repair_file(path: &Path, options: &RepairOptions) -> Result<RepairOutcome> {
    let plan = plan_file(path, options)?;
    let new_size = match plan.new_size() {
        Some(size) => size,
        None => {
            debug!("{}: no repair needed", path.display());
            return Ok(RepairOutcome {
                plan,
                backup: None,
                report: None,
            });
        }
    };

    let backup = backup_path(path);
    fs::rename(path, &backup)?;
    info!("{}: original moved to {}", path.display(), backup.display());

    let report = replace_from_backup(path, &backup, new_size, options)?;

    Ok(RepairOutcome {
        plan,
        backup: Some(backup),
        report: Some(report),
    })
}

/// Write the repaired copy of `backup` to `path`, removing it again on failure
fn replace_from_backup(
    path: &Path,
    backup: &Path,
    new_size: u32,
    options: &RepairOptions,
) -> Result<RewriteReport> {
    write_repaired(path, backup, new_size, options).map_err(|e| {
        log::error!("{}: rewrite failed, original kept at {}", path.display(), backup.display());
        discard_partial(path);
        e
    })
}

fn write_repaired(
    path: &Path,
    backup: &Path,
    new_size: u32,
    options: &RepairOptions,
) -> Result<RewriteReport> {
    let mut reader = BufReader::new(File::open(backup)?);
    let mut writer = BufWriter::new(File::create(path)?);
    let label = path.to_string_lossy();
    let report = rewrite_tag(&mut reader, &mut writer, new_size, options, &label)?;

    let file = writer.into_inner().map_err(|e| RepairError::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(report)
}

fn discard_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("{}: partial output removed", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("{}: cannot remove partial output: {}", path.display(), e),
    }
}
