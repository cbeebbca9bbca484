// Second pass: write the repaired tag followed by the untouched remainder

use std::io::{self, Read, Seek, Write};

use log::debug;
use serde::Serialize;

use crate::error::{RepairError, Result};
use crate::id3::frames::is_mime_separator;
use crate::id3::v2::advance_past_frame;
use crate::id3::{FrameHeader, FrameId};
use crate::repair::policy::{FrameAction, FramePolicy};
use crate::repair::{shrink, TagPrelude};
use crate::utils::io::{copy_exact, copy_remaining, read_u8};
use crate::RepairOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameEventKind {
    Deleted,
    DuplicateRemoved,
    MimeRepaired,
}

/// A frame the rewrite removed or changed, with its span in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameEvent {
    pub kind: FrameEventKind,
    pub frame_id: FrameId,
    /// Offset of the frame header
    pub start: u64,
    /// Offset just past the frame payload
    pub end: u64,
}

impl FrameEvent {
    /// One line of verbose output, `label` is usually the file name
    pub fn describe(&self, label: &str) -> String {
        match self.kind {
            FrameEventKind::Deleted | FrameEventKind::DuplicateRemoved => format!(
                "{} : delete frame ({}) {:08X} - {:08X}",
                label, self.frame_id, self.start, self.end
            ),
            FrameEventKind::MimeRepaired => format!(
                "{} : repair APIC frame (ima ge->image) {:08X} - {:08X}",
                label, self.start, self.end
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteReport {
    pub original_size: u32,
    pub new_size: u32,
    pub events: Vec<FrameEvent>,
    /// Padding and media data copied after the last frame
    pub trailing_bytes: u64,
}

/// Rewrite the tag at the reader's position into `writer`.
///
/// `new_size` is the size computed by [`plan_repair`](crate::repair::plan_repair)
/// for the same input and options. Frame iteration is bounded by the size in
/// the source header; everything after the frames is copied verbatim.
/// With `options.verbose` one line per changed frame goes to stdout.
pub fn rewrite_tag<R, W>(
    reader: &mut R,
    writer: &mut W,
    new_size: u32,
    options: &RepairOptions,
    label: &str,
) -> Result<RewriteReport>
where
    R: Read + Seek,
    W: Write,
{
    rewrite_tag_with_log(reader, writer, new_size, options, label, &mut io::stdout())
}

/// [`rewrite_tag`] with the verbose lines sent to `log_out`
pub(crate) fn rewrite_tag_with_log<R, W, L>(
    reader: &mut R,
    writer: &mut W,
    new_size: u32,
    options: &RepairOptions,
    label: &str,
    log_out: &mut L,
) -> Result<RewriteReport>
where
    R: Read + Seek,
    W: Write,
    L: Write,
{
    let prelude = TagPrelude::read(reader)?;
    prelude.header.with_size(new_size).write(writer)?;
    if let Some(extended) = &prelude.extended {
        extended.write(writer)?;
    }

    let mut report = RewriteReport {
        original_size: prelude.header.size,
        new_size,
        ..RewriteReport::default()
    };
    let mut policy = FramePolicy::new(options);
    let mut running = prelude.header.size as u64;

    while reader.stream_position()? < prelude.frames_end {
        let start = reader.stream_position()?;
        let header = FrameHeader::read(reader)?;
        let action = policy.classify(&header, reader)?;
        running = shrink(running, action.reclaimed(&header))?;

        let kind = match action {
            FrameAction::Padding => {
                writer.write_all(header.raw())?;
                report.trailing_bytes += FrameHeader::SIZE as u64;
                break;
            }
            FrameAction::Keep => {
                header.write(writer)?;
                copy_exact(reader, writer, header.size as u64, "frame payload")?;
                continue;
            }
            FrameAction::Delete => {
                advance_past_frame(reader, header.size)?;
                FrameEventKind::Deleted
            }
            FrameAction::DropDuplicate(_) => {
                advance_past_frame(reader, header.size)?;
                FrameEventKind::DuplicateRemoved
            }
            FrameAction::RepairMime => {
                repair_mime_frame(&header, reader, writer)?;
                FrameEventKind::MimeRepaired
            }
        };

        let event = FrameEvent {
            kind,
            frame_id: header.id,
            start,
            end: start + header.total_size(),
        };
        debug!("{}", event.describe(label));
        if options.verbose {
            writeln!(log_out, "{}", event.describe(label))?;
        }
        report.events.push(event);
    }

    report.trailing_bytes += copy_remaining(reader, writer)?;
    writer.flush()?;

    debug!(
        "rewrote tag {} -> {} ({} frames changed, {} trailing bytes)",
        report.original_size,
        report.new_size,
        report.events.len(),
        report.trailing_bytes
    );

    if running != new_size as u64 {
        return Err(RepairError::InconsistentSize {
            expected: new_size,
            actual: running as u32,
        });
    }

    Ok(report)
}

/// Write an APIC frame with the stray MIME byte dropped
fn repair_mime_frame<R, W>(header: &FrameHeader, reader: &mut R, writer: &mut W) -> Result<()>
where
    R: Read + Seek,
    W: Write,
{
    header.write_with_size(writer, header.size - 1)?;

    // encoding byte and "ima"
    copy_exact(reader, writer, 4, "APIC payload")?;

    let offset = reader.stream_position()?;
    let found = read_u8(reader, "APIC payload")?;
    if !is_mime_separator(found) {
        return Err(RepairError::RepairAssumptionViolated { offset, found });
    }

    copy_exact(reader, writer, header.size as u64 - 5, "APIC payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::plan_repair;
    use std::io::Cursor;

    fn frame(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut bytes = id.to_vec();
        bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&[0, 0]);
        bytes.extend_from_slice(payload);
        bytes
    }

    fn tag_with_size(size: u32, frames: &[Vec<u8>], padding: usize) -> Vec<u8> {
        let mut bytes = b"ID3\x03\x00\x00".to_vec();
        bytes.extend_from_slice(&crate::utils::io::encode_synchsafe(size).unwrap());
        for f in frames {
            bytes.extend_from_slice(f);
        }
        bytes.extend(std::iter::repeat(0u8).take(padding));
        bytes
    }

    fn rewrite(data: &[u8], options: &RepairOptions) -> (Vec<u8>, RewriteReport) {
        let plan = plan_repair(&mut Cursor::new(data.to_vec()), options).unwrap();
        let new_size = plan.new_size().expect("repair expected");
        let mut out = Vec::new();
        let report =
            rewrite_tag(&mut Cursor::new(data.to_vec()), &mut out, new_size, options, "test.mp3").unwrap();
        (out, report)
    }

    #[test]
    fn repairs_ima_ge_mime() {
        let mut payload = b"\x00ima ge/jpeg\x00\x03".to_vec();
        payload.resize(30, 0x5A);
        let data = tag_with_size(100, &[frame(b"APIC", &payload)], 60);

        let (out, report) = rewrite(&data, &RepairOptions::default());

        let mut expected_payload = b"\x00image/jpeg\x00\x03".to_vec();
        expected_payload.resize(29, 0x5A);
        let expected = tag_with_size(99, &[frame(b"APIC", &expected_payload)], 60);
        assert_eq!(out, expected);
        assert_eq!(&out[6..10], &[0, 0, 0, 99]);
        assert_eq!(&out[14..18], &[0, 0, 0, 29]);

        assert_eq!(report.new_size, 99);
        assert_eq!(report.trailing_bytes, 60);
        assert_eq!(
            report.events,
            vec![FrameEvent {
                kind: FrameEventKind::MimeRepaired,
                frame_id: FrameId::APIC,
                start: 10,
                end: 50,
            }]
        );
    }

    #[test]
    fn deletes_every_frame_of_a_type() {
        let title = frame(b"TIT2", b"\x00Abcd");
        let mut payload = b"\x00image/png\x00\x03".to_vec();
        payload.resize(30, 0x11);
        let apic = frame(b"APIC", &payload);
        let frames = [title.clone(), apic.clone(), title];
        let data = tag_with_size(15 + 40 + 15 + 20, &frames, 20);

        let options = RepairOptions {
            delete_frame_type: Some("TIT2".parse().unwrap()),
            ..RepairOptions::default()
        };
        let (out, report) = rewrite(&data, &options);

        assert_eq!(out, tag_with_size(90 - 2 * 15, &[apic], 20));
        let spans: Vec<_> = report.events.iter().map(|e| (e.start, e.end)).collect();
        assert_eq!(spans, vec![(10, 25), (65, 80)]);
        assert_eq!(
            report.events[0].describe("song.mp3"),
            "song.mp3 : delete frame (TIT2) 0000000A - 00000019"
        );
    }

    #[test]
    fn keeps_first_picture_of_each_type() {
        let front = frame(b"APIC", b"\x00image/jpeg\x00\x03\x00AAAA");
        let back = frame(b"APIC", b"\x00image/jpeg\x00\x04\x00BBBB");
        let front_again = frame(b"APIC", b"\x00image/png\x00\x03\x00CCCC");
        let frames = [front.clone(), front_again, back.clone()];
        let size = frames.iter().map(|f| f.len() as u32).sum::<u32>() + 12;
        let data = tag_with_size(size, &frames, 12);

        let options = RepairOptions {
            dedupe_apic: true,
            ..RepairOptions::default()
        };
        let (out, report) = rewrite(&data, &options);

        let kept_size = (front.len() + back.len()) as u32 + 12;
        assert_eq!(out, tag_with_size(kept_size, &[front, back], 12));
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].kind, FrameEventKind::DuplicateRemoved);
    }

    #[test]
    fn copies_extended_header_and_trailing_data() {
        let mut data = b"ID3\x03\x00\x40".to_vec();
        let apic = frame(b"APIC", b"\x00ima\x00ge/gif\x00\x00\x00xyz");
        let size = 10 + apic.len() as u32 + 16;
        data.extend_from_slice(&crate::utils::io::encode_synchsafe(size).unwrap());
        data.extend_from_slice(&[0, 0, 0, 6, 0, 0, 0, 0, 0, 16]);
        data.extend_from_slice(&apic);
        data.extend(std::iter::repeat(0u8).take(16));
        data.extend_from_slice(b"\xFF\xFBaudio-frames");

        let (out, report) = rewrite(&data, &RepairOptions::default());

        assert_eq!(&out[10..20], &data[10..20]);
        assert_eq!(&out[20..24], b"APIC");
        assert_eq!(&out[30..41], b"\x00image/gif\x00");
        assert!(out.ends_with(b"\xFF\xFBaudio-frames"));
        assert_eq!(out.len(), data.len() - 1);
        assert_eq!(report.trailing_bytes, 16 + 14);
    }

    #[test]
    fn rejects_unexpected_separator() {
        let header = FrameHeader::new(FrameId::APIC, 13, [0, 0]);
        let mut reader = Cursor::new(b"\x00ima!ge/png\x00\x03".to_vec());
        assert!(matches!(
            repair_mime_frame(&header, &mut reader, &mut Vec::new()),
            Err(RepairError::RepairAssumptionViolated { offset: 4, found: b'!' })
        ));
    }

    #[test]
    fn size_disagreeing_with_plan_is_reported() {
        let data = tag_with_size(25, &[frame(b"TIT2", b"\x00Abcd")], 10);
        let mut out = Vec::new();
        let result = rewrite_tag(
            &mut Cursor::new(data),
            &mut out,
            24,
            &RepairOptions::default(),
            "t",
        );
        assert!(matches!(
            result,
            Err(RepairError::InconsistentSize { expected: 24, actual: 25 })
        ));
    }

    #[test]
    fn verbose_lines_follow_frame_order() {
        let title = frame(b"TIT2", b"\x00Abcd");
        let mut payload = b"\x00ima ge/jpeg\x00\x03".to_vec();
        payload.resize(30, 0x5A);
        let data = tag_with_size(15 + 40 + 10, &[title, frame(b"APIC", &payload)], 10);
        let options = RepairOptions {
            delete_frame_type: Some("TIT2".parse().unwrap()),
            verbose: true,
            ..RepairOptions::default()
        };

        let plan = plan_repair(&mut Cursor::new(data.clone()), &options).unwrap();
        let mut out = Vec::new();
        let mut lines = Vec::new();
        rewrite_tag_with_log(
            &mut Cursor::new(data),
            &mut out,
            plan.new_size().unwrap(),
            &options,
            "song.mp3",
            &mut lines,
        )
        .unwrap();

        assert_eq!(
            String::from_utf8(lines).unwrap(),
            "song.mp3 : delete frame (TIT2) 0000000A - 00000019\n\
             song.mp3 : repair APIC frame (ima ge->image) 00000019 - 00000041\n"
        );
    }

    #[test]
    fn quiet_rewrite_writes_no_lines() {
        let mut payload = b"\x00ima\x00ge/png\x00\x03".to_vec();
        payload.resize(20, 0x01);
        let data = tag_with_size(30 + 4, &[frame(b"APIC", &payload)], 4);
        let options = RepairOptions::default();

        let mut lines = Vec::new();
        let report = rewrite_tag_with_log(
            &mut Cursor::new(data),
            &mut Vec::new(),
            33,
            &options,
            "a.mp3",
            &mut lines,
        )
        .unwrap();

        assert!(lines.is_empty());
        assert_eq!(report.events.len(), 1);
    }

    #[test]
    fn verbose_repair_line_format() {
        let event = FrameEvent {
            kind: FrameEventKind::MimeRepaired,
            frame_id: FrameId::APIC,
            start: 0x1F4,
            end: 0x2A30,
        };
        assert_eq!(
            event.describe("a.mp3"),
            "a.mp3 : repair APIC frame (ima ge->image) 000001F4 - 00002A30"
        );
    }
}
