// CLI configuration
use clap::{Parser, ValueEnum};
use id3mend::{FrameId, RepairOptions};
use std::path::PathBuf;

/// id3mend - ID3v2.3 tag repair tool
#[derive(Parser, Debug)]
#[command(name = "id3mend")]
#[command(about = "Repairs \"ima ge\" APIC MIME types, duplicate pictures and unwanted frames in ID3v2.3 tags", long_about = None)]
#[command(version)]
pub struct Config {
    /// When an APIC picture type comes out two times or more, delete the later frames
    #[arg(short, long)]
    pub repetition: bool,

    /// Delete all frames of the given type (e.g. COMM)
    #[arg(short, long, value_name = "FRAMETYPE")]
    pub delete: Option<FrameId>,

    /// Verbose mode (one line per deleted or repaired frame)
    #[arg(short, long)]
    pub verbose: bool,

    /// Only report what would change, leave the file alone
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Quiet mode (suppress progress messages)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Audio file to repair
    #[arg(value_name = "FILENAME")]
    pub file: PathBuf,
}

/// Output format for the run summary
#[derive(Debug, Clone, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human readable lines
    #[default]
    Pretty,
    /// One JSON object
    Json,
}

impl Config {
    /// Options for the repair passes.
    ///
    /// Verbose frame lines go to stdout only in pretty mode; in JSON mode they
    /// are part of the summary instead.
    pub fn repair_options(&self) -> RepairOptions {
        RepairOptions {
            dedupe_apic: self.repetition,
            delete_frame_type: self.delete,
            verbose: self.verbose && self.format == OutputFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_flags() {
        let config = Config::try_parse_from(["id3mend", "-r", "-d", "COMM", "-v", "song.mp3"]).unwrap();
        let options = config.repair_options();
        assert!(options.dedupe_apic);
        assert_eq!(options.delete_frame_type, Some("COMM".parse().unwrap()));
        assert!(options.verbose);
        assert_eq!(config.file, PathBuf::from("song.mp3"));
    }

    #[test]
    fn parses_long_flags() {
        let config = Config::try_parse_from([
            "id3mend",
            "--repetition",
            "--delete",
            "TXXX",
            "--dry-run",
            "--format",
            "json",
            "--verbose",
            "a.mp3",
        ])
        .unwrap();
        assert!(config.dry_run);
        assert_eq!(config.format, OutputFormat::Json);
        assert!(!config.repair_options().verbose);
    }

    #[test]
    fn rejects_bad_frame_type() {
        assert!(Config::try_parse_from(["id3mend", "-d", "TIT", "a.mp3"]).is_err());
        assert!(Config::try_parse_from(["id3mend", "-d", "tit2", "a.mp3"]).is_err());
    }

    #[test]
    fn requires_a_file() {
        assert!(Config::try_parse_from(["id3mend", "-r"]).is_err());
    }
}
