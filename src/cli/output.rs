// Output formatting for CLI

use crate::cli::config::OutputFormat;
use anyhow::Result;
use id3mend::{Plan, RepairOutcome};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// JSON summary of one run
#[derive(Debug, Serialize)]
struct Summary<'a> {
    file: &'a Path,
    dry_run: bool,
    plan: &'a Plan,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<&'a RepairOutcome>,
}

/// Format and output run results
pub struct OutputFormatter {
    format: OutputFormat,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Report a planning-only run
    pub fn output_plan(&self, file: &Path, plan: &Plan, writer: &mut impl Write) -> Result<()> {
        match self.format {
            OutputFormat::Pretty => match plan {
                Plan::Unchanged { .. } => {
                    self.print_info(writer, &format!("{}: no repair needed", file.display()))?
                }
                Plan::Resize {
                    original_size,
                    new_size,
                } => self.print_info(
                    writer,
                    &format!(
                        "{}: tag would shrink from {} to {} bytes",
                        file.display(),
                        original_size,
                        new_size
                    ),
                )?,
            },
            OutputFormat::Json => self.output_json(
                &Summary {
                    file,
                    dry_run: true,
                    plan,
                    outcome: None,
                },
                writer,
            )?,
        }
        Ok(())
    }

    /// Report a repair run
    pub fn output_outcome(&self, file: &Path, outcome: &RepairOutcome, writer: &mut impl Write) -> Result<()> {
        match self.format {
            OutputFormat::Pretty => {
                let (Plan::Resize { original_size, new_size }, Some(backup)) = (&outcome.plan, &outcome.backup) else {
                    return self.print_info(writer, &format!("{}: no repair needed", file.display()));
                };
                if !self.quiet {
                    writeln!(
                        writer,
                        "✓ {}: tag size {} -> {} (original saved as {})",
                        file.display(),
                        original_size,
                        new_size,
                        backup.display()
                    )?;
                }
            }
            OutputFormat::Json => self.output_json(
                &Summary {
                    file,
                    dry_run: false,
                    plan: &outcome.plan,
                    outcome: Some(outcome),
                },
                writer,
            )?,
        }
        Ok(())
    }

    fn output_json(&self, summary: &Summary<'_>, writer: &mut impl Write) -> Result<()> {
        writeln!(writer, "{}", serde_json::to_string_pretty(summary)?)?;
        Ok(())
    }

    fn print_info(&self, writer: &mut impl Write, message: &str) -> Result<()> {
        if !self.quiet {
            writeln!(writer, "  {}", message)?;
        }
        Ok(())
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }
}
