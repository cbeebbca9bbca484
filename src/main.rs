// CLI binary entry point for id3mend
//
// Repairs the ID3v2.3 tag of one file. Exit code 0 on success or when
// nothing needed repairing, 1 on any failure.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Config, OutputFormatter};
use std::io;
use std::process;

fn main() {
    let config = Config::parse();
    init_logging(config.verbose);

    let formatter = OutputFormatter::new(config.format.clone(), config.quiet);

    if let Err(e) = run(&config, &formatter) {
        formatter.print_error(&format!("{}: {:#}", config.file.display(), e));
        process::exit(1);
    }
}

fn run(config: &Config, formatter: &OutputFormatter) -> Result<()> {
    let options = config.repair_options();
    let mut stdout = io::stdout().lock();

    if config.dry_run {
        let plan = id3mend::plan_file(&config.file, &options).context("cannot plan repair")?;
        return formatter.output_plan(&config.file, &plan, &mut stdout);
    }

    let outcome = id3mend::repair_file(&config.file, &options).context("repair aborted")?;
    formatter.output_outcome(&config.file, &outcome, &mut stdout)
}

/// Logs go to stderr; `RUST_LOG` overrides the level picked from `--verbose`
fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}
