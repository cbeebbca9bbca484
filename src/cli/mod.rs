// CLI module for id3mend
//
// Argument parsing and result printing for the binary. The repair itself
// lives in the library.

pub mod config;
pub mod output;

pub use config::Config;
pub use output::OutputFormatter;
