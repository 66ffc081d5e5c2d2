//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "pds",
    version,
    about = "Procurement declaration forms - flatten and validate records",
    long_about = "Flatten and validate procurement declaration records.\n\n\
                  Records are read in their stored JSON form and validated screen by \
                  screen, once per lot for lot-scoped screens."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow record values in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a stored record against a form configuration.
    Validate(ValidateArgs),

    /// Print the flat address/value entries of a stored record.
    Flatten(RecordArgs),

    /// List the lots of a stored record.
    Lots(RecordArgs),

    /// List the screens of a form configuration.
    Screens {
        /// Form configuration (TOML or JSON).
        #[arg(long = "form", value_name = "PATH")]
        form: PathBuf,
    },
}

#[derive(Args)]
pub struct RecordArgs {
    /// Form configuration (TOML or JSON).
    #[arg(long = "form", value_name = "PATH")]
    pub form: PathBuf,

    /// Stored record (JSON).
    #[arg(long = "record", value_name = "PATH")]
    pub record: PathBuf,

    /// Output format.
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormatArg,
}

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub input: RecordArgs,

    /// Classification registry CSV (code, forbids_sole_criterion, required_categories).
    #[arg(long = "registry", value_name = "PATH")]
    pub registry: Option<PathBuf>,

    /// Validate a single screen instead of the whole record.
    #[arg(long = "screen", value_name = "ID")]
    pub screen: Option<String>,

    /// Lot to validate with --screen (default: first lot).
    #[arg(long = "lot", value_name = "INDEX", requires = "screen")]
    pub lot: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    Table,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
