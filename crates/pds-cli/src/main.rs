//! Procurement declaration form CLI.
//!
//! Exit codes: 0 when the record is valid, 1 when it has violations and 2 on
//! fatal errors.

use clap::{ColorChoice, Parser};
use pds_cli::commands::{ValidateOptions, load_form, run_flatten, run_lots, run_validate};
use pds_cli::logging::{LogConfig, LogFormat, init_logging};
use pds_cli::summary::{
    print_lots, print_report, print_screens, print_store, report_json, store_json,
};
use pds_codec::TypeCodec;
use std::io::{self, IsTerminal};
use tracing::level_filters::LevelFilter;

mod cli;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg, OutputFormatArg};

const EXIT_VALID: i32 = 0;
const EXIT_INVALID: i32 = 1;
const EXIT_FATAL: i32 = 2;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(EXIT_FATAL);
    }
    let exit_code = match run(cli.command) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            EXIT_FATAL
        }
    };
    std::process::exit(exit_code);
}

fn run(command: Command) -> anyhow::Result<i32> {
    match command {
        Command::Validate(args) => {
            let options = ValidateOptions {
                form: args.input.form,
                record: args.input.record,
                registry: args.registry,
                screen: args.screen,
                lot: args.lot,
            };
            let report = run_validate(&options)?;
            match args.input.format {
                OutputFormatArg::Table => print_report(&report),
                OutputFormatArg::Json => {
                    println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
                }
            }
            Ok(if report.is_valid() {
                EXIT_VALID
            } else {
                EXIT_INVALID
            })
        }
        Command::Flatten(args) => {
            let store = run_flatten(&args.form, &args.record)?;
            match args.format {
                OutputFormatArg::Table => print_store(&store),
                OutputFormatArg::Json => {
                    let output = store_json(&store, &TypeCodec::new());
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }
            Ok(EXIT_VALID)
        }
        Command::Lots(args) => {
            let lots = run_lots(&args.form, &args.record)?;
            match args.format {
                OutputFormatArg::Table => print_lots(&lots),
                OutputFormatArg::Json => {
                    let names: Vec<&str> = lots.iter().map(|lot| lot.name.as_str()).collect();
                    println!("{}", serde_json::to_string_pretty(&names)?);
                }
            }
            Ok(EXIT_VALID)
        }
        Command::Screens { form } => {
            print_screens(&load_form(&form)?);
            Ok(EXIT_VALID)
        }
    }
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.log_data = cli.log_data;
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
