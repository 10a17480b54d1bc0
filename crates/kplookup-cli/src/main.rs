//! kplookup - KeePass entry lookup for automation tools
//!
//! Prints the matched entries as JSON on stdout. Logs go to stderr.
//!
//! The master password is read from `KEEPASS_PASSWORD`. The hidden
//! `--password` flag still works but leaves the secret in the process
//! argument list, so it logs a warning.

mod config;

use anyhow::{Context, Result};
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, ValueEnum};
use kplookup_core::{default_kdbx_file, LookupConfig, LookupError, Record, RegexMode, Secret};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Look up KeePass entries and print them as JSON records
#[derive(Parser, Debug)]
#[command(name = "kplookup", author, version, about, long_about = None)]
struct Args {
    /// Entry paths, or patterns with --regex
    #[arg(required = true, value_name = "TERM")]
    terms: Vec<String>,

    /// Path to the KeePass database file [default: ~/Passwords.kdbx]
    #[arg(short = 'f', long = "file", env = "KEEPASS_FILE", value_name = "FILE")]
    kdbx_file: Option<PathBuf>,

    /// Master password of the database; prefer KEEPASS_PASSWORD
    #[arg(long = "password", env = "KEEPASS_PASSWORD", hide = true)]
    kdbx_password: Option<String>,

    /// Include the password attribute in records
    #[arg(short = 'p', long, overrides_with = "no_include_password")]
    include_password: bool,

    /// Leave the password attribute out, even if the config file enables it
    #[arg(long, overrides_with = "include_password")]
    no_include_password: bool,

    /// Treat terms as regular expressions
    #[arg(short, long, overrides_with = "no_regex")]
    regex: bool,

    /// Match terms exactly, even if the config file enables regex
    #[arg(long, overrides_with = "regex")]
    no_regex: bool,

    /// How regex terms are matched
    #[arg(long, value_enum, value_name = "MODE")]
    regex_mode: Option<ModeArg>,

    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print one flat list of records instead of one list per term
    #[arg(long)]
    flat: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Match the whole entry path anywhere in the tree
    Global,
    /// Match group segments level by level, then the title
    Legacy,
}

impl From<ModeArg> for RegexMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Global => RegexMode::Global,
            ModeArg::Legacy => RegexMode::Legacy,
        }
    }
}

fn main() -> ExitCode {
    let matches = Args::command().get_matches();
    let args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    // Logs go to stderr so stdout stays parseable
    let directive = if args.verbose { "kplookup=info" } else { "kplookup=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if password_on_command_line(&matches) {
        tracing::warn!(
            "--password leaves the master password in the process list; set KEEPASS_PASSWORD instead"
        );
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let (kind, code) = exit_status(&e);
            eprintln!("error[{kind}]: {e:#}");
            ExitCode::from(code)
        }
    }
}

/// Error kind label and exit code. Configuration problems exit with 2,
/// like clap usage errors; everything else exits with 1.
fn exit_status(err: &anyhow::Error) -> (&'static str, u8) {
    match err.downcast_ref::<LookupError>() {
        Some(e) if e.kind() == "configuration" => (e.kind(), 2),
        Some(e) => (e.kind(), 1),
        None => ("io", 1),
    }
}

fn password_on_command_line(matches: &ArgMatches) -> bool {
    matches.value_source("kdbx_password") == Some(ValueSource::CommandLine)
}

fn run(args: Args) -> Result<()> {
    let file_config = config::Config::load(args.config.as_deref())
        .map_err(|e| LookupError::Configuration(format!("{e:#}")))?;
    let config = build_lookup_config(&args, file_config)?;

    tracing::info!(
        "Looking up {} term(s) in {}",
        args.terms.len(),
        config.kdbx_file.display()
    );
    let results = kplookup_core::lookup(args.terms.as_slice(), &config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.flat {
        let flat: Vec<Record> = results.into_iter().flatten().collect();
        write_json(&mut out, &flat, args.pretty)?;
    } else {
        write_json(&mut out, &results, args.pretty)?;
    }
    writeln!(out).context("Failed to write output")?;
    Ok(())
}

/// Merge flags and environment over the config file.
fn build_lookup_config(args: &Args, file: config::Config) -> Result<LookupConfig> {
    let kdbx_file = match args.kdbx_file.clone().or(file.kdbx_file) {
        Some(path) => path,
        None => default_kdbx_file()?,
    };
    let password = args.kdbx_password.clone().ok_or_else(|| {
        LookupError::Configuration(
            "no master password given (use --password or KEEPASS_PASSWORD)".to_string(),
        )
    })?;

    let mut config = LookupConfig::new(kdbx_file, Secret::new(password));
    config.include_password =
        flag(args.include_password, args.no_include_password).unwrap_or(file.include_password);
    config.regex = flag(args.regex, args.no_regex).unwrap_or(file.regex);
    config.regex_mode = args.regex_mode.map_or(file.regex_mode, RegexMode::from);
    Ok(config)
}

/// A `--x`/`--no-x` pair; `None` when neither was given.
fn flag(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn write_json<T: serde::Serialize>(out: &mut impl Write, value: &T, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(out, value)
    } else {
        serde_json::to_writer(out, value)
    }
    .context("Failed to write output")
}
