//! Command-line arguments.
//!
//! The relay has always been started as `radar-relay -demo <path>`, so
//! single-dash long flags are rewritten to their double-dash form before
//! clap sees them.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

/// Arguments of the `radar-relay` binary.
#[derive(Parser, Debug)]
#[command(
    about = "Publish a demo's player positions as radar-image coordinates over WebSocket",
    version
)]
pub struct Args {
    /// Path to the decoded demo export (JSON lines)
    #[arg(long)]
    pub demo: Option<PathBuf>,

    /// YAML configuration file (defaults apply when it does not exist)
    #[arg(long, default_value = radar_core::config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

impl Args {
    /// Parse the process arguments, accepting `-demo` as well as `--demo`.
    pub fn parse_normalized() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }
}

/// Rewrite `-name` and `-name=value` to `--name`/`--name=value`.
///
/// The first element is the program name and is left alone, as are
/// single-letter short flags, `--` style flags, and non-UTF-8 values.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    let mut out: Vec<OsString> = args.next().into_iter().collect();
    for arg in args {
        out.push(normalize_one(arg));
    }
    out
}

fn normalize_one(arg: OsString) -> OsString {
    let Some(text) = arg.to_str() else {
        return arg;
    };
    let Some(rest) = text.strip_prefix('-') else {
        return arg;
    };
    let name = rest.split('=').next().unwrap_or(rest);
    if rest.starts_with('-') || name.chars().count() < 2 || !name.starts_with(char::is_alphabetic) {
        return arg;
    }
    OsString::from(format!("-{text}"))
}
