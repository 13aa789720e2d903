//! Command implementations behind `qemu_vga_tools` and `qemu_vga_extract`.
//!
//! The binaries only parse arguments and print; everything that decides pass/fail lives here so it
//! can be tested without spawning processes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use smoke_qmp::{dump_to_file, DumpError, DumpRequest, QmpError};
use smoke_vga_text::{
    check, decode_bytes, dump_bytes, render_screen, CheckOutcome, DumpFormat, ListingError,
};
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Prefix shared with the shell side of the smoketest so CI logs are easy to grep.
pub const LOG_PREFIX: &str = "[qemu-smoketest]";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("cannot reach emulator control socket")]
    Connection(#[source] QmpError),

    #[error("malformed control command")]
    Protocol(#[source] QmpError),

    #[error("timed out waiting for the emulator control socket")]
    Timeout,

    #[error("Failed to dump VGA text buffer: emulator did not write {}", .0.display())]
    DumpFailure(PathBuf),

    #[error(
        "{prefix} VGA text did not contain pattern. First line: '{preview}'",
        prefix = LOG_PREFIX
    )]
    PatternNotFound { preview: String },

    #[error("cannot remove previous dump file {}", .path.display())]
    StaleDump {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("dump file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("read dump file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parse dump listing {}", .path.display())]
    Listing {
        path: PathBuf,
        #[source]
        source: ListingError,
    },
}

impl From<DumpError> for ToolError {
    fn from(err: DumpError) -> Self {
        match err {
            DumpError::Qmp(QmpError::Timeout) => ToolError::Timeout,
            DumpError::Qmp(err @ QmpError::Encode { .. }) => ToolError::Protocol(err),
            DumpError::Qmp(err) => ToolError::Connection(err),
            DumpError::MissingOutput(path) => ToolError::DumpFailure(path),
            DumpError::StaleOutput { path, source } => ToolError::StaleDump { path, source },
        }
    }
}

/// Dump file representation as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Exact memory bytes (`pmemsave` output).
    Raw,
    /// Hex byte listing; every two-digit token is a byte.
    Hex,
    /// Human monitor `xp /Nbx` transcript; bytes are read after each `address:`.
    Monitor,
}

impl From<FormatArg> for DumpFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Raw => DumpFormat::Raw,
            FormatArg::Hex => DumpFormat::Hex,
            FormatArg::Monitor => DumpFormat::Monitor,
        }
    }
}

/// Install a stderr `tracing` subscriber. `RUST_LOG` overrides the default `warn` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Parse a guest-physical address given as `0x`-prefixed hex or decimal.
pub fn parse_address(value: &str) -> Result<u64, String> {
    let value = value.trim();
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse::<u64>(),
    };
    parsed.map_err(|err| format!("invalid address {value:?}: {err}"))
}

pub fn run_dump(request: &DumpRequest) -> Result<(), ToolError> {
    debug!(
        socket = %request.socket_path.display(),
        destination = %request.destination.display(),
        "requesting VGA text buffer dump"
    );
    dump_to_file(request)?;
    Ok(())
}

fn read_dump(path: &Path) -> Result<Vec<u8>, ToolError> {
    if !path.exists() {
        return Err(ToolError::FileNotFound(path.to_path_buf()));
    }
    fs::read(path).map_err(|source| ToolError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn load_bytes(path: &Path, format: DumpFormat) -> Result<Vec<u8>, ToolError> {
    let contents = read_dump(path)?;
    let bytes = dump_bytes(&contents, format).map_err(|source| ToolError::Listing {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), ?format, bytes = bytes.len(), "loaded dump");
    Ok(bytes.into_owned())
}

/// Decode the dump at `dump_path` and look for `pattern`. Returns the success line to print.
pub fn run_assert(
    pattern: &str,
    dump_path: &Path,
    format: DumpFormat,
) -> Result<String, ToolError> {
    let text = decode_bytes(&load_bytes(dump_path, format)?);

    match check(&text, pattern) {
        CheckOutcome::Found => {
            info!(pattern, "boot message found");
            Ok(format!("{LOG_PREFIX} Found success pattern in VGA text: '{pattern}'"))
        }
        CheckOutcome::Missing { preview } => {
            debug!(pattern, "boot message missing");
            Err(ToolError::PatternNotFound { preview })
        }
    }
}

/// Decode the dump at `dump_path` into text, either as a flat character run or as screen rows.
pub fn run_extract(
    dump_path: &Path,
    format: DumpFormat,
    screen: bool,
) -> Result<String, ToolError> {
    let bytes = load_bytes(dump_path, format)?;
    if screen {
        Ok(render_screen(&bytes))
    } else {
        Ok(decode_bytes(&bytes))
    }
}
