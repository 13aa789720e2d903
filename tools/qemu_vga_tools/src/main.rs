use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use smoke_qmp::DumpRequest;
use smoke_vga_text::{TEXT_BUFFER_BASE, TEXT_BUFFER_LEN};

use qemu_vga_tools::{init_tracing, parse_address, run_assert, run_dump, FormatArg};

#[derive(Debug, Parser)]
#[command(name = "qemu_vga_tools")]
#[command(about = "QEMU VGA text buffer helpers for the boot smoketest")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Dump the VGA text buffer via QMP.
    Dump {
        /// Path to the QMP socket (`-qmp unix:<path>,server,nowait`).
        qmp_socket: PathBuf,

        /// Output path for the dump; written by QEMU, so it must be reachable from its side.
        dump_path: PathBuf,

        /// Guest-physical start address (hex with `0x`, or decimal).
        #[arg(long, value_parser = parse_address, default_value = "0xb8000")]
        address: u64,

        /// Number of bytes to save.
        #[arg(long, default_value_t = TEXT_BUFFER_LEN as u64)]
        length: u64,

        /// Give up if QEMU does not answer within this many seconds (default: wait forever).
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        timeout_secs: Option<u64>,
    },

    /// Check the VGA dump for a success pattern.
    Assert {
        /// String to search for in the VGA text.
        pattern: String,

        /// Path to the VGA dump file.
        dump_path: PathBuf,

        #[arg(long, value_enum, default_value_t = FormatArg::Raw)]
        format: FormatArg,
    },
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Dump {
            qmp_socket,
            dump_path,
            address,
            length,
            timeout_secs,
        } => {
            if address != TEXT_BUFFER_BASE || length != TEXT_BUFFER_LEN as u64 {
                tracing::info!(address, length, "dumping a non-default memory region");
            }
            let request = DumpRequest::new(qmp_socket, dump_path, address, length)
                .with_timeout(timeout_secs.map(Duration::from_secs));
            run_dump(&request)?;
        }
        Commands::Assert {
            pattern,
            dump_path,
            format,
        } => {
            println!("{}", run_assert(&pattern, &dump_path, format.into())?);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
