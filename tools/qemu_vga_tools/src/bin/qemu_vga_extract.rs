//! Print the characters held in a QEMU dump of the VGA text buffer.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use qemu_vga_tools::{init_tracing, run_extract, FormatArg};

#[derive(Debug, Parser)]
#[command(
    name = "qemu_vga_extract",
    about = "Extract printable VGA text characters from a QEMU memory dump"
)]
struct Args {
    /// Dump file to decode.
    dump_path: PathBuf,

    #[arg(long, value_enum, default_value_t = FormatArg::Hex)]
    format: FormatArg,

    /// Lay the text out as 80-column screen rows instead of one run of characters.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    screen: bool,
}

fn run(args: Args) -> Result<()> {
    let text = run_extract(&args.dump_path, args.format.into(), args.screen)?;
    println!("{text}");
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
