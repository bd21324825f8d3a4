//! dxbc-decomp - DXBC container to HLSL command line tool
//!
//! Runs the same pipeline as the exported C entry point over a file on disk.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::Colorize;

use dxbc_decomp::buffer;
use dxbc_decomp::container::DEFAULT_PREFIX_LEN;
use dxbc_decomp::decomp::NativeBackend;
use dxbc_decomp::diag::LogContext;
use dxbc_decomp::pipeline::PipelineBuilder;

/// Decompile a compiled DXBC shader container into HLSL source
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Raw container file (envelope + DXBC blob)
    input: PathBuf,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Envelope bytes before the DXBC magic (0 for bare .dxbc files, 0x prefix for hex)
    #[arg(long, default_value_t = DEFAULT_PREFIX_LEN, value_parser = parse_size)]
    prefix_len: usize,

    /// Emit the disassembly instead of decompiled HLSL
    #[arg(long, default_value_t = false)]
    asm: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Parse a size (supports 0x prefix and decimal)
fn parse_size(s: &str) -> Result<usize, std::num::ParseIntError> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16)
    } else {
        s.parse()
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        match args.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        },
    ))
    .init();
    let ctx = LogContext::new(args.verbose >= 2);

    log::debug!("Input: {:?}", args.input);
    log::debug!("Prefix length: {}", args.prefix_len);

    if !NativeBackend::is_available() {
        eprintln!(
            "{} native backend not linked, rebuild with --features native_decomp",
            "[!]".yellow()
        );
    }

    let raw = fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let backend = NativeBackend::new();
    let pipeline = PipelineBuilder::new(&backend, &backend)
        .prefix_len(args.prefix_len)
        .tool(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        .build();

    if args.asm {
        let text = pipeline
            .disassemble(&raw, &ctx)
            .map_err(|e| anyhow!("Disassembly of {} failed: {}", args.input.display(), e))?;
        write_output(args.output.as_ref(), text.as_bytes())?;
    } else {
        let hlsl = pipeline
            .decompile_to_buffer(&raw, &ctx)
            .map_err(|e| anyhow!("Decompilation of {} failed: {}", args.input.display(), e))?;
        let written = write_output(args.output.as_ref(), hlsl.as_bytes());
        buffer::release(hlsl);
        written?;
    }

    if let Some(path) = &args.output {
        eprintln!("{} wrote {}", "[+]".green(), path.display());
    }
    Ok(())
}

fn write_output(path: Option<&PathBuf>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}
