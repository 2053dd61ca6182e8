//! Command-line front end for the residua scan engine.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use memmap2::Mmap;
use residua::context::{Context, KeyKind, Metric, WindowMode};
use residua::result::ResultRecord;
use residua::{dispatcher, Error, Result};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Algorithm {
    Aes,
    Rsa,
    RsaWin,
    Serpent,
    Twofish,
    TcTwofish,
}

impl From<Algorithm> for Option<KeyKind> {
    fn from(a: Algorithm) -> Self {
        Some(match a {
            Algorithm::Aes => KeyKind::Aes,
            Algorithm::Rsa => KeyKind::RsaDer,
            Algorithm::RsaWin => KeyKind::RsaWin,
            Algorithm::Serpent => KeyKind::Serpent,
            Algorithm::Twofish => KeyKind::Twofish,
            Algorithm::TcTwofish => KeyKind::TwofishTc,
        })
    }
}

/// Scan a raw binary image for residue of cryptographic key material.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Key kind to search for. Omit to run the entropy/byte-count scanner instead.
    #[arg(short = 'a', long = "algorithm", value_enum)]
    algorithm: Option<Algorithm>,

    /// Search interval, hex, either side may be empty (e.g. `1000:` or `:2000`).
    #[arg(short = 'i', long = "interval")]
    interval: Option<String>,

    /// Key size in bits (AES only; Serpent and Twofish are fixed at 256).
    #[arg(short = 'k', long = "key-size", default_value_t = 128)]
    key_size: u16,

    /// Naive mode: compute Shannon entropy per window. Without this flag the
    /// blob scanner counts distinct byte values instead.
    #[arg(short = 'n', long)]
    naive: bool,

    /// Write every window's metric value to this file as it is computed.
    #[arg(short = 'p', long = "probe-file")]
    probe_file: Option<PathBuf>,

    /// Non-overlapping ("quick") windows instead of a sliding scan.
    #[arg(short = 'q', long)]
    quick: bool,

    /// Physical offset of the page directory; triggers virtual-memory reconstruction first.
    #[arg(short = 'r', long = "cr3")]
    cr3: Option<String>,

    /// Metric threshold for the blob scanner.
    #[arg(short = 't', long, default_value_t = 7.0)]
    threshold: f64,

    /// Verbose diagnostics.
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Window size in bytes for the blob scanner.
    #[arg(short = 'w', long = "window")]
    window: Option<usize>,

    /// Input files to scan.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn parse_hex(s: &str) -> Result<usize> {
    usize::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|_| Error::InvalidArgument("expected a hexadecimal offset"))
}

fn parse_interval(raw: &str, len: usize) -> Result<(usize, usize)> {
    let (lo, hi) = raw.split_once(':').ok_or(Error::InvalidArgument("interval must contain ':'"))?;
    let from = if lo.is_empty() { 0 } else { parse_hex(lo)? };
    let to = if hi.is_empty() { len } else { parse_hex(hi)? };
    if from > to {
        eprintln!("WARNING: interval start after end, clamping to whole buffer");
        return Ok((0, len));
    }
    Ok((from, to))
}

/// Format `value` the way C's `printf("%.4g", value)` would: four
/// significant figures, switching to exponential notation outside the
/// `[1e-4, 1e4)` magnitude band, with trailing zeros trimmed.
fn format_g4(value: f64) -> String {
    const SIG: i32 = 4;
    if value == 0.0 {
        return "0".to_string();
    }
    let exp = value.abs().log10().floor() as i32;
    if exp < -4 || exp >= SIG {
        let precision = (SIG - 1).max(0) as usize;
        let formatted = format!("{value:.precision$e}");
        let (mantissa, suffix) = formatted.split_once('e').unwrap();
        let mantissa = trim_trailing_zeros(mantissa);
        let exp_val: i32 = suffix.parse().unwrap();
        format!("{mantissa}e{:+03}", exp_val)
    } else {
        let precision = (SIG - 1 - exp).max(0) as usize;
        trim_trailing_zeros(&format!("{value:.precision$}"))
    }
}

fn trim_trailing_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let trimmed = s.trim_end_matches('0');
    trimmed.trim_end_matches('.').to_string()
}

fn print_record(rec: &ResultRecord) {
    match rec {
        ResultRecord::DerKey { offset, modulus_bits, public_exponent, length } => {
            println!(
                "0x{offset:08x}  DER RSA key  modulus={modulus_bits} bits  e={public_exponent}  length={length}"
            );
        }
        ResultRecord::AesKey { offset, bits, .. } => {
            println!("0x{offset:08x}  AES-{bits} schedule");
        }
        ResultRecord::SerpentKey { offset, .. } => {
            println!("0x{offset:08x}  Serpent-256 schedule");
        }
        ResultRecord::TwofishKey { offset, variant, .. } => {
            println!("0x{offset:08x}  Twofish schedule ({variant:?})");
        }
        ResultRecord::EntropyBlob { start, end, bytes, windows, mean_metric } => {
            println!(
                "0x{start:08x} - 0x{end:08x} | {bytes} bytes | {windows} windows | mean {mean_metric:.4}"
            );
        }
        ResultRecord::RsaWinSignature { offset } => {
            println!("0x{offset:08x}  RSA2 signature");
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let key_kind: Option<KeyKind> = cli.algorithm.map(Into::into);
    let mut ctx = Context::new(key_kind);
    ctx.key_size_bits = cli.key_size;
    ctx.threshold = cli.threshold;
    ctx.verbose = cli.verbose;
    ctx.metric = if cli.naive { Metric::Entropy } else { Metric::UniqueBytes };
    ctx.window_mode = if cli.quick { WindowMode::Quick } else { WindowMode::Sliding };
    if let Some(w) = cli.window {
        ctx.window_size = w;
    }
    if let Some(raw) = &cli.cr3 {
        ctx.cr3_offset = Some(parse_hex(raw)?);
    }
    ctx.validate()?;

    for path in &cli.inputs {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let buf: &[u8] = &mmap;

        let (from, to) = match &cli.interval {
            Some(raw) => parse_interval(raw, buf.len())?,
            None => (0, buf.len()),
        };

        let records = match &cli.probe_file {
            Some(probe_path) => {
                let mut writer = BufWriter::new(File::create(probe_path)?);
                let mut sink = |m: f64| {
                    let _ = writeln!(writer, "{}", format_g4(m));
                };
                dispatcher::run_with_metric_sink(&ctx, buf, from, to, Some(&mut sink))?
            }
            None => dispatcher::run(&ctx, buf, from, to)?,
        };

        println!("{}: {} result(s)", path.display(), records.len());
        for rec in &records {
            print_record(rec);
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt::init();
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
