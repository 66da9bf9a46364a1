mod logging;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dtmfdec::pcm::S16leBlocks;
use dtmfdec::Decoder;
use dtmfdec_tones::noise::{add_band_limited_noise, rms};
use dtmfdec_tones::{to_s16le, DtmfSynth};
use tracing::{debug, info};

const READ_CHUNK_SAMPLES: usize = 4096;
const NOISE_CUTOFF_HZ: f64 = 3400.0;
const NOISE_SEED: u64 = 0x1234_5678;

#[derive(Parser, Debug)]
#[command(name = "dtmfdec-tool", about = "Decode and generate DTMF tones in raw s16le PCM")]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the keys found in a raw mono s16le stream.
    Decode(DecodeArgs),
    /// Write a raw mono s16le stream for a key sequence.
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Input file, or `-` for stdin.
    #[arg(default_value = "-")]
    input: PathBuf,

    #[arg(short = 'r', long, default_value_t = 8000)]
    sample_rate: u32,

    /// Samples per decoding block.
    #[arg(short, long, default_value_t = 160)]
    block_samples: usize,

    /// Minimum normalized energy for a tone to count as present.
    #[arg(short, long, default_value_t = dtmfdec::detect::DEFAULT_ENERGY_THRESHOLD)]
    threshold: f64,

    /// Minimum time before the same key is reported again.
    #[arg(short, long, default_value_t = 200)]
    press_interval_ms: u64,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Keys to render (0-9, *, #, A-D).
    keys: String,

    /// Output file, or `-` for stdout.
    #[arg(default_value = "-")]
    output: PathBuf,

    #[arg(short = 'r', long, default_value_t = 8000)]
    sample_rate: u32,

    #[arg(long, default_value_t = 100.0)]
    tone_ms: f64,

    #[arg(long, default_value_t = 200.0)]
    gap_ms: f64,

    /// Peak level of each tone pair in dBFS.
    #[arg(long, default_value_t = -6.0, allow_hyphen_values = true)]
    level_db: f64,

    /// Add band-limited noise at this RMS level in dBFS.
    #[arg(long, allow_hyphen_values = true)]
    noise_db: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Decode(args) => decode(args),
        Command::Generate(args) => generate(args),
    }
}

fn decode(args: DecodeArgs) -> anyhow::Result<()> {
    let mut decoder = Decoder::builder(args.sample_rate)
        .energy_threshold(args.threshold)
        .press_interval(Duration::from_millis(args.press_interval_ms))
        .block_samples(args.block_samples)
        .build()
        .context("invalid decoder settings")?;
    debug!(
        sample_rate = decoder.sample_rate_hz(),
        threshold = decoder.energy_threshold(),
        press_interval_ms = decoder.press_interval().as_millis() as u64,
        block_samples = decoder.block_samples(),
        "decoder ready"
    );

    let reader = open_input(&args.input)?;
    let mut keys = String::new();
    for chunk in S16leBlocks::new(reader, READ_CHUNK_SAMPLES) {
        let samples = chunk.with_context(|| format!("reading {}", args.input.display()))?;
        for press in decoder.push(&samples) {
            report(&press);
            keys.push(press.key);
        }
    }
    if let Some(press) = decoder.flush() {
        report(&press);
        keys.push(press.key);
    }

    info!(
        keys = keys.len(),
        elapsed_ms = decoder.elapsed().as_millis() as u64,
        "finished"
    );
    println!("{keys}");
    Ok(())
}

fn report(press: &dtmfdec::KeyPress) {
    info!(
        key = %press.key,
        start_sample = press.start_sample,
        at_ms = press.at.as_millis() as u64,
        "key"
    );
}

fn generate(args: GenerateArgs) -> anyhow::Result<()> {
    let rate = args.sample_rate as f64;
    let level = 10.0_f64.powf(args.level_db / 20.0);
    let synth = DtmfSynth::new(rate, level);
    let mut samples = synth
        .sequence(&args.keys, args.tone_ms, args.gap_ms)
        .context("cannot render key sequence")?;

    if let Some(noise_db) = args.noise_db {
        let noise_level = 10.0_f64.powf(noise_db / 20.0);
        add_band_limited_noise(&mut samples, noise_level, rate, NOISE_CUTOFF_HZ, NOISE_SEED);
    }

    let bytes = to_s16le(&samples);
    let mut writer = open_output(&args.output)?;
    writer
        .write_all(&bytes)
        .and_then(|_| writer.flush())
        .with_context(|| format!("writing {}", args.output.display()))?;

    info!(
        keys = %args.keys,
        samples = samples.len(),
        sample_rate = args.sample_rate,
        rms_dbfs = 20.0 * rms(&samples).log10(),
        "generated"
    );
    Ok(())
}

fn open_input(path: &Path) -> anyhow::Result<Box<dyn Read>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(std::io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(path: &Path) -> anyhow::Result<Box<dyn Write>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(std::io::stdout().lock()));
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}
