//! resample - convert raw PCM between sample rates, layouts and formats.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};

use anyhow::{bail, Context, Result};
use avkit_audio::{AudioBuffer, AudioResampler, ChannelLayout, ResamplerOptions, SampleFormat};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;

/// Resample a raw, interleaved PCM file.
///
/// Example:
///   resample -i voice.raw --in-rate 44100 --in-layout stereo \
///            -o voice16k.raw --out-rate 16000 --out-layout mono
#[derive(Parser)]
#[command(name = "resample")]
#[command(about = "Raw PCM resampler")]
#[command(version)]
pub struct Cli {
    /// Input file (raw PCM, or - for stdin)
    #[arg(short = 'i', long)]
    pub input: String,

    /// Output file (raw PCM, or - for stdout)
    #[arg(short = 'o', long)]
    pub output: String,

    /// Input sample rate in Hz
    #[arg(long)]
    pub in_rate: u32,

    /// Input channel layout (mono, stereo, 2.1, 3.0, quad, 5.0, 5.1, 7.1)
    #[arg(long, default_value = "mono")]
    pub in_layout: ChannelLayout,

    /// Input sample format (u8, s16, s32, f32, f64)
    #[arg(long, default_value = "s16")]
    pub in_format: SampleFormat,

    /// Output sample rate in Hz
    #[arg(long)]
    pub out_rate: u32,

    /// Output channel layout
    #[arg(long, default_value = "mono")]
    pub out_layout: ChannelLayout,

    /// Output sample format
    #[arg(long, default_value = "s16")]
    pub out_format: SampleFormat,

    /// Resampler options file (YAML or JSON)
    #[arg(long)]
    pub config: Option<String>,

    /// Input frames per resample call
    #[arg(long, default_value_t = 1024)]
    pub block: usize,

    /// Verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    if cli.in_format.is_planar() || cli.out_format.is_planar() {
        bail!("raw PCM files must use a packed sample format");
    }
    if cli.block == 0 {
        bail!("--block must be positive");
    }

    let options = match &cli.config {
        Some(path) => config::load_options(path)
            .with_context(|| format!("failed to load options from {}", path))?,
        None => ResamplerOptions::default(),
    };
    debug!(?options, "resampler options");

    let mut resampler = AudioResampler::new(
        cli.out_layout,
        cli.out_rate,
        cli.out_format,
        cli.in_layout,
        cli.in_rate,
        cli.in_format,
    )
    .context("invalid resampler configuration")?
    .with_options(options);
    resampler.open().context("failed to open resampler")?;

    let mut reader = open_input(&cli.input)?;
    let mut writer = open_output(&cli.output)?;

    let frame_bytes = cli.in_format.bytes_per_sample() * cli.in_layout.channel_count();
    let out_capacity = out_frames_for(cli.block, cli.in_rate, cli.out_rate);
    let mut out = AudioBuffer::new(out_capacity, cli.out_rate, cli.out_layout, cli.out_format)?;

    let mut frames_in = 0usize;
    let mut frames_out = 0usize;
    let mut block = vec![0u8; cli.block * frame_bytes];
    loop {
        let n = read_full(&mut reader, &mut block)?;
        let whole = n - n % frame_bytes;
        if whole > 0 {
            let input = AudioBuffer::from_packed(
                block[..whole].to_vec(),
                cli.in_rate,
                cli.in_layout,
                cli.in_format,
            )?;
            frames_in += input.num_samples();
            frames_out += resampler.resample(&mut out, Some(&input))?;
            writer.write_all(out.data())?;
        }
        if n < block.len() {
            if n != whole {
                debug!(trailing = n - whole, "ignoring partial frame at end of input");
            }
            break;
        }
    }

    loop {
        let n = resampler.resample(&mut out, None)?;
        if n == 0 {
            break;
        }
        frames_out += n;
        writer.write_all(out.data())?;
    }
    writer.flush()?;

    info!(
        frames_in,
        frames_out,
        in_rate = cli.in_rate,
        out_rate = cli.out_rate,
        delay_ms = resampler.delay(1000)?,
        "resample complete"
    );
    Ok(())
}

/// Output capacity large enough for one input block plus filter slack.
fn out_frames_for(block: usize, in_rate: u32, out_rate: u32) -> usize {
    let scaled = (block as u64 * out_rate as u64).div_ceil(in_rate as u64) as usize;
    scaled + 256
}

fn open_input(path: &str) -> Result<Box<dyn Read>> {
    if path == "-" {
        return Ok(Box::new(std::io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("failed to open {}", path))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(path: &str) -> Result<Box<dyn Write>> {
    if path == "-" {
        return Ok(Box::new(BufWriter::new(std::io::stdout().lock())));
    }
    let file = File::create(path).with_context(|| format!("failed to create {}", path))?;
    Ok(Box::new(BufWriter::new(file)))
}

/// Reads until `buf` is full or the reader is exhausted.
fn read_full(reader: &mut dyn Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(input: &str, output: &str) -> Cli {
        Cli::parse_from([
            "resample",
            "-i",
            input,
            "-o",
            output,
            "--in-rate",
            "8000",
            "--in-layout",
            "stereo",
            "--out-rate",
            "16000",
            "--block",
            "100",
        ])
    }

    #[test]
    fn test_parse_args() {
        let cli = cli("in.raw", "out.raw");
        assert_eq!(cli.in_layout, ChannelLayout::Stereo);
        assert_eq!(cli.out_layout, ChannelLayout::Mono);
        assert_eq!(cli.in_format, SampleFormat::S16);
        assert_eq!(cli.block, 100);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_out_frames_for() {
        assert_eq!(out_frames_for(1024, 16000, 48000), 3072 + 256);
        assert_eq!(out_frames_for(100, 44100, 16000), 37 + 256);
    }

    #[test]
    fn test_read_full_short_input() {
        let mut data: &[u8] = &[1, 2, 3];
        let mut buf = [0u8; 8];
        assert_eq!(read_full(&mut data, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
    }

    #[test]
    fn test_run_converts_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.raw");
        let output = dir.path().join("out.raw");

        // 800 stereo frames of s16.
        let mut data = Vec::new();
        for i in 0..800i16 {
            data.extend_from_slice(&(i * 10).to_le_bytes());
            data.extend_from_slice(&(i * 10).to_le_bytes());
        }
        std::fs::write(&input, &data).unwrap();

        let cli = cli(input.to_str().unwrap(), output.to_str().unwrap());
        run(&cli).unwrap();

        let written = std::fs::read(&output).unwrap();
        // Mono s16 at twice the rate.
        assert_eq!(written.len(), 1600 * 2);
    }

    #[test]
    fn test_run_rejects_planar() {
        let mut cli = cli("in.raw", "out.raw");
        cli.out_format = SampleFormat::F32P;
        assert!(run(&cli).is_err());
    }
}
