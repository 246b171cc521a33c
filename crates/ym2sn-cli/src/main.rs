//! Command-line front end for the YM → SN VGM converter.
//!
//! Loads a `.ym` register dump (LHA-compressed or plain), runs the
//! conversion engine and writes a VGM 1.51 file with a GD3 tag built from
//! the song's metadata. The conversion report is printed to stderr unless
//! `--quiet` is given.

use clap::{Parser, ValueEnum};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use ym2sn_core::{ConversionConfig, Converter, LfsrTap};
use ym2sn_vgm::{Gd3Tag, VgmSettings};

/// Source machine hint, selecting the YM master clock
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Region {
    /// PAL Atari ST (2 MHz)
    Pal,
    /// NTSC machines (1.789772 MHz)
    Ntsc,
}

impl Region {
    fn clock_hz(self) -> u32 {
        match self {
            Region::Pal => 2_000_000,
            Region::Ntsc => 1_789_772,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TapBit {
    /// Tap bit 15 (BBC Micro, discrete SN76489)
    #[value(name = "15")]
    Bit15,
    /// Tap bit 16 (Sega integrations)
    #[value(name = "16")]
    Bit16,
}

#[derive(Parser)]
#[command(name = "ym2sn")]
#[command(about = "Convert YM2149 register dumps to SN76489 VGM files")]
struct Args {
    /// Input .ym file (LHA-compressed or plain)
    input: PathBuf,

    /// Output .vgm file (defaults to the input name with a .vgm extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target SN76489 clock in Hz
    #[arg(long, default_value_t = 4_000_000)]
    clock: u32,

    /// Override the YM master clock in Hz (wins over --region)
    #[arg(long)]
    source_clock: Option<u32>,

    /// Source machine hint for the YM clock when the file header is wrong
    #[arg(long, value_enum)]
    region: Option<Region>,

    /// Shift register tap bit for periodic-noise pitch
    #[arg(long, value_enum, default_value = "15")]
    lfsr: TapBit,

    /// Envelope sampling rate in Hz (must be a multiple of the frame rate)
    #[arg(long)]
    env_rate: Option<u32>,

    /// Channels to mute, comma separated from a,b,c,n
    #[arg(long, value_delimiter = ',')]
    mute: Vec<String>,

    /// Encode out-of-range low tones for a software-bass player instead of
    /// periodic noise
    #[arg(long)]
    software_bass: bool,

    /// Drive noise pitch from tone channel C on noisy frames
    #[arg(long)]
    tuned_noise: bool,

    /// Replace envelope simulation with full level
    #[arg(long)]
    no_envelopes: bool,

    /// Map volumes by dB scaling instead of the amplitude-table fit
    #[arg(long)]
    attenuation: bool,

    /// Honour the mixer bits literally, even for envelope-driven voices
    #[arg(long)]
    strict_mixer: bool,

    /// Skip the bass-bias pre-scan
    #[arg(long)]
    no_prescan: bool,

    /// Suppress the conversion report
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ym2sn: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let song = ym2sn_ym::load_file(&args.input)?;

    let mut cfg = ConversionConfig {
        target_clock_hz: args.clock,
        source_clock_hz: args
            .source_clock
            .or_else(|| args.region.map(Region::clock_hz)),
        lfsr_tap_bit: match args.lfsr {
            TapBit::Bit15 => LfsrTap::Bit15,
            TapBit::Bit16 => LfsrTap::Bit16,
        },
        envelope_sample_rate_hz: args.env_rate,
        software_bass: args.software_bass,
        tuned_white_noise: args.tuned_noise,
        disable_envelopes: args.no_envelopes,
        force_attenuation_mapping: args.attenuation,
        envelope_mix_hack: !args.strict_mixer,
        prescan: !args.no_prescan,
        ..Default::default()
    };
    for channel in &args.mute {
        match channel.trim().to_ascii_lowercase().as_str() {
            "a" => cfg.channel_filter.a = false,
            "b" => cfg.channel_filter.b = false,
            "c" => cfg.channel_filter.c = false,
            "n" => cfg.channel_filter.noise = false,
            other => return Err(format!("unknown channel '{other}' (expected a, b, c or n)").into()),
        }
    }

    if !args.quiet {
        eprintln!(
            "{}: {} frames at {} Hz, YM clock {} Hz",
            args.input.display(),
            song.frames.len(),
            song.info.frame_rate_hz,
            song.info.source_clock_hz,
        );
        if !song.metadata.title.is_empty() {
            eprintln!("{} - {}", song.metadata.title, song.metadata.author);
        }
    }

    let mut converter = Converter::new(cfg);
    let commands = converter.convert(&song.frames, &song.info)?;

    let source_name = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let settings = VgmSettings {
        sn_clock_hz: args.clock,
        lfsr_tap: match args.lfsr {
            TapBit::Bit15 => LfsrTap::Bit15,
            TapBit::Bit16 => LfsrTap::Bit16,
        },
        frame_rate_hz: song.info.frame_rate_hz,
        gd3: Some(Gd3Tag::from_song(
            &song.metadata.title,
            &source_name,
            &song.metadata.author,
            &song.metadata.comment,
        )),
    };
    let vgm = ym2sn_vgm::write_vgm(&commands, &settings)?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("vgm"));
    std::fs::write(&output, &vgm)?;

    if !args.quiet {
        eprintln!("{}", converter.report());
        eprintln!("Wrote {} bytes to {}", vgm.len(), output.display());
    }
    Ok(())
}
