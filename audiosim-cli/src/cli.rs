use anyhow::{Context, Result};
use audiosim_core::{AudioData, AudioSim, AudioSimDesc, LoadOptions, MonoMode, Vec3, write_wav};
use clap::Parser;
use std::path::PathBuf;

/// Renders a speech recording as heard at a position inside a simulated room.
#[derive(Parser, Debug)]
#[command(name = "audiosim")]
#[command(version)]
#[command(about = "Convolve a speech file with an impulse-response set at a listener position")]
#[command(allow_negative_numbers = true)]
pub struct Args {
    /// Impulse-response set (.irs)
    pub irs_file: PathBuf,

    /// Speech recording to render; only the first channel is used
    pub speech_file: PathBuf,

    /// Listener X position in metres
    pub x: f32,

    /// Listener Y position in metres
    pub y: f32,

    /// Listener height in metres
    pub z: f32,

    /// Output WAV file
    #[arg(short, long, default_value = "output.wav")]
    pub output: PathBuf,

    /// Frames per processing block, a power of two
    #[arg(long, default_value_t = AudioSimDesc::default().block_size)]
    pub block_size: usize,

    /// Output ceiling after peak normalization, in (0, 1]
    #[arg(long, default_value_t = AudioSimDesc::default().headroom)]
    pub headroom: f64,

    /// Output length as a multiple of the speech length
    #[arg(long, default_value_t = AudioSimDesc::default().output_padding)]
    pub padding: usize,

    /// Log per-block details
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    fn desc(&self) -> AudioSimDesc {
        AudioSimDesc::new()
            .block_size(self.block_size)
            .headroom(self.headroom)
            .output_padding(self.padding)
    }

    fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

pub fn run(args: &Args) -> Result<()> {
    let desc = args.desc();
    desc.validate().context("Invalid rendering options")?;

    let sim = AudioSim::from_path(&args.irs_file, desc).with_context(|| {
        format!(
            "Failed to load impulse-response set {}",
            args.irs_file.display()
        )
    })?;

    let speech = AudioData::from_path_with_options(
        &args.speech_file,
        &LoadOptions::new().mono(MonoMode::FirstChannel),
    )
    .with_context(|| format!("Failed to load speech file {}", args.speech_file.display()))?;
    log::info!(
        "Speech: {} frames at {} Hz ({:.2}s)",
        speech.total_frames(),
        speech.sample_rate(),
        speech.duration().as_secs_f64()
    );

    if speech.sample_rate() != sim.sample_rate() {
        log::warn!(
            "Speech is {} Hz but the impulse responses are {} Hz; rendering without resampling",
            speech.sample_rate(),
            sim.sample_rate()
        );
    }

    let position = args.position();
    let rendered = sim
        .render_padded(position, speech.samples())
        .with_context(|| format!("Failed to render at position {:?}", position))?;

    let output = AudioData::mono(rendered, speech.sample_rate());
    write_wav(&args.output, &output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    log::info!(
        "Wrote {} frames to {}",
        output.total_frames(),
        args.output.display()
    );
    Ok(())
}
