//! `euphoriae render`: offline processing of a WAV file

use anyhow::{bail, Context, Result};
use clap::Args;
use euphoriae_core::domain::dsp::TimeStretcher;
use euphoriae_core::{AudioEngine, EffectSettings, EngineConfig};
use euphoriae_infra::load_engine_config;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Input WAV file (mono or stereo)
    input: PathBuf,

    /// Output WAV file (32-bit float)
    output: PathBuf,

    /// Factory preset name, saved preset name, or TOML preset file
    #[arg(long)]
    preset: Option<String>,

    /// Directory of saved presets
    #[arg(long)]
    preset_dir: Option<PathBuf>,

    /// Engine configuration TOML; the sample rate always follows the input
    #[arg(long)]
    engine_config: Option<PathBuf>,

    /// Frames per render quantum
    #[arg(long, default_value_t = 480)]
    block_frames: usize,

    /// Playback rate multiplier (0.5 - 2.0)
    #[arg(long)]
    tempo: Option<f32>,

    /// Pitch shift in semitones (-12 - 12)
    #[arg(long, allow_hyphen_values = true)]
    pitch: Option<f32>,

    /// Master volume (0.0 - 2.0)
    #[arg(long)]
    volume: Option<f32>,
}

/// Everything the blocking render needs, resolved up front
struct RenderJob {
    input: PathBuf,
    output: PathBuf,
    config: EngineConfig,
    settings: EffectSettings,
    block_frames: usize,
}

pub async fn run(args: RenderArgs) -> Result<()> {
    let config = match &args.engine_config {
        Some(path) => load_engine_config(path)
            .await
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let mut settings = match &args.preset {
        Some(name) => {
            let preset = crate::preset::resolve(name, args.preset_dir.as_deref()).await?;
            info!(preset = %preset.name, "Using preset");
            preset.settings
        }
        None => EffectSettings::default(),
    };
    if let Some(tempo) = args.tempo {
        settings.tempo = tempo;
    }
    if let Some(pitch) = args.pitch {
        settings.pitch_semitones = pitch;
    }
    if let Some(volume) = args.volume {
        settings.volume = volume;
    }

    if args.block_frames == 0 {
        bail!("--block-frames must be positive");
    }

    let job = RenderJob {
        input: args.input,
        output: args.output,
        config,
        settings,
        block_frames: args.block_frames,
    };

    tokio::task::spawn_blocking(move || render(job))
        .await
        .context("render task panicked")?
}

fn read_wav(path: &Path) -> Result<(hound::WavSpec, Vec<f32>)> {
    let reader = hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok((spec, samples))
}

fn write_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[f32]) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer =
        hound::WavWriter::create(path, spec).with_context(|| format!("creating {}", path.display()))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

fn render(job: RenderJob) -> Result<()> {
    let started = Instant::now();
    let (spec, mut samples) = read_wav(&job.input)?;
    let channels = spec.channels as usize;
    if !(1..=2).contains(&channels) {
        bail!("{} has {} channels; only mono and stereo are supported", job.input.display(), channels);
    }

    let config = EngineConfig {
        sample_rate: spec.sample_rate,
        ..job.config
    };
    let mut engine = AudioEngine::new(config)?;
    engine.create();
    engine.apply_settings(&job.settings);

    info!(
        input = %job.input.display(),
        frames = samples.len() / channels,
        channels,
        sample_rate = spec.sample_rate,
        "Rendering"
    );

    for block in samples.chunks_mut(job.block_frames * channels) {
        let frames = (block.len() / channels) as i32;
        engine.try_process(block, frames, channels as i32)?;
    }

    let rendered = if TimeStretcher::is_identity(engine.tempo(), engine.pitch_ratio()) {
        samples
    } else {
        stretch(&mut engine, &samples, channels, job.block_frames)
    };

    write_wav(&job.output, spec.channels, spec.sample_rate, &rendered)?;
    engine.destroy();

    info!(
        output = %job.output.display(),
        frames = rendered.len() / channels,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Render complete"
    );
    Ok(())
}

/// Feed the processed audio through the tempo/pitch stage block by block
fn stretch(engine: &mut AudioEngine, samples: &[f32], channels: usize, block_frames: usize) -> Vec<f32> {
    debug!(tempo = engine.tempo(), pitch_ratio = engine.pitch_ratio(), "Time stretching");

    // Trailing silence flushes the frames held inside the stretcher
    let window = engine.config().stretch_window_frames;
    let mut input = samples.to_vec();
    input.resize(samples.len() + 2 * window * channels, 0.0);

    let expected = (samples.len() as f32 / engine.tempo()) as usize;
    let mut rendered = Vec::with_capacity(expected + block_frames * channels);
    let mut scratch = vec![0.0; block_frames * channels * (engine.tempo().recip().ceil() as usize + 2)];
    let mut offset = 0;

    while offset < input.len() {
        let end = (offset + block_frames * channels).min(input.len());
        let outcome = engine.time_stretch(&input[offset..end], &mut scratch, channels as i32);
        rendered.extend_from_slice(&scratch[..outcome.produced * channels]);
        offset += outcome.consumed * channels;
        if outcome.consumed == 0 && outcome.produced == 0 {
            break;
        }
    }

    // Drop the flush tail beyond the stretched length of the real input
    rendered.truncate(expected - expected % channels);
    rendered
}
