//! Integration tests for the effects engine
//!
//! These tests drive the public engine surface the way a host does: create,
//! push interleaved blocks, change parameters from other threads, destroy.

use euphoriae_core::{
    AudioEngine, EffectPreset, EngineConfig, EqualizerMode, ReverbPreset, SurroundMode,
};
use euphoriae_infra::PresetManager;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};

fn created_engine() -> AudioEngine {
    let mut engine = AudioEngine::default();
    engine.create();
    engine
}

fn generate_sine_wave(frequency: f32, sample_rate: u32, frames: usize, channels: usize, amplitude: f32) -> Vec<f32> {
    (0..frames)
        .flat_map(|i| {
            let s = amplitude * (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin();
            std::iter::repeat(s).take(channels)
        })
        .collect()
}

fn generate_noise(rng: &mut StdRng, samples: usize) -> Vec<f32> {
    (0..samples).map(|_| rng.gen_range(-1.0f32..=1.0)).collect()
}

fn assert_close(a: &[f32], b: &[f32], tolerance: f32) {
    assert_eq!(a.len(), b.len());
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        assert!((x - y).abs() <= tolerance, "sample {}: {} vs {}", i, x, y);
    }
}

// ============================================================================
// PARAMETER CLAMPING
// ============================================================================

type Setter = fn(&AudioEngine, f32);
type Getter = fn(&AudioEngine) -> f32;

type FloatParameter = (&'static str, Setter, Getter, f32, f32);

fn param(name: &'static str, set: Setter, get: Getter, min: f32, max: f32) -> FloatParameter {
    (name, set, get, min, max)
}

fn float_parameters() -> Vec<FloatParameter> {
    vec![
        param("volume", AudioEngine::set_volume, AudioEngine::volume, 0.0, 2.0),
        param("bass_boost", AudioEngine::set_bass_boost, AudioEngine::bass_boost, 0.0, 1.0),
        param("virtualizer", AudioEngine::set_virtualizer, AudioEngine::virtualizer, 0.0, 1.0),
        param("clarity", AudioEngine::set_clarity, AudioEngine::clarity, 0.0, 1.0),
        param("tube_warmth", AudioEngine::set_tube_warmth, AudioEngine::tube_warmth, 0.0, 1.0),
        param("spectrum_extension", AudioEngine::set_spectrum_extension, AudioEngine::spectrum_extension, 0.0, 1.0),
        param("treble_boost", AudioEngine::set_treble_boost, AudioEngine::treble_boost, 0.0, 1.0),
        param("volume_leveler", AudioEngine::set_volume_leveler, AudioEngine::volume_leveler, 0.0, 1.0),
        param("compressor_strength", AudioEngine::set_compressor_strength, AudioEngine::compressor_strength, 0.0, 1.0),
        param("loudness_gain", AudioEngine::set_loudness_gain, AudioEngine::loudness_gain, 0.0, 1.0),
        param("limiter_ceiling", AudioEngine::set_limiter_ceiling, AudioEngine::limiter_ceiling, 0.5, 1.0),
        param("reverb_wet_mix", AudioEngine::set_reverb_wet_mix, AudioEngine::reverb_wet_mix, 0.0, 1.0),
        param("surround_3d", AudioEngine::set_surround_3d, AudioEngine::surround_3d, 0.0, 1.0),
        param("room_size", AudioEngine::set_room_size, AudioEngine::room_size, 0.0, 1.0),
        param("surround_level", AudioEngine::set_surround_level, AudioEngine::surround_level, 0.0, 1.0),
        param("stereo_balance", AudioEngine::set_stereo_balance, AudioEngine::stereo_balance, -1.0, 1.0),
        param("channel_separation", AudioEngine::set_channel_separation, AudioEngine::channel_separation, 0.0, 1.0),
        param("tempo", AudioEngine::set_tempo, AudioEngine::tempo, 0.5, 2.0),
        param("pitch_semitones", AudioEngine::set_pitch_semitones, AudioEngine::pitch_semitones, -12.0, 12.0),
    ]
}

#[test]
fn test_every_setter_clamps() {
    let engine = created_engine();
    let inputs = [-1000.0, -12.5, -1.0, -0.3, 0.0, 0.25, 0.75, 1.0, 1.7, 3.0, 1000.0];

    for (name, set, get, min, max) in float_parameters() {
        for &value in &inputs {
            set(&engine, value);
            assert_eq!(get(&engine), value.clamp(min, max), "{} <- {}", name, value);
        }
    }
}

#[test]
fn test_equalizer_bands_clamp_independently() {
    let engine = created_engine();
    engine.set_equalizer_band(0, 40.0);
    engine.set_equalizer_band(9, -40.0);
    engine.set_equalizer_band(4, 3.5);
    engine.set_equalizer_band(10, 6.0);
    engine.set_equalizer_band(-1, 6.0);

    assert_eq!(engine.equalizer_band(0), 12.0);
    assert_eq!(engine.equalizer_band(9), -12.0);
    assert_eq!(engine.equalizer_band(4), 3.5);
    assert_eq!(engine.equalizer_band(10), 0.0);
    assert_eq!(engine.equalizer_band(-1), 0.0);
}

#[test]
fn test_getters_report_defaults_when_not_created() {
    let mut engine = created_engine();
    engine.set_volume(0.3);
    engine.destroy();

    for (name, set, get, _, _) in float_parameters() {
        set(&engine, 0.9);
        let expected = AudioEngine::default();
        assert_eq!(get(&engine), get(&expected), "{}", name);
    }
    assert_eq!(engine.volume(), 1.0);
}

// ============================================================================
// PIPELINE PROPERTIES
// ============================================================================

#[test]
fn test_defaults_are_identity_for_mono_and_stereo() {
    for channels in [1usize, 2] {
        let mut engine = created_engine();
        // Peaks sit exactly on the default limiter ceiling
        let input = generate_sine_wave(440.0, 48000, 480, channels, engine.limiter_ceiling());

        for _ in 0..20 {
            let mut buffer = input.clone();
            engine.process_audio(&mut buffer, 480, channels as i32);
            assert_eq!(buffer, input);
        }
    }
}

#[test]
fn test_per_band_equalizer_defaults_are_identity() {
    let mut engine = AudioEngine::new(EngineConfig {
        equalizer_mode: EqualizerMode::PerBand,
        ..Default::default()
    })
    .unwrap();
    engine.create();

    let input = generate_sine_wave(1000.0, 48000, 480, 2, 0.5);
    let mut buffer = input.clone();
    engine.process_audio(&mut buffer, 480, 2);
    assert_close(&buffer, &input, 1e-6);
}

#[test]
fn test_master_volume_is_linear_then_clipped() {
    let mut engine = created_engine();
    engine.set_volume(2.0);

    let mut quiet = vec![0.4; 480 * 2];
    engine.process_audio(&mut quiet, 480, 2);
    assert!(quiet.iter().all(|&s| (s - 0.8).abs() < 1e-6));

    let mut loud = vec![0.8; 480 * 2];
    engine.process_audio(&mut loud, 480, 2);
    assert!(loud.iter().all(|&s| s == 1.0));
}

#[test]
fn test_bass_and_treble_survive_random_noise() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut engine = created_engine();
    engine.set_bass_boost(1.0);
    engine.set_treble_boost(1.0);

    for i in 0..10_000 {
        let channels = if i % 2 == 0 { 2 } else { 1 };
        let frames = 256;
        let mut buffer = generate_noise(&mut rng, frames * channels);

        engine.process_audio(&mut buffer, frames as i32, channels as i32);

        assert_eq!(buffer.len(), frames * channels);
        assert!(
            buffer.iter().all(|s| s.is_finite() && s.abs() <= 1.0),
            "non-finite output in buffer {}",
            i
        );
    }
}

#[test]
fn test_reverb_without_wet_mix_is_dry() {
    let input = generate_sine_wave(220.0, 48000, 480, 2, 0.7);

    for preset in ReverbPreset::ALL {
        let mut engine = created_engine();
        engine.set_reverb(preset.index(), 0.0);

        for _ in 0..10 {
            let mut buffer = input.clone();
            engine.process_audio(&mut buffer, 480, 2);
            assert_close(&buffer, &input, 1e-6);
        }
    }
}

#[test]
fn test_reverb_replay_is_bit_identical() {
    let mut rng = StdRng::seed_from_u64(42);
    let blocks: Vec<Vec<f32>> = (0..40).map(|_| generate_noise(&mut rng, 480 * 2)).collect();

    let render = |engine: &mut AudioEngine| -> Vec<f32> {
        let mut out = Vec::new();
        for block in &blocks {
            let mut buffer: Vec<f32> = block.iter().map(|s| s * 0.5).collect();
            engine.process_audio(&mut buffer, 480, 2);
            out.extend(buffer);
        }
        out
    };

    for preset in [ReverbPreset::SmallRoom, ReverbPreset::LargeHall, ReverbPreset::Plate] {
        let mut engine = created_engine();
        engine.set_reverb(preset.index(), 1.0);
        let first = render(&mut engine);

        engine.destroy();
        engine.create();
        engine.set_reverb(preset.index(), 1.0);
        let second = render(&mut engine);

        assert_eq!(first, second, "{:?}", preset);
    }
}

#[test]
fn test_stereo_stages_leave_mono_untouched() {
    let mut engine = created_engine();
    engine.set_virtualizer(1.0);
    engine.set_surround_mode(SurroundMode::Movie.index());
    engine.set_surround_3d(1.0);
    engine.set_headphone_type(1);
    engine.set_channel_separation(0.0);
    engine.set_stereo_balance(1.0);

    let input = generate_sine_wave(330.0, 48000, 480, 1, 0.6);
    for _ in 0..10 {
        let mut buffer = input.clone();
        engine.process_audio(&mut buffer, 480, 1);
        assert_eq!(buffer, input);
    }
}

#[test]
fn test_time_stretch_identity() {
    let mut engine = created_engine();
    assert_eq!(engine.tempo(), 1.0);
    assert_eq!(engine.pitch_semitones(), 0.0);

    let input = generate_sine_wave(440.0, 48000, 480, 2, 0.5);
    let mut output = vec![0.0; input.len()];
    let outcome = engine.time_stretch(&input, &mut output, 2);

    assert_eq!(outcome.consumed, 480);
    assert_eq!(outcome.produced, 480);
    assert_close(&output, &input, 1e-6);
}

#[test]
fn test_time_stretch_changes_duration() {
    let mut engine = created_engine();
    engine.set_tempo(2.0);

    let input = generate_sine_wave(440.0, 48000, 24000, 2, 0.5);
    let mut produced = 0;
    let mut offset = 0;
    let mut output = vec![0.0; 480 * 2 * 4];

    while offset < input.len() {
        let end = (offset + 480 * 2).min(input.len());
        let outcome = engine.time_stretch(&input[offset..end], &mut output, 2);
        produced += outcome.produced;
        offset += outcome.consumed * 2;
        assert!(output[..outcome.produced * 2].iter().all(|s| s.is_finite()));
    }

    assert!((produced as i64 - 12000).abs() < 1500, "produced {}", produced);
}

// ============================================================================
// END-TO-END SCENARIOS
// ============================================================================

#[test]
fn test_silence_with_bass_boost_stays_silent() {
    let mut engine = created_engine();
    engine.set_bass_boost(1.0);

    let mut buffer = vec![0.0; 480 * 2];
    engine.process_audio(&mut buffer, 480, 2);
    assert!(buffer.iter().all(|&s| s == 0.0));
}

#[test]
fn test_limiter_ceiling_holds() {
    let mut engine = created_engine();
    engine.set_limiter_ceiling(0.5);

    let mut buffer = vec![0.9; 480 * 2];
    engine.process_audio(&mut buffer, 480, 2);
    assert!(buffer.iter().all(|&s| s.abs() <= 0.5));
}

#[test]
fn test_zero_volume_silences_everything() {
    let mut engine = created_engine();
    engine.set_volume(0.0);
    engine.set_bass_boost(1.0);
    engine.set_tube_warmth(1.0);
    engine.set_loudness_gain(1.0);
    engine.set_reverb(ReverbPreset::LargeHall.index(), 1.0);
    engine.set_surround_mode(SurroundMode::Game.index());

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let mut buffer = generate_noise(&mut rng, 480 * 2);
        engine.process_audio(&mut buffer, 480, 2);
        assert!(buffer.iter().all(|&s| s == 0.0));
    }
}

#[test]
fn test_uncreated_engine_never_touches_buffers() {
    let mut engine = AudioEngine::default();
    let input = generate_sine_wave(440.0, 48000, 480, 2, 0.9);
    let mut buffer = input.clone();
    engine.process_audio(&mut buffer, 480, 2);
    assert_eq!(buffer, input);

    engine.create();
    engine.set_volume(0.0);
    engine.destroy();
    engine.process_audio(&mut buffer, 480, 2);
    assert_eq!(buffer, input);
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[test]
fn test_parameters_change_while_processing() {
    let mut engine = created_engine();
    let controller = engine.controller().unwrap();
    let done = AtomicBool::new(false);

    crossbeam::scope(|s| {
        s.spawn(|_| {
            let mut rng = StdRng::seed_from_u64(99);
            while !done.load(Ordering::Relaxed) {
                controller.set_bass_boost(rng.gen_range(-0.5..1.5));
                controller.set_volume(rng.gen_range(0.0..3.0));
                controller.set_compressor_strength(rng.gen_range(0.0..1.0));
                controller.set_reverb(ReverbPreset::from_index(rng.gen_range(0..7)), rng.gen_range(0.0..1.0));
                controller.set_surround_mode(SurroundMode::from_index(rng.gen_range(0..5)));
                controller.set_stereo_balance(rng.gen_range(-1.0..1.0));
                controller.set_equalizer_band(rng.gen_range(0..10), rng.gen_range(-20.0..20.0));
            }
        });

        s.spawn(|_| {
            let mut rng = StdRng::seed_from_u64(100);
            for _ in 0..2_000 {
                let mut buffer = generate_noise(&mut rng, 256 * 2);
                engine.process_audio(&mut buffer, 256, 2);
                assert!(buffer.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
            }
            done.store(true, Ordering::Relaxed);
        });
    })
    .unwrap();

    let volume = controller.volume();
    assert!((0.0..=2.0).contains(&volume));
}

// ============================================================================
// PRESETS
// ============================================================================

#[tokio::test]
async fn test_saved_preset_restores_engine_state() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let manager = PresetManager::new(temp_dir.path().to_path_buf());

    let source = created_engine();
    source.set_bass_boost(0.4);
    source.set_reverb(ReverbPreset::MediumHall.index(), 0.25);
    source.set_surround_mode(SurroundMode::Music.index());
    source.set_equalizer_band(3, -4.0);

    let preset = EffectPreset::new("my-mix", source.settings());
    manager.save_preset(&preset).await.unwrap();

    let loaded = manager.load_preset("my-mix").await.unwrap();
    let target = created_engine();
    target.apply_settings(&loaded.settings);

    assert_eq!(target.settings(), source.settings());
    assert_eq!(target.surround_mode(), SurroundMode::Music);
}

#[test]
fn test_factory_presets_render_cleanly() {
    let input = generate_sine_wave(110.0, 48000, 480, 2, 0.9);

    for preset in EffectPreset::factory() {
        let mut engine = created_engine();
        engine.apply_settings(&preset.settings);

        for _ in 0..50 {
            let mut buffer = input.clone();
            engine.process_audio(&mut buffer, 480, 2);
            assert!(
                buffer.iter().all(|s| s.is_finite() && s.abs() <= 1.0),
                "{}",
                preset.name
            );
        }
    }
}
