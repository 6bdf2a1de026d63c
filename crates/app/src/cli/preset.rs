//! `euphoriae preset` subcommands

use crate::Format;
use anyhow::{Context, Result};
use euphoriae_core::EffectPreset;
use euphoriae_infra::{read_preset, write_preset, PresetManager};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Resolve a preset by factory name, saved name, then file path
pub async fn resolve(name: &str, dir: Option<&Path>) -> Result<EffectPreset> {
    if let Some(preset) = EffectPreset::factory_named(name) {
        return Ok(preset);
    }

    if let Some(dir) = dir {
        let manager = PresetManager::new(dir.to_path_buf());
        if manager.preset_exists(name).await {
            return Ok(manager.load_preset(name).await?);
        }
    }

    read_preset(name)
        .await
        .with_context(|| format!("no factory or saved preset named {:?}", name))
}

fn encode(preset: &EffectPreset, format: Format) -> Result<String> {
    Ok(match format {
        Format::Toml => toml::to_string_pretty(preset)?,
        Format::Json => serde_json::to_string_pretty(preset)?,
    })
}

pub async fn list(dir: Option<PathBuf>) -> Result<()> {
    println!("Factory presets:");
    for preset in EffectPreset::factory() {
        println!("  {}", preset.name);
    }

    if let Some(dir) = dir {
        let manager = PresetManager::new(dir.clone());
        let saved = manager
            .list_presets()
            .await
            .with_context(|| format!("listing presets in {}", dir.display()))?;
        println!("Saved presets in {}:", dir.display());
        for name in saved {
            println!("  {}", name);
        }
    }

    Ok(())
}

pub async fn show(name: &str, dir: Option<PathBuf>, format: Format) -> Result<()> {
    let preset = resolve(name, dir.as_deref()).await?;
    print!("{}", encode(&preset, format)?);
    if matches!(format, Format::Json) {
        println!();
    }
    Ok(())
}

pub async fn export(name: &str, dir: Option<PathBuf>, output: &Path, format: Format) -> Result<()> {
    let preset = resolve(name, dir.as_deref()).await?;

    match format {
        Format::Toml => write_preset(&preset, output).await?,
        Format::Json => {
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(output, encode(&preset, format)?)
                .await
                .with_context(|| format!("writing {}", output.display()))?;
        }
    }

    info!(name = %preset.name, path = %output.display(), "Preset exported");
    Ok(())
}
