//! TOML persistence for engine configuration and effect presets
//!
//! This module provides:
//! - Engine configuration load/save with validation on load
//! - Single preset files
//! - A directory-backed preset manager

use euphoriae_core::{ConfigError, EffectPreset, EngineConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument};

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Errors that can occur while reading or writing persisted state
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid preset name: {0:?}")]
    InvalidName(String),

    #[error("Preset not found: {0}")]
    PresetNotFound(String),
}

async fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).await?;
    Ok(toml::from_str(&contents)?)
}

async fn write_toml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let toml_str = toml::to_string_pretty(value)?;
    fs::write(path, toml_str).await?;
    Ok(())
}

// ============================================================================
// ENGINE CONFIGURATION
// ============================================================================

/// Load engine configuration from TOML file
///
/// Missing fields take their defaults; the result is validated before it is
/// handed back.
#[instrument(skip(path))]
pub async fn load_engine_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig> {
    let path = path.as_ref();
    info!(path = %path.display(), "Loading engine configuration");

    let config: EngineConfig = read_toml(path).await?;
    config.validate()?;

    debug!("Engine configuration loaded successfully");
    Ok(config)
}

/// Save engine configuration to TOML file
#[instrument(skip(config, path))]
pub async fn save_engine_config<P: AsRef<Path>>(config: &EngineConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    write_toml(path, config).await?;
    info!(path = %path.display(), "Engine configuration saved");
    Ok(())
}

// ============================================================================
// PRESET FILES
// ============================================================================

/// Read a single preset file
#[instrument(skip(path))]
pub async fn read_preset<P: AsRef<Path>>(path: P) -> Result<EffectPreset> {
    let path = path.as_ref();
    let preset: EffectPreset = read_toml(path).await?;
    debug!(name = %preset.name, path = %path.display(), "Preset loaded");
    Ok(preset)
}

/// Write a single preset file, creating parent directories
#[instrument(skip(preset, path), fields(name = %preset.name))]
pub async fn write_preset<P: AsRef<Path>>(preset: &EffectPreset, path: P) -> Result<()> {
    let path = path.as_ref();
    write_toml(path, preset).await?;
    debug!(path = %path.display(), "Preset saved");
    Ok(())
}

// ============================================================================
// PRESET MANAGER
// ============================================================================

/// Preset manager
///
/// Stores one `<name>.toml` file per preset in a single directory.
pub struct PresetManager {
    preset_dir: PathBuf,
}

impl PresetManager {
    /// Create a new preset manager
    pub fn new(preset_dir: PathBuf) -> Self {
        Self { preset_dir }
    }

    pub fn preset_dir(&self) -> &Path {
        &self.preset_dir
    }

    fn preset_path(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\']);
        if !valid {
            return Err(PersistenceError::InvalidName(name.to_string()));
        }
        Ok(self.preset_dir.join(format!("{}.toml", name)))
    }

    /// List all available presets
    ///
    /// A missing directory holds no presets.
    #[instrument(skip(self))]
    pub async fn list_presets(&self) -> Result<Vec<String>> {
        let mut presets = Vec::new();

        if !fs::try_exists(&self.preset_dir).await? {
            return Ok(presets);
        }

        let mut entries = fs::read_dir(&self.preset_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "toml").unwrap_or(false) {
                if let Some(name) = path.file_stem().and_then(|n| n.to_str()) {
                    presets.push(name.to_string());
                }
            }
        }

        presets.sort();
        debug!(count = presets.len(), "Listed presets");
        Ok(presets)
    }

    /// Load a preset by name
    #[instrument(skip(self))]
    pub async fn load_preset(&self, name: &str) -> Result<EffectPreset> {
        let path = self.preset_path(name)?;

        if !fs::try_exists(&path).await? {
            return Err(PersistenceError::PresetNotFound(name.to_string()));
        }

        read_preset(&path).await
    }

    /// Save a preset under its own name
    #[instrument(skip(self, preset), fields(name = %preset.name))]
    pub async fn save_preset(&self, preset: &EffectPreset) -> Result<()> {
        let path = self.preset_path(&preset.name)?;
        write_preset(preset, &path).await
    }

    /// Delete a preset by name
    #[instrument(skip(self))]
    pub async fn delete_preset(&self, name: &str) -> Result<()> {
        let path = self.preset_path(name)?;

        if !fs::try_exists(&path).await? {
            return Err(PersistenceError::PresetNotFound(name.to_string()));
        }

        fs::remove_file(&path).await?;
        info!(name, "Preset deleted");
        Ok(())
    }

    /// Check if a preset exists
    pub async fn preset_exists(&self, name: &str) -> bool {
        match self.preset_path(name) {
            Ok(path) => fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euphoriae_core::{EffectSettings, EqualizerMode, ReverbPreset};
    use tempfile::TempDir;

    #[test]
    fn test_engine_config_partial_toml() {
        let config: EngineConfig = toml::from_str("equalizer_mode = \"per_band\"").unwrap();
        assert_eq!(config.equalizer_mode, EqualizerMode::PerBand);
        assert_eq!(config.sample_rate, 48000);
    }

    #[test]
    fn test_settings_partial_toml() {
        let settings: EffectSettings =
            toml::from_str("bass_boost = 0.5\nreverb_preset = \"plate\"\n").unwrap();
        assert_eq!(settings.bass_boost, 0.5);
        assert_eq!(settings.reverb_preset, ReverbPreset::Plate);
        assert_eq!(settings.volume, 1.0);
        assert_eq!(settings.channel_separation, 0.5);
    }

    #[test]
    fn test_preset_serialization() {
        for preset in EffectPreset::factory() {
            let toml_str = toml::to_string_pretty(&preset).unwrap();
            let parsed: EffectPreset = toml::from_str(&toml_str).unwrap();
            assert_eq!(parsed, preset);
        }
    }

    #[test]
    fn test_partial_preset_fills_defaults() {
        let toml_str = r#"
            name = "warm"

            [settings]
            tube_warmth = 0.4
            reverb_preset = "plate"
        "#;
        let preset: EffectPreset = toml::from_str(toml_str).unwrap();
        assert_eq!(preset.name, "warm");
        assert_eq!(preset.settings.tube_warmth, 0.4);
        assert_eq!(preset.settings.reverb_preset, ReverbPreset::Plate);
        assert_eq!(preset.settings.volume, 1.0);
        assert_eq!(preset.settings.channel_separation, 0.5);
    }

    #[tokio::test]
    async fn test_preset_manager() {
        let temp_dir = TempDir::new().unwrap();
        let preset_dir = temp_dir.path().join("presets");

        let manager = PresetManager::new(preset_dir.clone());
        assert!(manager.list_presets().await.unwrap().is_empty());

        let preset = EffectPreset::factory_named("night-mode").unwrap();

        // Save preset
        manager.save_preset(&preset).await.unwrap();

        // Check it exists
        assert!(manager.preset_exists("night-mode").await);

        // List presets
        let presets = manager.list_presets().await.unwrap();
        assert_eq!(presets, vec!["night-mode"]);

        // Load preset
        let loaded = manager.load_preset("night-mode").await.unwrap();
        assert_eq!(loaded, preset);

        // Delete preset
        manager.delete_preset("night-mode").await.unwrap();
        assert!(!manager.preset_exists("night-mode").await);
    }

    #[tokio::test]
    async fn test_missing_preset() {
        let temp_dir = TempDir::new().unwrap();
        let manager = PresetManager::new(temp_dir.path().to_path_buf());

        assert!(matches!(
            manager.load_preset("nope").await,
            Err(PersistenceError::PresetNotFound(_))
        ));
        assert!(matches!(
            manager.delete_preset("nope").await,
            Err(PersistenceError::PresetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_preset_name_cannot_escape_directory() {
        let temp_dir = TempDir::new().unwrap();
        let manager = PresetManager::new(temp_dir.path().to_path_buf());

        let preset = EffectPreset::new("../outside", EffectSettings::default());
        assert!(matches!(
            manager.save_preset(&preset).await,
            Err(PersistenceError::InvalidName(_))
        ));
        assert!(!manager.preset_exists("../outside").await);
    }

    #[tokio::test]
    async fn test_save_and_load_engine_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("engine.toml");

        let config = EngineConfig {
            sample_rate: 44100,
            equalizer_mode: EqualizerMode::PerBand,
            ..Default::default()
        };
        save_engine_config(&config, &config_path).await.unwrap();

        let loaded = load_engine_config(&config_path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_invalid_engine_config_is_rejected_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("engine.toml");
        fs::write(&config_path, "sample_rate = 1000").await.unwrap();

        assert!(matches!(
            load_engine_config(&config_path).await,
            Err(PersistenceError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_preset_reports_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "name = [").await.unwrap();

        let manager = PresetManager::new(temp_dir.path().to_path_buf());
        assert!(matches!(
            manager.load_preset("broken").await,
            Err(PersistenceError::TomlParse(_))
        ));
    }
}
