//! Adapters around the Euphoriae engine
//!
//! The core crate holds no persisted state. This crate is where engine
//! configuration and effect presets meet the filesystem.

pub mod persistence;

pub use persistence::{
    load_engine_config, read_preset, save_engine_config, write_preset, PersistenceError,
    PresetManager,
};
