//! Core types for the retropsp libretro binding
//!
//! This crate provides the error types, the host option table, the
//! settings/boot-parameter records handed to the emulator core, and the
//! bridge that forwards `tracing` events to the host's log interface.

pub mod config;
pub mod error;
pub mod logging;
pub mod options;

pub use config::{
    ButtonPreference, CoreOptions, CoreParameter, CoreSettings, CpuCore, GpuCore, PathConfig,
    PspLanguage, RenderingMode, Resolution, TextureScalingType,
};
pub use error::{BridgeError, InitError, NegotiationError, Result};
pub use options::{OptionDef, OptionSource, OPTION_DEFS};
