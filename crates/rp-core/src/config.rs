//! Configuration system for the retropsp binding
//!
//! Three records live here:
//! - [`CoreOptions`]: the host-facing options, parsed from string variables
//! - [`CoreSettings`]: the emulator core's global settings object
//! - [`CoreParameter`]: per-session boot parameters

use crate::error::Result;
use crate::options::{self, keys, OptionSource};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// Name of the settings file inside the session root
pub const SETTINGS_FILE_NAME: &str = "retropsp.toml";

/// CPU execution mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum CpuCore {
    Interpreter,
    #[default]
    Jit,
}

/// GPU backend handed to the core at boot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum GpuCore {
    Null,
    #[default]
    Gles,
}

/// Framebuffer handling mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[repr(i32)]
pub enum RenderingMode {
    NonBuffered = 0,
    #[default]
    Buffered = 1,
    ReadFramebuffersCpu = 2,
    ReadFramebuffersGpu = 3,
}

/// Which face button confirms in system dialogs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum ButtonPreference {
    Circle,
    #[default]
    Cross,
}

impl ButtonPreference {
    /// System parameter value understood by the PSP firmware
    pub fn system_param(self) -> i32 {
        match self {
            Self::Circle => 0,
            Self::Cross => 1,
        }
    }
}

/// Texture upscaling algorithm
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[repr(i32)]
pub enum TextureScalingType {
    #[default]
    Xbrz = 0,
    Hybrid = 1,
    Bicubic = 2,
    HybridBicubic = 3,
}

/// PSP system language, numbered as the firmware numbers them
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[repr(i32)]
pub enum PspLanguage {
    Japanese = 0,
    #[default]
    English = 1,
    French = 2,
    Spanish = 3,
    German = 4,
    Italian = 5,
    Dutch = 6,
    Portuguese = 7,
    Russian = 8,
    Korean = 9,
    ChineseTraditional = 10,
    ChineseSimplified = 11,
}

impl PspLanguage {
    /// Map a libretro language id onto the closest PSP language
    pub fn from_host(id: u32) -> Option<Self> {
        let language = match id {
            0 => Self::English,
            1 => Self::Japanese,
            2 => Self::French,
            3 => Self::Spanish,
            4 => Self::German,
            5 => Self::Italian,
            6 => Self::Dutch,
            // Brazilian and European Portuguese
            7 | 8 => Self::Portuguese,
            9 => Self::Russian,
            10 => Self::Korean,
            11 => Self::ChineseTraditional,
            12 => Self::ChineseSimplified,
            _ => return None,
        };
        Some(language)
    }

    fn from_option(value: &str) -> Option<Self> {
        let language = match value {
            "english" => Self::English,
            "japanese" => Self::Japanese,
            "french" => Self::French,
            "spanish" => Self::Spanish,
            "german" => Self::German,
            "italian" => Self::Italian,
            "dutch" => Self::Dutch,
            "portuguese" => Self::Portuguese,
            "russian" => Self::Russian,
            "korean" => Self::Korean,
            "chinese_traditional" => Self::ChineseTraditional,
            "chinese_simplified" => Self::ChineseSimplified,
            _ => return None,
        };
        Some(language)
    }

    /// Follow the host's UI language, English when it has none the PSP knows
    pub fn automatic(source: &dyn OptionSource) -> Self {
        source
            .language()
            .and_then(Self::from_host)
            .unwrap_or_default()
    }
}

/// A `width x height` pair in pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Native PSP screen size
    pub const NATIVE: Self = Self {
        width: 480,
        height: 272,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Largest width or height the core accepts; sizes cross the C boundary
    /// as signed ints
    pub const MAX_DIMENSION: u32 = i32::MAX as u32;

    /// Parse `"960x544"`; both sides must be integers in
    /// `1..=MAX_DIMENSION`
    pub fn parse(value: &str) -> Option<Self> {
        let in_range = |v: &u32| (1..=Self::MAX_DIMENSION).contains(v);
        let (width, height) = value.trim().split_once('x')?;
        let width = width.trim().parse::<u32>().ok().filter(in_range)?;
        let height = height.trim().parse::<u32>().ok().filter(in_range)?;
        Some(Self { width, height })
    }

    /// Parse, falling back to the native screen size
    pub fn parse_or_native(value: &str) -> Self {
        Self::parse(value).unwrap_or(Self::NATIVE)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::NATIVE
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Options exposed to the host, after parsing
///
/// Every field has a documented default that applies when the host has no
/// value for the key or offers a value outside the option's domain.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreOptions {
    pub cpu_core: CpuCore,
    /// Locked CPU clock in MHz, 0 when unlocked
    pub locked_cpu_speed: u32,
    pub language: PspLanguage,
    pub rendering_mode: RenderingMode,
    pub auto_frameskip: bool,
    pub frameskip: u8,
    pub internal_resolution: Resolution,
    pub output_resolution: Resolution,
    pub button_preference: ButtonPreference,
    pub fast_memory: bool,
    pub texture_scaling_level: u8,
    pub texture_scaling_type: TextureScalingType,
    pub anisotropy_level: u8,
    pub texture_deposterize: bool,
    pub hardware_transform: bool,
    pub vertex_cache: bool,
    pub separate_cpu_thread: bool,
    pub separate_io_thread: bool,
    pub unsafe_func_replacements: bool,
    pub sound_speedhack: bool,
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self {
            cpu_core: CpuCore::Jit,
            locked_cpu_speed: 0,
            language: PspLanguage::English,
            rendering_mode: RenderingMode::Buffered,
            auto_frameskip: false,
            frameskip: 0,
            internal_resolution: Resolution::NATIVE,
            output_resolution: Resolution::NATIVE,
            button_preference: ButtonPreference::Cross,
            fast_memory: false,
            texture_scaling_level: 1,
            texture_scaling_type: TextureScalingType::Xbrz,
            anisotropy_level: 0,
            texture_deposterize: false,
            hardware_transform: true,
            vertex_cache: false,
            separate_cpu_thread: false,
            separate_io_thread: false,
            unsafe_func_replacements: true,
            sound_speedhack: false,
        }
    }
}

/// Reads one key and parses it, reporting values that fell back to default
struct Reader<'a> {
    source: &'a dyn OptionSource,
}

impl Reader<'_> {
    fn read<T>(&self, key: &str, default: T, parse: impl FnOnce(&str) -> Option<T>) -> T {
        match self.source.variable(key) {
            Some(value) => {
                if !Self::advertised(key, &value) {
                    tracing::debug!(
                        key,
                        value = value.as_str(),
                        "Option value was never offered to the host"
                    );
                }
                parse(&value).unwrap_or_else(|| {
                    tracing::debug!(
                        key,
                        value = value.as_str(),
                        "Unrecognized option value, using default"
                    );
                    default
                })
            }
            None => default,
        }
    }

    /// Whether `value` is one of the choices registered for `key`
    fn advertised(key: &str, value: &str) -> bool {
        options::find(key).is_some_and(|def| def.accepts(value))
    }

    fn toggle(&self, key: &str, default: bool) -> bool {
        self.read(key, default, options::parse_toggle)
    }
}

impl CoreOptions {
    /// Read every recognized key from `source`
    ///
    /// Never fails: absent or malformed values take the default. Calling this
    /// twice against the same host state yields equal results.
    pub fn from_source(source: &dyn OptionSource) -> Self {
        let defaults = Self::default();
        let reader = Reader { source };

        let cpu_core = reader.read(keys::CPU_CORE, defaults.cpu_core, |v| match v {
            "jit" => Some(CpuCore::Jit),
            "interpreter" => Some(CpuCore::Interpreter),
            _ => None,
        });

        let locked_cpu_speed =
            reader.read(keys::LOCKED_CPU_SPEED, defaults.locked_cpu_speed, |v| match v {
                "off" => Some(0),
                "222MHz" => Some(222),
                "266MHz" => Some(266),
                "333MHz" => Some(333),
                _ => None,
            });

        // "automatic" and anything unrecognized follow the host language
        let language = match source.variable(keys::LANGUAGE) {
            Some(value) => PspLanguage::from_option(&value)
                .unwrap_or_else(|| PspLanguage::automatic(source)),
            None => PspLanguage::automatic(source),
        };

        let rendering_mode =
            reader.read(keys::RENDERING_MODE, defaults.rendering_mode, |v| match v {
                "nonbuffered" => Some(RenderingMode::NonBuffered),
                "buffered" => Some(RenderingMode::Buffered),
                "read_framebuffers_to_memory_cpu" => Some(RenderingMode::ReadFramebuffersCpu),
                "read_framebuffers_to_memory_gpu" => Some(RenderingMode::ReadFramebuffersGpu),
                _ => None,
            });

        let button_preference =
            reader.read(keys::BUTTON_PREFERENCE, defaults.button_preference, |v| match v {
                "cross" => Some(ButtonPreference::Cross),
                "circle" => Some(ButtonPreference::Circle),
                _ => None,
            });

        let texture_scaling_type = reader.read(
            keys::TEXTURE_SCALING_TYPE,
            defaults.texture_scaling_type,
            |v| match v {
                "xbrz" => Some(TextureScalingType::Xbrz),
                "hybrid" => Some(TextureScalingType::Hybrid),
                "bicubic" => Some(TextureScalingType::Bicubic),
                "hybrid_bicubic" => Some(TextureScalingType::HybridBicubic),
                _ => None,
            },
        );

        let anisotropy_level = reader.read(
            keys::TEXTURE_ANISOTROPIC_FILTERING,
            defaults.anisotropy_level,
            parse_anisotropy,
        );

        Self {
            cpu_core,
            locked_cpu_speed,
            language,
            rendering_mode,
            auto_frameskip: reader.toggle(keys::AUTO_FRAMESKIP, defaults.auto_frameskip),
            frameskip: reader.read(keys::FRAMESKIP, defaults.frameskip, |v| {
                options::parse_level(v, 9)
            }),
            internal_resolution: reader.read(
                keys::INTERNAL_RESOLUTION,
                defaults.internal_resolution,
                Resolution::parse,
            ),
            output_resolution: reader.read(
                keys::OUTPUT_RESOLUTION,
                defaults.output_resolution,
                Resolution::parse,
            ),
            button_preference,
            fast_memory: reader.toggle(keys::FAST_MEMORY, defaults.fast_memory),
            texture_scaling_level: reader.read(
                keys::TEXTURE_SCALING_LEVEL,
                defaults.texture_scaling_level,
                |v| options::parse_level(v, 5),
            ),
            texture_scaling_type,
            anisotropy_level,
            texture_deposterize: reader
                .toggle(keys::TEXTURE_DEPOSTERIZE, defaults.texture_deposterize),
            hardware_transform: reader
                .toggle(keys::GPU_HARDWARE_TRANSFORM, defaults.hardware_transform),
            vertex_cache: reader.toggle(keys::VERTEX_CACHE, defaults.vertex_cache),
            separate_cpu_thread: reader
                .toggle(keys::SEPARATE_CPU_THREAD, defaults.separate_cpu_thread),
            separate_io_thread: reader
                .toggle(keys::SEPARATE_IO_THREAD, defaults.separate_io_thread),
            unsafe_func_replacements: reader.toggle(
                keys::UNSAFE_FUNC_REPLACEMENTS,
                defaults.unsafe_func_replacements,
            ),
            sound_speedhack: reader.toggle(keys::SOUND_SPEEDHACK, defaults.sound_speedhack),
        }
    }

    /// Copy the parsed options into the core's settings and boot parameters
    pub fn apply(&self, settings: &mut CoreSettings, params: &mut CoreParameter) {
        settings.language = self.language;
        settings.button_preference = self.button_preference;
        settings.locked_cpu_speed = self.locked_cpu_speed;
        settings.rendering_mode = self.rendering_mode;
        settings.auto_frameskip = self.auto_frameskip;
        settings.frameskip = self.frameskip;
        settings.fast_memory = self.fast_memory;
        settings.texture_scaling_level = self.texture_scaling_level;
        settings.texture_scaling_type = self.texture_scaling_type;
        settings.anisotropy_level = self.anisotropy_level;
        settings.texture_deposterize = self.texture_deposterize;
        settings.hardware_transform = self.hardware_transform;
        settings.vertex_cache = self.vertex_cache;
        settings.separate_cpu_thread = self.separate_cpu_thread;
        settings.separate_io_thread = self.separate_io_thread;
        settings.unsafe_func_replacements = self.unsafe_func_replacements;
        settings.sound_speedhack = self.sound_speedhack;

        params.cpu_core = self.cpu_core;
        params.render_resolution = self.internal_resolution;
        params.pixel_resolution = self.output_resolution;
    }
}

#[cfg(not(feature = "gles"))]
fn parse_anisotropy(value: &str) -> Option<u8> {
    match value {
        "off" => Some(0),
        "1x" => Some(1),
        "2x" => Some(2),
        "3x" => Some(3),
        "4x" => Some(4),
        "5x" => Some(5),
        _ => None,
    }
}

#[cfg(feature = "gles")]
fn parse_anisotropy(_value: &str) -> Option<u8> {
    Some(0)
}

/// Storage locations handed to the core
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathConfig {
    pub current: PathBuf,
    pub external: PathBuf,
    pub memstick: PathBuf,
    pub flash0: PathBuf,
    pub internal_data: PathBuf,
}

impl PathConfig {
    /// Lay every directory out under `root`, which ends in a separator
    pub fn rooted_at(root: &str) -> Self {
        let root_path = PathBuf::from(root);
        Self {
            current: root_path.clone(),
            external: root_path.clone(),
            memstick: root_path.clone(),
            flash0: PathBuf::from(format!("{root}flash0{MAIN_SEPARATOR}")),
            internal_data: root_path,
        }
    }
}

/// The emulator core's global settings object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoreSettings {
    pub language: PspLanguage,
    pub button_preference: ButtonPreference,
    pub locked_cpu_speed: u32,
    pub rendering_mode: RenderingMode,
    pub auto_frameskip: bool,
    pub frameskip: u8,
    pub fast_memory: bool,
    pub texture_scaling_level: u8,
    pub texture_scaling_type: TextureScalingType,
    pub anisotropy_level: u8,
    pub texture_deposterize: bool,
    pub hardware_transform: bool,
    pub vertex_cache: bool,
    pub separate_cpu_thread: bool,
    pub separate_io_thread: bool,
    pub unsafe_func_replacements: bool,
    pub sound_speedhack: bool,
    pub nickname: String,
    pub audio_latency: u32,
    pub encrypt_save: bool,
    pub enable_wlan: bool,
    pub show_fps_counter: bool,
    pub vertex_decoder_jit: bool,
    pub frameskip_unthrottle: bool,
    pub vsync: bool,
    pub paths: PathConfig,
}

impl Default for CoreSettings {
    fn default() -> Self {
        let options = CoreOptions::default();
        Self {
            language: options.language,
            button_preference: options.button_preference,
            locked_cpu_speed: options.locked_cpu_speed,
            rendering_mode: options.rendering_mode,
            auto_frameskip: options.auto_frameskip,
            frameskip: options.frameskip,
            fast_memory: options.fast_memory,
            texture_scaling_level: options.texture_scaling_level,
            texture_scaling_type: options.texture_scaling_type,
            anisotropy_level: options.anisotropy_level,
            texture_deposterize: options.texture_deposterize,
            hardware_transform: options.hardware_transform,
            vertex_cache: options.vertex_cache,
            separate_cpu_thread: options.separate_cpu_thread,
            separate_io_thread: options.separate_io_thread,
            unsafe_func_replacements: options.unsafe_func_replacements,
            sound_speedhack: options.sound_speedhack,
            nickname: "PPSSPP".to_string(),
            audio_latency: 1,
            encrypt_save: true,
            enable_wlan: false,
            show_fps_counter: false,
            vertex_decoder_jit: true,
            frameskip_unthrottle: false,
            vsync: false,
            paths: PathConfig::default(),
        }
    }
}

impl CoreSettings {
    /// Load settings from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load settings from `path`, using defaults when it is missing or broken
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match Self::load(path) {
            Ok(settings) => {
                tracing::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                tracing::warn!("Ignoring settings file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Fixed values every embedded session runs with
    pub fn apply_embedding(&mut self, cpu_core: CpuCore) {
        self.show_fps_counter = false;
        self.vertex_decoder_jit = cpu_core == CpuCore::Jit;
        self.frameskip_unthrottle = false;
        self.vsync = false;
    }
}

/// Per-session boot parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreParameter {
    pub cpu_core: CpuCore,
    pub gpu_core: GpuCore,
    /// Internal render target size
    pub render_resolution: Resolution,
    /// Size of the image handed to the host
    pub pixel_resolution: Resolution,
    pub file_to_start: PathBuf,
    pub mount_iso: String,
    pub enable_sound: bool,
    pub start_paused: bool,
    pub printf_emu_log: bool,
    pub headless: bool,
    pub unthrottle: bool,
}

impl Default for CoreParameter {
    fn default() -> Self {
        Self {
            cpu_core: CpuCore::Jit,
            gpu_core: GpuCore::Gles,
            render_resolution: Resolution::NATIVE,
            pixel_resolution: Resolution::NATIVE,
            file_to_start: PathBuf::new(),
            mount_iso: String::new(),
            enable_sound: true,
            start_paused: false,
            printf_emu_log: false,
            headless: true,
            unthrottle: true,
        }
    }
}

impl CoreParameter {
    /// Boot parameters for running `game` inside the host
    pub fn for_game(game: &Path) -> Self {
        Self {
            file_to_start: game.to_path_buf(),
            ..Self::default()
        }
    }
}
