//! Host-visible option table
//!
//! Every option the binding registers with the host is listed here with its
//! label and its finite set of choices. The first choice is what the host
//! shows before the user touches anything. The value applied when the host
//! has nothing to say lives in [`CoreOptions`](crate::config::CoreOptions).

/// Option keys
pub mod keys {
    pub const CPU_CORE: &str = "ppsspp_cpu_core";
    pub const LOCKED_CPU_SPEED: &str = "ppsspp_locked_cpu_speed";
    pub const LANGUAGE: &str = "ppsspp_language";
    pub const RENDERING_MODE: &str = "ppsspp_rendering_mode";
    pub const AUTO_FRAMESKIP: &str = "ppsspp_auto_frameskip";
    pub const FRAMESKIP: &str = "ppsspp_frameskip";
    pub const INTERNAL_RESOLUTION: &str = "ppsspp_internal_resolution";
    pub const OUTPUT_RESOLUTION: &str = "ppsspp_output_resolution";
    pub const BUTTON_PREFERENCE: &str = "ppsspp_button_preference";
    pub const FAST_MEMORY: &str = "ppsspp_fast_memory";
    pub const TEXTURE_SCALING_LEVEL: &str = "ppsspp_texture_scaling_level";
    pub const TEXTURE_SCALING_TYPE: &str = "ppsspp_texture_scaling_type";
    pub const TEXTURE_ANISOTROPIC_FILTERING: &str = "ppsspp_texture_anisotropic_filtering";
    pub const TEXTURE_DEPOSTERIZE: &str = "ppsspp_texture_deposterize";
    pub const GPU_HARDWARE_TRANSFORM: &str = "ppsspp_gpu_hardware_transform";
    pub const VERTEX_CACHE: &str = "ppsspp_vertex_cache";
    pub const SEPARATE_CPU_THREAD: &str = "ppsspp_separate_cpu_thread";
    pub const SEPARATE_IO_THREAD: &str = "ppsspp_separate_io_thread";
    pub const UNSAFE_FUNC_REPLACEMENTS: &str = "ppsspp_unsafe_func_replacements";
    pub const SOUND_SPEEDHACK: &str = "ppsspp_sound_speedhack";
}

/// Where option values come from
///
/// The production implementation wraps the host's GET_VARIABLE and
/// GET_LANGUAGE environment commands.
pub trait OptionSource {
    /// Current value of `key`, or `None` when the host has no value for it
    fn variable(&self, key: &str) -> Option<String>;

    /// The host's UI language as a libretro language id
    fn language(&self) -> Option<u32>;
}

/// A single option as registered with the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionDef {
    pub key: &'static str,
    pub label: &'static str,
    pub choices: &'static [&'static str],
}

impl OptionDef {
    /// The value the host starts out with
    pub fn default_choice(&self) -> &'static str {
        self.choices[0]
    }

    /// Registration string in the host's `"Label; a|b|c"` format
    pub fn descriptor(&self) -> String {
        format!("{}; {}", self.label, self.choices.join("|"))
    }

    pub fn accepts(&self, value: &str) -> bool {
        self.choices.contains(&value)
    }
}

pub const TOGGLE_OFF_FIRST: &[&str] = &["disabled", "enabled"];
pub const TOGGLE_ON_FIRST: &[&str] = &["enabled", "disabled"];

pub const RESOLUTIONS: &[&str] = &[
    "480x272",
    "960x544",
    "1440x816",
    "1920x1088",
    "2400x1360",
    "2880x1632",
    "3360x1904",
    "3840x2176",
    "4320x2448",
    "4800x2720",
];

pub const LANGUAGES: &[&str] = &[
    "automatic",
    "english",
    "japanese",
    "french",
    "spanish",
    "german",
    "italian",
    "dutch",
    "portuguese",
    "russian",
    "korean",
    "chinese_traditional",
    "chinese_simplified",
];

#[cfg(not(feature = "gles"))]
pub const ANISOTROPY_LEVELS: &[&str] = &["off", "1x", "2x", "3x", "4x", "5x"];

// GLES2 contexts are not guaranteed to carry the anisotropic filtering extension
#[cfg(feature = "gles")]
pub const ANISOTROPY_LEVELS: &[&str] = &["off"];

/// Every option registered with the host, in registration order
pub const OPTION_DEFS: &[OptionDef] = &[
    OptionDef {
        key: keys::CPU_CORE,
        label: "CPU Core",
        choices: &["jit", "interpreter"],
    },
    OptionDef {
        key: keys::LOCKED_CPU_SPEED,
        label: "Locked CPU Speed",
        choices: &["off", "222MHz", "266MHz", "333MHz"],
    },
    OptionDef {
        key: keys::LANGUAGE,
        label: "Language",
        choices: LANGUAGES,
    },
    OptionDef {
        key: keys::RENDERING_MODE,
        label: "Rendering Mode",
        choices: &[
            "buffered",
            "nonbuffered",
            "read_framebuffers_to_memory_cpu",
            "read_framebuffers_to_memory_gpu",
        ],
    },
    OptionDef {
        key: keys::AUTO_FRAMESKIP,
        label: "Auto Frameskip",
        choices: TOGGLE_OFF_FIRST,
    },
    OptionDef {
        key: keys::FRAMESKIP,
        label: "Frameskip",
        choices: &["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"],
    },
    OptionDef {
        key: keys::INTERNAL_RESOLUTION,
        label: "Internal Resolution",
        choices: RESOLUTIONS,
    },
    OptionDef {
        key: keys::OUTPUT_RESOLUTION,
        label: "Output Resolution",
        choices: RESOLUTIONS,
    },
    OptionDef {
        key: keys::BUTTON_PREFERENCE,
        label: "Confirmation Button",
        choices: &["cross", "circle"],
    },
    OptionDef {
        key: keys::FAST_MEMORY,
        label: "Fast Memory (Speedhack)",
        choices: TOGGLE_OFF_FIRST,
    },
    OptionDef {
        key: keys::TEXTURE_SCALING_LEVEL,
        label: "Texture Scaling Level",
        choices: &["0", "1", "2", "3", "4", "5"],
    },
    OptionDef {
        key: keys::TEXTURE_SCALING_TYPE,
        label: "Texture Scaling Type",
        choices: &["xbrz", "hybrid", "bicubic", "hybrid_bicubic"],
    },
    OptionDef {
        key: keys::TEXTURE_ANISOTROPIC_FILTERING,
        label: "Anisotropic Filtering",
        choices: ANISOTROPY_LEVELS,
    },
    OptionDef {
        key: keys::TEXTURE_DEPOSTERIZE,
        label: "Texture Deposterize",
        choices: TOGGLE_OFF_FIRST,
    },
    OptionDef {
        key: keys::GPU_HARDWARE_TRANSFORM,
        label: "GPU Hardware T&L",
        choices: TOGGLE_ON_FIRST,
    },
    OptionDef {
        key: keys::VERTEX_CACHE,
        label: "Vertex Cache (Speedhack)",
        choices: TOGGLE_OFF_FIRST,
    },
    OptionDef {
        key: keys::SEPARATE_CPU_THREAD,
        label: "CPU Threading",
        choices: TOGGLE_OFF_FIRST,
    },
    OptionDef {
        key: keys::SEPARATE_IO_THREAD,
        label: "IO Threading",
        choices: TOGGLE_OFF_FIRST,
    },
    OptionDef {
        key: keys::UNSAFE_FUNC_REPLACEMENTS,
        label: "Unsafe FuncReplacements",
        choices: TOGGLE_ON_FIRST,
    },
    OptionDef {
        key: keys::SOUND_SPEEDHACK,
        label: "Sound Speedhack",
        choices: TOGGLE_OFF_FIRST,
    },
];

/// Look up an option definition by key
pub fn find(key: &str) -> Option<&'static OptionDef> {
    OPTION_DEFS.iter().find(|def| def.key == key)
}

/// Parse an `enabled`/`disabled` toggle
pub(crate) fn parse_toggle(value: &str) -> Option<bool> {
    match value {
        "enabled" => Some(true),
        "disabled" => Some(false),
        _ => None,
    }
}

/// Parse a decimal level in `0..=max`
pub(crate) fn parse_level(value: &str, max: u8) -> Option<u8> {
    value.parse::<u8>().ok().filter(|level| *level <= max)
}
