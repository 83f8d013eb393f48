//! The host side of the plugin ABI
//!
//! [`Host`] is everything the binding asks of the embedding player: option
//! lookup, input, video/audio output and the environment negotiation calls.
//! The ABI crate implements it over raw callback pointers; tests implement it
//! in memory.

use rp_core::options::{OptionDef, OptionSource};
use rp_input::InputSource;
use std::ffi::c_char;

/// Loader for GL entry points, as handed out by the host
pub type ProcAddressFn = unsafe extern "C" fn(sym: *const c_char) -> Option<unsafe extern "C" fn()>;

/// Framebuffer pixel layouts the host may be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb1555,
    Xrgb8888,
    Rgb565,
}

impl PixelFormat {
    pub fn name(self) -> &'static str {
        match self {
            Self::Rgb1555 => "0RGB1555",
            Self::Xrgb8888 => "XRGB8888",
            Self::Rgb565 => "RGB565",
        }
    }
}

/// Hardware render context flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwContext {
    OpenGl,
    OpenGles2,
}

impl HwContext {
    /// The context this build renders with
    pub const fn preferred() -> Self {
        if cfg!(feature = "gles") {
            Self::OpenGles2
        } else {
            Self::OpenGl
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::OpenGl => "OpenGL",
            Self::OpenGles2 => "OpenGL ES 2",
        }
    }
}

/// What the binding asks for when negotiating hardware rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwRenderRequest {
    pub context: HwContext,
    pub depth: bool,
    pub stencil: bool,
    pub bottom_left_origin: bool,
}

impl HwRenderRequest {
    pub fn for_core() -> Self {
        Self {
            context: HwContext::preferred(),
            depth: true,
            stencil: false,
            bottom_left_origin: true,
        }
    }
}

/// What the host granted: the context and its GL loader
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphicsContext {
    pub context: Option<HwContext>,
    pub proc_address: Option<ProcAddressFn>,
}

/// Host callbacks and environment commands
pub trait Host: OptionSource + InputSource {
    /// Register the option table; returns whether the host took it
    fn set_variables(&mut self, defs: &[OptionDef]) -> bool;

    /// Whether any option changed since the last call
    fn variables_updated(&mut self) -> bool;

    fn system_directory(&self) -> Option<String>;

    fn username(&self) -> Option<String>;

    fn set_pixel_format(&mut self, format: PixelFormat) -> bool;

    /// Negotiate a hardware context; `None` when the host refuses
    fn set_hw_render(&mut self, request: &HwRenderRequest) -> Option<GraphicsContext>;

    /// Handle of the framebuffer the core should render into this frame
    fn current_framebuffer(&self) -> usize;

    /// Present the hardware-rendered frame
    fn video_refresh_hw(&mut self, width: u32, height: u32);

    /// Push interleaved stereo samples; returns frames consumed
    fn audio_batch(&mut self, samples: &[i16]) -> usize;

    /// Ask the host to end the session
    fn request_shutdown(&mut self);
}
