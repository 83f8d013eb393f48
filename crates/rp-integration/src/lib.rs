//! Frontend integration layer for the retropsp libretro binding
//!
//! This crate ties the host's callbacks to the emulator core: lifecycle,
//! option negotiation and the per-frame run loop.

pub mod emulator;
pub mod frontend;
pub mod headless;
pub mod host;
pub mod runner;

pub use emulator::{CoreState, EmulatorCore, FrontendShim, SystemHost};
pub use frontend::{register_options, AvInfo, Frontend, SystemInfo};
pub use headless::HeadlessCore;
pub use host::{GraphicsContext, HwContext, HwRenderRequest, Host, PixelFormat};
pub use runner::{FrameContext, FrameRunner, RunnerState};
