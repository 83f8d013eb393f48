//! The emulator core as seen from the binding
//!
//! The wrapped emulator is an opaque collaborator: it is booted with a
//! [`CoreParameter`], stepped in blocks of cycles until it reaches a frame
//! boundary, and talks back through the [`SystemHost`] hooks.

use crate::host::GraphicsContext;
use rp_core::{CoreParameter, CoreSettings, InitError};
use rp_input::ControllerSink;
use std::path::Path;

/// Run state reported by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreState {
    /// Executing; keep stepping
    Running,
    /// One display frame completed
    NextFrame,
    /// Halted under a debugger
    Stepping,
    /// The emulated system powered off
    PowerDown,
    /// The core hit an unrecoverable error
    Error,
}

/// Entry points consumed from the emulator core
pub trait EmulatorCore: ControllerSink {
    /// Load GL entry points through the host's loader
    fn init_graphics(&mut self, graphics: &GraphicsContext) -> Result<(), InitError>;

    /// Root of the asset filesystem
    fn register_asset_root(&mut self, root: &Path);

    /// Replace the core's global settings object
    fn apply_settings(&mut self, settings: &CoreSettings);

    /// Boot the game described by `params`
    fn init(&mut self, params: &CoreParameter, host: &mut dyn SystemHost) -> Result<(), InitError>;

    fn set_target_framebuffer(&mut self, framebuffer: usize);

    /// Put back the GL state the core expects; the host shares the context
    /// and may have changed it since the last frame
    fn restore_graphics_state(&mut self);

    /// Emulated CPU cycles in `us` microseconds
    fn us_to_cycles(&self, us: u64) -> i64;

    fn run_for_cycles(&mut self, cycles: i64);

    fn state(&self) -> CoreState;

    fn set_state(&mut self, state: CoreState);

    /// Mix pending audio into `out` as interleaved stereo; returns frames written
    fn mix_audio(&mut self, out: &mut [i16]) -> usize;

    fn shutdown(&mut self, host: &mut dyn SystemHost);
}

/// Host abstraction the core calls into
///
/// Every hook has a no-op default; an embedding overrides what it needs.
pub trait SystemHost {
    fn update_ui(&mut self) {}
    fn update_mem_view(&mut self) {}
    fn update_disassembly(&mut self) {}
    fn set_debug_mode(&mut self, _mode: bool) {}

    fn init_gl(&mut self) -> Result<(), String> {
        Ok(())
    }
    fn shutdown_gl(&mut self) {}

    fn init_sound(&mut self) {}
    fn update_sound(&mut self) {}
    fn shutdown_sound(&mut self) {}

    fn boot_done(&mut self) {}

    fn is_debugging_enabled(&self) -> bool {
        false
    }
    fn attempt_load_symbol_map(&mut self) -> bool {
        false
    }
    fn reset_symbol_map(&mut self) {}
    fn add_symbol(&mut self, _name: &str, _addr: u32, _size: u32, _kind: i32) {}
    fn set_window_title(&mut self, _title: &str) {}
}

/// The binding's [`SystemHost`]: only the sound hookup does anything
#[derive(Debug, Default)]
pub struct FrontendShim {
    sound_attached: bool,
    booted: bool,
}

impl FrontendShim {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the core's mixer is hooked up
    pub fn sound_attached(&self) -> bool {
        self.sound_attached
    }

    pub fn booted(&self) -> bool {
        self.booted
    }
}

impl SystemHost for FrontendShim {
    fn init_sound(&mut self) {
        tracing::debug!("Core mixer attached");
        self.sound_attached = true;
    }

    fn shutdown_sound(&mut self) {
        tracing::debug!("Core mixer detached");
        self.sound_attached = false;
    }

    fn boot_done(&mut self) {
        self.booted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl SystemHost for Silent {}

    #[test]
    fn test_default_hooks_are_inert() {
        let mut host = Silent;
        host.update_ui();
        host.add_symbol("main", 0x0880_0000, 4, 0);
        assert!(host.init_gl().is_ok());
        assert!(!host.is_debugging_enabled());
        assert!(!host.attempt_load_symbol_map());
    }

    #[test]
    fn test_shim_sound_hookup() {
        let mut shim = FrontendShim::new();
        assert!(!shim.sound_attached());

        shim.init_sound();
        assert!(shim.sound_attached());

        shim.shutdown_sound();
        assert!(!shim.sound_attached());
    }
}
