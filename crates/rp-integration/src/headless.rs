//! Headless stand-in for the emulator core
//!
//! Boots any readable image, completes a frame per run block and mixes
//! silence. Lets the binding load and run inside a host without the real
//! emulator linked in.

use crate::emulator::{CoreState, EmulatorCore, SystemHost};
use crate::host::GraphicsContext;
use rp_core::{CoreParameter, CoreSettings, InitError};
use rp_input::{ControllerSink, PspButtons};
use std::path::{Path, PathBuf};

/// Default PSP CPU clock in MHz
const DEFAULT_CPU_MHZ: u32 = 222;
const SAMPLE_RATE: usize = 44_100;
/// Frames of audio per video frame at ~59.94 Hz
const SAMPLES_PER_FRAME: usize = SAMPLE_RATE * 1001 / 60_000;

/// Emulator core that produces blank frames and silence
#[derive(Debug)]
pub struct HeadlessCore {
    state: CoreState,
    booted: bool,
    settings: CoreSettings,
    asset_root: Option<PathBuf>,
    framebuffer: usize,
    buttons: PspButtons,
    analog: (f32, f32),
    cycles: i64,
    frames: u64,
    pending_audio: usize,
}

impl HeadlessCore {
    pub fn new() -> Self {
        Self {
            state: CoreState::PowerDown,
            booted: false,
            settings: CoreSettings::default(),
            asset_root: None,
            framebuffer: 0,
            buttons: PspButtons::empty(),
            analog: (0.0, 0.0),
            cycles: 0,
            frames: 0,
            pending_audio: 0,
        }
    }

    pub fn is_booted(&self) -> bool {
        self.booted
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn buttons(&self) -> PspButtons {
        self.buttons
    }

    pub fn analog(&self) -> (f32, f32) {
        self.analog
    }

    pub fn settings(&self) -> &CoreSettings {
        &self.settings
    }

    pub fn asset_root(&self) -> Option<&Path> {
        self.asset_root.as_deref()
    }

    pub fn framebuffer(&self) -> usize {
        self.framebuffer
    }

    fn cpu_mhz(&self) -> u32 {
        match self.settings.locked_cpu_speed {
            0 => DEFAULT_CPU_MHZ,
            mhz => mhz,
        }
    }
}

impl Default for HeadlessCore {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerSink for HeadlessCore {
    fn button_down(&mut self, button: PspButtons) {
        self.buttons.insert(button);
    }

    fn button_up(&mut self, button: PspButtons) {
        self.buttons.remove(button);
    }

    fn set_analog(&mut self, x: f32, y: f32) {
        self.analog = (x, y);
    }
}

impl EmulatorCore for HeadlessCore {
    fn init_graphics(&mut self, _graphics: &GraphicsContext) -> Result<(), InitError> {
        Ok(())
    }

    fn register_asset_root(&mut self, root: &Path) {
        tracing::debug!("Asset root: {}", root.display());
        self.asset_root = Some(root.to_path_buf());
    }

    fn apply_settings(&mut self, settings: &CoreSettings) {
        self.settings = settings.clone();
    }

    fn init(&mut self, params: &CoreParameter, host: &mut dyn SystemHost) -> Result<(), InitError> {
        let path = &params.file_to_start;
        std::fs::metadata(path)
            .map_err(|e| InitError::Core(format!("cannot open {}: {}", path.display(), e)))?;

        if params.enable_sound {
            host.init_sound();
        }

        tracing::info!(
            "Headless core booted {} at {}",
            path.display(),
            params.render_resolution
        );
        self.booted = true;
        self.state = CoreState::Running;
        self.cycles = 0;
        self.pending_audio = 0;
        Ok(())
    }

    fn set_target_framebuffer(&mut self, framebuffer: usize) {
        self.framebuffer = framebuffer;
    }

    fn restore_graphics_state(&mut self) {}

    fn us_to_cycles(&self, us: u64) -> i64 {
        (us * self.cpu_mhz() as u64) as i64
    }

    fn run_for_cycles(&mut self, cycles: i64) {
        if self.state != CoreState::Running {
            return;
        }
        self.cycles += cycles;
        self.frames += 1;
        self.pending_audio = SAMPLES_PER_FRAME;
        self.state = CoreState::NextFrame;
    }

    fn state(&self) -> CoreState {
        self.state
    }

    fn set_state(&mut self, state: CoreState) {
        self.state = state;
    }

    fn mix_audio(&mut self, out: &mut [i16]) -> usize {
        let frames = self.pending_audio.min(out.len() / 2);
        out[..frames * 2].fill(0);
        self.pending_audio -= frames;
        frames
    }

    fn shutdown(&mut self, host: &mut dyn SystemHost) {
        if !self.booted {
            return;
        }
        host.shutdown_sound();
        self.booted = false;
        self.state = CoreState::PowerDown;
        self.buttons = PspButtons::empty();
        tracing::info!("Headless core shut down after {} frames", self.frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::FrontendShim;

    fn booted_core() -> (HeadlessCore, FrontendShim, tempfile::NamedTempFile) {
        let image = tempfile::NamedTempFile::new().unwrap();
        let mut core = HeadlessCore::new();
        let mut shim = FrontendShim::new();
        core.init(&CoreParameter::for_game(image.path()), &mut shim)
            .unwrap();
        (core, shim, image)
    }

    #[test]
    fn test_boot_requires_image() {
        let mut core = HeadlessCore::new();
        let mut shim = FrontendShim::new();
        let params = CoreParameter::for_game(Path::new("/nonexistent/game.iso"));
        assert!(matches!(
            core.init(&params, &mut shim),
            Err(InitError::Core(_))
        ));
        assert!(!core.is_booted());
    }

    #[test]
    fn test_boot_attaches_sound() {
        let (core, shim, _image) = booted_core();
        assert!(core.is_booted());
        assert!(shim.sound_attached());
        assert_eq!(core.state(), CoreState::Running);
    }

    #[test]
    fn test_one_block_is_one_frame() {
        let (mut core, _shim, _image) = booted_core();
        let block = core.us_to_cycles(100_000);
        assert_eq!(block, 22_200_000);

        core.run_for_cycles(block);
        assert_eq!(core.state(), CoreState::NextFrame);
        assert_eq!(core.frames(), 1);
    }

    #[test]
    fn test_locked_clock_scales_cycles() {
        let mut core = HeadlessCore::new();
        let settings = CoreSettings {
            locked_cpu_speed: 333,
            ..CoreSettings::default()
        };
        core.apply_settings(&settings);
        assert_eq!(core.us_to_cycles(1), 333);
    }

    #[test]
    fn test_mixes_silence_once_per_frame() {
        let (mut core, _shim, _image) = booted_core();
        core.run_for_cycles(1);

        let mut out = vec![1i16; 8192 * 2];
        let frames = core.mix_audio(&mut out);
        assert_eq!(frames, SAMPLES_PER_FRAME);
        assert!(out[..frames * 2].iter().all(|s| *s == 0));
        assert_eq!(core.mix_audio(&mut out), 0);
    }

    #[test]
    fn test_shutdown_detaches_sound() {
        let (mut core, mut shim, _image) = booted_core();
        core.shutdown(&mut shim);
        assert!(!core.is_booted());
        assert!(!shim.sound_attached());
        assert_eq!(core.state(), CoreState::PowerDown);
    }
}
