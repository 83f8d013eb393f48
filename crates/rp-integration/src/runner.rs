//! Per-frame run loop
//!
//! The host calls in once per displayed frame. [`FrameRunner`] owns the
//! session state machine:
//!
//! ```text
//! Uninitialized -> Ready -> Running -> (Resetting -> Ready) | Shutdown
//! ```
//!
//! Bring-up is deferred to the first frame because the host's GL context is
//! only guaranteed to be current inside the run call. A reset request only
//! raises a flag; the teardown happens at the start of the next frame.

use crate::emulator::{CoreState, EmulatorCore, FrontendShim, SystemHost};
use crate::host::GraphicsContext;
use rp_core::{CoreParameter, InitError, Resolution};
use rp_input::PadState;

/// Emulated time per `run_for_cycles` block; the core normally breaks out
/// at the frame boundary long before a block runs out
pub const BLOCK_DURATION_US: u64 = 1_000_000 / 10;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// Loaded, core not booted yet
    Uninitialized,
    /// Core booted, no frame run since
    Ready,
    /// Frames are being produced
    Running,
    /// Core torn down for a reset, about to boot again
    Resetting,
    /// Session over; frames are ignored
    Shutdown,
}

/// Transient per-frame state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Input snapshot, overwritten every frame
    pub pad: PadState,
    /// Host framebuffer handle for this frame
    pub framebuffer: usize,
    /// Size of the presented image
    pub output: Resolution,
    /// Set by a host reset request, consumed by the next frame
    pub reset_pending: bool,
}

impl Default for FrameContext {
    fn default() -> Self {
        Self {
            pad: PadState::new(),
            framebuffer: 0,
            output: Resolution::NATIVE,
            reset_pending: false,
        }
    }
}

/// Drives the emulator core one frame at a time
pub struct FrameRunner {
    state: RunnerState,
    frame: FrameContext,
    /// GL entry points are loaded once per runner, not per boot
    graphics_ready: bool,
    /// Transitions taken during the current frame
    transitions: Vec<(RunnerState, RunnerState)>,
    frame_count: u64,
}

impl FrameRunner {
    pub fn new() -> Self {
        Self {
            state: RunnerState::Uninitialized,
            frame: FrameContext::default(),
            graphics_ready: false,
            transitions: Vec::new(),
            frame_count: 0,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn frame(&self) -> &FrameContext {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut FrameContext {
        &mut self.frame
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// State changes made while processing the most recent frame
    pub fn frame_transitions(&self) -> &[(RunnerState, RunnerState)] {
        &self.transitions
    }

    pub fn is_shutdown(&self) -> bool {
        self.state == RunnerState::Shutdown
    }

    fn transition(&mut self, to: RunnerState) {
        let from = self.state;
        tracing::debug!("Runner state: {:?} -> {:?}", from, to);
        self.transitions.push((from, to));
        self.state = to;
    }

    /// Defer a reset to the next frame
    pub fn request_reset(&mut self) {
        if self.state == RunnerState::Shutdown {
            return;
        }
        tracing::info!("Reset requested, applying at next frame");
        self.frame.reset_pending = true;
    }

    /// Start bookkeeping for a new frame
    pub fn begin_frame(&mut self) {
        self.transitions.clear();
    }

    /// Apply a pending reset, then boot the core if it is not running
    ///
    /// Any failure here ends the session; the caller asks the host to shut
    /// down.
    pub fn prepare<C: EmulatorCore>(
        &mut self,
        core: &mut C,
        shim: &mut FrontendShim,
        params: &CoreParameter,
        graphics: &GraphicsContext,
    ) -> Result<(), InitError> {
        if self.frame.reset_pending
            && matches!(self.state, RunnerState::Ready | RunnerState::Running)
        {
            core.shutdown(shim);
            self.transition(RunnerState::Resetting);
        }

        if !matches!(
            self.state,
            RunnerState::Uninitialized | RunnerState::Resetting
        ) {
            return Ok(());
        }
        self.frame.reset_pending = false;

        if !self.graphics_ready {
            if let Err(e) = core.init_graphics(graphics) {
                self.transition(RunnerState::Shutdown);
                return Err(e);
            }
            self.graphics_ready = true;
        }

        if let Err(e) = core.init(params, shim) {
            self.transition(RunnerState::Shutdown);
            return Err(e);
        }
        shim.boot_done();
        self.transition(RunnerState::Ready);
        Ok(())
    }

    /// Step the core until it completes one display frame
    ///
    /// Blocks until the core reports a frame boundary; a core that never
    /// reaches one never returns.
    pub fn run_to_frame_boundary<C: EmulatorCore>(&mut self, core: &mut C) {
        match self.state {
            RunnerState::Ready => self.transition(RunnerState::Running),
            RunnerState::Running => {}
            other => {
                tracing::warn!("Frame requested in state {:?}", other);
                return;
            }
        }

        core.restore_graphics_state();
        let block = core.us_to_cycles(BLOCK_DURATION_US);
        while core.state() == CoreState::Running {
            core.run_for_cycles(block);
        }

        match core.state() {
            // Let the core continue where it yielded on the next call
            CoreState::NextFrame => core.set_state(CoreState::Running),
            other => tracing::debug!("Core stopped at {:?}", other),
        }
        self.frame_count += 1;
    }

    /// End the session; later frames are ignored
    pub fn shutdown<C: EmulatorCore>(&mut self, core: &mut C, host: &mut dyn SystemHost) {
        match self.state {
            RunnerState::Shutdown => return,
            RunnerState::Ready | RunnerState::Running => core.shutdown(host),
            RunnerState::Uninitialized | RunnerState::Resetting => {}
        }
        self.frame.reset_pending = false;
        self.transition(RunnerState::Shutdown);
    }
}

impl Default for FrameRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rp_core::CoreSettings;
    use rp_input::{ControllerSink, PspButtons};
    use std::path::Path;

    /// Reaches a frame boundary after `blocks_per_frame` blocks
    struct StepCore {
        state: CoreState,
        blocks_per_frame: u32,
        blocks: u32,
        boots: u32,
        shutdowns: u32,
        fail_graphics: bool,
        fail_boot: bool,
        graphics_inits: u32,
        restores: u32,
    }

    impl StepCore {
        fn new(blocks_per_frame: u32) -> Self {
            Self {
                state: CoreState::Running,
                blocks_per_frame,
                blocks: 0,
                boots: 0,
                shutdowns: 0,
                fail_graphics: false,
                fail_boot: false,
                graphics_inits: 0,
                restores: 0,
            }
        }
    }

    impl ControllerSink for StepCore {
        fn button_down(&mut self, _button: PspButtons) {}
        fn button_up(&mut self, _button: PspButtons) {}
        fn set_analog(&mut self, _x: f32, _y: f32) {}
    }

    impl EmulatorCore for StepCore {
        fn init_graphics(&mut self, _graphics: &GraphicsContext) -> Result<(), InitError> {
            self.graphics_inits += 1;
            if self.fail_graphics {
                return Err(InitError::Graphics("no GL".to_string()));
            }
            Ok(())
        }

        fn register_asset_root(&mut self, _root: &Path) {}

        fn apply_settings(&mut self, _settings: &CoreSettings) {}

        fn init(
            &mut self,
            _params: &CoreParameter,
            _host: &mut dyn SystemHost,
        ) -> Result<(), InitError> {
            if self.fail_boot {
                return Err(InitError::Core("bad image".to_string()));
            }
            self.boots += 1;
            self.state = CoreState::Running;
            Ok(())
        }

        fn set_target_framebuffer(&mut self, _framebuffer: usize) {}

        fn restore_graphics_state(&mut self) {
            self.restores += 1;
        }

        fn us_to_cycles(&self, us: u64) -> i64 {
            us as i64 * 222
        }

        fn run_for_cycles(&mut self, _cycles: i64) {
            self.blocks += 1;
            if self.blocks % self.blocks_per_frame == 0 {
                self.state = CoreState::NextFrame;
            }
        }

        fn state(&self) -> CoreState {
            self.state
        }

        fn set_state(&mut self, state: CoreState) {
            self.state = state;
        }

        fn mix_audio(&mut self, _out: &mut [i16]) -> usize {
            0
        }

        fn shutdown(&mut self, _host: &mut dyn SystemHost) {
            self.shutdowns += 1;
        }
    }

    fn frame(runner: &mut FrameRunner, core: &mut StepCore, shim: &mut FrontendShim) {
        runner.begin_frame();
        runner
            .prepare(core, shim, &CoreParameter::default(), &GraphicsContext::default())
            .unwrap();
        runner.run_to_frame_boundary(core);
    }

    #[test]
    fn test_runner_creation() {
        let runner = FrameRunner::new();
        assert_eq!(runner.state(), RunnerState::Uninitialized);
        assert_eq!(runner.frame_count(), 0);
        assert!(!runner.frame().reset_pending);
    }

    #[test]
    fn test_first_frame_boots() {
        let mut runner = FrameRunner::new();
        let mut core = StepCore::new(1);
        let mut shim = FrontendShim::new();

        frame(&mut runner, &mut core, &mut shim);
        assert_eq!(
            runner.frame_transitions(),
            &[
                (RunnerState::Uninitialized, RunnerState::Ready),
                (RunnerState::Ready, RunnerState::Running),
            ]
        );
        assert_eq!(core.boots, 1);
        assert!(shim.booted());

        frame(&mut runner, &mut core, &mut shim);
        assert!(runner.frame_transitions().is_empty());
        assert_eq!(runner.state(), RunnerState::Running);
        assert_eq!(core.boots, 1);
    }

    #[test]
    fn test_runs_until_frame_boundary() {
        let mut runner = FrameRunner::new();
        let mut core = StepCore::new(3);
        let mut shim = FrontendShim::new();

        frame(&mut runner, &mut core, &mut shim);
        assert_eq!(core.blocks, 3);
        // Handed back as running for the next call
        assert_eq!(core.state, CoreState::Running);

        frame(&mut runner, &mut core, &mut shim);
        assert_eq!(core.blocks, 6);
        assert_eq!(runner.frame_count(), 2);
    }

    #[test]
    fn test_graphics_state_restored_once_per_frame() {
        let mut runner = FrameRunner::new();
        let mut core = StepCore::new(4);
        let mut shim = FrontendShim::new();

        frame(&mut runner, &mut core, &mut shim);
        assert_eq!(core.restores, 1);
        frame(&mut runner, &mut core, &mut shim);
        assert_eq!(core.restores, 2);

        // Nothing to restore once the session is over
        runner.shutdown(&mut core, &mut shim);
        runner.run_to_frame_boundary(&mut core);
        assert_eq!(core.restores, 2);
    }

    #[test]
    fn test_reset_is_deferred_to_next_frame() {
        let mut runner = FrameRunner::new();
        let mut core = StepCore::new(1);
        let mut shim = FrontendShim::new();
        frame(&mut runner, &mut core, &mut shim);

        runner.request_reset();
        assert_eq!(runner.state(), RunnerState::Running);
        assert_eq!(core.shutdowns, 0);

        frame(&mut runner, &mut core, &mut shim);
        assert_eq!(
            runner.frame_transitions(),
            &[
                (RunnerState::Running, RunnerState::Resetting),
                (RunnerState::Resetting, RunnerState::Ready),
                (RunnerState::Ready, RunnerState::Running),
            ]
        );
        assert_eq!(core.shutdowns, 1);
        assert_eq!(core.boots, 2);
        assert_eq!(core.graphics_inits, 1);
        assert!(!runner.frame().reset_pending);
    }

    #[test]
    fn test_graphics_failure_is_fatal() {
        let mut runner = FrameRunner::new();
        let mut core = StepCore::new(1);
        core.fail_graphics = true;
        let mut shim = FrontendShim::new();

        let result = runner.prepare(
            &mut core,
            &mut shim,
            &CoreParameter::default(),
            &GraphicsContext::default(),
        );
        assert!(matches!(result, Err(InitError::Graphics(_))));
        assert_eq!(runner.state(), RunnerState::Shutdown);
        assert_eq!(core.boots, 0);

        runner.run_to_frame_boundary(&mut core);
        assert_eq!(core.blocks, 0);
    }

    #[test]
    fn test_boot_failure_is_fatal() {
        let mut runner = FrameRunner::new();
        let mut core = StepCore::new(1);
        core.fail_boot = true;
        let mut shim = FrontendShim::new();

        let result = runner.prepare(
            &mut core,
            &mut shim,
            &CoreParameter::default(),
            &GraphicsContext::default(),
        );
        assert!(matches!(result, Err(InitError::Core(_))));
        assert_eq!(runner.state(), RunnerState::Shutdown);
        assert!(!shim.booted());
    }

    #[test]
    fn test_shutdown_stops_frames() {
        let mut runner = FrameRunner::new();
        let mut core = StepCore::new(1);
        let mut shim = FrontendShim::new();
        frame(&mut runner, &mut core, &mut shim);

        runner.shutdown(&mut core, &mut shim);
        assert!(runner.is_shutdown());
        assert_eq!(core.shutdowns, 1);

        runner.request_reset();
        assert!(!runner.frame().reset_pending);

        runner.shutdown(&mut core, &mut shim);
        assert_eq!(core.shutdowns, 1);
    }

    #[test]
    fn test_shutdown_before_boot_skips_core() {
        let mut runner = FrameRunner::new();
        let mut core = StepCore::new(1);
        let mut shim = FrontendShim::new();

        runner.shutdown(&mut core, &mut shim);
        assert_eq!(runner.state(), RunnerState::Shutdown);
        assert_eq!(core.shutdowns, 0);
    }
}
