//! PSP controller state (sceCtrl)

use bitflags::bitflags;

bitflags! {
    /// PSP controller button lines
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PspButtons: u32 {
        const SELECT   = 0x0001;
        const START    = 0x0008;
        const UP       = 0x0010;
        const RIGHT    = 0x0020;
        const DOWN     = 0x0040;
        const LEFT     = 0x0080;
        const LTRIGGER = 0x0100;
        const RTRIGGER = 0x0200;
        const TRIANGLE = 0x1000;
        const CIRCLE   = 0x2000;
        const CROSS    = 0x4000;
        const SQUARE   = 0x8000;
    }
}

/// Receives controller updates; implemented by the emulator core
pub trait ControllerSink {
    fn button_down(&mut self, button: PspButtons);
    fn button_up(&mut self, button: PspButtons);
    /// Both axes in `[-1.0, 1.0]`, positive Y pointing up
    fn set_analog(&mut self, x: f32, y: f32);
}

/// One frame's controller snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PadState {
    pub buttons: PspButtons,
    pub analog_x: f32,
    pub analog_y: f32,
}

impl PadState {
    pub fn new() -> Self {
        Self {
            buttons: PspButtons::empty(),
            analog_x: 0.0,
            analog_y: 0.0,
        }
    }

    pub fn is_button_pressed(&self, button: PspButtons) -> bool {
        self.buttons.contains(button)
    }

    pub fn set_button(&mut self, button: PspButtons, pressed: bool) {
        self.buttons.set(button, pressed);
    }

    /// Report every line to `sink`: down when pressed, up otherwise
    pub fn apply_to(&self, sink: &mut dyn ControllerSink) {
        for button in PspButtons::all().iter() {
            if self.buttons.contains(button) {
                sink.button_down(button);
            } else {
                sink.button_up(button);
            }
        }
        sink.set_analog(self.analog_x, self.analog_y);
    }
}

impl Default for PadState {
    fn default() -> Self {
        Self::new()
    }
}
