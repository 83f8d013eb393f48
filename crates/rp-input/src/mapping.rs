//! Input mapping
//!
//! Maps the host's RetroPad onto the PSP controller.

use crate::pad::{PadState, PspButtons};

/// Host device class for digital buttons
pub const DEVICE_JOYPAD: u32 = 1;
/// Host device class for analog sticks
pub const DEVICE_ANALOG: u32 = 5;
/// Analog index of the left stick
pub const INDEX_ANALOG_LEFT: u32 = 0;
pub const ID_ANALOG_X: u32 = 0;
pub const ID_ANALOG_Y: u32 = 1;

/// Only the first port drives the PSP
pub const PORT: u32 = 0;

/// RetroPad button ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum HostJoypad {
    B = 0,
    Y = 1,
    Select = 2,
    Start = 3,
    Up = 4,
    Down = 5,
    Left = 6,
    Right = 7,
    A = 8,
    X = 9,
    L = 10,
    R = 11,
}

/// RetroPad button to PSP line, by physical position
pub const BUTTON_MAP: [(HostJoypad, PspButtons); 12] = [
    (HostJoypad::Up, PspButtons::UP),
    (HostJoypad::Down, PspButtons::DOWN),
    (HostJoypad::Left, PspButtons::LEFT),
    (HostJoypad::Right, PspButtons::RIGHT),
    (HostJoypad::X, PspButtons::TRIANGLE),
    (HostJoypad::A, PspButtons::CIRCLE),
    (HostJoypad::B, PspButtons::CROSS),
    (HostJoypad::Y, PspButtons::SQUARE),
    (HostJoypad::L, PspButtons::LTRIGGER),
    (HostJoypad::R, PspButtons::RTRIGGER),
    (HostJoypad::Start, PspButtons::START),
    (HostJoypad::Select, PspButtons::SELECT),
];

/// Host input callbacks
pub trait InputSource {
    /// Latch the host's input state for this frame
    fn poll(&mut self);

    /// Query one input, following the host's `(port, device, index, id)` model
    fn state(&self, port: u32, device: u32, index: u32, id: u32) -> i16;
}

/// Signed 16-bit stick value to `[-1.0, 1.0]`
fn normalize_axis(value: i16) -> f32 {
    (value as f32 / 32768.0).clamp(-1.0, 1.0)
}

/// Poll the host once and build this frame's PSP controller state
///
/// The host's Y axis grows downwards; the PSP's grows upwards, so Y is
/// negated.
pub fn poll_and_map(source: &mut dyn InputSource) -> PadState {
    source.poll();

    let mut pad = PadState::new();
    for (host, psp) in BUTTON_MAP {
        let pressed = source.state(PORT, DEVICE_JOYPAD, 0, host as u32) != 0;
        pad.set_button(psp, pressed);
    }

    let x = source.state(PORT, DEVICE_ANALOG, INDEX_ANALOG_LEFT, ID_ANALOG_X);
    let y = source.state(PORT, DEVICE_ANALOG, INDEX_ANALOG_LEFT, ID_ANALOG_Y);
    pad.analog_x = normalize_axis(x);
    pad.analog_y = -normalize_axis(y);

    tracing::trace!(
        "Pad: buttons=0x{:04x} x={:.3} y={:.3}",
        pad.buttons.bits(),
        pad.analog_x,
        pad.analog_y
    );
    pad
}
