//! Input bridge for the retropsp libretro binding
//!
//! Polls the host's joypad once per frame and maps it onto the PSP
//! controller's digital lines and left analog stick.

pub mod mapping;
pub mod pad;

pub use mapping::{poll_and_map, HostJoypad, InputSource, BUTTON_MAP};
pub use pad::{ControllerSink, PadState, PspButtons};
