//! libretro ABI layer for the retropsp binding
//!
//! Declares the C types of the libretro v1 interface, implements
//! [`rp_integration::Host`] over the host's callback pointers, and bridges
//! logging to the host. With the `ppsspp` feature it also links the real
//! emulator core.

pub mod host;
pub mod libretro;
pub mod log;
#[cfg(feature = "ppsspp")]
pub mod ppsspp;

pub use host::RetroHost;
pub use log::RetroLogSink;
#[cfg(feature = "ppsspp")]
pub use ppsspp::PpssppCore;
