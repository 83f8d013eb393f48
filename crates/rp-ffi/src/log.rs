//! Host log interface
//!
//! Forwards rendered `tracing` lines to the printf-style callback the host
//! hands out through GET_LOG_INTERFACE.

use crate::libretro::{
    retro_log_printf_t, RETRO_LOG_DEBUG, RETRO_LOG_ERROR, RETRO_LOG_INFO, RETRO_LOG_WARN,
};
use libc::c_uint;
use rp_core::logging::LogSink;
use std::ffi::CString;
use tracing::Level;

/// Map a `tracing` level onto the host's four log levels
pub fn retro_level(level: Level) -> c_uint {
    match level {
        Level::TRACE | Level::DEBUG => RETRO_LOG_DEBUG,
        Level::INFO => RETRO_LOG_INFO,
        Level::WARN => RETRO_LOG_WARN,
        _ => RETRO_LOG_ERROR,
    }
}

/// [`LogSink`] over the host's log callback
#[derive(Clone, Copy)]
pub struct RetroLogSink {
    log: retro_log_printf_t,
}

impl RetroLogSink {
    pub fn new(log: retro_log_printf_t) -> Self {
        Self { log }
    }
}

impl LogSink for RetroLogSink {
    fn write(&self, level: Level, line: &str) {
        let Some(line) = c_line(line) else {
            return;
        };
        // The host formats with printf; never let a line act as the format
        unsafe { (self.log)(retro_level(level), c"%s\n".as_ptr(), line.as_ptr()) }
    }
}

/// Line as a C string, interior NULs blanked
fn c_line(line: &str) -> Option<CString> {
    CString::new(line)
        .or_else(|_| CString::new(line.replace('\0', " ")))
        .ok()
}
