//! retropsp: the PPSSPP PSP emulator as a libretro core
//!
//! Every exported `retro_*` symbol is a thin trampoline: it locks the
//! process-wide [`Context`], forwards to the frontend and keeps panics from
//! unwinding into the host.

use libc::{c_char, c_uint, c_void, size_t};
use parking_lot::Mutex;
use rp_core::Resolution;
use rp_ffi::libretro::*;
use rp_ffi::{RetroHost, RetroLogSink};
use rp_integration::{register_options, AvInfo, Frontend, SystemInfo};
use std::ffi::CStr;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

#[cfg(feature = "ppsspp")]
type ActiveCore = rp_ffi::PpssppCore;
#[cfg(not(feature = "ppsspp"))]
type ActiveCore = rp_integration::HeadlessCore;

const LIBRARY_NAME: &CStr = c"PPSSPP";
const LIBRARY_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
const VALID_EXTENSIONS: &CStr = c"elf|iso|cso|prx|pbp";

/// Host callbacks plus the session, if `retro_init` ran
struct Context {
    host: RetroHost,
    frontend: Option<Frontend<ActiveCore>>,
}

static CONTEXT: Mutex<Context> = Mutex::new(Context {
    host: RetroHost::new(),
    frontend: None,
});

/// Run `f` on the context, answering `fallback` if it panics
fn with_context<R>(entry: &str, fallback: R, f: impl FnOnce(&mut Context) -> R) -> R {
    let result = panic::catch_unwind(AssertUnwindSafe(|| f(&mut CONTEXT.lock())));
    result.unwrap_or_else(|_| {
        tracing::error!("Panic in {}", entry);
        fallback
    })
}

/// Run `f` on the session, answering `fallback` without one
fn with_frontend<R>(
    entry: &str,
    fallback: R,
    f: impl FnOnce(&mut Frontend<ActiveCore>, &mut RetroHost) -> R,
) -> R
where
    R: Clone,
{
    let on_panic = fallback.clone();
    with_context(entry, on_panic, |ctx| {
        let Context { host, frontend } = ctx;
        match frontend {
            Some(frontend) => f(frontend, host),
            None => fallback,
        }
    })
}

#[no_mangle]
pub extern "C" fn retro_set_environment(cb: retro_environment_t) {
    with_context("retro_set_environment", (), |ctx| {
        ctx.host.set_environment(cb);
        register_options(&mut ctx.host);
    })
}

#[no_mangle]
pub extern "C" fn retro_set_video_refresh(cb: retro_video_refresh_t) {
    with_context("retro_set_video_refresh", (), |ctx| ctx.host.set_video_refresh(cb))
}

/// Audio goes out in batches only
#[no_mangle]
pub extern "C" fn retro_set_audio_sample(_cb: retro_audio_sample_t) {}

#[no_mangle]
pub extern "C" fn retro_set_audio_sample_batch(cb: retro_audio_sample_batch_t) {
    with_context("retro_set_audio_sample_batch", (), |ctx| {
        ctx.host.set_audio_sample_batch(cb)
    })
}

#[no_mangle]
pub extern "C" fn retro_set_input_poll(cb: retro_input_poll_t) {
    with_context("retro_set_input_poll", (), |ctx| ctx.host.set_input_poll(cb))
}

#[no_mangle]
pub extern "C" fn retro_set_input_state(cb: retro_input_state_t) {
    with_context("retro_set_input_state", (), |ctx| ctx.host.set_input_state(cb))
}

#[no_mangle]
pub extern "C" fn retro_init() {
    with_context("retro_init", (), |ctx| {
        let sink = ctx.host.log_interface().map(RetroLogSink::new);
        rp_core::logging::install(sink);
        tracing::info!("retropsp {}", env!("CARGO_PKG_VERSION"));

        ctx.frontend = Some(Frontend::init(ActiveCore::new(), &ctx.host));
    })
}

#[no_mangle]
pub extern "C" fn retro_deinit() {
    with_context("retro_deinit", (), |ctx| {
        if let Some(mut frontend) = ctx.frontend.take() {
            frontend.unload();
        }
    })
}

#[no_mangle]
pub extern "C" fn retro_api_version() -> c_uint {
    RETRO_API_VERSION
}

#[no_mangle]
pub unsafe extern "C" fn retro_get_system_info(info: *mut retro_system_info) {
    if info.is_null() {
        return;
    }
    let static_info = SystemInfo::get();
    *info = retro_system_info {
        library_name: LIBRARY_NAME.as_ptr(),
        library_version: LIBRARY_VERSION.as_ptr() as *const c_char,
        valid_extensions: VALID_EXTENSIONS.as_ptr(),
        need_fullpath: static_info.need_fullpath,
        block_extract: false,
    };
}

fn av_info_to_retro(av: AvInfo) -> retro_system_av_info {
    retro_system_av_info {
        geometry: retro_game_geometry {
            base_width: av.base.width,
            base_height: av.base.height,
            max_width: av.max.width,
            max_height: av.max.height,
            aspect_ratio: av.aspect_ratio,
        },
        timing: retro_system_timing {
            fps: av.fps,
            sample_rate: av.sample_rate,
        },
    }
}

#[no_mangle]
pub unsafe extern "C" fn retro_get_system_av_info(info: *mut retro_system_av_info) {
    if info.is_null() {
        return;
    }
    let native = AvInfo::for_output(Resolution::NATIVE);
    let av = with_frontend("retro_get_system_av_info", native, |frontend, _| {
        frontend.av_info()
    });
    *info = av_info_to_retro(av);
}

#[no_mangle]
pub extern "C" fn retro_set_controller_port_device(port: c_uint, device: c_uint) {
    tracing::debug!("Ignoring device {} on port {}", device, port);
}

#[no_mangle]
pub extern "C" fn retro_reset() {
    with_frontend("retro_reset", (), |frontend, _| frontend.reset())
}

#[no_mangle]
pub extern "C" fn retro_run() {
    with_frontend("retro_run", (), |frontend, host| frontend.run_frame(host))
}

#[no_mangle]
pub extern "C" fn retro_serialize_size() -> size_t {
    with_frontend("retro_serialize_size", 0, |frontend, _| {
        frontend.serialize_size()
    })
}

#[no_mangle]
pub unsafe extern "C" fn retro_serialize(data: *mut c_void, size: size_t) -> bool {
    with_frontend("retro_serialize", false, |frontend, _| {
        if data.is_null() {
            return false;
        }
        let data = std::slice::from_raw_parts_mut(data as *mut u8, size);
        frontend.serialize(data)
    })
}

#[no_mangle]
pub unsafe extern "C" fn retro_unserialize(data: *const c_void, size: size_t) -> bool {
    with_frontend("retro_unserialize", false, |frontend, _| {
        if data.is_null() {
            return false;
        }
        let data = std::slice::from_raw_parts(data as *const u8, size);
        frontend.unserialize(data)
    })
}

#[no_mangle]
pub extern "C" fn retro_cheat_reset() {
    with_frontend("retro_cheat_reset", (), |frontend, _| frontend.cheat_reset())
}

#[no_mangle]
pub unsafe extern "C" fn retro_cheat_set(index: c_uint, enabled: bool, code: *const c_char) {
    if code.is_null() {
        return;
    }
    let code = CStr::from_ptr(code).to_string_lossy();
    with_frontend("retro_cheat_set", (), |frontend, _| {
        frontend.cheat_set(index, enabled, &code)
    })
}

#[no_mangle]
pub unsafe extern "C" fn retro_load_game(game: *const retro_game_info) -> bool {
    if game.is_null() || (*game).path.is_null() {
        tracing::error!("Host passed no game path");
        return false;
    }
    let path = CStr::from_ptr((*game).path).to_string_lossy().into_owned();

    with_context("retro_load_game", false, |ctx| {
        let Context { host, frontend } = ctx;
        let Some(frontend) = frontend else {
            tracing::error!("retro_load_game called before retro_init");
            return false;
        };
        match frontend.load_game(host, &path) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to load {}: {}", path, e);
                false
            }
        }
    })
}

#[no_mangle]
pub extern "C" fn retro_load_game_special(
    _game_type: c_uint,
    _info: *const retro_game_info,
    _num_info: size_t,
) -> bool {
    false
}

#[no_mangle]
pub extern "C" fn retro_unload_game() {
    with_frontend("retro_unload_game", (), |frontend, _| frontend.unload())
}

#[no_mangle]
pub extern "C" fn retro_get_region() -> c_uint {
    RETRO_REGION_NTSC
}

#[no_mangle]
pub extern "C" fn retro_get_memory_data(_id: c_uint) -> *mut c_void {
    ptr::null_mut()
}

#[no_mangle]
pub extern "C" fn retro_get_memory_size(id: c_uint) -> size_t {
    with_frontend("retro_get_memory_size", 0, |frontend, _| frontend.memory_size(id))
}
