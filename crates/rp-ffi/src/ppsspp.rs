//! PPSSPP emulator core
//!
//! This module provides the FFI interface to the prebuilt `retropsp_ppsspp`
//! shim, a thin C layer over the PPSSPP sources exposing its global system
//! entry points. The shim calls back into the [`SystemHost`] only from inside
//! `rp_ppsspp_init` and `rp_ppsspp_shutdown`.

use libc::{c_char, c_int, c_void, size_t};
use rp_core::{CoreParameter, CoreSettings, CpuCore, GpuCore, InitError, PathConfig};
use rp_input::{ControllerSink, PspButtons};
use rp_integration::host::ProcAddressFn;
use rp_integration::{CoreState, EmulatorCore, GraphicsContext, SystemHost};
use std::ffi::{CStr, CString};
use std::path::Path;

const ERROR_LEN: usize = 256;

/// Settings as laid out for the shim
#[repr(C)]
struct RpSettings {
    language: c_int,
    button_preference: c_int,
    locked_cpu_speed: c_int,
    rendering_mode: c_int,
    auto_frameskip: bool,
    frameskip: c_int,
    fast_memory: bool,
    texture_scaling_level: c_int,
    texture_scaling_type: c_int,
    anisotropy_level: c_int,
    texture_deposterize: bool,
    hardware_transform: bool,
    vertex_cache: bool,
    separate_cpu_thread: bool,
    separate_io_thread: bool,
    unsafe_func_replacements: bool,
    sound_speedhack: bool,
    audio_latency: c_int,
    encrypt_save: bool,
    enable_wlan: bool,
    show_fps_counter: bool,
    vertex_decoder_jit: bool,
    frameskip_unthrottle: bool,
    vsync: bool,
    nickname: *const c_char,
    current_dir: *const c_char,
    external_dir: *const c_char,
    memstick_dir: *const c_char,
    flash0_dir: *const c_char,
    internal_data_dir: *const c_char,
}

/// Boot parameters as laid out for the shim
#[repr(C)]
struct RpBootParams {
    cpu_core: c_int,
    gpu_core: c_int,
    render_width: c_int,
    render_height: c_int,
    pixel_width: c_int,
    pixel_height: c_int,
    file_to_start: *const c_char,
    mount_iso: *const c_char,
    enable_sound: bool,
    start_paused: bool,
    printf_emu_log: bool,
    headless: bool,
    unthrottle: bool,
}

/// Host hooks the shim may call during init and shutdown
#[repr(C)]
struct RpHostHooks {
    user: *mut c_void,
    init_gl: unsafe extern "C" fn(user: *mut c_void) -> c_int,
    shutdown_gl: unsafe extern "C" fn(user: *mut c_void),
    init_sound: unsafe extern "C" fn(user: *mut c_void),
    update_sound: unsafe extern "C" fn(user: *mut c_void),
    shutdown_sound: unsafe extern "C" fn(user: *mut c_void),
}

/// `CoreState` values as the shim reports them
const STATE_RUNNING: c_int = 0;
const STATE_NEXT_FRAME: c_int = 1;
const STATE_STEPPING: c_int = 2;
const STATE_POWER_DOWN: c_int = 3;
const STATE_ERROR: c_int = 4;

extern "C" {
    fn rp_ppsspp_init_graphics(get_proc_address: Option<ProcAddressFn>) -> c_int;
    fn rp_ppsspp_register_asset_root(path: *const c_char);
    fn rp_ppsspp_apply_settings(settings: *const RpSettings);
    fn rp_ppsspp_init(
        params: *const RpBootParams,
        hooks: *const RpHostHooks,
        error: *mut c_char,
        error_len: size_t,
    ) -> c_int;
    fn rp_ppsspp_set_target_framebuffer(framebuffer: usize);
    fn rp_ppsspp_restore_graphics_state();
    fn rp_ppsspp_us_to_cycles(us: u64) -> i64;
    fn rp_ppsspp_run_for_cycles(cycles: i64);
    fn rp_ppsspp_get_state() -> c_int;
    fn rp_ppsspp_set_state(state: c_int);
    fn rp_ppsspp_mix(out: *mut i16, max_frames: c_int) -> c_int;
    fn rp_ppsspp_shutdown(hooks: *const RpHostHooks);
    fn rp_ppsspp_button_down(mask: u32);
    fn rp_ppsspp_button_up(mask: u32);
    fn rp_ppsspp_set_analog(x: f32, y: f32);
}

/// Borrowed [`SystemHost`] behind the hooks' `user` pointer
struct HookTarget<'a> {
    host: &'a mut dyn SystemHost,
}

unsafe fn target<'a>(user: *mut c_void) -> &'a mut HookTarget<'a> {
    &mut *(user as *mut HookTarget<'a>)
}

unsafe extern "C" fn hook_init_gl(user: *mut c_void) -> c_int {
    match target(user).host.init_gl() {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("GL init failed: {}", e);
            -1
        }
    }
}

unsafe extern "C" fn hook_shutdown_gl(user: *mut c_void) {
    target(user).host.shutdown_gl();
}

unsafe extern "C" fn hook_init_sound(user: *mut c_void) {
    target(user).host.init_sound();
}

unsafe extern "C" fn hook_update_sound(user: *mut c_void) {
    target(user).host.update_sound();
}

unsafe extern "C" fn hook_shutdown_sound(user: *mut c_void) {
    target(user).host.shutdown_sound();
}

fn hooks(target: &mut HookTarget<'_>) -> RpHostHooks {
    RpHostHooks {
        user: target as *mut HookTarget<'_> as *mut c_void,
        init_gl: hook_init_gl,
        shutdown_gl: hook_shutdown_gl,
        init_sound: hook_init_sound,
        update_sound: hook_update_sound,
        shutdown_sound: hook_shutdown_sound,
    }
}

fn c_path(path: &Path) -> Result<CString, InitError> {
    CString::new(path.to_string_lossy().as_bytes())
        .map_err(|_| InitError::Core(format!("path contains a NUL byte: {}", path.display())))
}

/// Owned C strings backing one [`RpSettings`]
struct SettingsStrings {
    nickname: CString,
    current: CString,
    external: CString,
    memstick: CString,
    flash0: CString,
    internal_data: CString,
}

impl SettingsStrings {
    fn new(settings: &CoreSettings) -> Result<Self, InitError> {
        let PathConfig {
            current,
            external,
            memstick,
            flash0,
            internal_data,
        } = &settings.paths;
        Ok(Self {
            nickname: CString::new(settings.nickname.as_str())
                .map_err(|_| InitError::Core("nickname contains a NUL byte".to_string()))?,
            current: c_path(current)?,
            external: c_path(external)?,
            memstick: c_path(memstick)?,
            flash0: c_path(flash0)?,
            internal_data: c_path(internal_data)?,
        })
    }
}

fn cpu_core_id(cpu_core: CpuCore) -> c_int {
    match cpu_core {
        CpuCore::Interpreter => 0,
        CpuCore::Jit => 1,
    }
}

fn gpu_core_id(gpu_core: GpuCore) -> c_int {
    match gpu_core {
        GpuCore::Null => 0,
        GpuCore::Gles => 1,
    }
}

/// Width or height as the shim's signed int, clamped instead of wrapped
fn c_dimension(value: u32) -> c_int {
    c_int::try_from(value).unwrap_or(c_int::MAX)
}

/// The PPSSPP core, driven through the shim's global entry points
///
/// The shim holds process-wide state; only one `PpssppCore` may exist.
#[derive(Debug, Default)]
pub struct PpssppCore {
    _private: (),
}

impl PpssppCore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ControllerSink for PpssppCore {
    fn button_down(&mut self, button: PspButtons) {
        unsafe { rp_ppsspp_button_down(button.bits()) }
    }

    fn button_up(&mut self, button: PspButtons) {
        unsafe { rp_ppsspp_button_up(button.bits()) }
    }

    fn set_analog(&mut self, x: f32, y: f32) {
        unsafe { rp_ppsspp_set_analog(x, y) }
    }
}

impl EmulatorCore for PpssppCore {
    fn init_graphics(&mut self, graphics: &GraphicsContext) -> Result<(), InitError> {
        if graphics.proc_address.is_none() {
            return Err(InitError::Graphics("host gave no GL loader".to_string()));
        }
        match unsafe { rp_ppsspp_init_graphics(graphics.proc_address) } {
            0 => Ok(()),
            code => Err(InitError::Graphics(format!("GL extension loader failed ({})", code))),
        }
    }

    fn register_asset_root(&mut self, root: &Path) {
        match c_path(root) {
            Ok(root) => unsafe { rp_ppsspp_register_asset_root(root.as_ptr()) },
            Err(e) => tracing::error!("{}", e),
        }
    }

    fn apply_settings(&mut self, settings: &CoreSettings) {
        let strings = match SettingsStrings::new(settings) {
            Ok(strings) => strings,
            Err(e) => {
                tracing::error!("Settings not applied: {}", e);
                return;
            }
        };

        let raw = RpSettings {
            language: settings.language as c_int,
            button_preference: settings.button_preference.system_param(),
            locked_cpu_speed: settings.locked_cpu_speed as c_int,
            rendering_mode: settings.rendering_mode as c_int,
            auto_frameskip: settings.auto_frameskip,
            frameskip: settings.frameskip as c_int,
            fast_memory: settings.fast_memory,
            texture_scaling_level: settings.texture_scaling_level as c_int,
            texture_scaling_type: settings.texture_scaling_type as c_int,
            anisotropy_level: settings.anisotropy_level as c_int,
            texture_deposterize: settings.texture_deposterize,
            hardware_transform: settings.hardware_transform,
            vertex_cache: settings.vertex_cache,
            separate_cpu_thread: settings.separate_cpu_thread,
            separate_io_thread: settings.separate_io_thread,
            unsafe_func_replacements: settings.unsafe_func_replacements,
            sound_speedhack: settings.sound_speedhack,
            audio_latency: settings.audio_latency as c_int,
            encrypt_save: settings.encrypt_save,
            enable_wlan: settings.enable_wlan,
            show_fps_counter: settings.show_fps_counter,
            vertex_decoder_jit: settings.vertex_decoder_jit,
            frameskip_unthrottle: settings.frameskip_unthrottle,
            vsync: settings.vsync,
            nickname: strings.nickname.as_ptr(),
            current_dir: strings.current.as_ptr(),
            external_dir: strings.external.as_ptr(),
            memstick_dir: strings.memstick.as_ptr(),
            flash0_dir: strings.flash0.as_ptr(),
            internal_data_dir: strings.internal_data.as_ptr(),
        };
        // The shim copies everything before returning
        unsafe { rp_ppsspp_apply_settings(&raw) }
    }

    fn init(&mut self, params: &CoreParameter, host: &mut dyn SystemHost) -> Result<(), InitError> {
        let file = c_path(&params.file_to_start)?;
        let mount_iso = CString::new(params.mount_iso.as_str())
            .map_err(|_| InitError::Core("mount path contains a NUL byte".to_string()))?;

        let raw = RpBootParams {
            cpu_core: cpu_core_id(params.cpu_core),
            gpu_core: gpu_core_id(params.gpu_core),
            render_width: c_dimension(params.render_resolution.width),
            render_height: c_dimension(params.render_resolution.height),
            pixel_width: c_dimension(params.pixel_resolution.width),
            pixel_height: c_dimension(params.pixel_resolution.height),
            file_to_start: file.as_ptr(),
            mount_iso: mount_iso.as_ptr(),
            enable_sound: params.enable_sound,
            start_paused: params.start_paused,
            printf_emu_log: params.printf_emu_log,
            headless: params.headless,
            unthrottle: params.unthrottle,
        };

        let mut target = HookTarget { host };
        let hooks = hooks(&mut target);
        let mut error = [0 as c_char; ERROR_LEN];
        let ok = unsafe { rp_ppsspp_init(&raw, &hooks, error.as_mut_ptr(), ERROR_LEN) };
        if ok != 0 {
            return Ok(());
        }

        // The shim always NUL-terminates within `error_len`
        let message = unsafe { CStr::from_ptr(error.as_ptr()) }
            .to_string_lossy()
            .into_owned();
        Err(InitError::Core(message))
    }

    fn set_target_framebuffer(&mut self, framebuffer: usize) {
        unsafe { rp_ppsspp_set_target_framebuffer(framebuffer) }
    }

    fn restore_graphics_state(&mut self) {
        unsafe { rp_ppsspp_restore_graphics_state() }
    }

    fn us_to_cycles(&self, us: u64) -> i64 {
        unsafe { rp_ppsspp_us_to_cycles(us) }
    }

    fn run_for_cycles(&mut self, cycles: i64) {
        unsafe { rp_ppsspp_run_for_cycles(cycles) }
    }

    fn state(&self) -> CoreState {
        match unsafe { rp_ppsspp_get_state() } {
            STATE_RUNNING => CoreState::Running,
            STATE_NEXT_FRAME => CoreState::NextFrame,
            STATE_STEPPING => CoreState::Stepping,
            STATE_POWER_DOWN => CoreState::PowerDown,
            _ => CoreState::Error,
        }
    }

    fn set_state(&mut self, state: CoreState) {
        let raw = match state {
            CoreState::Running => STATE_RUNNING,
            CoreState::NextFrame => STATE_NEXT_FRAME,
            CoreState::Stepping => STATE_STEPPING,
            CoreState::PowerDown => STATE_POWER_DOWN,
            CoreState::Error => STATE_ERROR,
        };
        unsafe { rp_ppsspp_set_state(raw) }
    }

    fn mix_audio(&mut self, out: &mut [i16]) -> usize {
        let max_frames = (out.len() / 2).min(c_int::MAX as usize) as c_int;
        let frames = unsafe { rp_ppsspp_mix(out.as_mut_ptr(), max_frames) };
        frames.clamp(0, max_frames) as usize
    }

    fn shutdown(&mut self, host: &mut dyn SystemHost) {
        let mut target = HookTarget { host };
        let hooks = hooks(&mut target);
        unsafe { rp_ppsspp_shutdown(&hooks) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rp_core::ButtonPreference;

    #[test]
    fn test_core_ids() {
        assert_eq!(cpu_core_id(CpuCore::Jit), 1);
        assert_eq!(cpu_core_id(CpuCore::Interpreter), 0);
        assert_eq!(gpu_core_id(GpuCore::Gles), 1);
        assert_eq!(ButtonPreference::Cross.system_param(), 1);
    }

    #[test]
    fn test_dimensions_never_wrap() {
        assert_eq!(c_dimension(960), 960);
        assert_eq!(c_dimension(u32::MAX), c_int::MAX);
        assert!(c_dimension(1 << 31) > 0);
    }

    #[test]
    fn test_nul_in_path_is_init_error() {
        assert!(matches!(
            c_path(Path::new("game\0.iso")),
            Err(InitError::Core(_))
        ));
        assert!(c_path(Path::new("/games/game.iso")).is_ok());
    }

    #[test]
    fn test_settings_strings() {
        let mut settings = CoreSettings::default();
        settings.paths = PathConfig::rooted_at("/system/PPSSPP/");
        let strings = SettingsStrings::new(&settings).unwrap();
        assert_eq!(strings.nickname.as_bytes(), b"PPSSPP");
        assert_eq!(strings.memstick.as_bytes(), b"/system/PPSSPP/");
    }
}
