//! [`Host`] over the raw libretro callbacks
//!
//! The host registers its callbacks one at a time, before and after
//! `retro_init`. Calls made before the matching callback arrived are answered
//! as if the host refused them.

use crate::libretro::*;
use libc::{c_char, c_uint, c_void};
use rp_core::{OptionDef, OptionSource};
use rp_input::InputSource;
use rp_integration::{GraphicsContext, Host, HwContext, HwRenderRequest, PixelFormat};
use std::ffi::{CStr, CString};
use std::ptr;

/// Logged when the host (re)creates the GL context
pub unsafe extern "C" fn context_reset() {
    tracing::info!("Context reset!");
}

fn pixel_format_id(format: PixelFormat) -> c_uint {
    match format {
        PixelFormat::Rgb1555 => RETRO_PIXEL_FORMAT_0RGB1555,
        PixelFormat::Xrgb8888 => RETRO_PIXEL_FORMAT_XRGB8888,
        PixelFormat::Rgb565 => RETRO_PIXEL_FORMAT_RGB565,
    }
}

fn hw_context_id(context: HwContext) -> c_uint {
    match context {
        HwContext::OpenGl => RETRO_HW_CONTEXT_OPENGL,
        HwContext::OpenGles2 => RETRO_HW_CONTEXT_OPENGLES2,
    }
}

/// Callback table registered by the host
#[derive(Default)]
pub struct RetroHost {
    environment: Option<retro_environment_t>,
    video_refresh: Option<retro_video_refresh_t>,
    audio_batch: Option<retro_audio_sample_batch_t>,
    input_poll: Option<retro_input_poll_t>,
    input_state: Option<retro_input_state_t>,
    current_framebuffer: Option<retro_hw_get_current_framebuffer_t>,
    /// Option descriptors handed to SET_VARIABLES; kept alive for the host
    descriptors: Vec<(CString, CString)>,
}

impl RetroHost {
    pub const fn new() -> Self {
        Self {
            environment: None,
            video_refresh: None,
            audio_batch: None,
            input_poll: None,
            input_state: None,
            current_framebuffer: None,
            descriptors: Vec::new(),
        }
    }

    pub fn set_environment(&mut self, cb: retro_environment_t) {
        self.environment = Some(cb);
    }

    pub fn set_video_refresh(&mut self, cb: retro_video_refresh_t) {
        self.video_refresh = Some(cb);
    }

    pub fn set_audio_sample_batch(&mut self, cb: retro_audio_sample_batch_t) {
        self.audio_batch = Some(cb);
    }

    pub fn set_input_poll(&mut self, cb: retro_input_poll_t) {
        self.input_poll = Some(cb);
    }

    pub fn set_input_state(&mut self, cb: retro_input_state_t) {
        self.input_state = Some(cb);
    }

    /// Issue an environment command
    ///
    /// # Safety
    /// `data` must be what the host expects for `cmd`.
    unsafe fn environment(&self, cmd: c_uint, data: *mut c_void) -> bool {
        match self.environment {
            Some(cb) => cb(cmd, data),
            None => false,
        }
    }

    /// Environment query returning a host-owned C string
    fn query_string(&self, cmd: c_uint) -> Option<String> {
        let mut value: *const c_char = ptr::null();
        let ok = unsafe { self.environment(cmd, &mut value as *mut *const c_char as *mut c_void) };
        if !ok || value.is_null() {
            return None;
        }
        let value = unsafe { CStr::from_ptr(value) };
        Some(value.to_string_lossy().into_owned())
    }

    /// The host's printf-style log callback, if it has one
    pub fn log_interface(&self) -> Option<retro_log_printf_t> {
        let mut callback = retro_log_callback { log: None };
        let ok = unsafe {
            self.environment(
                RETRO_ENVIRONMENT_GET_LOG_INTERFACE,
                &mut callback as *mut retro_log_callback as *mut c_void,
            )
        };
        if ok {
            callback.log
        } else {
            None
        }
    }
}

impl OptionSource for RetroHost {
    fn variable(&self, key: &str) -> Option<String> {
        let key = CString::new(key).ok()?;
        let mut var = retro_variable {
            key: key.as_ptr(),
            value: ptr::null(),
        };
        let ok = unsafe {
            self.environment(
                RETRO_ENVIRONMENT_GET_VARIABLE,
                &mut var as *mut retro_variable as *mut c_void,
            )
        };
        if !ok || var.value.is_null() {
            return None;
        }
        let value = unsafe { CStr::from_ptr(var.value) };
        Some(value.to_string_lossy().into_owned())
    }

    fn language(&self) -> Option<u32> {
        let mut language: c_uint = 0;
        let ok = unsafe {
            self.environment(
                RETRO_ENVIRONMENT_GET_LANGUAGE,
                &mut language as *mut c_uint as *mut c_void,
            )
        };
        ok.then_some(language)
    }
}

impl InputSource for RetroHost {
    fn poll(&mut self) {
        if let Some(cb) = self.input_poll {
            unsafe { cb() }
        }
    }

    fn state(&self, port: u32, device: u32, index: u32, id: u32) -> i16 {
        match self.input_state {
            Some(cb) => unsafe { cb(port, device, index, id) },
            None => 0,
        }
    }
}

impl Host for RetroHost {
    fn set_variables(&mut self, defs: &[OptionDef]) -> bool {
        let mut descriptors = Vec::with_capacity(defs.len());
        for def in defs {
            match (CString::new(def.key), CString::new(def.descriptor())) {
                (Ok(key), Ok(desc)) => descriptors.push((key, desc)),
                _ => tracing::warn!("Skipping option {} with an interior NUL", def.key),
            }
        }

        let mut vars: Vec<retro_variable> = descriptors
            .iter()
            .map(|(key, desc)| retro_variable {
                key: key.as_ptr(),
                value: desc.as_ptr(),
            })
            .collect();
        vars.push(retro_variable {
            key: ptr::null(),
            value: ptr::null(),
        });

        let ok = unsafe {
            self.environment(
                RETRO_ENVIRONMENT_SET_VARIABLES,
                vars.as_mut_ptr() as *mut c_void,
            )
        };
        self.descriptors = descriptors;
        ok
    }

    fn variables_updated(&mut self) -> bool {
        let mut updated = false;
        let ok = unsafe {
            self.environment(
                RETRO_ENVIRONMENT_GET_VARIABLE_UPDATE,
                &mut updated as *mut bool as *mut c_void,
            )
        };
        ok && updated
    }

    fn system_directory(&self) -> Option<String> {
        self.query_string(RETRO_ENVIRONMENT_GET_SYSTEM_DIRECTORY)
    }

    fn username(&self) -> Option<String> {
        self.query_string(RETRO_ENVIRONMENT_GET_USERNAME)
            .filter(|name| !name.is_empty())
    }

    fn set_pixel_format(&mut self, format: PixelFormat) -> bool {
        let mut id = pixel_format_id(format);
        unsafe {
            self.environment(
                RETRO_ENVIRONMENT_SET_PIXEL_FORMAT,
                &mut id as *mut c_uint as *mut c_void,
            )
        }
    }

    fn set_hw_render(&mut self, request: &HwRenderRequest) -> Option<GraphicsContext> {
        let mut hw = retro_hw_render_callback {
            context_type: hw_context_id(request.context),
            context_reset: Some(context_reset),
            get_current_framebuffer: None,
            get_proc_address: None,
            depth: request.depth,
            stencil: request.stencil,
            bottom_left_origin: request.bottom_left_origin,
            version_major: 0,
            version_minor: 0,
            cache_context: false,
            context_destroy: None,
            debug_context: false,
        };
        let ok = unsafe {
            self.environment(
                RETRO_ENVIRONMENT_SET_HW_RENDER,
                &mut hw as *mut retro_hw_render_callback as *mut c_void,
            )
        };
        if !ok {
            return None;
        }

        self.current_framebuffer = hw.get_current_framebuffer;
        Some(GraphicsContext {
            context: Some(request.context),
            proc_address: hw.get_proc_address,
        })
    }

    fn current_framebuffer(&self) -> usize {
        match self.current_framebuffer {
            Some(cb) => unsafe { cb() },
            None => 0,
        }
    }

    fn video_refresh_hw(&mut self, width: u32, height: u32) {
        if let Some(cb) = self.video_refresh {
            unsafe { cb(RETRO_HW_FRAME_BUFFER_VALID, width, height, 0) }
        }
    }

    fn audio_batch(&mut self, samples: &[i16]) -> usize {
        match self.audio_batch {
            Some(cb) => unsafe { cb(samples.as_ptr(), samples.len() / 2) },
            None => 0,
        }
    }

    fn request_shutdown(&mut self) {
        let ok = unsafe { self.environment(RETRO_ENVIRONMENT_SHUTDOWN, ptr::null_mut()) };
        if !ok {
            tracing::warn!("Host ignored the shutdown request");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// What the fake host environment answers and records, per test thread
    #[derive(Default)]
    struct FakeEnv {
        variables: HashMap<String, CString>,
        registered: Vec<(String, String)>,
        system_dir: Option<CString>,
        pixel_format: Option<c_uint>,
        accept_hw: bool,
        hw_context: Option<c_uint>,
        shutdown: bool,
        refreshes: Vec<(usize, c_uint, c_uint)>,
        polls: u32,
    }

    thread_local! {
        static ENV: RefCell<FakeEnv> = RefCell::new(FakeEnv::default());
    }

    unsafe extern "C" fn fake_framebuffer() -> usize {
        7
    }

    unsafe extern "C" fn fake_environment(cmd: c_uint, data: *mut c_void) -> bool {
        ENV.with(|env| {
            let mut env = env.borrow_mut();
            match cmd {
                RETRO_ENVIRONMENT_GET_VARIABLE => {
                    let var = &mut *(data as *mut retro_variable);
                    let key = CStr::from_ptr(var.key).to_string_lossy().into_owned();
                    match env.variables.get(&key) {
                        Some(value) => {
                            var.value = value.as_ptr();
                            true
                        }
                        None => false,
                    }
                }
                RETRO_ENVIRONMENT_SET_VARIABLES => {
                    let mut var = data as *const retro_variable;
                    while !(*var).key.is_null() {
                        let key = CStr::from_ptr((*var).key).to_string_lossy().into_owned();
                        let desc = CStr::from_ptr((*var).value).to_string_lossy().into_owned();
                        env.registered.push((key, desc));
                        var = var.add(1);
                    }
                    true
                }
                RETRO_ENVIRONMENT_GET_SYSTEM_DIRECTORY => match &env.system_dir {
                    Some(dir) => {
                        *(data as *mut *const c_char) = dir.as_ptr();
                        true
                    }
                    None => false,
                },
                RETRO_ENVIRONMENT_SET_PIXEL_FORMAT => {
                    let format = *(data as *const c_uint);
                    env.pixel_format = Some(format);
                    format == RETRO_PIXEL_FORMAT_XRGB8888
                }
                RETRO_ENVIRONMENT_SET_HW_RENDER => {
                    if !env.accept_hw {
                        return false;
                    }
                    let hw = &mut *(data as *mut retro_hw_render_callback);
                    env.hw_context = Some(hw.context_type);
                    hw.get_current_framebuffer = Some(fake_framebuffer);
                    true
                }
                RETRO_ENVIRONMENT_GET_LANGUAGE => {
                    *(data as *mut c_uint) = 4;
                    true
                }
                RETRO_ENVIRONMENT_SHUTDOWN => {
                    env.shutdown = true;
                    true
                }
                _ => false,
            }
        })
    }

    unsafe extern "C" fn fake_video(data: *const c_void, width: c_uint, height: c_uint, _pitch: usize) {
        ENV.with(|env| env.borrow_mut().refreshes.push((data as usize, width, height)));
    }

    unsafe extern "C" fn fake_poll() {
        ENV.with(|env| env.borrow_mut().polls += 1);
    }

    unsafe extern "C" fn fake_state(_port: c_uint, _device: c_uint, _index: c_uint, id: c_uint) -> i16 {
        (id == 3) as i16
    }

    fn host() -> RetroHost {
        ENV.with(|env| *env.borrow_mut() = FakeEnv::default());
        let mut host = RetroHost::new();
        host.set_environment(fake_environment);
        host.set_video_refresh(fake_video);
        host.set_input_poll(fake_poll);
        host.set_input_state(fake_state);
        host
    }

    #[test]
    fn test_without_callbacks() {
        let mut host = RetroHost::new();
        assert_eq!(host.variable("ppsspp_cpu_core"), None);
        assert_eq!(host.system_directory(), None);
        assert!(!host.set_pixel_format(PixelFormat::Xrgb8888));
        assert!(host.set_hw_render(&HwRenderRequest::for_core()).is_none());
        assert_eq!(host.state(0, 1, 0, 0), 0);
        assert_eq!(host.current_framebuffer(), 0);
        assert!(host.log_interface().is_none());
    }

    #[test]
    fn test_variable_lookup() {
        let host = host();
        ENV.with(|env| {
            env.borrow_mut()
                .variables
                .insert("ppsspp_frameskip".to_string(), CString::new("3").unwrap())
        });

        assert_eq!(host.variable("ppsspp_frameskip"), Some("3".to_string()));
        assert_eq!(host.variable("ppsspp_cpu_core"), None);
        assert_eq!(host.language(), Some(4));
    }

    #[test]
    fn test_set_variables_registers_descriptors() {
        let mut host = host();
        assert!(host.set_variables(rp_core::OPTION_DEFS));

        ENV.with(|env| {
            let env = env.borrow();
            assert_eq!(env.registered.len(), rp_core::OPTION_DEFS.len());
            assert_eq!(
                env.registered[0],
                ("ppsspp_cpu_core".to_string(), "CPU Core; jit|interpreter".to_string())
            );
        });
    }

    #[test]
    fn test_system_directory() {
        let host = host();
        ENV.with(|env| env.borrow_mut().system_dir = Some(CString::new("/retro/system/").unwrap()));
        assert_eq!(host.system_directory(), Some("/retro/system/".to_string()));
    }

    #[test]
    fn test_negotiation() {
        let mut host = host();
        assert!(host.set_pixel_format(PixelFormat::Xrgb8888));
        assert!(!host.set_pixel_format(PixelFormat::Rgb565));

        assert!(host.set_hw_render(&HwRenderRequest::for_core()).is_none());

        ENV.with(|env| env.borrow_mut().accept_hw = true);
        let request = HwRenderRequest::for_core();
        let granted = host.set_hw_render(&request).unwrap();
        assert_eq!(granted.context, Some(request.context));
        assert_eq!(host.current_framebuffer(), 7);
        ENV.with(|env| assert_eq!(env.borrow().hw_context, Some(hw_context_id(request.context))));
    }

    #[test]
    fn test_frame_output_and_shutdown() {
        let mut host = host();
        host.poll();
        assert_eq!(host.state(0, RETRO_DEVICE_JOYPAD, 0, 3), 1);
        assert_eq!(host.state(0, RETRO_DEVICE_JOYPAD, 0, 2), 0);

        host.video_refresh_hw(960, 544);
        host.request_shutdown();

        ENV.with(|env| {
            let env = env.borrow();
            assert_eq!(env.polls, 1);
            assert_eq!(env.refreshes, vec![(usize::MAX, 960, 544)]);
            assert!(env.shutdown);
        });
    }
}
