//! Lifecycle controller
//!
//! [`Frontend`] is the single context object behind the plugin ABI. The host
//! drives it through a fixed sequence:
//! 1. [`register_options`] when the environment callback arrives
//! 2. [`Frontend::init`] to resolve the storage directory
//! 3. [`Frontend::load_game`] to negotiate formats and prepare the session
//! 4. [`Frontend::run_frame`], once per displayed frame
//! 5. [`Frontend::unload`], then drop

use crate::emulator::{EmulatorCore, FrontendShim};
use crate::host::{GraphicsContext, Host, HwRenderRequest, PixelFormat};
use crate::runner::{FrameRunner, RunnerState};
use rp_core::config::SETTINGS_FILE_NAME;
use rp_core::options::OPTION_DEFS;
use rp_core::{
    CoreOptions, CoreParameter, CoreSettings, NegotiationError, PathConfig, Resolution, Result,
};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// Largest audio batch pushed per frame, in stereo frames
pub const AUDIO_BATCH_FRAMES: usize = 8192;

/// Directory under the base directory holding everything the core writes
pub const SESSION_DIR_NAME: &str = "PPSSPP";

/// Static description of the core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemInfo {
    pub library_name: &'static str,
    pub valid_extensions: &'static str,
    pub need_fullpath: bool,
}

impl SystemInfo {
    pub const fn get() -> Self {
        Self {
            library_name: "PPSSPP",
            valid_extensions: "elf|iso|cso|prx|pbp",
            need_fullpath: true,
        }
    }

    /// Whether `path` has one of the advertised extensions
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.valid_extensions.split('|').any(|valid| valid == ext)
            })
            .unwrap_or(false)
    }
}

/// Timing and geometry reported to the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvInfo {
    pub fps: f64,
    pub sample_rate: f64,
    pub base: Resolution,
    pub max: Resolution,
    pub aspect_ratio: f32,
}

impl AvInfo {
    /// NTSC timing, 16:9, fixed at `output`
    pub fn for_output(output: Resolution) -> Self {
        Self {
            fps: 60.0 / 1.001,
            sample_rate: 44_100.0,
            base: output,
            max: output,
            aspect_ratio: 16.0 / 9.0,
        }
    }
}

/// Register every option with the host
pub fn register_options<H: Host>(host: &mut H) -> bool {
    let accepted = host.set_variables(OPTION_DEFS);
    if !accepted {
        tracing::warn!("Host did not accept the option table");
    }
    accepted
}

/// Strip trailing `/` and `\`, keeping a path made only of separators as is
pub fn normalize_base_dir(dir: &str) -> String {
    let trimmed = dir.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        dir.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Directory part of a game path, `.` when it has none
pub fn game_directory(game: &str) -> String {
    match game.rfind(['/', '\\']) {
        Some(idx) => game[..idx].to_string(),
        None => ".".to_string(),
    }
}

/// The single binding context
pub struct Frontend<C: EmulatorCore> {
    core: C,
    shim: FrontendShim,
    runner: FrameRunner,
    options: CoreOptions,
    settings: CoreSettings,
    params: CoreParameter,
    graphics: GraphicsContext,
    /// From the host's system directory, if it gave one
    base_dir: Option<String>,
    /// `<base>/PPSSPP/` once a game is loaded
    session_root: Option<String>,
    loaded: bool,
    audio: Vec<i16>,
}

impl<C: EmulatorCore> Frontend<C> {
    /// Resolve the storage directory and wrap `core`
    pub fn init<H: Host>(core: C, host: &H) -> Self {
        let base_dir = host
            .system_directory()
            .map(|dir| normalize_base_dir(&dir));

        match &base_dir {
            Some(dir) => tracing::info!("System directory: {}", dir),
            None => tracing::info!("No system directory, falling back to the game's directory"),
        }

        Self {
            core,
            shim: FrontendShim::new(),
            runner: FrameRunner::new(),
            options: CoreOptions::default(),
            settings: CoreSettings::default(),
            params: CoreParameter::default(),
            graphics: GraphicsContext::default(),
            base_dir,
            session_root: None,
            loaded: false,
            audio: vec![0; AUDIO_BATCH_FRAMES * 2],
        }
    }

    pub fn core(&self) -> &C {
        &self.core
    }

    pub fn runner(&self) -> &FrameRunner {
        &self.runner
    }

    pub fn state(&self) -> RunnerState {
        self.runner.state()
    }

    pub fn options(&self) -> &CoreOptions {
        &self.options
    }

    pub fn settings(&self) -> &CoreSettings {
        &self.settings
    }

    pub fn params(&self) -> &CoreParameter {
        &self.params
    }

    pub fn base_dir(&self) -> Option<&str> {
        self.base_dir.as_deref()
    }

    pub fn session_root(&self) -> Option<&str> {
        self.session_root.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Re-read every option from the host and push the result to the core
    pub fn apply_configuration<H: Host>(&mut self, host: &H) {
        self.options = CoreOptions::from_source(host);
        self.options.apply(&mut self.settings, &mut self.params);
        self.runner.frame_mut().output = self.options.output_resolution;
        if self.loaded {
            self.core.apply_settings(&self.settings);
        }
        tracing::debug!(
            "Options applied: render {} output {}",
            self.params.render_resolution,
            self.params.pixel_resolution
        );
    }

    /// Negotiate with the host and prepare the session for `game`
    ///
    /// The core itself boots lazily on the first frame. On error nothing
    /// about the session is kept.
    pub fn load_game<H: Host>(&mut self, host: &mut H, game: &str) -> Result<()> {
        if !SystemInfo::get().accepts(Path::new(game)) {
            tracing::warn!("{} does not have a known PSP extension", game);
        }

        let base_dir = self
            .base_dir
            .clone()
            .unwrap_or_else(|| game_directory(game));
        let options = CoreOptions::from_source(&*host);

        let session_root = format!(
            "{base_dir}{sep}{SESSION_DIR_NAME}{sep}",
            sep = MAIN_SEPARATOR
        );

        let format = PixelFormat::Xrgb8888;
        if !host.set_pixel_format(format) {
            tracing::error!("{} is not supported.", format.name());
            return Err(NegotiationError::PixelFormat(format.name()).into());
        }

        let request = HwRenderRequest::for_core();
        let graphics = host.set_hw_render(&request).ok_or_else(|| {
            tracing::error!("{} context is not supported.", request.context.name());
            NegotiationError::HwRender(request.context.name())
        })?;

        self.core.register_asset_root(Path::new(&session_root));

        let settings_path = PathBuf::from(&session_root).join(SETTINGS_FILE_NAME);
        let mut settings = CoreSettings::load_or_default(&settings_path);
        let mut params = CoreParameter::for_game(Path::new(game));
        // Host options win over the settings file
        options.apply(&mut settings, &mut params);

        settings.paths = PathConfig::rooted_at(&session_root);
        settings.apply_embedding(params.cpu_core);
        if let Some(name) = host.username() {
            settings.nickname = name;
        }

        self.core.apply_settings(&settings);
        self.graphics = graphics;
        self.shim = FrontendShim::new();
        self.runner = FrameRunner::new();
        self.runner.frame_mut().output = options.output_resolution;
        self.options = options;
        self.settings = settings;
        self.params = params;
        self.session_root = Some(session_root);
        self.loaded = true;

        tracing::info!("Loaded {}", game);
        Ok(())
    }

    /// Produce one frame
    pub fn run_frame<H: Host>(&mut self, host: &mut H) {
        if !self.loaded || self.runner.is_shutdown() {
            return;
        }
        self.runner.begin_frame();

        if host.variables_updated() {
            self.apply_configuration(host);
        }

        let framebuffer = host.current_framebuffer();
        self.runner.frame_mut().framebuffer = framebuffer;
        self.core.set_target_framebuffer(framebuffer);

        let pad = rp_input::poll_and_map(host);
        self.runner.frame_mut().pad = pad;
        pad.apply_to(&mut self.core);

        if let Err(e) =
            self.runner
                .prepare(&mut self.core, &mut self.shim, &self.params, &self.graphics)
        {
            tracing::error!("{}", e);
            host.request_shutdown();
            return;
        }

        self.runner.run_to_frame_boundary(&mut self.core);

        self.upload_audio(host);
        let output = self.runner.frame().output;
        host.video_refresh_hw(output.width, output.height);
    }

    fn upload_audio<H: Host>(&mut self, host: &mut H) {
        if !self.shim.sound_attached() {
            return;
        }
        let frames = self.core.mix_audio(&mut self.audio);
        if frames > 0 {
            host.audio_batch(&self.audio[..frames * 2]);
        }
    }

    /// Restart the game at the next frame
    pub fn reset(&mut self) {
        self.runner.request_reset();
    }

    /// Tear the core down; no further frames are processed
    pub fn unload(&mut self) {
        self.runner.shutdown(&mut self.core, &mut self.shim);
        if self.loaded {
            tracing::info!("Game unloaded");
        }
    }

    pub fn av_info(&self) -> AvInfo {
        AvInfo::for_output(self.options.output_resolution)
    }

    pub fn serialize_size(&self) -> usize {
        0
    }

    pub fn serialize(&self, _data: &mut [u8]) -> bool {
        false
    }

    pub fn unserialize(&mut self, _data: &[u8]) -> bool {
        false
    }

    pub fn memory_size(&self, _id: u32) -> usize {
        0
    }

    pub fn cheat_reset(&mut self) {}

    pub fn cheat_set(&mut self, _index: u32, _enabled: bool, _code: &str) {}
}
