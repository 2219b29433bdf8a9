//! EGL display, context and window surfaces
//!
//! Loads `libEGL` at runtime, creates a display for the Wayland connection,
//! picks a window-renderable RGBA config and creates an OpenGL ES context.
//! When the stack offers buffer age together with one of the
//! swap-with-damage extensions, partial presentation is enabled.

use crate::config::EglConfig;
use crate::window::Size;
use khronos_egl as egl;
use log::{debug, info, warn};
use std::ffi::c_void;
use thiserror::Error;
use wayland_client::protocol::wl_surface::WlSurface;
use wayland_client::{Connection, Proxy};
use wayland_egl::WlEglSurface;

const PLATFORM_WAYLAND_KHR: egl::Enum = 0x31D8;
const BUFFER_AGE_EXT: egl::Int = 0x313D;
const OPENGL_ES3_BIT: egl::Int = 0x0040;

const EXT_BUFFER_AGE: &str = "EGL_EXT_buffer_age";
const DAMAGE_EXTENSIONS: [(&str, &str); 2] = [
    ("EGL_EXT_swap_buffers_with_damage", "eglSwapBuffersWithDamageEXT"),
    ("EGL_KHR_swap_buffers_with_damage", "eglSwapBuffersWithDamageKHR"),
];

type SwapBuffersWithDamageFn =
    unsafe extern "system" fn(*mut c_void, *mut c_void, *const egl::Int, egl::Int) -> egl::Boolean;

#[derive(Debug, Error)]
pub enum EglError {
    #[error("failed to load libEGL: {0}")]
    Load(String),

    #[error("no EGL display for the Wayland connection")]
    NoDisplay,

    #[error("{call} failed: {source}")]
    Call {
        call: &'static str,
        #[source]
        source: egl::Error,
    },

    #[error("no EGL config matches the requested attributes")]
    NoConfig,

    #[error("creating native window: {0}")]
    NativeWindow(#[from] wayland_egl::Error),
}

fn failed(call: &'static str) -> impl FnOnce(egl::Error) -> EglError {
    move |source| EglError::Call { call, source }
}

/// Whole-token match in a space separated extension string
pub fn has_extension(extensions: &str, name: &str) -> bool {
    extensions.split_ascii_whitespace().any(|ext| ext == name)
}

/// Resolves which damage-swap extension to use, if any.
///
/// Buffer age is required; the EXT variant is preferred over KHR.
pub fn select_damage_extension(extensions: &str) -> Option<(&'static str, &'static str)> {
    if !has_extension(extensions, EXT_BUFFER_AGE) {
        return None;
    }
    DAMAGE_EXTENSIONS
        .iter()
        .find(|(ext, _)| has_extension(extensions, ext))
        .copied()
}

/// Config attributes for a window-renderable RGBA config
pub fn config_attributes(opaque: bool, client_version: i32) -> [egl::Int; 13] {
    let renderable = if client_version >= 3 {
        OPENGL_ES3_BIT
    } else {
        egl::OPENGL_ES2_BIT
    };
    [
        egl::SURFACE_TYPE,
        egl::WINDOW_BIT,
        egl::RED_SIZE,
        1,
        egl::GREEN_SIZE,
        1,
        egl::BLUE_SIZE,
        1,
        egl::ALPHA_SIZE,
        if opaque { 0 } else { 1 },
        egl::RENDERABLE_TYPE,
        renderable,
        egl::NONE,
    ]
}

/// EGL display, config and context for one Wayland connection
pub struct EglContext {
    lib: egl::DynamicInstance<egl::EGL1_4>,
    display: egl::Display,
    config: egl::Config,
    context: egl::Context,
    swap_with_damage: Option<SwapBuffersWithDamageFn>,
    swap_interval_when_unsynced: i32,
}

impl EglContext {
    pub fn new(conn: &Connection, config: &EglConfig, opaque: bool) -> Result<Self, EglError> {
        let lib = unsafe { egl::DynamicInstance::<egl::EGL1_4>::load_required() }
            .map_err(|e| EglError::Load(e.to_string()))?;

        let native_display = conn.backend().display_ptr() as *mut c_void;
        let display = match lib.upcast::<egl::EGL1_5>() {
            Some(egl15) => unsafe {
                egl15.get_platform_display(PLATFORM_WAYLAND_KHR, native_display, &[egl::ATTRIB_NONE])
            }
            .map_err(failed("eglGetPlatformDisplay"))?,
            None => unsafe { lib.get_display(native_display) }.ok_or(EglError::NoDisplay)?,
        };

        let (major, minor) = lib.initialize(display).map_err(failed("eglInitialize"))?;
        debug!("EGL {major}.{minor} initialized");

        lib.bind_api(egl::OPENGL_ES_API)
            .map_err(failed("eglBindAPI"))?;

        let count = lib
            .get_config_count(display)
            .map_err(failed("eglGetConfigs"))?;
        if count == 0 {
            return Err(EglError::NoConfig);
        }

        let attributes = config_attributes(opaque, config.context_client_version);
        let egl_config = lib
            .choose_first_config(display, &attributes)
            .map_err(failed("eglChooseConfig"))?
            .ok_or(EglError::NoConfig)?;

        let context_attributes = [
            egl::CONTEXT_CLIENT_VERSION,
            config.context_client_version,
            egl::NONE,
        ];
        let context = lib
            .create_context(display, egl_config, None, &context_attributes)
            .map_err(failed("eglCreateContext"))?;

        let extensions = lib
            .query_string(Some(display), egl::EXTENSIONS)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let swap_with_damage = match select_damage_extension(&extensions) {
            Some((extension, entry_point)) => match lib.get_proc_address(entry_point) {
                Some(f) => {
                    info!("has {EXT_BUFFER_AGE} and {extension}");
                    Some(unsafe {
                        std::mem::transmute::<extern "system" fn(), SwapBuffersWithDamageFn>(f)
                    })
                }
                None => {
                    warn!("{extension} advertised but {entry_point} is missing");
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            lib,
            display,
            config: egl_config,
            context,
            swap_with_damage,
            swap_interval_when_unsynced: config.swap_interval_when_unsynced,
        })
    }

    /// Resolves GL entry points through `eglGetProcAddress`
    pub fn load_gl(&self) {
        gl::load_with(|name| {
            self.lib
                .get_proc_address(name)
                .map_or(std::ptr::null(), |f| f as *const c_void)
        });
    }

    pub fn supports_damage_swap(&self) -> bool {
        self.swap_with_damage.is_some()
    }

    /// Creates the native window and EGL surface for `wl_surface` and makes
    /// the context current on it
    pub fn create_window_surface(
        &self,
        wl_surface: &WlSurface,
        size: Size,
        frame_sync: bool,
    ) -> Result<EglWindowSurface, EglError> {
        let native = WlEglSurface::new(wl_surface.id(), size.width, size.height)?;

        let surface = unsafe {
            self.lib.create_window_surface(
                self.display,
                self.config,
                native.ptr() as egl::NativeWindowType,
                None,
            )
        }
        .map_err(failed("eglCreateWindowSurface"))?;

        let window = EglWindowSurface { native, surface };
        self.make_current(&window)?;

        if !frame_sync {
            self.lib
                .swap_interval(self.display, self.swap_interval_when_unsynced)
                .map_err(failed("eglSwapInterval"))?;
        }

        debug!("EGL window surface created at {size}");
        Ok(window)
    }

    pub fn make_current(&self, window: &EglWindowSurface) -> Result<(), EglError> {
        self.lib
            .make_current(
                self.display,
                Some(window.surface),
                Some(window.surface),
                Some(self.context),
            )
            .map_err(failed("eglMakeCurrent"))
    }

    pub fn release_current(&self) -> Result<(), EglError> {
        self.lib
            .make_current(self.display, None, None, None)
            .map_err(failed("eglMakeCurrent"))
    }

    /// Age of the surface's back buffer; 0 when unknown
    pub fn buffer_age(&self, window: &EglWindowSurface) -> i32 {
        self.lib
            .query_surface(self.display, window.surface, BUFFER_AGE_EXT)
            .unwrap_or(0)
    }

    pub fn swap_buffers(&self, window: &EglWindowSurface) -> Result<(), EglError> {
        self.lib
            .swap_buffers(self.display, window.surface)
            .map_err(failed("eglSwapBuffers"))
    }

    /// Swaps presenting `rects`, four values per rectangle. Falls back to a
    /// full swap when no damage entry point was resolved.
    pub fn swap_buffers_with_damage(
        &self,
        window: &EglWindowSurface,
        rects: &[egl::Int],
    ) -> Result<(), EglError> {
        let Some(swap) = self.swap_with_damage else {
            return self.swap_buffers(window);
        };

        let ok = unsafe {
            swap(
                self.display.as_ptr(),
                window.surface.as_ptr(),
                rects.as_ptr(),
                (rects.len() / 4) as egl::Int,
            )
        };
        if ok == egl::FALSE {
            return Err(EglError::Call {
                call: "eglSwapBuffersWithDamage",
                source: self.lib.get_error().unwrap_or(egl::Error::BadSurface),
            });
        }
        Ok(())
    }

    /// Releases the context from the surface and destroys both the EGL
    /// surface and the native window
    pub fn destroy_surface(&self, window: EglWindowSurface) {
        if let Err(e) = self.release_current() {
            warn!("{e}");
        }
        if let Err(e) = self.lib.destroy_surface(self.display, window.surface) {
            warn!("eglDestroySurface failed: {e}");
        }
        drop(window.native);
    }

    /// Destroys the context, terminates the display and releases the thread
    pub fn terminate(self) {
        if let Err(e) = self.lib.destroy_context(self.display, self.context) {
            warn!("eglDestroyContext failed: {e}");
        }
        if let Err(e) = self.lib.terminate(self.display) {
            warn!("eglTerminate failed: {e}");
        }
        if let Err(e) = self.lib.release_thread() {
            warn!("eglReleaseThread failed: {e}");
        }
        debug!("EGL terminated");
    }
}

/// EGL window surface plus the native `wl_egl_window` behind it
pub struct EglWindowSurface {
    native: WlEglSurface,
    surface: egl::Surface,
}

impl EglWindowSurface {
    /// Resizes the native window; the EGL surface follows on the next swap
    pub fn resize(&self, size: Size) {
        self.native.resize(size.width, size.height, 0, 0);
    }
}
