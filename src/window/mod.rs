//! Demo Window State
//!
//! Tracks everything the harness knows about its single toplevel window:
//! - Requested, logical and buffer sizes
//! - Fullscreen/maximized/opaque flags
//! - The outputs the surface currently overlaps
//! - The lifecycle state (unconfigured → awaiting configure → ready → closing)
//!
//! The window never talks to the compositor itself. Geometry recomputation
//! returns a [`GeometryUpdate`] describing what the caller has to push to the
//! surface and the native EGL window.

use crate::output::{OutputId, OutputRegistry, OutputTransform};
use log::{debug, info};

/// Width/height pair in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Same size with the axes swapped
    pub fn transposed(self) -> Self {
        Self::new(self.height, self.width)
    }

    /// Both axes times `factor`, saturating at `i32::MAX`
    pub fn scaled(self, factor: i32) -> Self {
        Self::new(
            self.width.saturating_mul(factor),
            self.height.saturating_mul(factor),
        )
    }

    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Window flags chosen at startup from the command line and config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOptions {
    pub fullscreen: bool,
    pub maximized: bool,
    pub opaque: bool,
    /// Sync buffer swaps to the compositor's redraw
    pub frame_sync: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            fullscreen: false,
            maximized: false,
            opaque: false,
            frame_sync: true,
        }
    }
}

/// Lifecycle of the window surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceState {
    /// No surface has been requested yet
    #[default]
    Unconfigured,
    /// Surface committed, waiting for the first `xdg_surface.configure`
    AwaitingConfigure,
    /// Configured; buffers may be attached
    Ready,
    /// Close requested by the compositor, the user or a signal
    Closing,
}

/// Changes produced by recomputing buffer geometry.
///
/// Each field is `Some` only if the value differs from the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeometryUpdate {
    pub transform: Option<OutputTransform>,
    pub scale: Option<i32>,
    pub buffer_size: Option<Size>,
}

impl GeometryUpdate {
    pub fn is_empty(&self) -> bool {
        self.transform.is_none() && self.scale.is_none() && self.buffer_size.is_none()
    }
}

/// The harness's one toplevel window
#[derive(Debug, Clone)]
pub struct Window {
    /// Size requested at startup, updated by non-fullscreen/non-maximized configures
    window_size: Size,
    /// Size the compositor asked for, in surface coordinates
    logical_size: Size,
    /// Pixel size of the EGL buffers
    buffer_size: Size,
    buffer_scale: i32,
    buffer_transform: OutputTransform,
    needs_buffer_geometry_update: bool,
    fullscreen: bool,
    maximized: bool,
    opaque: bool,
    frame_sync: bool,
    state: SurfaceState,
    /// Outputs the surface overlaps, oldest entered first
    outputs: Vec<OutputId>,
}

impl Window {
    pub fn new(size: Size, options: WindowOptions) -> Self {
        Self {
            window_size: size,
            logical_size: size,
            buffer_size: size,
            buffer_scale: 1,
            buffer_transform: OutputTransform::Normal,
            needs_buffer_geometry_update: false,
            fullscreen: options.fullscreen,
            maximized: options.maximized,
            opaque: options.opaque,
            frame_sync: options.frame_sync,
            state: SurfaceState::Unconfigured,
            outputs: Vec::new(),
        }
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    /// Records that the surface was created and committed without a buffer
    pub fn request_surface(&mut self) {
        if self.state == SurfaceState::Unconfigured {
            self.state = SurfaceState::AwaitingConfigure;
        }
    }

    /// Records an acknowledged `xdg_surface.configure`.
    ///
    /// Returns `true` only for the configure that made the window ready.
    pub fn ack_configure(&mut self) -> bool {
        if self.state == SurfaceState::AwaitingConfigure {
            debug!("first configure received, window is ready");
            self.state = SurfaceState::Ready;
            return true;
        }
        false
    }

    pub fn is_awaiting_configure(&self) -> bool {
        self.state == SurfaceState::AwaitingConfigure
    }

    pub fn is_ready(&self) -> bool {
        self.state == SurfaceState::Ready
    }

    /// Moves the window to the terminal state
    pub fn request_close(&mut self) {
        if self.state != SurfaceState::Closing {
            info!("window close requested");
            self.state = SurfaceState::Closing;
        }
    }

    pub fn is_closing(&self) -> bool {
        self.state == SurfaceState::Closing
    }

    /// Applies an `xdg_toplevel.configure` event.
    ///
    /// The flags reflect exactly the states listed in the event. A positive
    /// size becomes the logical size, and also the remembered window size
    /// unless the window is fullscreen or maximized. A zero size restores the
    /// remembered window size when neither flag is set.
    pub fn handle_toplevel_configure(
        &mut self,
        width: i32,
        height: i32,
        fullscreen: bool,
        maximized: bool,
    ) {
        self.fullscreen = fullscreen;
        self.maximized = maximized;

        if width > 0 && height > 0 {
            let size = Size::new(width, height);
            self.logical_size = size;
            if !self.fullscreen && !self.maximized {
                self.window_size = size;
            }
        } else if !self.fullscreen && !self.maximized {
            self.logical_size = self.window_size;
        }

        self.needs_buffer_geometry_update = true;
    }

    /// Adds an output the surface now overlaps. Unknown outputs are ignored.
    pub fn enter_output(&mut self, id: OutputId, registry: &OutputRegistry) -> bool {
        if !registry.contains(id) {
            debug!("surface entered untracked output {}", id.0);
            return false;
        }
        if !self.outputs.contains(&id) {
            self.outputs.push(id);
        }
        self.needs_buffer_geometry_update = true;
        true
    }

    /// Drops an output from the overlap set
    pub fn leave_output(&mut self, id: OutputId) -> bool {
        let before = self.outputs.len();
        self.outputs.retain(|o| *o != id);
        if self.outputs.len() == before {
            return false;
        }
        self.needs_buffer_geometry_update = true;
        true
    }

    pub fn mark_geometry_dirty(&mut self) {
        self.needs_buffer_geometry_update = true;
    }

    pub fn needs_geometry_update(&self) -> bool {
        self.needs_buffer_geometry_update
    }

    /// Recomputes scale, transform and buffer size from the entered outputs.
    ///
    /// Buffer size is the logical size, transposed for 90°/270° transforms,
    /// times the scale. Clears the dirty flag.
    pub fn update_buffer_geometry(&mut self, registry: &OutputRegistry) -> GeometryUpdate {
        let mut update = GeometryUpdate::default();

        let transform = registry.compute_transform(self);
        if transform != self.buffer_transform {
            self.buffer_transform = transform;
            update.transform = Some(transform);
        }

        let scale = registry.compute_scale(self);
        if scale != self.buffer_scale {
            self.buffer_scale = scale;
            update.scale = Some(scale);
        }

        let oriented = if transform.is_rotated() {
            self.logical_size.transposed()
        } else {
            self.logical_size
        };
        let buffer_size = oriented.scaled(scale);
        if buffer_size != self.buffer_size {
            debug!("buffer size {} -> {}", self.buffer_size, buffer_size);
            self.buffer_size = buffer_size;
            update.buffer_size = Some(buffer_size);
        }

        self.needs_buffer_geometry_update = false;
        update
    }

    /// Opaque-region hint applies when opaque was requested or fullscreen
    pub fn wants_opaque_region(&self) -> bool {
        self.opaque || self.fullscreen
    }

    pub fn window_size(&self) -> Size {
        self.window_size
    }

    pub fn logical_size(&self) -> Size {
        self.logical_size
    }

    pub fn buffer_size(&self) -> Size {
        self.buffer_size
    }

    pub fn buffer_scale(&self) -> i32 {
        self.buffer_scale
    }

    pub fn buffer_transform(&self) -> OutputTransform {
        self.buffer_transform
    }

    pub fn outputs(&self) -> &[OutputId] {
        &self.outputs
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn is_maximized(&self) -> bool {
        self.maximized
    }

    pub fn is_opaque(&self) -> bool {
        self.opaque
    }

    pub fn frame_sync(&self) -> bool {
        self.frame_sync
    }
}
