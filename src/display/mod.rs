//! Wayland connection state
//!
//! [`DisplayState`] is the dispatch target of the harness's event queue. It
//! owns the bound globals, the input devices, the output arena and the window
//! state, and translates protocol events into calls on the output tracker and
//! the window.

mod input;

use crate::app::AppInfo;
use crate::config::CursorConfig;
use crate::output::{OutputId, OutputRegistry, OutputTransform};
use crate::window::{GeometryUpdate, Window, WindowOptions};
use anyhow::{Context, Result};
use input::{CursorState, InputDevices};
use log::{debug, info, trace, warn};
use wayland_client::protocol::{
    wl_compositor::WlCompositor, wl_output, wl_output::WlOutput, wl_region::WlRegion,
    wl_registry, wl_seat::WlSeat, wl_shm::WlShm, wl_surface, wl_surface::WlSurface,
};
use wayland_client::{delegate_noop, Connection, Dispatch, Proxy, QueueHandle, WEnum};
use wayland_protocols::xdg::shell::client::{
    xdg_surface::{self, XdgSurface},
    xdg_toplevel::{self, XdgToplevel},
    xdg_wm_base::{self, XdgWmBase},
};

/// What a `wl_surface` created by the harness is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceRole {
    Window,
    Cursor,
}

/// Protocol objects backing the toplevel window
struct WindowSurfaces {
    surface: WlSurface,
    xdg_surface: XdgSurface,
    toplevel: XdgToplevel,
}

/// Fullscreen and maximized flags from an `xdg_toplevel.configure` state array
pub fn toplevel_flags(states: &[u8]) -> (bool, bool) {
    let mut fullscreen = false;
    let mut maximized = false;

    for chunk in states.chunks_exact(4) {
        let raw = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        match xdg_toplevel::State::try_from(raw) {
            Ok(xdg_toplevel::State::Fullscreen) => fullscreen = true,
            Ok(xdg_toplevel::State::Maximized) => maximized = true,
            _ => {}
        }
    }

    (fullscreen, maximized)
}

pub struct DisplayState {
    pub(crate) compositor: Option<WlCompositor>,
    wm_base: Option<XdgWmBase>,
    seat: Option<WlSeat>,
    input: InputDevices,
    cursor: CursorState,
    pub(crate) outputs: OutputRegistry,
    output_proxies: Vec<(OutputId, WlOutput)>,
    pub(crate) window: Window,
    surfaces: Option<WindowSurfaces>,
    title: String,
    app_id: String,
}

impl DisplayState {
    pub fn new(info: &AppInfo, options: WindowOptions, cursor: CursorConfig) -> Self {
        Self {
            compositor: None,
            wm_base: None,
            seat: None,
            input: InputDevices::default(),
            cursor: CursorState::new(cursor),
            outputs: OutputRegistry::new(),
            output_proxies: Vec::new(),
            window: Window::new(info.size(), options),
            surfaces: None,
            title: info.name.clone(),
            app_id: info.id.clone(),
        }
    }

    /// Whether the compositor advertised `xdg_wm_base`
    pub fn has_shell(&self) -> bool {
        self.wm_base.is_some()
    }

    pub fn wl_surface(&self) -> Option<&WlSurface> {
        self.surfaces.as_ref().map(|s| &s.surface)
    }

    /// Creates the toplevel and commits it without a buffer, so the
    /// compositor answers with the first configure
    pub fn create_surface(&mut self, qh: &QueueHandle<Self>) -> Result<()> {
        let compositor = self
            .compositor
            .as_ref()
            .context("Compositor does not advertise wl_compositor")?;
        let wm_base = self
            .wm_base
            .as_ref()
            .context("xdg-shell support required")?;

        let surface = compositor.create_surface(qh, SurfaceRole::Window);
        let xdg_surface = wm_base.get_xdg_surface(&surface, qh, ());
        let toplevel = xdg_surface.get_toplevel(qh, ());

        toplevel.set_title(self.title.clone());
        toplevel.set_app_id(self.app_id.clone());

        if self.window.is_fullscreen() {
            toplevel.set_fullscreen(None);
        } else if self.window.is_maximized() {
            toplevel.set_maximized();
        }

        surface.commit();
        self.window.request_surface();

        self.cursor.surface = Some(compositor.create_surface(qh, SurfaceRole::Cursor));

        self.surfaces = Some(WindowSurfaces {
            surface,
            xdg_surface,
            toplevel,
        });
        debug!("toplevel '{}' created, waiting for configure", self.title);
        Ok(())
    }

    /// Pushes transform and scale changes to the window surface
    pub fn apply_surface_geometry(&self, update: &GeometryUpdate) {
        let Some(surface) = self.wl_surface() else {
            return;
        };
        if let Some(transform) = update.transform {
            set_buffer_transform(surface, transform);
        }
        if let Some(scale) = update.scale {
            set_buffer_scale(surface, scale);
        }
    }

    pub(crate) fn toggle_fullscreen(&self) {
        let Some(surfaces) = self.surfaces.as_ref() else {
            return;
        };
        if self.window.is_fullscreen() {
            surfaces.toplevel.unset_fullscreen();
        } else {
            surfaces.toplevel.set_fullscreen(None);
        }
    }

    /// Starts an interactive move of the toplevel
    pub(crate) fn start_move(&self, serial: u32) {
        if let (Some(surfaces), Some(seat)) = (self.surfaces.as_ref(), self.seat.as_ref()) {
            surfaces.toplevel._move(seat, serial);
        }
    }

    fn bind_global(
        &mut self,
        registry: &wl_registry::WlRegistry,
        conn: &Connection,
        qh: &QueueHandle<Self>,
        name: u32,
        interface: &str,
        version: u32,
    ) {
        match interface {
            "wl_compositor" => {
                self.compositor = Some(registry.bind(name, version.min(4), qh, ()));
            }
            "xdg_wm_base" => {
                self.wm_base = Some(registry.bind(name, 1, qh, ()));
            }
            "wl_seat" => {
                self.seat = Some(registry.bind(name, 1, qh, ()));
            }
            "wl_shm" => {
                let shm: WlShm = registry.bind(name, 1, qh, ());
                self.cursor.load_theme(conn, shm);
            }
            "wl_output" if version >= 2 => {
                let id = OutputId(name);
                let output: WlOutput = registry.bind(name, 2, qh, id);
                if self.outputs.add_output(id, &mut self.window) {
                    self.output_proxies.push((id, output));
                }
            }
            _ => trace!("ignoring global {interface} v{version}"),
        }
    }

    fn remove_global(&mut self, name: u32) {
        let id = OutputId(name);
        let Some(index) = self.output_proxies.iter().position(|(o, _)| *o == id) else {
            return;
        };
        // wl_output v2 has no destructor request; dropping the proxy is all there is
        self.output_proxies.remove(index);
        self.outputs.remove_output(id, &mut self.window);
    }

    /// Destroys the toplevel, xdg surface and wl_surface
    pub fn destroy_window_surface(&mut self) {
        if let Some(surfaces) = self.surfaces.take() {
            surfaces.toplevel.destroy();
            surfaces.xdg_surface.destroy();
            surfaces.surface.destroy();
        }
    }

    /// Releases the cursor, outputs, input devices, seat and shell
    pub fn release_globals(&mut self) {
        self.cursor.destroy();

        for (id, _) in std::mem::take(&mut self.output_proxies) {
            self.outputs.remove_output(id, &mut self.window);
        }

        self.input.release();
        self.seat = None;
        if let Some(wm_base) = self.wm_base.take() {
            wm_base.destroy();
        }
        self.compositor = None;
        debug!("Wayland globals released");
    }
}

pub(crate) fn set_buffer_transform(surface: &WlSurface, transform: OutputTransform) {
    if surface.version() >= 2 {
        surface.set_buffer_transform(transform.into());
    }
}

pub(crate) fn set_buffer_scale(surface: &WlSurface, scale: i32) {
    if surface.version() >= 3 {
        surface.set_buffer_scale(scale);
    }
}

impl Dispatch<wl_registry::WlRegistry, ()> for DisplayState {
    fn event(
        state: &mut Self,
        registry: &wl_registry::WlRegistry,
        event: wl_registry::Event,
        _: &(),
        conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global {
                name,
                interface,
                version,
            } => state.bind_global(registry, conn, qh, name, &interface, version),
            wl_registry::Event::GlobalRemove { name } => state.remove_global(name),
            _ => {}
        }
    }
}

impl Dispatch<WlOutput, OutputId> for DisplayState {
    fn event(
        state: &mut Self,
        _: &WlOutput,
        event: wl_output::Event,
        id: &OutputId,
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_output::Event::Geometry { transform, .. } => {
                let transform = match transform {
                    WEnum::Value(t) => OutputTransform::from(t),
                    WEnum::Unknown(raw) => {
                        warn!("output {} sent unknown transform {raw}", id.0);
                        OutputTransform::from_raw(raw).unwrap_or_default()
                    }
                };
                state
                    .outputs
                    .on_geometry_changed(*id, transform, &mut state.window);
            }
            wl_output::Event::Scale { factor } => {
                state.outputs.on_scale_changed(*id, factor, &mut state.window);
            }
            _ => {}
        }
    }
}

impl Dispatch<WlSurface, SurfaceRole> for DisplayState {
    fn event(
        state: &mut Self,
        _: &WlSurface,
        event: wl_surface::Event,
        role: &SurfaceRole,
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if *role != SurfaceRole::Window {
            return;
        }
        match event {
            wl_surface::Event::Enter { output } => {
                if let Some(id) = output.data::<OutputId>() {
                    state.window.enter_output(*id, &state.outputs);
                }
            }
            wl_surface::Event::Leave { output } => {
                if let Some(id) = output.data::<OutputId>() {
                    state.window.leave_output(*id);
                }
            }
            _ => {}
        }
    }
}

impl Dispatch<XdgWmBase, ()> for DisplayState {
    fn event(
        _: &mut Self,
        wm_base: &XdgWmBase,
        event: xdg_wm_base::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let xdg_wm_base::Event::Ping { serial } = event {
            wm_base.pong(serial);
        }
    }
}

impl Dispatch<XdgSurface, ()> for DisplayState {
    fn event(
        state: &mut Self,
        xdg_surface: &XdgSurface,
        event: xdg_surface::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let xdg_surface::Event::Configure { serial } = event {
            xdg_surface.ack_configure(serial);
            if state.window.ack_configure() {
                info!("🪟 {} configured at {}", state.title, state.window.logical_size());
            }
        }
    }
}

impl Dispatch<XdgToplevel, ()> for DisplayState {
    fn event(
        state: &mut Self,
        _: &XdgToplevel,
        event: xdg_toplevel::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            xdg_toplevel::Event::Configure {
                width,
                height,
                states,
            } => {
                let (fullscreen, maximized) = toplevel_flags(&states);
                debug!(
                    "toplevel configure {width}x{height} fullscreen={fullscreen} maximized={maximized}"
                );
                state
                    .window
                    .handle_toplevel_configure(width, height, fullscreen, maximized);
            }
            xdg_toplevel::Event::Close => state.window.request_close(),
            _ => {}
        }
    }
}

delegate_noop!(DisplayState: WlCompositor);
delegate_noop!(DisplayState: WlRegion);
delegate_noop!(DisplayState: ignore WlShm);
