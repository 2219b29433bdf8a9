//! Event Dispatch Loop
//!
//! Connects to the compositor, waits for the first configure with blocking
//! dispatch, initialises GL once, then alternates non-blocking dispatch with
//! one rendered frame until the window closes or the connection fails.
//!
//! Every event read before a frame is dispatched before that frame's
//! geometry recompute, so no frame sees half of a burst of output events.
//!
//! The phase order lives in [`run_session`], written against
//! [`DisplaySession`] so it can be driven without a compositor.

use crate::app::{describe_options, AppInfo, FrameInfo, GlApp};
use crate::config::HarnessConfig;
use crate::display::DisplayState;
use crate::egl::{EglContext, EglWindowSurface};
use crate::renderer::damage::DamageRect;
use crate::renderer::{FrameDriver, FrameTarget};
use crate::window::WindowOptions;
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wayland_client::backend::WaylandError;
use wayland_client::{Connection, DispatchError, EventQueue, QueueHandle};

/// Exit status after a second SIGINT, as if the signal had not been caught
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Display-side steps of a run, in the order [`run_session`] takes them
#[cfg_attr(test, mockall::automock)]
pub trait DisplaySession {
    /// Blocks until at least one event has been dispatched
    fn blocking_dispatch(&mut self) -> Result<()>;

    /// Dispatches whatever the connection has without blocking
    fn dispatch_pending(&mut self) -> Result<()>;

    fn is_awaiting_configure(&self) -> bool;

    /// Configured and not closing
    fn is_ready(&self) -> bool;

    fn is_closing(&self) -> bool;

    /// Creates the EGL surface at the configured buffer size and makes the
    /// GL context usable
    fn create_render_surface(&mut self) -> Result<()>;

    fn destroy_render_surface(&mut self);

    /// Applies pending geometry and describes the next frame
    fn begin_frame(&mut self) -> Result<FrameInfo>;

    fn present_frame(&mut self, frame: &FrameInfo, damage: &DamageRect) -> Result<()>;
}

/// Clears the running flag. True on the second interrupt.
fn interrupt(running: &AtomicBool) -> bool {
    !running.swap(false, Ordering::SeqCst)
}

/// Shared running flag cleared by the first SIGINT; the second one exits
fn install_interrupt_handler() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    let handler = move || {
        if interrupt(&flag) {
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    };
    if let Err(e) = ctrlc::set_handler(handler) {
        warn!("Failed to install SIGINT handler: {e}");
    }
    running
}

fn would_block(error: &WaylandError) -> bool {
    matches!(error, WaylandError::Io(e) if e.kind() == ErrorKind::WouldBlock)
}

/// Flushes requests, reads whatever the socket has without blocking and
/// dispatches everything queued
fn dispatch_queued(
    queue: &mut EventQueue<DisplayState>,
    state: &mut DisplayState,
) -> Result<usize, DispatchError> {
    if let Err(e) = queue.flush() {
        if !would_block(&e) {
            return Err(e.into());
        }
    }

    if let Some(guard) = queue.prepare_read() {
        if let Err(e) = guard.read() {
            if !would_block(&e) {
                return Err(e.into());
            }
        }
    }

    queue.dispatch_pending(state)
}

/// Runs the demo until its window closes.
///
/// A compositor without xdg-shell ends the run early with `Ok(())`.
pub fn run<A: GlApp + ?Sized>(
    info: &AppInfo,
    options: WindowOptions,
    config: &HarnessConfig,
    app: &mut A,
) -> Result<()> {
    let conn = Connection::connect_to_env().context("Failed to connect to the Wayland display")?;
    let mut event_queue = conn.new_event_queue();
    let qh = event_queue.handle();
    conn.display().get_registry(&qh, ());

    let mut state = DisplayState::new(info, options, config.cursor.clone());
    event_queue
        .roundtrip(&mut state)
        .context("Initial registry roundtrip failed")?;

    if !state.has_shell() {
        error!("xdg-shell support required. {} exiting", info.name);
        state.release_globals();
        let _ = conn.flush();
        return Ok(());
    }

    info!("🖥️ Window options: {}", describe_options(&options));

    let egl = match EglContext::new(&conn, &config.egl, options.opaque)
        .context("Failed to initialise EGL")
    {
        Ok(egl) => egl,
        Err(e) => {
            state.release_globals();
            let _ = conn.flush();
            return Err(e);
        }
    };

    if let Err(e) = state.create_surface(&qh) {
        state.destroy_window_surface();
        egl.terminate();
        state.release_globals();
        let _ = conn.flush();
        return Err(e);
    }

    let outcome = {
        let mut session = WaylandSession::new(&mut event_queue, &mut state, &egl, qh);
        run_session(&mut session, app, &info.name, install_interrupt_handler)
    };

    state.destroy_window_surface();
    egl.terminate();
    state.release_globals();
    if let Err(e) = conn.flush() {
        debug!("final flush failed: {e}");
    }

    outcome
}

/// Takes a session from the first configure to GL teardown.
///
/// `arm_interrupt` runs once the window is configured and returns the flag
/// SIGINT clears. `init_gl` runs at most once, only on a live render
/// surface, and `deinit_gl` runs exactly when `init_gl` succeeded.
pub fn run_session<S, A, F>(
    session: &mut S,
    app: &mut A,
    name: &str,
    arm_interrupt: F,
) -> Result<()>
where
    S: DisplaySession + ?Sized,
    A: GlApp + ?Sized,
    F: FnOnce() -> Arc<AtomicBool>,
{
    while session.is_awaiting_configure() {
        if let Err(e) = session.blocking_dispatch() {
            error!("Wayland dispatch failed while waiting for configure: {e:#}");
            return Ok(());
        }
    }

    if !session.is_ready() {
        info!("{name} exiting");
        return Ok(());
    }

    let running = arm_interrupt();
    session.create_render_surface()?;

    if let Err(e) = app.init_gl() {
        session.destroy_render_surface();
        return Err(e.context("Demo GL initialisation failed"));
    }
    info!("✨ {name} is ready");

    let result = steady_state(session, &mut *app, &running);

    info!("{name} exiting");
    app.deinit_gl();
    session.destroy_render_surface();

    result
}

fn steady_state<S, A>(session: &mut S, app: &mut A, running: &AtomicBool) -> Result<()>
where
    S: DisplaySession + ?Sized,
    A: GlApp + ?Sized,
{
    let mut frames = 0u64;
    while running.load(Ordering::SeqCst) && !session.is_closing() {
        if let Err(e) = session.dispatch_pending() {
            error!("Wayland connection lost: {e:#}");
            break;
        }

        let frame = session.begin_frame()?;
        let mut damage = DamageRect::default();
        app.redraw(&frame, &mut damage);
        session
            .present_frame(&frame, &damage)
            .context("Presenting frame failed")?;
        frames += 1;
    }

    debug!("{frames} frames presented");
    Ok(())
}

/// [`DisplaySession`] over a live connection and EGL context
struct WaylandSession<'a> {
    queue: &'a mut EventQueue<DisplayState>,
    state: &'a mut DisplayState,
    egl: &'a EglContext,
    qh: QueueHandle<DisplayState>,
    render: Option<EglWindowSurface>,
    driver: FrameDriver,
}

impl<'a> WaylandSession<'a> {
    fn new(
        queue: &'a mut EventQueue<DisplayState>,
        state: &'a mut DisplayState,
        egl: &'a EglContext,
        qh: QueueHandle<DisplayState>,
    ) -> Self {
        Self {
            queue,
            state,
            egl,
            qh,
            render: None,
            driver: FrameDriver::new(),
        }
    }
}

/// Frame target over the window's surfaces; cheap enough to build per frame
fn frame_target<'s>(
    egl: &'s EglContext,
    render: Option<&'s EglWindowSurface>,
    state: &DisplayState,
    qh: &QueueHandle<DisplayState>,
) -> Result<FrameTarget<'s>> {
    let render = render.context("Render surface missing")?;
    let surface = state
        .wl_surface()
        .cloned()
        .context("Window surface missing")?;
    let compositor = state
        .compositor
        .clone()
        .context("Compositor global missing")?;
    Ok(FrameTarget::new(egl, render, surface, compositor, qh.clone()))
}

/// Applies pending geometry and creates the EGL surface at the buffer size
fn init_render_surface(state: &mut DisplayState, egl: &EglContext) -> Result<EglWindowSurface> {
    if state.window.needs_geometry_update() {
        let update = state.window.update_buffer_geometry(&state.outputs);
        state.apply_surface_geometry(&update);
    }

    let surface = state
        .wl_surface()
        .context("Window surface missing after configure")?;

    egl.create_window_surface(surface, state.window.buffer_size(), state.window.frame_sync())
        .context("Failed to create EGL window surface")
}

impl DisplaySession for WaylandSession<'_> {
    fn blocking_dispatch(&mut self) -> Result<()> {
        self.queue.blocking_dispatch(self.state)?;
        Ok(())
    }

    fn dispatch_pending(&mut self) -> Result<()> {
        dispatch_queued(self.queue, self.state)?;
        Ok(())
    }

    fn is_awaiting_configure(&self) -> bool {
        self.state.window.is_awaiting_configure()
    }

    fn is_ready(&self) -> bool {
        self.state.window.is_ready()
    }

    fn is_closing(&self) -> bool {
        self.state.window.is_closing()
    }

    fn create_render_surface(&mut self) -> Result<()> {
        let render = init_render_surface(self.state, self.egl)?;
        self.egl.load_gl();
        self.render = Some(render);
        Ok(())
    }

    fn destroy_render_surface(&mut self) {
        if let Some(render) = self.render.take() {
            self.egl.destroy_surface(render);
        }
    }

    fn begin_frame(&mut self) -> Result<FrameInfo> {
        let mut target = frame_target(self.egl, self.render.as_ref(), &*self.state, &self.qh)?;
        Ok(self
            .driver
            .begin_frame(&mut self.state.window, &self.state.outputs, &mut target))
    }

    fn present_frame(&mut self, frame: &FrameInfo, damage: &DamageRect) -> Result<()> {
        let mut target = frame_target(self.egl, self.render.as_ref(), &*self.state, &self.qh)?;
        self.driver
            .present_frame(&self.state.window, &mut target, frame, damage)?;
        Ok(())
    }
}
