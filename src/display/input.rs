//! Seat, pointer, keyboard and touch handling
//!
//! - Pointer enter shows the themed cursor (hidden while fullscreen)
//! - Left button press or touch down starts an interactive move
//! - F11 toggles fullscreen, Escape closes the window

use super::{DisplayState, SurfaceRole};
use crate::config::CursorConfig;
use log::{debug, warn};
use wayland_client::protocol::{
    wl_keyboard::{self, WlKeyboard},
    wl_pointer::{self, WlPointer},
    wl_seat::{self, WlSeat},
    wl_shm::WlShm,
    wl_surface::WlSurface,
    wl_touch::{self, WlTouch},
};
use wayland_client::{Connection, Dispatch, Proxy, QueueHandle, WEnum};
use wayland_cursor::CursorTheme;

/// Linux input event codes
const BTN_LEFT: u32 = 0x110;
const KEY_ESC: u32 = 1;
const KEY_F11: u32 = 87;

/// Input devices created from the seat's capabilities
#[derive(Default)]
pub(super) struct InputDevices {
    pointer: Option<WlPointer>,
    keyboard: Option<WlKeyboard>,
    touch: Option<WlTouch>,
}

impl InputDevices {
    fn update(&mut self, seat: &WlSeat, capabilities: wl_seat::Capability, qh: &QueueHandle<DisplayState>) {
        let wants_pointer = capabilities.contains(wl_seat::Capability::Pointer);
        match (wants_pointer, self.pointer.take()) {
            (true, None) => self.pointer = Some(seat.get_pointer(qh, ())),
            (true, existing) => self.pointer = existing,
            (false, Some(pointer)) => release_pointer(pointer),
            (false, None) => {}
        }

        let wants_keyboard = capabilities.contains(wl_seat::Capability::Keyboard);
        match (wants_keyboard, self.keyboard.take()) {
            (true, None) => self.keyboard = Some(seat.get_keyboard(qh, ())),
            (true, existing) => self.keyboard = existing,
            (false, Some(keyboard)) => release_keyboard(keyboard),
            (false, None) => {}
        }

        let wants_touch = capabilities.contains(wl_seat::Capability::Touch);
        match (wants_touch, self.touch.take()) {
            (true, None) => self.touch = Some(seat.get_touch(qh, ())),
            (true, existing) => self.touch = existing,
            (false, Some(touch)) => release_touch(touch),
            (false, None) => {}
        }
    }

    pub(super) fn release(&mut self) {
        if let Some(pointer) = self.pointer.take() {
            release_pointer(pointer);
        }
        if let Some(keyboard) = self.keyboard.take() {
            release_keyboard(keyboard);
        }
        if let Some(touch) = self.touch.take() {
            release_touch(touch);
        }
    }
}

// The release requests only exist from seat version 3 on
fn release_pointer(pointer: WlPointer) {
    if pointer.version() >= 3 {
        pointer.release();
    }
}

fn release_keyboard(keyboard: WlKeyboard) {
    if keyboard.version() >= 3 {
        keyboard.release();
    }
}

fn release_touch(touch: WlTouch) {
    if touch.version() >= 3 {
        touch.release();
    }
}

/// Cursor theme and the surface the cursor image is attached to
pub(super) struct CursorState {
    config: CursorConfig,
    theme: Option<CursorTheme>,
    pub(super) surface: Option<WlSurface>,
}

impl CursorState {
    pub(super) fn new(config: CursorConfig) -> Self {
        Self {
            config,
            theme: None,
            surface: None,
        }
    }

    /// Loads the configured theme; failures only cost the cursor
    pub(super) fn load_theme(&mut self, conn: &Connection, shm: WlShm) {
        let loaded = match self.config.theme.as_deref() {
            Some(name) => CursorTheme::load_from_name(conn, shm, name, self.config.size),
            None => CursorTheme::load(conn, shm, self.config.size),
        };

        let mut theme = match loaded {
            Ok(theme) => theme,
            Err(e) => {
                warn!("unable to load cursor theme: {e}");
                return;
            }
        };

        if theme.get_cursor(&self.config.name).is_none() {
            warn!("unable to load {} cursor", self.config.name);
            return;
        }
        debug!("cursor theme loaded at size {}", self.config.size);
        self.theme = Some(theme);
    }

    pub(super) fn destroy(&mut self) {
        if let Some(surface) = self.surface.take() {
            surface.destroy();
        }
        self.theme = None;
    }
}

impl DisplayState {
    fn update_pointer_cursor(&mut self, pointer: &WlPointer, serial: u32) {
        if self.window.is_fullscreen() {
            pointer.set_cursor(serial, None, 0, 0);
            return;
        }

        let Some(surface) = self.cursor.surface.as_ref() else {
            return;
        };
        let Some(theme) = self.cursor.theme.as_mut() else {
            return;
        };
        let Some(cursor) = theme.get_cursor(&self.cursor.config.name) else {
            return;
        };

        let image = &cursor[0];
        let (hotspot_x, hotspot_y) = image.hotspot();
        let (width, height) = image.dimensions();

        pointer.set_cursor(serial, Some(surface), hotspot_x as i32, hotspot_y as i32);
        surface.attach(Some(&**image), 0, 0);
        surface.damage(0, 0, width as i32, height as i32);
        surface.commit();
    }
}

impl Dispatch<WlSeat, ()> for DisplayState {
    fn event(
        state: &mut Self,
        seat: &WlSeat,
        event: wl_seat::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        if let wl_seat::Event::Capabilities {
            capabilities: WEnum::Value(capabilities),
        } = event
        {
            debug!("seat capabilities {capabilities:?}");
            state.input.update(seat, capabilities, qh);
        }
    }
}

impl Dispatch<WlPointer, ()> for DisplayState {
    fn event(
        state: &mut Self,
        pointer: &WlPointer,
        event: wl_pointer::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_pointer::Event::Enter { serial, surface, .. } => {
                if surface.data::<SurfaceRole>() == Some(&SurfaceRole::Window) {
                    state.update_pointer_cursor(pointer, serial);
                }
            }
            wl_pointer::Event::Button {
                serial,
                button: BTN_LEFT,
                state: WEnum::Value(wl_pointer::ButtonState::Pressed),
                ..
            } => state.start_move(serial),
            _ => {}
        }
    }
}

impl Dispatch<WlKeyboard, ()> for DisplayState {
    fn event(
        state: &mut Self,
        _: &WlKeyboard,
        event: wl_keyboard::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            // No keymap handling; the fd closes when dropped
            wl_keyboard::Event::Keymap { fd, .. } => drop(fd),
            wl_keyboard::Event::Key {
                key,
                state: WEnum::Value(wl_keyboard::KeyState::Pressed),
                ..
            } => match key {
                KEY_F11 => state.toggle_fullscreen(),
                KEY_ESC => state.window.request_close(),
                _ => {}
            },
            _ => {}
        }
    }
}

impl Dispatch<WlTouch, ()> for DisplayState {
    fn event(
        state: &mut Self,
        _: &WlTouch,
        event: wl_touch::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_touch::Event::Down { serial, .. } = event {
            state.start_move(serial);
        }
    }
}
