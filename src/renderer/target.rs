//! EGL/Wayland implementation of [`PresentSurface`]

use super::PresentSurface;
use crate::display::{set_buffer_scale, set_buffer_transform, DisplayState};
use crate::egl::{EglContext, EglWindowSurface};
use crate::output::OutputTransform;
use crate::window::Size;
use anyhow::Result;
use wayland_client::protocol::{wl_compositor::WlCompositor, wl_surface::WlSurface};
use wayland_client::QueueHandle;

/// The window's `wl_surface` and EGL surface, seen as one frame target
pub struct FrameTarget<'a> {
    egl: &'a EglContext,
    render: &'a EglWindowSurface,
    surface: WlSurface,
    compositor: WlCompositor,
    qh: QueueHandle<DisplayState>,
}

impl<'a> FrameTarget<'a> {
    pub fn new(
        egl: &'a EglContext,
        render: &'a EglWindowSurface,
        surface: WlSurface,
        compositor: WlCompositor,
        qh: QueueHandle<DisplayState>,
    ) -> Self {
        Self {
            egl,
            render,
            surface,
            compositor,
            qh,
        }
    }
}

impl PresentSurface for FrameTarget<'_> {
    fn set_buffer_transform(&mut self, transform: OutputTransform) {
        set_buffer_transform(&self.surface, transform);
    }

    fn set_buffer_scale(&mut self, scale: i32) {
        set_buffer_scale(&self.surface, scale);
    }

    fn resize(&mut self, size: Size) {
        self.render.resize(size);
    }

    fn supports_damage_swap(&self) -> bool {
        self.egl.supports_damage_swap()
    }

    fn buffer_age(&self) -> i32 {
        self.egl.buffer_age(self.render)
    }

    fn set_opaque_region(&mut self, opaque: bool) {
        if opaque {
            let region = self.compositor.create_region(&self.qh, ());
            region.add(0, 0, i32::MAX, i32::MAX);
            self.surface.set_opaque_region(Some(&region));
            region.destroy();
        } else {
            self.surface.set_opaque_region(None);
        }
    }

    fn swap_buffers(&mut self) -> Result<()> {
        Ok(self.egl.swap_buffers(self.render)?)
    }

    fn swap_buffers_with_damage(&mut self, rect: [i32; 4]) -> Result<()> {
        Ok(self.egl.swap_buffers_with_damage(self.render, &rect)?)
    }
}
