//! Render-Frame Driver
//!
//! Drives one frame of the demo window:
//! 1. Recompute buffer geometry if the window is dirty and push the changes
//! 2. Let the application redraw, collecting its damage rectangle
//! 3. Query buffer age when damage swaps are possible
//! 4. Update the opaque region hint
//! 5. Present with a partial or a full swap
//!
//! All surface side effects go through [`PresentSurface`] so the ordering and
//! the presentation decision can be tested without a compositor.

pub mod damage;
pub mod target;

use crate::app::{FrameInfo, GlApp};
use crate::output::{OutputRegistry, OutputTransform};
use crate::window::{GeometryUpdate, Size, Window};
use anyhow::Result;
use damage::{choose_presentation, DamageRect, Presentation};
use log::debug;

pub use target::FrameTarget;

/// Surface operations the frame driver needs
#[cfg_attr(test, mockall::automock)]
pub trait PresentSurface {
    fn set_buffer_transform(&mut self, transform: OutputTransform);

    fn set_buffer_scale(&mut self, scale: i32);

    /// Resizes the native window backing the render surface
    fn resize(&mut self, size: Size);

    /// Whether a swap-with-damage entry point was resolved
    fn supports_damage_swap(&self) -> bool;

    /// Age of the current back buffer, 0 when unknown
    fn buffer_age(&self) -> i32;

    /// Marks the whole surface opaque, or clears the opaque region
    fn set_opaque_region(&mut self, opaque: bool);

    fn swap_buffers(&mut self) -> Result<()>;

    /// Swaps presenting one rectangle in inclusive-corner form
    fn swap_buffers_with_damage(&mut self, rect: [i32; 4]) -> Result<()>;
}

/// Pushes the changed parts of a geometry update to the surface
pub fn apply_geometry_update<S>(surface: &mut S, update: &GeometryUpdate)
where
    S: PresentSurface + ?Sized,
{
    if let Some(transform) = update.transform {
        surface.set_buffer_transform(transform);
    }
    if let Some(scale) = update.scale {
        surface.set_buffer_scale(scale);
    }
    if let Some(size) = update.buffer_size {
        surface.resize(size);
    }
}

/// Per-window frame driver, counting the frames it presented
#[derive(Debug, Default)]
pub struct FrameDriver {
    frame_count: u64,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Pushes pending geometry to the surface and describes the next frame
    pub fn begin_frame<S>(
        &mut self,
        window: &mut Window,
        outputs: &OutputRegistry,
        surface: &mut S,
    ) -> FrameInfo
    where
        S: PresentSurface + ?Sized,
    {
        if window.needs_geometry_update() {
            let update = window.update_buffer_geometry(outputs);
            apply_geometry_update(surface, &update);
        }

        FrameInfo {
            buffer_size: window.buffer_size(),
            scale: window.buffer_scale(),
            frame: self.frame_count,
        }
    }

    /// Presents a frame the application has drawn, with its damage
    pub fn present_frame<S>(
        &mut self,
        window: &Window,
        surface: &mut S,
        frame: &FrameInfo,
        damage: &DamageRect,
    ) -> Result<Presentation>
    where
        S: PresentSurface + ?Sized,
    {
        let damage_swap = surface.supports_damage_swap();
        let buffer_age = if damage_swap { surface.buffer_age() } else { 0 };

        surface.set_opaque_region(window.wants_opaque_region());

        let presentation = choose_presentation(damage_swap, buffer_age, damage);
        match presentation {
            Presentation::Partial(rect) => surface.swap_buffers_with_damage(rect)?,
            Presentation::Full => surface.swap_buffers()?,
        }

        if self.frame_count == 0 {
            debug!("first frame presented at {}", frame.buffer_size);
        }
        self.frame_count += 1;
        Ok(presentation)
    }

    /// Renders and presents one frame
    pub fn render_frame<S, A>(
        &mut self,
        window: &mut Window,
        outputs: &OutputRegistry,
        surface: &mut S,
        app: &mut A,
    ) -> Result<Presentation>
    where
        S: PresentSurface + ?Sized,
        A: GlApp + ?Sized,
    {
        let frame = self.begin_frame(window, outputs, surface);
        let mut damage = DamageRect::default();
        app.redraw(&frame, &mut damage);
        self.present_frame(window, surface, &frame, &damage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputId;
    use crate::window::WindowOptions;
    use mockall::predicate::eq;
    use mockall::Sequence;

    /// Records frames and reports a fixed damage rectangle
    #[derive(Default)]
    struct RecordingApp {
        damage: DamageRect,
        frames: Vec<FrameInfo>,
    }

    impl GlApp for RecordingApp {
        fn init_gl(&mut self) -> Result<()> {
            Ok(())
        }

        fn redraw(&mut self, frame: &FrameInfo, damage: &mut DamageRect) {
            assert_eq!(*damage, DamageRect::default());
            self.frames.push(*frame);
            *damage = self.damage;
        }

        fn deinit_gl(&mut self) {}
    }

    fn window(options: WindowOptions) -> Window {
        Window::new(Size::new(800, 600), options)
    }

    #[test]
    fn test_clean_window_skips_geometry_push() {
        let registry = OutputRegistry::new();
        let mut window = window(WindowOptions::default());
        let mut surface = MockPresentSurface::new();
        surface.expect_set_buffer_transform().never();
        surface.expect_set_buffer_scale().never();
        surface.expect_resize().never();
        surface.expect_supports_damage_swap().return_const(false);
        surface.expect_buffer_age().never();
        surface
            .expect_set_opaque_region()
            .with(eq(false))
            .times(1)
            .return_const(());
        surface.expect_swap_buffers().times(1).returning(|| Ok(()));

        let mut app = RecordingApp::default();
        let mut driver = FrameDriver::new();
        let presentation = driver
            .render_frame(&mut window, &registry, &mut surface, &mut app)
            .unwrap();

        assert_eq!(presentation, Presentation::Full);
        assert_eq!(driver.frame_count(), 1);
        assert_eq!(app.frames[0].buffer_size, Size::new(800, 600));
    }

    #[test]
    fn test_dirty_window_pushes_geometry_before_redraw() {
        let mut registry = OutputRegistry::new();
        let mut window = window(WindowOptions::default());
        registry.add_output(OutputId(1), &mut window);
        registry.on_scale_changed(OutputId(1), 2, &mut window);
        registry.on_geometry_changed(OutputId(1), OutputTransform::Rotate90, &mut window);
        window.enter_output(OutputId(1), &registry);

        let mut seq = Sequence::new();
        let mut surface = MockPresentSurface::new();
        surface
            .expect_set_buffer_transform()
            .with(eq(OutputTransform::Rotate90))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        surface
            .expect_set_buffer_scale()
            .with(eq(2))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        surface
            .expect_resize()
            .with(eq(Size::new(1200, 1600)))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        surface
            .expect_supports_damage_swap()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(false);
        surface
            .expect_set_opaque_region()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        surface
            .expect_swap_buffers()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));

        let mut app = RecordingApp::default();
        FrameDriver::new()
            .render_frame(&mut window, &registry, &mut surface, &mut app)
            .unwrap();

        assert!(!window.needs_geometry_update());
        assert_eq!(app.frames[0].buffer_size, Size::new(1200, 1600));
        assert_eq!(app.frames[0].scale, 2);
    }

    #[test]
    fn test_partial_swap_with_aged_buffer() {
        let registry = OutputRegistry::new();
        let mut window = window(WindowOptions {
            opaque: true,
            ..Default::default()
        });
        let mut surface = MockPresentSurface::new();
        surface.expect_supports_damage_swap().return_const(true);
        surface.expect_buffer_age().times(1).return_const(2);
        surface
            .expect_set_opaque_region()
            .with(eq(true))
            .return_const(());
        surface.expect_swap_buffers().never();
        surface
            .expect_swap_buffers_with_damage()
            .with(eq([200, 150, 599, 449]))
            .times(1)
            .returning(|_| Ok(()));

        let mut app = RecordingApp {
            damage: DamageRect::new(200, 150, 400, 300),
            ..Default::default()
        };
        let presentation = FrameDriver::new()
            .render_frame(&mut window, &registry, &mut surface, &mut app)
            .unwrap();

        assert_eq!(presentation, Presentation::Partial([200, 150, 599, 449]));
    }

    #[test]
    fn test_fresh_buffer_falls_back_to_full_swap() {
        let registry = OutputRegistry::new();
        let mut window = window(WindowOptions::default());
        let mut surface = MockPresentSurface::new();
        surface.expect_supports_damage_swap().return_const(true);
        surface.expect_buffer_age().return_const(0);
        surface.expect_set_opaque_region().return_const(());
        surface.expect_swap_buffers_with_damage().never();
        surface.expect_swap_buffers().times(1).returning(|| Ok(()));

        let mut app = RecordingApp {
            damage: DamageRect::new(0, 0, 10, 10),
            ..Default::default()
        };
        FrameDriver::new()
            .render_frame(&mut window, &registry, &mut surface, &mut app)
            .unwrap();
    }

    #[test]
    fn test_swap_failure_is_reported() {
        let registry = OutputRegistry::new();
        let mut window = window(WindowOptions::default());
        let mut surface = MockPresentSurface::new();
        surface.expect_supports_damage_swap().return_const(false);
        surface.expect_set_opaque_region().return_const(());
        surface
            .expect_swap_buffers()
            .returning(|| Err(anyhow::anyhow!("bad surface")));

        let mut app = RecordingApp::default();
        let mut driver = FrameDriver::new();
        let result = driver.render_frame(&mut window, &registry, &mut surface, &mut app);

        assert!(result.is_err());
        assert_eq!(driver.frame_count(), 0);
    }

    #[test]
    fn test_begin_frame_leaves_presentation_to_caller() {
        let registry = OutputRegistry::new();
        let mut window = window(WindowOptions::default());
        let mut surface = MockPresentSurface::new();
        surface.expect_supports_damage_swap().never();
        surface.expect_set_opaque_region().never();
        surface.expect_swap_buffers().never();

        let mut driver = FrameDriver::new();
        let frame = driver.begin_frame(&mut window, &registry, &mut surface);

        assert_eq!(frame.buffer_size, Size::new(800, 600));
        assert_eq!(frame.frame, 0);
        assert_eq!(driver.frame_count(), 0);
    }

    #[test]
    fn test_frame_counter_advances() {
        let registry = OutputRegistry::new();
        let mut window = window(WindowOptions::default());
        let mut surface = MockPresentSurface::new();
        surface.expect_supports_damage_swap().return_const(false);
        surface.expect_set_opaque_region().return_const(());
        surface.expect_swap_buffers().times(3).returning(|| Ok(()));

        let mut app = RecordingApp::default();
        let mut driver = FrameDriver::new();
        for _ in 0..3 {
            driver
                .render_frame(&mut window, &registry, &mut surface, &mut app)
                .unwrap();
        }

        let counters: Vec<u64> = app.frames.iter().map(|f| f.frame).collect();
        assert_eq!(counters, vec![0, 1, 2]);
    }
}
