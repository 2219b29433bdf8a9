//! Integration tests for the frame driver's presentation choice

use anyhow::Result;
use gles_demos::app::{FrameInfo, GlApp};
use gles_demos::output::{OutputId, OutputRegistry, OutputTransform};
use gles_demos::renderer::damage::{DamageRect, Presentation};
use gles_demos::renderer::{FrameDriver, PresentSurface};
use gles_demos::window::{Size, Window, WindowOptions};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Transform(OutputTransform),
    Scale(i32),
    Resize(Size),
    Opaque(bool),
    Swap,
    SwapWithDamage([i32; 4]),
}

struct RecordingSurface {
    damage_swap: bool,
    age: i32,
    fail_swap: bool,
    calls: Vec<Call>,
}

impl RecordingSurface {
    fn new(damage_swap: bool, age: i32) -> Self {
        Self {
            damage_swap,
            age,
            fail_swap: false,
            calls: Vec::new(),
        }
    }
}

impl PresentSurface for RecordingSurface {
    fn set_buffer_transform(&mut self, transform: OutputTransform) {
        self.calls.push(Call::Transform(transform));
    }

    fn set_buffer_scale(&mut self, scale: i32) {
        self.calls.push(Call::Scale(scale));
    }

    fn resize(&mut self, size: Size) {
        self.calls.push(Call::Resize(size));
    }

    fn supports_damage_swap(&self) -> bool {
        self.damage_swap
    }

    fn buffer_age(&self) -> i32 {
        self.age
    }

    fn set_opaque_region(&mut self, opaque: bool) {
        self.calls.push(Call::Opaque(opaque));
    }

    fn swap_buffers(&mut self) -> Result<()> {
        if self.fail_swap {
            anyhow::bail!("swap failed");
        }
        self.calls.push(Call::Swap);
        Ok(())
    }

    fn swap_buffers_with_damage(&mut self, rect: [i32; 4]) -> Result<()> {
        self.calls.push(Call::SwapWithDamage(rect));
        Ok(())
    }
}

/// Reports a fixed damage rectangle and remembers what it was shown
struct FixedDamageApp {
    damage: DamageRect,
    frames: Vec<FrameInfo>,
}

impl FixedDamageApp {
    fn new(damage: DamageRect) -> Self {
        Self {
            damage,
            frames: Vec::new(),
        }
    }
}

impl GlApp for FixedDamageApp {
    fn init_gl(&mut self) -> Result<()> {
        Ok(())
    }

    fn redraw(&mut self, frame: &FrameInfo, damage: &mut DamageRect) {
        assert_eq!(*damage, DamageRect::default(), "damage must start zeroed");
        self.frames.push(*frame);
        *damage = self.damage;
    }

    fn deinit_gl(&mut self) {}
}

fn ready_window() -> (Window, OutputRegistry) {
    let mut window = Window::new(Size::new(500, 500), WindowOptions::default());
    let registry = OutputRegistry::new();
    window.update_buffer_geometry(&registry);
    (window, registry)
}

fn present(damage_swap: bool, age: i32, damage: DamageRect) -> (Presentation, Vec<Call>) {
    let (mut window, registry) = ready_window();
    let mut surface = RecordingSurface::new(damage_swap, age);
    let mut app = FixedDamageApp::new(damage);
    let presentation = FrameDriver::new()
        .render_frame(&mut window, &registry, &mut surface, &mut app)
        .unwrap();
    (presentation, surface.calls)
}

#[test]
fn test_partial_swap_when_all_conditions_hold() {
    let (presentation, calls) = present(true, 2, DamageRect::centered(500, 500, 2));
    assert_eq!(presentation, Presentation::Partial([125, 125, 374, 374]));
    assert_eq!(calls.last(), Some(&Call::SwapWithDamage([125, 125, 374, 374])));
}

#[test]
fn test_full_swap_without_damage_extension() {
    let (presentation, calls) = present(false, 2, DamageRect::centered(500, 500, 2));
    assert_eq!(presentation, Presentation::Full);
    assert_eq!(calls.last(), Some(&Call::Swap));
}

#[test]
fn test_full_swap_for_fresh_back_buffer() {
    let (presentation, calls) = present(true, 0, DamageRect::centered(500, 500, 2));
    assert_eq!(presentation, Presentation::Full);
    assert_eq!(calls.last(), Some(&Call::Swap));
}

#[test]
fn test_full_swap_for_empty_damage() {
    let (presentation, _) = present(true, 3, DamageRect::default());
    assert_eq!(presentation, Presentation::Full);

    let (presentation, _) = present(true, 3, DamageRect::new(10, 10, 0, 50));
    assert_eq!(presentation, Presentation::Full);
}

#[test]
fn test_opaque_region_set_before_every_swap() {
    let (_, calls) = present(false, 0, DamageRect::default());
    assert_eq!(calls, vec![Call::Opaque(false), Call::Swap]);

    let mut window = Window::new(
        Size::new(300, 200),
        WindowOptions {
            opaque: true,
            ..WindowOptions::default()
        },
    );
    let registry = OutputRegistry::new();
    let mut surface = RecordingSurface::new(false, 0);
    let mut app = FixedDamageApp::new(DamageRect::default());
    FrameDriver::new()
        .render_frame(&mut window, &registry, &mut surface, &mut app)
        .unwrap();
    assert!(surface.calls.contains(&Call::Opaque(true)));
}

#[test]
fn test_geometry_pushed_before_redraw() {
    let mut window = Window::new(Size::new(800, 600), WindowOptions::default());
    let mut registry = OutputRegistry::new();
    registry.add_output(OutputId(1), &mut window);
    registry.on_geometry_changed(OutputId(1), OutputTransform::Rotate270, &mut window);
    registry.on_scale_changed(OutputId(1), 2, &mut window);
    window.enter_output(OutputId(1), &registry);

    let mut surface = RecordingSurface::new(false, 0);
    let mut app = FixedDamageApp::new(DamageRect::default());
    let mut driver = FrameDriver::new();
    driver
        .render_frame(&mut window, &registry, &mut surface, &mut app)
        .unwrap();

    assert_eq!(
        &surface.calls[..3],
        &[
            Call::Transform(OutputTransform::Rotate270),
            Call::Scale(2),
            Call::Resize(Size::new(1200, 1600)),
        ]
    );
    assert_eq!(app.frames[0].buffer_size, Size::new(1200, 1600));
    assert_eq!(app.frames[0].scale, 2);

    // A clean window pushes no geometry on the next frame
    surface.calls.clear();
    driver
        .render_frame(&mut window, &registry, &mut surface, &mut app)
        .unwrap();
    assert_eq!(surface.calls, vec![Call::Opaque(false), Call::Swap]);
    assert_eq!(app.frames[1].frame, 1);
    assert_eq!(driver.frame_count(), 2);
}

#[test]
fn test_swap_failure_is_reported_and_not_counted() {
    let (mut window, registry) = ready_window();
    let mut surface = RecordingSurface::new(false, 0);
    surface.fail_swap = true;
    let mut app = FixedDamageApp::new(DamageRect::default());
    let mut driver = FrameDriver::new();

    let err = driver
        .render_frame(&mut window, &registry, &mut surface, &mut app)
        .unwrap_err();
    assert!(err.to_string().contains("swap failed"));
    assert_eq!(driver.frame_count(), 0);
}
