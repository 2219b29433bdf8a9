//! Integration tests for output tracking and buffer geometry

use gles_demos::output::{OutputId, OutputRegistry, OutputTransform};
use gles_demos::window::{Size, Window, WindowOptions};
use proptest::prelude::*;

fn window(width: i32, height: i32) -> Window {
    Window::new(Size::new(width, height), WindowOptions::default())
}

#[test]
fn test_rotated_hidpi_output_end_to_end() {
    let mut registry = OutputRegistry::new();
    let mut win = window(800, 600);
    let id = OutputId(7);

    registry.add_output(id, &mut win);
    registry.on_geometry_changed(id, OutputTransform::Rotate90, &mut win);
    registry.on_scale_changed(id, 2, &mut win);
    assert!(win.enter_output(id, &registry));

    let update = win.update_buffer_geometry(&registry);
    assert_eq!(update.transform, Some(OutputTransform::Rotate90));
    assert_eq!(update.scale, Some(2));
    assert_eq!(update.buffer_size, Some(Size::new(1200, 1600)));
    assert_eq!(win.buffer_size(), Size::new(1200, 1600));
    assert!(!win.needs_geometry_update());

    // Nothing changed, nothing to push
    win.mark_geometry_dirty();
    assert!(win.update_buffer_geometry(&registry).is_empty());
}

#[test]
fn test_leaving_last_output_restores_defaults() {
    let mut registry = OutputRegistry::new();
    let mut win = window(640, 480);

    registry.add_output(OutputId(1), &mut win);
    registry.on_scale_changed(OutputId(1), 3, &mut win);
    win.enter_output(OutputId(1), &registry);
    win.update_buffer_geometry(&registry);
    assert_eq!(win.buffer_size(), Size::new(1920, 1440));

    assert!(win.leave_output(OutputId(1)));
    assert!(win.needs_geometry_update());
    let update = win.update_buffer_geometry(&registry);
    assert_eq!(update.scale, Some(1));
    assert_eq!(win.buffer_size(), Size::new(640, 480));
}

#[test]
fn test_removed_output_stops_contributing() {
    let mut registry = OutputRegistry::new();
    let mut win = window(400, 400);

    registry.add_output(OutputId(1), &mut win);
    registry.add_output(OutputId(2), &mut win);
    registry.on_scale_changed(OutputId(2), 2, &mut win);
    win.enter_output(OutputId(1), &registry);
    win.enter_output(OutputId(2), &registry);
    assert_eq!(registry.compute_scale(&win), 2);

    win.update_buffer_geometry(&registry);
    assert!(registry.remove_output(OutputId(2), &mut win).is_some());
    assert!(win.needs_geometry_update());
    assert_eq!(win.outputs(), &[OutputId(1)]);
    assert_eq!(registry.compute_scale(&win), 1);
}

#[test]
fn test_every_output_event_marks_window_dirty() {
    let mut registry = OutputRegistry::new();
    let mut win = window(100, 100);
    let id = OutputId(3);

    registry.add_output(id, &mut win);
    assert!(win.needs_geometry_update());
    win.update_buffer_geometry(&registry);

    registry.on_geometry_changed(id, OutputTransform::Flipped, &mut win);
    assert!(win.needs_geometry_update());
    win.update_buffer_geometry(&registry);

    registry.on_scale_changed(id, 2, &mut win);
    assert!(win.needs_geometry_update());
    win.update_buffer_geometry(&registry);

    registry.remove_output(id, &mut win);
    assert!(win.needs_geometry_update());
}

#[test]
fn test_entering_unknown_output_is_ignored() {
    let registry = OutputRegistry::new();
    let mut win = window(100, 100);

    assert!(!win.enter_output(OutputId(99), &registry));
    assert!(win.outputs().is_empty());
}

#[test]
fn test_fullscreen_configure_then_restore() {
    let registry = OutputRegistry::new();
    let mut win = window(500, 500);

    win.handle_toplevel_configure(1920, 1080, true, false);
    win.update_buffer_geometry(&registry);
    assert_eq!(win.buffer_size(), Size::new(1920, 1080));
    assert!(win.wants_opaque_region());

    win.handle_toplevel_configure(0, 0, false, false);
    win.update_buffer_geometry(&registry);
    assert_eq!(win.buffer_size(), Size::new(500, 500));
    assert_eq!(win.window_size(), Size::new(500, 500));
    assert!(!win.wants_opaque_region());
}

proptest! {
    #[test]
    fn prop_buffer_size_follows_transform_and_scale(
        width in 1i32..4000,
        height in 1i32..4000,
        scale in 1i32..5,
        transform_index in 0usize..8,
    ) {
        let transform = OutputTransform::ALL[transform_index];
        let mut registry = OutputRegistry::new();
        let mut win = window(width, height);

        registry.add_output(OutputId(1), &mut win);
        registry.on_geometry_changed(OutputId(1), transform, &mut win);
        registry.on_scale_changed(OutputId(1), scale, &mut win);
        win.enter_output(OutputId(1), &registry);
        win.update_buffer_geometry(&registry);

        let expected = if transform.is_rotated() {
            Size::new(height * scale, width * scale)
        } else {
            Size::new(width * scale, height * scale)
        };
        prop_assert_eq!(win.buffer_size(), expected);
        prop_assert_eq!(win.buffer_scale(), scale);
        prop_assert_eq!(win.buffer_transform(), transform);
    }

    #[test]
    fn prop_scale_is_max_of_entered_outputs(scales in prop::collection::vec(1i32..6, 1..6)) {
        let mut registry = OutputRegistry::new();
        let mut win = window(100, 100);

        for (i, scale) in scales.iter().enumerate() {
            let id = OutputId(i as u32 + 1);
            registry.add_output(id, &mut win);
            registry.on_scale_changed(id, *scale, &mut win);
            win.enter_output(id, &registry);
        }

        prop_assert_eq!(registry.compute_scale(&win), *scales.iter().max().unwrap());
    }
}
