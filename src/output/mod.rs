//! Output Tracking
//!
//! Keeps the arena of `wl_output` globals the compositor has advertised and
//! derives the buffer scale and buffer transform for the set of outputs the
//! window surface currently overlaps.
//!
//! Outputs are owned here. The [`Window`] only holds [`OutputId`] handles in
//! the order it entered them; removing an output from the arena also drops the
//! handle from the window.

use crate::window::Window;
use log::{debug, warn};
use wayland_client::protocol::wl_output;

/// Stable handle to an output: the global name the server assigned to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(pub u32);

/// Rotation/flip applied to an output, mirroring `wl_output.transform`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputTransform {
    #[default]
    Normal,
    Rotate90,
    Rotate180,
    Rotate270,
    Flipped,
    Flipped90,
    Flipped180,
    Flipped270,
}

impl OutputTransform {
    /// Every transform value, in protocol order
    pub const ALL: [OutputTransform; 8] = [
        OutputTransform::Normal,
        OutputTransform::Rotate90,
        OutputTransform::Rotate180,
        OutputTransform::Rotate270,
        OutputTransform::Flipped,
        OutputTransform::Flipped90,
        OutputTransform::Flipped180,
        OutputTransform::Flipped270,
    ];

    /// Whether the transform swaps the width and height axes
    pub fn is_rotated(self) -> bool {
        matches!(
            self,
            OutputTransform::Rotate90
                | OutputTransform::Rotate270
                | OutputTransform::Flipped90
                | OutputTransform::Flipped270
        )
    }

    /// Maps the raw protocol value, `None` for values outside the enum
    pub fn from_raw(value: u32) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn to_raw(self) -> u32 {
        self as u32
    }
}

impl From<wl_output::Transform> for OutputTransform {
    fn from(transform: wl_output::Transform) -> Self {
        match transform {
            wl_output::Transform::Normal => OutputTransform::Normal,
            wl_output::Transform::_90 => OutputTransform::Rotate90,
            wl_output::Transform::_180 => OutputTransform::Rotate180,
            wl_output::Transform::_270 => OutputTransform::Rotate270,
            wl_output::Transform::Flipped => OutputTransform::Flipped,
            wl_output::Transform::Flipped90 => OutputTransform::Flipped90,
            wl_output::Transform::Flipped180 => OutputTransform::Flipped180,
            wl_output::Transform::Flipped270 => OutputTransform::Flipped270,
            _ => OutputTransform::Normal,
        }
    }
}

impl From<OutputTransform> for wl_output::Transform {
    fn from(transform: OutputTransform) -> Self {
        match transform {
            OutputTransform::Normal => wl_output::Transform::Normal,
            OutputTransform::Rotate90 => wl_output::Transform::_90,
            OutputTransform::Rotate180 => wl_output::Transform::_180,
            OutputTransform::Rotate270 => wl_output::Transform::_270,
            OutputTransform::Flipped => wl_output::Transform::Flipped,
            OutputTransform::Flipped90 => wl_output::Transform::Flipped90,
            OutputTransform::Flipped180 => wl_output::Transform::Flipped180,
            OutputTransform::Flipped270 => wl_output::Transform::Flipped270,
        }
    }
}

/// Tracked state of one output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputInfo {
    pub id: OutputId,
    pub transform: OutputTransform,
    /// Integer scale factor, never below 1
    pub scale: i32,
}

impl OutputInfo {
    fn new(id: OutputId) -> Self {
        Self {
            id,
            transform: OutputTransform::Normal,
            scale: 1,
        }
    }
}

/// Arena of known outputs, in the order the server announced them
#[derive(Debug, Default)]
pub struct OutputRegistry {
    outputs: Vec<OutputInfo>,
}

impl OutputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a newly announced output.
    ///
    /// Returns `false` if the name is already tracked. The window is marked
    /// dirty either way since a new output may change what it overlaps.
    pub fn add_output(&mut self, id: OutputId, window: &mut Window) -> bool {
        window.mark_geometry_dirty();

        if self.contains(id) {
            warn!("output {} announced twice, ignoring", id.0);
            return false;
        }

        debug!("tracking output {}", id.0);
        self.outputs.push(OutputInfo::new(id));
        true
    }

    /// Stops tracking an output, dropping the window's reference to it
    pub fn remove_output(&mut self, id: OutputId, window: &mut Window) -> Option<OutputInfo> {
        let index = self.outputs.iter().position(|o| o.id == id)?;

        window.leave_output(id);
        window.mark_geometry_dirty();

        debug!("output {} removed", id.0);
        Some(self.outputs.remove(index))
    }

    /// Applies a geometry event's transform
    pub fn on_geometry_changed(
        &mut self,
        id: OutputId,
        transform: OutputTransform,
        window: &mut Window,
    ) {
        let Some(output) = self.get_mut(id) else {
            return;
        };
        output.transform = transform;
        window.mark_geometry_dirty();
    }

    /// Applies a scale event. Non-positive factors are clamped to 1.
    pub fn on_scale_changed(&mut self, id: OutputId, scale: i32, window: &mut Window) {
        let Some(output) = self.get_mut(id) else {
            return;
        };
        if scale < 1 {
            warn!("output {} reported invalid scale {}, using 1", id.0, scale);
        }
        output.scale = scale.max(1);
        window.mark_geometry_dirty();
    }

    /// Largest scale among the outputs the window is on, 1 if it is on none
    pub fn compute_scale(&self, window: &Window) -> i32 {
        window
            .outputs()
            .iter()
            .filter_map(|id| self.get(*id))
            .map(|o| o.scale)
            .fold(1, i32::max)
    }

    /// Transform of the oldest entered output.
    ///
    /// A surface spanning outputs with different transforms has no single
    /// right answer, so the first one wins.
    pub fn compute_transform(&self, window: &Window) -> OutputTransform {
        window
            .outputs()
            .iter()
            .find_map(|id| self.get(*id))
            .map(|o| o.transform)
            .unwrap_or_default()
    }

    pub fn get(&self, id: OutputId) -> Option<&OutputInfo> {
        self.outputs.iter().find(|o| o.id == id)
    }

    fn get_mut(&mut self, id: OutputId) -> Option<&mut OutputInfo> {
        self.outputs.iter_mut().find(|o| o.id == id)
    }

    pub fn contains(&self, id: OutputId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutputInfo> {
        self.outputs.iter()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{Size, WindowOptions};

    fn window() -> Window {
        Window::new(Size::new(800, 600), WindowOptions::default())
    }

    #[test]
    fn test_transform_rotation_classification() {
        let rotated: Vec<_> = OutputTransform::ALL
            .iter()
            .filter(|t| t.is_rotated())
            .copied()
            .collect();

        assert_eq!(
            rotated,
            vec![
                OutputTransform::Rotate90,
                OutputTransform::Rotate270,
                OutputTransform::Flipped90,
                OutputTransform::Flipped270,
            ]
        );
    }

    #[test]
    fn test_transform_raw_values_follow_protocol() {
        for (raw, transform) in OutputTransform::ALL.iter().enumerate() {
            assert_eq!(OutputTransform::from_raw(raw as u32), Some(*transform));
            assert_eq!(transform.to_raw(), raw as u32);
        }
        assert_eq!(OutputTransform::from_raw(8), None);
    }

    #[test]
    fn test_transform_protocol_conversion() {
        for transform in OutputTransform::ALL {
            let wire: wl_output::Transform = transform.into();
            assert_eq!(OutputTransform::from(wire), transform);
        }
    }

    #[test]
    fn test_new_output_defaults() {
        let mut registry = OutputRegistry::new();
        let mut window = window();

        assert!(registry.add_output(OutputId(7), &mut window));
        let output = registry.get(OutputId(7)).unwrap();
        assert_eq!(output.scale, 1);
        assert_eq!(output.transform, OutputTransform::Normal);
    }

    #[test]
    fn test_duplicate_output_is_ignored() {
        let mut registry = OutputRegistry::new();
        let mut window = window();

        assert!(registry.add_output(OutputId(1), &mut window));
        assert!(!registry.add_output(OutputId(1), &mut window));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_compute_scale_defaults_to_one() {
        let mut registry = OutputRegistry::new();
        let mut window = window();
        registry.add_output(OutputId(1), &mut window);
        registry.on_scale_changed(OutputId(1), 3, &mut window);

        // Known output, but the window has not entered it
        assert_eq!(registry.compute_scale(&window), 1);
    }

    #[test]
    fn test_compute_scale_is_maximum_of_members() {
        let mut registry = OutputRegistry::new();
        let mut window = window();
        for (name, scale) in [(1, 2), (2, 3), (3, 1)] {
            registry.add_output(OutputId(name), &mut window);
            registry.on_scale_changed(OutputId(name), scale, &mut window);
        }

        window.enter_output(OutputId(1), &registry);
        window.enter_output(OutputId(3), &registry);
        assert_eq!(registry.compute_scale(&window), 2);

        window.enter_output(OutputId(2), &registry);
        assert_eq!(registry.compute_scale(&window), 3);
    }

    #[test]
    fn test_compute_transform_uses_oldest_entered_output() {
        let mut registry = OutputRegistry::new();
        let mut window = window();
        registry.add_output(OutputId(1), &mut window);
        registry.add_output(OutputId(2), &mut window);
        registry.on_geometry_changed(OutputId(1), OutputTransform::Rotate180, &mut window);
        registry.on_geometry_changed(OutputId(2), OutputTransform::Rotate90, &mut window);

        assert_eq!(registry.compute_transform(&window), OutputTransform::Normal);

        window.enter_output(OutputId(2), &registry);
        window.enter_output(OutputId(1), &registry);
        assert_eq!(registry.compute_transform(&window), OutputTransform::Rotate90);

        window.leave_output(OutputId(2));
        assert_eq!(registry.compute_transform(&window), OutputTransform::Rotate180);
    }

    #[test]
    fn test_remove_output_drops_window_reference() {
        let mut registry = OutputRegistry::new();
        let mut window = window();
        registry.add_output(OutputId(4), &mut window);
        registry.on_scale_changed(OutputId(4), 2, &mut window);
        window.enter_output(OutputId(4), &registry);
        window.update_buffer_geometry(&registry);
        assert!(!window.needs_geometry_update());

        let removed = registry.remove_output(OutputId(4), &mut window);
        assert_eq!(removed.map(|o| o.scale), Some(2));
        assert!(window.outputs().is_empty());
        assert!(window.needs_geometry_update());
        assert_eq!(registry.compute_scale(&window), 1);
    }

    #[test]
    fn test_remove_unknown_output_is_noop() {
        let mut registry = OutputRegistry::new();
        let mut window = window();
        window.update_buffer_geometry(&registry);

        assert!(registry.remove_output(OutputId(99), &mut window).is_none());
        assert!(!window.needs_geometry_update());
    }

    #[test]
    fn test_invalid_scale_is_clamped() {
        let mut registry = OutputRegistry::new();
        let mut window = window();
        registry.add_output(OutputId(1), &mut window);
        registry.on_scale_changed(OutputId(1), 0, &mut window);

        assert_eq!(registry.get(OutputId(1)).unwrap().scale, 1);
    }

    #[test]
    fn test_events_for_unknown_output_leave_window_clean() {
        let registry_window = &mut window();
        let mut registry = OutputRegistry::new();
        registry_window.update_buffer_geometry(&registry);

        registry.on_scale_changed(OutputId(5), 2, registry_window);
        registry.on_geometry_changed(OutputId(5), OutputTransform::Flipped, registry_window);
        assert!(!registry_window.needs_geometry_update());
    }
}
