//! Frame damage and swap selection
//!
//! A demo reports the rectangle it changed during `redraw` as a
//! [`DamageRect`]. When the EGL stack supports partial presentation and the
//! back buffer still holds a previous frame, only that rectangle is sent to
//! the compositor.
//!
//! # Example
//!
//! ```
//! use gles_demos::renderer::damage::{choose_presentation, DamageRect, Presentation};
//!
//! let damage = DamageRect::new(125, 125, 250, 250);
//! assert_eq!(
//!     choose_presentation(true, 2, &damage),
//!     Presentation::Partial([125, 125, 374, 374])
//! );
//! assert_eq!(choose_presentation(false, 2, &damage), Presentation::Full);
//! ```

/// Region a frame changed, in buffer pixels. Zero-sized means "everything".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DamageRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl DamageRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle centred in a buffer, covering `1/divisor` of each axis
    pub fn centered(buffer_width: i32, buffer_height: i32, divisor: i32) -> Self {
        let width = buffer_width / divisor;
        let height = buffer_height / divisor;
        Self::new(
            (buffer_width - width) / 2,
            (buffer_height - height) / 2,
            width,
            height,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Corner form used by the swap-with-damage extension:
    /// `[x, y, x + width - 1, y + height - 1]`
    pub fn to_inclusive_corners(&self) -> [i32; 4] {
        [
            self.x,
            self.y,
            self.x.saturating_add(self.width.saturating_sub(1)),
            self.y.saturating_add(self.height.saturating_sub(1)),
        ]
    }
}

/// How a finished frame reaches the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// Swap with a single damage rectangle in inclusive-corner form
    Partial([i32; 4]),
    /// Plain full swap
    Full,
}

/// Picks the presentation for a frame.
///
/// Partial presentation needs the damage-swap entry point, a back buffer with
/// known contents (age > 0) and a non-empty damage rectangle.
pub fn choose_presentation(
    damage_swap_available: bool,
    buffer_age: i32,
    damage: &DamageRect,
) -> Presentation {
    if damage_swap_available && buffer_age > 0 && !damage.is_empty() {
        Presentation::Partial(damage.to_inclusive_corners())
    } else {
        Presentation::Full
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_damage_is_empty() {
        assert!(DamageRect::default().is_empty());
        assert!(DamageRect::new(10, 10, 0, 20).is_empty());
        assert!(DamageRect::new(10, 10, 20, -1).is_empty());
        assert!(!DamageRect::new(0, 0, 1, 1).is_empty());
    }

    #[test]
    fn test_inclusive_corners() {
        let damage = DamageRect::new(10, 20, 100, 50);
        assert_eq!(damage.to_inclusive_corners(), [10, 20, 109, 69]);

        let pixel = DamageRect::new(3, 4, 1, 1);
        assert_eq!(pixel.to_inclusive_corners(), [3, 4, 3, 4]);
    }

    #[test]
    fn test_inclusive_corners_saturate() {
        let damage = DamageRect::new(i32::MAX / 2, 0, i32::MAX, 10);
        assert_eq!(damage.to_inclusive_corners(), [i32::MAX / 2, 0, i32::MAX, 9]);
    }

    #[test]
    fn test_centered_half() {
        let damage = DamageRect::centered(500, 500, 2);
        assert_eq!(damage, DamageRect::new(125, 125, 250, 250));
    }

    #[test]
    fn test_partial_requires_every_condition() {
        let damage = DamageRect::new(0, 0, 64, 64);

        assert!(matches!(
            choose_presentation(true, 1, &damage),
            Presentation::Partial(_)
        ));
        assert_eq!(choose_presentation(false, 1, &damage), Presentation::Full);
        assert_eq!(choose_presentation(true, 0, &damage), Presentation::Full);
        assert_eq!(
            choose_presentation(true, 3, &DamageRect::new(0, 0, 0, 64)),
            Presentation::Full
        );
        assert_eq!(
            choose_presentation(true, 3, &DamageRect::new(0, 0, 64, 0)),
            Presentation::Full
        );
    }
}
