//! Pixel geometry shared by the composition and the layers.

/// A rectangle defined in pixel coordinates.
///
/// Used for the regions of a composed frame: the code panel, the editable
/// overlay, the background boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RectPx {
    /// X offset from the left edge of the frame
    pub x: i32,
    /// Y offset from the top edge of the frame
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl RectPx {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Creates a rectangle starting at origin (0, 0) with the given dimensions.
    pub fn from_size(size: SizePx) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Returns the right edge coordinate (x + width).
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Returns the bottom edge coordinate (y + height).
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn size(&self) -> SizePx {
        SizePx::new(self.width, self.height)
    }

    /// Returns the center point as floating-point coordinates.
    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    /// Multiplies position and size by a device scale factor.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            x: (self.x as f32 * factor).round() as i32,
            y: (self.y as f32 * factor).round() as i32,
            width: (self.width as f32 * factor).round() as u32,
            height: (self.height as f32 * factor).round() as u32,
        }
    }
}

/// A 2D size in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SizePx {
    pub width: u32,
    pub height: u32,
}

impl SizePx {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Multiplies both dimensions by a device scale factor, never below 1px.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            width: ((self.width as f32 * factor).round() as u32).max(1),
            height: ((self.height as f32 * factor).round() as u32).max(1),
        }
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_px_edges() {
        let rect = RectPx::new(10, 20, 100, 200);
        assert_eq!(rect.right(), 110);
        assert_eq!(rect.bottom(), 220);
        assert_eq!(rect.center(), (60.0, 120.0));
    }

    #[test]
    fn rect_px_scaled() {
        let rect = RectPx::new(48, 48, 300, 120).scaled(4.0);
        assert_eq!(rect, RectPx::new(192, 192, 1200, 480));
    }

    #[test]
    fn size_px_scaled_never_zero() {
        assert_eq!(SizePx::new(1, 1).scaled(0.1), SizePx::new(1, 1));
        assert_eq!(SizePx::new(200, 100).scaled(4.0), SizePx::new(800, 400));
    }
}
