//! Zoom and pan transform between screen and scene coordinates.

use conserva_core::Point;

/// Default lower zoom bound.
pub const MIN_ZOOM: f64 = 0.1;

/// Default upper zoom bound.
pub const MAX_ZOOM: f64 = 20.0;

/// Viewport transform: `screen = scene * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Viewport width in pixels.
    pub width: f64,
    /// Viewport height in pixels.
    pub height: f64,
    /// Current zoom level (1.0 = 100%).
    zoom: f64,
    /// Pan offset X.
    pub pan_x: f64,
    /// Pan offset Y.
    pub pan_y: f64,
    min_zoom: f64,
    max_zoom: f64,
}

impl Viewport {
    /// Create a viewport of the given size at 100% with no pan.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }

    /// Set the zoom bounds. Bounds are swapped if given in reverse.
    #[must_use]
    pub fn with_zoom_limits(mut self, min: f64, max: f64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        self.min_zoom = min.max(f64::MIN_POSITIVE);
        self.max_zoom = max.max(self.min_zoom);
        self.zoom = self.zoom.clamp(self.min_zoom, self.max_zoom);
        self
    }

    /// Current zoom level.
    #[must_use]
    pub const fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set the zoom level, clamped to the zoom bounds. NaN is ignored.
    pub fn set_zoom(&mut self, zoom: f64) {
        if !zoom.is_nan() {
            self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        }
    }

    /// Zoom by `factor` keeping the scene point under `anchor` (screen
    /// coordinates) fixed.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64) {
        let fixed = self.screen_to_scene(anchor);
        self.set_zoom(self.zoom * factor);
        self.pan_x = anchor.x - fixed.x * self.zoom;
        self.pan_y = anchor.y - fixed.y * self.zoom;
    }

    /// Shift the pan offset.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Reset to 100% with no pan.
    pub fn reset(&mut self) {
        self.zoom = 1.0_f64.clamp(self.min_zoom, self.max_zoom);
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }

    /// Convert a screen position to scene (image pixel) coordinates.
    #[must_use]
    pub fn screen_to_scene(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan_x) / self.zoom,
            (screen.y - self.pan_y) / self.zoom,
        )
    }

    /// Convert a scene position to screen coordinates.
    #[must_use]
    pub fn scene_to_screen(&self, scene: Point) -> Point {
        Point::new(
            scene.x * self.zoom + self.pan_x,
            scene.y * self.zoom + self.pan_y,
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}
