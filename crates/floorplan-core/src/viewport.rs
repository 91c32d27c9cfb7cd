//! Viewport module for pan/zoom transforms.

use crate::model::{Drawing, ViewBox};
use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest allowed scale.
pub const MIN_SCALE: f64 = 0.05;
/// Largest allowed scale.
pub const MAX_SCALE: f64 = 20.0;
/// Scale factor applied per wheel notch.
pub const WHEEL_ZOOM_FACTOR: f64 = 1.1;
/// Scale factor applied by the zoom in/out buttons.
pub const BUTTON_ZOOM_FACTOR: f64 = 1.2;

/// Viewport manages the view transform for the canvas.
///
/// It handles panning (translation) and zooming (scaling) operations,
/// converting between screen coordinates and world coordinates:
/// `world = (screen - offset) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Current translation offset (pan) in screen pixels.
    pub offset: Vec2,
    /// Current zoom scale.
    pub scale: f64,
    /// Viewport dimensions in screen pixels.
    pub size: Size,
    /// Minimum allowed scale.
    pub min_scale: f64,
    /// Maximum allowed scale.
    pub max_scale: f64,
    /// Scale factor per wheel notch.
    pub wheel_factor: f64,
    /// Scale factor per zoom button press.
    pub button_factor: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        let view_box = ViewBox::default();
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
            size: Size::new(view_box.width, view_box.height),
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            wheel_factor: WHEEL_ZOOM_FACTOR,
            button_factor: BUTTON_ZOOM_FACTOR,
        }
    }
}

impl Viewport {
    /// Create a new viewport with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the viewport saved on a drawing.
    pub fn from_drawing(drawing: &Drawing) -> Self {
        let mut viewport = Self::default();
        viewport.apply_view_box(drawing.view_box, drawing.scale);
        viewport
    }

    /// Replace offset, size and scale from a saved view box.
    pub fn apply_view_box(&mut self, view_box: ViewBox, scale: f64) {
        self.offset = Vec2::new(view_box.x, view_box.y);
        self.size = Size::new(view_box.width, view_box.height);
        if scale.is_finite() && scale > 0.0 {
            self.scale = scale.clamp(self.min_scale, self.max_scale);
        }
    }

    /// The persisted form of this viewport.
    pub fn view_box(&self) -> ViewBox {
        ViewBox {
            x: self.offset.x,
            y: self.offset.y,
            width: self.size.width,
            height: self.size.height,
        }
    }

    /// Get the affine transform for rendering.
    ///
    /// This transform converts world coordinates to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale)
    }

    /// Get the inverse transform for input handling.
    ///
    /// This transform converts screen coordinates to world coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.offset)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// Pan the viewport by a delta in screen coordinates.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset += Vec2::new(dx, dy);
    }

    /// Update the viewport dimensions. Scale and offset are left unchanged.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.size = Size::new(width.max(0.0), height.max(0.0));
    }

    /// Wheel zoom: `delta` counts notches, negative zooms in.
    pub fn zoom(&mut self, delta: f64, pivot: Point) {
        if delta == 0.0 || !delta.is_finite() {
            return;
        }
        self.zoom_at(pivot, self.wheel_factor.powf(-delta));
    }

    /// Zoom the viewport, keeping the given screen point fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_scale = (self.scale * factor).clamp(self.min_scale, self.max_scale);
        if (new_scale - self.scale).abs() < f64::EPSILON {
            return;
        }

        // Convert screen point to world before zoom
        let world_point = self.screen_to_world(screen_point);

        self.scale = new_scale;

        // Adjust offset so world_point stays at screen_point
        let new_screen = self.world_to_screen(world_point);
        self.offset += screen_point - new_screen;
    }

    /// Zoom in one button step around the viewport centre.
    pub fn zoom_in(&mut self) {
        self.zoom_at(self.center(), self.button_factor);
    }

    /// Zoom out one button step around the viewport centre.
    pub fn zoom_out(&mut self) {
        self.zoom_at(self.center(), 1.0 / self.button_factor);
    }

    /// Centre of the viewport in screen coordinates.
    pub fn center(&self) -> Point {
        Point::new(self.size.width / 2.0, self.size.height / 2.0)
    }

    /// Fit world-space `bounds` into the viewport, leaving `padding` screen
    /// pixels on each side. Degenerate extents count as one unit.
    pub fn fit_to_bounds(&mut self, bounds: Rect, padding: f64) {
        let padded = Size::new(
            (self.size.width - padding * 2.0).max(1.0),
            (self.size.height - padding * 2.0).max(1.0),
        );
        let scale_x = padded.width / bounds.width().max(1.0);
        let scale_y = padded.height / bounds.height().max(1.0);
        self.scale = scale_x.min(scale_y).clamp(self.min_scale, self.max_scale);

        let center = bounds.center();
        self.offset = Vec2::new(
            self.size.width / 2.0 - center.x * self.scale,
            self.size.height / 2.0 - center.y * self.scale,
        );
    }

    /// Reset to the origin at scale 1.
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.scale = 1.0_f64.clamp(self.min_scale, self.max_scale);
    }
}
