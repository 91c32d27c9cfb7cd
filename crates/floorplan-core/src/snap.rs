//! Snap functionality for aligning points to the drawing grid.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Default grid spacing in world units.
pub const DEFAULT_GRID_SIZE: f64 = 50.0;

/// Grid display and snapping settings of a drawing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Whether the grid is drawn.
    pub enabled: bool,
    /// Grid spacing in world units.
    pub size: f64,
    /// Whether pointer positions snap to grid intersections.
    pub snap: bool,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            size: DEFAULT_GRID_SIZE,
            snap: true,
        }
    }
}

impl GridSettings {
    /// Snap a point according to these settings.
    pub fn snap_point(&self, point: Point) -> SnapResult {
        snap_point(point, self.size, self.snap)
    }

    /// Toggle snapping on or off.
    pub fn toggle_snap(&mut self) {
        self.snap = !self.snap;
    }
}

/// Result of a snap operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// The snapped point.
    pub point: Point,
    /// Whether the X coordinate was snapped.
    pub snapped_x: bool,
    /// Whether the Y coordinate was snapped.
    pub snapped_y: bool,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(point: Point) -> Self {
        Self {
            point,
            snapped_x: false,
            snapped_y: false,
        }
    }

    /// Check if any snapping occurred.
    pub fn is_snapped(&self) -> bool {
        self.snapped_x || self.snapped_y
    }
}

/// Snap a point to the nearest grid intersection.
///
/// Each axis is rounded half away from zero to a multiple of `grid_size`.
pub fn snap_to_grid(point: Point, grid_size: f64) -> SnapResult {
    let snapped_x = (point.x / grid_size).round() * grid_size;
    let snapped_y = (point.y / grid_size).round() * grid_size;

    SnapResult {
        point: Point::new(snapped_x, snapped_y),
        snapped_x: true,
        snapped_y: true,
    }
}

/// Snap a point when `enabled`, otherwise return it unchanged.
///
/// Non-positive or non-finite grid sizes disable snapping.
pub fn snap_point(point: Point, grid_size: f64, enabled: bool) -> SnapResult {
    if !enabled || !grid_size.is_finite() || grid_size <= 0.0 {
        return SnapResult::none(point);
    }
    snap_to_grid(point, grid_size)
}

/// Snap a point when `enabled`, otherwise return it unchanged.
pub fn snap(point: Point, grid_size: f64, enabled: bool) -> Point {
    snap_point(point, grid_size, enabled).point
}
