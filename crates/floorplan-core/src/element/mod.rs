//! Drawable floor-plan elements.

mod geometry;
mod style;

pub use geometry::{
    Door, Furniture, FurnitureVariant, Geometry, OpenDirection, Placement, Polyline, TextBox,
    Window, WindowType,
};
pub use style::{Color, ColorParseError, Style};

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Layer every element belongs to unless told otherwise.
pub const DEFAULT_LAYER: &str = "default";

const PLACEHOLDER_PREFIX: &str = "local-";

/// Unique identifier for elements.
///
/// Ids are assigned by the persistence layer. Elements built locally and not
/// yet acknowledged carry a placeholder id until the server assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh persistent id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// A fresh local placeholder id.
    pub fn placeholder() -> Self {
        Self(format!("{PLACEHOLDER_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn is_placeholder(&self) -> bool {
        self.0.starts_with(PLACEHOLDER_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The closed set of element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Wall,
    Door,
    Window,
    Room,
    Furniture,
    Text,
    Dimension,
}

impl ElementKind {
    pub const ALL: [ElementKind; 7] = [
        ElementKind::Wall,
        ElementKind::Door,
        ElementKind::Window,
        ElementKind::Room,
        ElementKind::Furniture,
        ElementKind::Text,
        ElementKind::Dimension,
    ];

    /// Display label, used for default element names.
    pub fn label(self) -> &'static str {
        match self {
            ElementKind::Wall => "Wall",
            ElementKind::Door => "Door",
            ElementKind::Window => "Window",
            ElementKind::Room => "Room",
            ElementKind::Furniture => "Furniture",
            ElementKind::Text => "Text",
            ElementKind::Dimension => "Dimension",
        }
    }

    /// Whether the kind is built point by point.
    pub fn is_multi_point(self) -> bool {
        matches!(self, ElementKind::Wall | ElementKind::Room | ElementKind::Dimension)
    }

    /// Minimum number of distinct points a committed element must have.
    pub fn min_points(self) -> usize {
        match self {
            ElementKind::Wall | ElementKind::Dimension => 2,
            ElementKind::Room => 3,
            ElementKind::Door | ElementKind::Window | ElementKind::Furniture | ElementKind::Text => 1,
        }
    }

    /// Layer newly drawn elements of this kind are placed on.
    pub fn default_layer(self) -> &'static str {
        match self {
            ElementKind::Wall => "walls",
            ElementKind::Door => "doors",
            ElementKind::Window => "windows",
            ElementKind::Room => "rooms",
            ElementKind::Furniture => "furniture",
            ElementKind::Text => "annotations",
            ElementKind::Dimension => "dimensions",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn default_layer() -> String {
    DEFAULT_LAYER.to_string()
}

/// Non-geometric element properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    /// Display name.
    pub name: String,
    /// Layer tag.
    #[serde(default = "default_layer")]
    pub layer: String,
    pub locked: bool,
    pub visible: bool,
    /// Stacking order hint.
    pub z_index: i32,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            name: String::new(),
            layer: default_layer(),
            locked: false,
            visible: true,
            z_index: 0,
        }
    }
}

impl Metadata {
    /// Layer name with empty tags folded into the default layer.
    pub fn layer_name(&self) -> &str {
        if self.layer.is_empty() {
            DEFAULT_LAYER
        } else {
            &self.layer
        }
    }
}

/// A single drawable primitive of a drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Element {
    /// Create an element with default style and metadata.
    pub fn new(id: ElementId, geometry: Geometry) -> Self {
        Self {
            id,
            geometry,
            style: Style::default(),
            metadata: Metadata::default(),
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.geometry.kind()
    }

    pub fn is_visible(&self) -> bool {
        self.metadata.visible
    }

    pub fn is_locked(&self) -> bool {
        self.metadata.locked
    }

    pub fn layer(&self) -> &str {
        self.metadata.layer_name()
    }

    /// Bounding box in world coordinates.
    pub fn bounds(&self) -> Rect {
        self.geometry.bounds()
    }

    /// Translate the element by `delta`.
    pub fn translate(&mut self, delta: Vec2) {
        self.geometry.translate(delta);
    }

    /// Whether the element has enough distinct points to be committed.
    pub fn has_min_points(&self) -> bool {
        self.geometry.distinct_points() >= self.kind().min_points()
    }

    /// Check if a point (in world coordinates) hits this element.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let reach = tolerance + self.style.stroke_width / 2.0;
        match &self.geometry {
            Geometry::Wall(line) | Geometry::Dimension(line) => {
                match line.points.as_slice() {
                    [] => false,
                    [only] => only.distance(point) <= reach,
                    points => point_to_polyline_dist(point, points) <= reach,
                }
            }
            Geometry::Room(outline) => {
                let points = outline.points.as_slice();
                if points.len() >= 3 && point_in_polygon(point, points) {
                    return true;
                }
                let closing = points.first().map(|first| {
                    let mut closed = points.to_vec();
                    closed.push(*first);
                    closed
                });
                closing.is_some_and(|closed| point_to_polyline_dist(point, &closed) <= reach)
            }
            _ => self
                .geometry
                .placement()
                .is_some_and(|placement| placement.contains(point, tolerance)),
        }
    }

    /// Parse a JSON array of elements, skipping entries of unknown kind or
    /// otherwise malformed shape.
    pub fn parse_many(json: &str) -> Result<Vec<Element>, serde_json::Error> {
        let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
        Ok(values
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Element>(value) {
                Ok(element) => Some(element),
                Err(e) => {
                    log::warn!("Skipping unrenderable element: {}", e);
                    None
                }
            })
            .collect())
    }
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    point.distance(a + seg * t)
}

/// Minimum distance from a point to a polyline (sequence of connected segments).
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Even-odd point-in-polygon test.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    let mut inside = false;
    let n = polygon.len();
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > point.y) != (b.y > point.y)
            && point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}
