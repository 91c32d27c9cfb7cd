//! Kind-specific element geometry.

use super::ElementKind;
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered points of a wall, room outline or dimension line.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<Point>,
}

impl Polyline {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Remove consecutive duplicate points.
    pub fn dedup(&mut self) {
        self.points.dedup();
    }

    /// Number of distinct points.
    pub fn distinct_points(&self) -> usize {
        let mut seen: Vec<Point> = Vec::with_capacity(self.points.len());
        for p in &self.points {
            if !seen.contains(p) {
                seen.push(*p);
            }
        }
        seen.len()
    }
}

/// Anchored kinds store their position as the single entry of `points`.
/// A bare `anchor` point is accepted too.
mod anchor_points {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Anchor {
        Many(Vec<Point>),
        One(Point),
    }

    pub fn serialize<S: Serializer>(anchor: &Point, serializer: S) -> Result<S::Ok, S::Error> {
        std::slice::from_ref(anchor).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Point, D::Error> {
        Ok(match Anchor::deserialize(deserializer)? {
            Anchor::Many(points) => points.first().copied().unwrap_or(Point::ZERO),
            Anchor::One(point) => point,
        })
    }
}

/// Door swing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenDirection {
    #[default]
    Inside,
    Outside,
}

/// Window glazing variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    #[default]
    Single,
    Double,
    Sliding,
}

/// Furniture symbol variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FurnitureVariant {
    #[default]
    Table,
    Chair,
    Bed,
    Sofa,
    Desk,
}

/// A door hung at `anchor`, extending along its local x axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Door {
    #[serde(rename = "points", alias = "anchor", with = "anchor_points")]
    pub anchor: Point,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees around the anchor.
    pub rotation: f64,
    /// Swing angle in degrees.
    pub opening_angle: f64,
    pub open_direction: OpenDirection,
}

impl Default for Door {
    fn default() -> Self {
        Self {
            anchor: Point::ZERO,
            width: 80.0,
            height: 10.0,
            rotation: 0.0,
            opening_angle: 90.0,
            open_direction: OpenDirection::default(),
        }
    }
}

/// A window centred on `anchor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Window {
    #[serde(rename = "points", alias = "anchor", with = "anchor_points")]
    pub anchor: Point,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees around the anchor.
    pub rotation: f64,
    pub window_type: WindowType,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            anchor: Point::ZERO,
            width: 80.0,
            height: 5.0,
            rotation: 0.0,
            window_type: WindowType::default(),
        }
    }
}

/// A furniture symbol with its top-left corner at `anchor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Furniture {
    #[serde(rename = "points", alias = "anchor", with = "anchor_points")]
    pub anchor: Point,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees around the anchor.
    pub rotation: f64,
    #[serde(rename = "shape")]
    pub variant: FurnitureVariant,
}

impl Default for Furniture {
    fn default() -> Self {
        Self {
            anchor: Point::ZERO,
            width: 100.0,
            height: 60.0,
            rotation: 0.0,
            variant: FurnitureVariant::default(),
        }
    }
}

/// A text label with its top-left corner at `anchor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextBox {
    #[serde(rename = "points", alias = "anchor", with = "anchor_points")]
    pub anchor: Point,
    pub width: f64,
    /// Rotation in degrees around the anchor.
    pub rotation: f64,
    pub content: String,
    pub font_size: f64,
    pub font_family: String,
}

impl Default for TextBox {
    fn default() -> Self {
        Self {
            anchor: Point::ZERO,
            width: 150.0,
            rotation: 0.0,
            content: "Text".to_string(),
            font_size: 16.0,
            font_family: "Arial".to_string(),
        }
    }
}

impl TextBox {
    /// Approximate box height: one line per `\n`-separated row.
    pub fn height(&self) -> f64 {
        let lines = self.content.lines().count().max(1);
        lines as f64 * self.font_size * 1.2
    }
}

/// An anchored box in local coordinates plus its placement in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub anchor: Point,
    /// Rotation in degrees.
    pub rotation: f64,
    /// Box in the element's local frame (anchor at the origin).
    pub local: Rect,
}

impl Placement {
    /// Local → world transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.anchor.to_vec2()) * Affine::rotate(self.rotation.to_radians())
    }

    /// World-space bounding box.
    pub fn bounds(&self) -> Rect {
        self.transform().transform_rect_bbox(self.local)
    }

    /// Whether a world point lies within the box, expanded by `tolerance`.
    pub fn contains(&self, point: Point, tolerance: f64) -> bool {
        let local_point = self.transform().inverse() * point;
        self.local.inflate(tolerance, tolerance).contains(local_point)
    }
}

/// Geometry tagged by element kind.
///
/// Serialized adjacently: `{"type": "wall", "geometry": {"points": [...]}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "geometry", rename_all = "lowercase")]
pub enum Geometry {
    Wall(Polyline),
    Door(Door),
    Window(Window),
    Room(Polyline),
    Furniture(Furniture),
    Text(TextBox),
    Dimension(Polyline),
}

impl Geometry {
    /// Default geometry for a kind, positioned at `point`.
    ///
    /// Polyline kinds start with two coincident points.
    pub fn at(kind: ElementKind, point: Point) -> Self {
        match kind {
            ElementKind::Wall => Geometry::Wall(Polyline::new(vec![point, point])),
            ElementKind::Room => Geometry::Room(Polyline::new(vec![point, point])),
            ElementKind::Dimension => Geometry::Dimension(Polyline::new(vec![point, point])),
            ElementKind::Door => Geometry::Door(Door { anchor: point, ..Door::default() }),
            ElementKind::Window => Geometry::Window(Window { anchor: point, ..Window::default() }),
            ElementKind::Furniture => Geometry::Furniture(Furniture {
                anchor: point,
                ..Furniture::default()
            }),
            ElementKind::Text => Geometry::Text(TextBox { anchor: point, ..TextBox::default() }),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Geometry::Wall(_) => ElementKind::Wall,
            Geometry::Door(_) => ElementKind::Door,
            Geometry::Window(_) => ElementKind::Window,
            Geometry::Room(_) => ElementKind::Room,
            Geometry::Furniture(_) => ElementKind::Furniture,
            Geometry::Text(_) => ElementKind::Text,
            Geometry::Dimension(_) => ElementKind::Dimension,
        }
    }

    pub fn polyline(&self) -> Option<&Polyline> {
        match self {
            Geometry::Wall(p) | Geometry::Room(p) | Geometry::Dimension(p) => Some(p),
            _ => None,
        }
    }

    pub fn polyline_mut(&mut self) -> Option<&mut Polyline> {
        match self {
            Geometry::Wall(p) | Geometry::Room(p) | Geometry::Dimension(p) => Some(p),
            _ => None,
        }
    }

    /// Placement box for anchored kinds.
    pub fn placement(&self) -> Option<Placement> {
        match self {
            Geometry::Door(d) => Some(Placement {
                anchor: d.anchor,
                rotation: d.rotation,
                local: Rect::new(0.0, -d.height / 2.0, d.width, d.height / 2.0),
            }),
            Geometry::Window(w) => Some(Placement {
                anchor: w.anchor,
                rotation: w.rotation,
                local: Rect::new(-w.width / 2.0, -w.height / 2.0, w.width / 2.0, w.height / 2.0),
            }),
            Geometry::Furniture(f) => Some(Placement {
                anchor: f.anchor,
                rotation: f.rotation,
                local: Rect::new(0.0, 0.0, f.width, f.height),
            }),
            Geometry::Text(t) => Some(Placement {
                anchor: t.anchor,
                rotation: t.rotation,
                local: Rect::new(0.0, 0.0, t.width, t.height()),
            }),
            Geometry::Wall(_) | Geometry::Room(_) | Geometry::Dimension(_) => None,
        }
    }

    /// The first point of a polyline, or the anchor of an anchored kind.
    pub fn origin(&self) -> Option<Point> {
        match self.polyline() {
            Some(p) => p.points.first().copied(),
            None => self.placement().map(|p| p.anchor),
        }
    }

    /// Translate every point by `delta`.
    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Geometry::Wall(p) | Geometry::Room(p) | Geometry::Dimension(p) => {
                for point in &mut p.points {
                    *point += delta;
                }
            }
            Geometry::Door(d) => d.anchor += delta,
            Geometry::Window(w) => w.anchor += delta,
            Geometry::Furniture(f) => f.anchor += delta,
            Geometry::Text(t) => t.anchor += delta,
        }
    }

    /// Bounding box in world coordinates.
    pub fn bounds(&self) -> Rect {
        if let Some(placement) = self.placement() {
            return placement.bounds();
        }
        let points = self.polyline().map(|p| p.points.as_slice()).unwrap_or(&[]);
        let mut iter = points.iter();
        match iter.next() {
            Some(first) => iter.fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p)),
            None => Rect::ZERO,
        }
    }

    /// Number of distinct points (1 for anchored kinds).
    pub fn distinct_points(&self) -> usize {
        match self.polyline() {
            Some(p) => p.distinct_points(),
            None => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polyline_distinct_points() {
        let p = Polyline::new(vec![Point::ZERO, Point::ZERO, Point::new(10.0, 0.0), Point::ZERO]);
        assert_eq!(p.distinct_points(), 2);
    }

    #[test]
    fn test_polyline_dedup() {
        let mut p = Polyline::new(vec![
            Point::ZERO,
            Point::new(100.0, 0.0),
            Point::new(100.0, 0.0),
        ]);
        p.dedup();
        assert_eq!(p.points, vec![Point::ZERO, Point::new(100.0, 0.0)]);
    }

    #[test]
    fn test_geometry_at_defaults() {
        let door = Geometry::at(ElementKind::Door, Point::new(5.0, 5.0));
        match door {
            Geometry::Door(d) => {
                assert_eq!(d.anchor, Point::new(5.0, 5.0));
                assert_eq!(d.width, 80.0);
                assert_eq!(d.height, 10.0);
                assert_eq!(d.opening_angle, 90.0);
            }
            other => panic!("unexpected geometry {other:?}"),
        }

        let wall = Geometry::at(ElementKind::Wall, Point::new(1.0, 2.0));
        assert_eq!(wall.polyline().unwrap().points.len(), 2);
        assert_eq!(wall.distinct_points(), 1);
    }

    #[test]
    fn test_translate() {
        let mut wall = Geometry::Wall(Polyline::new(vec![Point::ZERO, Point::new(10.0, 0.0)]));
        wall.translate(Vec2::new(5.0, 5.0));
        assert_eq!(
            wall.polyline().unwrap().points,
            vec![Point::new(5.0, 5.0), Point::new(15.0, 5.0)]
        );

        let mut window = Geometry::at(ElementKind::Window, Point::ZERO);
        window.translate(Vec2::new(-3.0, 4.0));
        assert_eq!(window.origin(), Some(Point::new(-3.0, 4.0)));
    }

    #[test]
    fn test_rotated_placement_contains() {
        let furniture = Geometry::Furniture(Furniture {
            anchor: Point::new(100.0, 100.0),
            width: 100.0,
            height: 60.0,
            rotation: 90.0,
            variant: FurnitureVariant::Bed,
        });
        let placement = furniture.placement().unwrap();
        // Rotated 90°: the box extends along +y and -x from the anchor.
        assert!(placement.contains(Point::new(70.0, 150.0), 0.0));
        assert!(!placement.contains(Point::new(150.0, 130.0), 0.0));

        let bounds = furniture.bounds();
        assert!((bounds.x0 - 40.0).abs() < 1e-9);
        assert!((bounds.y1 - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_geometry_serialization_shape() {
        let wall = Geometry::Wall(Polyline::new(vec![Point::ZERO, Point::new(50.0, 0.0)]));
        let json = serde_json::to_value(&wall).unwrap();
        assert_eq!(json["type"], "wall");
        assert_eq!(json["geometry"]["points"][1]["x"], 50.0);

        let furniture: Geometry =
            serde_json::from_str(r#"{"type":"furniture","geometry":{"shape":"sofa"}}"#).unwrap();
        match furniture {
            Geometry::Furniture(f) => {
                assert_eq!(f.variant, FurnitureVariant::Sofa);
                assert_eq!(f.width, 100.0);
            }
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn test_anchor_travels_as_first_point() {
        let door: Geometry =
            serde_json::from_str(r#"{"type":"door","geometry":{"points":[{"x":120,"y":40}],"width":90}}"#).unwrap();
        assert_eq!(door.origin(), Some(Point::new(120.0, 40.0)));
        let Geometry::Door(d) = &door else {
            panic!("unexpected geometry {door:?}");
        };
        assert_eq!(d.width, 90.0);
        assert_eq!(d.opening_angle, 90.0);

        let json = serde_json::to_value(&door).unwrap();
        assert_eq!(json["geometry"]["points"][0]["x"], 120.0);
        assert_eq!(json["geometry"]["points"].as_array().map(Vec::len), Some(1));
        assert!(json["geometry"].get("anchor").is_none());
        assert_eq!(serde_json::from_value::<Geometry>(json).unwrap(), door);

        let text: Geometry =
            serde_json::from_str(r#"{"type":"text","geometry":{"anchor":{"x":5,"y":6},"content":"Hall"}}"#).unwrap();
        assert_eq!(text.origin(), Some(Point::new(5.0, 6.0)));
    }
}
