//! Persisted records: projects, drawings and element payloads.

use crate::element::{Element, ElementId, Geometry, Metadata, Style};
use crate::snap::GridSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a user (owner or collaborator).
    UserId
);
string_id!(
    /// Identifier of a project.
    ProjectId
);
string_id!(
    /// Identifier of a drawing.
    DrawingId
);

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Saved pan offset and viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for ViewBox {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1000.0,
            height: 800.0,
        }
    }
}

/// A named canvas belonging to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drawing {
    pub id: DrawingId,
    pub project: ProjectId,
    pub title: String,
    /// Owned elements, in insertion order.
    #[serde(default)]
    pub elements: Vec<ElementId>,
    pub created_by: UserId,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
    #[serde(default)]
    pub view_box: ViewBox,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub grid_settings: GridSettings,
}

fn default_scale() -> f64 {
    1.0
}

impl Drawing {
    /// Create an empty drawing with default viewport and grid.
    pub fn new(project: ProjectId, title: impl Into<String>, created_by: UserId) -> Self {
        let now = now_millis();
        Self {
            id: DrawingId::generate(),
            project,
            title: title.into(),
            elements: Vec::new(),
            created_by,
            created_at: now,
            updated_at: now,
            view_box: ViewBox::default(),
            scale: default_scale(),
            grid_settings: GridSettings::default(),
        }
    }

    /// Apply the provided fields of a patch. Non-positive scales are ignored.
    pub fn apply_patch(&mut self, patch: &DrawingPatch) {
        if let Some(title) = patch.title.as_ref().filter(|t| !t.trim().is_empty()) {
            self.title = title.clone();
        }
        if let Some(view_box) = patch.view_box {
            self.view_box = view_box;
        }
        if let Some(scale) = patch.scale.filter(|s| *s > 0.0) {
            self.scale = scale;
        }
        if let Some(grid) = patch.grid_settings {
            self.grid_settings = grid;
        }
        self.updated_at = now_millis();
    }
}

/// Partial drawing update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DrawingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_box: Option<ViewBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_settings: Option<GridSettings>,
}

/// Free-form project details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Top-level container of drawings with one owner and any number of collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner: UserId,
    #[serde(default)]
    pub collaborators: Vec<UserId>,
    #[serde(default)]
    pub drawings: Vec<DrawingId>,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
    #[serde(default)]
    pub metadata: ProjectMetadata,
}

impl Project {
    pub fn new(title: impl Into<String>, owner: UserId) -> Self {
        let now = now_millis();
        Self {
            id: ProjectId::generate(),
            title: title.into(),
            description: None,
            owner,
            collaborators: Vec::new(),
            drawings: Vec::new(),
            created_at: now,
            updated_at: now,
            metadata: ProjectMetadata::default(),
        }
    }

    pub fn is_owner(&self, user: &UserId) -> bool {
        &self.owner == user
    }

    /// Owners and collaborators may read and write drawings and elements.
    pub fn can_access(&self, user: &UserId) -> bool {
        self.is_owner(user) || self.collaborators.contains(user)
    }
}

/// Element payload without an id, as sent on creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewElement {
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewElement {
    pub fn into_element(self, id: ElementId) -> Element {
        Element {
            id,
            geometry: self.geometry,
            style: self.style,
            metadata: self.metadata,
        }
    }
}

impl From<&Element> for NewElement {
    fn from(element: &Element) -> Self {
        Self {
            geometry: element.geometry.clone(),
            style: element.style.clone(),
            metadata: element.metadata.clone(),
        }
    }
}

/// Partial element update. Absent parts are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    #[serde(flatten)]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl ElementPatch {
    pub fn apply_to(&self, element: &mut Element) {
        if let Some(geometry) = &self.geometry {
            element.geometry = geometry.clone();
        }
        if let Some(style) = &self.style {
            element.style = style.clone();
        }
        if let Some(metadata) = &self.metadata {
            element.metadata = metadata.clone();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_none() && self.style.is_none() && self.metadata.is_none()
    }

    /// The parts of `after` that differ from `before`.
    pub fn diff(before: &Element, after: &Element) -> Self {
        Self {
            geometry: (before.geometry != after.geometry).then(|| after.geometry.clone()),
            style: (before.style != after.style).then(|| after.style.clone()),
            metadata: (before.metadata != after.metadata).then(|| after.metadata.clone()),
        }
    }
}

impl From<&Element> for ElementPatch {
    fn from(element: &Element) -> Self {
        Self {
            geometry: Some(element.geometry.clone()),
            style: Some(element.style.clone()),
            metadata: Some(element.metadata.clone()),
        }
    }
}

/// One entry of a batch replace. Entries without an id, or with a local
/// placeholder id, get a fresh one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ElementId>,
    #[serde(flatten)]
    pub element: NewElement,
}

impl BatchElement {
    pub fn into_element(self) -> Element {
        let id = self
            .id
            .filter(|id| !id.is_placeholder())
            .unwrap_or_else(ElementId::generate);
        self.element.into_element(id)
    }
}

impl From<&Element> for BatchElement {
    fn from(element: &Element) -> Self {
        Self {
            id: Some(element.id.clone()),
            element: NewElement::from(element),
        }
    }
}

/// Body of a batch replace request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementBatch {
    pub elements: Vec<BatchElement>,
}

impl ElementBatch {
    pub fn from_elements(elements: &[Element]) -> Self {
        Self {
            elements: elements.iter().map(BatchElement::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementKind;
    use kurbo::Point;

    #[test]
    fn test_project_access() {
        let owner = UserId::from("owner");
        let guest = UserId::from("guest");
        let stranger = UserId::from("stranger");
        let mut project = Project::new("House", owner.clone());
        project.collaborators.push(guest.clone());

        assert!(project.can_access(&owner));
        assert!(project.can_access(&guest));
        assert!(!project.can_access(&stranger));
        assert!(project.is_owner(&owner));
        assert!(!project.is_owner(&guest));
    }

    #[test]
    fn test_drawing_defaults_from_json() {
        let json = r#"{"id": "d1", "project": "p1", "title": "Ground floor", "createdBy": "u1"}"#;
        let drawing: Drawing = serde_json::from_str(json).unwrap();
        assert_eq!(drawing.scale, 1.0);
        assert_eq!(drawing.view_box, ViewBox::default());
        assert_eq!(drawing.grid_settings.size, 50.0);
        assert!(drawing.grid_settings.snap);
        assert!(drawing.elements.is_empty());
    }

    #[test]
    fn test_drawing_patch_ignores_invalid_scale() {
        let mut drawing = Drawing::new(ProjectId::from("p"), "Plan", UserId::from("u"));
        drawing.apply_patch(&DrawingPatch {
            scale: Some(0.0),
            title: Some("  ".to_string()),
            view_box: Some(ViewBox {
                x: 10.0,
                y: 20.0,
                width: 640.0,
                height: 480.0,
            }),
            ..DrawingPatch::default()
        });
        assert_eq!(drawing.scale, 1.0);
        assert_eq!(drawing.title, "Plan");
        assert_eq!(drawing.view_box.x, 10.0);
    }

    #[test]
    fn test_element_patch_partial() {
        let mut element = Element::new(
            ElementId::from("e"),
            Geometry::at(ElementKind::Text, Point::new(1.0, 1.0)),
        );
        let patch: ElementPatch =
            serde_json::from_str(r#"{"metadata": {"name": "Label", "locked": true}}"#).unwrap();
        assert!(patch.geometry.is_none());
        patch.apply_to(&mut element);
        assert_eq!(element.metadata.name, "Label");
        assert!(element.metadata.locked);
        assert_eq!(element.kind(), ElementKind::Text);
    }

    #[test]
    fn test_new_element_round_trip_into_element() {
        let source = Element::new(
            ElementId::from("x"),
            Geometry::at(ElementKind::Window, Point::new(3.0, 4.0)),
        );
        let payload = NewElement::from(&source);
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains(r#""type":"window""#));
        let back: NewElement = serde_json::from_str(&json).unwrap();
        assert_eq!(back.into_element(ElementId::from("x")), source);
    }

    #[test]
    fn test_batch_element_ids() {
        let kept = Element::new(ElementId::from("srv-1"), Geometry::at(ElementKind::Door, Point::ZERO));
        let local = Element::new(ElementId::placeholder(), Geometry::at(ElementKind::Door, Point::ZERO));
        let batch = ElementBatch::from_elements(&[kept, local]);
        let json = serde_json::to_string(&batch).unwrap();

        let back: ElementBatch = serde_json::from_str(&json).unwrap();
        let elements: Vec<Element> = back.elements.into_iter().map(BatchElement::into_element).collect();
        assert_eq!(elements[0].id.as_str(), "srv-1");
        assert!(!elements[1].id.is_placeholder());

        let anonymous: BatchElement =
            serde_json::from_str(r#"{"type": "room", "geometry": {"points": [{"x": 0, "y": 0}]}}"#).unwrap();
        assert!(anonymous.id.is_none());
        assert_eq!(anonymous.into_element().kind(), ElementKind::Room);
    }

    #[test]
    fn test_element_patch_diff() {
        let before = Element::new(ElementId::from("e"), Geometry::at(ElementKind::Door, Point::ZERO));
        let mut after = before.clone();
        after.translate(kurbo::Vec2::new(10.0, 0.0));

        let patch = ElementPatch::diff(&before, &after);
        assert!(patch.geometry.is_some());
        assert!(patch.style.is_none() && patch.metadata.is_none());
        assert!(ElementPatch::diff(&before, &before).is_empty());

        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["type"], "door");
        assert!(json.get("style").is_none());
    }
}
