//! Layer index derived from element metadata.
//!
//! Layers are not stored anywhere: they are the grouping of elements by
//! `metadata.layer`. Every layer operation therefore resolves to a bulk
//! update of member elements.

use crate::element::{DEFAULT_LAYER, Element, ElementId};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    #[error("The default layer cannot be deleted")]
    CannotDeleteDefault,
    #[error("Layer not found: {0}")]
    NotFound(String),
    #[error("Layer name cannot be empty")]
    EmptyName,
}

/// A layer and the aggregate state of its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub name: String,
    pub element_ids: Vec<ElementId>,
    /// True if any member is visible.
    pub visible: bool,
    /// True if every member is locked.
    pub locked: bool,
}

impl Layer {
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_LAYER
    }

    pub fn len(&self) -> usize {
        self.element_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.element_ids.is_empty()
    }
}

/// Layers of an element set, `"default"` first and the rest by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerIndex {
    layers: Vec<Layer>,
}

impl LayerIndex {
    pub fn build(elements: &[Element]) -> Self {
        let mut groups: BTreeMap<&str, Layer> = BTreeMap::new();
        for element in elements {
            let layer = groups.entry(element.layer()).or_insert_with(|| Layer {
                name: element.layer().to_string(),
                element_ids: Vec::new(),
                visible: false,
                locked: true,
            });
            layer.element_ids.push(element.id.clone());
            layer.visible |= element.is_visible();
            layer.locked &= element.is_locked();
        }

        let mut layers: Vec<Layer> = Vec::with_capacity(groups.len());
        if let Some(default) = groups.remove(DEFAULT_LAYER) {
            layers.push(default);
        }
        layers.extend(groups.into_values());
        Self { layers }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

fn members<'a>(elements: &'a [Element], layer: &'a str) -> impl Iterator<Item = &'a Element> {
    elements.iter().filter(move |e| e.layer() == layer)
}

fn require_layer(elements: &[Element], layer: &str) -> Result<(), LayerError> {
    if members(elements, layer).next().is_none() {
        return Err(LayerError::NotFound(layer.to_string()));
    }
    Ok(())
}

/// Move every member of `old` onto `new`. Returns the updated elements.
pub fn rename_layer(elements: &[Element], old: &str, new: &str) -> Result<Vec<Element>, LayerError> {
    let new = new.trim();
    if new.is_empty() {
        return Err(LayerError::EmptyName);
    }
    require_layer(elements, old)?;
    if old == new {
        return Ok(Vec::new());
    }
    Ok(members(elements, old)
        .cloned()
        .map(|mut e| {
            e.metadata.layer = new.to_string();
            e
        })
        .collect())
}

/// Dissolve a layer, moving its members onto the default layer.
pub fn delete_layer(elements: &[Element], layer: &str) -> Result<Vec<Element>, LayerError> {
    if layer == DEFAULT_LAYER {
        return Err(LayerError::CannotDeleteDefault);
    }
    rename_layer(elements, layer, DEFAULT_LAYER)
}

/// Flip the aggregate visibility onto every member.
pub fn toggle_visibility(elements: &[Element], layer: &str) -> Result<Vec<Element>, LayerError> {
    require_layer(elements, layer)?;
    let visible = !members(elements, layer).any(Element::is_visible);
    Ok(members(elements, layer)
        .filter(|e| e.metadata.visible != visible)
        .cloned()
        .map(|mut e| {
            e.metadata.visible = visible;
            e
        })
        .collect())
}

/// Flip the aggregate lock onto every member.
pub fn toggle_lock(elements: &[Element], layer: &str) -> Result<Vec<Element>, LayerError> {
    require_layer(elements, layer)?;
    let locked = !members(elements, layer).all(Element::is_locked);
    Ok(members(elements, layer)
        .filter(|e| e.metadata.locked != locked)
        .cloned()
        .map(|mut e| {
            e.metadata.locked = locked;
            e
        })
        .collect())
}

/// Put the given elements on `layer`, which need not exist yet.
pub fn move_to_layer(elements: &[Element], ids: &[ElementId], layer: &str) -> Result<Vec<Element>, LayerError> {
    let layer = layer.trim();
    if layer.is_empty() {
        return Err(LayerError::EmptyName);
    }
    Ok(elements
        .iter()
        .filter(|e| ids.contains(&e.id) && e.layer() != layer)
        .cloned()
        .map(|mut e| {
            e.metadata.layer = layer.to_string();
            e
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementKind, Geometry};
    use kurbo::Point;

    fn element(id: &str, layer: &str, visible: bool, locked: bool) -> Element {
        let mut e = Element::new(ElementId::from(id), Geometry::at(ElementKind::Door, Point::ZERO));
        e.metadata.layer = layer.to_string();
        e.metadata.visible = visible;
        e.metadata.locked = locked;
        e
    }

    #[test]
    fn test_aggregates() {
        let elements = vec![element("a", "walls", true, true), element("b", "walls", false, false)];
        let index = LayerIndex::build(&elements);
        let walls = index.get("walls").unwrap();
        assert!(walls.visible);
        assert!(!walls.locked);
        assert_eq!(walls.len(), 2);

        let all_locked = vec![element("a", "x", false, true), element("b", "x", false, true)];
        let x = LayerIndex::build(&all_locked);
        assert!(!x.get("x").unwrap().visible);
        assert!(x.get("x").unwrap().locked);
    }

    #[test]
    fn test_ordering_default_first() {
        let elements = vec![
            element("a", "zeta", true, false),
            element("b", "alpha", true, false),
            element("c", "", true, false),
            element("d", "default", true, false),
        ];
        let index = LayerIndex::build(&elements);
        let names: Vec<&str> = index.names().collect();
        assert_eq!(names, vec!["default", "alpha", "zeta"]);
        assert_eq!(index.get("default").unwrap().len(), 2);
    }

    #[test]
    fn test_empty_store_has_no_layers() {
        assert!(LayerIndex::build(&[]).is_empty());
    }

    #[test]
    fn test_rename_layer() {
        let elements = vec![element("a", "walls", true, false), element("b", "doors", true, false)];
        let updated = rename_layer(&elements, "walls", "structure").unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].metadata.layer, "structure");
        assert_eq!(rename_layer(&elements, "walls", "  "), Err(LayerError::EmptyName));
        assert_eq!(
            rename_layer(&elements, "nope", "x"),
            Err(LayerError::NotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_delete_layer_moves_members_to_default() {
        let elements = vec![element("a", "walls", true, false)];
        let updated = delete_layer(&elements, "walls").unwrap();
        assert_eq!(updated[0].layer(), DEFAULT_LAYER);
        assert_eq!(delete_layer(&elements, DEFAULT_LAYER), Err(LayerError::CannotDeleteDefault));
    }

    #[test]
    fn test_toggle_visibility_flips_aggregate() {
        let elements = vec![element("a", "walls", true, false), element("b", "walls", false, false)];
        // Aggregate is visible, so toggling hides every member.
        let updated = toggle_visibility(&elements, "walls").unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].id.as_str(), "a");
        assert!(!updated[0].is_visible());
    }

    #[test]
    fn test_toggle_lock_flips_aggregate() {
        let elements = vec![element("a", "walls", true, true), element("b", "walls", true, false)];
        let updated = toggle_lock(&elements, "walls").unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].id.as_str(), "b");
        assert!(updated[0].is_locked());
    }

    #[test]
    fn test_move_to_layer() {
        let elements = vec![element("a", "walls", true, false), element("b", "doors", true, false)];
        let ids = vec![ElementId::from("a"), ElementId::from("b")];
        let updated = move_to_layer(&elements, &ids, "doors").unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].id.as_str(), "a");
        assert_eq!(move_to_layer(&elements, &ids, ""), Err(LayerError::EmptyName));
    }
}
