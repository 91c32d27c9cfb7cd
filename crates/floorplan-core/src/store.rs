//! Ordered element collection the editor operates on.

use crate::element::{Element, ElementId, ElementKind};
use kurbo::{Point, Rect};

/// An ordered collection of elements keyed by id.
///
/// Order is insertion order and doubles as paint order (back to front).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementStore {
    elements: Vec<Element>,
}

impl ElementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from fetched elements. Later duplicates of an id replace earlier ones.
    pub fn from_elements(elements: Vec<Element>) -> Self {
        let mut store = Self::new();
        store.replace_all(elements);
        store
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ElementId> {
        self.elements.iter().map(|e| &e.id)
    }

    fn position(&self, id: &ElementId) -> Option<usize> {
        self.elements.iter().position(|e| &e.id == id)
    }

    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| &e.id == id)
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.position(id).is_some()
    }

    /// Full copy of the current element set.
    pub fn snapshot(&self) -> Vec<Element> {
        self.elements.clone()
    }

    /// Append an element, or replace in place if the id already exists.
    pub fn insert(&mut self, element: Element) {
        match self.position(&element.id) {
            Some(idx) => self.elements[idx] = element,
            None => self.elements.push(element),
        }
    }

    /// Insert at a specific position (clamped), used to restore a removed element.
    pub fn insert_at(&mut self, index: usize, element: Element) {
        if let Some(existing) = self.position(&element.id) {
            self.elements.remove(existing);
        }
        let index = index.min(self.elements.len());
        self.elements.insert(index, element);
    }

    /// Replace an existing element. Returns the previous version, or `None`
    /// (and leaves the store unchanged) if the id is unknown.
    pub fn update(&mut self, element: Element) -> Option<Element> {
        let idx = self.position(&element.id)?;
        Some(std::mem::replace(&mut self.elements[idx], element))
    }

    /// Remove an element, returning its former position and value.
    pub fn remove(&mut self, id: &ElementId) -> Option<(usize, Element)> {
        let idx = self.position(id)?;
        Some((idx, self.elements.remove(idx)))
    }

    /// Replace the entire set, returning the previous one.
    pub fn replace_all(&mut self, elements: Vec<Element>) -> Vec<Element> {
        let mut deduped: Vec<Element> = Vec::with_capacity(elements.len());
        for element in elements {
            match deduped.iter().position(|e| e.id == element.id) {
                Some(idx) => deduped[idx] = element,
                None => deduped.push(element),
            }
        }
        std::mem::replace(&mut self.elements, deduped)
    }

    /// Reassign an element id. Returns false if `old` is unknown.
    pub fn rename(&mut self, old: &ElementId, new: &ElementId) -> bool {
        match self.position(old) {
            Some(idx) => {
                self.elements[idx].id = new.clone();
                true
            }
            None => false,
        }
    }

    /// Number of elements of a given kind.
    pub fn count_kind(&self, kind: ElementKind) -> usize {
        self.elements.iter().filter(|e| e.kind() == kind).count()
    }

    /// Find visible elements at a point (in world coordinates), front to back.
    pub fn elements_at_point(&self, point: Point, tolerance: f64) -> Vec<ElementId> {
        self.elements
            .iter()
            .rev()
            .filter(|e| e.is_visible() && e.hit_test(point, tolerance))
            .map(|e| e.id.clone())
            .collect()
    }

    /// Topmost visible element at a point.
    pub fn hit(&self, point: Point, tolerance: f64) -> Option<ElementId> {
        self.elements
            .iter()
            .rev()
            .find(|e| e.is_visible() && e.hit_test(point, tolerance))
            .map(|e| e.id.clone())
    }

    /// Visible elements whose bounds intersect a rectangle.
    pub fn elements_in_rect(&self, rect: Rect) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|e| e.is_visible() && rect.intersect(e.bounds().inflate(1.0, 1.0)).area() > 0.0)
            .map(|e| e.id.clone())
            .collect()
    }

    /// Get the bounding box of all elements.
    pub fn bounds(&self) -> Option<Rect> {
        self.elements
            .iter()
            .map(Element::bounds)
            .reduce(|acc, r| acc.union(r))
    }
}
