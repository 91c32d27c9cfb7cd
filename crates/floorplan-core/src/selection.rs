//! Selection set and drag-move state.

use crate::element::{Element, ElementId};
use crate::snap::{GridSettings, snap};
use crate::store::ElementStore;
use kurbo::{Point, Vec2};

/// The set of currently selected element ids, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<ElementId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection with `ids`, or toggle each of `ids` when `additive`.
    pub fn select<I>(&mut self, ids: I, additive: bool)
    where
        I: IntoIterator<Item = ElementId>,
    {
        if !additive {
            self.ids.clear();
            for id in ids {
                if !self.ids.contains(&id) {
                    self.ids.push(id);
                }
            }
            return;
        }

        for id in ids {
            if let Some(pos) = self.ids.iter().position(|selected| *selected == id) {
                self.ids.remove(pos);
            } else {
                self.ids.push(id);
            }
        }
    }

    /// Empty the selection.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Select every element in the store.
    pub fn select_all(&mut self, store: &ElementStore) {
        self.ids = store.ids().cloned().collect();
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.ids.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> &[ElementId] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementId> {
        self.ids.iter()
    }

    /// Remove a single id. Returns true if it was selected.
    pub fn remove(&mut self, id: &ElementId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|selected| selected != id);
        self.ids.len() != before
    }

    /// Drop every id the store no longer knows. Returns the number pruned.
    pub fn retain_known(&mut self, store: &ElementStore) -> usize {
        let before = self.ids.len();
        self.ids.retain(|id| store.contains(id));
        before - self.ids.len()
    }

    /// Follow an id reassignment.
    pub fn rename(&mut self, old: &ElementId, new: &ElementId) {
        for id in &mut self.ids {
            if id == old {
                *id = new.clone();
            }
        }
    }
}

/// State of an in-progress drag of the selected elements.
#[derive(Debug, Clone)]
pub struct MoveState {
    /// Starting point of the drag (world coordinates).
    pub start_point: Point,
    /// Current point of the drag (world coordinates).
    pub current_point: Point,
    /// Elements as they were when the drag began.
    pub original_elements: Vec<Element>,
}

impl MoveState {
    /// Create a new move state.
    pub fn new(start_point: Point, original_elements: Vec<Element>) -> Self {
        Self {
            start_point,
            current_point: start_point,
            original_elements,
        }
    }

    /// Get the drag delta, quantized to whole grid steps when snapping.
    pub fn delta(&self, grid: &GridSettings) -> Vec2 {
        let raw = self.current_point - self.start_point;
        snap(raw.to_point(), grid.size, grid.snap).to_vec2()
    }

    /// The dragged elements moved by the current delta.
    pub fn moved_elements(&self, grid: &GridSettings) -> Vec<Element> {
        let delta = self.delta(grid);
        self.original_elements
            .iter()
            .cloned()
            .map(|mut element| {
                element.translate(delta);
                element
            })
            .collect()
    }

    /// Get the element ids being moved.
    pub fn element_ids(&self) -> impl Iterator<Item = &ElementId> {
        self.original_elements.iter().map(|e| &e.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementKind, Geometry};

    fn ids(names: &[&str]) -> Vec<ElementId> {
        names.iter().map(|n| ElementId::from(*n)).collect()
    }

    fn store_with(names: &[&str]) -> ElementStore {
        ElementStore::from_elements(
            names
                .iter()
                .map(|n| Element::new(ElementId::from(*n), Geometry::at(ElementKind::Door, Point::ZERO)))
                .collect(),
        )
    }

    #[test]
    fn test_replace_selection() {
        let mut selection = Selection::new();
        selection.select(ids(&["a", "b"]), false);
        selection.select(ids(&["c"]), false);
        assert_eq!(selection.ids(), ids(&["c"]).as_slice());
    }

    #[test]
    fn test_additive_toggle() {
        let mut selection = Selection::new();
        selection.select(ids(&["a", "b"]), false);
        selection.select(ids(&["b", "c"]), true);
        assert_eq!(selection.ids(), ids(&["a", "c"]).as_slice());
    }

    #[test]
    fn test_clear() {
        let mut selection = Selection::new();
        selection.select(ids(&["a"]), false);
        selection.clear();
        assert!(selection.is_empty());
    }

    #[test]
    fn test_retain_known_prunes_deleted() {
        let mut store = store_with(&["a", "b", "c"]);
        let mut selection = Selection::new();
        selection.select(ids(&["a", "c"]), false);
        store.remove(&ElementId::from("c"));
        assert_eq!(selection.retain_known(&store), 1);
        assert_eq!(selection.ids(), ids(&["a"]).as_slice());
    }

    #[test]
    fn test_rename() {
        let mut selection = Selection::new();
        selection.select(ids(&["local-1"]), false);
        selection.rename(&ElementId::from("local-1"), &ElementId::from("srv-1"));
        assert!(selection.contains(&ElementId::from("srv-1")));
    }

    #[test]
    fn test_select_all() {
        let store = store_with(&["a", "b"]);
        let mut selection = Selection::new();
        selection.select_all(&store);
        assert_eq!(selection.len(), 2);
    }

    #[test]
    fn test_move_state_delta_snaps_to_grid() {
        let element = Element::new(ElementId::from("a"), Geometry::at(ElementKind::Door, Point::new(10.0, 10.0)));
        let mut state = MoveState::new(Point::new(0.0, 0.0), vec![element]);
        state.current_point = Point::new(60.0, 20.0);

        let grid = GridSettings::default();
        assert_eq!(state.delta(&grid), Vec2::new(50.0, 0.0));
        let moved = state.moved_elements(&grid);
        assert_eq!(moved[0].geometry.origin(), Some(Point::new(60.0, 10.0)));

        let free = GridSettings { snap: false, ..grid };
        assert_eq!(state.delta(&free), Vec2::new(60.0, 20.0));
    }
}
