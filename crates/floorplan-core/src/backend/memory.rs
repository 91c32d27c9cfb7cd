//! In-memory backend implementation.

use super::{Backend, BackendError, BackendResult, BoxFuture};
use crate::element::{Element, ElementId};
use crate::model::{Drawing, DrawingId, DrawingPatch, ElementPatch, NewElement, now_millis};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, RwLock};

#[derive(Default)]
struct Tables {
    drawings: HashMap<DrawingId, Drawing>,
    /// Every element with its owning drawing, in insertion order.
    elements: Vec<(DrawingId, Element)>,
}

impl Tables {
    fn drawing_mut(&mut self, id: &DrawingId) -> BackendResult<&mut Drawing> {
        self.drawings
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(format!("drawing {id}")))
    }

    fn position(&self, id: &ElementId) -> BackendResult<usize> {
        self.elements
            .iter()
            .position(|(_, e)| &e.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("element {id}")))
    }
}

/// In-memory backend for offline editing and tests.
///
/// Failures can be queued with [`MemoryBackend::fail_next`]; each queued
/// error is returned by the next call instead of performing it.
#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
    failures: Mutex<VecDeque<BackendError>>,
}

fn lock_error(e: impl std::fmt::Display) -> BackendError {
    BackendError::Other(format!("Lock error: {}", e))
}

impl MemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend holding one drawing and its elements.
    pub fn with_drawing(mut drawing: Drawing, elements: Vec<Element>) -> Self {
        drawing.elements = elements.iter().map(|e| e.id.clone()).collect();
        let tables = Tables {
            elements: elements.into_iter().map(|e| (drawing.id.clone(), e)).collect(),
            drawings: HashMap::from([(drawing.id.clone(), drawing)]),
        };
        Self {
            tables: RwLock::new(tables),
            failures: Mutex::default(),
        }
    }

    /// Create a backend from exported JSON: a drawing record and its element
    /// array. Elements of unknown kind are skipped.
    pub fn from_json(drawing: &str, elements: &str) -> Result<Self, serde_json::Error> {
        let drawing: Drawing = serde_json::from_str(drawing)?;
        Ok(Self::with_drawing(drawing, Element::parse_many(elements)?))
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&self, error: BackendError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back(error);
        }
    }

    fn injected_failure(&self) -> BackendResult<()> {
        let mut failures = self.failures.lock().map_err(lock_error)?;
        match failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Elements currently stored for a drawing.
    pub fn elements_of(&self, drawing: &DrawingId) -> Vec<Element> {
        self.tables
            .read()
            .map(|t| {
                t.elements
                    .iter()
                    .filter(|(d, _)| d == drawing)
                    .map(|(_, e)| e.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Backend for MemoryBackend {
    fn fetch_drawing(&self, id: &DrawingId) -> BoxFuture<'_, BackendResult<Drawing>> {
        let id = id.clone();
        Box::pin(async move {
            self.injected_failure()?;
            let tables = self.tables.read().map_err(lock_error)?;
            tables
                .drawings
                .get(&id)
                .cloned()
                .ok_or_else(|| BackendError::NotFound(format!("drawing {id}")))
        })
    }

    fn fetch_elements(&self, drawing: &DrawingId) -> BoxFuture<'_, BackendResult<Vec<Element>>> {
        let drawing = drawing.clone();
        Box::pin(async move {
            self.injected_failure()?;
            let tables = self.tables.read().map_err(lock_error)?;
            if !tables.drawings.contains_key(&drawing) {
                return Err(BackendError::NotFound(format!("drawing {drawing}")));
            }
            Ok(tables
                .elements
                .iter()
                .filter(|(d, _)| *d == drawing)
                .map(|(_, e)| e.clone())
                .collect())
        })
    }

    fn create_element(&self, drawing: &DrawingId, element: NewElement) -> BoxFuture<'_, BackendResult<Element>> {
        let drawing = drawing.clone();
        Box::pin(async move {
            self.injected_failure()?;
            let mut tables = self.tables.write().map_err(lock_error)?;
            let element = element.into_element(ElementId::generate());
            let record = tables.drawing_mut(&drawing)?;
            record.elements.push(element.id.clone());
            record.updated_at = now_millis();
            tables.elements.push((drawing, element.clone()));
            Ok(element)
        })
    }

    fn update_element(&self, id: &ElementId, patch: ElementPatch) -> BoxFuture<'_, BackendResult<Element>> {
        let id = id.clone();
        Box::pin(async move {
            self.injected_failure()?;
            let mut tables = self.tables.write().map_err(lock_error)?;
            let idx = tables.position(&id)?;
            let element = &mut tables.elements[idx].1;
            patch.apply_to(element);
            Ok(element.clone())
        })
    }

    fn delete_element(&self, id: &ElementId) -> BoxFuture<'_, BackendResult<()>> {
        let id = id.clone();
        Box::pin(async move {
            self.injected_failure()?;
            let mut tables = self.tables.write().map_err(lock_error)?;
            let idx = tables.position(&id)?;
            let (drawing, _) = tables.elements.remove(idx);
            if let Ok(record) = tables.drawing_mut(&drawing) {
                record.elements.retain(|e| e != &id);
            }
            Ok(())
        })
    }

    fn replace_elements(&self, drawing: &DrawingId, elements: Vec<Element>) -> BoxFuture<'_, BackendResult<Vec<Element>>> {
        let drawing = drawing.clone();
        Box::pin(async move {
            self.injected_failure()?;
            let mut tables = self.tables.write().map_err(lock_error)?;
            tables.drawing_mut(&drawing)?;

            let replaced: Vec<Element> = elements
                .into_iter()
                .map(|mut e| {
                    if e.id.is_placeholder() {
                        e.id = ElementId::generate();
                    }
                    e
                })
                .collect();

            tables.elements.retain(|(d, _)| *d != drawing);
            tables
                .elements
                .extend(replaced.iter().cloned().map(|e| (drawing.clone(), e)));
            let record = tables.drawing_mut(&drawing)?;
            record.elements = replaced.iter().map(|e| e.id.clone()).collect();
            record.updated_at = now_millis();
            Ok(replaced)
        })
    }

    fn update_drawing(&self, id: &DrawingId, patch: DrawingPatch) -> BoxFuture<'_, BackendResult<Drawing>> {
        let id = id.clone();
        Box::pin(async move {
            self.injected_failure()?;
            let mut tables = self.tables.write().map_err(lock_error)?;
            let drawing = tables.drawing_mut(&id)?;
            drawing.apply_patch(&patch);
            Ok(drawing.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::block_on;
    use crate::element::{ElementKind, Geometry};
    use crate::model::{ProjectId, UserId};
    use kurbo::Point;

    fn backend() -> (MemoryBackend, DrawingId) {
        let drawing = Drawing::new(ProjectId::from("p"), "Plan", UserId::from("u"));
        let id = drawing.id.clone();
        (MemoryBackend::with_drawing(drawing, Vec::new()), id)
    }

    fn door(x: f64) -> NewElement {
        NewElement::from(&Element::new(
            ElementId::placeholder(),
            Geometry::at(ElementKind::Door, Point::new(x, 0.0)),
        ))
    }

    #[test]
    fn test_create_and_fetch() {
        let (backend, drawing) = backend();
        let created = block_on(backend.create_element(&drawing, door(1.0))).unwrap();
        assert!(!created.id.is_placeholder());

        let fetched = block_on(backend.fetch_elements(&drawing)).unwrap();
        assert_eq!(fetched, vec![created.clone()]);
        let record = block_on(backend.fetch_drawing(&drawing)).unwrap();
        assert_eq!(record.elements, vec![created.id]);
    }

    #[test]
    fn test_not_found() {
        let (backend, drawing) = backend();
        let result = block_on(backend.update_element(&ElementId::from("ghost"), ElementPatch::default()));
        assert!(matches!(result, Err(BackendError::NotFound(_))));
        let result = block_on(backend.fetch_elements(&DrawingId::from("nope")));
        assert!(matches!(result, Err(BackendError::NotFound(_))));
        assert!(block_on(backend.fetch_elements(&drawing)).unwrap().is_empty());
    }

    #[test]
    fn test_delete() {
        let (backend, drawing) = backend();
        let created = block_on(backend.create_element(&drawing, door(1.0))).unwrap();
        block_on(backend.delete_element(&created.id)).unwrap();
        assert!(backend.elements_of(&drawing).is_empty());
        assert!(block_on(backend.fetch_drawing(&drawing)).unwrap().elements.is_empty());
        assert!(block_on(backend.delete_element(&created.id)).is_err());
    }

    #[test]
    fn test_replace_assigns_ids_to_placeholders() {
        let (backend, drawing) = backend();
        block_on(backend.create_element(&drawing, door(1.0))).unwrap();

        let kept = door(2.0).into_element(ElementId::from("kept"));
        let local = door(3.0).into_element(ElementId::placeholder());
        let replaced = block_on(backend.replace_elements(&drawing, vec![kept, local])).unwrap();

        assert_eq!(replaced.len(), 2);
        assert_eq!(replaced[0].id.as_str(), "kept");
        assert!(!replaced[1].id.is_placeholder());
        assert_eq!(backend.elements_of(&drawing), replaced);
    }

    #[test]
    fn test_injected_failure_applies_once() {
        let (backend, drawing) = backend();
        backend.fail_next(BackendError::Network("offline".to_string()));
        let result = block_on(backend.create_element(&drawing, door(1.0)));
        assert_eq!(result, Err(BackendError::Network("offline".to_string())));
        assert!(backend.elements_of(&drawing).is_empty());
        assert!(block_on(backend.create_element(&drawing, door(1.0))).is_ok());
    }

    #[test]
    fn test_from_json_skips_unknown_kinds() {
        let drawing = r#"{"id": "d1", "project": "p1", "title": "Plan", "createdBy": "u1"}"#;
        let elements = r#"[
            {"id": "w", "type": "wall", "geometry": {"points": [{"x": 0, "y": 0}, {"x": 90, "y": 0}]}},
            {"id": "p", "type": "path", "geometry": {"points": [{"x": 0, "y": 0}]}},
            {"id": "d", "type": "door", "geometry": {"points": [{"x": 30, "y": 0}]}}
        ]"#;
        let backend = MemoryBackend::from_json(drawing, elements).unwrap();

        let id = DrawingId::from("d1");
        let ids: Vec<String> = backend.elements_of(&id).iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["w", "d"]);
        let record = block_on(backend.fetch_drawing(&id)).unwrap();
        assert_eq!(record.elements.len(), 2);

        assert!(MemoryBackend::from_json(drawing, "{").is_err());
    }

    #[test]
    fn test_update_drawing() {
        let (backend, drawing) = backend();
        let patch = DrawingPatch {
            scale: Some(2.0),
            ..DrawingPatch::default()
        };
        let updated = block_on(backend.update_drawing(&drawing, patch)).unwrap();
        assert_eq!(updated.scale, 2.0);
    }
}
