//! In-memory database of projects, drawings and elements.
//!
//! All tables sit behind one lock, so multi-table writes (cascading deletes,
//! batch replace) are atomic. Access rules: owners and collaborators may read
//! and write a project's drawings and elements; only the owner may change or
//! delete the project, manage collaborators, or delete drawings.

use crate::error::{ApiError, ApiResult};
use floorplan_core::model::now_millis;
use floorplan_core::{
    BatchElement, Drawing, DrawingId, DrawingPatch, Element, ElementId, ElementPatch, Geometry, GridSettings,
    NewElement, Project, ProjectId, ProjectMetadata, UserId, ViewBox,
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// Body of a project creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewProject {
    pub title: String,
    pub description: Option<String>,
    pub metadata: ProjectMetadata,
}

/// Partial project update; metadata fields are merged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<ProjectMetadata>,
}

/// Body of a drawing creation. Absent settings take the drawing defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewDrawing {
    pub title: String,
    pub view_box: Option<ViewBox>,
    pub scale: Option<f64>,
    pub grid_settings: Option<GridSettings>,
}

#[derive(Default)]
struct Tables {
    projects: HashMap<ProjectId, Project>,
    drawings: HashMap<DrawingId, Drawing>,
    /// Every element with its drawing, in insertion order.
    elements: Vec<(DrawingId, Element)>,
}

fn project_not_found() -> ApiError {
    ApiError::NotFound("Project not found".to_string())
}

fn drawing_not_found() -> ApiError {
    ApiError::NotFound("Drawing not found".to_string())
}

fn element_not_found() -> ApiError {
    ApiError::NotFound("Element not found".to_string())
}

fn require_title(title: &str) -> ApiResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("Title is required".to_string()));
    }
    Ok(title.to_string())
}

/// Line and outline kinds are never stored without points.
fn require_points(geometry: &Geometry) -> ApiResult<()> {
    if geometry.polyline().is_some_and(|line| line.points.is_empty()) {
        return Err(ApiError::Validation(format!("{} requires at least one point", geometry.kind())));
    }
    Ok(())
}

impl Tables {
    fn project(&self, id: &ProjectId) -> ApiResult<&Project> {
        self.projects.get(id).ok_or_else(project_not_found)
    }

    fn accessible_project(&self, user: &UserId, id: &ProjectId) -> ApiResult<&Project> {
        let project = self.project(id)?;
        if !project.can_access(user) {
            return Err(ApiError::Unauthorized("Not authorized to access this project".to_string()));
        }
        Ok(project)
    }

    fn owned_project(&mut self, user: &UserId, id: &ProjectId) -> ApiResult<&mut Project> {
        let project = self.projects.get_mut(id).ok_or_else(project_not_found)?;
        if !project.is_owner(user) {
            return Err(ApiError::Unauthorized("Only the project owner may do this".to_string()));
        }
        Ok(project)
    }

    /// A drawing whose project `user` can access.
    fn accessible_drawing(&self, user: &UserId, id: &DrawingId) -> ApiResult<&Drawing> {
        let drawing = self.drawings.get(id).ok_or_else(drawing_not_found)?;
        self.accessible_project(user, &drawing.project)?;
        Ok(drawing)
    }

    /// Position of an element whose drawing `user` can access.
    fn accessible_element(&self, user: &UserId, id: &ElementId) -> ApiResult<usize> {
        let index = self
            .elements
            .iter()
            .position(|(_, e)| &e.id == id)
            .ok_or_else(element_not_found)?;
        self.accessible_drawing(user, &self.elements[index].0)?;
        Ok(index)
    }

    fn drawing_elements(&self, drawing: &DrawingId) -> Vec<Element> {
        self.elements
            .iter()
            .filter(|(d, _)| d == drawing)
            .map(|(_, e)| e.clone())
            .collect()
    }

    fn touch_drawing(&mut self, id: &DrawingId) -> Option<&mut Drawing> {
        let drawing = self.drawings.get_mut(id)?;
        drawing.updated_at = now_millis();
        Some(drawing)
    }

    fn remove_drawing(&mut self, id: &DrawingId) {
        self.drawings.remove(id);
        self.elements.retain(|(d, _)| d != id);
    }
}

#[derive(Default)]
pub struct Database {
    tables: RwLock<Tables>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Projects `user` owns or collaborates on, newest first.
    pub async fn list_projects(&self, user: &UserId) -> Vec<Project> {
        let tables = self.tables.read().await;
        let mut projects: Vec<Project> = tables
            .projects
            .values()
            .filter(|p| p.can_access(user))
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        projects
    }

    pub async fn create_project(&self, user: &UserId, new: NewProject) -> ApiResult<Project> {
        let mut project = Project::new(require_title(&new.title)?, user.clone());
        project.description = new.description;
        project.metadata = new.metadata;

        let mut tables = self.tables.write().await;
        tables.projects.insert(project.id.clone(), project.clone());
        tracing::info!(project = %project.id, owner = %user, "project created");
        Ok(project)
    }

    pub async fn project(&self, user: &UserId, id: &ProjectId) -> ApiResult<Project> {
        let tables = self.tables.read().await;
        tables.accessible_project(user, id).cloned()
    }

    pub async fn update_project(&self, user: &UserId, id: &ProjectId, update: ProjectUpdate) -> ApiResult<Project> {
        let mut tables = self.tables.write().await;
        let project = tables.owned_project(user, id)?;

        if let Some(title) = update.title.filter(|t| !t.trim().is_empty()) {
            project.title = title;
        }
        if update.description.is_some() {
            project.description = update.description;
        }
        if let Some(metadata) = update.metadata {
            let merged = &mut project.metadata;
            if metadata.project_type.is_some() {
                merged.project_type = metadata.project_type;
            }
            if metadata.client.is_some() {
                merged.client = metadata.client;
            }
            if metadata.location.is_some() {
                merged.location = metadata.location;
            }
        }
        project.updated_at = now_millis();
        Ok(project.clone())
    }

    /// Delete a project with all its drawings and their elements.
    pub async fn delete_project(&self, user: &UserId, id: &ProjectId) -> ApiResult<()> {
        let mut tables = self.tables.write().await;
        let drawings = tables.owned_project(user, id)?.drawings.clone();
        for drawing in &drawings {
            tables.remove_drawing(drawing);
        }
        tables.projects.remove(id);
        tracing::info!(project = %id, drawings = drawings.len(), "project deleted");
        Ok(())
    }

    pub async fn add_collaborator(&self, user: &UserId, id: &ProjectId, collaborator: UserId) -> ApiResult<Project> {
        let mut tables = self.tables.write().await;
        let project = tables.owned_project(user, id)?;
        if project.is_owner(&collaborator) {
            return Err(ApiError::Validation("Owner cannot be added as a collaborator".to_string()));
        }
        if project.collaborators.contains(&collaborator) {
            return Err(ApiError::Validation("User is already a collaborator".to_string()));
        }
        project.collaborators.push(collaborator);
        project.updated_at = now_millis();
        Ok(project.clone())
    }

    pub async fn remove_collaborator(
        &self,
        user: &UserId,
        id: &ProjectId,
        collaborator: &UserId,
    ) -> ApiResult<Project> {
        let mut tables = self.tables.write().await;
        let project = tables.owned_project(user, id)?;
        project.collaborators.retain(|c| c != collaborator);
        project.updated_at = now_millis();
        Ok(project.clone())
    }

    /// Drawings of a project, newest first.
    pub async fn list_drawings(&self, user: &UserId, project: &ProjectId) -> ApiResult<Vec<Drawing>> {
        let tables = self.tables.read().await;
        tables.accessible_project(user, project)?;
        let mut drawings: Vec<Drawing> = tables
            .drawings
            .values()
            .filter(|d| &d.project == project)
            .cloned()
            .collect();
        drawings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(drawings)
    }

    pub async fn create_drawing(&self, user: &UserId, project: &ProjectId, new: NewDrawing) -> ApiResult<Drawing> {
        let title = require_title(&new.title)?;
        let mut tables = self.tables.write().await;
        tables.accessible_project(user, project)?;

        let mut drawing = Drawing::new(project.clone(), title, user.clone());
        drawing.apply_patch(&DrawingPatch {
            view_box: new.view_box,
            scale: new.scale,
            grid_settings: new.grid_settings,
            ..DrawingPatch::default()
        });

        if let Some(record) = tables.projects.get_mut(project) {
            record.drawings.push(drawing.id.clone());
        }
        tables.drawings.insert(drawing.id.clone(), drawing.clone());
        tracing::info!(drawing = %drawing.id, %project, "drawing created");
        Ok(drawing)
    }

    pub async fn drawing(&self, user: &UserId, id: &DrawingId) -> ApiResult<Drawing> {
        let tables = self.tables.read().await;
        tables.accessible_drawing(user, id).cloned()
    }

    pub async fn update_drawing(&self, user: &UserId, id: &DrawingId, patch: DrawingPatch) -> ApiResult<Drawing> {
        let mut tables = self.tables.write().await;
        tables.accessible_drawing(user, id)?;
        let drawing = tables.drawings.get_mut(id).ok_or_else(drawing_not_found)?;
        drawing.apply_patch(&patch);
        Ok(drawing.clone())
    }

    /// Delete a drawing and its elements. Owner only.
    pub async fn delete_drawing(&self, user: &UserId, id: &DrawingId) -> ApiResult<()> {
        let mut tables = self.tables.write().await;
        let project = tables.drawings.get(id).ok_or_else(drawing_not_found)?.project.clone();
        tables.owned_project(user, &project)?.drawings.retain(|d| d != id);
        tables.remove_drawing(id);
        tracing::info!(drawing = %id, "drawing deleted");
        Ok(())
    }

    /// Elements of a drawing in insertion order.
    pub async fn list_elements(&self, user: &UserId, drawing: &DrawingId) -> ApiResult<Vec<Element>> {
        let tables = self.tables.read().await;
        tables.accessible_drawing(user, drawing)?;
        Ok(tables.drawing_elements(drawing))
    }

    /// Swap a drawing's whole element set.
    pub async fn replace_elements(
        &self,
        user: &UserId,
        drawing: &DrawingId,
        batch: Vec<BatchElement>,
    ) -> ApiResult<Vec<Element>> {
        let mut tables = self.tables.write().await;
        tables.accessible_drawing(user, drawing)?;

        let elements: Vec<Element> = batch.into_iter().map(BatchElement::into_element).collect();
        let mut seen = HashSet::new();
        for element in &elements {
            require_points(&element.geometry)?;
            if !seen.insert(&element.id) {
                return Err(ApiError::Validation(format!("Duplicate element id {}", element.id)));
            }
            if tables.elements.iter().any(|(d, e)| d != drawing && e.id == element.id) {
                return Err(ApiError::Validation(format!("Element {} belongs to another drawing", element.id)));
            }
        }
        tables.elements.retain(|(d, _)| d != drawing);
        tables
            .elements
            .extend(elements.iter().map(|e| (drawing.clone(), e.clone())));
        if let Some(record) = tables.touch_drawing(drawing) {
            record.elements = elements.iter().map(|e| e.id.clone()).collect();
        }
        tracing::debug!(%drawing, count = elements.len(), "elements replaced");
        Ok(elements)
    }

    pub async fn create_element(&self, user: &UserId, drawing: &DrawingId, new: NewElement) -> ApiResult<Element> {
        let mut tables = self.tables.write().await;
        tables.accessible_drawing(user, drawing)?;
        require_points(&new.geometry)?;

        let element = new.into_element(ElementId::generate());
        tables.elements.push((drawing.clone(), element.clone()));
        if let Some(record) = tables.touch_drawing(drawing) {
            record.elements.push(element.id.clone());
        }
        tracing::debug!(element = %element.id, %drawing, kind = %element.kind(), "element created");
        Ok(element)
    }

    pub async fn element(&self, user: &UserId, id: &ElementId) -> ApiResult<Element> {
        let tables = self.tables.read().await;
        let index = tables.accessible_element(user, id)?;
        Ok(tables.elements[index].1.clone())
    }

    pub async fn update_element(&self, user: &UserId, id: &ElementId, patch: ElementPatch) -> ApiResult<Element> {
        let mut tables = self.tables.write().await;
        let index = tables.accessible_element(user, id)?;
        if let Some(geometry) = &patch.geometry {
            require_points(geometry)?;
        }
        let element = &mut tables.elements[index].1;
        patch.apply_to(element);
        Ok(element.clone())
    }

    pub async fn delete_element(&self, user: &UserId, id: &ElementId) -> ApiResult<()> {
        let mut tables = self.tables.write().await;
        let index = tables.accessible_element(user, id)?;
        let (drawing, _) = tables.elements.remove(index);
        if let Some(record) = tables.touch_drawing(&drawing) {
            record.elements.retain(|e| e != id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floorplan_core::Geometry;
    use floorplan_core::element::Polyline;
    use kurbo::Point;

    fn owner() -> UserId {
        UserId::from("owner")
    }

    fn wall(x: f64) -> NewElement {
        NewElement::from(&Element::new(
            ElementId::placeholder(),
            Geometry::Wall(Polyline::new(vec![Point::ZERO, Point::new(x, 0.0)])),
        ))
    }

    async fn setup() -> (Database, ProjectId, DrawingId) {
        let db = Database::new();
        let project = db
            .create_project(
                &owner(),
                NewProject {
                    title: "House".to_string(),
                    ..NewProject::default()
                },
            )
            .await
            .unwrap();
        let drawing = db
            .create_drawing(
                &owner(),
                &project.id,
                NewDrawing {
                    title: "Ground floor".to_string(),
                    ..NewDrawing::default()
                },
            )
            .await
            .unwrap();
        (db, project.id, drawing.id)
    }

    #[tokio::test]
    async fn test_title_required() {
        let db = Database::new();
        let result = db.create_project(&owner(), NewProject::default()).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_drawing_defaults_and_project_link() {
        let (db, project, drawing) = setup().await;
        let record = db.drawing(&owner(), &drawing).await.unwrap();
        assert_eq!(record.scale, 1.0);
        assert_eq!(record.view_box, ViewBox::default());
        assert_eq!(record.grid_settings.size, 50.0);
        assert!(record.grid_settings.snap);
        assert_eq!(db.project(&owner(), &project).await.unwrap().drawings, vec![drawing]);
    }

    #[tokio::test]
    async fn test_access_rules() {
        let (db, project, drawing) = setup().await;
        let guest = UserId::from("guest");

        assert!(matches!(db.drawing(&guest, &drawing).await, Err(ApiError::Unauthorized(_))));
        assert!(db.list_projects(&guest).await.is_empty());

        db.add_collaborator(&owner(), &project, guest.clone()).await.unwrap();
        assert_eq!(db.list_projects(&guest).await.len(), 1);
        assert!(db.create_element(&guest, &drawing, wall(10.0)).await.is_ok());

        // Collaborators edit content but not the project itself.
        assert!(matches!(
            db.delete_drawing(&guest, &drawing).await,
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            db.update_project(&guest, &project, ProjectUpdate::default()).await,
            Err(ApiError::Unauthorized(_))
        ));

        db.remove_collaborator(&owner(), &project, &guest).await.unwrap();
        assert!(matches!(db.list_elements(&guest, &drawing).await, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_collaborator_validation() {
        let (db, project, _) = setup().await;
        let result = db.add_collaborator(&owner(), &project, owner()).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));

        db.add_collaborator(&owner(), &project, UserId::from("ann")).await.unwrap();
        let again = db.add_collaborator(&owner(), &project, UserId::from("ann")).await;
        assert_eq!(again, Err(ApiError::Validation("User is already a collaborator".to_string())));
    }

    #[tokio::test]
    async fn test_element_crud() {
        let (db, _, drawing) = setup().await;
        let a = db.create_element(&owner(), &drawing, wall(10.0)).await.unwrap();
        let b = db.create_element(&owner(), &drawing, wall(20.0)).await.unwrap();
        assert!(!a.id.is_placeholder());

        let listed = db.list_elements(&owner(), &drawing).await.unwrap();
        assert_eq!(listed, vec![a.clone(), b.clone()]);

        let mut metadata = a.metadata.clone();
        metadata.layer = "structure".to_string();
        let patch = ElementPatch {
            metadata: Some(metadata),
            ..ElementPatch::default()
        };
        let updated = db.update_element(&owner(), &a.id, patch).await.unwrap();
        assert_eq!(updated.metadata.layer, "structure");
        assert_eq!(updated.geometry, a.geometry);

        db.delete_element(&owner(), &a.id).await.unwrap();
        assert_eq!(db.drawing(&owner(), &drawing).await.unwrap().elements, vec![b.id]);
        assert!(matches!(db.element(&owner(), &a.id).await, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_batch_replace() {
        let (db, _, drawing) = setup().await;
        let old = db.create_element(&owner(), &drawing, wall(10.0)).await.unwrap();

        let kept = BatchElement {
            id: Some(ElementId::from("kept")),
            element: wall(30.0),
        };
        let fresh = BatchElement {
            id: Some(ElementId::placeholder()),
            element: wall(40.0),
        };
        let replaced = db.replace_elements(&owner(), &drawing, vec![kept, fresh]).await.unwrap();

        assert_eq!(replaced[0].id.as_str(), "kept");
        assert!(!replaced[1].id.is_placeholder());
        assert_eq!(db.list_elements(&owner(), &drawing).await.unwrap(), replaced);
        assert!(db.element(&owner(), &old.id).await.is_err());
    }

    #[tokio::test]
    async fn test_batch_rejects_repeated_or_foreign_ids() {
        let (db, project, drawing) = setup().await;
        let other = db
            .create_drawing(
                &owner(),
                &project,
                NewDrawing {
                    title: "First floor".to_string(),
                    ..NewDrawing::default()
                },
            )
            .await
            .unwrap();
        let foreign = db.create_element(&owner(), &other.id, wall(10.0)).await.unwrap();
        let mine = db.create_element(&owner(), &drawing, wall(20.0)).await.unwrap();

        let entry = |id: &ElementId| BatchElement {
            id: Some(id.clone()),
            element: wall(30.0),
        };
        let stolen = db.replace_elements(&owner(), &drawing, vec![entry(&foreign.id)]).await;
        assert!(matches!(stolen, Err(ApiError::Validation(_))));
        let repeated = db
            .replace_elements(&owner(), &drawing, vec![entry(&mine.id), entry(&mine.id)])
            .await;
        assert!(matches!(repeated, Err(ApiError::Validation(_))));

        // Nothing changed on either drawing.
        assert_eq!(db.list_elements(&owner(), &drawing).await.unwrap(), vec![mine.clone()]);
        assert_eq!(db.element(&owner(), &foreign.id).await.unwrap(), foreign);

        // Keeping an element's own id is fine.
        let kept = db.replace_elements(&owner(), &drawing, vec![entry(&mine.id)]).await.unwrap();
        assert_eq!(kept[0].id, mine.id);
    }

    #[tokio::test]
    async fn test_polyline_kinds_need_points() {
        let (db, _, drawing) = setup().await;
        let empty: NewElement = serde_json::from_str(r#"{"type": "wall", "geometry": {"points": []}}"#).unwrap();

        let created = db.create_element(&owner(), &drawing, empty.clone()).await;
        assert!(matches!(created, Err(ApiError::Validation(_))));

        let batch = vec![BatchElement {
            id: None,
            element: empty.clone(),
        }];
        let replaced = db.replace_elements(&owner(), &drawing, batch).await;
        assert!(matches!(replaced, Err(ApiError::Validation(_))));

        let element = db.create_element(&owner(), &drawing, wall(10.0)).await.unwrap();
        let patch = ElementPatch {
            geometry: Some(empty.geometry),
            ..ElementPatch::default()
        };
        let updated = db.update_element(&owner(), &element.id, patch).await;
        assert!(matches!(updated, Err(ApiError::Validation(_))));
        assert_eq!(db.element(&owner(), &element.id).await.unwrap(), element);
    }

    #[tokio::test]
    async fn test_cascading_deletes() {
        let (db, project, drawing) = setup().await;
        let element = db.create_element(&owner(), &drawing, wall(10.0)).await.unwrap();
        db.delete_project(&owner(), &project).await.unwrap();

        assert!(matches!(db.drawing(&owner(), &drawing).await, Err(ApiError::NotFound(_))));
        assert!(matches!(db.element(&owner(), &element.id).await, Err(ApiError::NotFound(_))));
        assert!(db.list_projects(&owner()).await.is_empty());
    }

    #[tokio::test]
    async fn test_update_project_merges_metadata() {
        let (db, project, _) = setup().await;
        let first = ProjectUpdate {
            metadata: Some(ProjectMetadata {
                client: Some("ACME".to_string()),
                ..ProjectMetadata::default()
            }),
            ..ProjectUpdate::default()
        };
        db.update_project(&owner(), &project, first).await.unwrap();
        let second = ProjectUpdate {
            title: Some("Villa".to_string()),
            metadata: Some(ProjectMetadata {
                location: Some("Lisbon".to_string()),
                ..ProjectMetadata::default()
            }),
            ..ProjectUpdate::default()
        };
        let updated = db.update_project(&owner(), &project, second).await.unwrap();
        assert_eq!(updated.title, "Villa");
        assert_eq!(updated.metadata.client.as_deref(), Some("ACME"));
        assert_eq!(updated.metadata.location.as_deref(), Some("Lisbon"));
    }
}
