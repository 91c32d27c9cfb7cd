//! HTTP routes.

use crate::db::{NewDrawing, NewProject, ProjectUpdate};
use crate::error::ApiResult;
use crate::identity::CurrentUser;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use floorplan_core::{
    Drawing, DrawingId, DrawingPatch, Element, ElementBatch, ElementId, ElementPatch, NewElement, Project, ProjectId,
    UserId,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

type Body<T> = Result<Json<T>, JsonRejection>;

#[derive(Debug, Deserialize)]
pub struct AddCollaborator {
    pub user: UserId,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/api/projects/{id}/collaborators", post(add_collaborator))
        .route(
            "/api/projects/{id}/collaborators/{user}",
            axum::routing::delete(remove_collaborator),
        )
        .route(
            "/api/drawings/project/{project_id}",
            get(list_drawings).post(create_drawing),
        )
        .route(
            "/api/drawings/{id}",
            get(get_drawing).put(update_drawing).delete(delete_drawing),
        )
        .route("/api/drawings/{id}/elements", get(list_elements))
        .route("/api/drawings/{id}/elements/batch", put(replace_elements))
        .route("/api/elements/drawing/{drawing_id}", post(create_element))
        .route(
            "/api/elements/{id}",
            get(get_element).put(update_element).delete(delete_element),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

fn removed(what: &str) -> Json<Value> {
    Json(json!({ "msg": format!("{what} removed") }))
}

// Projects

async fn list_projects(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Json<Vec<Project>> {
    Json(state.db.list_projects(&user).await)
}

async fn create_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Body<NewProject>,
) -> ApiResult<Json<Project>> {
    let Json(new) = body?;
    state.db.create_project(&user, new).await.map(Json)
}

async fn get_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<ProjectId>,
) -> ApiResult<Json<Project>> {
    state.db.project(&user, &id).await.map(Json)
}

async fn update_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<ProjectId>,
    body: Body<ProjectUpdate>,
) -> ApiResult<Json<Project>> {
    let Json(update) = body?;
    state.db.update_project(&user, &id, update).await.map(Json)
}

async fn delete_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<ProjectId>,
) -> ApiResult<Json<Value>> {
    state.db.delete_project(&user, &id).await?;
    Ok(removed("Project"))
}

async fn add_collaborator(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<ProjectId>,
    body: Body<AddCollaborator>,
) -> ApiResult<Json<Project>> {
    let Json(AddCollaborator { user: collaborator }) = body?;
    state.db.add_collaborator(&user, &id, collaborator).await.map(Json)
}

async fn remove_collaborator(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, collaborator)): Path<(ProjectId, UserId)>,
) -> ApiResult<Json<Project>> {
    state.db.remove_collaborator(&user, &id, &collaborator).await.map(Json)
}

// Drawings

async fn list_drawings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project): Path<ProjectId>,
) -> ApiResult<Json<Vec<Drawing>>> {
    state.db.list_drawings(&user, &project).await.map(Json)
}

async fn create_drawing(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project): Path<ProjectId>,
    body: Body<NewDrawing>,
) -> ApiResult<Json<Drawing>> {
    let Json(new) = body?;
    state.db.create_drawing(&user, &project, new).await.map(Json)
}

async fn get_drawing(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<DrawingId>,
) -> ApiResult<Json<Drawing>> {
    state.db.drawing(&user, &id).await.map(Json)
}

async fn update_drawing(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<DrawingId>,
    body: Body<DrawingPatch>,
) -> ApiResult<Json<Drawing>> {
    let Json(patch) = body?;
    state.db.update_drawing(&user, &id, patch).await.map(Json)
}

async fn delete_drawing(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<DrawingId>,
) -> ApiResult<Json<Value>> {
    state.db.delete_drawing(&user, &id).await?;
    Ok(removed("Drawing"))
}

// Elements

async fn list_elements(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(drawing): Path<DrawingId>,
) -> ApiResult<Json<Vec<Element>>> {
    state.db.list_elements(&user, &drawing).await.map(Json)
}

async fn replace_elements(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(drawing): Path<DrawingId>,
    body: Body<ElementBatch>,
) -> ApiResult<Json<Vec<Element>>> {
    let Json(batch) = body?;
    state.db.replace_elements(&user, &drawing, batch.elements).await.map(Json)
}

async fn create_element(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(drawing): Path<DrawingId>,
    body: Body<NewElement>,
) -> ApiResult<Json<Element>> {
    let Json(new) = body?;
    state.db.create_element(&user, &drawing, new).await.map(Json)
}

async fn get_element(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<ElementId>,
) -> ApiResult<Json<Element>> {
    state.db.element(&user, &id).await.map(Json)
}

async fn update_element(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<ElementId>,
    body: Body<ElementPatch>,
) -> ApiResult<Json<Element>> {
    let Json(patch) = body?;
    state.db.update_element(&user, &id, patch).await.map(Json)
}

async fn delete_element(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<ElementId>,
) -> ApiResult<Json<Value>> {
    state.db.delete_element(&user, &id).await?;
    Ok(removed("Element"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    fn state() -> AppState {
        AppState::new("x-user-id")
    }

    fn alice() -> CurrentUser {
        CurrentUser(UserId::from("alice"))
    }

    async fn project(state: &AppState) -> Project {
        let body = NewProject {
            title: "House".to_string(),
            ..NewProject::default()
        };
        let Json(project) = create_project(State(state.clone()), alice(), Ok(Json(body))).await.unwrap();
        project
    }

    #[test]
    fn test_router_builds() {
        let _ = router(state());
    }

    #[tokio::test]
    async fn test_empty_title_rejected() {
        let result = create_project(State(state()), alice(), Ok(Json(NewProject::default()))).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_element_payload_from_json() {
        let state = state();
        let project = project(&state).await;
        let body = NewDrawing {
            title: "Plan".to_string(),
            ..NewDrawing::default()
        };
        let Json(drawing) = create_drawing(State(state.clone()), alice(), Path(project.id), Ok(Json(body)))
            .await
            .unwrap();

        let new: NewElement = serde_json::from_str(
            r#"{"type": "wall", "geometry": {"points": [{"x": 0, "y": 0}, {"x": 100, "y": 0}]},
                "metadata": {"layer": "structure"}}"#,
        )
        .unwrap();
        let Json(element) = create_element(State(state.clone()), alice(), Path(drawing.id.clone()), Ok(Json(new)))
            .await
            .unwrap();
        assert_eq!(element.metadata.layer, "structure");

        let Json(elements) = list_elements(State(state.clone()), alice(), Path(drawing.id)).await.unwrap();
        assert_eq!(elements, vec![element]);
    }

    #[tokio::test]
    async fn test_delete_responds_with_msg() {
        let state = state();
        let project = project(&state).await;
        let Json(body) = delete_project(State(state.clone()), alice(), Path(project.id.clone()))
            .await
            .unwrap();
        assert_eq!(body, json!({ "msg": "Project removed" }));

        let missing = get_project(State(state), alice(), Path(project.id)).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_batch_body() {
        let batch: ElementBatch = serde_json::from_str(
            r#"{"elements": [{"id": "e1", "type": "door", "geometry": {"points": [{"x": 5, "y": 5}]}}]}"#,
        )
        .unwrap();
        assert_eq!(batch.elements[0].id, Some(ElementId::from("e1")));
        assert!(serde_json::from_str::<ElementBatch>(r#"{"items": []}"#).is_err());
    }
}
