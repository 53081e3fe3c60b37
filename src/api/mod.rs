// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Galatea-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Galatea and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! HTTP surface: project CRUD, OpenAPI export, and the canvas socket relay.
//!
//! Authentication stays external — the only principal input is the opaque
//! `x-user-id` header, which gates nothing beyond ownership stamping and
//! list filtering.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::model::{
    validate_image_url, CanvasState, ClientId, IdError, NodeData, Project, ProjectId,
    ProjectPatch, UserId,
};
use crate::openapi::{self, OpenApiDocument};
use crate::realtime::{BroadcastHub, Subscription};
use crate::store::{ProjectStore, StoreError};

pub mod types;

pub use types::{
    ClientFrame, CreateProjectParams, ErrorBody, ListProjectsQuery, ProjectSummary, ServerFrame,
    UpdateProjectParams,
};

const USER_ID_HEADER: &str = "x-user-id";

/// Minimum `rapidfuzz` ratio (0..=100) for a name to match `?q=`.
const FUZZY_MATCH_THRESHOLD: f64 = 55.0;

pub struct AppState {
    store: Arc<dyn ProjectStore>,
    hub: BroadcastHub,
    next_client: AtomicU64,
}

impl AppState {
    pub fn new(store: Arc<dyn ProjectStore>, hub: BroadcastHub) -> Arc<Self> {
        Arc::new(Self {
            store,
            hub,
            next_client: AtomicU64::new(1),
        })
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    pub fn store(&self) -> &Arc<dyn ProjectStore> {
        &self.store
    }

    fn next_client_id(&self) -> ClientId {
        let serial = self.next_client.fetch_add(1, Ordering::Relaxed);
        ClientId::new(format!("c{serial}")).expect("static client id")
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/api/projects/{id}/openapi", get(get_openapi))
        .route("/api/ws", get(ws_upgrade))
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    Store(StoreError),
    InvalidId(IdError),
    BadRequest(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(err) => err.fmt(f),
            Self::InvalidId(err) => err.fmt(f),
            Self::BadRequest(message) => f.write_str(message),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Store(err) if err.is_not_found() => {
                (StatusCode::NOT_FOUND, "Project not found".to_owned())
            }
            Self::Store(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            Self::InvalidId(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
        };
        (status, Json(ErrorBody { message })).into_response()
    }
}

fn project_id_from_path(raw: String) -> Result<ProjectId, ApiError> {
    ProjectId::new(raw).map_err(ApiError::InvalidId)
}

fn owner_from_headers(headers: &HeaderMap) -> Result<Option<UserId>, ApiError> {
    let Some(value) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| ApiError::BadRequest(format!("invalid {USER_ID_HEADER} header")))?;
    UserId::new(raw.to_owned())
        .map(Some)
        .map_err(ApiError::InvalidId)
}

/// Fuzzy name filter for `?q=`, best matches first.
fn fuzzy_filter(projects: Vec<Project>, query: &str) -> Vec<Project> {
    let needle = query.to_lowercase();
    let mut scored = projects
        .into_iter()
        .filter_map(|project| {
            let haystack = project.name().to_lowercase();
            let ratio = rapidfuzz::fuzz::ratio(needle.chars(), haystack.chars());
            (ratio >= FUZZY_MATCH_THRESHOLD).then_some((ratio, project))
        })
        .collect::<Vec<_>>();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, project)| project).collect()
}

async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListProjectsQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<ProjectSummary>>, ApiError> {
    let owner = owner_from_headers(&headers)?;
    let mut projects = state.store.list(owner.as_ref())?;
    if let Some(q) = query.q.as_deref().filter(|q| !q.is_empty()) {
        projects = fuzzy_filter(projects, q);
    }
    Ok(Json(projects.iter().map(ProjectSummary::of).collect()))
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(params): Json<CreateProjectParams>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    if params.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_owned()));
    }
    let owner = owner_from_headers(&headers)?;
    let project = state.store.create(params.name.trim(), owner.as_ref())?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    let project_id = project_id_from_path(id)?;
    Ok(Json(state.store.get(&project_id)?))
}

async fn update_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(params): Json<UpdateProjectParams>,
) -> Result<Json<Project>, ApiError> {
    let project_id = project_id_from_path(id)?;

    if let Some(canvas_state) = &params.canvas_state {
        validate_canvas_images(canvas_state)?;
    }

    let project = state.store.update(
        &project_id,
        ProjectPatch {
            name: params.name,
            canvas_state: params.canvas_state,
        },
    )?;
    Ok(Json(project))
}

fn validate_canvas_images(state: &CanvasState) -> Result<(), ApiError> {
    for node in &state.nodes {
        if let NodeData::Image(image) = node.data() {
            // An empty url is a node still waiting for an asset.
            if image.url.is_empty() {
                continue;
            }
            validate_image_url(&image.url).map_err(|err| {
                ApiError::BadRequest(format!("invalid image url on node {}: {err}", node.id()))
            })?;
        }
    }
    Ok(())
}

async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let project_id = project_id_from_path(id)?;
    state.store.delete(&project_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_openapi(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OpenApiDocument>, ApiError> {
    let project_id = project_id_from_path(id)?;
    let project = state.store.get(&project_id)?;
    Ok(Json(openapi::compile(project.canvas_state())))
}

async fn ws_upgrade(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

/// The canvas relay: a socket joins a project's group, then every
/// `canvasUpdate` it sends is forwarded to the other members. Delivery is
/// best-effort; transport failures only end this socket's session.
async fn handle_socket(state: Arc<AppState>, mut socket: WebSocket) {
    let client_id = state.next_client_id();
    let mut subscription: Option<Subscription> = None;

    loop {
        tokio::select! {
            frame = recv_group_frame(&mut subscription) => {
                let Some(frame) = frame else {
                    break;
                };
                let outgoing = ServerFrame::CanvasUpdate {
                    project_id: frame.project_id,
                    state: frame.state,
                };
                let Ok(payload) = serde_json::to_string(&outgoing) else {
                    continue;
                };
                if socket
                    .send(Message::Text(Utf8Bytes::from(payload)))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            message = socket.recv() => {
                let Some(Ok(message)) = message else {
                    break;
                };
                match message {
                    Message::Text(text) => {
                        // Malformed frames are dropped; the relay never
                        // fails the session over them.
                        let Ok(frame) = serde_json::from_str::<ClientFrame>(text.as_str()) else {
                            continue;
                        };
                        match frame {
                            ClientFrame::Join { project_id } => {
                                subscription = Some(
                                    state.hub.join(client_id.clone(), project_id),
                                );
                            }
                            ClientFrame::CanvasUpdate { project_id, state: canvas } => {
                                state.hub.publish(&project_id, &client_id, &canvas);
                            }
                        }
                    }
                    Message::Close(_) => break,
                    Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {}
                }
            }
        }
    }
    // Dropping the subscription leaves the broadcast group.
}

async fn recv_group_frame(
    subscription: &mut Option<Subscription>,
) -> Option<crate::realtime::CanvasFrame> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}
