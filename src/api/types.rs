// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Galatea-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Galatea and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{CanvasState, Project, ProjectId, UserId};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateProjectParams {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub canvas_state: Option<CanvasState>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListProjectsQuery {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub project_id: ProjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
    pub created_at_ms: u64,
    pub nodes: u64,
    pub edges: u64,
}

impl ProjectSummary {
    pub fn of(project: &Project) -> Self {
        Self {
            project_id: project.project_id().clone(),
            name: project.name().to_owned(),
            owner_id: project.owner_id().cloned(),
            created_at_ms: project.created_at_ms(),
            nodes: project.canvas_state().nodes.len() as u64,
            edges: project.canvas_state().edges.len() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
    pub message: String,
}

/// Frames a client sends over the canvas socket: first `join`, then
/// `canvasUpdate` on every local mutation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    #[serde(rename_all = "camelCase")]
    Join { project_id: ProjectId },
    #[serde(rename_all = "camelCase")]
    CanvasUpdate {
        project_id: ProjectId,
        state: CanvasState,
    },
}

/// Frames the relay pushes to the other members of the group.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerFrame {
    #[serde(rename_all = "camelCase")]
    CanvasUpdate {
        project_id: ProjectId,
        state: CanvasState,
    },
}
