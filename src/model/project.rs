// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Galatea-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Galatea and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::canvas::CanvasState;
use super::ids::{ProjectId, UserId};

/// A stored project record: exactly one canvas document plus identity.
///
/// The canvas is the unit of persistence and broadcast; every save replaces
/// the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    project_id: ProjectId,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner_id: Option<UserId>,
    created_at_ms: u64,
    #[serde(default)]
    canvas_state: CanvasState,
}

impl Project {
    pub fn new(
        project_id: ProjectId,
        name: impl Into<String>,
        owner_id: Option<UserId>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            project_id,
            name: name.into(),
            owner_id,
            created_at_ms,
            canvas_state: CanvasState::default(),
        }
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn owner_id(&self) -> Option<&UserId> {
        self.owner_id.as_ref()
    }

    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    pub fn canvas_state(&self) -> &CanvasState {
        &self.canvas_state
    }

    pub fn set_canvas_state(&mut self, canvas_state: CanvasState) {
        self.canvas_state = canvas_state;
    }

    pub fn into_canvas_state(self) -> CanvasState {
        self.canvas_state
    }
}

/// Partial project update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub canvas_state: Option<CanvasState>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.canvas_state.is_none()
    }
}
