// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Galatea-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Galatea and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::model::{Project, ProjectId, ProjectPatch, UserId};

use super::{now_millis, ProjectStore, StoreError};

/// In-memory project store for embedding and tests.
///
/// Counts canvas writes so debounce behavior can be asserted exactly.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    projects: BTreeMap<ProjectId, Project>,
    next_serial: u64,
    canvas_puts: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of canvas-document writes seen so far.
    pub fn canvas_put_count(&self) -> u64 {
        self.inner
            .lock()
            .expect("memory store lock poisoned")
            .canvas_puts
    }
}

impl ProjectStore for MemoryStore {
    fn create(&self, name: &str, owner_id: Option<&UserId>) -> Result<Project, StoreError> {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        inner.next_serial += 1;
        let value = format!("p{}", inner.next_serial);
        let project_id =
            ProjectId::new(value.clone()).map_err(|source| StoreError::InvalidId {
                value,
                source,
            })?;
        let project = Project::new(project_id.clone(), name, owner_id.cloned(), now_millis());
        inner.projects.insert(project_id, project.clone());
        Ok(project)
    }

    fn get(&self, project_id: &ProjectId) -> Result<Project, StoreError> {
        let inner = self.inner.lock().expect("memory store lock poisoned");
        inner
            .projects
            .get(project_id)
            .cloned()
            .ok_or_else(|| StoreError::ProjectNotFound {
                project_id: project_id.clone(),
            })
    }

    fn update(&self, project_id: &ProjectId, patch: ProjectPatch) -> Result<Project, StoreError> {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        let wrote_canvas = patch.canvas_state.is_some();
        let project =
            inner
                .projects
                .get_mut(project_id)
                .ok_or_else(|| StoreError::ProjectNotFound {
                    project_id: project_id.clone(),
                })?;
        if let Some(name) = patch.name {
            project.set_name(name);
        }
        if let Some(canvas_state) = patch.canvas_state {
            project.set_canvas_state(canvas_state);
        }
        let project = project.clone();
        if wrote_canvas {
            inner.canvas_puts += 1;
        }
        Ok(project)
    }

    fn delete(&self, project_id: &ProjectId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        inner
            .projects
            .remove(project_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::ProjectNotFound {
                project_id: project_id.clone(),
            })
    }

    fn list(&self, owner_id: Option<&UserId>) -> Result<Vec<Project>, StoreError> {
        let inner = self.inner.lock().expect("memory store lock poisoned");
        let mut projects = inner
            .projects
            .values()
            .filter(|project| match owner_id {
                Some(owner_id) => project.owner_id() == Some(owner_id),
                None => true,
            })
            .cloned()
            .collect::<Vec<_>>();
        projects.sort_by(|a, b| {
            a.created_at_ms()
                .cmp(&b.created_at_ms())
                .then_with(|| a.project_id().cmp(b.project_id()))
        });
        Ok(projects)
    }
}
