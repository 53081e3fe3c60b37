// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Galatea-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Galatea and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence contract and implementations.
//!
//! Writes are idempotent whole-document replacements: the last write arriving
//! at the store wins regardless of trigger order, which is what makes racing
//! autosaves from different sessions safe to leave unordered.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::model::{CanvasState, IdError, Project, ProjectId, ProjectPatch, UserId};

pub mod memory;
pub mod project_folder;

pub use memory::MemoryStore;
pub use project_folder::ProjectFolder;

/// The project record store the synchronizer and HTTP surface run against.
pub trait ProjectStore: Send + Sync {
    fn create(&self, name: &str, owner_id: Option<&UserId>) -> Result<Project, StoreError>;

    fn get(&self, project_id: &ProjectId) -> Result<Project, StoreError>;

    /// Partial update; the canvas, when present, replaces the stored
    /// document wholesale.
    fn update(&self, project_id: &ProjectId, patch: ProjectPatch) -> Result<Project, StoreError>;

    fn delete(&self, project_id: &ProjectId) -> Result<(), StoreError>;

    fn list(&self, owner_id: Option<&UserId>) -> Result<Vec<Project>, StoreError>;

    /// The synchronizer's save path: replace the stored canvas document.
    fn put_canvas(&self, project_id: &ProjectId, state: &CanvasState) -> Result<(), StoreError> {
        self.update(
            project_id,
            ProjectPatch {
                name: None,
                canvas_state: Some(state.clone()),
            },
        )
        .map(|_| ())
    }
}

#[derive(Debug)]
pub enum StoreError {
    ProjectNotFound {
        project_id: ProjectId,
    },
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidId {
        value: String,
        source: IdError,
    },
    SymlinkRefused {
        path: PathBuf,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ProjectNotFound { .. })
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProjectNotFound { project_id } => {
                write!(f, "project not found (id={project_id})")
            }
            Self::Io { path, source } => write!(f, "io error at {path:?}: {source}"),
            Self::Json { path, source } => write!(f, "json error at {path:?}: {source}"),
            Self::InvalidId { value, source } => {
                write!(f, "invalid project id {value:?}: {source}")
            }
            Self::SymlinkRefused { path } => {
                write!(f, "refusing to write through symlink at {path:?}")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::InvalidId { source, .. } => Some(source),
            Self::ProjectNotFound { .. } | Self::SymlinkRefused { .. } => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Fast, best-effort persistence.
    ///
    /// - Writes a temp file and renames atomically into place.
    /// - Does not perform per-file fsync/sync.
    #[default]
    BestEffort,

    /// Slower, best-effort durability.
    ///
    /// Attempts to flush written file contents and rename operations to
    /// stable storage where possible. Exact guarantees are
    /// platform/filesystem-dependent.
    Durable,
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
