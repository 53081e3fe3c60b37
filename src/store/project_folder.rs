// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Galatea-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Galatea and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rayon::prelude::*;

use crate::model::{Project, ProjectId, ProjectPatch, UserId};

use super::{now_millis, ProjectStore, StoreError, WriteDurability};

const PROJECT_FILE_SUFFIX: &str = ".project.json";
const PROJECTS_DIR: &str = "projects";

/// Filesystem-backed project store: one `projects/<id>.project.json`
/// document per project under a root directory.
///
/// Project ids are serial (`p1`, `p2`, …), allocated as max-existing-plus-one
/// under the store lock. Writes go through a temp file and an atomic rename;
/// legacy documents are migrated structurally by the model deserializers the
/// moment they are read, and write back migrated.
#[derive(Debug)]
pub struct ProjectFolder {
    root: PathBuf,
    durability: WriteDurability,
    create_lock: Mutex<()>,
}

impl ProjectFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            durability: WriteDurability::default(),
            create_lock: Mutex::new(()),
        }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.root.join(PROJECTS_DIR)
    }

    pub fn project_path(&self, project_id: &ProjectId) -> PathBuf {
        self.projects_dir()
            .join(format!("{project_id}{PROJECT_FILE_SUFFIX}"))
    }

    fn load_project(&self, path: &Path) -> Result<Project, StoreError> {
        let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_project(&self, project: &Project) -> Result<(), StoreError> {
        let path = self.project_path(project.project_id());
        let mut contents = serde_json::to_vec_pretty(project).map_err(|source| {
            StoreError::Json {
                path: path.clone(),
                source,
            }
        })?;
        contents.push(b'\n');
        write_atomic(&path, &contents, self.durability)
    }

    fn project_file_ids(&self) -> Result<Vec<ProjectId>, StoreError> {
        let projects_dir = self.projects_dir();
        let entries = match fs::read_dir(&projects_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: projects_dir,
                    source,
                })
            }
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: projects_dir.clone(),
                source,
            })?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(stem) = file_name.strip_suffix(PROJECT_FILE_SUFFIX) else {
                continue;
            };
            let project_id =
                ProjectId::new(stem.to_owned()).map_err(|source| StoreError::InvalidId {
                    value: stem.to_owned(),
                    source,
                })?;
            ids.push(project_id);
        }
        Ok(ids)
    }

    fn next_project_id(&self) -> Result<ProjectId, StoreError> {
        let max_serial = self
            .project_file_ids()?
            .iter()
            .filter_map(|project_id| project_id.as_str().strip_prefix('p'))
            .filter_map(|digits| digits.parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        let value = format!("p{}", max_serial.saturating_add(1));
        ProjectId::new(value.clone()).map_err(|source| StoreError::InvalidId { value, source })
    }
}

impl ProjectStore for ProjectFolder {
    fn create(&self, name: &str, owner_id: Option<&UserId>) -> Result<Project, StoreError> {
        let _guard = self
            .create_lock
            .lock()
            .expect("project folder create lock poisoned");

        let project_id = self.next_project_id()?;
        let project = Project::new(project_id, name, owner_id.cloned(), now_millis());
        self.write_project(&project)?;
        Ok(project)
    }

    fn get(&self, project_id: &ProjectId) -> Result<Project, StoreError> {
        let path = self.project_path(project_id);
        if !path.is_file() {
            return Err(StoreError::ProjectNotFound {
                project_id: project_id.clone(),
            });
        }
        self.load_project(&path)
    }

    fn update(&self, project_id: &ProjectId, patch: ProjectPatch) -> Result<Project, StoreError> {
        let mut project = self.get(project_id)?;
        if let Some(name) = patch.name {
            project.set_name(name);
        }
        if let Some(canvas_state) = patch.canvas_state {
            project.set_canvas_state(canvas_state);
        }
        self.write_project(&project)?;
        Ok(project)
    }

    fn delete(&self, project_id: &ProjectId) -> Result<(), StoreError> {
        let path = self.project_path(project_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::ProjectNotFound {
                    project_id: project_id.clone(),
                })
            }
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn list(&self, owner_id: Option<&UserId>) -> Result<Vec<Project>, StoreError> {
        let paths = self
            .project_file_ids()?
            .into_iter()
            .map(|project_id| self.project_path(&project_id))
            .collect::<Vec<_>>();

        let mut projects = paths
            .par_iter()
            .map(|path| self.load_project(path))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(owner_id) = owner_id {
            projects.retain(|project| project.owner_id() == Some(owner_id));
        }
        projects.sort_by(|a, b| {
            a.created_at_ms()
                .cmp(&b.created_at_ms())
                .then_with(|| a.project_id().cmp(b.project_id()))
        });
        Ok(projects)
    }
}

fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
                ) =>
            {
                let _ = fs::remove_file(to);
                fs::rename(from, to)
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(not(windows))]
    {
        fs::rename(from, to)
    }
}

fn write_atomic(path: &Path, contents: &[u8], durability: WriteDurability) -> Result<(), StoreError> {
    let Some(parent) = path.parent() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no parent"),
        });
    };
    let Some(file_name) = path.file_name() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no file name"),
        });
    };

    fs::create_dir_all(parent).map_err(|source| StoreError::Io {
        path: parent.to_path_buf(),
        source,
    })?;

    match fs::symlink_metadata(path) {
        Ok(md) if md.file_type().is_symlink() => {
            return Err(StoreError::SymlinkRefused {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let tmp_path = parent.join(format!(
        ".galatea.tmp.{}.{}",
        file_name.to_string_lossy(),
        nanos
    ));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;

    file.write_all(contents).map_err(|source| StoreError::Io {
        path: tmp_path.clone(),
        source,
    })?;

    if durability == WriteDurability::Durable {
        file.sync_all().map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
    }
    drop(file);

    if let Err(source) = rename_overwrite(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        });
    }

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            let dir = fs::File::open(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
            dir.sync_all().map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
