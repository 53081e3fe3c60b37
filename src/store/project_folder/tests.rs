// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Galatea-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Galatea and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rstest::{fixture, rstest};

use super::{ProjectFolder, ProjectStore, StoreError, WriteDurability};
use crate::model::{
    CanvasGraph, IdAllocator, NodeData, NodeKind, Position, ProjectId, ProjectPatch, UserId,
};

static TEMP_DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

struct TempDir {
    path: std::path::PathBuf,
}

impl TempDir {
    fn new(prefix: &str) -> Self {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        let counter = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut path = env::temp_dir();
        path.push(format!("galatea-{prefix}-{}-{nanos}-{counter}", std::process::id()));
        std::fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

struct ProjectFolderTestCtx {
    #[allow(dead_code)]
    tmp: TempDir,
    folder: ProjectFolder,
}

impl ProjectFolderTestCtx {
    fn new(prefix: &str) -> Self {
        let tmp = TempDir::new(prefix);
        let folder = ProjectFolder::new(tmp.path().join("store"));
        Self { tmp, folder }
    }
}

#[fixture]
fn ctx() -> ProjectFolderTestCtx {
    ProjectFolderTestCtx::new("project-folder")
}

#[rstest]
fn create_writes_a_document_and_get_round_trips(ctx: ProjectFolderTestCtx) {
    let folder = &ctx.folder;
    let project = folder.create("Checkout", None).expect("create");

    assert_eq!(project.project_id().as_str(), "p1");
    let path = folder.project_path(project.project_id());
    assert!(path.is_file());

    let loaded = folder.get(project.project_id()).expect("get");
    assert_eq!(loaded, project);
}

#[rstest]
fn serial_ids_continue_above_existing_documents(ctx: ProjectFolderTestCtx) {
    let folder = &ctx.folder;
    folder.create("One", None).expect("create");
    folder.create("Two", None).expect("create");
    let third = folder.create("Three", None).expect("create");
    assert_eq!(third.project_id().as_str(), "p3");

    // Deleting an earlier project must not let ids be reissued.
    folder
        .delete(&ProjectId::new("p1").expect("id"))
        .expect("delete");
    let fourth = folder.create("Four", None).expect("create");
    assert_eq!(fourth.project_id().as_str(), "p4");
}

#[rstest]
fn get_reports_missing_projects(ctx: ProjectFolderTestCtx) {
    let ghost = ProjectId::new("p404").expect("id");
    let err = ctx.folder.get(&ghost).unwrap_err();
    assert!(matches!(err, StoreError::ProjectNotFound { .. }));
}

#[rstest]
fn update_replaces_the_canvas_document_wholesale(ctx: ProjectFolderTestCtx) {
    let folder = &ctx.folder;
    let project = folder.create("Canvas", None).expect("create");

    let mut graph = CanvasGraph::new(IdAllocator::new("s").expect("allocator"));
    let a = graph.add_node(NodeKind::Service, Position::new(1.0, 2.0));
    let b = graph.add_node(NodeKind::Endpoint, Position::new(3.0, 4.0));
    graph.connect(a.id(), b.id()).expect("connect");

    folder
        .put_canvas(project.project_id(), &graph.snapshot())
        .expect("put");

    let loaded = folder.get(project.project_id()).expect("get");
    assert_eq!(loaded.canvas_state(), &graph.snapshot());
    assert_eq!(loaded.name(), "Canvas");

    let renamed = folder
        .update(
            project.project_id(),
            ProjectPatch {
                name: Some("Renamed".to_owned()),
                canvas_state: None,
            },
        )
        .expect("update");
    assert_eq!(renamed.name(), "Renamed");
    assert_eq!(renamed.canvas_state(), &graph.snapshot());
}

#[rstest]
fn legacy_model_field_strings_migrate_on_load_and_write_back_structured(
    ctx: ProjectFolderTestCtx,
) {
    let folder = &ctx.folder;
    let project_id = ProjectId::new("p9").expect("id");
    let path = folder.project_path(&project_id);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        r#"{
  "projectId": "p9",
  "name": "Legacy",
  "createdAtMs": 1700000000000,
  "canvasState": {
    "nodes": [
      {
        "id": "model-1695000000000",
        "type": "model",
        "data": { "label": "User", "fields": "id: string, name: string" },
        "position": { "x": 100.0, "y": 200.0 }
      }
    ],
    "edges": []
  }
}"#,
    )
    .unwrap();

    let loaded = folder.get(&project_id).expect("get");
    let node = &loaded.canvas_state().nodes[0];
    let NodeData::Model(model) = node.data() else {
        panic!("expected model data");
    };
    assert_eq!(model.fields.len(), 2);
    assert_eq!(model.fields[0].name, "id");
    assert_eq!(model.fields[1].name, "name");

    // The next save completes the migration on disk.
    folder
        .put_canvas(&project_id, loaded.canvas_state())
        .expect("put");
    let raw = std::fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(json["canvasState"]["nodes"][0]["data"]["fields"].is_array());
}

#[rstest]
fn delete_removes_the_document(ctx: ProjectFolderTestCtx) {
    let folder = &ctx.folder;
    let project = folder.create("Gone", None).expect("create");
    let path = folder.project_path(project.project_id());
    assert!(path.is_file());

    folder.delete(project.project_id()).expect("delete");
    assert!(!path.exists());

    let err = folder.delete(project.project_id()).unwrap_err();
    assert!(matches!(err, StoreError::ProjectNotFound { .. }));
}

#[rstest]
fn list_returns_projects_in_creation_order_and_filters_by_owner(ctx: ProjectFolderTestCtx) {
    let folder = &ctx.folder;
    let alice = UserId::new("u:alice").expect("id");
    folder.create("First", Some(&alice)).expect("create");
    folder.create("Second", None).expect("create");
    folder.create("Third", Some(&alice)).expect("create");

    // A stray file in the projects dir is ignored.
    std::fs::write(folder.projects_dir().join("notes.txt"), b"ignore me").unwrap();

    let all = folder.list(None).expect("list");
    assert_eq!(all.len(), 3);
    assert!(all
        .windows(2)
        .all(|pair| pair[0].created_at_ms() <= pair[1].created_at_ms()));

    let alices = folder.list(Some(&alice)).expect("list");
    assert_eq!(alices.len(), 2);
    assert_eq!(
        alices
            .iter()
            .map(|project| project.name().to_owned())
            .collect::<Vec<_>>(),
        vec!["First".to_owned(), "Third".to_owned()]
    );
}

#[rstest]
fn list_of_an_empty_store_is_empty(ctx: ProjectFolderTestCtx) {
    let projects = ctx.folder.list(None).expect("list");
    assert!(projects.is_empty());
}

#[rstest]
fn durable_mode_still_writes_documents(ctx: ProjectFolderTestCtx) {
    let durable = ProjectFolder::new(ctx.folder.root().to_path_buf())
        .with_durability(WriteDurability::Durable);
    let project = durable.create("Durable", None).expect("create");
    assert!(durable.project_path(project.project_id()).is_file());
    assert_eq!(durable.durability(), WriteDurability::Durable);
}

#[cfg(unix)]
#[rstest]
fn writes_through_symlinks_are_refused(ctx: ProjectFolderTestCtx) {
    let folder = &ctx.folder;
    let project = folder.create("Target", None).expect("create");
    let path = folder.project_path(project.project_id());

    let aside = path.with_extension("aside");
    std::fs::rename(&path, &aside).unwrap();
    std::os::unix::fs::symlink(&aside, &path).unwrap();

    let err = folder
        .put_canvas(project.project_id(), &crate::model::CanvasState::default())
        .unwrap_err();
    assert!(matches!(err, StoreError::SymlinkRefused { .. }));
}
