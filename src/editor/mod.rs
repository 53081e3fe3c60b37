// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Galatea-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Galatea and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! One client's live editing session for one project.
//!
//! Local mutations fan out both ways after committing: immediately to the
//! broadcast group and, debounced, to the store. Remote frames overwrite the
//! local graph wholesale and are neither re-published nor re-saved — only
//! the mutating session persists, so N viewers never amplify one edit into
//! N writes.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::model::{
    CanvasGraph, CanvasState, ClientId, GraphError, IdAllocator, IdError, NodeId, ProjectId,
};
use crate::openapi::{self, OpenApiDocument};
use crate::ops::{apply_ops, ApplyResult, Op};
use crate::realtime::{BroadcastHub, PublishOutcome, Subscription};
use crate::store::{ProjectStore, StoreError};
use crate::sync::AutosaveManager;

#[derive(Debug)]
pub enum EditorError {
    Store(StoreError),
    Id(IdError),
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(err) => write!(f, "store error: {err}"),
            Self::Id(err) => write!(f, "id error: {err}"),
        }
    }
}

impl std::error::Error for EditorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Id(err) => Some(err),
        }
    }
}

impl From<StoreError> for EditorError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<IdError> for EditorError {
    fn from(err: IdError) -> Self {
        Self::Id(err)
    }
}

pub struct EditorSession {
    project_id: ProjectId,
    client_id: ClientId,
    graph: CanvasGraph,
    autosave: AutosaveManager,
    hub: BroadcastHub,
    subscription: Subscription,
}

impl EditorSession {
    /// Loads the persisted document, joins the project's broadcast group,
    /// and starts the autosave worker with the default debounce.
    pub fn open(
        store: Arc<dyn ProjectStore>,
        hub: BroadcastHub,
        client_id: ClientId,
        project_id: ProjectId,
    ) -> Result<Self, EditorError> {
        Self::open_with_debounce(store, hub, client_id, project_id, crate::sync::DEFAULT_DEBOUNCE)
    }

    pub fn open_with_debounce(
        store: Arc<dyn ProjectStore>,
        hub: BroadcastHub,
        client_id: ClientId,
        project_id: ProjectId,
        debounce: Duration,
    ) -> Result<Self, EditorError> {
        let project = store.get(&project_id)?;

        let ids = IdAllocator::new(allocator_tag(&client_id))?;
        let mut graph = CanvasGraph::new(ids);
        graph.load(project.into_canvas_state());

        let subscription = hub.join(client_id.clone(), project_id.clone());
        let autosave = AutosaveManager::with_debounce(store, debounce);

        Ok(Self {
            project_id,
            client_id,
            graph,
            autosave,
            hub,
            subscription,
        })
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn graph(&self) -> &CanvasGraph {
        &self.graph
    }

    pub fn snapshot(&self) -> CanvasState {
        self.graph.snapshot()
    }

    /// Applies a batch of local ops. On commit the snapshot goes out to the
    /// broadcast group right away and the debounce timer re-arms; a failing
    /// batch publishes and persists nothing. Broadcast and persistence can
    /// degrade independently of the local edit — the mutation error is the
    /// only error surfaced here.
    pub fn apply(&mut self, ops: &[Op]) -> Result<ApplyResult, GraphError> {
        let result = apply_ops(&mut self.graph, ops)?;
        if result.applied > 0 {
            self.hub
                .publish(&self.project_id, &self.client_id, self.graph.state());
            self.autosave
                .schedule(self.project_id.clone(), self.graph.snapshot());
        }
        Ok(result)
    }

    /// The explicit Save action: bypasses the debounce window.
    pub fn save_now(&self) {
        self.autosave
            .save_now(self.project_id.clone(), self.graph.snapshot());
    }

    /// Applies the most recent queued remote frame, if any. Remote state
    /// overwrites local state wholesale (last writer wins).
    pub fn sync_remote(&mut self) -> bool {
        let Some(frame) = self.subscription.latest() else {
            return false;
        };
        self.graph.load(frame.state);
        true
    }

    /// Awaits the next remote frame and applies it (draining to the most
    /// recent one first). Returns false when the membership is gone.
    pub async fn recv_remote(&mut self) -> bool {
        let Some(mut frame) = self.subscription.recv().await else {
            return false;
        };
        while let Some(newer) = self.subscription.try_recv() {
            frame = newer;
        }
        self.graph.load(frame.state);
        true
    }

    /// Republishes the current snapshot without mutating (a reconnect aid).
    pub fn republish(&self) -> PublishOutcome {
        self.hub
            .publish(&self.project_id, &self.client_id, self.graph.state())
    }

    pub fn select_node(&mut self, node_id: Option<NodeId>) {
        self.graph.set_selected_node_id(node_id);
    }

    pub fn selected_node_id(&self) -> Option<&NodeId> {
        self.graph.selected_node_id()
    }

    /// Derives the OpenAPI document from the current graph, independent of
    /// the save path.
    pub fn compile_openapi(&self) -> OpenApiDocument {
        openapi::compile(self.graph.state())
    }

    pub fn is_saving(&self) -> bool {
        self.autosave.is_saving()
    }

    pub fn is_dirty(&self) -> bool {
        self.autosave.is_dirty()
    }

    pub fn take_save_error(&self) -> Option<StoreError> {
        self.autosave.take_last_error()
    }

    /// Blocks until every scheduled save has landed (test and shutdown aid).
    pub fn flush_saves(&self) {
        self.autosave.flush();
    }
}

/// Client ids may contain separator characters the allocator reserves;
/// reduce them to an alphanumeric tag.
fn allocator_tag(client_id: &ClientId) -> String {
    let tag = client_id
        .as_str()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>();
    if tag.is_empty() {
        "s".to_owned()
    } else {
        tag
    }
}
