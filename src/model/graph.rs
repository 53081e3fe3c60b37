// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Galatea-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Galatea and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;
use std::fmt;

use smallvec::SmallVec;

use super::canvas::{CanvasState, Edge, Node, Position};
use super::ids::{EdgeId, IdAllocator, NodeId};
use super::node_data::{
    validate_image_url, DataKindMismatch, ImageUrlError, NodeData, NodeDataPatch, NodeKind,
};

/// The authoritative client-side copy of one project's nodes and edges.
///
/// Local mutations and remote snapshots both land here: mutations go through
/// the typed operations below, remote frames through [`CanvasGraph::load`]
/// (wholesale overwrite, last-writer-wins). Every successful mutation bumps
/// `rev`, which the synchronizer uses for dirty tracking; `rev` is not a
/// cross-session version vector.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasGraph {
    state: CanvasState,
    selected_node_id: Option<NodeId>,
    ids: IdAllocator,
    rev: u64,
}

impl CanvasGraph {
    pub fn new(ids: IdAllocator) -> Self {
        Self {
            state: CanvasState::default(),
            selected_node_id: None,
            ids,
            rev: 0,
        }
    }

    pub fn state(&self) -> &CanvasState {
        &self.state
    }

    /// Read-only projection for persistence, broadcast, and compilation.
    pub fn snapshot(&self) -> CanvasState {
        self.state.clone()
    }

    pub fn rev(&self) -> u64 {
        self.rev
    }

    pub fn bump_rev(&mut self) {
        self.rev = self.rev.saturating_add(1);
    }

    pub fn selected_node_id(&self) -> Option<&NodeId> {
        self.selected_node_id.as_ref()
    }

    /// Selecting an id that is not present clears the selection instead.
    pub fn set_selected_node_id(&mut self, node_id: Option<NodeId>) {
        self.selected_node_id =
            node_id.filter(|node_id| self.state.contains_node(node_id));
    }

    pub fn node(&self, node_id: &NodeId) -> Option<&Node> {
        self.state.node(node_id)
    }

    /// Replaces the entire node/edge lists with a snapshot.
    ///
    /// Used on initial fetch and on receipt of a remote broadcast; there is
    /// no merge. Snapshots from older or buggy peers are sanitized so the
    /// graph invariant holds afterwards: nodes with duplicate ids are
    /// dropped (first occurrence wins) and edges with a missing endpoint are
    /// pruned. A selected node that no longer resolves is deselected.
    pub fn load(&mut self, snapshot: CanvasState) {
        let mut seen: BTreeSet<NodeId> = BTreeSet::new();
        let mut nodes = Vec::with_capacity(snapshot.nodes.len());
        for node in snapshot.nodes {
            if seen.insert(node.id().clone()) {
                nodes.push(node);
            }
        }

        let edges = snapshot
            .edges
            .into_iter()
            .filter(|edge| seen.contains(edge.source()) && seen.contains(edge.target()))
            .collect();

        self.state = CanvasState { nodes, edges };
        if let Some(selected) = self.selected_node_id.take() {
            if self.state.contains_node(&selected) {
                self.selected_node_id = Some(selected);
            }
        }
        self.bump_rev();
    }

    /// Places a new node with the default payload for its kind and returns
    /// a copy of it.
    pub fn add_node(&mut self, kind: NodeKind, position: Position) -> Node {
        let id = self.fresh_node_id();
        let node = Node::new(id, NodeData::default_for(kind), position);
        self.state.nodes.push(node.clone());
        self.bump_rev();
        node
    }

    /// Shallow-merges a partial payload into an existing node.
    pub fn update_node_data(
        &mut self,
        node_id: &NodeId,
        patch: NodeDataPatch,
    ) -> Result<(), GraphError> {
        if let NodeDataPatch::Image(image) = &patch {
            if let Some(url) = image.url.as_deref() {
                validate_image_url(url).map_err(GraphError::InvalidImageUrl)?;
            }
        }

        let Some(node) = self
            .state
            .nodes
            .iter_mut()
            .find(|node| node.id() == node_id)
        else {
            return Err(GraphError::NodeNotFound {
                node_id: node_id.clone(),
            });
        };

        node.data_mut()
            .apply_patch(patch)
            .map_err(GraphError::DataKindMismatch)?;
        self.bump_rev();
        Ok(())
    }

    /// Pure coordinate update.
    pub fn move_node(&mut self, node_id: &NodeId, position: Position) -> Result<(), GraphError> {
        let Some(node) = self
            .state
            .nodes
            .iter_mut()
            .find(|node| node.id() == node_id)
        else {
            return Err(GraphError::NodeNotFound {
                node_id: node_id.clone(),
            });
        };
        node.set_position(position);
        self.bump_rev();
        Ok(())
    }

    /// Removes a node, cascades deletion of every edge touching it, and
    /// clears the selection if it pointed at the node. Returns the ids of
    /// the cascaded edges.
    pub fn delete_node(&mut self, node_id: &NodeId) -> Result<Vec<EdgeId>, GraphError> {
        let before = self.state.nodes.len();
        self.state.nodes.retain(|node| node.id() != node_id);
        if self.state.nodes.len() == before {
            return Err(GraphError::NodeNotFound {
                node_id: node_id.clone(),
            });
        }

        let mut cascaded: SmallVec<[EdgeId; 4]> = SmallVec::new();
        self.state.edges.retain(|edge| {
            if edge.touches(node_id) {
                cascaded.push(edge.id().clone());
                false
            } else {
                true
            }
        });

        if self.selected_node_id.as_ref() == Some(node_id) {
            self.selected_node_id = None;
        }

        self.bump_rev();
        Ok(cascaded.into_vec())
    }

    /// Creates a directed edge between two existing nodes and returns a copy
    /// of it. Parallel duplicates are permitted.
    pub fn connect(&mut self, source: &NodeId, target: &NodeId) -> Result<Edge, GraphError> {
        for endpoint in [source, target] {
            if !self.state.contains_node(endpoint) {
                return Err(GraphError::InvalidReference {
                    node_id: endpoint.clone(),
                });
            }
        }

        let id = self.fresh_edge_id();
        let edge = Edge::new(id, source.clone(), target.clone());
        self.state.edges.push(edge.clone());
        self.bump_rev();
        Ok(edge)
    }

    pub fn delete_edge(&mut self, edge_id: &EdgeId) -> Result<(), GraphError> {
        let before = self.state.edges.len();
        self.state.edges.retain(|edge| edge.id() != edge_id);
        if self.state.edges.len() == before {
            return Err(GraphError::EdgeNotFound {
                edge_id: edge_id.clone(),
            });
        }
        self.bump_rev();
        Ok(())
    }

    // Loaded snapshots may contain ids another allocator minted; skip over
    // collisions instead of trusting the counter alone.
    fn fresh_node_id(&mut self) -> NodeId {
        loop {
            let id = self.ids.node_id();
            if !self.state.contains_node(&id) {
                return id;
            }
        }
    }

    fn fresh_edge_id(&mut self) -> EdgeId {
        loop {
            let id = self.ids.edge_id();
            if self.state.edge(&id).is_none() {
                return id;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    NodeNotFound { node_id: NodeId },
    EdgeNotFound { edge_id: EdgeId },
    InvalidReference { node_id: NodeId },
    DataKindMismatch(DataKindMismatch),
    InvalidImageUrl(ImageUrlError),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound { node_id } => write!(f, "node not found (id={node_id})"),
            Self::EdgeNotFound { edge_id } => write!(f, "edge not found (id={edge_id})"),
            Self::InvalidReference { node_id } => {
                write!(f, "edge endpoint references a missing node (id={node_id})")
            }
            Self::DataKindMismatch(mismatch) => mismatch.fmt(f),
            Self::InvalidImageUrl(err) => write!(f, "invalid image url: {err}"),
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DataKindMismatch(mismatch) => Some(mismatch),
            Self::InvalidImageUrl(err) => Some(err),
            _ => None,
        }
    }
}
