// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Galatea-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Galatea and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Mutation operations for the canvas graph.
//!
//! A batch applies atomically: ops run against a working copy and commit only
//! when every op succeeds, so a failing mutation is a no-op at the call site.
//! The result carries a minimal delta the UI can use to refresh derived
//! state.

use std::collections::HashSet;

use crate::model::{
    CanvasGraph, EdgeId, GraphError, NodeDataPatch, NodeId, NodeKind, Position,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    AddNode {
        kind: NodeKind,
        position: Position,
    },
    UpdateNodeData {
        node_id: NodeId,
        patch: NodeDataPatch,
    },
    MoveNode {
        node_id: NodeId,
        position: Position,
    },
    DeleteNode {
        node_id: NodeId,
    },
    Connect {
        source: NodeId,
        target: NodeId,
    },
    DeleteEdge {
        edge_id: EdgeId,
    },
}

/// A node or edge touched by a batch of ops.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GraphRef {
    Node(NodeId),
    Edge(EdgeId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplyResult {
    pub new_rev: u64,
    pub applied: usize,
    pub delta: Delta,
}

/// Minimal delta describing which objects changed as the result of applying
/// ops.
///
/// This is intentionally coarse: it reports only added/removed/updated refs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Delta {
    pub added: Vec<GraphRef>,
    pub removed: Vec<GraphRef>,
    pub updated: Vec<GraphRef>,
}

#[derive(Debug, Default)]
struct DeltaBuilder {
    added: HashSet<GraphRef>,
    removed: HashSet<GraphRef>,
    updated: HashSet<GraphRef>,
}

impl DeltaBuilder {
    fn record_added(&mut self, graph_ref: GraphRef) {
        self.removed.remove(&graph_ref);
        self.updated.remove(&graph_ref);
        self.added.insert(graph_ref);
    }

    fn record_removed(&mut self, graph_ref: GraphRef) {
        self.added.remove(&graph_ref);
        self.updated.remove(&graph_ref);
        self.removed.insert(graph_ref);
    }

    fn record_updated(&mut self, graph_ref: GraphRef) {
        if self.added.contains(&graph_ref) || self.removed.contains(&graph_ref) {
            return;
        }
        self.updated.insert(graph_ref);
    }

    fn finish(self) -> Delta {
        let mut added = self.added.into_iter().collect::<Vec<_>>();
        let mut removed = self.removed.into_iter().collect::<Vec<_>>();
        let mut updated = self.updated.into_iter().collect::<Vec<_>>();

        added.sort();
        removed.sort();
        updated.sort();

        Delta {
            added,
            removed,
            updated,
        }
    }
}

/// Applies ops in call order. Errors are synchronous: the first failing op
/// aborts the batch and the graph is left exactly as it was.
pub fn apply_ops(graph: &mut CanvasGraph, ops: &[Op]) -> Result<ApplyResult, GraphError> {
    if ops.is_empty() {
        return Ok(ApplyResult {
            new_rev: graph.rev(),
            applied: 0,
            delta: Delta::default(),
        });
    }

    let mut working = graph.clone();
    let mut delta = DeltaBuilder::default();

    for op in ops {
        apply_op(&mut working, op, &mut delta)?;
    }

    let new_rev = working.rev();
    *graph = working;

    Ok(ApplyResult {
        new_rev,
        applied: ops.len(),
        delta: delta.finish(),
    })
}

fn apply_op(graph: &mut CanvasGraph, op: &Op, delta: &mut DeltaBuilder) -> Result<(), GraphError> {
    match op {
        Op::AddNode { kind, position } => {
            let node = graph.add_node(*kind, *position);
            delta.record_added(GraphRef::Node(node.id().clone()));
        }
        Op::UpdateNodeData { node_id, patch } => {
            graph.update_node_data(node_id, patch.clone())?;
            delta.record_updated(GraphRef::Node(node_id.clone()));
        }
        Op::MoveNode { node_id, position } => {
            graph.move_node(node_id, *position)?;
            delta.record_updated(GraphRef::Node(node_id.clone()));
        }
        Op::DeleteNode { node_id } => {
            let cascaded = graph.delete_node(node_id)?;
            delta.record_removed(GraphRef::Node(node_id.clone()));
            for edge_id in cascaded {
                delta.record_removed(GraphRef::Edge(edge_id));
            }
        }
        Op::Connect { source, target } => {
            let edge = graph.connect(source, target)?;
            delta.record_added(GraphRef::Edge(edge.id().clone()));
        }
        Op::DeleteEdge { edge_id } => {
            graph.delete_edge(edge_id)?;
            delta.record_removed(GraphRef::Edge(edge_id.clone()));
        }
    }
    Ok(())
}
