// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Galatea-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Galatea and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Deterministic canvas fixtures shared by the benches.

use galatea::model::{
    CanvasGraph, EndpointDataPatch, HttpMethod, IdAllocator, ModelDataPatch, ModelField,
    NodeDataPatch, NodeKind, Position,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Small,
    Medium,
    Large,
}

impl Case {
    pub fn node_count(self) -> usize {
        match self {
            Self::Small => 10,
            Self::Medium => 100,
            Self::Large => 1000,
        }
    }
}

const KINDS: [NodeKind; 5] = [
    NodeKind::Service,
    NodeKind::Endpoint,
    NodeKind::Model,
    NodeKind::Image,
    NodeKind::StickyNote,
];

const METHODS: [HttpMethod; 5] = [
    HttpMethod::GET,
    HttpMethod::POST,
    HttpMethod::PUT,
    HttpMethod::DELETE,
    HttpMethod::PATCH,
];

/// Builds a mixed-kind graph with `node_count` nodes and roughly half as
/// many edges, fully deterministic for stable bench identities.
pub fn graph(case: Case) -> CanvasGraph {
    let mut graph = CanvasGraph::new(IdAllocator::new("bench").expect("allocator"));
    let count = case.node_count();

    for idx in 0..count {
        let kind = KINDS[idx % KINDS.len()];
        let position = Position::new((idx % 40) as f64 * 80.0, (idx / 40) as f64 * 120.0);
        let node = graph.add_node(kind, position);

        match kind {
            NodeKind::Endpoint => {
                graph
                    .update_node_data(
                        node.id(),
                        NodeDataPatch::Endpoint(EndpointDataPatch {
                            method: Some(METHODS[(idx / KINDS.len()) % METHODS.len()]),
                            path: Some(format!("/api/resource{idx}")),
                            summary: Some(format!("Operation {idx}")),
                        }),
                    )
                    .expect("endpoint patch");
            }
            NodeKind::Model => {
                graph
                    .update_node_data(
                        node.id(),
                        NodeDataPatch::Model(ModelDataPatch {
                            label: Some(format!("Model{idx}")),
                            fields: Some(
                                (0..4)
                                    .map(|field_idx| ModelField {
                                        name: format!("field{field_idx}"),
                                        field_type: if field_idx % 2 == 0 {
                                            "string".to_owned()
                                        } else {
                                            "number".to_owned()
                                        },
                                        required: field_idx == 0,
                                    })
                                    .collect(),
                            ),
                        }),
                    )
                    .expect("model patch");
            }
            _ => {}
        }
    }

    let node_ids = graph
        .state()
        .nodes
        .iter()
        .map(|node| node.id().clone())
        .collect::<Vec<_>>();
    for idx in 0..count / 2 {
        let source = &node_ids[(idx * 3) % node_ids.len()];
        let target = &node_ids[(idx * 3 + 7) % node_ids.len()];
        if source != target {
            graph.connect(source, target).expect("connect");
        }
    }

    graph
}
