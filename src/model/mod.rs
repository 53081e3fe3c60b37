// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Galatea-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Galatea and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core model types: typed ids, the canvas document, variant node payloads,
//! the graph model, and project records.

pub mod canvas;
pub mod graph;
pub mod ids;
pub mod node_data;
pub mod project;

pub use canvas::{CanvasState, Edge, Node, Position};
pub use graph::{CanvasGraph, GraphError};
pub use ids::{
    ClientId, EdgeId, Id, IdAllocator, IdError, NodeId, ProjectId, UserId,
};
pub use node_data::{
    parse_legacy_fields, validate_image_url, DataKindMismatch, EndpointData, EndpointDataPatch,
    HttpMethod, ImageData, ImageDataPatch, ImageUrlError, ModelData, ModelDataPatch, ModelField,
    NodeData, NodeDataPatch, NodeKind, ServiceData, ServiceDataPatch, StickyNoteData,
    StickyNoteDataPatch,
};
pub use project::{Project, ProjectPatch};
