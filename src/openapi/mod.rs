// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Galatea-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Galatea and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! One-way compiler from a canvas snapshot to an OpenAPI 3.0 document.
//!
//! Compilation is a pure function over the snapshot: no side effects, no
//! graph mutation, and byte-identical output for identical input (all maps
//! are `BTreeMap`s, so key order is sorted).

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{CanvasState, NodeData};

pub const OPENAPI_VERSION: &str = "3.0.0";

const DOCUMENT_TITLE: &str = "Generated API";
const DOCUMENT_VERSION: &str = "1.0.0";
const DEFAULT_SUMMARY: &str = "No summary";
const DEFAULT_MODEL_NAME: &str = "UnnamedModel";

/// Operations of one path, keyed by lowercase HTTP method.
pub type PathItem = BTreeMap<String, OperationObject>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: ApiInfo,
    pub paths: BTreeMap<String, PathItem>,
    pub components: Components,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OperationObject {
    pub summary: String,
    pub responses: BTreeMap<String, ResponseObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseObject {
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Components {
    pub schemas: BTreeMap<String, SchemaObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SchemaObject {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub property_type: String,
}

/// Projects a canvas snapshot into an OpenAPI document.
///
/// Endpoint nodes with an empty path are skipped. When two endpoint nodes
/// declare the identical `(path, method)` pair, the later node in array
/// order silently overwrites the earlier one.
pub fn compile(state: &CanvasState) -> OpenApiDocument {
    let mut document = OpenApiDocument {
        openapi: OPENAPI_VERSION.to_owned(),
        info: ApiInfo {
            title: DOCUMENT_TITLE.to_owned(),
            version: DOCUMENT_VERSION.to_owned(),
        },
        paths: BTreeMap::new(),
        components: Components::default(),
    };

    for node in &state.nodes {
        match node.data() {
            NodeData::Endpoint(endpoint) => {
                if endpoint.path.is_empty() {
                    continue;
                }
                let summary = endpoint
                    .summary
                    .as_deref()
                    .filter(|summary| !summary.is_empty())
                    .unwrap_or(DEFAULT_SUMMARY)
                    .to_owned();

                let mut responses = BTreeMap::new();
                responses.insert(
                    "200".to_owned(),
                    ResponseObject {
                        description: "OK".to_owned(),
                    },
                );

                document
                    .paths
                    .entry(endpoint.path.clone())
                    .or_default()
                    .insert(
                        endpoint.method.as_lower_str().to_owned(),
                        OperationObject { summary, responses },
                    );
            }
            NodeData::Model(model) => {
                let name = if model.label.is_empty() {
                    DEFAULT_MODEL_NAME.to_owned()
                } else {
                    model.label.clone()
                };

                let mut properties = BTreeMap::new();
                let mut required = Vec::new();
                for field in &model.fields {
                    if field.name.is_empty() {
                        continue;
                    }
                    let property_type = if field.field_type.is_empty() {
                        "string".to_owned()
                    } else {
                        field.field_type.clone()
                    };
                    properties.insert(field.name.clone(), PropertySchema { property_type });
                    if field.required {
                        required.push(field.name.clone());
                    }
                }

                document.components.schemas.insert(
                    name,
                    SchemaObject {
                        schema_type: "object".to_owned(),
                        properties,
                        required,
                    },
                );
            }
            NodeData::Service(_) | NodeData::Image(_) | NodeData::StickyNote(_) => {}
        }
    }

    document
}
