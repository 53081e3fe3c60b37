// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Galatea-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Galatea and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use memchr::memchr;
use schemars::JsonSchema;
use serde::de::{SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// The fixed category of a node, determining its payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Service,
    Endpoint,
    Model,
    Image,
    StickyNote,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service => f.write_str("service"),
            Self::Endpoint => f.write_str("endpoint"),
            Self::Model => f.write_str("model"),
            Self::Image => f.write_str("image"),
            Self::StickyNote => f.write_str("stickyNote"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
}

impl HttpMethod {
    /// OpenAPI path-item keys are lowercase.
    pub fn as_lower_str(&self) -> &'static str {
        match self {
            Self::GET => "get",
            Self::POST => "post",
            Self::PUT => "put",
            Self::DELETE => "delete",
            Self::PATCH => "patch",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GET => "GET",
            Self::POST => "POST",
            Self::PUT => "PUT",
            Self::DELETE => "DELETE",
            Self::PATCH => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ServiceData {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

/// Method + path is the endpoint's identity; there is no free-text label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EndpointData {
    pub method: HttpMethod,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ModelField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ModelData {
    pub label: String,
    #[serde(default, deserialize_with = "deserialize_model_fields")]
    pub fields: Vec<ModelField>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImageData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StickyNoteData {
    pub text: String,
}

/// Variant payload of a node, tagged by the node's `type`.
///
/// Serializes adjacently tagged so that a node document reads
/// `{"id", "type", "data", "position"}` — the persisted and broadcast wire
/// shape at the same time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum NodeData {
    Service(ServiceData),
    Endpoint(EndpointData),
    Model(ModelData),
    Image(ImageData),
    StickyNote(StickyNoteData),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Service(_) => NodeKind::Service,
            Self::Endpoint(_) => NodeKind::Endpoint,
            Self::Model(_) => NodeKind::Model,
            Self::Image(_) => NodeKind::Image,
            Self::StickyNote(_) => NodeKind::StickyNote,
        }
    }

    /// Default payload for a freshly placed node of the given kind.
    pub fn default_for(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Service => Self::Service(ServiceData {
                label: "New Service".to_owned(),
                description: None,
                metadata: None,
            }),
            NodeKind::Endpoint => Self::Endpoint(EndpointData {
                method: HttpMethod::GET,
                path: "/api/resource".to_owned(),
                summary: None,
            }),
            NodeKind::Model => Self::Model(ModelData {
                label: "New Model".to_owned(),
                fields: vec![ModelField {
                    name: "id".to_owned(),
                    field_type: "string".to_owned(),
                    required: false,
                }],
            }),
            NodeKind::Image => Self::Image(ImageData {
                label: None,
                url: String::new(),
                width: None,
                height: None,
            }),
            NodeKind::StickyNote => Self::StickyNote(StickyNoteData {
                text: "New Note".to_owned(),
            }),
        }
    }
}

/// Parses the legacy comma-separated model field shape, e.g.
/// `"id: string, name: string"`. Entries without a name are skipped and a
/// missing type defaults to `"string"`; the `required` flag did not exist in
/// that shape and comes out `false`.
pub fn parse_legacy_fields(raw: &str) -> Vec<ModelField> {
    let mut fields = Vec::new();
    for entry in raw.split(',') {
        let (name, field_type) = match memchr(b':', entry.as_bytes()) {
            Some(colon) => (&entry[..colon], entry[colon + 1..].trim()),
            None => (entry, ""),
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let field_type = if field_type.is_empty() {
            "string"
        } else {
            field_type
        };
        fields.push(ModelField {
            name: name.to_owned(),
            field_type: field_type.to_owned(),
            required: false,
        });
    }
    fields
}

/// Accepts both the structured field list and the legacy comma-separated
/// string. Legacy documents are migrated in place: the next save writes the
/// structured shape, so the string form never reaches the OpenAPI compiler.
fn deserialize_model_fields<'de, D>(deserializer: D) -> Result<Vec<ModelField>, D::Error>
where
    D: Deserializer<'de>,
{
    struct FieldsVisitor;

    impl<'de> Visitor<'de> for FieldsVisitor {
        type Value = Vec<ModelField>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a field list or a legacy comma-separated field string")
        }

        fn visit_str<E: serde::de::Error>(self, raw: &str) -> Result<Self::Value, E> {
            Ok(parse_legacy_fields(raw))
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut fields = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(field) = seq.next_element::<ModelField>()? {
                fields.push(field);
            }
            Ok(fields)
        }
    }

    deserializer.deserialize_any(FieldsVisitor)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDataPatch {
    pub label: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointDataPatch {
    pub method: Option<HttpMethod>,
    pub path: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelDataPatch {
    pub label: Option<String>,
    pub fields: Option<Vec<ModelField>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageDataPatch {
    pub label: Option<String>,
    pub url: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StickyNoteDataPatch {
    pub text: Option<String>,
}

/// Partial payload update, tagged like [`NodeData`]. Absent fields are left
/// unchanged; the patch variant must match the node's kind.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeDataPatch {
    Service(ServiceDataPatch),
    Endpoint(EndpointDataPatch),
    Model(ModelDataPatch),
    Image(ImageDataPatch),
    StickyNote(StickyNoteDataPatch),
}

impl NodeDataPatch {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Service(_) => NodeKind::Service,
            Self::Endpoint(_) => NodeKind::Endpoint,
            Self::Model(_) => NodeKind::Model,
            Self::Image(_) => NodeKind::Image,
            Self::StickyNote(_) => NodeKind::StickyNote,
        }
    }
}

/// A patch was applied to a node of a different kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataKindMismatch {
    expected: NodeKind,
    found: NodeKind,
}

impl DataKindMismatch {
    pub fn expected(&self) -> NodeKind {
        self.expected
    }

    pub fn found(&self) -> NodeKind {
        self.found
    }
}

impl fmt::Display for DataKindMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node data kind mismatch (expected {}, found {})",
            self.expected, self.found
        )
    }
}

impl std::error::Error for DataKindMismatch {}

impl NodeData {
    /// Shallow merge: present patch fields overwrite, absent fields are
    /// preserved.
    pub fn apply_patch(&mut self, patch: NodeDataPatch) -> Result<(), DataKindMismatch> {
        match (self, patch) {
            (Self::Service(data), NodeDataPatch::Service(patch)) => {
                if let Some(label) = patch.label {
                    data.label = label;
                }
                if let Some(description) = patch.description {
                    data.description = Some(description);
                }
                if let Some(metadata) = patch.metadata {
                    data.metadata = Some(metadata);
                }
                Ok(())
            }
            (Self::Endpoint(data), NodeDataPatch::Endpoint(patch)) => {
                if let Some(method) = patch.method {
                    data.method = method;
                }
                if let Some(path) = patch.path {
                    data.path = path;
                }
                if let Some(summary) = patch.summary {
                    data.summary = Some(summary);
                }
                Ok(())
            }
            (Self::Model(data), NodeDataPatch::Model(patch)) => {
                if let Some(label) = patch.label {
                    data.label = label;
                }
                if let Some(fields) = patch.fields {
                    data.fields = fields;
                }
                Ok(())
            }
            (Self::Image(data), NodeDataPatch::Image(patch)) => {
                if let Some(label) = patch.label {
                    data.label = Some(label);
                }
                if let Some(url) = patch.url {
                    data.url = url;
                }
                if let Some(width) = patch.width {
                    data.width = Some(width);
                }
                if let Some(height) = patch.height {
                    data.height = Some(height);
                }
                Ok(())
            }
            (Self::StickyNote(data), NodeDataPatch::StickyNote(patch)) => {
                if let Some(text) = patch.text {
                    data.text = text;
                }
                Ok(())
            }
            (data, patch) => Err(DataKindMismatch {
                expected: data.kind(),
                found: patch.kind(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageUrlError {
    Empty,
    MissingBase64Payload,
    InvalidBase64(String),
}

impl fmt::Display for ImageUrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("image url must not be empty"),
            Self::MissingBase64Payload => {
                f.write_str("data uri must carry a ';base64,' payload")
            }
            Self::InvalidBase64(reason) => write!(f, "invalid base64 payload: {reason}"),
        }
    }
}

impl std::error::Error for ImageUrlError {}

/// Image nodes reference either a plain url or a data uri produced by a
/// file-reader upload. Data uris must carry a decodable base64 payload;
/// everything else passes through untouched.
pub fn validate_image_url(url: &str) -> Result<(), ImageUrlError> {
    if url.is_empty() {
        return Err(ImageUrlError::Empty);
    }
    let Some(rest) = url.strip_prefix("data:") else {
        return Ok(());
    };
    let Some(marker) = rest.find(";base64,") else {
        return Err(ImageUrlError::MissingBase64Payload);
    };
    let payload = &rest[marker + ";base64,".len()..];
    STANDARD
        .decode(payload)
        .map(|_| ())
        .map_err(|err| ImageUrlError::InvalidBase64(err.to_string()))
}
