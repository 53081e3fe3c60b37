// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Galatea-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Galatea and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::borrow::{Borrow, Cow};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smol_str::SmolStr;

/// A stable identifier used across the model, storage, and wire surfaces.
///
/// Ids double as file-name stems in the project folder store and as path
/// segments in the HTTP API, so they must be non-empty, slash-free, and
/// contain no whitespace. No particular format (UUID or otherwise) is
/// enforced beyond that; legacy documents carry ids this crate never minted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        validate_id_segment(&value)?;
        Ok(Self {
            value,
            _marker: PhantomData,
        })
    }

    /// Construction for values the allocator already proved valid.
    fn from_valid(value: String) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> AsRef<str> for Id<T> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<T> Borrow<str> for Id<T> {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl<T> FromStr for Id<T> {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

impl<T> TryFrom<String> for Id<T> {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::new(value).map_err(D::Error::custom)
    }
}

impl<T> JsonSchema for Id<T> {
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed("Id")
    }

    fn schema_id() -> Cow<'static, str> {
        Cow::Borrowed("galatea::model::ids::Id")
    }

    fn inline_schema() -> bool {
        true
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        String::json_schema(generator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    Empty,
    ContainsSlash,
    ContainsWhitespace,
    ReservedSeparator,
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("id must not be empty"),
            Self::ContainsSlash => f.write_str("id must not contain '/'"),
            Self::ContainsWhitespace => f.write_str("id must not contain whitespace"),
            Self::ReservedSeparator => f.write_str("tag must not contain ':' or '-'"),
        }
    }
}

impl std::error::Error for IdError {}

fn validate_id_segment(value: &str) -> Result<(), IdError> {
    if value.is_empty() {
        return Err(IdError::Empty);
    }
    if value.contains('/') {
        return Err(IdError::ContainsSlash);
    }
    if value.chars().any(char::is_whitespace) {
        return Err(IdError::ContainsWhitespace);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProjectIdTag {}
pub type ProjectId = Id<ProjectIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeIdTag {}
pub type NodeId = Id<NodeIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeIdTag {}
pub type EdgeId = Id<EdgeIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClientIdTag {}
pub type ClientId = Id<ClientIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UserIdTag {}
pub type UserId = Id<UserIdTag>;

/// Allocates node and edge ids as `<prefix>:<client-tag>-<counter>`.
///
/// The counter is monotonic per allocator and the tag identifies the minting
/// session, so concurrent sessions creating nodes rapidly cannot collide the
/// way wall-clock-derived ids can.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    tag: SmolStr,
    next: u64,
}

impl IdAllocator {
    pub fn new(tag: impl AsRef<str>) -> Result<Self, IdError> {
        let tag = tag.as_ref();
        validate_id_segment(tag)?;
        if tag.contains(':') || tag.contains('-') {
            return Err(IdError::ReservedSeparator);
        }
        Ok(Self {
            tag: SmolStr::new(tag),
            next: 0,
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn node_id(&mut self) -> NodeId {
        Id::from_valid(self.next_segment("n"))
    }

    pub fn edge_id(&mut self) -> EdgeId {
        Id::from_valid(self.next_segment("e"))
    }

    fn next_segment(&mut self, prefix: &str) -> String {
        let mut buf = itoa::Buffer::new();
        let counter = buf.format(self.next);
        self.next = self.next.saturating_add(1);

        let mut out = String::with_capacity(prefix.len() + self.tag.len() + counter.len() + 2);
        out.push_str(prefix);
        out.push(':');
        out.push_str(&self.tag);
        out.push('-');
        out.push_str(counter);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::{Id, IdAllocator, IdError};

    #[test]
    fn id_rejects_empty() {
        let result: Result<Id<()>, _> = Id::new("");
        assert_eq!(result, Err(IdError::Empty));
    }

    #[test]
    fn id_rejects_slash() {
        let result: Result<Id<()>, _> = Id::new("a/b");
        assert_eq!(result, Err(IdError::ContainsSlash));
    }

    #[test]
    fn id_rejects_whitespace() {
        let result: Result<Id<()>, _> = Id::new("a b");
        assert_eq!(result, Err(IdError::ContainsWhitespace));
    }

    #[test]
    fn id_round_trips_through_json() {
        let id: Id<()> = Id::new("n:c1-0").expect("id");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"n:c1-0\"");
        let back: Id<()> = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn id_deserialization_rejects_invalid_segments() {
        let result: Result<Id<()>, serde_json::Error> = serde_json::from_str("\"a/b\"");
        assert!(result.is_err());
    }

    #[test]
    fn allocator_mints_distinct_tagged_ids() {
        let mut ids = IdAllocator::new("c7").expect("allocator");
        let first = ids.node_id();
        let second = ids.node_id();
        let edge = ids.edge_id();

        assert_eq!(first.as_str(), "n:c7-0");
        assert_eq!(second.as_str(), "n:c7-1");
        assert_eq!(edge.as_str(), "e:c7-2");
        assert_ne!(first, second);
    }

    #[test]
    fn allocator_rejects_tags_with_separator_chars() {
        assert_eq!(IdAllocator::new("a:b").unwrap_err(), IdError::ReservedSeparator);
        assert_eq!(IdAllocator::new("a-b").unwrap_err(), IdError::ReservedSeparator);
        assert_eq!(IdAllocator::new("").unwrap_err(), IdError::Empty);
    }
}
