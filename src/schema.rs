//! Strongly-typed schema tree. No `JsonValue` here.
//!
//! A `SchemaNode` is what the builder infers for one slot of a document; slots
//! seen more than once get folded together by [`crate::unify`].
use std::fmt;

use indexmap::IndexMap;

use crate::ident::Identifier;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SchemaNode {
    /// Only ever observed as `null` (or an empty array slot). Implicitly optional.
    #[default]
    Null,
    Boolean { optional: bool },
    Integer { optional: bool },
    Real { optional: bool },
    String { optional: bool },
    Array {
        element: Box<SchemaNode>,   // fold of every observed element
        optional: bool,
    },
    Object(ObjectSchema),
    /// Object whose keys are data: one value schema for every entry.
    KeyValueMap {
        name: Identifier,
        value: Box<SchemaNode>,
        optional: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    pub name: Identifier,
    pub members: IndexMap<Identifier, SchemaNode>,   // insertion order
    pub optional: bool,
}

/// Variant tag without payload, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Boolean,
    Integer,
    Real,
    String,
    Array,
    Object,
    KeyValueMap,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Null => "null",
            Kind::Boolean => "boolean",
            Kind::Integer => "integer",
            Kind::Real => "real",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
            Kind::KeyValueMap => "key-value map",
        })
    }
}

impl SchemaNode {
    pub fn boolean() -> Self { SchemaNode::Boolean { optional: false } }
    pub fn integer() -> Self { SchemaNode::Integer { optional: false } }
    pub fn real() -> Self { SchemaNode::Real { optional: false } }
    pub fn string() -> Self { SchemaNode::String { optional: false } }

    pub fn array(element: SchemaNode) -> Self {
        SchemaNode::Array { element: Box::new(element), optional: false }
    }

    pub fn key_value(name: Identifier, value: SchemaNode) -> Self {
        SchemaNode::KeyValueMap { name, value: Box::new(value), optional: false }
    }

    pub fn kind(&self) -> Kind {
        match self {
            SchemaNode::Null => Kind::Null,
            SchemaNode::Boolean { .. } => Kind::Boolean,
            SchemaNode::Integer { .. } => Kind::Integer,
            SchemaNode::Real { .. } => Kind::Real,
            SchemaNode::String { .. } => Kind::String,
            SchemaNode::Array { .. } => Kind::Array,
            SchemaNode::Object(_) => Kind::Object,
            SchemaNode::KeyValueMap { .. } => Kind::KeyValueMap,
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, SchemaNode::Null) }

    pub fn is_optional(&self) -> bool {
        match self {
            SchemaNode::Null => true,
            SchemaNode::Boolean { optional }
            | SchemaNode::Integer { optional }
            | SchemaNode::Real { optional }
            | SchemaNode::String { optional }
            | SchemaNode::Array { optional, .. }
            | SchemaNode::KeyValueMap { optional, .. } => *optional,
            SchemaNode::Object(obj) => obj.optional,
        }
    }

    /// Set the optional flag. `Null` has no flag to set.
    pub fn set_optional(&mut self, value: bool) {
        match self {
            SchemaNode::Null => {}
            SchemaNode::Boolean { optional }
            | SchemaNode::Integer { optional }
            | SchemaNode::Real { optional }
            | SchemaNode::String { optional }
            | SchemaNode::Array { optional, .. }
            | SchemaNode::KeyValueMap { optional, .. } => *optional = value,
            SchemaNode::Object(obj) => obj.optional = value,
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.set_optional(true);
        self
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self {
            SchemaNode::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Whether this node, or one of its direct children, is optional.
    pub fn carries_optional(&self) -> bool {
        self.is_optional()
            || match self {
                SchemaNode::Array { element, .. } => element.is_optional(),
                SchemaNode::KeyValueMap { value, .. } => value.is_optional(),
                SchemaNode::Object(obj) => obj.members.values().any(SchemaNode::is_optional),
                _ => false,
            }
    }
}

impl ObjectSchema {
    pub fn new(name: Identifier) -> Self {
        Self { name, members: IndexMap::new(), optional: false }
    }

    #[must_use]
    pub fn with_member(mut self, name: Identifier, node: SchemaNode) -> Self {
        self.members.insert(name, node);
        self
    }

    pub fn member(&self, name: &str) -> Option<&SchemaNode> {
        self.members.get(name)
    }

    /// Members that are present and non-null in every sample seen so far.
    pub fn required_members(&self) -> impl Iterator<Item = &Identifier> {
        self.members.iter().filter(|(_, n)| !n.is_optional()).map(|(k, _)| k)
    }
}

impl From<ObjectSchema> for SchemaNode {
    fn from(obj: ObjectSchema) -> Self { SchemaNode::Object(obj) }
}

// ------------------------------- Paths ------------------------------------ //

/// Sequence of identifiers from the root object down to a slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SchemaPath(Vec<Identifier>);

impl SchemaPath {
    pub fn new() -> Self { Self::default() }

    pub fn root(name: Identifier) -> Self { Self(vec![name]) }

    pub fn push(&mut self, segment: Identifier) { self.0.push(segment); }

    pub fn pop(&mut self) -> Option<Identifier> { self.0.pop() }

    pub fn push_front(&mut self, segment: Identifier) { self.0.insert(0, segment); }

    pub fn segments(&self) -> &[Identifier] { &self.0 }
    pub fn iter(&self) -> std::slice::Iter<'_, Identifier> { self.0.iter() }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl FromIterator<Identifier> for SchemaPath {
    fn from_iter<I: IntoIterator<Item = Identifier>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 { f.write_str(".")?; }
            f.write_str(seg)?;
        }
        Ok(())
    }
}

// ------------------------------- Tests ------------------------------------ //
