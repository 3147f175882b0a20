//! Infer a typed schema from sample JSON documents.
//!
//! ```
//! use json_shape::{infer_from_str, Config, SchemaNode};
//!
//! let schema = infer_from_str(r#"{"id": 7, "name": null}"#, Config::default()).unwrap();
//! let root = schema.registry.get("root_object_t").unwrap();
//! assert_eq!(root.member("id"), Some(&SchemaNode::integer()));
//! assert!(schema.features.has_optionals);
//! ```
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod ident;
pub mod inference;
pub mod schema;
pub mod unify;
pub mod view;

pub use config::{ConflictPolicy, Config};
pub use document::{parse, JsonValue};
pub use error::{Error, ParseError, ParseErrorKind, Result};
pub use ident::{sanitize, sanitize_for, Dialect, Identifier};
pub use inference::{infer_from_str, infer_from_strs, Features, Inference, InferredSchema, Registry};
pub use schema::{Kind, ObjectSchema, SchemaNode, SchemaPath};
pub use unify::Unifier;
