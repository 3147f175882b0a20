//! Schema builder.
//!
//! Walks parsed documents depth-first, turns every slot into a `SchemaNode`
//! and folds repeated observations together:
//! - array elements are left-folded into one element schema;
//! - objects are named from their slot (`<hint>_t`) and merged into the
//!   run's [`Registry`] by name, so same-named objects anywhere in the input
//!   end up as one declaration;
//! - objects on a configured kv path become key/value maps with one value
//!   schema;
//! - the roots of successive documents are unified, so several samples give
//!   one schema.
//!
//! One `Inference` is one run. Observing consumes the run and hands it back on
//! success; on error it is gone, so no half-merged registry survives.
pub mod registry;

use serde::Serialize;
use tracing::trace;

use crate::config::Config;
use crate::document::{self, JsonValue};
use crate::error::Result;
use crate::ident::Identifier;
use crate::schema::{ObjectSchema, SchemaNode, SchemaPath};
use crate::unify::Unifier;

pub use registry::Registry;

/// What the emitter needs to know up front (auxiliary declarations/imports).
/// Flags only ever go from `false` to `true`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Features {
    pub has_arrays: bool,
    pub has_integrals: bool,
    pub has_optionals: bool,
    pub has_strings: bool,
    pub has_kv: bool,
}

/// Result of a run, handed read-only to an emitter.
#[derive(Clone, Debug)]
pub struct InferredSchema {
    pub root_name: Identifier,
    pub root: SchemaNode,
    pub registry: Registry,
    pub features: Features,
    pub use_view: bool,
    pub documents: usize,
}

// ------------------------------- Front API -------------------------------- //

pub struct Inference {
    config: Config,
    unifier: Unifier,
    registry: Registry,
    features: Features,
    root: Option<SchemaNode>,
    documents: usize,
}

impl Inference {
    pub fn new(config: Config) -> Self {
        Self {
            unifier: Unifier::new(config.conflict_policy),
            config,
            registry: Registry::new(),
            features: Features::default(),
            root: None,
            documents: 0,
        }
    }

    pub fn config(&self) -> &Config { &self.config }
    pub fn registry(&self) -> &Registry { &self.registry }
    pub fn features(&self) -> Features { self.features }

    /// Parse one document and fold it into the run.
    pub fn observe_str(self, text: &str) -> Result<Self> {
        let value = document::parse(text)?;
        self.observe_value(&value)
    }

    /// Fold one document into the run. A top-level value that is not an object
    /// is wrapped as the single member of a synthetic root object.
    pub fn observe_value(mut self, value: &JsonValue<'_>) -> Result<Self> {
        let root_name = self.config.root_name.clone();
        let mut path = SchemaPath::new();
        let node = match value {
            JsonValue::Object(_) => self.infer(value, &root_name, &mut path)?,
            _ => self.infer_members(&root_name, &mut path, vec![(root_name.clone(), value)])?,
        };
        self.root = Some(match self.root.take() {
            None => node,
            Some(prev) => self.unifier.unify(prev, node).map_err(|e| e.within(&root_name))?,
        });
        self.documents += 1;
        Ok(self)
    }

    pub fn finish(self) -> InferredSchema {
        InferredSchema {
            root_name: self.config.root_name,
            root: self.root.unwrap_or_default(),
            registry: self.registry,
            features: self.features,
            use_view: self.config.use_view,
            documents: self.documents,
        }
    }

    // ------------------------------ Builder ------------------------------- //

    /// Infer the schema of `value` found in slot `name_hint` under `path`.
    /// `path` is restored before returning.
    pub fn infer(&mut self, value: &JsonValue<'_>, name_hint: &Identifier, path: &mut SchemaPath) -> Result<SchemaNode> {
        trace!(%path, hint = %name_hint, kind = value.type_name(), "infer");
        let node = match value {
            JsonValue::Null => {
                self.features.has_optionals = true;
                SchemaNode::Null
            }
            JsonValue::Bool(_) => SchemaNode::boolean(),
            JsonValue::Integer(_) => {
                self.features.has_integrals = true;
                SchemaNode::integer()
            }
            JsonValue::Real(_) => SchemaNode::real(),
            JsonValue::String(_) => {
                self.features.has_strings = true;
                SchemaNode::string()
            }
            JsonValue::Array(items) => self.infer_array(items, name_hint, path)?,
            JsonValue::Object(members) => {
                let members = members.iter().map(|(k, v)| (self.config.sanitize(k), v)).collect();
                self.infer_members(name_hint, path, members)?
            }
        };
        Ok(node)
    }

    fn infer_array(&mut self, items: &[JsonValue<'_>], name_hint: &Identifier, path: &mut SchemaPath) -> Result<SchemaNode> {
        self.features.has_arrays = true;
        let element_hint = self.config.sanitize(&format!("{name_hint}_element"));
        let element = self.fold(items.iter(), &element_hint, path)?;
        Ok(SchemaNode::array(element))
    }

    /// Object-shaped input: key/value map on a configured path, else a named
    /// object merged into the registry.
    fn infer_members<'v, 'a: 'v>(
        &mut self,
        name_hint: &Identifier,
        path: &mut SchemaPath,
        members: Vec<(Identifier, &'v JsonValue<'a>)>,
    ) -> Result<SchemaNode> {
        path.push(name_hint.clone());
        let result = if self.config.path_matches(path) {
            self.infer_key_value(name_hint, path, members)
        } else {
            self.infer_object(name_hint, path, members)
        };
        path.pop();
        result
    }

    fn infer_key_value<'v, 'a: 'v>(
        &mut self,
        name_hint: &Identifier,
        path: &mut SchemaPath,
        members: Vec<(Identifier, &'v JsonValue<'a>)>,
    ) -> Result<SchemaNode> {
        self.features.has_kv = true;
        let value_hint = self.config.sanitize(&format!("{name_hint}_value"));
        let value = self.fold(members.into_iter().map(|(_, v)| v), &value_hint, path)?;
        Ok(SchemaNode::key_value(name_hint.clone(), value))
    }

    fn infer_object<'v, 'a: 'v>(
        &mut self,
        name_hint: &Identifier,
        path: &mut SchemaPath,
        members: Vec<(Identifier, &'v JsonValue<'a>)>,
    ) -> Result<SchemaNode> {
        let mut object = ObjectSchema::new(self.config.object_name(name_hint));
        for (member, value) in members {
            let node = self.infer(value, &member, path)?;
            match object.members.get_mut(&member) {
                // duplicate name in one JSON object (or two names sanitized alike)
                Some(slot) => {
                    let prev = std::mem::take(slot);
                    *slot = self.unifier.unify(prev, node).map_err(|e| e.within(&member).within_path(path))?;
                }
                None => {
                    object.members.insert(member, node);
                }
            }
        }
        let registered = self.registry
            .merge(object.clone(), &self.unifier)
            .map_err(|e| e.within_path(path))?;
        if registered.members.values().any(SchemaNode::is_optional) {
            self.features.has_optionals = true;
        }
        Ok(SchemaNode::Object(object))
    }

    /// Left fold of unify over `items`; `Null` when there are none.
    fn fold<'v, 'a: 'v>(
        &mut self,
        items: impl Iterator<Item = &'v JsonValue<'a>>,
        hint: &Identifier,
        path: &mut SchemaPath,
    ) -> Result<SchemaNode> {
        let mut acc: Option<SchemaNode> = None;
        for item in items {
            let node = self.infer(item, hint, path)?;
            acc = Some(match acc.take() {
                None => node,
                Some(prev) => self.unifier.unify(prev, node).map_err(|e| e.within(hint).within_path(path))?,
            });
        }
        let folded = acc.unwrap_or_default();
        if folded.carries_optional() {
            self.features.has_optionals = true;
        }
        Ok(folded)
    }
}

pub fn infer_from_str(text: &str, config: Config) -> Result<InferredSchema> {
    Ok(Inference::new(config).observe_str(text)?.finish())
}

pub fn infer_from_strs<'a, I>(documents: I, config: Config) -> Result<InferredSchema>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut run = Inference::new(config);
    for text in documents {
        run = run.observe_str(text)?;
    }
    Ok(run.finish())
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConflictPolicy;
    use crate::error::Error;
    use crate::ident::sanitize;
    use pretty_assertions::assert_eq;

    fn obj(name: &str, members: Vec<(&str, SchemaNode)>) -> SchemaNode {
        members
            .into_iter()
            .fold(ObjectSchema::new(sanitize(name)), |o, (k, v)| o.with_member(sanitize(k), v))
            .into()
    }

    /// Infer a bare value in slot `hint`, outside any document.
    fn infer_slot(text: &str, hint: &str, config: Config) -> (SchemaNode, Inference) {
        let value = document::parse(text).unwrap();
        let mut run = Inference::new(config);
        let node = run.infer(&value, &sanitize(hint), &mut SchemaPath::new()).unwrap();
        (node, run)
    }

    #[test]
    fn single_member_object() {
        let schema = infer_from_str(r#"{"a": 1}"#, Config::default()).unwrap();
        assert_eq!(schema.root, obj("root_object_t", vec![("a", SchemaNode::integer())]));
        assert_eq!(schema.registry.len(), 1);
        assert_eq!(schema.documents, 1);
    }

    #[test]
    fn array_elements_widen_integer_to_real() {
        let (node, run) = infer_slot(r#"[{"a":1},{"a":1.5}]"#, "items", Config::default());
        assert_eq!(node, SchemaNode::array(obj("items_element_t", vec![("a", SchemaNode::real())])));
        assert_eq!(
            run.registry().get("items_element_t").and_then(|o| o.member("a")),
            Some(&SchemaNode::real())
        );
    }

    #[test]
    fn array_elements_with_disjoint_members() {
        let (node, _) = infer_slot(r#"[{"a":1},{"b":2}]"#, "items", Config::default());
        assert_eq!(
            node,
            SchemaNode::array(obj(
                "items_element_t",
                vec![("a", SchemaNode::integer().optional()), ("b", SchemaNode::integer().optional())]
            ))
        );
    }

    #[test]
    fn null_then_string_across_documents() {
        let schema = infer_from_strs([r#"{"a": null}"#, r#"{"a": "x"}"#], Config::default()).unwrap();
        let root = schema.registry.get("root_object_t").unwrap();
        assert_eq!(root.member("a"), Some(&SchemaNode::string().optional()));
        assert_eq!(schema.root.as_object().and_then(|o| o.member("a")), Some(&SchemaNode::string().optional()));
        assert_eq!(schema.documents, 2);
    }

    #[test]
    fn empty_array_has_null_element() {
        let (node, run) = infer_slot("[]", "xs", Config::default());
        assert_eq!(node, SchemaNode::array(SchemaNode::Null));
        assert!(run.features().has_arrays);
        assert!(run.features().has_optionals);
    }

    #[test]
    fn same_named_objects_at_different_paths_share_a_declaration() {
        let text = r#"{
            "home": { "address": { "street": "a", "zip": 1 } },
            "work": { "address": { "street": "b", "floor": 3 } }
        }"#;
        let schema = infer_from_str(text, Config::default()).unwrap();
        let names: Vec<&str> = schema.registry.names().map(|n| n.as_str()).collect();
        assert_eq!(names, ["address_t", "home_t", "work_t", "root_object_t"]);
        let address = schema.registry.get("address_t").unwrap();
        assert_eq!(address.member("street"), Some(&SchemaNode::string()));
        assert_eq!(address.member("zip"), Some(&SchemaNode::integer().optional()));
        assert_eq!(address.member("floor"), Some(&SchemaNode::integer().optional()));
    }

    #[test]
    fn member_names_are_sanitized() {
        let schema = infer_from_str(r#"{"class": true, "2x": 1, "a-b": "s"}"#, Config::default()).unwrap();
        let root = schema.root.as_object().unwrap();
        let names: Vec<&str> = root.members.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, ["_jsonclass", "_json2x", "a0x2db"]);
    }

    #[test]
    fn duplicate_member_names_are_unified() {
        let schema = infer_from_str(r#"{"a": 1, "a": 2.5}"#, Config::default()).unwrap();
        assert_eq!(schema.root, obj("root_object_t", vec![("a", SchemaNode::real())]));
    }

    #[test]
    fn scalar_documents_are_wrapped() {
        let schema = infer_from_str("[1, 2, 3]", Config::default()).unwrap();
        assert_eq!(
            schema.root,
            obj("root_object_t", vec![("root_object", SchemaNode::array(SchemaNode::integer()))])
        );
    }

    #[test]
    fn key_value_paths() {
        let config = Config::default().with_kv_path("users");
        let text = r#"{
            "users": {
                "u1": { "name": "ann", "age": 31 },
                "u2": { "name": "bob" }
            }
        }"#;
        let schema = infer_from_str(text, config).unwrap();
        let root = schema.root.as_object().unwrap();
        assert_eq!(
            root.member("users"),
            Some(&SchemaNode::key_value(
                sanitize("users"),
                obj("users_value_t", vec![("name", SchemaNode::string()), ("age", SchemaNode::integer().optional())])
            ))
        );
        assert!(schema.features.has_kv);
        // the map itself is not a registered object, its values are
        assert!(!schema.registry.contains("users_t"));
        assert!(schema.registry.contains("users_value_t"));
    }

    #[test]
    fn empty_key_value_map_has_null_values() {
        let config = Config::default().with_kv_path("m");
        let schema = infer_from_str(r#"{"m": {}}"#, config).unwrap();
        let root = schema.root.as_object().unwrap();
        assert_eq!(root.member("m"), Some(&SchemaNode::key_value(sanitize("m"), SchemaNode::Null)));
    }

    #[test]
    fn kv_paths_name_array_elements_by_their_hint() {
        // arrays add no path segment of their own, their elements do
        let config = Config::default().with_kv_path("rows_element.cells");
        let text = r#"{"rows": [ {"cells": {"A1": 1, "B1": 2.5}} ]}"#;
        let schema = infer_from_str(text, config).unwrap();
        let row = schema.registry.get("rows_element_t").unwrap();
        assert_eq!(row.member("cells"), Some(&SchemaNode::key_value(sanitize("cells"), SchemaNode::real())));
    }

    #[test]
    fn features_follow_what_was_seen() {
        let schema = infer_from_str(r#"{"b": true, "r": 1.5}"#, Config::default()).unwrap();
        assert_eq!(schema.features, Features::default());

        let schema = infer_from_strs([r#"{"s": "x", "n": 1}"#, r#"{"xs": [1]}"#], Config::default()).unwrap();
        assert_eq!(
            schema.features,
            Features { has_arrays: true, has_integrals: true, has_optionals: true, has_strings: true, has_kv: false }
        );
    }

    #[test]
    fn strict_conflicts_report_the_document_path() {
        let config = Config::default().with_conflict_policy(ConflictPolicy::Strict);
        let err = infer_from_str(r#"{"list": [{"v": "x"}, {"v": true}]}"#, config).unwrap_err();
        assert_eq!(
            err.path().map(ToString::to_string).as_deref(),
            Some("root_object.list_element.v")
        );
    }

    #[test]
    fn strict_conflicts_between_array_elements() {
        let config = Config::default().with_conflict_policy(ConflictPolicy::Strict);
        let err = infer_from_str(r#"{"xs": [1, "a"]}"#, config).unwrap_err();
        assert!(matches!(err, Error::SchemaConflict { .. }));
        assert_eq!(err.path().unwrap().to_string(), "root_object.xs_element");
    }

    #[test]
    fn lenient_conflicts_keep_the_first_shape() {
        let schema = infer_from_str(r#"{"xs": ["a", 1, null]}"#, Config::default()).unwrap();
        let root = schema.root.as_object().unwrap();
        assert_eq!(root.member("xs"), Some(&SchemaNode::array(SchemaNode::string().optional())));
    }

    #[test]
    fn object_meeting_kv_map_under_one_name_is_an_invariant_violation() {
        // `a_t.x` is a map under `p` but a plain object under `q`
        let config = Config::default().with_kv_path("p.a.x");
        let text = r#"{"p": {"a": {"x": {"k": 1}}}, "q": {"a": {"x": {"k": 1}}}}"#;
        let err = infer_from_str(text, config).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation { .. }), "{err}");
        assert_eq!(err.path().unwrap().to_string(), "root_object.q.a.x");
    }

    #[test]
    fn parse_errors_surface_unchanged() {
        let err = infer_from_str(r#"{"a": }"#, Config::default()).unwrap_err();
        match err {
            Error::Parse(e) => assert_eq!(e.offset, 6),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn deepest_accepted_documents_fit_a_spawned_thread_stack() {
        use crate::document::MAX_DEPTH;

        let objects = format!(
            "{}1{}",
            (0..MAX_DEPTH).map(|i| format!("{{\"k{i}\":")).collect::<String>(),
            "}".repeat(MAX_DEPTH)
        );
        let arrays = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));

        // default spawn stack, not the main thread's
        let handle = std::thread::spawn(move || {
            let strict = Config::default().with_conflict_policy(ConflictPolicy::Strict);
            let deep = infer_from_strs([objects.as_str(), objects.as_str()], strict).map(|s| s.registry.len());
            let wrapped = infer_from_str(&arrays, Config::default()).map(|s| s.documents);
            (deep, wrapped)
        });
        let (deep, wrapped) = handle.join().expect("inference thread overflowed its stack");
        assert_eq!(deep.unwrap(), MAX_DEPTH);
        assert_eq!(wrapped.unwrap(), 1);
    }

    #[test]
    fn no_documents_means_null_root() {
        let schema = Inference::new(Config::default()).finish();
        assert_eq!(schema.root, SchemaNode::Null);
        assert!(schema.registry.is_empty());
    }
}
