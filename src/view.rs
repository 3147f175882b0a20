//! JSON-Schema-like rendering of an [`InferredSchema`].
//!
//! ```text
//! { "title": root_name, "root": <node>, "definitions": { name: <object> },
//!   "features": { .. }, "stringView": bool }
//! ```
//!
//! Objects are emitted once under `definitions` (registry order) and referenced
//! with `$ref` everywhere else.
use serde_json::{json, Map, Value};

use crate::inference::InferredSchema;
use crate::schema::{ObjectSchema, SchemaNode};

#[derive(Clone, Copy, Debug, Default)]
pub struct ViewOptions {
    /// Leave out members that were only ever seen as `null`.
    pub hide_null_only: bool,
}

pub fn render(schema: &InferredSchema) -> Value {
    render_with(schema, ViewOptions::default())
}

pub fn render_with(schema: &InferredSchema, options: ViewOptions) -> Value {
    let mut definitions = Map::new();
    for object in schema.registry.iter() {
        definitions.insert(object.name.to_string(), definition(object, options));
    }
    json!({
        "title": schema.root_name.as_str(),
        "root": node(&schema.root),
        "definitions": Value::Object(definitions),
        "features": schema.features,
        "stringView": schema.use_view,
    })
}

fn definition(object: &ObjectSchema, options: ViewOptions) -> Value {
    let mut props = Map::new();
    let mut required = Vec::new();
    for (name, member) in &object.members {
        if options.hide_null_only && member.is_null() {
            continue;
        }
        props.insert(name.to_string(), node(member));
        if !member.is_optional() {
            required.push(Value::from(name.as_str()));
        }
    }
    json!({
        "type": "object",
        "properties": Value::Object(props),
        "required": required,
    })
}

/// Schema of one slot, wrapped in `oneOf [.., null]` when optional.
pub fn node(n: &SchemaNode) -> Value {
    let inner = match n {
        SchemaNode::Null => return json!({ "type": "null" }),
        SchemaNode::Boolean { .. } => json!({ "type": "boolean" }),
        SchemaNode::Integer { .. } => json!({ "type": "integer" }),
        SchemaNode::Real { .. } => json!({ "type": "number" }),
        SchemaNode::String { .. } => json!({ "type": "string" }),
        SchemaNode::Array { element, .. } => json!({
            "type": "array",
            "items": node(element),
        }),
        SchemaNode::Object(obj) => json!({ "$ref": format!("#/definitions/{}", obj.name) }),
        SchemaNode::KeyValueMap { name, value, .. } => json!({
            "type": "object",
            "title": name.as_str(),
            "additionalProperties": node(value),
        }),
    };
    if n.is_optional() {
        json!({ "oneOf": [inner, { "type": "null" }] })
    } else {
        inner
    }
}

// ------------------------------- Tests ------------------------------------ //
