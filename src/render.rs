//! Cycle-safe rendering of schema graphs to plain JSON.
//!
//! Each node is expanded at the first location it is reached from. Every
//! later visit, including a node reaching itself, renders as a `$ref` back
//! to that first location.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::container::{JsonObject, Member};
use crate::pointer::Pointer;
use crate::schema::{SchemaId, SchemaNode, DRAFT_07};
use crate::uri::SchemaUri;

/// Render `root` at `base`.
///
/// An absolute `base` produces a top-level document carrying `$id` and
/// `$schema`; a *nothing* root then becomes `"not": true`. A relative
/// `base` renders the bare schema, so absolutes come out as booleans.
///
/// Every schema id reachable from `root` must index into `nodes`; arenas
/// check ids on the way in.
pub(crate) fn render(nodes: &[SchemaNode], root: SchemaId, base: &SchemaUri) -> Value {
    let mut renderer = Renderer::new(nodes, base);
    let pointer = base.pointer().unwrap_or_default();

    if base.is_relative() {
        return renderer.schema(root, &pointer);
    }

    let mut document = Map::new();
    document.insert("$id".to_string(), Value::String(base.to_string()));
    document.insert("$schema".to_string(), Value::String(DRAFT_07.to_string()));
    if nodes[root.index()].is_nothing() {
        document.insert("not".to_string(), Value::Bool(true));
    } else {
        document.extend(renderer.body(root, &pointer));
    }
    Value::Object(document)
}

struct Renderer<'a> {
    nodes: &'a [SchemaNode],
    base: &'a SchemaUri,
    visited: HashMap<SchemaId, SchemaUri>,
}

impl<'a> Renderer<'a> {
    fn new(nodes: &'a [SchemaNode], base: &'a SchemaUri) -> Self {
        Self {
            nodes,
            base,
            visited: HashMap::new(),
        }
    }

    fn location(&self, pointer: &Pointer) -> SchemaUri {
        self.base.with_pointer(pointer)
    }

    fn schema(&mut self, id: SchemaId, pointer: &Pointer) -> Value {
        let node = &self.nodes[id.index()];
        if node.is_nothing() {
            return Value::Bool(false);
        }
        if node.is_anything() {
            return Value::Bool(true);
        }
        if let Some(first) = self.visited.get(&id) {
            let here = self.location(&pointer.child("$ref"));
            let mut reference = Map::new();
            reference.insert("$ref".to_string(), Value::String(first.relative_to(&here)));
            return Value::Object(reference);
        }
        Value::Object(self.body(id, pointer))
    }

    fn body(&mut self, id: SchemaId, pointer: &Pointer) -> Map<String, Value> {
        let location = self.location(pointer);
        self.visited.insert(id, location);
        let nodes = self.nodes;
        self.object(&nodes[id.index()].body, pointer)
    }

    fn object(&mut self, object: &JsonObject, pointer: &Pointer) -> Map<String, Value> {
        object
            .iter()
            .map(|(key, member)| (key.clone(), self.member(member, &pointer.child(key.as_str()))))
            .collect()
    }

    fn member(&mut self, member: &Member, pointer: &Pointer) -> Value {
        match member {
            Member::Null => Value::Null,
            Member::Bool(b) => Value::Bool(*b),
            Member::Number(n) => Value::Number(n.clone()),
            Member::String(s) => Value::String(s.clone()),
            Member::Object(object) => Value::Object(self.object(object, pointer)),
            Member::Array(array) => Value::Array(
                array
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.member(item, &pointer.child(i.to_string())))
                    .collect(),
            ),
            Member::Schema(id) => self.schema(*id, pointer),
            Member::Uri(uri) => Value::String(uri.relative_to(&self.location(pointer))),
        }
    }
}
