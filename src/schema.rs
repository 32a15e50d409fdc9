//! Schema nodes, the arena that builds them, and the finished [`Schema`].
//!
//! Nodes live in a [`SchemaArena`] and point at each other through
//! [`SchemaId`]s, so a node can appear under several parents (or under
//! itself) without shared mutable references. [`SchemaArena::finish`]
//! freezes every node and hands back an immutable [`Schema`].

use std::sync::Arc;

use serde_json::Value;

use crate::container::{JsonObject, Member};
use crate::declare::SchemaMut;
use crate::error::SchemaError;
use crate::pointer::Pointer;
use crate::render;
use crate::uri::SchemaUri;

/// The draft-07 meta-schema URI, the only supported `$schema`.
pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

/// Every keyword a schema body may hold, in rendering order.
pub const PROPERTIES: &[&str] = &[
    "title",
    "description",
    "default",
    "readOnly",
    "writeOnly",
    "examples",
    "definitions",
    "const",
    "enum",
    "type",
    "format",
    "contentMediaType",
    "contentEncoding",
    "multipleOf",
    "maximum",
    "exclusiveMaximum",
    "minimum",
    "exclusiveMinimum",
    "maxLength",
    "minLength",
    "pattern",
    "additionalItems",
    "items",
    "maxItems",
    "minItems",
    "uniqueItems",
    "contains",
    "maxProperties",
    "minProperties",
    "properties",
    "patternProperties",
    "required",
    "additionalProperties",
    "dependencies",
    "propertyNames",
    "if",
    "then",
    "else",
    "allOf",
    "anyOf",
    "oneOf",
    "not",
];

/// Position of `key` in [`PROPERTIES`].
pub fn property_rank(key: &str) -> Option<usize> {
    PROPERTIES.iter().position(|p| *p == key)
}

/// Handle to a node in a [`SchemaArena`] (or in a finished [`Schema`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(usize);

impl SchemaId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// One JSON Schema.
///
/// A node is *anything* when it has no body and is not *nothing*; *nothing*
/// is tracked by a flag because an empty body alone means "anything".
#[derive(Debug, Clone, Default)]
pub struct SchemaNode {
    pub(crate) body: JsonObject,
    pub(crate) nothing: bool,
    pub(crate) id: Option<SchemaUri>,
    pub(crate) comment: Option<String>,
}

impl SchemaNode {
    pub fn body(&self) -> &JsonObject {
        &self.body
    }

    pub fn get(&self, key: &str) -> Option<&Member> {
        self.body.get(key)
    }

    pub fn is_nothing(&self) -> bool {
        self.nothing
    }

    pub fn is_anything(&self) -> bool {
        !self.nothing && self.body.is_empty()
    }

    pub fn is_ref(&self) -> bool {
        self.body.contains_key("$ref")
    }

    /// The URI this node refers to, if it is a reference.
    pub fn target(&self) -> Option<&SchemaUri> {
        match self.body.get("$ref") {
            Some(Member::Uri(uri)) => Some(uri),
            _ => None,
        }
    }

    /// The `$id` assigned to this node, if any.
    pub fn id(&self) -> Option<&SchemaUri> {
        self.id.as_ref()
    }

    /// The `$comment` assigned to this node, if any.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn is_frozen(&self) -> bool {
        self.body.is_frozen()
    }

    pub(crate) fn check_frozen(&self) -> Result<(), SchemaError> {
        if self.is_frozen() {
            Err(SchemaError::Frozen { what: "schema" })
        } else {
            Ok(())
        }
    }
}

/// Mutable storage for schema nodes under construction.
///
/// ```
/// use schema_forge::SchemaArena;
/// use serde_json::json;
///
/// # fn main() -> Result<(), schema_forge::SchemaError> {
/// let mut arena = SchemaArena::new();
/// let root = arena.schema().array()?.id();
/// arena.edit(root)?.items(root)?;
///
/// assert_eq!(arena.as_json(root)?, json!({"type": "array", "items": {"$ref": "#"}}));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaArena {
    nodes: Vec<SchemaNode>,
}

impl SchemaArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add an empty (anything) node.
    pub fn create(&mut self) -> SchemaId {
        self.nodes.push(SchemaNode::default());
        SchemaId(self.nodes.len() - 1)
    }

    /// Add an empty node and start declaring on it.
    pub fn schema(&mut self) -> SchemaMut<'_> {
        let id = self.create();
        SchemaMut::new(self, id)
    }

    /// Declare on an existing node.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::BadArgument` if `id` is not in this arena.
    pub fn edit(&mut self, id: SchemaId) -> Result<SchemaMut<'_>, SchemaError> {
        self.check_id(id)?;
        Ok(SchemaMut::new(self, id))
    }

    /// Add a node that matches any instance.
    pub fn anything(&mut self) -> SchemaId {
        self.create()
    }

    /// Add a node that matches no instance.
    pub fn nothing(&mut self) -> SchemaId {
        let id = self.create();
        self.nodes[id.0].nothing = true;
        id
    }

    /// Add a frozen reference node pointing at `uri`.
    pub fn reference(&mut self, uri: &str) -> Result<SchemaId, SchemaError> {
        let uri = SchemaUri::parse(uri)?;
        let id = self.create();
        self.ref_to(id, uri)?;
        Ok(id)
    }

    pub fn get(&self, id: SchemaId) -> Option<&SchemaNode> {
        self.nodes.get(id.0)
    }

    pub(crate) fn node(&self, id: SchemaId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: SchemaId) -> &mut SchemaNode {
        &mut self.nodes[id.0]
    }

    pub(crate) fn check_id(&self, id: SchemaId) -> Result<SchemaId, SchemaError> {
        check_id(&self.nodes, id)
    }

    /// Assign `key` on a node, honouring the meta keywords.
    ///
    /// `$id` and `$comment` are kept off the body, `$ref` turns the node
    /// into a frozen reference, and `$schema` only accepts draft-07. Every
    /// other key must be a draft-07 keyword.
    pub fn assign(
        &mut self,
        id: SchemaId,
        key: &str,
        member: impl Into<Member>,
    ) -> Result<(), SchemaError> {
        let member = member.into();
        self.check_id(id)?;
        check_member(&self.nodes, &member)?;
        self.node(id).check_frozen()?;
        match key {
            "$ref" => return self.ref_to(id, member_uri(key, &member)?),
            "$schema" => {
                let draft = member_uri(key, &member)?;
                if draft.to_string() != DRAFT_07 {
                    return Err(SchemaError::bad_argument(format!(
                        "Unsupported JSON schema draft: {}",
                        draft
                    )));
                }
            }
            "$id" => {
                let uri = member_uri(key, &member)?;
                self.node_mut(id).id = Some(uri);
            }
            "$comment" => {
                let comment = member.as_str().ok_or_else(|| {
                    SchemaError::wrong_type("Expected $comment to be a string")
                })?;
                self.node_mut(id).comment = Some(comment.to_string());
            }
            _ => {
                if property_rank(key).is_none() {
                    return Err(SchemaError::UnknownKeyword {
                        key: key.to_string(),
                    });
                }
                let node = self.node_mut(id);
                node.body.insert(key, member)?;
                node.body
                    .sort_by_rank(|k| property_rank(k).unwrap_or(PROPERTIES.len()));
            }
        }
        self.node_mut(id).nothing = false;
        Ok(())
    }

    /// Turn an empty node into a reference to `uri` and freeze it.
    pub(crate) fn ref_to(&mut self, id: SchemaId, uri: SchemaUri) -> Result<(), SchemaError> {
        let node = self.node_mut(id);
        node.check_frozen()?;
        if !node.body.is_empty() {
            let keys: Vec<&str> = node.body.keys().collect();
            return Err(SchemaError::invalid(format!(
                "Reference schemas cannot have other properties: {}",
                keys.join(", ")
            )));
        }
        node.nothing = false;
        node.body.insert("$ref", uri)?;
        node.body.freeze();
        Ok(())
    }

    /// Clear a node and make it match nothing.
    pub(crate) fn set_nothing(&mut self, id: SchemaId) -> Result<(), SchemaError> {
        let node = self.node_mut(id);
        node.check_frozen()?;
        node.body.clear()?;
        node.nothing = true;
        Ok(())
    }

    /// Freeze a single node. Frozen nodes reject every declaration.
    pub fn freeze(&mut self, id: SchemaId) -> Result<(), SchemaError> {
        self.check_id(id)?;
        self.node_mut(id).body.freeze();
        Ok(())
    }

    /// Render a node as plain JSON, without `$id`/`$schema`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::BadArgument` if `id` is not in this arena.
    pub fn as_json(&self, id: SchemaId) -> Result<Value, SchemaError> {
        self.as_json_with_id(id, &SchemaUri::local())
    }

    /// Render a node as a top-level document identified by `uri`.
    pub fn as_json_with_id(&self, id: SchemaId, uri: &SchemaUri) -> Result<Value, SchemaError> {
        self.check_id(id)?;
        Ok(render::render(&self.nodes, id, uri))
    }

    /// Two nodes are equal when they render to the same JSON.
    pub fn equals(&self, a: SchemaId, b: SchemaId) -> Result<bool, SchemaError> {
        Ok(a == b || self.as_json(a)? == self.as_json(b)?)
    }

    /// Copy every node of a finished schema into this arena and return the
    /// id of its root. The copies stay frozen.
    pub fn adopt(&mut self, schema: &Schema) -> SchemaId {
        let offset = self.nodes.len();
        for node in schema.nodes.iter() {
            let mut copy = node.clone();
            copy.body = shift_object(&node.body, offset);
            if node.is_frozen() {
                copy.body.freeze();
            }
            self.nodes.push(copy);
        }
        SchemaId(schema.root.0 + offset)
    }

    /// Freeze every node and return the finished schema rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::BadArgument` if `root` is not in this arena.
    pub fn finish(mut self, root: SchemaId) -> Result<Schema, SchemaError> {
        self.check_id(root)?;
        for node in &self.nodes {
            for (_, member) in node.body.iter() {
                check_member(&self.nodes, member)?;
            }
        }
        for node in &mut self.nodes {
            node.body.freeze();
        }
        Ok(Schema {
            nodes: self.nodes.into(),
            root,
        })
    }
}

fn check_id(nodes: &[SchemaNode], id: SchemaId) -> Result<SchemaId, SchemaError> {
    if id.0 < nodes.len() {
        Ok(id)
    } else {
        Err(SchemaError::bad_argument(format!(
            "Schema #{} does not belong to this arena",
            id.0
        )))
    }
}

/// Every schema id nested in `member` must name a node in `nodes`.
fn check_member(nodes: &[SchemaNode], member: &Member) -> Result<(), SchemaError> {
    match member {
        Member::Schema(id) => check_id(nodes, *id).map(|_| ()),
        Member::Object(object) => object
            .iter()
            .try_for_each(|(_, member)| check_member(nodes, member)),
        Member::Array(array) => array.iter().try_for_each(|member| check_member(nodes, member)),
        _ => Ok(()),
    }
}

fn member_uri(key: &str, member: &Member) -> Result<SchemaUri, SchemaError> {
    match member {
        Member::Uri(uri) => Ok(uri.clone()),
        Member::String(s) => SchemaUri::parse(s),
        _ => Err(SchemaError::wrong_type(format!(
            "Expected {} to be a URI string",
            key
        ))),
    }
}

fn shift_object(object: &JsonObject, offset: usize) -> JsonObject {
    object
        .iter()
        .map(|(k, v)| (k.clone(), shift_member(v, offset)))
        .collect()
}

fn shift_member(member: &Member, offset: usize) -> Member {
    match member {
        Member::Schema(id) => Member::Schema(SchemaId(id.0 + offset)),
        Member::Object(object) => Member::Object(shift_object(object, offset)),
        Member::Array(array) => Member::Array(
            array.iter().map(|m| shift_member(m, offset)).collect(),
        ),
        other => other.clone(),
    }
}

/// An immutable schema: a frozen node graph and its root.
///
/// Cloning is cheap; sub-schemas returned by
/// [`Schema::resolve_pointer`] share the same graph.
#[derive(Debug, Clone)]
pub struct Schema {
    nodes: Arc<[SchemaNode]>,
    root: SchemaId,
}

impl Schema {
    /// A schema matching any instance.
    pub fn anything() -> Self {
        let mut arena = SchemaArena::new();
        let root = arena.anything();
        Self::sealed(arena, root)
    }

    /// A schema matching no instance.
    pub fn nothing() -> Self {
        let mut arena = SchemaArena::new();
        let root = arena.nothing();
        Self::sealed(arena, root)
    }

    /// A reference schema pointing at `uri`.
    pub fn reference(uri: &str) -> Result<Self, SchemaError> {
        let mut arena = SchemaArena::new();
        let root = arena.reference(uri)?;
        Ok(Self::sealed(arena, root))
    }

    fn sealed(mut arena: SchemaArena, root: SchemaId) -> Self {
        for node in &mut arena.nodes {
            node.body.freeze();
        }
        Self {
            nodes: arena.nodes.into(),
            root,
        }
    }

    pub fn root(&self) -> &SchemaNode {
        &self.nodes[self.root.0]
    }

    pub fn root_id(&self) -> SchemaId {
        self.root
    }

    pub fn node(&self, id: SchemaId) -> Option<&SchemaNode> {
        self.nodes.get(id.0)
    }

    pub fn get(&self, key: &str) -> Option<&Member> {
        self.root().get(key)
    }

    pub fn is_anything(&self) -> bool {
        self.root().is_anything()
    }

    pub fn is_nothing(&self) -> bool {
        self.root().is_nothing()
    }

    pub fn is_ref(&self) -> bool {
        self.root().is_ref()
    }

    pub fn target(&self) -> Option<&SchemaUri> {
        self.root().target()
    }

    pub fn id(&self) -> Option<&SchemaUri> {
        self.root().id()
    }

    /// The same graph rooted at another node.
    pub fn subschema(&self, id: SchemaId) -> Option<Schema> {
        self.node(id).map(|_| Schema {
            nodes: Arc::clone(&self.nodes),
            root: id,
        })
    }

    /// Find the sub-schema at `pointer`, descending through sub-schemas and
    /// plain containers. Returns `None` unless the pointer lands on a schema.
    pub fn resolve_pointer(&self, pointer: &Pointer) -> Option<Schema> {
        let mut current = Member::Schema(self.root);
        for segment in pointer.segments() {
            let next = match &current {
                Member::Schema(id) => self.node(*id)?.body.dig(segment),
                other => other.dig(segment),
            }?;
            current = next.clone();
        }
        current.as_schema().and_then(|id| self.subschema(id))
    }

    /// Render as plain JSON, without `$id`/`$schema`.
    pub fn as_json(&self) -> Value {
        render::render(&self.nodes, self.root, &SchemaUri::local())
    }

    /// Render as a top-level document identified by `uri`.
    pub fn as_json_with_id(&self, uri: &SchemaUri) -> Value {
        render::render(&self.nodes, self.root, uri)
    }

    pub fn to_json_string(&self) -> String {
        self.as_json().to_string()
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.as_json() == other.as_json()
    }
}

impl serde::Serialize for Schema {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_json().serialize(serializer)
    }
}
