//! The fluent declaration API.
//!
//! A [`SchemaMut`] borrows its arena and one node. Every declaration
//! validates its argument, mutates the node and hands the handle back, so
//! declarations chain with `?`:
//!
//! ```
//! use schema_forge::SchemaArena;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), schema_forge::SchemaError> {
//! let mut arena = SchemaArena::new();
//! let user = arena
//!     .schema()
//!     .strict_object()?
//!     .property_with("id", |id| id.string()?.min_length(2))?
//!     .require(["id"])?
//!     .id();
//!
//! assert_eq!(
//!     arena.as_json(user)?,
//!     json!({
//!         "type": "object",
//!         "properties": {"id": {"type": "string", "minLength": 2}},
//!         "required": ["id"],
//!         "additionalProperties": false
//!     })
//! );
//! # Ok(())
//! # }
//! ```

use std::ops::{Bound, RangeBounds};

use regex::Regex;
use serde_json::{Number, Value};

use crate::container::{JsonArray, JsonObject, Member};
use crate::error::SchemaError;
use crate::schema::{SchemaArena, SchemaId};
use crate::types::{TypeRegistry, SIMPLE_TYPES};
use crate::uri::SchemaUri;

/// Anything usable where a schema is expected.
///
/// `true` and `false` become the absolutes; a regex becomes a string schema
/// with that pattern.
#[derive(Debug, Clone)]
pub enum SchemaLike {
    Id(SchemaId),
    Bool(bool),
    Pattern(Regex),
}

impl From<SchemaId> for SchemaLike {
    fn from(id: SchemaId) -> Self {
        SchemaLike::Id(id)
    }
}

impl From<bool> for SchemaLike {
    fn from(b: bool) -> Self {
        SchemaLike::Bool(b)
    }
}

impl From<Regex> for SchemaLike {
    fn from(regex: Regex) -> Self {
        SchemaLike::Pattern(regex)
    }
}

/// A property name, or a regex matching property names.
#[derive(Debug, Clone)]
pub enum PropertyKey {
    Name(String),
    Pattern(Regex),
}

impl PropertyKey {
    fn collection(&self) -> &'static str {
        match self {
            PropertyKey::Name(_) => "properties",
            PropertyKey::Pattern(_) => "patternProperties",
        }
    }

    fn as_str(&self) -> &str {
        match self {
            PropertyKey::Name(name) => name,
            PropertyKey::Pattern(regex) => regex.as_str(),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        PropertyKey::Name(name.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(name: String) -> Self {
        PropertyKey::Name(name)
    }
}

impl From<Regex> for PropertyKey {
    fn from(regex: Regex) -> Self {
        PropertyKey::Pattern(regex)
    }
}

/// A numeric declaration argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberArg {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl NumberArg {
    fn is_integer(self) -> bool {
        !matches!(self, NumberArg::Float(_))
    }

    fn is_positive(self) -> bool {
        match self {
            NumberArg::Int(n) => n > 0,
            NumberArg::UInt(n) => n > 0,
            NumberArg::Float(n) => n > 0.0,
        }
    }

    fn to_number(self) -> Result<Number, SchemaError> {
        match self {
            NumberArg::Int(n) => Ok(n.into()),
            NumberArg::UInt(n) => Ok(n.into()),
            NumberArg::Float(n) => Number::from_f64(n)
                .ok_or_else(|| SchemaError::invalid(format!("Expected {} to be numeric", n))),
        }
    }
}

impl std::fmt::Display for NumberArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumberArg::Int(n) => write!(f, "{}", n),
            NumberArg::UInt(n) => write!(f, "{}", n),
            NumberArg::Float(n) => write!(f, "{}", n),
        }
    }
}

impl From<i32> for NumberArg {
    fn from(n: i32) -> Self {
        NumberArg::Int(n.into())
    }
}

impl From<i64> for NumberArg {
    fn from(n: i64) -> Self {
        NumberArg::Int(n)
    }
}

impl From<u32> for NumberArg {
    fn from(n: u32) -> Self {
        NumberArg::UInt(n.into())
    }
}

impl From<u64> for NumberArg {
    fn from(n: u64) -> Self {
        NumberArg::UInt(n)
    }
}

impl From<f64> for NumberArg {
    fn from(n: f64) -> Self {
        NumberArg::Float(n)
    }
}

/// A mutable handle on one schema node.
#[derive(Debug)]
pub struct SchemaMut<'a> {
    arena: &'a mut SchemaArena,
    id: SchemaId,
}

type Declared<'a> = Result<SchemaMut<'a>, SchemaError>;

impl<'a> SchemaMut<'a> {
    pub(crate) fn new(arena: &'a mut SchemaArena, id: SchemaId) -> Self {
        Self { arena, id }
    }

    /// End the chain and return the node's id.
    pub fn id(self) -> SchemaId {
        self.id
    }

    /// The node's id, without ending the chain.
    pub fn current(&self) -> SchemaId {
        self.id
    }

    /// The arena this handle borrows.
    pub fn arena(&mut self) -> &mut SchemaArena {
        self.arena
    }

    fn set(self, key: &str, member: impl Into<Member>) -> Declared<'a> {
        self.arena.assign(self.id, key, member)?;
        Ok(self)
    }

    fn get(&self, key: &str) -> Option<&Member> {
        self.arena.node(self.id).get(key)
    }

    fn cast_schema(&mut self, schema: impl Into<SchemaLike>) -> Result<SchemaId, SchemaError> {
        match schema.into() {
            SchemaLike::Id(id) => self.arena.check_id(id),
            SchemaLike::Bool(true) => Ok(self.arena.anything()),
            SchemaLike::Bool(false) => Ok(self.arena.nothing()),
            SchemaLike::Pattern(regex) => Ok(self.arena.schema().pattern(regex.as_str())?.id()),
        }
    }

    fn object_member(&mut self, key: &str) -> Result<&mut JsonObject, SchemaError> {
        if self.get(key).is_none() {
            self.arena.assign(self.id, key, JsonObject::new())?;
        }
        match self.arena.node_mut(self.id).body.get_mut(key)? {
            Some(Member::Object(object)) => Ok(object),
            _ => Err(SchemaError::wrong_type(format!(
                "Expected '{}' to be an object",
                key
            ))),
        }
    }

    fn array_member(&mut self, key: &str) -> Result<&mut JsonArray, SchemaError> {
        if self.get(key).is_none() {
            self.arena.assign(self.id, key, JsonArray::new())?;
        }
        match self.arena.node_mut(self.id).body.get_mut(key)? {
            Some(Member::Array(array)) => Ok(array),
            _ => Err(SchemaError::invalid(format!(
                "Expected '{}' to be an array",
                key
            ))),
        }
    }

    /// Does the declared `type` include any of `types`?
    fn has_type(&self, types: &[&str]) -> bool {
        match self.get("type") {
            Some(Member::String(existing)) => types.contains(&existing.as_str()),
            Some(Member::Array(existing)) => existing
                .iter()
                .any(|t| t.as_str().map_or(false, |t| types.contains(&t))),
            _ => false,
        }
    }

    fn valid_for(&self, types: &[&str]) -> Result<(), SchemaError> {
        if self.has_type(types) {
            Ok(())
        } else {
            Err(SchemaError::invalid(format!(
                "The property is only valid for {} schemas",
                types.join(", ")
            )))
        }
    }

    fn add_to_schema_map(
        &mut self,
        collection: &str,
        name: &str,
        schema: SchemaId,
    ) -> Result<(), SchemaError> {
        let map = self.object_member(collection)?;
        if map.contains_key(name) {
            return Err(SchemaError::invalid(format!(
                "Property '{}' already has a member '{}'",
                collection, name
            )));
        }
        map.insert(name, schema)?;
        Ok(())
    }

    // Metadata

    pub fn title(self, title: impl Into<String>) -> Declared<'a> {
        self.set("title", title.into())
    }

    pub fn description(self, description: impl Into<String>) -> Declared<'a> {
        self.set("description", description.into())
    }

    pub fn default(self, value: Value) -> Declared<'a> {
        self.set("default", value)
    }

    pub fn read_only(self, read_only: bool) -> Declared<'a> {
        self.set("readOnly", read_only)
    }

    pub fn write_only(self, write_only: bool) -> Declared<'a> {
        self.set("writeOnly", write_only)
    }

    /// Expect instances to equal `value` exactly.
    pub fn const_(self, value: Value) -> Declared<'a> {
        self.set("const", value)
    }

    /// Restrict instances to a non-empty list of distinct values.
    pub fn enum_(self, values: impl IntoIterator<Item = Value>) -> Declared<'a> {
        let values: Vec<Value> = values.into_iter().collect();
        assert_array(&values, true, 1)?;
        self.set("enum", Value::Array(values))
    }

    /// Append examples.
    pub fn examples(mut self, examples: impl IntoIterator<Item = Value>) -> Declared<'a> {
        let examples: Vec<Value> = examples.into_iter().collect();
        if examples.is_empty() {
            return Ok(self);
        }
        let list = self.array_member("examples")?;
        for example in examples {
            list.push(example)?;
        }
        Ok(self)
    }

    pub fn comment(self, comment: impl Into<String>) -> Declared<'a> {
        self.set("$comment", comment.into())
    }

    /// Set the node's `$id`.
    pub fn id_(self, uri: &str) -> Declared<'a> {
        let uri = SchemaUri::parse(uri)?;
        self.set("$id", uri)
    }

    // Types

    /// Add to the declared types. A single type renders as a string.
    pub fn types<I, S>(self, types: I) -> Declared<'a>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let types: Vec<String> = types.into_iter().map(|t| t.as_ref().to_string()).collect();
        for t in &types {
            assert_simple_type(t)?;
        }
        let values: Vec<Value> = types.iter().map(|t| Value::from(t.as_str())).collect();
        assert_array(&values, true, 1)?;

        let mut merged: Vec<String> = match self.get("type") {
            Some(Member::String(existing)) => vec![existing.clone()],
            Some(Member::Array(existing)) => existing
                .iter()
                .filter_map(|t| t.as_str().map(String::from))
                .collect(),
            _ => Vec::new(),
        };
        for t in types {
            if !merged.contains(&t) {
                merged.push(t);
            }
        }
        if merged.len() == 1 {
            let single = merged.remove(0);
            self.set("type", single)
        } else {
            let list: JsonArray = merged.into_iter().map(Member::from).collect();
            self.set("type", list)
        }
    }

    pub fn array(self) -> Declared<'a> {
        self.types(["array"])
    }

    pub fn boolean(self) -> Declared<'a> {
        self.types(["boolean"])
    }

    pub fn integer(self) -> Declared<'a> {
        self.types(["integer"])
    }

    pub fn null(self) -> Declared<'a> {
        self.types(["null"])
    }

    /// Allow `null` alongside the other declared types.
    pub fn nullable(self) -> Declared<'a> {
        self.null()
    }

    pub fn number(self) -> Declared<'a> {
        self.types(["number"])
    }

    pub fn object(self) -> Declared<'a> {
        self.types(["object"])
    }

    pub fn string(self) -> Declared<'a> {
        self.types(["string"])
    }

    /// An object that rejects undeclared properties.
    pub fn strict_object(self) -> Declared<'a> {
        self.object()?.additional_properties(false)
    }

    /// Apply a named type from `registry`: a built-in shortcut such as
    /// `email`, or a custom type.
    pub fn declare(self, registry: &TypeRegistry, name: &str) -> Declared<'a> {
        match registry.lookup(name) {
            Some(handler) => handler.apply(self),
            None => Err(SchemaError::invalid(format!("Unknown type '{}'", name))),
        }
    }

    // Strings

    pub fn min_length(self, length: u64) -> Declared<'a> {
        self.valid_for(&["string"])?;
        self.set("minLength", length)
    }

    pub fn max_length(self, length: u64) -> Declared<'a> {
        self.valid_for(&["string"])?;
        self.set("maxLength", length)
    }

    /// Set `minLength` and `maxLength` from a range.
    pub fn length(self, range: impl RangeBounds<u64>) -> Declared<'a> {
        let (min, max) = count_bounds(&range)?;
        let mut schema = self;
        if let Some(min) = min {
            schema = schema.min_length(min)?;
        }
        if let Some(max) = max {
            schema = schema.max_length(max)?;
        }
        Ok(schema)
    }

    /// Constrain strings to a regular expression.
    ///
    /// Unlike `min_length` and `format`, this does not require a declared
    /// `string` type: it adds one.
    pub fn pattern(self, expression: impl AsRef<str>) -> Declared<'a> {
        let expression = expression.as_ref();
        Regex::new(expression).map_err(|e| {
            SchemaError::invalid(format!(
                "Expected {:?} to be a regular expression: {}",
                expression, e
            ))
        })?;
        self.string()?.set("pattern", expression)
    }

    pub fn format(self, format: impl Into<String>) -> Declared<'a> {
        self.valid_for(&["string"])?;
        self.set("format", format.into())
    }

    pub fn content_media_type(self, media_type: impl Into<String>) -> Declared<'a> {
        self.set("contentMediaType", media_type.into())
    }

    pub fn content_encoding(self, encoding: impl Into<String>) -> Declared<'a> {
        self.set("contentEncoding", encoding.into())
    }

    // Numbers

    pub fn multiple_of(self, number: impl Into<NumberArg>) -> Declared<'a> {
        self.valid_for(&["number", "integer"])?;
        let number = number.into();
        let value = number.to_number()?;
        if !number.is_positive() {
            return Err(SchemaError::invalid(format!(
                "Expected {} to be positive",
                number
            )));
        }
        self.set("multipleOf", value)
    }

    /// Set `minimum`, or `exclusiveMinimum` when `exclusive`.
    pub fn minimum(self, number: impl Into<NumberArg>, exclusive: bool) -> Declared<'a> {
        let key = if exclusive { "exclusiveMinimum" } else { "minimum" };
        self.numeric_boundary(key, number.into())
    }

    /// Set `maximum`, or `exclusiveMaximum` when `exclusive`.
    pub fn maximum(self, number: impl Into<NumberArg>, exclusive: bool) -> Declared<'a> {
        let key = if exclusive { "exclusiveMaximum" } else { "maximum" };
        self.numeric_boundary(key, number.into())
    }

    pub fn exclusive_minimum(self, number: impl Into<NumberArg>) -> Declared<'a> {
        self.minimum(number, true)
    }

    pub fn exclusive_maximum(self, number: impl Into<NumberArg>) -> Declared<'a> {
        self.maximum(number, true)
    }

    fn numeric_boundary(self, key: &str, number: NumberArg) -> Declared<'a> {
        self.valid_for(&["number", "integer"])?;
        let value = number.to_number()?;
        self.set(key, value)
    }

    /// Set the numeric bounds from a range, adding `integer` (for integer
    /// bounds) or `number` unless a numeric type is already declared. The
    /// single-bound setters (`minimum`, `maximum`) require the type instead.
    ///
    /// ```
    /// use schema_forge::SchemaArena;
    /// use serde_json::json;
    ///
    /// # fn main() -> Result<(), schema_forge::SchemaError> {
    /// let mut arena = SchemaArena::new();
    /// let id = arena.schema().range(1..10)?.id();
    /// assert_eq!(
    ///     arena.as_json(id)?,
    ///     json!({"type": "integer", "exclusiveMaximum": 10, "minimum": 1})
    /// );
    /// # Ok(())
    /// # }
    /// ```
    pub fn range<N>(self, range: impl RangeBounds<N>) -> Declared<'a>
    where
        N: Into<NumberArg> + Copy,
    {
        let start = bound_number(range.start_bound());
        let end = bound_number(range.end_bound());
        let integer = match (start, end) {
            (Some((n, _)), _) | (None, Some((n, _))) => n.is_integer(),
            (None, None) => false,
        };

        let mut schema = self;
        if !schema.has_type(&["number", "integer"]) {
            schema = schema.types([if integer { "integer" } else { "number" }])?;
        }
        if let Some((n, exclusive)) = start {
            schema = schema.minimum(n, exclusive)?;
        }
        if let Some((n, exclusive)) = end {
            schema = schema.maximum(n, exclusive)?;
        }
        Ok(schema)
    }

    // Arrays

    /// Validate every item against one schema.
    pub fn items(mut self, schema: impl Into<SchemaLike>) -> Declared<'a> {
        self.valid_for(&["array"])?;
        let schema = self.cast_schema(schema)?;
        self.set("items", schema)
    }

    /// Append a positional item schema.
    pub fn item(self, schema: impl Into<SchemaLike>) -> Declared<'a> {
        self.tuple_items([schema])
    }

    /// Append positional item schemas.
    pub fn tuple_items<I, S>(mut self, schemas: I) -> Declared<'a>
    where
        I: IntoIterator<Item = S>,
        S: Into<SchemaLike>,
    {
        self.valid_for(&["array"])?;
        let schemas = schemas
            .into_iter()
            .map(|s| self.cast_schema(s))
            .collect::<Result<Vec<_>, _>>()?;
        if schemas.is_empty() {
            return Err(SchemaError::invalid("Expected an array of at least 1 item(s)"));
        }
        if let Some(Member::Schema(_)) = self.get("items") {
            return Err(SchemaError::invalid(
                "Cannot add individual item schemas after adding a match-all schema",
            ));
        }
        let list = self.array_member("items")?;
        for schema in schemas {
            list.push(schema)?;
        }
        Ok(self)
    }

    /// Schema for items past the positional ones.
    pub fn additional_items(mut self, schema: impl Into<SchemaLike>) -> Declared<'a> {
        let schema = self.cast_schema(schema)?;
        self.set("additionalItems", schema)
    }

    pub fn contains(mut self, schema: impl Into<SchemaLike>) -> Declared<'a> {
        self.valid_for(&["array"])?;
        let schema = self.cast_schema(schema)?;
        self.set("contains", schema)
    }

    pub fn min_items(self, count: u64) -> Declared<'a> {
        self.valid_for(&["array"])?;
        self.set("minItems", count)
    }

    pub fn max_items(self, count: u64) -> Declared<'a> {
        self.valid_for(&["array"])?;
        self.set("maxItems", count)
    }

    /// Set `minItems` and `maxItems` from a range.
    pub fn count(self, range: impl RangeBounds<u64>) -> Declared<'a> {
        let (min, max) = count_bounds(&range)?;
        let mut schema = self;
        if let Some(min) = min {
            schema = schema.min_items(min)?;
        }
        if let Some(max) = max {
            schema = schema.max_items(max)?;
        }
        Ok(schema)
    }

    pub fn unique_items(self, unique: bool) -> Declared<'a> {
        self.valid_for(&["array"])?;
        self.set("uniqueItems", unique)
    }

    // Objects

    /// Declare a property. Regex keys go to `patternProperties`.
    pub fn property(
        mut self,
        name: impl Into<PropertyKey>,
        schema: impl Into<SchemaLike>,
    ) -> Declared<'a> {
        self.valid_for(&["object"])?;
        let name = name.into();
        let schema = self.cast_schema(schema)?;
        self.add_to_schema_map(name.collection(), name.as_str(), schema)?;
        Ok(self)
    }

    /// Declare a property whose schema is built in place.
    pub fn property_with<F>(self, name: impl Into<PropertyKey>, build: F) -> Declared<'a>
    where
        F: for<'b> FnOnce(SchemaMut<'b>) -> Result<SchemaMut<'b>, SchemaError>,
    {
        let child = self.arena.create();
        build(self.arena.edit(child)?)?;
        self.property(name, child)
    }

    /// Declare a property and require it.
    pub fn required_property(
        self,
        name: impl Into<String>,
        schema: impl Into<SchemaLike>,
    ) -> Declared<'a> {
        let name = name.into();
        self.property(name.as_str(), schema)?.require([name])
    }

    /// Declare several properties.
    pub fn properties<I, K, S>(self, properties: I) -> Declared<'a>
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<PropertyKey>,
        S: Into<SchemaLike>,
    {
        let mut schema = self.valid_object()?;
        for (name, value) in properties {
            schema = schema.property(name, value)?;
        }
        Ok(schema)
    }

    fn valid_object(self) -> Declared<'a> {
        self.valid_for(&["object"])?;
        Ok(self)
    }

    /// Add names to `required`, skipping ones already present.
    ///
    /// When `additionalProperties` is `false`, each name must match a
    /// declared property or property pattern.
    pub fn require<I, S>(mut self, names: I) -> Declared<'a>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Ok(self);
        }
        for name in &names {
            self.validate_property_name(name)?;
        }
        let required = self.array_member("required")?;
        for name in names {
            let member = Member::from(name);
            if !required.contains(&member) {
                required.push(member)?;
            }
        }
        Ok(self)
    }

    /// Require every declared property.
    pub fn require_all(self) -> Declared<'a> {
        let names: Vec<String> = match self.get("properties") {
            Some(Member::Object(properties)) => properties.keys().map(String::from).collect(),
            _ => Vec::new(),
        };
        self.require(names)
    }

    fn validate_property_name(&self, name: &str) -> Result<(), SchemaError> {
        let closed = match self.get("additionalProperties") {
            Some(Member::Schema(id)) => self.arena.node(*id).is_nothing(),
            Some(Member::Bool(false)) => true,
            _ => false,
        };
        if !closed {
            return Ok(());
        }
        let declared = match self.get("properties") {
            Some(Member::Object(properties)) => properties.contains_key(name),
            _ => false,
        };
        let matched = match self.get("patternProperties") {
            Some(Member::Object(patterns)) => patterns
                .keys()
                .filter_map(|p| Regex::new(p).ok())
                .any(|p| p.is_match(name)),
            _ => false,
        };
        if declared || matched {
            Ok(())
        } else {
            Err(SchemaError::invalid(format!(
                "Expected '{}' to be an existing property",
                name
            )))
        }
    }

    /// Schema for undeclared properties; `false` rejects them.
    pub fn additional_properties(mut self, schema: impl Into<SchemaLike>) -> Declared<'a> {
        let schema = self.cast_schema(schema)?;
        self.set("additionalProperties", schema)
    }

    pub fn property_names(mut self, schema: impl Into<SchemaLike>) -> Declared<'a> {
        let schema = self.cast_schema(schema)?;
        self.set("propertyNames", schema)
    }

    pub fn min_properties(self, count: u64) -> Declared<'a> {
        self.valid_for(&["object"])?;
        self.set("minProperties", count)
    }

    pub fn max_properties(self, count: u64) -> Declared<'a> {
        self.valid_for(&["object"])?;
        self.set("maxProperties", count)
    }

    // Definitions

    /// Add a named schema to `definitions`. Existing names are not replaced.
    pub fn define(mut self, name: &str, schema: impl Into<SchemaLike>) -> Declared<'a> {
        let schema = self.cast_schema(schema)?;
        self.add_to_schema_map("definitions", name, schema)?;
        Ok(self)
    }

    /// Add a definition built in place.
    pub fn define_with<F>(self, name: &str, build: F) -> Declared<'a>
    where
        F: for<'b> FnOnce(SchemaMut<'b>) -> Result<SchemaMut<'b>, SchemaError>,
    {
        let child = self.arena.create();
        build(self.arena.edit(child)?)?;
        self.define(name, child)
    }

    pub fn definitions<I, K, S>(self, definitions: I) -> Declared<'a>
    where
        I: IntoIterator<Item = (K, S)>,
        K: AsRef<str>,
        S: Into<SchemaLike>,
    {
        let mut schema = self;
        for (name, value) in definitions {
            schema = schema.define(name.as_ref(), value)?;
        }
        Ok(schema)
    }

    // Composites and conditions

    pub fn any_of<I, S>(self, schemas: I) -> Declared<'a>
    where
        I: IntoIterator<Item = S>,
        S: Into<SchemaLike>,
    {
        self.composite("anyOf", schemas)
    }

    pub fn all_of<I, S>(self, schemas: I) -> Declared<'a>
    where
        I: IntoIterator<Item = S>,
        S: Into<SchemaLike>,
    {
        self.composite("allOf", schemas)
    }

    pub fn one_of<I, S>(self, schemas: I) -> Declared<'a>
    where
        I: IntoIterator<Item = S>,
        S: Into<SchemaLike>,
    {
        self.composite("oneOf", schemas)
    }

    pub(crate) fn composite<I, S>(mut self, name: &str, schemas: I) -> Declared<'a>
    where
        I: IntoIterator<Item = S>,
        S: Into<SchemaLike>,
    {
        let ids = schemas
            .into_iter()
            .map(|s| self.cast_schema(s))
            .collect::<Result<Vec<_>, _>>()?;
        if ids.is_empty() {
            return Err(SchemaError::invalid("Expected an array of at least 1 item(s)"));
        }
        let absolute = ids.iter().any(|id| {
            let node = self.arena.node(*id);
            node.is_anything() || node.is_nothing()
        });
        if absolute {
            return Err(SchemaError::invalid("Absolutes make no sense in composites"));
        }
        let list: JsonArray = ids.into_iter().map(Member::from).collect();
        self.set(name, list)
    }

    pub fn not(mut self, schema: impl Into<SchemaLike>) -> Declared<'a> {
        let schema = self.cast_schema(schema)?;
        self.set("not", schema)
    }

    pub fn if_(mut self, schema: impl Into<SchemaLike>) -> Declared<'a> {
        let schema = self.cast_schema(schema)?;
        self.set("if", schema)
    }

    pub fn then(mut self, schema: impl Into<SchemaLike>) -> Declared<'a> {
        let schema = self.cast_schema(schema)?;
        self.set("then", schema)
    }

    pub fn else_(mut self, schema: impl Into<SchemaLike>) -> Declared<'a> {
        let schema = self.cast_schema(schema)?;
        self.set("else", schema)
    }

    // References and absolutes

    /// Make this node a reference to `uri`. The node must be empty and is
    /// frozen afterwards.
    pub fn ref_(self, uri: &str) -> Declared<'a> {
        let uri = SchemaUri::parse(uri)?;
        self.ref_uri(uri)
    }

    pub fn ref_uri(self, uri: SchemaUri) -> Declared<'a> {
        self.arena.ref_to(self.id, uri)?;
        Ok(self)
    }

    /// Clear the node and make it match nothing.
    pub fn nothing(self) -> Declared<'a> {
        self.arena.set_nothing(self.id)?;
        Ok(self)
    }

    /// Assign a raw keyword.
    pub fn assign(self, key: &str, member: impl Into<Member>) -> Declared<'a> {
        self.set(key, member)
    }
}

fn assert_simple_type(name: &str) -> Result<(), SchemaError> {
    if SIMPLE_TYPES.contains(&name) {
        Ok(())
    } else {
        Err(SchemaError::invalid(format!(
            "Expected \"{}\" to be one of {}",
            name,
            SIMPLE_TYPES.join(", ")
        )))
    }
}

fn assert_array(values: &[Value], unique: bool, minimum: usize) -> Result<(), SchemaError> {
    if unique {
        let duplicated = values
            .iter()
            .enumerate()
            .any(|(i, v)| values[..i].contains(v));
        if duplicated {
            return Err(SchemaError::invalid("Expected a unique array"));
        }
    }
    if values.len() < minimum {
        return Err(SchemaError::invalid(format!(
            "Expected an array of at least {} item(s)",
            minimum
        )));
    }
    Ok(())
}

fn bound_number<N>(bound: Bound<&N>) -> Option<(NumberArg, bool)>
where
    N: Into<NumberArg> + Copy,
{
    match bound {
        Bound::Included(n) => Some(((*n).into(), false)),
        Bound::Excluded(n) => Some(((*n).into(), true)),
        Bound::Unbounded => None,
    }
}

/// Inclusive count bounds of a range of lengths.
fn count_bounds(range: &impl RangeBounds<u64>) -> Result<(Option<u64>, Option<u64>), SchemaError> {
    let min = match range.start_bound() {
        Bound::Included(n) => Some(*n),
        Bound::Excluded(n) => Some(n.saturating_add(1)),
        Bound::Unbounded => None,
    };
    let max = match range.end_bound() {
        Bound::Included(n) => Some(*n),
        Bound::Excluded(0) => {
            return Err(SchemaError::invalid("Expected a non-empty range"));
        }
        Bound::Excluded(n) => Some(n - 1),
        Bound::Unbounded => None,
    };
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(SchemaError::invalid(format!(
                "Expected a non-empty range, got {}..={}",
                min, max
            )));
        }
    }
    Ok((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invalid_message(result: Result<SchemaMut<'_>, SchemaError>) -> String {
        match result {
            Err(SchemaError::InvalidPropertyValue { message }) => message,
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn types_accumulate_and_collapse() {
        let mut arena = SchemaArena::new();
        let id = arena.schema().string().unwrap().id();
        assert_eq!(arena.as_json(id).unwrap(), json!({"type": "string"}));

        arena.edit(id).unwrap().nullable().unwrap().string().unwrap();
        assert_eq!(arena.as_json(id).unwrap(), json!({"type": ["string", "null"]}));
    }

    #[test]
    fn types_reject_unknown_and_duplicates() {
        let mut arena = SchemaArena::new();
        let message = invalid_message(arena.schema().types(["text"]));
        assert!(message.starts_with("Expected \"text\" to be one of array"));

        let message = invalid_message(arena.schema().types(["string", "string"]));
        assert_eq!(message, "Expected a unique array");

        let empty: [&str; 0] = [];
        let message = invalid_message(arena.schema().types(empty));
        assert_eq!(message, "Expected an array of at least 1 item(s)");
    }

    #[test]
    fn string_constraints_need_string_type() {
        let mut arena = SchemaArena::new();
        let message = invalid_message(arena.schema().min_length(1));
        assert_eq!(message, "The property is only valid for string schemas");

        let id = arena.schema().string().unwrap().length(2..=8).unwrap().id();
        assert_eq!(
            arena.as_json(id).unwrap(),
            json!({"type": "string", "maxLength": 8, "minLength": 2})
        );
    }

    #[test]
    fn pattern_adds_string_type() {
        let mut arena = SchemaArena::new();
        let id = arena.schema().pattern("^a+$").unwrap().id();
        assert_eq!(arena.as_json(id).unwrap(), json!({"type": "string", "pattern": "^a+$"}));

        let message = invalid_message(arena.schema().pattern("(unclosed"));
        assert!(message.starts_with("Expected \"(unclosed\" to be a regular expression"));
    }

    #[test]
    fn multiple_of_must_be_positive() {
        let mut arena = SchemaArena::new();
        let message = invalid_message(arena.schema().number().unwrap().multiple_of(-2));
        assert_eq!(message, "Expected -2 to be positive");

        let message = invalid_message(arena.schema().number().unwrap().minimum(f64::NAN, false));
        assert_eq!(message, "Expected NaN to be numeric");
    }

    #[test]
    fn range_sets_bounds_and_type() {
        let mut arena = SchemaArena::new();
        let id = arena.schema().range(0.5..=2.5).unwrap().id();
        assert_eq!(
            arena.as_json(id).unwrap(),
            json!({"type": "number", "maximum": 2.5, "minimum": 0.5})
        );

        let id = arena.schema().number().unwrap().range(1..).unwrap().id();
        assert_eq!(arena.as_json(id).unwrap(), json!({"type": "number", "minimum": 1}));
    }

    #[test]
    fn enum_requires_unique_values() {
        let mut arena = SchemaArena::new();
        let message = invalid_message(arena.schema().enum_([json!(1), json!(1)]));
        assert_eq!(message, "Expected a unique array");

        let message = invalid_message(arena.schema().enum_(Vec::new()));
        assert_eq!(message, "Expected an array of at least 1 item(s)");

        let id = arena.schema().enum_([json!("a"), json!(2)]).unwrap().id();
        assert_eq!(arena.as_json(id).unwrap(), json!({"enum": ["a", 2]}));
    }

    #[test]
    fn tuple_items_conflict_with_match_all() {
        let mut arena = SchemaArena::new();
        let item = arena.schema().string().unwrap().id();
        let id = arena.schema().array().unwrap().items(item).unwrap().id();
        let message = invalid_message(arena.edit(id).unwrap().item(true));
        assert_eq!(
            message,
            "Cannot add individual item schemas after adding a match-all schema"
        );
    }

    #[test]
    fn tuple_items_append() {
        let mut arena = SchemaArena::new();
        let a = arena.schema().string().unwrap().id();
        let b = arena.schema().integer().unwrap().id();
        let id = arena
            .schema()
            .array()
            .unwrap()
            .item(a)
            .unwrap()
            .item(b)
            .unwrap()
            .additional_items(false)
            .unwrap()
            .id();
        assert_eq!(
            arena.as_json(id).unwrap(),
            json!({
                "type": "array",
                "additionalItems": false,
                "items": [{"type": "string"}, {"type": "integer"}]
            })
        );
    }

    #[test]
    fn pattern_property_keys() {
        let mut arena = SchemaArena::new();
        let id = arena
            .schema()
            .object()
            .unwrap()
            .property(Regex::new("^x-").unwrap(), true)
            .unwrap()
            .property("name", Regex::new("^[a-z]+$").unwrap())
            .unwrap()
            .id();
        assert_eq!(
            arena.as_json(id).unwrap(),
            json!({
                "type": "object",
                "properties": {"name": {"type": "string", "pattern": "^[a-z]+$"}},
                "patternProperties": {"^x-": true}
            })
        );
    }

    #[test]
    fn require_checks_existing_properties_when_closed() {
        let mut arena = SchemaArena::new();
        let message = invalid_message(arena.schema().strict_object().unwrap().require(["foo"]));
        assert_eq!(message, "Expected 'foo' to be an existing property");

        let id = arena
            .schema()
            .strict_object()
            .unwrap()
            .property("foo", true)
            .unwrap()
            .property(Regex::new("^bar").unwrap(), true)
            .unwrap()
            .require(["foo", "barn", "foo"])
            .unwrap()
            .id();
        assert_eq!(arena.as_json(id).unwrap()["required"], json!(["foo", "barn"]));
    }

    #[test]
    fn require_treats_plain_false_as_closed() {
        let mut arena = SchemaArena::new();
        let id = arena.create();
        arena.assign(id, "additionalProperties", false).unwrap();
        let message = invalid_message(arena.edit(id).unwrap().require(["undeclared"]));
        assert_eq!(message, "Expected 'undeclared' to be an existing property");
    }

    #[test]
    fn empty_lists_write_nothing() {
        let mut arena = SchemaArena::new();
        let none: [&str; 0] = [];
        let id = arena
            .schema()
            .object()
            .unwrap()
            .require(none)
            .unwrap()
            .examples(Vec::new())
            .unwrap()
            .id();
        assert_eq!(arena.as_json(id).unwrap(), json!({"type": "object"}));
    }

    #[test]
    fn require_all_uses_declared_properties() {
        let mut arena = SchemaArena::new();
        let id = arena
            .schema()
            .object()
            .unwrap()
            .properties([("a", true), ("b", false)])
            .unwrap()
            .require_all()
            .unwrap()
            .id();
        assert_eq!(arena.as_json(id).unwrap()["required"], json!(["a", "b"]));
    }

    #[test]
    fn definitions_refuse_overwrite() {
        let mut arena = SchemaArena::new();
        let message = invalid_message(
            arena
                .schema()
                .define("x", true)
                .unwrap()
                .define("x", false),
        );
        assert_eq!(message, "Property 'definitions' already has a member 'x'");
    }

    #[test]
    fn composites_reject_absolutes_and_empty_lists() {
        let mut arena = SchemaArena::new();
        let message = invalid_message(arena.schema().any_of([true]));
        assert_eq!(message, "Absolutes make no sense in composites");

        let empty: Vec<SchemaId> = Vec::new();
        let message = invalid_message(arena.schema().one_of(empty));
        assert_eq!(message, "Expected an array of at least 1 item(s)");
    }

    #[test]
    fn conditionals() {
        let mut arena = SchemaArena::new();
        let condition = arena.schema().string().unwrap().id();
        let then = arena
            .schema()
            .string()
            .unwrap()
            .min_length(3)
            .unwrap()
            .id();
        let id = arena
            .schema()
            .if_(condition)
            .unwrap()
            .then(then)
            .unwrap()
            .else_(false)
            .unwrap()
            .id();
        assert_eq!(
            arena.as_json(id).unwrap(),
            json!({
                "if": {"type": "string"},
                "then": {"type": "string", "minLength": 3},
                "else": false
            })
        );
    }

    #[test]
    fn ref_then_mutation_is_frozen() {
        let mut arena = SchemaArena::new();
        let id = arena.schema().ref_("#/definitions/a").unwrap().id();
        let result = arena.edit(id).unwrap().string();
        assert!(matches!(result, Err(SchemaError::Frozen { .. })));

        let result = arena.schema().string().unwrap().ref_("#");
        assert!(matches!(
            result,
            Err(SchemaError::InvalidPropertyValue { .. })
        ));
    }

    #[test]
    fn nothing_clears_properties() {
        let mut arena = SchemaArena::new();
        let id = arena.schema().string().unwrap().nothing().unwrap().id();
        assert_eq!(arena.as_json(id).unwrap(), json!(false));
    }

    #[test]
    fn examples_append() {
        let mut arena = SchemaArena::new();
        let id = arena
            .schema()
            .examples([json!("a")])
            .unwrap()
            .examples([json!("b")])
            .unwrap()
            .id();
        assert_eq!(arena.as_json(id).unwrap(), json!({"examples": ["a", "b"]}));
    }
}
