//! Building schema nodes from plain draft-07 JSON.

use serde_json::{Map, Value};
use tracing::debug;

use crate::container::{JsonArray, JsonObject, Member};
use crate::error::SchemaError;
use crate::pointer::Pointer;
use crate::schema::{Schema, SchemaArena, SchemaId};
use crate::types::{json_type_name, TypeRegistry};

/// Keywords whose value is a single schema.
const SCHEMA_KEYWORDS: &[&str] = &[
    "additionalItems",
    "contains",
    "additionalProperties",
    "propertyNames",
    "not",
    "if",
    "then",
    "else",
];

/// Keywords whose value maps names to schemas.
const SCHEMA_MAP_KEYWORDS: &[&str] = &["properties", "patternProperties", "definitions"];

/// Keywords whose value is a list of schemas.
const SCHEMA_LIST_KEYWORDS: &[&str] = &["allOf", "anyOf", "oneOf"];

impl SchemaArena {
    /// Import a JSON schema document, returning the id of its root.
    ///
    /// ```
    /// use schema_forge::SchemaArena;
    /// use serde_json::json;
    ///
    /// # fn main() -> Result<(), schema_forge::SchemaError> {
    /// let source = json!({"required": ["id"], "type": "object", "properties": {"id": true}});
    /// let mut arena = SchemaArena::new();
    /// let root = arena.import(&source)?;
    ///
    /// let rendered = serde_json::to_string(&arena.as_json(root)?).unwrap();
    /// assert_eq!(rendered, r#"{"type":"object","properties":{"id":true},"required":["id"]}"#);
    /// # Ok(())
    /// # }
    /// ```
    pub fn import(&mut self, value: &Value) -> Result<SchemaId, SchemaError> {
        Importer {
            arena: self,
            types: None,
        }
        .schema(value, &Pointer::root())
    }

    /// Like [`SchemaArena::import`], but a string in schema position names a
    /// type in `types`.
    pub fn import_with(
        &mut self,
        value: &Value,
        types: &TypeRegistry,
    ) -> Result<SchemaId, SchemaError> {
        Importer {
            arena: self,
            types: Some(types),
        }
        .schema(value, &Pointer::root())
    }
}

impl Schema {
    /// Import and finish a JSON schema document.
    pub fn from_json(value: &Value) -> Result<Schema, SchemaError> {
        let mut arena = SchemaArena::new();
        let root = arena.import(value)?;
        arena.finish(root)
    }

    /// Import with a type registry and finish.
    pub fn from_json_with(value: &Value, types: &TypeRegistry) -> Result<Schema, SchemaError> {
        let mut arena = SchemaArena::new();
        let root = arena.import_with(value, types)?;
        arena.finish(root)
    }
}

struct Importer<'a, 't> {
    arena: &'a mut SchemaArena,
    types: Option<&'t TypeRegistry>,
}

impl Importer<'_, '_> {
    fn schema(&mut self, value: &Value, path: &Pointer) -> Result<SchemaId, SchemaError> {
        match value {
            Value::Bool(true) => Ok(self.arena.anything()),
            Value::Bool(false) => Ok(self.arena.nothing()),
            Value::Object(map) => self.object(map, path),
            Value::String(name) if self.types.is_some() => self.named(name),
            other => Err(SchemaError::wrong_type(format!(
                "Expected {} at \"{}\" to be a schema",
                json_type_name(other),
                path
            ))),
        }
    }

    fn named(&mut self, name: &str) -> Result<SchemaId, SchemaError> {
        let handler = self
            .types
            .and_then(|types| types.lookup(name))
            .ok_or_else(|| SchemaError::invalid(format!("Unknown type '{}'", name)))?;
        let id = self.arena.create();
        handler.apply(self.arena.edit(id)?)?;
        Ok(id)
    }

    fn object(&mut self, map: &Map<String, Value>, path: &Pointer) -> Result<SchemaId, SchemaError> {
        let id = self.arena.create();

        if let Some(target) = map.get("$ref") {
            let ignored: Vec<&str> = map
                .keys()
                .map(String::as_str)
                .filter(|k| *k != "$ref")
                .collect();
            if !ignored.is_empty() {
                debug!(path = %path, ignored = ?ignored, "ignoring keywords next to $ref");
            }
            self.arena.assign(id, "$ref", Member::from(target))?;
            return Ok(id);
        }

        for (key, value) in map {
            let member = self.keyword(key, value, &path.child(key.as_str()))?;
            self.arena.assign(id, key, member)?;
        }
        Ok(id)
    }

    fn keyword(&mut self, key: &str, value: &Value, path: &Pointer) -> Result<Member, SchemaError> {
        if key == "items" {
            return match value {
                Value::Array(items) => self.schema_list(items, path),
                other => Ok(Member::Schema(self.schema(other, path)?)),
            };
        }
        if SCHEMA_KEYWORDS.contains(&key) {
            return Ok(Member::Schema(self.schema(value, path)?));
        }
        if SCHEMA_MAP_KEYWORDS.contains(&key) {
            let map = expect_object(key, value, path)?;
            return self.schema_map(map, path, |_| true);
        }
        if key == "dependencies" {
            let map = expect_object(key, value, path)?;
            return self.schema_map(map, path, |v| !v.is_array());
        }
        if SCHEMA_LIST_KEYWORDS.contains(&key) {
            return match value {
                Value::Array(items) => self.schema_list(items, path),
                other => Err(SchemaError::wrong_type(format!(
                    "Expected {} at \"{}\" to be an array of schemas",
                    json_type_name(other),
                    path
                ))),
            };
        }
        Ok(Member::from(value))
    }

    /// Import the values of `map` that satisfy `is_schema` as schemas and
    /// keep the rest as plain JSON.
    fn schema_map(
        &mut self,
        map: &Map<String, Value>,
        path: &Pointer,
        is_schema: impl Fn(&Value) -> bool,
    ) -> Result<Member, SchemaError> {
        let mut object = JsonObject::new();
        for (name, value) in map {
            let member = if is_schema(value) {
                Member::Schema(self.schema(value, &path.child(name.as_str()))?)
            } else {
                Member::from(value)
            };
            object.insert(name.as_str(), member)?;
        }
        Ok(Member::Object(object))
    }

    fn schema_list(&mut self, items: &[Value], path: &Pointer) -> Result<Member, SchemaError> {
        let mut array = JsonArray::new();
        for (i, item) in items.iter().enumerate() {
            array.push(self.schema(item, &path.child(i.to_string()))?)?;
        }
        Ok(Member::Array(array))
    }
}

fn expect_object<'v>(
    key: &str,
    value: &'v Value,
    path: &Pointer,
) -> Result<&'v Map<String, Value>, SchemaError> {
    value.as_object().ok_or_else(|| {
        SchemaError::wrong_type(format!(
            "Expected '{}' at \"{}\" to be an object, got {}",
            key,
            path,
            json_type_name(value)
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_canonical_json() {
        let source = json!({
            "title": "User",
            "definitions": {"id": {"type": "string", "minLength": 2}},
            "type": "object",
            "properties": {
                "id": {"$ref": "#/definitions/id"},
                "tags": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["id"],
            "additionalProperties": false
        });
        let schema = Schema::from_json(&source).unwrap();
        assert_eq!(schema.as_json(), source);
    }

    #[test]
    fn booleans_become_absolutes() {
        let schema = Schema::from_json(&json!(false)).unwrap();
        assert!(schema.is_nothing());
        let schema = Schema::from_json(&json!(true)).unwrap();
        assert!(schema.is_anything());
    }

    #[test]
    fn nested_schemas_are_nodes() {
        let source = json!({
            "items": [{"type": "string"}, true],
            "dependencies": {"a": ["b"], "c": {"required": ["d"]}},
            "anyOf": [{"type": "null"}, {"const": 1}]
        });
        let schema = Schema::from_json(&source).unwrap();
        for path in ["/items/0", "/items/1", "/dependencies/c", "/anyOf/1"] {
            let pointer = Pointer::parse(path).unwrap();
            assert!(schema.resolve_pointer(&pointer).is_some(), "{}", path);
        }
        let pointer = Pointer::parse("/dependencies/a").unwrap();
        assert!(schema.resolve_pointer(&pointer).is_none());
        assert_eq!(schema.as_json(), source);
    }

    #[test]
    fn non_schema_values_are_rejected_with_path() {
        let result = Schema::from_json(&json!({"properties": {"a": 42}}));
        match result {
            Err(SchemaError::WrongType { message }) => {
                assert_eq!(message, "Expected number at \"/properties/a\" to be a schema")
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn ref_siblings_are_ignored() {
        let schema = Schema::from_json(&json!({"$ref": "#/a", "description": "x"})).unwrap();
        assert!(schema.is_ref());
        assert_eq!(schema.as_json(), json!({"$ref": "#/a"}));
    }

    #[test]
    fn meta_keys_are_accepted() {
        let source = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "$id": "http://example.com/thing",
            "$comment": "hi",
            "type": "string"
        });
        let schema = Schema::from_json(&source).unwrap();
        assert_eq!(schema.as_json(), json!({"type": "string"}));
        assert_eq!(schema.id().unwrap().to_string(), "http://example.com/thing#");
    }

    #[test]
    fn unknown_keywords_are_rejected() {
        let result = Schema::from_json(&json!({"x-extra": 1}));
        assert!(matches!(result, Err(SchemaError::UnknownKeyword { .. })));
    }

    #[test]
    fn type_names_resolve_through_registry() {
        let mut types = TypeRegistry::new();
        types.register_ref("uuid", "uuid").unwrap();
        let source = json!({
            "type": "object",
            "properties": {"id": "uuid", "email": "email"}
        });
        let schema = Schema::from_json_with(&source, &types).unwrap();
        assert_eq!(
            schema.as_json(),
            json!({
                "type": "object",
                "properties": {
                    "id": {"$ref": "uuid#"},
                    "email": {"type": "string", "format": "email"}
                }
            })
        );

        let result = Schema::from_json_with(&json!({"not": "widget"}), &types);
        assert!(matches!(
            result,
            Err(SchemaError::InvalidPropertyValue { .. })
        ));
        let result = Schema::from_json(&json!({"not": "email"}));
        assert!(matches!(result, Err(SchemaError::WrongType { .. })));
    }
}
