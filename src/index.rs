//! In-memory collections of schemas addressed by absolute URI.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::SchemaError;
use crate::schema::Schema;
use crate::uri::SchemaUri;

/// A finished schema paired with the absolute URI it lives at.
#[derive(Debug, Clone)]
pub struct SchemaWithUri {
    uri: SchemaUri,
    schema: Schema,
}

impl SchemaWithUri {
    pub fn new(uri: SchemaUri, schema: Schema) -> Self {
        Self { uri, schema }
    }

    pub fn uri(&self) -> &SchemaUri {
        &self.uri
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn into_schema(self) -> Schema {
        self.schema
    }

    /// Find the part of this schema that `uri` addresses.
    ///
    /// Returns `Ok(None)` when `uri` points outside this entry's pointer or
    /// at something that is not a schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::BadArgument` when `uri` is relative or names a
    /// different document.
    pub fn resolve(&self, uri: &SchemaUri) -> Result<Option<SchemaWithUri>, SchemaError> {
        if uri.is_relative() {
            return Err(SchemaError::bad_argument("Cannot resolve relative URIs"));
        }
        if uri.document() != self.uri.document() {
            return Err(SchemaError::bad_argument("Wrong URI base"));
        }
        let Some(pointer) = uri.pointer()?.remove_prefix(&self.uri.pointer()?) else {
            return Ok(None);
        };
        Ok(self
            .schema
            .resolve_pointer(&pointer)
            .map(|fragment| SchemaWithUri::new(uri.clone(), fragment)))
    }

    /// Render as a top-level document with `$id` and `$schema`.
    pub fn as_json(&self) -> Value {
        self.schema.as_json_with_id(&self.uri)
    }

    pub fn to_json_string(&self) -> String {
        self.as_json().to_string()
    }
}

impl PartialEq for SchemaWithUri {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri && self.schema == other.schema
    }
}

impl serde::Serialize for SchemaWithUri {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_json().serialize(serializer)
    }
}

/// Schemas keyed by absolute URI, in insertion order.
///
/// ```
/// use schema_forge::{Index, Schema, SchemaUri};
/// use serde_json::json;
///
/// # fn main() -> Result<(), schema_forge::SchemaError> {
/// let schema = Schema::from_json(&json!({"definitions": {"id": {"type": "string"}}}))?;
/// let mut index = Index::new();
/// index.add(SchemaUri::parse("http://example.com/user")?, schema)?;
///
/// let id = SchemaUri::parse("http://example.com/user#/definitions/id")?;
/// let found = index.resolve(&id)?.unwrap();
/// assert_eq!(found.schema().as_json(), json!({"type": "string"}));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Index {
    by_uri: IndexMap<SchemaUri, SchemaWithUri>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `schema` at `uri`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::BadArgument` for relative URIs.
    pub fn add(&mut self, uri: SchemaUri, schema: Schema) -> Result<&mut Self, SchemaError> {
        if uri.is_relative() {
            return Err(SchemaError::bad_argument("Cannot index relative URIs"));
        }
        Ok(self.push(SchemaWithUri::new(uri, schema)))
    }

    /// Add an entry that already carries its URI.
    pub fn push(&mut self, entry: SchemaWithUri) -> &mut Self {
        self.by_uri.insert(entry.uri.clone(), entry);
        self
    }

    /// Look up `uri`, falling back to ever shorter pointer prefixes and
    /// resolving the remainder inside the entry found.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::BadArgument` for relative URIs or fragments that
    /// are not JSON pointers.
    pub fn resolve(&self, uri: &SchemaUri) -> Result<Option<SchemaWithUri>, SchemaError> {
        if uri.is_relative() {
            return Err(SchemaError::bad_argument("Cannot resolve relative URIs"));
        }
        if let Some(entry) = self.by_uri.get(uri) {
            return Ok(Some(entry.clone()));
        }
        let mut pointer = uri.pointer()?;
        while !pointer.is_empty() {
            pointer = pointer.shed(1)?;
            if let Some(entry) = self.by_uri.get(&uri.with_pointer(&pointer)) {
                return entry.resolve(uri);
            }
        }
        Ok(None)
    }

    /// Whether `uri` resolves to a schema.
    pub fn contains(&self, uri: &SchemaUri) -> Result<bool, SchemaError> {
        Ok(self.resolve(uri)?.is_some())
    }

    pub fn uris(&self) -> impl Iterator<Item = &SchemaUri> {
        self.by_uri.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaWithUri> {
        self.by_uri.values()
    }

    pub fn len(&self) -> usize {
        self.by_uri.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uri.is_empty()
    }
}

impl Extend<SchemaWithUri> for Index {
    fn extend<T: IntoIterator<Item = SchemaWithUri>>(&mut self, iter: T) {
        for entry in iter {
            self.push(entry);
        }
    }
}

impl<'a> IntoIterator for &'a Index {
    type Item = &'a SchemaWithUri;
    type IntoIter = indexmap::map::Values<'a, SchemaUri, SchemaWithUri>;

    fn into_iter(self) -> Self::IntoIter {
        self.by_uri.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaArena, DRAFT_07};
    use serde_json::json;

    fn uri(s: &str) -> SchemaUri {
        SchemaUri::parse(s).unwrap()
    }

    fn struct_requiring_foo() -> Schema {
        let mut arena = SchemaArena::new();
        let root = arena
            .schema()
            .strict_object()
            .unwrap()
            .required_property("foo", true)
            .unwrap()
            .id();
        arena.finish(root).unwrap()
    }

    #[test]
    fn rejects_relative_uris() {
        let mut index = Index::new();
        assert_eq!(
            index.resolve(&uri("/foo")).unwrap_err(),
            SchemaError::bad_argument("Cannot resolve relative URIs")
        );
        assert_eq!(
            index.add(uri("/foo"), Schema::anything()).unwrap_err(),
            SchemaError::bad_argument("Cannot index relative URIs")
        );
    }

    #[test]
    fn resolves_partial_schemas() {
        let mut arena = SchemaArena::new();
        let boolean = arena.schema().boolean().unwrap().id();
        let root = arena.schema().define("baz", boolean).unwrap().id();
        let schema = arena.finish(root).unwrap();

        let mut index = Index::new();
        index.add(uri("http://foo/bar"), schema).unwrap();

        let found = index
            .resolve(&uri("http://foo/bar#/definitions/baz"))
            .unwrap()
            .unwrap();
        assert_eq!(found.schema().as_json(), json!({"type": "boolean"}));
        assert_eq!(found.uri().to_string(), "http://foo/bar#/definitions/baz");
    }

    #[test]
    fn missing_partials_are_none() {
        let mut index = Index::new();
        index.add(uri("http://foo/bar"), struct_requiring_foo()).unwrap();

        assert!(index.contains(&uri("http://foo/bar#/properties/foo")).unwrap());
        assert!(!index.contains(&uri("http://foo/bar#/properties/bar")).unwrap());
        assert!(!index.contains(&uri("http://foo/baz#/properties/bar")).unwrap());
    }

    #[test]
    fn iterates_in_insertion_order() {
        let mut index = Index::new();
        index.add(uri("http://foo/b"), Schema::anything()).unwrap();
        index.add(uri("http://foo/a"), Schema::nothing()).unwrap();
        let uris: Vec<String> = index.uris().map(ToString::to_string).collect();
        assert_eq!(uris, ["http://foo/b#", "http://foo/a#"]);
        assert_eq!(
            index.iter().next().unwrap(),
            &SchemaWithUri::new(uri("http://foo/b"), Schema::anything())
        );
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn schema_with_uri_renders_top_level() {
        let entry = SchemaWithUri::new(uri("http://foo#"), Schema::anything());
        assert_eq!(
            entry.to_json_string(),
            format!(r#"{{"$id":"http://foo/#","$schema":"{}"}}"#, DRAFT_07)
        );
    }

    #[test]
    fn schema_with_uri_checks_base() {
        let entry = SchemaWithUri::new(uri("http://foo#"), Schema::anything());
        assert!(matches!(
            entry.resolve(&uri("/foo")),
            Err(SchemaError::BadArgument { .. })
        ));
        assert_eq!(
            entry.resolve(&uri("http://bar#")).unwrap_err(),
            SchemaError::bad_argument("Wrong URI base")
        );
    }

    #[test]
    fn schema_with_uri_ignores_other_subtrees() {
        let schema = struct_requiring_foo();
        let entry = SchemaWithUri::new(uri("http://foo/x#/properties"), schema);
        assert!(entry.resolve(&uri("http://foo/x#/definitions")).unwrap().is_none());
    }
}
