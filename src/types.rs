//! Type tables and the named-type registry.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::declare::SchemaMut;
use crate::error::SchemaError;
use crate::uri::SchemaUri;

/// Values accepted by `type`.
pub const SIMPLE_TYPES: &[&str] = &[
    "array", "boolean", "integer", "null", "number", "object", "string",
];

/// Draft-07 string formats with shortcut names.
pub const FORMATS: &[&str] = &[
    "date-time",
    "date",
    "time",
    "email",
    "idn-email",
    "hostname",
    "idn-hostname",
    "ipv4",
    "ipv6",
    "uri",
    "uri-reference",
    "iri",
    "iri-reference",
    "uri-template",
    "json-pointer",
    "relative-json-pointer",
    "regex",
];

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A built-in type shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// One of [`SIMPLE_TYPES`].
    Type(&'static str),
    /// Adds `null` to the types.
    Nullable,
    /// An object rejecting undeclared properties.
    Struct,
    /// A string with one of [`FORMATS`]. Looked up with `_` in place of `-`
    /// (`date_time`) or by the format name itself.
    Format(&'static str),
    Anything,
    Nothing,
}

impl Builtin {
    /// Find a shortcut by name.
    pub fn lookup(name: &str) -> Option<Builtin> {
        if let Some(t) = SIMPLE_TYPES.iter().find(|t| **t == name) {
            return Some(Builtin::Type(*t));
        }
        match name {
            "nullable" => Some(Builtin::Nullable),
            "struct" => Some(Builtin::Struct),
            "anything" => Some(Builtin::Anything),
            "nothing" => Some(Builtin::Nothing),
            _ => FORMATS
                .iter()
                .find(|f| **f == name || f.replace('-', "_") == name)
                .map(|f| Builtin::Format(*f)),
        }
    }

    pub fn apply<'a>(self, schema: SchemaMut<'a>) -> Result<SchemaMut<'a>, SchemaError> {
        match self {
            Builtin::Type(t) => schema.types([t]),
            Builtin::Nullable => schema.nullable(),
            Builtin::Struct => schema.strict_object(),
            Builtin::Format(f) => schema.string()?.format(f),
            Builtin::Anything => Ok(schema),
            Builtin::Nothing => schema.nothing(),
        }
    }
}

/// Signature of custom type handlers.
pub type TypeFn =
    dyn for<'a> Fn(SchemaMut<'a>) -> Result<SchemaMut<'a>, SchemaError> + Send + Sync;

/// What a type name resolves to.
#[derive(Clone)]
pub enum TypeHandler {
    Builtin(Builtin),
    Custom(Arc<TypeFn>),
    /// A reference to a schema elsewhere.
    Reference(SchemaUri),
}

impl TypeHandler {
    pub fn apply<'a>(&self, schema: SchemaMut<'a>) -> Result<SchemaMut<'a>, SchemaError> {
        match self {
            TypeHandler::Builtin(builtin) => builtin.apply(schema),
            TypeHandler::Custom(handler) => handler(schema),
            TypeHandler::Reference(uri) => schema.ref_uri(uri.clone()),
        }
    }
}

impl fmt::Debug for TypeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeHandler::Builtin(builtin) => f.debug_tuple("Builtin").field(builtin).finish(),
            TypeHandler::Custom(_) => f.write_str("Custom(..)"),
            TypeHandler::Reference(uri) => f.debug_tuple("Reference").field(uri).finish(),
        }
    }
}

/// Named types: built-ins first, then registered ones.
///
/// Built-in names cannot be shadowed.
///
/// ```
/// use schema_forge::{SchemaArena, TypeRegistry};
/// use serde_json::json;
///
/// # fn main() -> Result<(), schema_forge::SchemaError> {
/// let mut types = TypeRegistry::new();
/// types.register("slug", |s| s.pattern("^[a-z0-9-]+$"));
/// types.register_ref("uuid", "http://example.com/uuid")?;
///
/// let mut arena = SchemaArena::new();
/// let slug = arena.schema().declare(&types, "slug")?.id();
/// let uuid = arena.schema().declare(&types, "uuid")?.id();
/// let email = arena.schema().declare(&types, "email")?.id();
///
/// assert_eq!(arena.as_json(slug)?, json!({"type": "string", "pattern": "^[a-z0-9-]+$"}));
/// assert_eq!(arena.as_json(uuid)?, json!({"$ref": "http://example.com/uuid#"}));
/// assert_eq!(arena.as_json(email)?, json!({"type": "string", "format": "email"}));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct TypeRegistry {
    custom: IndexMap<String, TypeHandler>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler that declares the type on a schema.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: for<'a> Fn(SchemaMut<'a>) -> Result<SchemaMut<'a>, SchemaError> + Send + Sync + 'static,
    {
        self.custom
            .insert(name.into(), TypeHandler::Custom(Arc::new(handler)));
        self
    }

    /// Register a type that references the schema at `uri`.
    pub fn register_ref(
        &mut self,
        name: impl Into<String>,
        uri: &str,
    ) -> Result<&mut Self, SchemaError> {
        let uri = SchemaUri::parse(uri)?;
        self.custom.insert(name.into(), TypeHandler::Reference(uri));
        Ok(self)
    }

    pub fn lookup(&self, name: &str) -> Option<TypeHandler> {
        Builtin::lookup(name)
            .map(TypeHandler::Builtin)
            .or_else(|| self.custom.get(name).cloned())
    }

    /// Names of the registered (non built-in) types.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.custom.keys().map(String::as_str)
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaArena;
    use serde_json::json;

    #[test]
    fn builtin_lookup() {
        assert_eq!(Builtin::lookup("string"), Some(Builtin::Type("string")));
        assert_eq!(Builtin::lookup("date_time"), Some(Builtin::Format("date-time")));
        assert_eq!(Builtin::lookup("date-time"), Some(Builtin::Format("date-time")));
        assert_eq!(Builtin::lookup("struct"), Some(Builtin::Struct));
        assert_eq!(Builtin::lookup("uuid"), None);
    }

    #[test]
    fn builtins_apply() {
        let mut arena = SchemaArena::new();
        let ipv4 = Builtin::Format("ipv4").apply(arena.schema()).unwrap().id();
        assert_eq!(arena.as_json(ipv4).unwrap(), json!({"type": "string", "format": "ipv4"}));

        let record = Builtin::Struct.apply(arena.schema()).unwrap().id();
        assert_eq!(
            arena.as_json(record).unwrap(),
            json!({"type": "object", "additionalProperties": false})
        );

        let never = Builtin::Nothing.apply(arena.schema()).unwrap().id();
        assert_eq!(arena.as_json(never).unwrap(), json!(false));
    }

    #[test]
    fn builtins_cannot_be_shadowed() {
        let mut types = TypeRegistry::new();
        types.register("string", |s| s.integer());
        let mut arena = SchemaArena::new();
        let id = arena.schema().declare(&types, "string").unwrap().id();
        assert_eq!(arena.as_json(id).unwrap(), json!({"type": "string"}));
        assert_eq!(types.names().collect::<Vec<_>>(), ["string"]);
    }

    #[test]
    fn unknown_types_are_rejected() {
        let types = TypeRegistry::new();
        let mut arena = SchemaArena::new();
        let result = arena.schema().declare(&types, "widget");
        assert!(matches!(
            result,
            Err(SchemaError::InvalidPropertyValue { .. })
        ));
    }

    #[test]
    fn json_type_names() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!([1])), "array");
        assert_eq!(json_type_name(&json!({"a": 1})), "object");
    }
}
