//! Schema Forge
//!
//! Build, normalize and index draft-07 JSON Schemas.
//!
//! Schemas are graphs: a node may appear under several parents, or under
//! itself. Rendering walks the graph once and writes every repeat visit as
//! a `$ref` back to the place the node was first written, so any graph
//! (cyclic ones included) becomes a finite, canonically ordered document.
//!
//! # Example
//!
//! ```
//! use schema_forge::{Index, SchemaArena, SchemaUri};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), schema_forge::SchemaError> {
//! let mut arena = SchemaArena::new();
//! let name = arena.schema().string()?.min_length(1)?.id();
//! let person = arena
//!     .schema()
//!     .object()?
//!     .define("name", name)?
//!     .required_property("first", name)?
//!     .property("last", name)?
//!     .id();
//!
//! assert_eq!(
//!     arena.as_json(person)?,
//!     json!({
//!         "definitions": {"name": {"type": "string", "minLength": 1}},
//!         "type": "object",
//!         "properties": {
//!             "first": {"$ref": "#/definitions/name"},
//!             "last": {"$ref": "#/definitions/name"}
//!         },
//!         "required": ["first"]
//!     })
//! );
//!
//! let mut index = Index::new();
//! index.add(SchemaUri::parse("http://example.com/person")?, arena.finish(person)?)?;
//! let found = index
//!     .resolve(&SchemaUri::parse("http://example.com/person#/definitions/name")?)?
//!     .unwrap();
//! assert_eq!(found.schema().as_json(), json!({"type": "string", "minLength": 1}));
//! # Ok(())
//! # }
//! ```
//!
//! # Key order
//!
//! Object keys are always written in the order of [`PROPERTIES`], whatever
//! order they were declared in.
//!
//! # Loading and validating
//!
//! [`FileMap`] serves a directory of JSON or YAML schema files under a base
//! URI. [`Validator`] compiles a rendered schema with the `jsonschema`
//! crate and pulls referenced documents from any [`SchemaSource`].

mod container;
mod declare;
mod error;
mod file_map;
mod import;
mod index;
mod operators;
mod pointer;
mod render;
mod schema;
mod types;
mod uri;
mod validator;

pub use container::{JsonArray, JsonObject, Member};
pub use declare::{NumberArg, PropertyKey, SchemaLike, SchemaMut};
pub use error::{LoadError, SchemaError, ValidateError, ValidationIssue};
pub use file_map::{FileMap, FileMapOptions, JsonLoader, Loader, YamlLoader};
pub use index::{Index, SchemaWithUri};
pub use pointer::{Pointer, PointerStep};
pub use schema::{property_rank, Schema, SchemaArena, SchemaId, SchemaNode, DRAFT_07, PROPERTIES};
pub use types::{json_type_name, Builtin, TypeFn, TypeHandler, TypeRegistry, FORMATS, SIMPLE_TYPES};
pub use uri::SchemaUri;
pub use validator::{http_source, validate, SchemaSource, Validator};

#[cfg(feature = "remote")]
pub use validator::HttpSource;
