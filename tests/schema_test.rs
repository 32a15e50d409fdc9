//! Integration tests for building, rendering and indexing schemas.

use schema_forge::{
    Index, JsonObject, Pointer, Schema, SchemaArena, SchemaError, SchemaUri, SchemaWithUri,
    DRAFT_07,
};
use serde_json::json;

fn uri(s: &str) -> SchemaUri {
    SchemaUri::parse(s).unwrap()
}

mod pointers {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        for source in ["", "/foo/bar", "/f~0ob~1r", "/a/0/", "/~01"] {
            assert_eq!(Pointer::parse(source).unwrap().to_string(), source);
        }
        assert_eq!(Pointer::parse("/f~0ob~1r").unwrap().segments(), ["f~ob/r"]);
        assert_eq!(Pointer::parse("/~01").unwrap().segments(), ["~1"]);
    }

    #[test]
    fn join_and_shed() {
        let pointer = Pointer::parse("/a/b").unwrap();
        assert_eq!(pointer.join("c/d").unwrap().to_string(), "/a/b/c/d");
        assert_eq!(pointer.join(3).unwrap().to_string(), "/a/b/3");
        assert_eq!(pointer.join(-1).unwrap().to_string(), "/a");
        assert!(pointer.join(-3).is_err());
    }
}

mod declarations {
    use super::*;

    #[test]
    fn end_to_end_object_renders_canonically() {
        let mut arena = SchemaArena::new();
        let root = arena
            .schema()
            .additional_properties(false)
            .unwrap()
            .object()
            .unwrap()
            .property_with("id", |id| id.string()?.min_length(2))
            .unwrap()
            .require(["id"])
            .unwrap()
            .id();

        let rendered = serde_json::to_string(&arena.as_json(root).unwrap()).unwrap();
        assert_eq!(
            rendered,
            r#"{"type":"object","properties":{"id":{"type":"string","minLength":2}},"required":["id"],"additionalProperties":false}"#
        );
    }

    #[test]
    fn require_checks_existing_properties_when_closed() {
        let mut arena = SchemaArena::new();
        let result = arena.schema().strict_object().unwrap().require(["foo"]);
        match result {
            Err(SchemaError::InvalidPropertyValue { message }) => {
                assert!(message.contains("existing property"), "{}", message)
            }
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("expected require to fail"),
        }

        let declared = arena
            .schema()
            .strict_object()
            .unwrap()
            .property("foo", true)
            .unwrap()
            .require(["foo"]);
        assert!(declared.is_ok());
    }

    #[test]
    fn references_freeze_their_node() {
        let mut arena = SchemaArena::new();
        let id = arena.schema().ref_("http://example.com/uuid").unwrap().id();
        assert!(matches!(
            arena.edit(id).unwrap().string(),
            Err(SchemaError::Frozen { .. })
        ));

        let populated = arena.schema().string().unwrap().ref_("#/definitions/a");
        match populated {
            Err(SchemaError::InvalidPropertyValue { message }) => {
                assert_eq!(message, "Reference schemas cannot have other properties: type")
            }
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("expected ref to fail"),
        }
    }

    #[test]
    fn ids_from_another_arena_are_bad_arguments() {
        let mut other = SchemaArena::new();
        let foreign = (0..3).map(|_| other.create()).last().unwrap();

        let mut arena = SchemaArena::new();
        let root = arena.schema().array().unwrap().id();
        assert!(matches!(
            arena.as_json(foreign),
            Err(SchemaError::BadArgument { .. })
        ));
        assert!(matches!(
            arena.freeze(foreign),
            Err(SchemaError::BadArgument { .. })
        ));
        assert!(matches!(
            arena.edit(root).unwrap().items(foreign),
            Err(SchemaError::BadArgument { .. })
        ));
        assert_eq!(arena.as_json(root).unwrap(), json!({"type": "array"}));
    }

    #[test]
    fn conditions_and_composites() {
        let mut arena = SchemaArena::new();
        let country = arena.schema().const_(json!("US")).unwrap().id();
        let zip = arena.schema().pattern("^[0-9]{5}$").unwrap().id();
        let root = arena
            .schema()
            .if_(country)
            .unwrap()
            .then(zip)
            .unwrap()
            .else_(true)
            .unwrap()
            .id();
        assert_eq!(
            arena.as_json(root).unwrap(),
            json!({
                "if": {"const": "US"},
                "then": {"type": "string", "pattern": "^[0-9]{5}$"},
                "else": true
            })
        );
    }
}

mod rendering {
    use super::*;

    #[test]
    fn shared_definitions_become_references() {
        let mut arena = SchemaArena::new();
        let root = arena.create();
        let foo = arena.create();
        arena.assign(foo, "const", "foo!").unwrap();

        let mut definitions = JsonObject::new();
        definitions.insert("foo", foo).unwrap();
        arena.assign(root, "definitions", definitions).unwrap();
        arena.assign(root, "type", "object").unwrap();

        let mut properties = JsonObject::new();
        properties.insert("myFoo", foo).unwrap();
        properties.insert("self", root).unwrap();
        arena.assign(root, "properties", properties).unwrap();

        let schema = arena.finish(root).unwrap();
        let expected = json!({
            "$id": "http://example.com/thing#",
            "$schema": DRAFT_07,
            "definitions": {"foo": {"const": "foo!"}},
            "type": "object",
            "properties": {
                "myFoo": {"$ref": "#/definitions/foo"},
                "self": {"$ref": "#"}
            }
        });
        assert_eq!(schema.as_json_with_id(&uri("http://example.com/thing")), expected);
    }

    #[test]
    fn self_including_array_terminates() {
        let mut arena = SchemaArena::new();
        let list = arena.schema().array().unwrap().id();
        arena.edit(list).unwrap().items(list).unwrap();
        let wrapper = arena.schema().object().unwrap().property("list", list).unwrap().id();

        assert_eq!(
            arena.as_json(wrapper).unwrap(),
            json!({
                "type": "object",
                "properties": {
                    "list": {"type": "array", "items": {"$ref": "#/properties/list"}}
                }
            })
        );
    }

    #[test]
    fn negation_is_idempotent() {
        let mut arena = SchemaArena::new();
        let s = arena.schema().integer().unwrap().id();
        let twice = {
            let once = arena.negated(s).unwrap();
            arena.negated(once).unwrap()
        };
        assert_eq!(arena.as_json(twice).unwrap(), arena.as_json(s).unwrap());

        let nothing = arena.nothing();
        let anything = arena.negated(nothing).unwrap();
        assert_eq!(arena.as_json(anything).unwrap(), json!(true));
    }

    #[test]
    fn equality_follows_rendering() {
        let a = Schema::from_json(&json!({"type": "string", "title": "A"})).unwrap();
        let b = Schema::from_json(&json!({"title": "A", "type": "string"})).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_json_string(), r#"{"title":"A","type":"string"}"#);
    }
}

mod indexing {
    use super::*;

    #[test]
    fn fragment_fallback_finds_nested_definitions() {
        let schema = Schema::from_json(&json!({
            "definitions": {"foo": {"type": "integer"}},
            "properties": {"bar": {"$ref": "#/definitions/foo"}}
        }))
        .unwrap();
        let mut index = Index::new();
        index.add(uri("http://example.com/root"), schema).unwrap();

        let found = index
            .resolve(&uri("http://example.com/root#/definitions/foo"))
            .unwrap()
            .unwrap();
        assert_eq!(found.schema().as_json(), json!({"type": "integer"}));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn entries_render_with_their_uri() {
        let entry = SchemaWithUri::new(uri("http://example.com/never"), Schema::nothing());
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"$id": "http://example.com/never#", "$schema": DRAFT_07, "not": true})
        );
    }

    #[test]
    fn references_render_relative_to_their_document() {
        let schema = Schema::from_json(&json!({
            "type": "object",
            "properties": {"id": {"$ref": "http://example.com/types/uuid"}}
        }))
        .unwrap();
        let entry = SchemaWithUri::new(uri("http://example.com/types/user"), schema);
        assert_eq!(entry.as_json()["properties"]["id"], json!({"$ref": "uuid#"}));
    }
}
