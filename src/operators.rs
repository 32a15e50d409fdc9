//! Logical combination of schemas.
//!
//! Each operator adds new nodes and returns the id of the result; operands
//! are shared, not copied.

use crate::container::Member;
use crate::error::SchemaError;
use crate::schema::{SchemaArena, SchemaId};

impl SchemaArena {
    /// The opposite of `id`.
    ///
    /// Absolutes swap, and a node holding only `not` unwraps, so negating
    /// twice gives back an equal schema.
    pub fn negated(&mut self, id: SchemaId) -> Result<SchemaId, SchemaError> {
        let node = self.get(id).ok_or_else(|| unknown(id))?;
        if node.is_nothing() {
            return Ok(self.anything());
        }
        if node.is_anything() {
            return Ok(self.nothing());
        }
        if only_key(self, id, "not") {
            if let Some(Member::Schema(inner)) = node.get("not") {
                return Ok(*inner);
            }
        }
        Ok(self.schema().not(id)?.id())
    }

    /// `allOf` of two schemas.
    pub fn and(&mut self, a: SchemaId, b: SchemaId) -> Result<SchemaId, SchemaError> {
        self.combine("allOf", a, b)
    }

    /// `anyOf` of two schemas.
    pub fn or(&mut self, a: SchemaId, b: SchemaId) -> Result<SchemaId, SchemaError> {
        self.combine("anyOf", a, b)
    }

    /// `oneOf` of two schemas.
    pub fn xor(&mut self, a: SchemaId, b: SchemaId) -> Result<SchemaId, SchemaError> {
        self.combine("oneOf", a, b)
    }

    fn combine(&mut self, name: &str, a: SchemaId, b: SchemaId) -> Result<SchemaId, SchemaError> {
        self.check_id(a)?;
        self.check_id(b)?;
        if self.equals(a, b)? {
            return Ok(a);
        }
        let mut operands = vec![a];
        if only_key(self, a, name) {
            if let Some(Member::Array(existing)) = self.node(a).get(name) {
                operands = existing.iter().filter_map(Member::as_schema).collect();
            }
        }
        operands.push(b);
        Ok(self.schema().composite(name, operands)?.id())
    }
}

fn only_key(arena: &SchemaArena, id: SchemaId, key: &str) -> bool {
    let body = arena.node(id).body();
    body.len() == 1 && body.contains_key(key)
}

fn unknown(id: SchemaId) -> SchemaError {
    SchemaError::bad_argument(format!(
        "Schema #{} does not belong to this arena",
        id.index()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn string_schema(arena: &mut SchemaArena) -> SchemaId {
        arena.schema().string().unwrap().id()
    }

    fn non_empty_string(arena: &mut SchemaArena) -> SchemaId {
        arena.schema().string().unwrap().min_length(1).unwrap().id()
    }

    #[test]
    fn double_negation_is_identity() {
        let mut arena = SchemaArena::new();
        let s = string_schema(&mut arena);
        let not_s = arena.negated(s).unwrap();
        assert_eq!(arena.as_json(not_s).unwrap(), json!({"not": {"type": "string"}}));
        let back = arena.negated(not_s).unwrap();
        assert!(arena.equals(back, s).unwrap());
    }

    #[test]
    fn negation_swaps_absolutes() {
        let mut arena = SchemaArena::new();
        let anything = arena.anything();
        let nothing = arena.nothing();
        let negated_nothing = arena.negated(nothing).unwrap();
        let negated_anything = arena.negated(anything).unwrap();
        assert_eq!(arena.as_json(negated_nothing).unwrap(), json!(true));
        assert_eq!(arena.as_json(negated_anything).unwrap(), json!(false));
    }

    #[test]
    fn and_flattens_left_composite() {
        let mut arena = SchemaArena::new();
        let a = string_schema(&mut arena);
        let b = non_empty_string(&mut arena);
        let c = arena.schema().integer().unwrap().id();

        let ab = arena.and(a, b).unwrap();
        let abc = arena.and(ab, c).unwrap();

        let manual = {
            let a = string_schema(&mut arena);
            let b = non_empty_string(&mut arena);
            let c = arena.schema().integer().unwrap().id();
            arena.schema().all_of([a, b, c]).unwrap().id()
        };
        assert_eq!(arena.as_json(abc).unwrap(), arena.as_json(manual).unwrap());
        assert_eq!(arena.as_json(abc).unwrap()["allOf"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn identical_operands_collapse() {
        let mut arena = SchemaArena::new();
        let a = string_schema(&mut arena);
        let b = string_schema(&mut arena);
        assert_eq!(arena.and(a, a).unwrap(), a);
        assert_eq!(arena.or(a, b).unwrap(), a);
    }

    #[test]
    fn or_and_xor_use_their_keywords() {
        let mut arena = SchemaArena::new();
        let a = string_schema(&mut arena);
        let b = arena.schema().null().unwrap().id();
        let or = arena.or(a, b).unwrap();
        let xor = arena.xor(a, b).unwrap();
        assert_eq!(
            arena.as_json(or).unwrap(),
            json!({"anyOf": [{"type": "string"}, {"type": "null"}]})
        );
        assert_eq!(
            arena.as_json(xor).unwrap(),
            json!({"oneOf": [{"type": "string"}, {"type": "null"}]})
        );
    }

    #[test]
    fn absolutes_cannot_be_combined() {
        let mut arena = SchemaArena::new();
        let a = string_schema(&mut arena);
        let anything = arena.anything();
        assert!(matches!(
            arena.and(a, anything),
            Err(SchemaError::InvalidPropertyValue { .. })
        ));
    }
}
