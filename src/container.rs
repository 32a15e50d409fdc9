//! Ordered, freezable JSON containers.
//!
//! Schema bodies are [`JsonObject`]s whose members may hold plain JSON,
//! nested containers, references to other schema nodes, or URIs. Plain
//! values come in through `From<serde_json::Value>`; rendering back to plain
//! JSON happens in [`crate::render`], which is where sub-schema members are
//! expanded.

use indexmap::IndexMap;
use serde_json::{Number, Value};

use crate::error::SchemaError;
use crate::schema::SchemaId;
use crate::uri::SchemaUri;

/// A value stored in a container.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Object(JsonObject),
    Array(JsonArray),
    /// A sub-schema, addressed in the owning arena.
    Schema(SchemaId),
    /// A URI, rendered relative to its location (used by `$ref`).
    Uri(SchemaUri),
}

impl Member {
    /// The schema id held by this member, if it is a sub-schema.
    pub fn as_schema(&self) -> Option<SchemaId> {
        match self {
            Member::Schema(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Member::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&JsonObject> {
        match self {
            Member::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&JsonArray> {
        match self {
            Member::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Navigate one pointer segment into an object or array member.
    pub fn dig(&self, segment: &str) -> Option<&Member> {
        match self {
            Member::Object(object) => object.dig(segment),
            Member::Array(array) => array.dig(segment),
            _ => None,
        }
    }

    /// Convert to plain JSON if no sub-schemas are involved.
    ///
    /// URIs are written verbatim.
    pub fn to_plain_value(&self) -> Option<Value> {
        Some(match self {
            Member::Null => Value::Null,
            Member::Bool(b) => Value::Bool(*b),
            Member::Number(n) => Value::Number(n.clone()),
            Member::String(s) => Value::String(s.clone()),
            Member::Uri(uri) => Value::String(uri.to_string()),
            Member::Object(object) => Value::Object(
                object
                    .iter()
                    .map(|(k, v)| v.to_plain_value().map(|v| (k.clone(), v)))
                    .collect::<Option<_>>()?,
            ),
            Member::Array(array) => Value::Array(
                array
                    .iter()
                    .map(Member::to_plain_value)
                    .collect::<Option<_>>()?,
            ),
            Member::Schema(_) => return None,
        })
    }

    fn freeze(&mut self) {
        match self {
            Member::Object(object) => object.freeze(),
            Member::Array(array) => array.freeze(),
            _ => {}
        }
    }
}

impl From<Value> for Member {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Member::Null,
            Value::Bool(b) => Member::Bool(b),
            Value::Number(n) => Member::Number(n),
            Value::String(s) => Member::String(s),
            Value::Array(items) => Member::Array(items.into_iter().map(Member::from).collect()),
            Value::Object(map) => Member::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Member::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for Member {
    fn from(value: &Value) -> Self {
        Member::from(value.clone())
    }
}

impl From<bool> for Member {
    fn from(b: bool) -> Self {
        Member::Bool(b)
    }
}

impl From<&str> for Member {
    fn from(s: &str) -> Self {
        Member::String(s.to_string())
    }
}

impl From<String> for Member {
    fn from(s: String) -> Self {
        Member::String(s)
    }
}

impl From<i64> for Member {
    fn from(n: i64) -> Self {
        Member::Number(n.into())
    }
}

impl From<u64> for Member {
    fn from(n: u64) -> Self {
        Member::Number(n.into())
    }
}

impl From<Number> for Member {
    fn from(n: Number) -> Self {
        Member::Number(n)
    }
}

impl From<SchemaId> for Member {
    fn from(id: SchemaId) -> Self {
        Member::Schema(id)
    }
}

impl From<SchemaUri> for Member {
    fn from(uri: SchemaUri) -> Self {
        Member::Uri(uri)
    }
}

impl From<JsonObject> for Member {
    fn from(object: JsonObject) -> Self {
        Member::Object(object)
    }
}

impl From<JsonArray> for Member {
    fn from(array: JsonArray) -> Self {
        Member::Array(array)
    }
}

/// An insertion-ordered JSON object.
#[derive(Debug, Clone, Default)]
pub struct JsonObject {
    members: IndexMap<String, Member>,
    frozen: bool,
}

impl JsonObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn get(&self, key: &str) -> Option<&Member> {
        self.members.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.members.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Member)> {
        self.members.iter()
    }

    /// Mutable access to a member. Fails if this object is frozen.
    pub fn get_mut(&mut self, key: &str) -> Result<Option<&mut Member>, SchemaError> {
        self.check_frozen()?;
        Ok(self.members.get_mut(key))
    }

    /// Insert or replace a member, keeping the original position of an
    /// existing key.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        member: impl Into<Member>,
    ) -> Result<Option<Member>, SchemaError> {
        self.check_frozen()?;
        Ok(self.members.insert(key.into(), member.into()))
    }

    pub fn remove(&mut self, key: &str) -> Result<Option<Member>, SchemaError> {
        self.check_frozen()?;
        Ok(self.members.shift_remove(key))
    }

    pub fn clear(&mut self) -> Result<(), SchemaError> {
        self.check_frozen()?;
        self.members.clear();
        Ok(())
    }

    /// Reorder members by a rank derived from their keys. Ties keep their
    /// relative order.
    pub(crate) fn sort_by_rank(&mut self, rank: impl Fn(&str) -> usize) {
        self.members.sort_by(|a, _, b, _| rank(a).cmp(&rank(b)));
    }

    /// Freeze this object and every container nested in it.
    pub fn freeze(&mut self) {
        self.frozen = true;
        for member in self.members.values_mut() {
            member.freeze();
        }
    }

    pub fn dig(&self, segment: &str) -> Option<&Member> {
        self.members.get(segment)
    }

    fn check_frozen(&self) -> Result<(), SchemaError> {
        if self.frozen {
            Err(SchemaError::Frozen { what: "object" })
        } else {
            Ok(())
        }
    }
}

impl PartialEq for JsonObject {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl FromIterator<(String, Member)> for JsonObject {
    fn from_iter<I: IntoIterator<Item = (String, Member)>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().collect(),
            frozen: false,
        }
    }
}

/// A JSON array.
#[derive(Debug, Clone, Default)]
pub struct JsonArray {
    items: Vec<Member>,
    frozen: bool,
}

impl JsonArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn get(&self, index: usize) -> Option<&Member> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Member> {
        self.items.iter()
    }

    pub fn contains(&self, member: &Member) -> bool {
        self.items.contains(member)
    }

    pub fn push(&mut self, member: impl Into<Member>) -> Result<(), SchemaError> {
        self.check_frozen()?;
        self.items.push(member.into());
        Ok(())
    }

    pub fn set(&mut self, index: usize, member: impl Into<Member>) -> Result<(), SchemaError> {
        self.check_frozen()?;
        let len = self.items.len();
        let slot = self.items.get_mut(index).ok_or_else(|| {
            SchemaError::bad_argument(format!("Index {} out of range for {} item(s)", index, len))
        })?;
        *slot = member.into();
        Ok(())
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
        for member in &mut self.items {
            member.freeze();
        }
    }

    /// Look up an item by its pointer segment: `0` or a decimal without
    /// leading zeros.
    pub fn dig(&self, segment: &str) -> Option<&Member> {
        if !is_array_index(segment) {
            return None;
        }
        segment.parse::<usize>().ok().and_then(|i| self.items.get(i))
    }

    fn check_frozen(&self) -> Result<(), SchemaError> {
        if self.frozen {
            Err(SchemaError::Frozen { what: "array" })
        } else {
            Ok(())
        }
    }
}

impl PartialEq for JsonArray {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl FromIterator<Member> for JsonArray {
    fn from_iter<I: IntoIterator<Item = Member>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
            frozen: false,
        }
    }
}

impl<'a> IntoIterator for &'a JsonArray {
    type Item = &'a Member;
    type IntoIter = std::slice::Iter<'a, Member>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn is_array_index(segment: &str) -> bool {
    match segment.as_bytes() {
        [b'0'] => true,
        [b'1'..=b'9', rest @ ..] => rest.iter().all(u8::is_ascii_digit),
        _ => false,
    }
}
