//! JSON Pointers (RFC 6901).
//!
//! A [`Pointer`] is an immutable list of unescaped segments. Every operation
//! returns a new pointer.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::SchemaError;
use crate::types::json_type_name;

/// An RFC 6901 JSON Pointer.
///
/// ```
/// use schema_forge::Pointer;
///
/// let pointer = Pointer::parse("/f~0o/b~1r").unwrap();
/// assert_eq!(pointer.segments(), ["f~o", "b/r"]);
/// assert_eq!(pointer.to_string(), "/f~0o/b~1r");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Pointer {
    segments: Vec<String>,
}

/// Something that can be appended to a [`Pointer`] with [`Pointer::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerStep {
    /// A pointer string; a missing leading `/` is added.
    Str(String),
    /// Another pointer.
    Pointer(Pointer),
    /// An array index. Negative values remove trailing segments instead.
    Index(i64),
    /// Raw, already unescaped segments.
    Segments(Vec<String>),
}

impl Pointer {
    /// The empty pointer, addressing the whole document.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a pointer from unescaped segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a pointer string.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::BadArgument` unless the string is empty or
    /// starts with `/`.
    pub fn parse(path: &str) -> Result<Self, SchemaError> {
        if path.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = path.strip_prefix('/') else {
            return Err(SchemaError::bad_argument(format!(
                "JSON pointers should start with /, got \"{}\"",
                path
            )));
        };
        Ok(Self {
            segments: rest.split('/').map(unescape).collect(),
        })
    }

    /// The unescaped segments of this pointer.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Append a single unescaped segment.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Make a new pointer by appending `step` to this one.
    ///
    /// Strings are parsed as pointers (prefixed with `/` when needed),
    /// integers become index segments, and negative integers shed that many
    /// trailing segments.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::BadArgument` when a negative index sheds more
    /// segments than the pointer has.
    pub fn join(&self, step: impl Into<PointerStep>) -> Result<Self, SchemaError> {
        let tail = match step.into() {
            PointerStep::Index(index) if index < 0 => {
                let count = usize::try_from(index.unsigned_abs())
                    .map_err(|_| SchemaError::bad_argument("Out of range"))?;
                return self.shed(count);
            }
            PointerStep::Index(index) => vec![index.to_string()],
            PointerStep::Str(s) if s.starts_with('/') => Self::parse(&s)?.segments,
            PointerStep::Str(s) => Self::parse(&format!("/{}", s))?.segments,
            PointerStep::Pointer(other) => other.segments,
            PointerStep::Segments(segments) => segments,
        };
        let mut segments = self.segments.clone();
        segments.extend(tail);
        Ok(Self { segments })
    }

    /// Make a new pointer with `count` trailing segments removed.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::BadArgument` if `count` exceeds the length.
    pub fn shed(&self, count: usize) -> Result<Self, SchemaError> {
        if count > self.segments.len() {
            return Err(SchemaError::bad_argument(format!(
                "Out of range: cannot shed {} segment(s) from \"{}\"",
                count, self
            )));
        }
        Ok(Self {
            segments: self.segments[..self.segments.len() - count].to_vec(),
        })
    }

    /// Return what remains of this pointer after removing `prefix`.
    ///
    /// Matching is segment-wise, so `/foo/bar` is not a prefix of `/foo/barn`.
    ///
    /// ```
    /// use schema_forge::Pointer;
    ///
    /// let pointer = Pointer::parse("/foo/bar/baz").unwrap();
    /// let prefix = Pointer::parse("/foo").unwrap();
    /// assert_eq!(pointer.remove_prefix(&prefix).unwrap().to_string(), "/bar/baz");
    /// ```
    pub fn remove_prefix(&self, prefix: &Pointer) -> Option<Self> {
        self.segments
            .strip_prefix(prefix.segments.as_slice())
            .map(|rest| Self {
                segments: rest.to_vec(),
            })
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", escape(segment))?;
        }
        Ok(())
    }
}

impl FromStr for Pointer {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&Value> for Pointer {
    type Error = SchemaError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(String::from).ok_or_else(|| {
                        SchemaError::wrong_type(format!(
                            "Expected pointer segment to be a string, got {}",
                            json_type_name(item)
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|segments| Self { segments }),
            other => Err(SchemaError::wrong_type(format!(
                "Unexpected {} for a JSON pointer",
                json_type_name(other)
            ))),
        }
    }
}

impl serde::Serialize for Pointer {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<&str> for PointerStep {
    fn from(s: &str) -> Self {
        PointerStep::Str(s.to_string())
    }
}

impl From<String> for PointerStep {
    fn from(s: String) -> Self {
        PointerStep::Str(s)
    }
}

impl From<Pointer> for PointerStep {
    fn from(pointer: Pointer) -> Self {
        PointerStep::Pointer(pointer)
    }
}

impl From<&Pointer> for PointerStep {
    fn from(pointer: &Pointer) -> Self {
        PointerStep::Pointer(pointer.clone())
    }
}

impl From<i32> for PointerStep {
    fn from(index: i32) -> Self {
        PointerStep::Index(i64::from(index))
    }
}

impl From<i64> for PointerStep {
    fn from(index: i64) -> Self {
        PointerStep::Index(index)
    }
}

impl From<usize> for PointerStep {
    fn from(index: usize) -> Self {
        PointerStep::Segments(vec![index.to_string()])
    }
}

impl From<Vec<String>> for PointerStep {
    fn from(segments: Vec<String>) -> Self {
        PointerStep::Segments(segments)
    }
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}
