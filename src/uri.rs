//! Schema URIs: URIs whose fragment is read as a JSON Pointer.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::error::SchemaError;
use crate::pointer::{Pointer, PointerStep};

/// Characters escaped when a pointer is written into a fragment. Everything
/// outside the RFC 3986 `fragment` production is escaped, plus `%` and `#`.
const FRAGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b'-')
    .remove(b'.')
    .remove(b'/')
    .remove(b':')
    .remove(b';')
    .remove(b'=')
    .remove(b'?')
    .remove(b'@')
    .remove(b'_')
    .remove(b'~');

/// A URI identifying a schema or a location inside one.
///
/// Absolute URIs are backed by [`url::Url`]. Relative references keep their
/// text and only resolve once joined to an absolute base.
///
/// ```
/// use schema_forge::SchemaUri;
///
/// let uri = SchemaUri::parse("http://example.com/user").unwrap();
/// assert_eq!(uri.to_string(), "http://example.com/user#");
///
/// let items = uri.join_pointer("properties").unwrap().join_pointer("id").unwrap();
/// assert_eq!(items.to_string(), "http://example.com/user#/properties/id");
/// assert_eq!(uri.route_to(&items).to_string(), "#/properties/id");
/// ```
#[derive(Debug, Clone)]
pub struct SchemaUri {
    repr: Repr,
}

#[derive(Debug, Clone)]
enum Repr {
    Absolute(Url),
    Relative {
        reference: String,
        fragment: Option<String>,
    },
}

impl SchemaUri {
    /// Parse a URI. A missing fragment defaults to the empty fragment.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::BadArgument` for malformed absolute URIs.
    pub fn parse(uri: &str) -> Result<Self, SchemaError> {
        let mut parsed = Self::parse_raw(uri)?;
        if parsed.fragment().is_none() {
            parsed.set_fragment(Some(""));
        }
        Ok(parsed)
    }

    /// Parse a URI used as a base directory: its path always ends with `/`
    /// and no fragment is added.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::BadArgument` for malformed absolute URIs.
    pub fn container(uri: &str) -> Result<Self, SchemaError> {
        let mut parsed = Self::parse_raw(uri)?;
        match &mut parsed.repr {
            Repr::Absolute(url) => {
                if !url.path().ends_with('/') {
                    let path = format!("{}/", url.path());
                    url.set_path(&path);
                }
            }
            Repr::Relative { reference, .. } => {
                if !reference.ends_with('/') {
                    reference.push('/');
                }
            }
        }
        Ok(parsed)
    }

    /// The empty same-document reference, `#`.
    pub fn local() -> Self {
        Self {
            repr: Repr::Relative {
                reference: String::new(),
                fragment: Some(String::new()),
            },
        }
    }

    /// Wrap an absolute [`Url`], defaulting its fragment to empty.
    pub fn from_url(mut url: Url) -> Self {
        if url.fragment().is_none() {
            url.set_fragment(Some(""));
        }
        Self {
            repr: Repr::Absolute(url),
        }
    }

    fn parse_raw(uri: &str) -> Result<Self, SchemaError> {
        match Url::parse(uri) {
            Ok(url) => Ok(Self {
                repr: Repr::Absolute(url),
            }),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let (reference, fragment) = match uri.split_once('#') {
                    Some((reference, fragment)) => (reference, Some(fragment.to_string())),
                    None => (uri, None),
                };
                Ok(Self {
                    repr: Repr::Relative {
                        reference: reference.to_string(),
                        fragment,
                    },
                })
            }
            Err(e) => Err(SchemaError::bad_argument(format!(
                "Invalid URI \"{}\": {}",
                uri, e
            ))),
        }
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self.repr, Repr::Absolute(_))
    }

    pub fn is_relative(&self) -> bool {
        !self.is_absolute()
    }

    /// The backing URL of an absolute URI.
    pub fn as_url(&self) -> Option<&Url> {
        match &self.repr {
            Repr::Absolute(url) => Some(url),
            Repr::Relative { .. } => None,
        }
    }

    /// The raw (still percent-encoded) fragment.
    pub fn fragment(&self) -> Option<&str> {
        match &self.repr {
            Repr::Absolute(url) => url.fragment(),
            Repr::Relative { fragment, .. } => fragment.as_deref(),
        }
    }

    /// Everything before the fragment.
    pub fn reference(&self) -> &str {
        match &self.repr {
            Repr::Absolute(url) => &url[..url::Position::AfterQuery],
            Repr::Relative { reference, .. } => reference,
        }
    }

    fn set_fragment(&mut self, value: Option<&str>) {
        match &mut self.repr {
            Repr::Absolute(url) => url.set_fragment(value),
            Repr::Relative { fragment, .. } => *fragment = value.map(String::from),
        }
    }

    /// The fragment decoded as a JSON Pointer.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::BadArgument` if the fragment is not a pointer
    /// (for example a plain-name anchor) or is not valid UTF-8.
    pub fn pointer(&self) -> Result<Pointer, SchemaError> {
        let fragment = self.fragment().unwrap_or("");
        let decoded = percent_decode_str(fragment).decode_utf8().map_err(|_| {
            SchemaError::bad_argument(format!("Fragment of {} is not valid UTF-8", self))
        })?;
        Pointer::parse(&decoded)
    }

    /// A copy of this URI whose fragment is the given pointer.
    pub fn with_pointer(&self, pointer: &Pointer) -> Self {
        let encoded = utf8_percent_encode(&pointer.to_string(), FRAGMENT).to_string();
        let mut uri = self.clone();
        uri.set_fragment(Some(&encoded));
        uri
    }

    /// Append to the fragment pointer.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::BadArgument` if the current fragment is not a
    /// pointer or the step sheds too many segments.
    pub fn join_pointer(&self, step: impl Into<PointerStep>) -> Result<Self, SchemaError> {
        let pointer = self.pointer()?.join(step)?;
        Ok(self.with_pointer(&pointer))
    }

    /// This URI with an empty fragment: the document that contains it.
    pub fn document(&self) -> Self {
        let mut uri = self.clone();
        uri.set_fragment(Some(""));
        uri
    }

    /// Resolve `other` as a reference against this URI (RFC 3986 §5).
    ///
    /// The result's fragment defaults to empty.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::BadArgument` if `other` cannot be resolved.
    pub fn join(&self, other: &str) -> Result<Self, SchemaError> {
        let mut joined = match &self.repr {
            Repr::Absolute(url) => {
                let url = url.join(other).map_err(|e| {
                    SchemaError::bad_argument(format!(
                        "Cannot resolve \"{}\" against {}: {}",
                        other, self, e
                    ))
                })?;
                Self {
                    repr: Repr::Absolute(url),
                }
            }
            Repr::Relative { reference, .. } => {
                let other = Self::parse_raw(other)?;
                match other.repr {
                    Repr::Absolute(_) => other,
                    Repr::Relative {
                        reference: other_reference,
                        fragment,
                    } => Self {
                        repr: Repr::Relative {
                            reference: merge_relative(reference, &other_reference),
                            fragment,
                        },
                    },
                }
            }
        };
        if joined.fragment().is_none() {
            joined.set_fragment(Some(""));
        }
        Ok(joined)
    }

    /// Resolve another schema URI against this one.
    ///
    /// # Errors
    ///
    /// See [`SchemaUri::join`].
    pub fn join_uri(&self, other: &SchemaUri) -> Result<Self, SchemaError> {
        self.join(&other.to_string())
    }

    /// The shortest reference that resolves to `target` from this URI.
    ///
    /// Falls back to `target` itself when no relative form exists, e.g.
    /// when either side is relative or the hosts differ.
    pub fn route_to(&self, target: &SchemaUri) -> SchemaUri {
        let (Repr::Absolute(base), Repr::Absolute(url)) = (&self.repr, &target.repr) else {
            return target.clone();
        };
        match base.make_relative(url) {
            Some(relative) => Self::parse_raw(&relative).unwrap_or_else(|_| target.clone()),
            None => target.clone(),
        }
    }

    /// Render this URI as seen from `base`, the way `$ref` values are
    /// written: relative when `base` is absolute, verbatim otherwise.
    pub fn relative_to(&self, base: &SchemaUri) -> String {
        if base.is_relative() {
            return self.to_string();
        }
        match base.join_uri(self) {
            Ok(absolute) => base.route_to(&absolute).to_string(),
            Err(_) => self.to_string(),
        }
    }
}

/// Merge two relative references without a base (RFC 3986 §5.2.3 minus
/// dot-segment removal, which needs an absolute base).
fn merge_relative(base: &str, other: &str) -> String {
    if other.is_empty() {
        return base.to_string();
    }
    if other.starts_with('/') || base.is_empty() {
        return other.to_string();
    }
    match base.rfind('/') {
        Some(idx) => format!("{}{}", &base[..=idx], other),
        None => other.to_string(),
    }
}

impl fmt::Display for SchemaUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Absolute(url) => f.write_str(url.as_str()),
            Repr::Relative {
                reference,
                fragment,
            } => {
                f.write_str(reference)?;
                if let Some(fragment) = fragment {
                    write!(f, "#{}", fragment)?;
                }
                Ok(())
            }
        }
    }
}

impl PartialEq for SchemaUri {
    fn eq(&self, other: &Self) -> bool {
        self.is_absolute() == other.is_absolute() && self.to_string() == other.to_string()
    }
}

impl Eq for SchemaUri {}

impl Hash for SchemaUri {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_absolute().hash(state);
        self.to_string().hash(state);
    }
}

impl FromStr for SchemaUri {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for SchemaUri {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
