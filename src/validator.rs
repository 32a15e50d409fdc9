//! Instance validation through the `jsonschema` crate.
//!
//! Schemas are rendered to draft-07 JSON and compiled by `jsonschema`.
//! References the document cannot satisfy itself are fetched from a list
//! of [`SchemaSource`]s, asked in order.

use std::sync::Arc;

use jsonschema::{Draft, Retrieve, Uri};
use serde_json::Value;
use tracing::debug;

use crate::error::{ValidateError, ValidationIssue};
use crate::file_map::FileMap;
use crate::index::{Index, SchemaWithUri};
use crate::uri::SchemaUri;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Somewhere referenced schema documents can be looked up.
pub trait SchemaSource: Send + Sync {
    /// The rendered document at `uri`, or `None` if this source does not
    /// know it.
    fn lookup(&self, uri: &SchemaUri) -> Result<Option<Value>, ValidateError>;
}

impl SchemaSource for Index {
    fn lookup(&self, uri: &SchemaUri) -> Result<Option<Value>, ValidateError> {
        Ok(self.resolve(uri)?.map(|entry| entry.as_json()))
    }
}

impl SchemaSource for FileMap {
    fn lookup(&self, uri: &SchemaUri) -> Result<Option<Value>, ValidateError> {
        if !self.covers(uri) {
            return Ok(None);
        }
        Ok(self
            .resolve(&uri.to_string())?
            .map(|entry| entry.as_json()))
    }
}

/// Fetches schema documents over HTTP(S).
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "remote")]
impl HttpSource {
    /// # Errors
    ///
    /// Returns `ValidateError::NetworkError` if the HTTP client cannot be
    /// built.
    pub fn new() -> Result<Self, ValidateError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|source| ValidateError::NetworkError {
                url: String::new(),
                source,
            })?;
        Ok(Self { client })
    }
}

#[cfg(feature = "remote")]
impl SchemaSource for HttpSource {
    fn lookup(&self, uri: &SchemaUri) -> Result<Option<Value>, ValidateError> {
        let Some(url) = uri.as_url() else {
            return Ok(None);
        };
        if url.scheme() != "http" && url.scheme() != "https" {
            return Ok(None);
        }
        let url = uri.reference().to_string();
        let network_error = |source| ValidateError::NetworkError {
            url: url.clone(),
            source,
        };

        debug!(url = %url, "fetching schema");
        let response = self.client.get(&url).send().map_err(network_error)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status().map_err(network_error)?;
        response.json().map(Some).map_err(network_error)
    }
}

/// An HTTP(S) source, if this build supports one.
///
/// # Errors
///
/// Returns `ValidateError::Unavailable` when built without the `remote`
/// feature.
pub fn http_source() -> Result<Arc<dyn SchemaSource>, ValidateError> {
    #[cfg(feature = "remote")]
    {
        Ok(Arc::new(HttpSource::new()?))
    }
    #[cfg(not(feature = "remote"))]
    {
        Err(ValidateError::Unavailable { feature: "remote" })
    }
}

struct SourceRetriever {
    sources: Vec<Arc<dyn SchemaSource>>,
}

impl Retrieve for SourceRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri = SchemaUri::parse(uri.as_str())?;
        for source in &self.sources {
            if let Some(document) = source.lookup(&uri)? {
                debug!(uri = %uri, "retrieved referenced schema");
                return Ok(document);
            }
        }
        Err(format!("no schema source provides {}", uri).into())
    }
}

/// A compiled schema ready to validate instances.
pub struct Validator {
    inner: jsonschema::Validator,
}

impl Validator {
    /// Compile a rendered schema document.
    ///
    /// # Errors
    ///
    /// Returns `ValidateError::InvalidSchema` if `jsonschema` rejects the
    /// document or cannot retrieve a reference.
    pub fn new(document: &Value, sources: Vec<Arc<dyn SchemaSource>>) -> Result<Self, ValidateError> {
        let inner = jsonschema::options()
            .with_draft(Draft::Draft7)
            .with_retriever(SourceRetriever { sources })
            .build(document)
            .map_err(|e| ValidateError::InvalidSchema {
                message: e.to_string(),
            })?;
        Ok(Self { inner })
    }

    /// Compile a schema rendered at its own URI.
    pub fn for_schema(
        schema: &SchemaWithUri,
        sources: Vec<Arc<dyn SchemaSource>>,
    ) -> Result<Self, ValidateError> {
        Self::new(&schema.as_json(), sources)
    }

    /// Check `instance`, collecting every failure.
    ///
    /// # Errors
    ///
    /// Returns `ValidateError::Invalid` listing each failure.
    pub fn validate(&self, instance: &Value) -> Result<(), ValidateError> {
        let errors: Vec<ValidationIssue> = self
            .inner
            .iter_errors(instance)
            .map(|e| ValidationIssue {
                path: e.instance_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidateError::Invalid { errors })
        }
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.inner.is_valid(instance)
    }
}

/// Validate `instance` against `schema` in one go.
pub fn validate(
    schema: &SchemaWithUri,
    instance: &Value,
    sources: Vec<Arc<dyn SchemaSource>>,
) -> Result<(), ValidateError> {
    Validator::for_schema(schema, sources)?.validate(instance)
}
