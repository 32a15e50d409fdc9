//! Maps a directory of schema files onto URIs.
//!
//! A file at `<dir>/a/b.json` is the schema at `<base-uri>a/b` (plus the
//! configured suffix). Cached maps read every file once when created; live
//! maps go back to disk on every lookup.

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;
use walkdir::WalkDir;

use crate::error::{LoadError, SchemaError};
use crate::index::{Index, SchemaWithUri};
use crate::schema::Schema;
use crate::types::TypeRegistry;
use crate::uri::SchemaUri;

/// Characters escaped in a path segment built from a file name. Matches what
/// `url` escapes when parsing a path, plus the separators, so an indexed URI
/// equals the one a lookup parses.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\')
    .add(b'%');

/// Parses one schema file.
pub trait Loader: Send + Sync {
    /// Load the schema stored at `path`. `types` resolves type names used
    /// in place of schemas, for formats that allow that shorthand.
    fn load(&self, path: &Path, types: &TypeRegistry) -> Result<Schema, LoadError>;
}

/// Loads plain JSON schema documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLoader;

impl Loader for JsonLoader {
    fn load(&self, path: &Path, _types: &TypeRegistry) -> Result<Schema, LoadError> {
        let content = read_file(path)?;
        let value: Value =
            serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Schema::from_json(&value)?)
    }
}

/// Loads YAML schema documents, where a string in schema position names a
/// type from the registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlLoader;

impl Loader for YamlLoader {
    fn load(&self, path: &Path, types: &TypeRegistry) -> Result<Schema, LoadError> {
        let content = read_file(path)?;
        let value: Value =
            serde_yaml::from_str(&content).map_err(|source| LoadError::InvalidYaml {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Schema::from_json_with(&value, types)?)
    }
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

/// Settings for a [`FileMap`].
#[derive(Clone)]
pub struct FileMapOptions {
    live: bool,
    suffix: String,
    loaders: IndexMap<String, Arc<dyn Loader>>,
    types: TypeRegistry,
}

impl Default for FileMapOptions {
    fn default() -> Self {
        let mut loaders: IndexMap<String, Arc<dyn Loader>> = IndexMap::new();
        loaders.insert("json".into(), Arc::new(JsonLoader));
        loaders.insert("yaml".into(), Arc::new(YamlLoader));
        loaders.insert("yml".into(), Arc::new(YamlLoader));
        Self {
            live: false,
            suffix: String::new(),
            loaders,
            types: TypeRegistry::new(),
        }
    }
}

impl FileMapOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read files on every lookup instead of once up front.
    pub fn live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }

    /// Suffix carried by every URI path, e.g. `.json`.
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Parse files with extension `ext` using `loader`. Extensions are tried
    /// in the order they were added.
    pub fn loader(mut self, ext: impl Into<String>, loader: Arc<dyn Loader>) -> Self {
        self.loaders.insert(ext.into(), loader);
        self
    }

    /// Drop every loader, including the defaults.
    pub fn without_loaders(mut self) -> Self {
        self.loaders.clear();
        self
    }

    pub fn types(mut self, types: TypeRegistry) -> Self {
        self.types = types;
        self
    }
}

impl fmt::Debug for FileMapOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileMapOptions")
            .field("live", &self.live)
            .field("suffix", &self.suffix)
            .field("loaders", &self.loaders.keys().collect::<Vec<_>>())
            .field("types", &self.types)
            .finish()
    }
}

/// A directory of schema files addressed by URI.
///
/// ```no_run
/// use schema_forge::{FileMap, FileMapOptions};
///
/// # fn main() -> Result<(), schema_forge::LoadError> {
/// let map = FileMap::new("schemas", Some("http://example.com/"), FileMapOptions::new())?;
/// if let Some(user) = map.resolve("user#/properties/id")? {
///     println!("{}", user.to_json_string());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileMap {
    dir: PathBuf,
    uri: SchemaUri,
    options: FileMapOptions,
    index: Option<Index>,
}

impl FileMap {
    /// Map `dir` onto `base_uri`, or onto the directory's own `file://` URI.
    ///
    /// # Errors
    ///
    /// Fails if `dir` is not a readable directory, if `base_uri` is
    /// malformed, or, for cached maps, if any schema file fails to load.
    pub fn new(
        dir: impl AsRef<Path>,
        base_uri: Option<&str>,
        options: FileMapOptions,
    ) -> Result<Self, LoadError> {
        let dir = dir.as_ref();
        let dir = dir.canonicalize().map_err(|_| LoadError::FileNotFound {
            path: dir.to_path_buf(),
        })?;
        if !dir.is_dir() || fs::read_dir(&dir).is_err() {
            return Err(SchemaError::bad_argument("Expected a readable directory").into());
        }

        let uri = match base_uri {
            Some(uri) => SchemaUri::container(uri)?,
            None => {
                let url = Url::from_directory_path(&dir).map_err(|()| {
                    SchemaError::bad_argument(format!(
                        "Cannot make a file URI for {}",
                        dir.display()
                    ))
                })?;
                SchemaUri::container(url.as_str())?
            }
        };

        let mut map = Self {
            dir,
            uri,
            options,
            index: None,
        };
        if !map.options.live {
            map.index = Some(map.build_index()?);
        }
        Ok(map)
    }

    pub fn is_live(&self) -> bool {
        self.options.live
    }

    /// The URI of the directory, always ending in `/`.
    pub fn base_uri(&self) -> &SchemaUri {
        &self.uri
    }

    pub fn base_dir(&self) -> &Path {
        &self.dir
    }

    /// Find the schema `uri` names. Relative URIs resolve against the base
    /// URI and may omit the suffix.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::BadArgument` (wrapped) when `uri` lies outside
    /// the map, and load errors for files that exist but cannot be parsed.
    pub fn resolve(&self, uri: &str) -> Result<Option<SchemaWithUri>, LoadError> {
        let Some(child) = self.child_uri(uri)? else {
            return Ok(None);
        };
        let absolute = self.uri.join_uri(&child)?;

        if !self.is_live() {
            return Ok(self.index()?.resolve(&absolute)?);
        }

        let Some(schema) = self.load_file(&self.path_for(&child)?)? else {
            return Ok(None);
        };
        let entry = SchemaWithUri::new(absolute.document(), schema);
        Ok(entry.resolve(&absolute)?)
    }

    /// Every schema in the map. Cached maps lend their index; live maps
    /// build a fresh one.
    pub fn index(&self) -> Result<Cow<'_, Index>, LoadError> {
        match &self.index {
            Some(index) => Ok(Cow::Borrowed(index)),
            None => Ok(Cow::Owned(self.build_index()?)),
        }
    }

    /// Whether `uri` lies under the base URI.
    pub fn covers(&self, uri: &SchemaUri) -> bool {
        match self.uri.join_uri(uri) {
            Ok(target) => !escapes(&self.uri.route_to(&target)),
            Err(_) => false,
        }
    }

    /// `uri` relative to the base, with the suffix applied. `None` for the
    /// directory itself.
    fn child_uri(&self, uri: &str) -> Result<Option<SchemaUri>, SchemaError> {
        let target = self.uri.join(uri)?;
        let relative = self.uri.route_to(&target);
        if escapes(&relative) {
            return Err(outside());
        }
        let reference = relative.reference();
        if reference.is_empty() {
            return Ok(None);
        }

        let suffix = &self.options.suffix;
        let mut child = reference.to_string();
        if !child.ends_with(suffix.as_str()) {
            child.push_str(suffix);
        }
        if let Some(fragment) = relative.fragment() {
            child.push('#');
            child.push_str(fragment);
        }
        SchemaUri::parse(&child).map(Some)
    }

    /// File path of `child` without an extension.
    fn path_for(&self, child: &SchemaUri) -> Result<PathBuf, SchemaError> {
        let reference = child.reference();
        let path = reference
            .strip_suffix(self.options.suffix.as_str())
            .unwrap_or(reference);

        let mut file = self.dir.clone();
        for segment in path.split('/') {
            let decoded = percent_decode_str(segment)
                .decode_utf8()
                .map_err(|_| outside())?;
            if decoded.is_empty()
                || decoded == "."
                || decoded == ".."
                || decoded.contains(['/', '\\'])
            {
                return Err(outside());
            }
            file.push(decoded.as_ref());
        }
        Ok(file)
    }

    /// Load `<base>.<ext>` with the first loader whose file exists and is
    /// readable.
    fn load_file(&self, base: &Path) -> Result<Option<Schema>, LoadError> {
        for (ext, loader) in &self.options.loaders {
            let mut name = base.as_os_str().to_owned();
            name.push(".");
            name.push(ext);
            let file = PathBuf::from(name);
            // Symlinks are never followed, so a map only serves files that
            // live under its directory.
            match fs::symlink_metadata(&file) {
                Ok(meta) if meta.file_type().is_file() => {}
                _ => continue,
            }
            if !file.canonicalize().is_ok_and(|real| real.starts_with(&self.dir)) {
                debug!(path = %file.display(), "skipping file outside the map");
                continue;
            }
            match fs::File::open(&file) {
                Ok(_) => return loader.load(&file, &self.options.types).map(Some),
                Err(e) => warn!(path = %file.display(), error = %e, "cannot read schema file"),
            }
        }
        Ok(None)
    }

    fn build_index(&self) -> Result<Index, LoadError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.dir).follow_links(false) {
            let entry = entry.map_err(|e| LoadError::ReadError {
                path: e.path().unwrap_or(&self.dir).to_path_buf(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let loader = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(|ext| self.options.loaders.get(ext));
            if let Some(loader) = loader {
                files.push((entry.into_path(), Arc::clone(loader)));
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let mut index = Index::new();
        for (path, loader) in files {
            let uri = self.uri.join(&self.relative_uri_for(&path))?;
            let schema = loader.load(&path, &self.options.types)?;
            debug!(uri = %uri, path = %path.display(), "indexed schema file");
            index.add(uri, schema)?;
        }
        Ok(index)
    }

    fn relative_uri_for(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.dir).unwrap_or(path);
        let relative = relative.with_extension("");
        let segments: Vec<String> = relative
            .components()
            .map(|c| utf8_percent_encode(&c.as_os_str().to_string_lossy(), SEGMENT).to_string())
            .collect();
        format!("{}{}", segments.join("/"), self.options.suffix)
    }
}

/// A route from the base that leaves it.
fn escapes(relative: &SchemaUri) -> bool {
    let reference = relative.reference();
    relative.is_absolute()
        || reference.starts_with('/')
        || reference.starts_with("..")
        || reference.contains('?')
}

fn outside() -> SchemaError {
    SchemaError::bad_argument("The given URI is outside this FileMap")
}
