use crate::error::{ApmError, Result};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CUSTOM_CATEGORY: &str = "custom";
const AMBIGUOUS_PREVIEW: usize = 5;

/// How a user supplied name was turned into a package id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Already looked like a package id.
    PackageId(String),
    Direct { name: String, package_id: String },
    Partial { name: String, package_id: String },
    Ambiguous(Vec<(String, String)>),
    /// No mapping; the name is used as-is.
    Unmapped(String),
}

impl Resolution {
    pub fn package_id(&self) -> Option<&str> {
        match self {
            Resolution::PackageId(id) | Resolution::Unmapped(id) => Some(id.as_str()),
            Resolution::Direct { package_id, .. } | Resolution::Partial { package_id, .. } => {
                Some(package_id.as_str())
            }
            Resolution::Ambiguous(_) => None,
        }
    }
}

/// Category summary for `list-categories`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryInfo {
    pub name: String,
    /// `None` when the top level entry is a single mapping, not a category.
    pub packages: Option<usize>,
}

/// Friendly-name mappings backed by a categorised YAML file.
#[derive(Debug, Clone)]
pub struct PackageMappings {
    path: PathBuf,
    document: Mapping,
    flat: BTreeMap<String, String>,
    /// Set when the file exists but could not be read; writes are refused.
    load_error: Option<String>,
}

impl PackageMappings {
    /// Load mappings; a missing, empty or malformed file yields no mappings.
    ///
    /// A malformed file is left untouched: [`add`](Self::add) and
    /// [`remove`](Self::remove) fail instead of overwriting it.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let (document, load_error) = match Self::read_document(&path) {
            Ok(Some(doc)) => (doc, None),
            Ok(None) => {
                tracing::warn!(path = %path.display(), "package mappings file not found or empty");
                (Mapping::new(), None)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not load package mappings");
                (Mapping::new(), Some(e.to_string()))
            }
        };

        let flat = flatten(&document);
        Self {
            path,
            document,
            flat,
            load_error,
        }
    }

    fn ensure_writable(&self) -> Result<()> {
        match &self.load_error {
            Some(reason) => Err(ApmError::Mappings(format!(
                "refusing to modify {}: {reason}",
                self.path.display()
            ))),
            None => Ok(()),
        }
    }

    fn read_document(path: &Path) -> Result<Option<Mapping>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        serde_yaml::from_str::<Option<Mapping>>(&content)
            .map_err(|e| ApmError::Mappings(format!("Failed to parse {}: {e}", path.display())))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }

    pub fn len(&self) -> usize {
        self.flat.len()
    }

    /// Flattened `friendly name -> package id`, sorted by name.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.flat.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.flat.get(name).map(String::as_str)
    }

    /// Names containing `query`, case-insensitively.
    pub fn partial_matches(&self, query: &str) -> Vec<(&str, &str)> {
        let needle = query.to_lowercase();
        self.entries()
            .filter(|(name, _)| name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn resolve(&self, name: &str) -> Resolution {
        if name.contains('.') {
            return Resolution::PackageId(name.to_string());
        }

        if let Some(package_id) = self.get(name) {
            return Resolution::Direct {
                name: name.to_string(),
                package_id: package_id.to_string(),
            };
        }

        let matches = self.partial_matches(name);
        match matches.as_slice() {
            [] => Resolution::Unmapped(name.to_string()),
            [(matched, package_id)] => Resolution::Partial {
                name: matched.to_string(),
                package_id: package_id.to_string(),
            },
            many => Resolution::Ambiguous(
                many.iter()
                    .map(|(n, id)| (n.to_string(), id.to_string()))
                    .collect(),
            ),
        }
    }

    /// Add `name -> package_id` to the custom category and persist.
    pub fn add(&mut self, name: &str, package_id: &str) -> Result<()> {
        self.ensure_writable()?;
        let key = Value::String(CUSTOM_CATEGORY.to_string());
        let custom = self
            .document
            .entry(key)
            .or_insert_with(|| Value::Mapping(Mapping::new()));

        if !custom.is_mapping() {
            *custom = Value::Mapping(Mapping::new());
        }
        if let Value::Mapping(entries) = custom {
            entries.insert(
                Value::String(name.to_string()),
                Value::String(package_id.to_string()),
            );
        }

        self.persist()
    }

    /// Remove a mapping from the first category holding it. Returns whether
    /// anything was removed.
    pub fn remove(&mut self, name: &str) -> Result<bool> {
        self.ensure_writable()?;
        let key = Value::String(name.to_string());

        let mut removed = false;
        for (_, entries) in self.document.iter_mut() {
            if let Value::Mapping(entries) = entries {
                if entries.remove(&key).is_some() {
                    removed = true;
                    break;
                }
            }
        }

        if !removed && self.document.get(&key).is_some_and(|v| !v.is_mapping()) {
            self.document.remove(&key);
            removed = true;
        }

        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    pub fn categories(&self) -> Vec<CategoryInfo> {
        self.document
            .iter()
            .filter_map(|(key, value)| {
                let name = key.as_str()?.to_string();
                let packages = value.as_mapping().map(Mapping::len);
                Some(CategoryInfo { name, packages })
            })
            .collect()
    }

    /// First entries of an ambiguous resolution plus how many were left out.
    pub fn ambiguous_preview(matches: &[(String, String)]) -> (&[(String, String)], usize) {
        let shown = matches.len().min(AMBIGUOUS_PREVIEW);
        (&matches[..shown], matches.len() - shown)
    }

    fn persist(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(&self.document)?;
        fs::write(&self.path, yaml)?;

        self.flat = flatten(&self.document);
        Ok(())
    }
}

fn flatten(document: &Mapping) -> BTreeMap<String, String> {
    let mut flat = BTreeMap::new();

    for (key, value) in document {
        let Some(key) = key.as_str() else {
            continue;
        };

        match value {
            Value::Mapping(packages) if mapping_package_id(packages).is_none() => {
                for (name, info) in packages {
                    if let (Some(name), Some(id)) = (name.as_str(), package_id_of(info)) {
                        flat.insert(name.to_string(), id);
                    }
                }
            }
            other => {
                if let Some(id) = package_id_of(other) {
                    flat.insert(key.to_string(), id);
                }
            }
        }
    }

    flat
}

/// A mapping value is a bare id or a table carrying `package_id` / `id`.
fn package_id_of(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Mapping(info) => mapping_package_id(info),
        _ => None,
    }
}

fn mapping_package_id(info: &Mapping) -> Option<String> {
    ["package_id", "id"]
        .iter()
        .filter_map(|field| info.get(*field).and_then(Value::as_str))
        .find(|id| !id.is_empty())
        .map(str::to_string)
}
