//! Finding the table descriptors that live under a directory.
//!
//! Two sources are combined: YAML manifests found on disk, and descriptors
//! compiled into the binary and registered with [`register_table`] under
//! the module path they belong to.

use glob::{glob, Pattern};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{OnceLock, RwLock};
use tracing::debug;
use crate::error::{BqSchemaError, Result};
use crate::table::{TableDescriptor, TableKey, TableManifest};

const MANIFEST_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

pub type TableFactory = fn() -> Box<dyn TableDescriptor>;

#[derive(Clone)]
struct RegisteredTable {
    module_path: PathBuf,
    factory: TableFactory,
}

/// Ordered list of descriptor factories, each tied to a module path.
#[derive(Clone, Default)]
pub struct TableRegistry {
    entries: Vec<RegisteredTable>,
}

impl fmt::Debug for TableRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| &e.module_path))
            .finish()
    }
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module_path: impl Into<PathBuf>, factory: TableFactory) {
        self.entries.push(RegisteredTable {
            module_path: module_path.into(),
            factory,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Instantiate every entry whose module path lies under `root`.
    fn instantiate_under(&self, root: &Path) -> Vec<Box<dyn TableDescriptor>> {
        self.entries
            .iter()
            .filter(|entry| normalize(&entry.module_path).starts_with(root))
            .map(|entry| (entry.factory)())
            .collect()
    }
}

static REGISTRY: OnceLock<RwLock<TableRegistry>> = OnceLock::new();

fn registry() -> &'static RwLock<TableRegistry> {
    REGISTRY.get_or_init(|| RwLock::new(TableRegistry::new()))
}

/// Add a descriptor factory to the process-wide registry.
pub fn register_table(module_path: impl Into<PathBuf>, factory: TableFactory) {
    registry()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .register(module_path, factory);
}

/// Snapshot of the process-wide registry.
pub fn registered_tables() -> TableRegistry {
    registry()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

#[derive(Debug, Default)]
pub struct TableFinder {
    registry: Option<TableRegistry>,
}

impl TableFinder {
    /// A finder backed by the process-wide registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: TableRegistry) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    pub fn find_tables(
        &self,
        root: impl AsRef<Path>,
        ignore_abstract: bool,
    ) -> Result<Vec<Box<dyn TableDescriptor>>> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(BqSchemaError::Discovery(format!(
                "Module path '{}' is not a directory",
                root.display()
            )));
        }
        let root = normalize(root);

        let mut candidates: Vec<Box<dyn TableDescriptor>> = Vec::new();
        for path in manifest_files(&root)? {
            debug!(path = %path.display(), "Loading table manifest");
            candidates.push(Box::new(TableManifest::load(&path)?));
        }

        let registered = match &self.registry {
            Some(registry) => registry.instantiate_under(&root),
            None => registered_tables().instantiate_under(&root),
        };
        debug!(count = registered.len(), "Registered tables under module path");
        candidates.extend(registered);

        let mut tables: Vec<Box<dyn TableDescriptor>> = Vec::new();
        let mut index: HashMap<TableKey, usize> = HashMap::new();

        for descriptor in candidates {
            if ignore_abstract && descriptor.is_abstract() {
                debug!(descriptor = %descriptor.descriptor_name(), "Skipping abstract table");
                continue;
            }

            let key = descriptor.key()?;
            match index.get(&key) {
                Some(&i) => {
                    debug!(table = %key.2, "Later declaration replaces earlier one");
                    tables[i] = descriptor;
                }
                None => {
                    index.insert(key, tables.len());
                    tables.push(descriptor);
                }
            }
        }

        Ok(tables)
    }
}

pub fn find_tables(
    root: impl AsRef<Path>,
    ignore_abstract: bool,
) -> Result<Vec<Box<dyn TableDescriptor>>> {
    TableFinder::new().find_tables(root, ignore_abstract)
}

fn manifest_files(root: &Path) -> Result<Vec<PathBuf>> {
    let base = Pattern::escape(&root.to_string_lossy());
    let mut files = Vec::new();

    for ext in MANIFEST_EXTENSIONS {
        let pattern = format!("{}/**/*.{}", base, ext);
        let paths = glob(&pattern).map_err(|e| BqSchemaError::Discovery(e.to_string()))?;
        files.extend(paths.filter_map(|r| r.ok()));
    }

    files.sort();
    Ok(files)
}

// Registered module paths need not exist on disk; resolve their parent then.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => match parent.canonicalize() {
            Ok(parent) => parent.join(name),
            Err(_) => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}
