//! Symbol resolution for boundary entry points
//!
//! Entry points can be reached through a statically linked table or through a
//! dynamic library. Both implement [`SymbolResolver`], so the host facade does
//! not care which one it was given:
//! - [`ExportTable`]: the in-process surface, keyed by exported name
//! - [`LoadedLibrary`]: a library opened with `libloading`
//!
//! [`LibraryLoader`] handles platform naming conventions, search paths and the
//! provisioned runtime layout.

use hostbridge_config::{RuntimeIdentifier, RuntimeLayout};
use libloading::Library;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// Library loading errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// Library file not found in search paths
    #[error("Library not found: {0}")]
    LibraryNotFound(String),

    /// Symbol not found in library
    #[error("Symbol '{symbol}' not found in library '{library}'")]
    SymbolNotFound { library: String, symbol: String },

    /// Failed to load library
    #[error("Failed to load library: {0}")]
    LoadFailed(String),

    /// Resolved pointer cannot be viewed as the requested function type
    #[error("Symbol '{0}' does not fit the requested function pointer type")]
    SignatureMismatch(String),
}

/// Type-erased function pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFnPtr(*const ());

// Safety: a code address carries no thread affinity
unsafe impl Send for RawFnPtr {}
unsafe impl Sync for RawFnPtr {}

impl RawFnPtr {
    pub fn new(ptr: *const ()) -> Self {
        Self(ptr)
    }

    pub fn as_ptr(&self) -> *const () {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

/// Lookup of entry points by symbolic name
pub trait SymbolResolver {
    fn resolve(&self, name: &str) -> Result<RawFnPtr, LoadError>;
}

impl<T: SymbolResolver + ?Sized> SymbolResolver for &T {
    fn resolve(&self, name: &str) -> Result<RawFnPtr, LoadError> {
        (**self).resolve(name)
    }
}

impl<T: SymbolResolver + ?Sized> SymbolResolver for Arc<T> {
    fn resolve(&self, name: &str) -> Result<RawFnPtr, LoadError> {
        (**self).resolve(name)
    }
}

/// One named entry point
#[derive(Debug, Clone, Copy)]
pub struct Export {
    pub name: &'static str,
    pub ptr: RawFnPtr,
}

/// Name-indexed table of entry points compiled into this process
#[derive(Debug, Clone, Default)]
pub struct ExportTable {
    label: &'static str,
    entries: Vec<Export>,
}

impl ExportTable {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: Vec::new(),
        }
    }

    /// Add an entry; lookups return the first entry with a given name
    pub fn with(mut self, name: &'static str, ptr: *const ()) -> Self {
        self.entries.push(Export {
            name,
            ptr: RawFnPtr::new(ptr),
        });
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn iter(&self) -> impl Iterator<Item = &Export> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SymbolResolver for ExportTable {
    fn resolve(&self, name: &str) -> Result<RawFnPtr, LoadError> {
        trace!(table = self.label, symbol = name, "resolving export");
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.ptr)
            .ok_or_else(|| LoadError::SymbolNotFound {
                library: self.label.to_string(),
                symbol: name.to_string(),
            })
    }
}

/// A dynamic library kept open for as long as any clone is alive
#[derive(Clone)]
pub struct LoadedLibrary {
    path: PathBuf,
    library: Arc<Library>,
}

impl LoadedLibrary {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for LoadedLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedLibrary")
            .field("path", &self.path)
            .finish()
    }
}

impl SymbolResolver for LoadedLibrary {
    fn resolve(&self, name: &str) -> Result<RawFnPtr, LoadError> {
        trace!(library = %self.path.display(), symbol = name, "resolving symbol");
        // Safety: the symbol is only converted to an address here. Calling it
        // goes through ManagedFunction, whose constructor is unsafe.
        let symbol = unsafe { self.library.get::<unsafe extern "system" fn()>(name.as_bytes()) }
            .map_err(|_| LoadError::SymbolNotFound {
                library: self.path.display().to_string(),
                symbol: name.to_string(),
            })?;
        Ok(RawFnPtr::new(*symbol as *const ()))
    }
}

/// Dynamic library loader with caching and platform-specific path resolution
///
/// # Safety
///
/// Loading dynamic libraries is inherently unsafe. The loaded code runs in the
/// same process and can perform arbitrary operations.
pub struct LibraryLoader {
    /// Cache of loaded libraries by resolved path
    loaded: HashMap<PathBuf, Arc<Library>>,
    /// Library search paths, highest priority first
    search_paths: Vec<PathBuf>,
}

impl LibraryLoader {
    /// Create a new library loader with default search paths
    pub fn new() -> Self {
        Self {
            loaded: HashMap::new(),
            search_paths: Self::default_search_paths(),
        }
    }

    /// Get platform-specific default library search paths
    ///
    /// The current working directory comes first, then the directory of the
    /// running executable (where cargo places a sibling cdylib).
    fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }

        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            paths.push(exe_dir.clone());
            // Test and bench binaries live one level below the profile directory
            if let Some(parent) = exe_dir.parent() {
                paths.push(parent.to_path_buf());
            }
        }

        #[cfg(target_os = "linux")]
        {
            paths.push(PathBuf::from("/usr/lib"));
            paths.push(PathBuf::from("/usr/local/lib"));
        }

        #[cfg(target_os = "macos")]
        {
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/opt/homebrew/lib"));
        }

        paths
    }

    /// Platform file name candidates for a short library name
    fn file_names(name: &str) -> Vec<String> {
        if cfg!(target_os = "windows") {
            vec![format!("{}.dll", name), format!("lib{}.dll", name)]
        } else if cfg!(target_os = "macos") {
            vec![
                format!("lib{}.dylib", name),
                format!("lib{}.so", name),
                format!("{}.dylib", name),
            ]
        } else {
            vec![format!("lib{}.so", name), format!("{}.so", name)]
        }
    }

    /// Resolve library name to a full path
    ///
    /// Absolute paths are used as-is; short names are tried with every
    /// platform prefix and extension in every search path.
    fn resolve_library_path(&self, name: &str) -> Option<PathBuf> {
        let path = Path::new(name);
        if path.is_absolute() {
            return path.exists().then(|| path.to_path_buf());
        }

        let candidates = Self::file_names(name);
        self.search_paths
            .iter()
            .flat_map(|dir| candidates.iter().map(move |file| dir.join(file)))
            .find(|full| full.exists())
    }

    /// Load a library by short name or absolute path
    pub fn load(&mut self, name: &str) -> Result<LoadedLibrary, LoadError> {
        let path = self
            .resolve_library_path(name)
            .ok_or_else(|| LoadError::LibraryNotFound(name.to_string()))?;
        self.load_path(&path)
    }

    /// Load the host library provisioned for `rid` under `layout`
    pub fn load_host_library(
        &mut self,
        layout: &RuntimeLayout,
        rid: &RuntimeIdentifier,
    ) -> Result<LoadedLibrary, LoadError> {
        let path = layout.host_library_path(rid);
        if !path.exists() {
            return Err(LoadError::LibraryNotFound(path.display().to_string()));
        }
        self.load_path(&path)
    }

    /// Load a library from an exact path, reusing a cached handle
    pub fn load_path(&mut self, path: &Path) -> Result<LoadedLibrary, LoadError> {
        if let Some(library) = self.loaded.get(path) {
            return Ok(LoadedLibrary {
                path: path.to_path_buf(),
                library: Arc::clone(library),
            });
        }

        // Safety: loading runs the library's initializers; callers only point
        // this at libraries they provisioned.
        let library =
            unsafe { Library::new(path).map_err(|e| LoadError::LoadFailed(e.to_string()))? };
        let library = Arc::new(library);
        debug!(path = %path.display(), "library loaded");

        self.loaded.insert(path.to_path_buf(), Arc::clone(&library));
        Ok(LoadedLibrary {
            path: path.to_path_buf(),
            library,
        })
    }

    /// Add a custom search path (prepended to search list)
    pub fn add_search_path(&mut self, path: PathBuf) {
        self.search_paths.insert(0, path);
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Get the number of loaded libraries
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "system" fn one() -> i32 {
        1
    }

    #[test]
    fn test_default_search_paths_start_with_cwd() {
        let paths = LibraryLoader::default_search_paths();
        assert!(!paths.is_empty());
        if let Ok(cwd) = std::env::current_dir() {
            assert_eq!(paths[0], cwd);
        }
    }

    #[test]
    fn test_library_not_found() {
        let mut loader = LibraryLoader::new();
        let result = loader.load("nonexistent_library_xyz");
        assert!(matches!(result, Err(LoadError::LibraryNotFound(_))));
        assert_eq!(loader.loaded_count(), 0);
    }

    #[test]
    fn test_missing_host_library() {
        let mut loader = LibraryLoader::new();
        let layout = RuntimeLayout::new("/definitely/not/here");
        let rid = RuntimeIdentifier::parse("linux-x64").unwrap();
        assert!(matches!(
            loader.load_host_library(&layout, &rid),
            Err(LoadError::LibraryNotFound(_))
        ));
    }

    #[test]
    fn test_add_custom_search_path() {
        let mut loader = LibraryLoader::new();
        let custom_path = PathBuf::from("/custom/path");
        loader.add_search_path(custom_path.clone());
        assert_eq!(loader.search_paths()[0], custom_path);
    }

    #[test]
    fn test_export_table_resolution() {
        let table = ExportTable::new("test").with("one", one as *const ());
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve("one").unwrap().as_ptr(), one as *const ());
        assert_eq!(
            table.resolve("two"),
            Err(LoadError::SymbolNotFound {
                library: "test".to_string(),
                symbol: "two".to_string(),
            })
        );
    }

    #[test]
    fn test_resolver_through_reference() {
        let table = ExportTable::new("test").with("one", one as *const ());
        let by_ref: &dyn SymbolResolver = &table;
        assert!(by_ref.resolve("one").is_ok());
    }
}
