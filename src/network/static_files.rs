//! Static file lookup for paths that match no registered route.

use crate::config::ServerConfig;
use crate::error::{Result, TemplogError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Ordered search directories, optionally overridden per file extension.
#[derive(Debug, Clone, Default)]
pub struct StaticFiles {
    search_dirs: Vec<PathBuf>,
    extension_dirs: BTreeMap<String, Vec<PathBuf>>,
    index_file: String,
}

impl StaticFiles {
    /// Search `search_dirs` in order; directory paths get `index_file`.
    pub fn new(search_dirs: Vec<PathBuf>, index_file: impl Into<String>) -> Self {
        Self {
            search_dirs,
            extension_dirs: BTreeMap::new(),
            index_file: index_file.into(),
        }
    }

    /// Lookup described by `[server]`.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            search_dirs: config.static_dirs.clone(),
            extension_dirs: config.extension_dirs.clone(),
            index_file: config.index_file.clone(),
        }
    }

    /// Search `dirs` instead of the default list for files ending in `.extension`.
    pub fn with_extension_dirs(mut self, extension: &str, dirs: Vec<PathBuf>) -> Self {
        self.extension_dirs
            .insert(extension.trim_start_matches('.').to_string(), dirs);
        self
    }

    /// Map a request path to an existing file.
    ///
    /// Paths without a `.` are treated as directories and get the index file appended.
    /// Paths containing `..` never resolve.
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let mut relative = request_path.trim_start_matches('/').to_string();
        if !relative.contains('.') && !self.index_file.is_empty() {
            if !relative.is_empty() && !relative.ends_with('/') {
                relative.push('/');
            }
            relative.push_str(&self.index_file);
        }

        let relative = Path::new(&relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }

        let dirs = relative
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.extension_dirs.get(ext))
            .unwrap_or(&self.search_dirs);

        dirs.iter()
            .map(|dir| dir.join(relative))
            .find(|candidate| candidate.is_file())
    }

    /// Resolve and read a file, returning its body and content type.
    pub fn load(&self, request_path: &str) -> Result<(Vec<u8>, String)> {
        let file = self
            .resolve(request_path)
            .ok_or_else(|| TemplogError::NotFound(request_path.to_string()))?;
        let body = fs::read(&file)?;
        Ok((body, content_type(&file)))
    }
}

/// MIME type from the file extension.
pub fn content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}
