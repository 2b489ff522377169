//! Maps decoded request paths onto the served directory tree.
//!
//! Resolution is purely lexical: `.` and `..` are collapsed without asking the
//! filesystem, and the result must still sit inside the root when compared
//! component by component. Existence and file type are the caller's business.

use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::error::{AppError, AppResult};

/// A `/`-separated path below the served root with no `.` or `..` segments.
/// The empty path is the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelPath(String);

impl RelPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Last segment, or `""` at the root.
    pub fn basename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// `None` at the root.
    pub fn parent(&self) -> Option<RelPath> {
        if self.is_root() {
            return None;
        }
        Some(match self.0.rfind('/') {
            Some(idx) => RelPath(self.0[..idx].to_string()),
            None => RelPath::root(),
        })
    }

    pub fn join(&self, name: &str) -> RelPath {
        if self.is_root() {
            RelPath(name.to_string())
        } else {
            RelPath(format!("{}/{}", self.0, name))
        }
    }
}

/// A request path that passed containment checks.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub absolute: PathBuf,
    pub relative: RelPath,
}

pub struct PathResolver<'a> {
    root: &'a Path,
}

impl<'a> PathResolver<'a> {
    /// `root` must already be absolute and normalized.
    pub fn new(root: &'a Path) -> Self {
        Self { root }
    }

    pub fn resolve(&self, decoded: &str) -> AppResult<Resolved> {
        let relative = decoded.trim_start_matches('/');
        let absolute = normalize(&self.root.join(relative));

        // Path::starts_with compares whole components, so `/srv/a-evil`
        // is not inside `/srv/a`.
        let rest = match absolute.strip_prefix(self.root) {
            Ok(rest) => rest,
            Err(_) => {
                warn!(
                    "Path traversal attempt: '{}' resolved to '{}' outside '{}'",
                    decoded,
                    absolute.display(),
                    self.root.display()
                );
                return Err(AppError::Traversal);
            }
        };

        let relative = rest
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        Ok(Resolved {
            absolute,
            relative: RelPath(relative),
        })
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => out.push(name),
        }
    }
    out
}
