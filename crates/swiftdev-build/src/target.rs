use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetKind {
    Executable,
    Library,
    Test,
}

/// A named buildable/debuggable/testable unit of a Swift package.
///
/// Targets are discovered elsewhere (from package metadata); this type only
/// carries what the build and debug commands need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub kind: TargetKind,
    /// Explicit path to the built executable. When absent, the path is derived
    /// from the package's debug build directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable_path: Option<PathBuf>,
}

impl Target {
    pub fn new(name: &str, kind: TargetKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            executable_path: None,
        }
    }

    pub fn executable(name: &str) -> Self {
        Self::new(name, TargetKind::Executable)
    }

    pub fn with_executable_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Resolves the executable the debugger should load.
    pub fn resolve_executable(&self, package_path: &Path) -> PathBuf {
        match &self.executable_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => package_path.join(path),
            None => package_path
                .join(".build")
                .join("debug")
                .join(&self.name),
        }
    }
}
