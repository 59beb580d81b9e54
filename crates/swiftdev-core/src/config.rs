use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use swiftdev_build::{Debugger, SwiftToolchain};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid configuration in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Tool locations and session tuning, persisted as `.swiftdev.json` at the
/// package root. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub swift: PathBuf,
    pub lldb: PathBuf,
    pub package_path: PathBuf,
    pub use_builder: bool,
    /// How long `stop` waits for the debugger before killing it.
    pub stop_grace_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            swift: PathBuf::from("swift"),
            lldb: PathBuf::from("lldb"),
            package_path: PathBuf::from("."),
            use_builder: false,
            stop_grace_ms: 2000,
        }
    }
}

impl SessionConfig {
    pub const FILE_NAME: &'static str = ".swiftdev.json";

    /// Defaults with tool paths resolved on `PATH` when possible.
    pub fn detect() -> Self {
        let mut config = Self::default();
        if let Ok(path) = which::which("swift") {
            config.swift = path;
        } else {
            log::debug!("swift not found on PATH");
        }
        if let Ok(path) = which::which("lldb") {
            config.lldb = path;
        } else {
            log::debug!("lldb not found on PATH");
        }
        config
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `<package_path>/.swiftdev.json` if it exists, otherwise detects
    /// the tools. `package_path` is taken from the argument in both cases.
    pub fn discover(package_path: &Path) -> Result<Self, ConfigError> {
        let file = package_path.join(Self::FILE_NAME);
        let mut config = if file.is_file() {
            log::info!("Loading configuration from {}", file.display());
            Self::load(&file)?
        } else {
            Self::detect()
        };
        config.package_path = package_path.to_path_buf();
        Ok(config)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn toolchain(&self) -> SwiftToolchain {
        SwiftToolchain::new(self.swift.clone(), self.package_path.clone())
            .with_builder(self.use_builder)
    }

    pub fn debugger(&self) -> Debugger {
        Debugger::new(self.lldb.clone(), self.package_path.clone())
    }
}
