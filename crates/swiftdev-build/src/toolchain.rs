use crate::{Invocation, Target, TargetKind, ToolKind};
use std::path::{Path, PathBuf};

/// A SwiftToolchain holds the configuration for invoking the Swift package tool.
#[derive(Debug, Clone)]
pub struct SwiftToolchain {
    pub swift: PathBuf,
    pub package_path: PathBuf,
    /// Route build and test through the package's own `builder` product.
    pub use_builder: bool,
    pub extra_args: Vec<String>,
}

impl SwiftToolchain {
    pub fn new(swift: impl Into<PathBuf>, package_path: impl Into<PathBuf>) -> Self {
        Self {
            swift: swift.into(),
            package_path: package_path.into(),
            use_builder: false,
            extra_args: Vec::new(),
        }
    }

    pub fn with_builder(mut self, use_builder: bool) -> Self {
        self.use_builder = use_builder;
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// `swift build --product <target>` or `swift run builder build <target>`.
    pub fn build(&self, target: &Target) -> Invocation {
        let mut args: Vec<String> = if self.use_builder {
            vec!["run".into(), "builder".into(), "build".into(), target.name.clone()]
        } else {
            vec!["build".into(), "--product".into(), target.name.clone()]
        };
        args.extend(self.extra_args.iter().cloned());
        self.invocation(args)
    }

    /// `swift test`, narrowed with `--filter` when given a test target.
    pub fn test(&self, target: Option<&Target>) -> Invocation {
        let mut args: Vec<String> = if self.use_builder {
            vec!["run".into(), "builder".into(), "test".into()]
        } else {
            let mut args = vec!["test".to_string()];
            if let Some(target) = target
                && target.kind == TargetKind::Test
            {
                args.push("--filter".into());
                args.push(target.name.clone());
            }
            args
        };
        args.extend(self.extra_args.iter().cloned());
        self.invocation(args)
    }

    /// `swift --version`, useful to probe whether the tool is installed.
    pub fn version(&self) -> Invocation {
        self.invocation(vec!["--version".into()])
    }

    fn invocation(&self, args: Vec<String>) -> Invocation {
        Invocation::new(ToolKind::Build, self.swift.clone(), args)
            .with_working_dir(self.package_path.clone())
    }
}

/// Launch configuration for LLDB.
#[derive(Debug, Clone)]
pub struct Debugger {
    pub lldb: PathBuf,
    pub working_dir: PathBuf,
}

impl Debugger {
    pub fn new(lldb: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            lldb: lldb.into(),
            working_dir: working_dir.into(),
        }
    }

    /// `lldb <executable>`
    pub fn launch(&self, executable: &Path) -> Invocation {
        Invocation::new(
            ToolKind::Debugger,
            self.lldb.clone(),
            vec![executable.to_string_lossy().to_string()],
        )
        .with_working_dir(self.working_dir.clone())
    }
}
