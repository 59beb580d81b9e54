use std::collections::{BTreeMap, HashMap};
use swiftdev_log::ir::Diagnostic;

/// Per-file diagnostics collected during one build/test cycle.
///
/// Entries keep their arrival order within each file. Nothing is
/// deduplicated.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticsSink {
    by_file: HashMap<String, Vec<Diagnostic>>,
}

impl DiagnosticsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops everything. Called once at the start of every cycle.
    pub fn clear(&mut self) {
        self.by_file.clear();
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        self.by_file
            .entry(diagnostic.file.clone())
            .or_default()
            .push(diagnostic);
    }

    /// Read-only copy keyed by file, sorted for stable presentation.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<Diagnostic>> {
        self.by_file
            .iter()
            .map(|(file, list)| (file.clone(), list.clone()))
            .collect()
    }

    pub fn get(&self, file: &str) -> &[Diagnostic] {
        self.by_file.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of diagnostics across all files.
    pub fn len(&self) -> usize {
        self.by_file.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
