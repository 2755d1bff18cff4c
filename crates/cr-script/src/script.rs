//! Compiled scripts and the files a run is expected to write.

use std::collections::BTreeMap;
use std::fmt;

use cr_project::OutputKind;
use serde::{Deserialize, Serialize};

/// Base name handed to the engine; it reads `<base>.in` and writes `<base>.out`.
pub const BASE_NAME: &str = "temp";

/// Combined stdout/stderr of the engine process.
pub const LOG_FILE: &str = "run.log";

pub fn input_file_name() -> String {
    format!("{BASE_NAME}.in")
}

/// On-disk name of an output kind inside a run workspace.
pub fn output_file_name(kind: OutputKind) -> String {
    match kind {
        OutputKind::Log => LOG_FILE.to_string(),
        other => format!("{BASE_NAME}.{}", other.id()),
    }
}

/// Ordered engine command lines.
///
/// The engine is a line-oriented interpreter, so order is significant. Immutable
/// once built; one instance per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledScript {
    lines: Vec<String>,
}

impl CompiledScript {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Script file content: directives joined by newlines.
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }

    pub fn contains_line(&self, line: &str) -> bool {
        self.lines.iter().any(|l| l == line)
    }
}

impl fmt::Display for CompiledScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Builder for constructing a script incrementally.
///
/// Lines are kept in insertion order; `line_if` skips a line without disturbing
/// the order of the rest.
#[derive(Debug, Default)]
pub struct ScriptBuilder {
    lines: Vec<String>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    pub fn line_if(&mut self, enabled: bool, line: impl FnOnce() -> String) -> &mut Self {
        if enabled {
            self.lines.push(line());
        }
        self
    }

    pub fn build(self) -> CompiledScript {
        CompiledScript { lines: self.lines }
    }
}

/// Output kind to file name for every file a run is expected to produce.
///
/// Always holds the main output and the log; auxiliary kinds are added as their
/// save directives are emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFileMap {
    files: BTreeMap<OutputKind, String>,
}

impl Default for OutputFileMap {
    fn default() -> Self {
        let mut files = BTreeMap::new();
        for kind in [OutputKind::Main, OutputKind::Log] {
            files.insert(kind, output_file_name(kind));
        }
        Self { files }
    }
}

impl OutputFileMap {
    pub fn insert(&mut self, kind: OutputKind) -> &str {
        self.files
            .entry(kind)
            .or_insert_with(|| output_file_name(kind))
    }

    pub fn get(&self, kind: OutputKind) -> Option<&str> {
        self.files.get(&kind).map(String::as_str)
    }

    pub fn contains(&self, kind: OutputKind) -> bool {
        self.files.contains_key(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (OutputKind, &str)> {
        self.files.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
