//! Build error taxonomy.
//!
//! Every variant is terminal for the build: the first error encountered in
//! the depth-first walk aborts it, carrying the offending file path.
//! Cache failures never appear here; they degrade to cache misses inside
//! `molt-cache`.

use std::path::PathBuf;

/// Boxed error type used at the injected collaborator boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Source-location detail attached to a transform failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformDiagnostic {
    /// 1-based line number reported by the transform.
    pub line: usize,
    /// The literal text of that line.
    pub text: String,
}

/// Errors terminating a build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The file's extension selects no recognized source kind.
    #[error("unsupported file type: \"{extension}\" ({})", path.display())]
    UnsupportedFileType { path: PathBuf, extension: String },

    /// The input boundary failed to produce the file's content.
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// The output boundary failed to persist an artifact.
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// The erasure transform rejected the source.
    #[error("failed to transform {}: {message}{}", path.display(), diagnostic_suffix(diagnostic))]
    Transform {
        path: PathBuf,
        message: String,
        diagnostic: Option<TransformDiagnostic>,
    },

    /// The declaration emitter rejected the source.
    #[error("failed to emit declaration for {}", path.display())]
    DeclarationEmit {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// The specifier scanner could not process the (transformed) text.
    #[error("failed to scan module specifiers in {}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: molt_scan::ScanError,
    },

    /// A relative import normalizes to a path outside the project root.
    #[error("relative import \"{specifier}\" in {} is outside of the project root", path.display())]
    OutOfRoot { path: PathBuf, specifier: String },

    /// A declaration references a dependency with no declaration artifact.
    #[error("no declaration file for \"{}\" (referenced from {})", dependency.display(), path.display())]
    MissingDeclaration { path: PathBuf, dependency: PathBuf },

    /// Two distinct inputs map to the same output path.
    #[error("output collision: \"{}\" is produced by both \"{}\" and \"{}\"", output.display(), first.display(), second.display())]
    OutputCollision {
        output: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },
}

fn diagnostic_suffix(diagnostic: &Option<TransformDiagnostic>) -> String {
    match diagnostic {
        Some(d) => format!(", line number {}, line = \"{}\"", d.line, d.text),
        None => String::new(),
    }
}
