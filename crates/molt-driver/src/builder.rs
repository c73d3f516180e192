//! The graph-walking build orchestrator.
//!
//! `Builder::build` discovers every file transitively reachable from an
//! entry through relative imports, transforms each file exactly once,
//! rewrites cross-file specifiers to the produced artifacts, and emits a
//! declaration artifact for every type-erased source. The walk is
//! depth-first and synchronous: a dependency's resolution (including its
//! writes) completes before the importer's own rewrite proceeds.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::error::{BuildError, TransformDiagnostic};
use crate::io::BuildIo;
use crate::rewrite::{rewrite, Edit};
use crate::transform::{DeclarationEmitter, Transform, TransformError};

/// Recognized source kinds, selected by file extension.
///
/// Each kind carries its own output-extension rule and whether the erasure
/// transform runs. An unrecognized extension is a fatal build error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    TypeScript,
    JavaScript,
    EcmaScriptModule,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str())? {
            "ts" => Some(Self::TypeScript),
            "js" => Some(Self::JavaScript),
            "mjs" => Some(Self::EcmaScriptModule),
            _ => None,
        }
    }

    /// Whether sources of this kind go through the erasure transform.
    pub fn needs_transform(self) -> bool {
        matches!(self, Self::TypeScript)
    }

    /// Output path for an input of this kind.
    ///
    /// A pure function of the input path (extension substitution only),
    /// never of file content; that is what allows a build record to exist
    /// before its transform runs.
    pub fn output_path(self, input: &Path) -> PathBuf {
        match self {
            Self::TypeScript => input.with_extension("js"),
            Self::JavaScript | Self::EcmaScriptModule => input.to_path_buf(),
        }
    }

    /// Declaration path for an input of this kind, if one is emitted.
    pub fn declaration_path(self, input: &Path) -> Option<PathBuf> {
        match self {
            Self::TypeScript => Some(input.with_extension("d.ts")),
            Self::JavaScript | Self::EcmaScriptModule => None,
        }
    }
}

/// Per-file bookkeeping: where a source's artifacts will live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecord {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub declaration_path: Option<PathBuf>,
}

/// Which artifact tree a linking pass serves.
#[derive(Clone, Copy, PartialEq, Eq)]
enum LinkTarget {
    Executable,
    /// Declaration links point at the dependency's *executable* output:
    /// declaration files referencing one another trip type-resolution
    /// errors in the declaration consumer.
    Declaration,
}

/// The build orchestrator.
///
/// Holds the record map that makes the walk idempotent and cycle-safe:
/// a record is registered before its file is read or transformed, so any
/// re-entrant resolution of the same path (a cycle) finds the record and
/// links against its eventual output without recursing. Records persist
/// across `build` calls, so several entries built through one `Builder`
/// share work.
pub struct Builder<I, T, D> {
    io: I,
    transform: T,
    declarations: D,
    records: HashMap<PathBuf, BuildRecord>,
    /// Output path -> input that claimed it, for collision detection.
    produced: HashMap<PathBuf, PathBuf>,
}

impl<I: BuildIo, T: Transform, D: DeclarationEmitter> Builder<I, T, D> {
    pub fn new(io: I, transform: T, declarations: D) -> Self {
        Self {
            io,
            transform,
            declarations,
            records: HashMap::new(),
            produced: HashMap::new(),
        }
    }

    /// Builds the graph reachable from `entry`.
    ///
    /// The entry must be project-relative and resolve inside the root; a
    /// path escaping it is rejected before any I/O occurs.
    pub fn build(&mut self, entry: &Path) -> Result<(), BuildError> {
        let normalized = normalize(entry);
        if entry.is_absolute() || escapes_root(&normalized) {
            return Err(BuildError::OutOfRoot {
                path: entry.to_path_buf(),
                specifier: entry.display().to_string(),
            });
        }
        self.resolve(&normalized)?;
        Ok(())
    }

    /// Looks up the build record of a previously resolved path.
    pub fn record(&self, path: &Path) -> Option<&BuildRecord> {
        self.records.get(&normalize(path))
    }

    fn resolve(&mut self, path: &Path) -> Result<BuildRecord, BuildError> {
        // Memo hit doubles as the cycle guard.
        if let Some(existing) = self.records.get(path) {
            return Ok(existing.clone());
        }

        let kind = SourceKind::from_path(path).ok_or_else(|| BuildError::UnsupportedFileType {
            path: path.to_path_buf(),
            extension: path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
        })?;

        let output_path = kind.output_path(path);
        let declaration_path = kind.declaration_path(path);

        if let Some(first) = self.produced.get(&output_path) {
            return Err(BuildError::OutputCollision {
                output: output_path,
                first: first.clone(),
                second: path.to_path_buf(),
            });
        }
        self.produced.insert(output_path.clone(), path.to_path_buf());

        // Register before reading, transforming, or recursing: this is the
        // ordering that breaks import cycles.
        let record = BuildRecord {
            input_path: path.to_path_buf(),
            output_path: output_path.clone(),
            declaration_path: declaration_path.clone(),
        };
        self.records.insert(path.to_path_buf(), record.clone());

        let source = self
            .io
            .read_input_file(path)
            .map_err(|e| BuildError::Read {
                path: path.to_path_buf(),
                source: e,
            })?;

        let code = if kind.needs_transform() {
            self.transform
                .transform_source(&source)
                .map_err(|e| transform_error(path, &source, e))?
        } else {
            source.clone()
        };

        let linked = self.link_specifiers(path, &code, LinkTarget::Executable)?;
        self.io
            .write_output_file(&output_path, &linked)
            .map_err(|e| BuildError::Write {
                path: output_path.clone(),
                source: e,
            })?;

        if let Some(decl_path) = &declaration_path {
            // Declarations come from the original, untransformed source:
            // erasure strips exactly the surface the declaration needs.
            let declaration =
                self.declarations
                    .emit_declaration(&source)
                    .map_err(|e| BuildError::DeclarationEmit {
                        path: path.to_path_buf(),
                        source: e,
                    })?;
            let linked = self.link_specifiers(path, &declaration, LinkTarget::Declaration)?;
            self.io
                .write_output_file(decl_path, &linked)
                .map_err(|e| BuildError::Write {
                    path: decl_path.clone(),
                    source: e,
                })?;
        }

        Ok(record)
    }

    /// Rewrites every relative specifier in `text` to its dependency's
    /// output artifact, resolving dependencies along the way.
    fn link_specifiers(
        &mut self,
        path: &Path,
        text: &str,
        target: LinkTarget,
    ) -> Result<String, BuildError> {
        let specifiers = molt_scan::scan(text).map_err(|e| BuildError::Scan {
            path: path.to_path_buf(),
            source: e,
        })?;

        let dir = path.parent().unwrap_or(Path::new("")).to_path_buf();
        let mut edits = Vec::new();

        for spec in specifiers {
            if !spec.value.starts_with("./") && !spec.value.starts_with("../") {
                // Bare package names and absolute URLs pass through.
                continue;
            }

            let referenced = normalize(&dir.join(&spec.value));
            if escapes_root(&referenced) {
                return Err(BuildError::OutOfRoot {
                    path: path.to_path_buf(),
                    specifier: referenced.display().to_string(),
                });
            }

            let dep = match target {
                LinkTarget::Executable => self.resolve(&referenced)?,
                LinkTarget::Declaration => match self.records.get(&referenced) {
                    Some(record) if record.declaration_path.is_some() => record.clone(),
                    _ => {
                        return Err(BuildError::MissingDeclaration {
                            path: path.to_path_buf(),
                            dependency: referenced,
                        })
                    }
                },
            };

            // An executable specifier whose artifact keeps the input path
            // needs no edit; declaration specifiers are always rewritten to
            // the executable sibling.
            if target == LinkTarget::Executable && dep.output_path == referenced {
                continue;
            }

            let specifier = relative_specifier(&dep.output_path, &dir);
            edits.push(Edit {
                span: spec.span,
                replacement: format!("\"{specifier}\""),
            });
        }

        Ok(rewrite(text, &edits))
    }
}

fn transform_error(path: &Path, source: &str, err: TransformError) -> BuildError {
    let diagnostic = err
        .line
        .and_then(|line| {
            source
                .lines()
                .nth(line.checked_sub(1)?)
                .map(|text| TransformDiagnostic {
                    line,
                    text: text.to_string(),
                })
        });
    BuildError::Transform {
        path: path.to_path_buf(),
        message: err.message,
        diagnostic,
    }
}

/// Lexically normalizes a project-relative path: drops `.` components and
/// resolves `..` against preceding components. Leading `..`s survive, which
/// is how root escapes are detected.
pub fn normalize(path: &Path) -> PathBuf {
    let mut leading_parents = 0usize;
    let mut stack: Vec<OsString> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                if stack.pop().is_none() {
                    leading_parents += 1;
                }
            }
            Component::Normal(part) => stack.push(part.to_os_string()),
        }
    }

    let mut normalized = PathBuf::new();
    for _ in 0..leading_parents {
        normalized.push("..");
    }
    for part in stack {
        normalized.push(part);
    }
    normalized
}

/// Whether a normalized project-relative path points outside the root.
fn escapes_root(path: &Path) -> bool {
    matches!(path.components().next(), Some(Component::ParentDir))
}

/// Expresses `target` relative to `base_dir` (both normalized and
/// project-relative) in specifier syntax: forward slashes, and a `./`
/// prefix unless the path climbs out of `base_dir`.
fn relative_specifier(target: &Path, base_dir: &Path) -> String {
    let target_parts: Vec<&str> = specifier_parts(target);
    let base_parts: Vec<&str> = specifier_parts(base_dir);

    let mut common = 0;
    while common < base_parts.len()
        && common < target_parts.len().saturating_sub(1)
        && base_parts[common] == target_parts[common]
    {
        common += 1;
    }

    let mut parts: Vec<&str> = Vec::new();
    for _ in common..base_parts.len() {
        parts.push("..");
    }
    parts.extend(&target_parts[common..]);

    let joined = parts.join("/");
    if joined.starts_with("../") {
        joined
    } else {
        format!("./{joined}")
    }
}

fn specifier_parts(path: &Path) -> Vec<&str> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect()
}
