//! Transform and declaration collaborators.
//!
//! The erasure transform and the declaration emitter are external to the
//! orchestrator: pure text-to-text functions behind traits. This module
//! provides the child-process adapters the CLI wires in (source on stdin,
//! output on stdout) and the cache wrapper that short-circuits repeat
//! transforms of identical input.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use molt_cache::{ContentHash, TransformCache};

use crate::error::BoxError;

/// Structured failure from the erasure transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformError {
    pub message: String,
    /// 1-based source line the failure points at, when known.
    pub line: Option<usize>,
}

/// The syntax-erasure transform: executable text out of source text.
pub trait Transform {
    fn transform_source(&self, code: &str) -> Result<String, TransformError>;
}

impl<T: Transform + ?Sized> Transform for &T {
    fn transform_source(&self, code: &str) -> Result<String, TransformError> {
        (**self).transform_source(code)
    }
}

/// The declaration-emission engine: declaration text out of source text.
pub trait DeclarationEmitter {
    fn emit_declaration(&self, code: &str) -> Result<String, BoxError>;
}

impl<D: DeclarationEmitter + ?Sized> DeclarationEmitter for &D {
    fn emit_declaration(&self, code: &str) -> Result<String, BoxError> {
        (**self).emit_declaration(code)
    }
}

/// Transform adapter spawning a shell command.
///
/// The command receives the source on stdin and must print the transformed
/// text on stdout. A non-zero exit reports failure; if the first stderr
/// line starts with `line N`, `N` is taken as the 1-based source line of
/// the failure.
pub struct CommandTransform {
    command: String,
}

impl CommandTransform {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Transform for CommandTransform {
    fn transform_source(&self, code: &str) -> Result<String, TransformError> {
        let output = run_filter(&self.command, code).map_err(|e| TransformError {
            message: format!("failed to run transform command: {e}"),
            line: None,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TransformError {
                message: stderr.trim().to_string(),
                line: parse_line_directive(&stderr),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| TransformError {
            message: "transform command produced non-UTF-8 output".to_string(),
            line: None,
        })
    }
}

/// Declaration adapter spawning a shell command, same wire protocol as
/// [`CommandTransform`] minus the line directive.
pub struct CommandDeclarationEmitter {
    command: String,
}

impl CommandDeclarationEmitter {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl DeclarationEmitter for CommandDeclarationEmitter {
    fn emit_declaration(&self, code: &str) -> Result<String, BoxError> {
        let output = run_filter(&self.command, code)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("declaration command failed: {}", stderr.trim()).into());
        }

        Ok(String::from_utf8(output.stdout)?)
    }
}

/// Wraps a transform with the content-addressed cache.
///
/// The cache is consulted here, beside the transform, not by the graph
/// walk: the orchestrator stays oblivious to caching, and a disabled cache
/// simply forwards every call.
pub struct CachedTransform<T> {
    inner: T,
    cache: TransformCache,
}

impl<T> CachedTransform<T> {
    pub fn new(inner: T, cache: TransformCache) -> Self {
        Self { inner, cache }
    }
}

impl<T: Transform> Transform for CachedTransform<T> {
    fn transform_source(&self, code: &str) -> Result<String, TransformError> {
        let hash = ContentHash::of(code);
        if let Some(hit) = self.cache.get(&hash) {
            return Ok(hit);
        }
        let transformed = self.inner.transform_source(code)?;
        self.cache.put(&hash, &transformed);
        Ok(transformed)
    }
}

/// Runs a shell command as a text filter: `input` on stdin, output collected.
fn run_filter(command: &str, input: &str) -> std::io::Result<Output> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Feed stdin from a thread; wait_with_output drains stdout/stderr
    // concurrently, so large payloads cannot deadlock on pipe buffers.
    let writer = child.stdin.take().map(|mut stdin| {
        let payload = input.as_bytes().to_vec();
        std::thread::spawn(move || {
            let _ = stdin.write_all(&payload);
        })
    });

    let output = child.wait_with_output();
    if let Some(handle) = writer {
        let _ = handle.join();
    }
    output
}

/// Parses a leading `line N` directive from transform stderr.
fn parse_line_directive(stderr: &str) -> Option<usize> {
    let rest = stderr.trim_start().strip_prefix("line ")?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
