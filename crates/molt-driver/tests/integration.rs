//! Integration tests for the build orchestrator.
//!
//! The orchestrator is driven through in-memory I/O and mock collaborators
//! so graph behavior is observable without touching the filesystem; the
//! CLI smoke tests at the bottom spawn the real binary with `cat` as the
//! identity transform.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use molt_driver::builder::Builder;
use molt_driver::error::{BoxError, BuildError};
use molt_driver::io::BuildIo;
use molt_driver::transform::{DeclarationEmitter, Transform, TransformError};

// Test doubles

struct MemIo {
    files: HashMap<PathBuf, String>,
    outputs: RefCell<BTreeMap<PathBuf, String>>,
    reads: RefCell<Vec<PathBuf>>,
}

impl MemIo {
    fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, content)| (PathBuf::from(path), content.to_string()))
                .collect(),
            outputs: RefCell::new(BTreeMap::new()),
            reads: RefCell::new(Vec::new()),
        }
    }

    fn output(&self, path: &str) -> Option<String> {
        self.outputs.borrow().get(Path::new(path)).cloned()
    }

    fn output_paths(&self) -> Vec<PathBuf> {
        self.outputs.borrow().keys().cloned().collect()
    }
}

impl BuildIo for MemIo {
    fn read_input_file(&self, path: &Path) -> Result<String, BoxError> {
        self.reads.borrow_mut().push(path.to_path_buf());
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| format!("no such file: {}", path.display()).into())
    }

    fn write_output_file(&self, path: &Path, content: &str) -> Result<(), BoxError> {
        self.outputs
            .borrow_mut()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }
}

/// Erasure stand-in: drops `type ...` lines and records every invocation.
struct ErasingTransform {
    calls: RefCell<Vec<String>>,
}

impl ErasingTransform {
    fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Transform for ErasingTransform {
    fn transform_source(&self, code: &str) -> Result<String, TransformError> {
        self.calls.borrow_mut().push(code.to_string());
        let erased: Vec<&str> = code
            .lines()
            .filter(|line| !line.trim_start().starts_with("type "))
            .collect();
        Ok(erased.join("\n"))
    }
}

struct FailingTransform {
    message: String,
    line: Option<usize>,
}

impl Transform for FailingTransform {
    fn transform_source(&self, _code: &str) -> Result<String, TransformError> {
        Err(TransformError {
            message: self.message.clone(),
            line: self.line,
        })
    }
}

/// Emits the source itself as its declaration, which preserves import
/// statements; good enough to observe declaration-side specifier linking.
struct IdentityDeclarations;

impl DeclarationEmitter for IdentityDeclarations {
    fn emit_declaration(&self, code: &str) -> Result<String, BoxError> {
        Ok(code.to_string())
    }
}

struct FailingDeclarations;

impl DeclarationEmitter for FailingDeclarations {
    fn emit_declaration(&self, _code: &str) -> Result<String, BoxError> {
        Err("diagnostics: something undeclarable".into())
    }
}

fn builder<'a>(
    io: &'a MemIo,
    transform: &'a ErasingTransform,
) -> Builder<&'a MemIo, &'a ErasingTransform, IdentityDeclarations> {
    Builder::new(io, transform, IdentityDeclarations)
}

// Graph walking

#[test]
fn builds_acyclic_graph_with_one_artifact_per_file() {
    let io = MemIo::new(&[
        (
            "main.ts",
            "import { a } from \"./a.ts\";\nimport { b } from \"./b.ts\";\nexport const m = a + b;",
        ),
        ("a.ts", "import { b } from \"./b.ts\";\nexport const a = b;"),
        ("b.ts", "export const b = 1;"),
    ]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    builder.build(Path::new("main.ts")).unwrap();

    assert_eq!(
        io.output_paths(),
        vec![
            PathBuf::from("a.d.ts"),
            PathBuf::from("a.js"),
            PathBuf::from("b.d.ts"),
            PathBuf::from("b.js"),
            PathBuf::from("main.d.ts"),
            PathBuf::from("main.js"),
        ]
    );
    let main_js = io.output("main.js").unwrap();
    assert!(main_js.contains("\"./a.js\""));
    assert!(main_js.contains("\"./b.js\""));
    assert!(io.output("a.js").unwrap().contains("\"./b.js\""));
    assert_eq!(transform.call_count(), 3);
}

#[test]
fn mutual_import_cycle_terminates_with_one_output_each() {
    let io = MemIo::new(&[
        ("a.ts", "import { b } from \"./b.ts\";\nexport const a = 1;"),
        ("b.ts", "import { a } from \"./a.ts\";\nexport const b = 2;"),
    ]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    builder.build(Path::new("a.ts")).unwrap();

    assert!(io.output("a.js").unwrap().contains("\"./b.js\""));
    assert!(io.output("b.js").unwrap().contains("\"./a.js\""));
    // Each file transformed exactly once despite the cycle.
    assert_eq!(transform.call_count(), 2);
}

#[test]
fn self_import_terminates() {
    let io = MemIo::new(&[(
        "loop.ts",
        "import { x } from \"./loop.ts\";\nexport const x = 1;",
    )]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    builder.build(Path::new("loop.ts")).unwrap();

    assert!(io.output("loop.js").unwrap().contains("\"./loop.js\""));
    assert_eq!(transform.call_count(), 1);
}

#[test]
fn diamond_dependency_is_transformed_once() {
    let io = MemIo::new(&[
        (
            "top.ts",
            "import \"./left.ts\";\nimport \"./right.ts\";\nexport {};",
        ),
        ("left.ts", "import \"./shared.ts\";\nexport {};"),
        ("right.ts", "import \"./shared.ts\";\nexport {};"),
        ("shared.ts", "export const s = 1;"),
    ]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    builder.build(Path::new("top.ts")).unwrap();

    assert_eq!(transform.call_count(), 4);
    let shared_inputs = transform
        .calls
        .borrow()
        .iter()
        .filter(|code| code.contains("const s"))
        .count();
    assert_eq!(shared_inputs, 1);
}

#[test]
fn building_the_same_entry_twice_is_a_lookup() {
    let io = MemIo::new(&[("main.ts", "export const m = 1;")]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    builder.build(Path::new("main.ts")).unwrap();
    builder.build(Path::new("main.ts")).unwrap();

    assert_eq!(transform.call_count(), 1);
}

#[test]
fn entries_share_dependencies_through_one_builder() {
    let io = MemIo::new(&[
        ("one.ts", "import \"./shared.ts\";\nexport {};"),
        ("two.ts", "import \"./shared.ts\";\nexport {};"),
        ("shared.ts", "export const s = 1;"),
    ]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    builder.build(Path::new("one.ts")).unwrap();
    builder.build(Path::new("two.ts")).unwrap();

    assert_eq!(transform.call_count(), 3);
}

#[test]
fn nested_directories_get_climbing_specifiers() {
    let io = MemIo::new(&[
        (
            "sub/app.ts",
            "import { b } from \"../lib/b.ts\";\nexport const app = b;",
        ),
        ("lib/b.ts", "export const b = 1;"),
    ]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    builder.build(Path::new("sub/app.ts")).unwrap();

    assert!(io.output("sub/app.js").unwrap().contains("\"../lib/b.js\""));
    assert!(io.output("lib/b.js").is_some());
    assert!(io.output("sub/app.d.ts").is_some());
}

#[test]
fn bare_and_builtin_specifiers_pass_through() {
    let io = MemIo::new(&[(
        "main.ts",
        "import fs from \"node:fs\";\nimport lib from \"some-package\";\nexport {};",
    )]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    builder.build(Path::new("main.ts")).unwrap();

    let output = io.output("main.js").unwrap();
    assert!(output.contains("\"node:fs\""));
    assert!(output.contains("\"some-package\""));
}

#[test]
fn javascript_graph_needs_no_transform() {
    let io = MemIo::new(&[
        ("main.js", "import { d } from \"./dep.mjs\";\nexport const m = d;"),
        ("dep.mjs", "export const d = 1;"),
    ]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    builder.build(Path::new("main.js")).unwrap();

    assert_eq!(transform.call_count(), 0);
    assert_eq!(
        io.output_paths(),
        vec![PathBuf::from("dep.mjs"), PathBuf::from("main.js")]
    );
}

#[test]
fn javascript_importing_typescript_is_rewritten() {
    let io = MemIo::new(&[
        ("main.js", "import { t } from \"./typed.ts\";\nexport const m = t;"),
        ("typed.ts", "export const t = 1;"),
    ]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    builder.build(Path::new("main.js")).unwrap();

    assert!(io.output("main.js").unwrap().contains("\"./typed.js\""));
    assert!(io.output("typed.js").is_some());
}

#[test]
fn export_from_specifiers_participate_in_the_graph() {
    let io = MemIo::new(&[
        ("index.ts", "export * from \"./all.ts\";\nexport { one } from \"./named.ts\";"),
        ("all.ts", "export const everything = 1;"),
        ("named.ts", "export const one = 1;"),
    ]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    builder.build(Path::new("index.ts")).unwrap();

    let output = io.output("index.js").unwrap();
    assert!(output.contains("export * from \"./all.js\""));
    assert!(output.contains("export { one } from \"./named.js\""));
}

#[test]
fn records_expose_artifact_paths() {
    let io = MemIo::new(&[("main.ts", "export {};")]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    builder.build(Path::new("main.ts")).unwrap();

    let record = builder.record(Path::new("./main.ts")).unwrap();
    assert_eq!(record.output_path, PathBuf::from("main.js"));
    assert_eq!(record.declaration_path, Some(PathBuf::from("main.d.ts")));
}

// Declaration linking

#[test]
fn declarations_reference_executable_siblings() {
    let io = MemIo::new(&[
        ("a.ts", "import { b } from \"./b.ts\";\nexport const a = b;"),
        ("b.ts", "export const b = 1;"),
    ]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    builder.build(Path::new("a.ts")).unwrap();

    let declaration = io.output("a.d.ts").unwrap();
    // Never "./b.d.ts": declarations import the executable artifact.
    assert!(declaration.contains("\"./b.js\""));
    assert!(!declaration.contains("b.d.ts"));
}

#[test]
fn declaration_importing_untyped_dependency_fails() {
    let io = MemIo::new(&[
        ("a.ts", "import { h } from \"./plain.js\";\nexport const a = h;"),
        ("plain.js", "export const h = 1;"),
    ]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    let error = builder.build(Path::new("a.ts")).unwrap_err();
    assert!(matches!(
        error,
        BuildError::MissingDeclaration { ref dependency, .. } if dependency == Path::new("plain.js")
    ));
}

#[test]
fn declaration_emitter_failure_aborts() {
    let io = MemIo::new(&[("a.ts", "export const a = 1;")]);
    let transform = ErasingTransform::new();
    let mut builder = Builder::new(&io, &transform, FailingDeclarations);

    let error = builder.build(Path::new("a.ts")).unwrap_err();
    assert!(matches!(error, BuildError::DeclarationEmit { .. }));
}

// Error paths

#[test]
fn out_of_root_import_fails_and_writes_nothing() {
    let io = MemIo::new(&[("x.ts", "import { o } from \"../outside.ts\";\nexport {};")]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    let error = builder.build(Path::new("x.ts")).unwrap_err();
    assert!(matches!(
        error,
        BuildError::OutOfRoot { ref specifier, .. } if specifier == "../outside.ts"
    ));
    assert!(io.output_paths().is_empty());
}

#[test]
fn out_of_root_entry_is_rejected_before_any_io() {
    let io = MemIo::new(&[]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    let error = builder.build(Path::new("../elsewhere/main.ts")).unwrap_err();
    assert!(matches!(error, BuildError::OutOfRoot { .. }));
    assert!(io.reads.borrow().is_empty());
}

#[test]
fn sneaky_escape_through_subdirectory_is_caught() {
    let io = MemIo::new(&[(
        "sub/x.ts",
        "import { o } from \"../../outside.ts\";\nexport {};",
    )]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    let error = builder.build(Path::new("sub/x.ts")).unwrap_err();
    assert!(matches!(error, BuildError::OutOfRoot { .. }));
}

#[test]
fn unsupported_extension_is_fatal() {
    let io = MemIo::new(&[("main.ts", "import \"./style.css\";\nexport {};")]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    let error = builder.build(Path::new("main.ts")).unwrap_err();
    assert!(matches!(
        error,
        BuildError::UnsupportedFileType { ref extension, .. } if extension == "css"
    ));
}

#[test]
fn missing_dependency_is_a_read_error() {
    let io = MemIo::new(&[("main.ts", "import \"./ghost.ts\";\nexport {};")]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    let error = builder.build(Path::new("main.ts")).unwrap_err();
    assert!(matches!(
        error,
        BuildError::Read { ref path, .. } if path == Path::new("ghost.ts")
    ));
}

#[test]
fn transform_failure_carries_the_offending_line() {
    let io = MemIo::new(&[(
        "bad.ts",
        "const ok = 1;\nconst bad: = 2;\nconst after = 3;",
    )]);
    let transform = FailingTransform {
        message: "unexpected token".to_string(),
        line: Some(2),
    };
    let mut builder = Builder::new(&io, transform, IdentityDeclarations);

    let error = builder.build(Path::new("bad.ts")).unwrap_err();
    match error {
        BuildError::Transform {
            diagnostic: Some(diagnostic),
            ..
        } => {
            assert_eq!(diagnostic.line, 2);
            assert_eq!(diagnostic.text, "const bad: = 2;");
        }
        other => panic!("expected a located transform error, got {other:?}"),
    }
}

#[test]
fn transform_failure_without_location_is_generic() {
    let io = MemIo::new(&[("bad.ts", "whatever")]);
    let transform = FailingTransform {
        message: "opaque failure".to_string(),
        line: None,
    };
    let mut builder = Builder::new(&io, transform, IdentityDeclarations);

    let error = builder.build(Path::new("bad.ts")).unwrap_err();
    assert!(matches!(
        error,
        BuildError::Transform {
            diagnostic: None,
            ..
        }
    ));
}

#[test]
fn scan_failure_in_transformed_output_is_fatal() {
    struct BrokenOutput;
    impl Transform for BrokenOutput {
        fn transform_source(&self, _code: &str) -> Result<String, TransformError> {
            Ok("import x from \"./trunc".to_string())
        }
    }

    let io = MemIo::new(&[("main.ts", "export {};")]);
    let mut builder = Builder::new(&io, BrokenOutput, IdentityDeclarations);

    let error = builder.build(Path::new("main.ts")).unwrap_err();
    assert!(matches!(error, BuildError::Scan { .. }));
}

#[test]
fn output_collision_is_an_explicit_error() {
    let io = MemIo::new(&[
        ("main.ts", "import \"./a.ts\";\nimport \"./a.js\";\nexport {};"),
        ("a.ts", "export const one = 1;"),
        ("a.js", "export const two = 2;"),
    ]);
    let transform = ErasingTransform::new();
    let mut builder = builder(&io, &transform);

    let error = builder.build(Path::new("main.ts")).unwrap_err();
    assert!(matches!(
        error,
        BuildError::OutputCollision { ref output, .. } if output == Path::new("a.js")
    ));
}

// CLI smoke tests

fn molt_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_molt"))
}

#[test]
fn cli_builds_a_graph_with_identity_commands() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("project");
    let out = dir.path().join("dist");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(
        root.join("main.ts"),
        "import { u } from \"./util.ts\";\nexport const m = u;",
    )
    .unwrap();
    std::fs::write(root.join("util.ts"), "export const u = 1;").unwrap();

    let status = std::process::Command::new(molt_binary())
        .arg("build")
        .arg("--root")
        .arg(&root)
        .arg("--out")
        .arg(&out)
        .arg("--entry")
        .arg(root.join("main.ts"))
        .arg("--transform-cmd")
        .arg("cat")
        .arg("--declaration-cmd")
        .arg("cat")
        .arg("--no-cache")
        .status()
        .expect("failed to run molt");
    assert!(status.success());

    let main_js = std::fs::read_to_string(out.join("main.js")).unwrap();
    assert!(main_js.contains("\"./util.js\""));
    assert!(out.join("util.js").is_file());

    let main_dts = std::fs::read_to_string(out.join("main.d.ts")).unwrap();
    assert!(main_dts.contains("\"./util.js\""));
}

#[test]
fn cli_rejects_entry_outside_root() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("project");
    std::fs::create_dir_all(&root).unwrap();
    let outside = dir.path().join("outside.ts");
    std::fs::write(&outside, "export {};").unwrap();

    let output = std::process::Command::new(molt_binary())
        .arg("build")
        .arg("--root")
        .arg(&root)
        .arg("--out")
        .arg(dir.path().join("dist"))
        .arg("--entry")
        .arg(&outside)
        .arg("--no-cache")
        .output()
        .expect("failed to run molt");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("outside of the project root"));
}

#[test]
fn cli_scan_prints_specifiers() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("mod.ts");
    std::fs::write(
        &file,
        "import a from \"./a.ts\";\nexport * from \"./b.ts\";\n",
    )
    .unwrap();

    let output = std::process::Command::new(molt_binary())
        .arg("scan")
        .arg(&file)
        .output()
        .expect("failed to run molt");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "./a.ts\n./b.ts\n");
}
