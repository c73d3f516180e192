use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use molt_cache::TransformCache;
use molt_driver::builder::Builder;
use molt_driver::error::{BoxError, BuildError};
use molt_driver::io::FsIo;
use molt_driver::transform::{
    CachedTransform, CommandDeclarationEmitter, CommandTransform, DeclarationEmitter, Transform,
    TransformError,
};

#[derive(Parser)]
#[command(
    name = "molt",
    version = "0.1.0",
    about = "Incremental module build orchestrator for TypeScript sources",
    long_about = "Walks the relative-import graph from an entry file, transforms each\nsource exactly once, rewrites cross-file specifiers to the produced\nartifacts, and emits parallel declaration files for type-erased sources."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the module graph reachable from one or more entry files
    Build {
        /// The root directory of the project
        #[arg(long)]
        root: PathBuf,

        /// The output directory
        #[arg(long)]
        out: PathBuf,

        /// Entry file; may be given multiple times
        #[arg(long, required = true)]
        entry: Vec<PathBuf>,

        /// Shell command erasing types: source on stdin, output on stdout
        #[arg(long)]
        transform_cmd: Option<String>,

        /// Shell command emitting a declaration: source on stdin, output on stdout
        #[arg(long)]
        declaration_cmd: Option<String>,

        /// Transform cache directory (default: ~/.cache/molt/transformed)
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Disable the transform cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Scan a file and print its module specifiers (debug)
    Scan {
        /// Input file
        input: PathBuf,

        /// Show byte ranges
        #[arg(short, long)]
        positions: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            root,
            out,
            entry,
            transform_cmd,
            declaration_cmd,
            cache_dir,
            no_cache,
        } => build_command(
            root,
            out,
            entry,
            transform_cmd,
            declaration_cmd,
            cache_dir,
            no_cache,
        ),
        Commands::Scan { input, positions } => scan_command(input, positions),
    }
}

#[allow(clippy::too_many_arguments)]
fn build_command(
    root: PathBuf,
    out: PathBuf,
    entries: Vec<PathBuf>,
    transform_cmd: Option<String>,
    declaration_cmd: Option<String>,
    cache_dir: Option<PathBuf>,
    no_cache: bool,
) -> ExitCode {
    let root = match root.canonicalize() {
        Ok(root) => root,
        Err(error) => {
            eprintln!("cannot resolve root {}: {error}", root.display());
            return ExitCode::FAILURE;
        }
    };

    let cache = open_cache(cache_dir, no_cache);

    let transform = match transform_cmd {
        Some(cmd) => CliTransform::Command(CachedTransform::new(CommandTransform::new(cmd), cache)),
        None => CliTransform::Unavailable,
    };
    let declarations = match declaration_cmd {
        Some(cmd) => CliDeclarations::Command(CommandDeclarationEmitter::new(cmd)),
        None => CliDeclarations::Unavailable,
    };

    let mut builder = Builder::new(FsIo::new(root.clone(), out), transform, declarations);

    for entry in entries {
        let relative = match relativize_entry(&entry, &root) {
            Some(relative) => relative,
            None => {
                eprintln!(
                    "entry file \"{}\" is outside of the project root",
                    entry.display()
                );
                return ExitCode::FAILURE;
            }
        };

        if let Err(error) = builder.build(&relative) {
            report_build_error(&error, &root);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

fn scan_command(input: PathBuf, positions: bool) -> ExitCode {
    let source = match fs::read_to_string(&input) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("cannot read {}: {error}", input.display());
            return ExitCode::FAILURE;
        }
    };

    match molt_scan::scan(&source) {
        Ok(specifiers) => {
            for spec in specifiers {
                if positions {
                    println!("{}..{}\t{}", spec.span.start, spec.span.end, spec.value);
                } else {
                    println!("{}", spec.value);
                }
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            report_error(
                "E0002",
                "Scan error",
                &error.message,
                error.span.start,
                error.span.end.max(error.span.start + 1),
                &input.display().to_string(),
                &source,
            );
            ExitCode::FAILURE
        }
    }
}

// Helper functions

fn open_cache(cache_dir: Option<PathBuf>, no_cache: bool) -> TransformCache {
    if no_cache || std::env::var_os("MOLT_DISABLE_CACHE").is_some() {
        return TransformCache::disabled();
    }

    let dir = cache_dir.or_else(|| dirs::cache_dir().map(|d| d.join("molt").join("transformed")));
    match dir {
        Some(dir) => TransformCache::open(&dir),
        None => TransformCache::disabled(),
    }
}

/// Expresses an entry path relative to the canonicalized project root.
///
/// Returns `None` when the entry does not live under the root.
fn relativize_entry(entry: &Path, root: &Path) -> Option<PathBuf> {
    let absolute = entry
        .canonicalize()
        .or_else(|_| std::path::absolute(entry))
        .ok()?;
    Some(absolute.strip_prefix(root).ok()?.to_path_buf())
}

fn report_build_error(error: &BuildError, root: &Path) {
    // Transform failures that point at a source line get the full
    // annotated-snippet treatment; everything else prints plainly.
    if let BuildError::Transform {
        path,
        message,
        diagnostic: Some(diagnostic),
    } = error
    {
        if let Ok(source) = fs::read_to_string(root.join(path)) {
            if let Some((start, end)) = line_span(&source, diagnostic.line) {
                report_error(
                    "E0001",
                    "Transform error",
                    message,
                    start,
                    end,
                    &path.display().to_string(),
                    &source,
                );
                return;
            }
        }
    }

    eprintln!("error: {}", render_chain(error));
}

/// Renders an error with its chain of causes.
fn render_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(&format!("\n  caused by: {cause}"));
        source = cause.source();
    }
    message
}

/// Byte range of a 1-based line within `source`, terminator excluded.
fn line_span(source: &str, line: usize) -> Option<(usize, usize)> {
    let mut start = 0;
    let mut current = 1;
    for segment in source.split_inclusive('\n') {
        let text_len = segment.trim_end_matches(['\n', '\r']).len();
        if current == line {
            return Some((start, start + text_len.max(1)));
        }
        start += segment.len();
        current += 1;
    }
    None
}

fn report_error(
    code: &str,
    title: &str,
    message: &str,
    start: usize,
    end: usize,
    filename: &str,
    source: &str,
) {
    let span = (filename, start..end);
    Report::build(ReportKind::Error, span.clone())
        .with_code(code)
        .with_message(title)
        .with_label(Label::new(span).with_message(message).with_color(Color::Red))
        .finish()
        .print((filename, Source::from(source)))
        .unwrap();
}

/// Transform wiring for the CLI: a configured command behind the cache, or
/// a hard error when `.ts` sources appear without `--transform-cmd`.
enum CliTransform {
    Command(CachedTransform<CommandTransform>),
    Unavailable,
}

impl Transform for CliTransform {
    fn transform_source(&self, code: &str) -> Result<String, TransformError> {
        match self {
            Self::Command(transform) => transform.transform_source(code),
            Self::Unavailable => Err(TransformError {
                message: "no transform command configured (pass --transform-cmd)".to_string(),
                line: None,
            }),
        }
    }
}

enum CliDeclarations {
    Command(CommandDeclarationEmitter),
    Unavailable,
}

impl DeclarationEmitter for CliDeclarations {
    fn emit_declaration(&self, code: &str) -> Result<String, BoxError> {
        match self {
            Self::Command(emitter) => emitter.emit_declaration(code),
            Self::Unavailable => {
                Err("no declaration command configured (pass --declaration-cmd)".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_span_finds_lines() {
        let source = "first\nsecond\nthird";
        assert_eq!(line_span(source, 1), Some((0, 5)));
        assert_eq!(line_span(source, 2), Some((6, 12)));
        assert_eq!(line_span(source, 3), Some((13, 18)));
        assert_eq!(line_span(source, 4), None);
    }

    #[test]
    fn relativize_entry_rejects_outside_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("project");
        fs::create_dir_all(&root).unwrap();
        let root = root.canonicalize().unwrap();

        let inside = root.join("main.ts");
        fs::write(&inside, "export {};").unwrap();
        assert_eq!(
            relativize_entry(&inside, &root),
            Some(PathBuf::from("main.ts"))
        );

        let outside = dir.path().join("outside.ts");
        fs::write(&outside, "export {};").unwrap();
        assert_eq!(relativize_entry(&outside, &root), None);
    }
}
