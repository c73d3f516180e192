//! # Molt Driver
//!
//! The build orchestrator for Molt: walks the relative-import graph from an
//! entry file, transforms each source exactly once, rewrites cross-file
//! specifiers to point at the produced artifacts, and emits parallel
//! declaration artifacts for type-erased sources. The filesystem, the
//! erasure transform, and the declaration emitter are injected behind
//! traits so the walk itself stays pure bookkeeping.

pub mod builder;
pub mod error;
pub mod io;
pub mod rewrite;
pub mod transform;

pub use builder::{BuildRecord, Builder, SourceKind};
pub use error::{BoxError, BuildError};
