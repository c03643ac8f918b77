//! # outline-base
//!
//! Outline building for a Dart-like front end: turns parser events into
//! declaration fragments, synthesizes mixin application classes, computes
//! canonical names and resolves import/export/part directives.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! outline → BuilderFactory, fragments, scopes, names, directives
//!   ↓
//! base    → Primitives (FileId, offsets, UnitSet)
//! ```

/// Foundation types: FileId, offsets, the unit table
pub mod base;

/// Outline builder: fragments, scopes, names, mixins, directives
pub mod outline;

pub use base::{DeclarationOffsets, FileId, TextRange, TextSize, UnitSet};
pub use outline::{BuilderFactory, CompilationContext, OutlineConfig, UnitDescriptor, UnitOutline};
