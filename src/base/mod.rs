//! Foundation types for the outline builder.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`FileId`] - Interned compilation-unit identifiers
//! - [`TextRange`], [`TextSize`], [`DeclarationOffsets`] - Source positions
//! - [`UnitSet`] - Deduplicating URI → [`FileId`] table
//!
//! This module has NO dependencies on other outline modules.

mod file_id;
mod span;
mod unit_set;

pub use file_id::FileId;
pub use span::{DeclarationOffsets, TextRange, TextSize};
pub use unit_set::UnitSet;

// Re-export text-size types for convenience
pub use text_size;
