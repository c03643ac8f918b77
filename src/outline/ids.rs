//! Identifiers for fragments, type variables and scope frames.

use std::fmt;

use crate::base::FileId;

/// A globally unique identifier for a fragment.
///
/// Combines the unit that declared the fragment with a unit-local index.
/// Local indices are assigned in event order, so they are stable across
/// rebuilds of an unchanged unit.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FragmentId {
    /// The unit containing this fragment
    pub file: FileId,
    /// The local index within the unit
    pub local: u32,
}

impl FragmentId {
    #[inline]
    pub const fn new(file: FileId, local: u32) -> Self {
        Self { file, local }
    }
}

impl fmt::Debug for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FragmentId({:?}:{})", self.file, self.local)
    }
}

/// Hands out [`FragmentId`]s for one unit in creation order.
#[derive(Debug, Clone)]
pub struct FragmentIdAllocator {
    file: FileId,
    next: u32,
}

impl FragmentIdAllocator {
    pub fn new(file: FileId) -> Self {
        Self { file, next: 0 }
    }

    pub fn next_id(&mut self) -> FragmentId {
        let id = FragmentId::new(self.file, self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u32 {
        self.next
    }
}

/// Identity of a nominal type-parameter builder.
///
/// Two builders with the same name are still distinct variables; all
/// substitution and "uses type parameter" checks compare these ids.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NominalVariableId {
    pub file: FileId,
    pub local: u32,
}

impl fmt::Debug for NominalVariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nominal({:?}:{})", self.file, self.local)
    }
}

/// Identity of a structural (function-type) type-parameter builder.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct StructuralVariableId {
    pub file: FileId,
    pub local: u32,
}

impl fmt::Debug for StructuralVariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Structural({:?}:{})", self.file, self.local)
    }
}

/// Index of a frame in the scope arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub struct ScopeId(pub(crate) u32);

impl ScopeId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}
