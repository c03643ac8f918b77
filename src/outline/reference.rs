//! Stable references from a previous build.
//!
//! A [`ReferenceIndex`] is built from an earlier compilation: per library,
//! per container, canonical name → [`Reference`]. The outline builder only
//! ever looks references up; it never mints them. The
//! [`ReferenceRegistry`] records which fragment claimed which reference so
//! that a reference is handed out at most once.

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use url::Url;

use super::ids::FragmentId;
use super::names::CanonicalName;

/// Opaque identity of a previously compiled entity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference(u32);

impl Reference {
    pub fn index(self) -> u32 {
        self.0
    }
}

// ============================================================================
// INDEX
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct IndexedContainer {
    names: FxHashMap<CanonicalName, Reference>,
}

impl IndexedContainer {
    pub fn lookup(&self, name: &CanonicalName) -> Option<Reference> {
        self.names.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// References of one library: its own container plus one per class-like
/// declaration.
#[derive(Clone, Debug)]
pub struct IndexedLibrary {
    uri: Url,
    library: IndexedContainer,
    classes: FxHashMap<SmolStr, IndexedContainer>,
}

impl IndexedLibrary {
    fn new(uri: Url) -> Self {
        Self {
            uri,
            library: IndexedContainer::default(),
            classes: FxHashMap::default(),
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// `container` is a class name, or `None` for library-level names.
    pub fn container(&self, container: Option<&str>) -> Option<&IndexedContainer> {
        match container {
            None => Some(&self.library),
            Some(name) => self.classes.get(name),
        }
    }

    pub fn lookup(&self, container: Option<&str>, name: &CanonicalName) -> Option<Reference> {
        self.container(container)?.lookup(name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReferenceIndex {
    libraries: FxHashMap<Url, IndexedLibrary>,
    next: u32,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` for a library, returning its reference. Inserting the
    /// same name again returns the existing reference.
    pub fn insert(&mut self, library: &Url, container: Option<&str>, name: CanonicalName) -> Reference {
        let next = &mut self.next;
        let indexed = self
            .libraries
            .entry(library.clone())
            .or_insert_with(|| IndexedLibrary::new(library.clone()));
        let target = match container {
            None => &mut indexed.library,
            Some(class) => indexed.classes.entry(SmolStr::new(class)).or_default(),
        };
        *target.names.entry(name).or_insert_with(|| {
            let reference = Reference(*next);
            *next += 1;
            reference
        })
    }

    pub fn library(&self, uri: &Url) -> Option<&IndexedLibrary> {
        self.libraries.get(uri)
    }

    pub fn lookup(&self, library: &Url, container: Option<&str>, name: &CanonicalName) -> Option<Reference> {
        let reference = self.library(library)?.lookup(container, name);
        tracing::trace!(%library, ?container, %name, ?reference, "reference lookup");
        reference
    }

    pub fn len(&self) -> usize {
        self.next as usize
    }

    pub fn is_empty(&self) -> bool {
        self.next == 0
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Append-only record of which fragment holds which reference.
#[derive(Clone, Debug, Default)]
pub struct ReferenceRegistry {
    claimed: FxHashMap<Reference, FragmentId>,
}

impl ReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `reference` for `fragment`. A reference already held by a
    /// different fragment is not handed out again.
    pub fn claim(&mut self, reference: Reference, fragment: FragmentId) -> Option<Reference> {
        match self.claimed.get(&reference) {
            Some(&holder) if holder == fragment => Some(reference),
            Some(&holder) => {
                tracing::debug!(?reference, ?holder, ?fragment, "reference already claimed");
                None
            }
            None => {
                self.claimed.insert(reference, fragment);
                Some(reference)
            }
        }
    }

    pub fn holder(&self, reference: Reference) -> Option<FragmentId> {
        self.claimed.get(&reference).copied()
    }

    /// Give back every reference held by `fragments`. Returns how many
    /// were released.
    pub fn release(&mut self, fragments: &FxHashSet<FragmentId>) -> usize {
        let before = self.claimed.len();
        self.claimed.retain(|_, holder| !fragments.contains(holder));
        before - self.claimed.len()
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

// ============================================================================
// SNAPSHOTS
// ============================================================================

#[cfg(feature = "snapshot")]
mod snapshot {
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::outline::names::NameKind;

    #[derive(Serialize, Deserialize)]
    struct Entry {
        library: String,
        container: Option<String>,
        kind: String,
        text: String,
        private: bool,
        reference: u32,
    }

    #[derive(Debug, thiserror::Error)]
    pub enum SnapshotError {
        #[error("malformed snapshot: {0}")]
        Json(#[from] serde_json::Error),
        #[error("bad library uri '{0}'")]
        Uri(String),
        #[error("unknown name kind '{0}'")]
        Kind(String),
        #[error("reference {0} leaves no room for new references")]
        ReferenceOverflow(u32),
    }

    impl ReferenceIndex {
        /// Serialize the index as JSON, entries sorted by reference.
        pub fn to_json(&self) -> Result<String, SnapshotError> {
            let mut entries = Vec::new();
            for (uri, library) in &self.libraries {
                let containers = std::iter::once((None, &library.library))
                    .chain(library.classes.iter().map(|(n, c)| (Some(n.to_string()), c)));
                for (container, names) in containers {
                    for (name, reference) in &names.names {
                        entries.push(Entry {
                            library: uri.to_string(),
                            container: container.clone(),
                            kind: name.kind.as_str().to_string(),
                            text: name.text.to_string(),
                            private: name.is_private(),
                            reference: reference.0,
                        });
                    }
                }
            }
            entries.sort_by_key(|e| e.reference);
            Ok(serde_json::to_string_pretty(&entries)?)
        }

        /// Rebuild an index saved with [`to_json`](Self::to_json). Reference
        /// numbers are preserved.
        pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
            let entries: Vec<Entry> = serde_json::from_str(json)?;
            let mut index = ReferenceIndex::new();
            for entry in entries {
                let library = Url::parse(&entry.library).map_err(|_| SnapshotError::Uri(entry.library.clone()))?;
                let kind = NameKind::parse(&entry.kind).ok_or_else(|| SnapshotError::Kind(entry.kind.clone()))?;
                let name = CanonicalName {
                    kind,
                    text: entry.text.into(),
                    library: entry.private.then(|| library.clone()),
                };
                let indexed = index
                    .libraries
                    .entry(library.clone())
                    .or_insert_with(|| IndexedLibrary::new(library.clone()));
                let target = match &entry.container {
                    None => &mut indexed.library,
                    Some(class) => indexed.classes.entry(SmolStr::new(class)).or_default(),
                };
                let next = entry
                    .reference
                    .checked_add(1)
                    .ok_or(SnapshotError::ReferenceOverflow(entry.reference))?;
                target.names.insert(name, Reference(entry.reference));
                index.next = index.next.max(next);
            }
            Ok(index)
        }
    }
}

#[cfg(feature = "snapshot")]
pub use snapshot::SnapshotError;
