//! Unit set management for tracking compilation units by URI.

use indexmap::IndexMap;
use parking_lot::RwLock;
use url::Url;

use super::FileId;

/// Assigns stable [`FileId`]s to resolved unit URIs.
///
/// This is the deduplicating table the loader consults before scheduling a
/// unit: requesting the same import URI twice yields the same id, which is
/// what keeps recursive loads from re-entering a unit that is already being
/// built.
#[derive(Debug, Default)]
pub struct UnitSet {
    inner: RwLock<UnitSetInner>,
}

#[derive(Debug, Default)]
struct UnitSetInner {
    /// Import URI → FileId mapping
    uri_to_id: IndexMap<Url, FileId>,
    /// FileId → (import URI, file URI)
    units: IndexMap<FileId, UnitUris>,
    /// Next FileId to assign
    next_id: u32,
}

#[derive(Debug, Clone)]
struct UnitUris {
    import_uri: Url,
    file_uri: Url,
}

impl UnitSet {
    /// Create a new empty unit set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a FileId for an import URI.
    ///
    /// The first request decides the unit's file URI; `None` means the
    /// file URI is the import URI itself.
    pub fn unit_id(&self, import_uri: &Url, file_uri: Option<&Url>) -> FileId {
        // Fast path: read lock
        {
            let inner = self.inner.read();
            if let Some(&id) = inner.uri_to_id.get(import_uri) {
                return id;
            }
        }

        // Slow path: write lock
        let mut inner = self.inner.write();

        // Double-check
        if let Some(&id) = inner.uri_to_id.get(import_uri) {
            return id;
        }

        let id = FileId::new(inner.next_id);
        inner.next_id += 1;
        inner.uri_to_id.insert(import_uri.clone(), id);
        inner.units.insert(
            id,
            UnitUris {
                import_uri: import_uri.clone(),
                file_uri: file_uri.cloned().unwrap_or_else(|| import_uri.clone()),
            },
        );
        id
    }

    /// Look up the id of an already known unit.
    pub fn lookup(&self, import_uri: &Url) -> Option<FileId> {
        self.inner.read().uri_to_id.get(import_uri).copied()
    }

    /// Get the import URI for a FileId.
    pub fn import_uri(&self, file: FileId) -> Option<Url> {
        self.inner.read().units.get(&file).map(|u| u.import_uri.clone())
    }

    /// Get the file URI for a FileId.
    pub fn file_uri(&self, file: FileId) -> Option<Url> {
        self.inner.read().units.get(&file).map(|u| u.file_uri.clone())
    }

    /// Get the number of units.
    pub fn len(&self) -> usize {
        self.inner.read().uri_to_id.len()
    }

    /// Check if the unit set is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All unit ids in assignment order.
    pub fn units(&self) -> Vec<FileId> {
        self.inner.read().units.keys().copied().collect()
    }
}
