//! Cross-unit state: loading, reference bookkeeping, unbound type
//! variables and export edges.
//!
//! One [`CompilationContext`] is shared by every unit of a compilation and
//! is lent to one builder factory at a time.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::{SmolStr, format_smolstr};
use url::Url;

use crate::base::{FileId, TextSize, UnitSet};

use super::config::{EnvironmentOracle, LibrarySupport, OutlineConfig};
use super::directives::Exporter;
use super::error::{BuildResult, InternalError};
use super::ids::{FragmentId, NominalVariableId, StructuralVariableId};
use super::names::CanonicalName;
use super::reference::{Reference, ReferenceIndex, ReferenceRegistry};
use super::types::UnboundVariables;
use super::uri::{NoTranslation, UriTranslator};

// ============================================================================
// LOADING
// ============================================================================

/// A request to make a unit known to the compilation.
#[derive(Clone, Copy, Debug)]
pub struct LoadRequest<'a> {
    pub uri: &'a Url,
    /// Where the unit's source lives, if known.
    pub file_uri: Option<&'a Url>,
    /// Unit containing the directive; `None` for a unit's own registration.
    pub origin: Option<FileId>,
    pub offset: TextSize,
}

/// Schedules units for loading. Requesting a URI twice yields the same
/// id, so a unit that is already being built is never entered again.
pub trait UnitLoader {
    fn read(&self, request: LoadRequest<'_>) -> FileId;
}

impl UnitLoader for UnitSet {
    fn read(&self, request: LoadRequest<'_>) -> FileId {
        let id = self.unit_id(request.uri, request.file_uri);
        tracing::trace!(uri = %request.uri, ?id, origin = ?request.origin, "load unit");
        id
    }
}

/// The URIs a factory builds a unit for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitDescriptor {
    pub import_uri: Url,
    pub file_uri: Url,
    /// Library the unit belongs to; the unit itself unless it is a part.
    pub library_uri: Url,
}

impl UnitDescriptor {
    pub fn library(import_uri: Url) -> Self {
        Self {
            file_uri: import_uri.clone(),
            library_uri: import_uri.clone(),
            import_uri,
        }
    }

    pub fn with_file_uri(mut self, file_uri: Url) -> Self {
        self.file_uri = file_uri;
        self
    }

    pub fn part_of(mut self, library_uri: Url) -> Self {
        self.library_uri = library_uri;
        self
    }

    pub fn is_part(&self) -> bool {
        self.import_uri != self.library_uri
    }
}

// ============================================================================
// CONTEXT
// ============================================================================

#[derive(Debug, Default)]
struct CollectedVariables {
    nominal: FxHashSet<NominalVariableId>,
    structural: FxHashSet<StructuralVariableId>,
    order: UnboundVariables,
}

pub struct CompilationContext {
    pub config: OutlineConfig,
    index: Option<ReferenceIndex>,
    registry: ReferenceRegistry,
    unbound: FxHashMap<Url, CollectedVariables>,
    exporters: FxHashMap<FileId, Vec<Exporter>>,
    unnamed_extensions: FxHashMap<Url, u32>,
    loader: Arc<dyn UnitLoader>,
    translator: Arc<dyn UriTranslator>,
    environment: Arc<dyn EnvironmentOracle>,
}

impl Default for CompilationContext {
    fn default() -> Self {
        Self::new(OutlineConfig::default())
    }
}

impl CompilationContext {
    /// A context with a fresh [`UnitSet`], no URI translation and no
    /// supported libraries.
    pub fn new(config: OutlineConfig) -> Self {
        Self {
            config,
            index: None,
            registry: ReferenceRegistry::new(),
            unbound: FxHashMap::default(),
            exporters: FxHashMap::default(),
            unnamed_extensions: FxHashMap::default(),
            loader: Arc::new(UnitSet::new()),
            translator: Arc::new(NoTranslation),
            environment: Arc::new(LibrarySupport::new()),
        }
    }

    pub fn with_index(mut self, index: ReferenceIndex) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn UnitLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_translator(mut self, translator: Arc<dyn UriTranslator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_environment(mut self, environment: Arc<dyn EnvironmentOracle>) -> Self {
        self.environment = environment;
        self
    }

    pub fn loader(&self) -> &dyn UnitLoader {
        self.loader.as_ref()
    }

    pub fn translator(&self) -> &dyn UriTranslator {
        self.translator.as_ref()
    }

    pub fn environment(&self) -> &dyn EnvironmentOracle {
        self.environment.as_ref()
    }

    pub fn index(&self) -> Option<&ReferenceIndex> {
        self.index.as_ref()
    }

    pub fn registry(&self) -> &ReferenceRegistry {
        &self.registry
    }

    /// Look up `name` in the previous build and claim it for `fragment`.
    /// No index means no reference.
    pub fn claim_reference(
        &mut self,
        library: &Url,
        container: Option<&str>,
        name: &CanonicalName,
        fragment: FragmentId,
    ) -> Option<Reference> {
        let reference = self.index.as_ref()?.lookup(library, container, name)?;
        self.registry.claim(reference, fragment)
    }

    /// Hand a unit's type variables to its library. Each variable may be
    /// collected once; a batch with a repeat is rejected whole.
    pub fn collect_unbound(&mut self, library: &Url, variables: UnboundVariables) -> BuildResult<()> {
        let existing = self.unbound.get(library);
        let mut nominal = FxHashSet::default();
        for &id in &variables.nominal {
            if existing.is_some_and(|c| c.nominal.contains(&id)) || !nominal.insert(id) {
                return Err(InternalError::TypeParameterCollectedTwice { name: format!("{id:?}") });
            }
        }
        let mut structural = FxHashSet::default();
        for &id in &variables.structural {
            if existing.is_some_and(|c| c.structural.contains(&id)) || !structural.insert(id) {
                return Err(InternalError::TypeParameterCollectedTwice { name: format!("{id:?}") });
            }
        }

        let collected = self.unbound.entry(library.clone()).or_default();
        collected.nominal.extend(nominal);
        collected.structural.extend(structural);
        collected.order.nominal.extend(variables.nominal);
        collected.order.structural.extend(variables.structural);
        Ok(())
    }

    pub fn unbound_variables(&self, library: &Url) -> Option<&UnboundVariables> {
        self.unbound.get(library).map(|c| &c.order)
    }

    pub fn register_exporter(&mut self, target: FileId, exporter: Exporter) {
        self.exporters.entry(target).or_default().push(exporter);
    }

    /// Units re-exporting `target`, in registration order.
    pub fn exporters(&self, target: FileId) -> &[Exporter] {
        self.exporters.get(&target).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `_extension#N` for the next unnamed extension of `library`. The
    /// number is only used up by [`advance_unnamed_extension`](Self::advance_unnamed_extension).
    pub fn unnamed_extension_name(&self, library: &Url) -> SmolStr {
        let counter = self.unnamed_extensions.get(library).copied().unwrap_or(0);
        format_smolstr!("_extension#{counter}")
    }

    pub fn advance_unnamed_extension(&mut self, library: &Url) {
        *self.unnamed_extensions.entry(library.clone()).or_insert(0) += 1;
    }

    /// Give back references claimed by fragments that were discarded.
    pub fn release_references(&mut self, fragments: &FxHashSet<FragmentId>) {
        let released = self.registry.release(fragments);
        if released > 0 {
            tracing::debug!(released, "released references of discarded fragments");
        }
    }
}

impl std::fmt::Debug for CompilationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilationContext")
            .field("config", &self.config)
            .field("index", &self.index.as_ref().map(ReferenceIndex::len))
            .field("registry", &self.registry.len())
            .field("libraries", &self.unbound.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::names::NameKind;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_unnamed_extension_names_count_per_library() {
        let mut ctx = CompilationContext::default();
        let a = url("package:a/a.dart");
        let b = url("package:a/b.dart");
        assert_eq!(ctx.unnamed_extension_name(&a), "_extension#0");
        // Looking does not use the number up.
        assert_eq!(ctx.unnamed_extension_name(&a), "_extension#0");
        ctx.advance_unnamed_extension(&a);
        assert_eq!(ctx.unnamed_extension_name(&a), "_extension#1");
        assert_eq!(ctx.unnamed_extension_name(&b), "_extension#0");
    }

    #[test]
    fn test_collecting_twice_is_a_fault() {
        let mut ctx = CompilationContext::default();
        let library = url("package:a/a.dart");
        let id = NominalVariableId {
            file: FileId::new(0),
            local: 0,
        };
        let vars = UnboundVariables {
            nominal: vec![id],
            structural: Vec::new(),
        };
        ctx.collect_unbound(&library, vars.clone()).unwrap();
        assert!(matches!(
            ctx.collect_unbound(&library, vars),
            Err(InternalError::TypeParameterCollectedTwice { .. })
        ));
        assert_eq!(ctx.unbound_variables(&library).map(|v| v.len()), Some(1));
    }

    #[test]
    fn test_rejected_batch_leaves_nothing_behind() {
        let mut ctx = CompilationContext::default();
        let library = url("package:a/a.dart");
        let file = FileId::new(0);
        let t = NominalVariableId { file, local: 0 };
        let u = NominalVariableId { file, local: 1 };
        let x = StructuralVariableId { file, local: 0 };
        ctx.collect_unbound(
            &library,
            UnboundVariables {
                nominal: vec![t],
                structural: Vec::new(),
            },
        )
        .unwrap();

        // `u` and `x` are new, `t` repeats: none of them may stick.
        let batch = UnboundVariables {
            nominal: vec![u, t],
            structural: vec![x],
        };
        assert!(ctx.collect_unbound(&library, batch).is_err());
        let collected = ctx.unbound_variables(&library).unwrap();
        assert_eq!(collected.nominal, vec![t]);
        assert!(collected.structural.is_empty());

        // A repeat inside one batch is rejected too, and creates no entry.
        let other = url("package:a/b.dart");
        let batch = UnboundVariables {
            nominal: vec![u, u],
            structural: Vec::new(),
        };
        assert!(ctx.collect_unbound(&other, batch).is_err());
        assert!(ctx.unbound_variables(&other).is_none());
    }

    #[test]
    fn test_claim_without_index_yields_nothing() {
        let mut ctx = CompilationContext::default();
        let library = url("package:a/a.dart");
        let name = CanonicalName::new(NameKind::Classes, "C", &library);
        let fragment = FragmentId::new(FileId::new(0), 0);
        assert_eq!(ctx.claim_reference(&library, None, &name, fragment), None);

        let mut index = ReferenceIndex::new();
        let reference = index.insert(&library, None, name.clone());
        let mut ctx = CompilationContext::default().with_index(index);
        assert_eq!(ctx.claim_reference(&library, None, &name, fragment), Some(reference));
    }

    #[test]
    fn test_unit_set_is_a_loader() {
        let units = Arc::new(UnitSet::new());
        let ctx = CompilationContext::default().with_loader(units.clone());
        let uri = url("package:a/b.dart");
        let request = LoadRequest {
            uri: &uri,
            file_uri: None,
            origin: Some(FileId::new(0)),
            offset: TextSize::from(0),
        };
        let id = ctx.loader().read(request);
        assert_eq!(ctx.loader().read(request), id);
        assert_eq!(units.lookup(&uri), Some(id));
    }
}
