//! The builder factory: turns one unit's begin/end events into fragments.
//!
//! The parser drives a [`BuilderFactory`] with calls in source order.
//! Declarations open with `begin_declaration_header` (type parameters),
//! `begin_*_declaration` (body), close with `end_*_declaration` and are
//! frozen by `add_*`. Members follow the same begin/end/add rhythm around
//! their own type-parameter scope.
//!
//! Any internal fault poisons the factory: the failing call and every
//! later one return the same [`InternalError`].

mod declarations;
mod directives;
mod members;
mod types;

pub use declarations::{
    ClassDeclaration, EnumDeclaration, ExtensionDeclaration, ExtensionTypeDeclaration, MixinDeclaration,
    NamedMixinApplicationDeclaration, TypedefDeclaration,
};
pub use members::{
    ConstructorDeclaration, ConstructorIdentifier, FactoryDeclaration, FieldDeclarator, FieldsDeclaration,
    MethodDeclaration, PrimaryConstructorDeclaration,
};

use smol_str::SmolStr;
use url::Url;

use crate::base::{FileId, TextSize};

use super::diagnostics::{Diagnostic, DiagnosticCollector, DiagnosticSink, Location, Template};
use super::directives::{Export, Import, Part, PartOf};
use super::error::{BuildResult, InternalError};
use super::fragments::{ConstructorReferenceBuilder, Fragment, HasTypeParameters};
use super::ids::{FragmentId, FragmentIdAllocator, ScopeId};
use super::names::{CanonicalName, ContainerType, NameScheme};
use super::namespace::LibraryNameSpace;
use super::reference::Reference;
use super::scope::{ScopeRecord, ScopeStack};
use super::types::{TypeBuilder, TypeName, UnboundVariables, VariableArena};
use super::unit::{CompilationContext, LoadRequest, UnitDescriptor};

/// Classes synthesized for one declaration's `with` clause.
#[derive(Clone, Debug)]
pub struct AppliedMixins {
    pub subclass: SmolStr,
    pub classes: Vec<FragmentId>,
    pub supertype: Option<TypeBuilder>,
}

/// Everything built for one unit.
#[derive(Debug)]
pub struct UnitOutline {
    pub file: FileId,
    pub unit: UnitDescriptor,
    pub library_name: Option<SmolStr>,
    pub library: LibraryNameSpace,
    pub imports: Vec<Import>,
    pub exports: Vec<Export>,
    pub parts: Vec<Part>,
    pub part_of: Option<PartOf>,
    pub variables: VariableArena,
    /// Variables handed to the library by this unit.
    pub unbound: UnboundVariables,
    pub scopes: Vec<ScopeRecord>,
    pub constructor_references: Vec<ConstructorReferenceBuilder>,
    pub mixin_applications: Vec<AppliedMixins>,
    /// Named types not bound to a type variable, left for elaboration.
    pub unresolved_types: Vec<TypeName>,
    pub diagnostics: Vec<Diagnostic>,
}

impl UnitOutline {
    pub fn is_part(&self) -> bool {
        self.part_of.is_some()
    }
}

#[derive(Debug, Default)]
struct UnitDirectives {
    imports: Vec<Import>,
    exports: Vec<Export>,
    parts: Vec<Part>,
    part_of: Option<PartOf>,
    library_name: Option<SmolStr>,
    script_tag: Option<TextSize>,
}

pub struct BuilderFactory<'ctx> {
    ctx: &'ctx mut CompilationContext,
    unit: UnitDescriptor,
    file: FileId,
    ids: FragmentIdAllocator,
    scopes: ScopeStack,
    variables: VariableArena,
    library: LibraryNameSpace,
    diagnostics: DiagnosticCollector,
    directives: UnitDirectives,
    constructor_references: Vec<ConstructorReferenceBuilder>,
    mixin_applications: Vec<AppliedMixins>,
    unresolved_types: Vec<TypeName>,
    /// Header scope of the named mixin application being built.
    named_mixin_scope: Option<ScopeId>,
    poisoned: Option<InternalError>,
}

impl<'ctx> BuilderFactory<'ctx> {
    /// Create a factory for `unit`, registering it with the context's loader.
    pub fn new(ctx: &'ctx mut CompilationContext, unit: UnitDescriptor) -> Self {
        let file = ctx.loader().read(LoadRequest {
            uri: &unit.import_uri,
            file_uri: Some(&unit.file_uri),
            origin: None,
            offset: TextSize::default(),
        });
        tracing::debug!(?file, uri = %unit.import_uri, "begin unit");
        Self {
            ctx,
            unit,
            file,
            ids: FragmentIdAllocator::new(file),
            scopes: ScopeStack::new(),
            variables: VariableArena::new(file),
            library: LibraryNameSpace::new(),
            diagnostics: DiagnosticCollector::new(),
            directives: UnitDirectives::default(),
            constructor_references: Vec::new(),
            mixin_applications: Vec::new(),
            unresolved_types: Vec::new(),
            named_mixin_scope: None,
            poisoned: None,
        }
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    pub fn unit(&self) -> &UnitDescriptor {
        &self.unit
    }

    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    pub fn variables(&self) -> &VariableArena {
        &self.variables
    }

    pub fn library(&self) -> &LibraryNameSpace {
        &self.library
    }

    pub fn diagnostics(&self) -> &DiagnosticCollector {
        &self.diagnostics
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Run one event, poisoning the factory if it hits an internal fault.
    fn guard<T>(&mut self, event: &'static str, f: impl FnOnce(&mut Self) -> BuildResult<T>) -> BuildResult<T> {
        if let Some(error) = &self.poisoned {
            return Err(error.clone());
        }
        let result = f(self);
        if let Err(error) = &result {
            tracing::error!(file = ?self.file, event, %error, "internal fault, abandoning unit");
            self.poisoned = Some(error.clone());
        }
        result
    }

    /// Verify that every begin has met its end.
    pub fn check_stacks(&mut self) -> BuildResult<()> {
        self.guard("check_stacks", |this| this.scopes.check_stacks())
    }

    /// Close the unit: check the stacks, hand the type variables to the
    /// library and return the outline.
    pub fn finish(mut self) -> BuildResult<UnitOutline> {
        self.check_stacks()?;

        if let (Some(offset), Some(_)) = (self.directives.script_tag, &self.directives.part_of) {
            self.report(Template::ScriptTagInPartFile, offset, 2);
        }

        let unbound = self.variables.take_unbound();
        let library_uri = self.unit.library_uri.clone();
        self.guard("finish", |this| this.ctx.collect_unbound(&library_uri, unbound.clone()))?;

        tracing::info!(
            file = ?self.file,
            uri = %self.unit.import_uri,
            fragments = self.ids.allocated(),
            imports = self.directives.imports.len(),
            exports = self.directives.exports.len(),
            parts = self.directives.parts.len(),
            diagnostics = self.diagnostics.diagnostics().len(),
            "finished unit outline"
        );

        let UnitDirectives {
            imports,
            exports,
            parts,
            part_of,
            library_name,
            script_tag: _,
        } = self.directives;

        Ok(UnitOutline {
            file: self.file,
            unit: self.unit,
            library_name,
            library: self.library,
            imports,
            exports,
            parts,
            part_of,
            scopes: self.scopes.records(),
            variables: self.variables,
            unbound,
            constructor_references: self.constructor_references,
            mixin_applications: self.mixin_applications,
            unresolved_types: self.unresolved_types,
            diagnostics: self.diagnostics.take(),
        })
    }

    // ------------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------------

    fn report(&mut self, template: Template, offset: TextSize, length: u32) {
        let location = Location::new(self.file, offset, length);
        self.diagnostics.report(Diagnostic::error(template, location));
    }

    fn library_uri(&self) -> &Url {
        &self.unit.library_uri
    }

    /// Scheme for a member of the current declaration, or a top-level one.
    fn member_scheme(&self, is_instance_member: bool) -> NameScheme {
        let library = self.unit.library_uri.clone();
        match self.scopes.current_declaration() {
            Some(declaration) => NameScheme::member(
                ContainerType::from(declaration.kind),
                declaration.container_name.clone(),
                is_instance_member,
                library,
            ),
            None => NameScheme::top_level(library),
        }
    }

    fn claim(&mut self, scheme: &NameScheme, name: &CanonicalName, fragment: FragmentId) -> Option<Reference> {
        let library = self.unit.library_uri.clone();
        self.ctx
            .claim_reference(&library, scheme.container_key(), name, fragment)
    }

    fn claim_top_level(&mut self, name: &CanonicalName, fragment: FragmentId) -> Option<Reference> {
        let library = self.unit.library_uri.clone();
        self.ctx.claim_reference(&library, None, name, fragment)
    }

    /// Register a member in the current declaration, or the library.
    fn register_member(&mut self, fragment: Fragment) {
        tracing::debug!(
            kind = fragment.kind_name(),
            name = ?fragment.name(),
            id = ?fragment.id(),
            type_parameters = type_parameter_count(&fragment),
            "register member"
        );
        match self.scopes.current_declaration_mut() {
            Some(declaration) => {
                declaration.name_space.add_member(fragment);
            }
            None => {
                self.library.add(fragment);
            }
        }
    }

    fn register_constructor(&mut self, fragment: Fragment) -> BuildResult<()> {
        let declaration = self
            .scopes
            .current_declaration_mut()
            .ok_or(InternalError::NoCurrentDeclaration("constructor"))?;
        tracing::debug!(kind = fragment.kind_name(), name = ?fragment.name(), id = ?fragment.id(), "register constructor");
        declaration.name_space.add_constructor(fragment);
        Ok(())
    }

    fn register_top_level(&mut self, fragment: Fragment) {
        tracing::debug!(
            kind = fragment.kind_name(),
            name = ?fragment.name(),
            id = ?fragment.id(),
            type_parameters = type_parameter_count(&fragment),
            "register declaration"
        );
        self.library.add(fragment);
    }
}

fn type_parameter_count(fragment: &Fragment) -> usize {
    fragment.as_has_type_parameters().map_or(0, |f| f.type_parameters().len())
}
