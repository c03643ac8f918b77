//! Outline building: from parser events to declaration fragments.
//!
//! A [`BuilderFactory`] consumes one compilation unit's events in source
//! order and produces a [`UnitOutline`]: the library namespace of frozen
//! fragments, the unit's import/export/part edges, its type variables and
//! the diagnostics it reported. Cross-unit state (the previous build's
//! [`ReferenceIndex`], claimed references, exporter edges) lives in a
//! [`CompilationContext`] passed to every factory.
//!
//! ## Layout
//!
//! ```text
//! builder     → BuilderFactory, the begin/end/add event surface
//!   ↓
//! mixin       → anonymous mixin application classes
//! uri         → directive URI resolution and translation
//! directives  → import/export/part records, configurations
//!   ↓
//! fragments   → frozen declarations, pending DeclarationBuilder
//! scope       → type scopes, parameter namespaces, pending declarations
//! names       → canonical names; reference → index and registry
//!   ↓
//! types, ids, modifiers, diagnostics, error, config
//! ```
//!
//! ## Usage
//!
//! ```
//! use outline::base::{DeclarationOffsets, TextSize};
//! use outline::outline::{BuilderFactory, ClassDeclaration, CompilationContext, UnitDescriptor};
//! use url::Url;
//!
//! let mut ctx = CompilationContext::default();
//! let unit = UnitDescriptor::library(Url::parse("package:app/a.dart").unwrap());
//! let mut factory = BuilderFactory::new(&mut ctx, unit);
//!
//! factory.begin_declaration_header().unwrap();
//! factory
//!     .begin_class_declaration("A", DeclarationOffsets::new(0u32, 6u32, 0u32))
//!     .unwrap();
//! factory.end_class_declaration().unwrap();
//! factory
//!     .add_class(ClassDeclaration {
//!         end_offset: TextSize::from(10),
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//! let outline = factory.finish().unwrap();
//! assert!(outline.library.lookup_first("A").is_some());
//! ```

mod builder;
mod config;
mod diagnostics;
mod directives;
mod error;
mod fragments;
mod ids;
mod mixin;
mod modifiers;
mod names;
mod namespace;
mod reference;
mod scope;
mod types;
mod unit;
mod uri;

pub use builder::{
    AppliedMixins, BuilderFactory, ClassDeclaration, ConstructorDeclaration, ConstructorIdentifier, EnumDeclaration,
    ExtensionDeclaration, ExtensionTypeDeclaration, FactoryDeclaration, FieldDeclarator, FieldsDeclaration,
    MethodDeclaration, MixinDeclaration, NamedMixinApplicationDeclaration, PrimaryConstructorDeclaration,
    TypedefDeclaration, UnitOutline,
};
pub use config::{EnvironmentOracle, LibrarySupport, OutlineConfig};
pub use diagnostics::{
    Diagnostic, DiagnosticCollector, DiagnosticSink, Location, RelatedInfo, Severity, Template, codes,
};
pub use directives::{
    Combinator, CombinatorKind, Configuration, DART_EXT_PREFIX, Export, ExportDirective, Exporter, Import,
    ImportDirective, Part, PartDirective, PartOf, PartOfDirective, select_configuration,
};
pub use error::{BuildResult, InternalError};
pub use fragments::{
    ClassFragment, ConstructorFragment, ConstructorReferenceBuilder, DeclarationBuilder, DeclarationKind,
    EnumConstant, EnumFragment, ExtensionFragment, ExtensionTypeFragment, FactoryFragment, FieldFragment,
    FieldReferences, Fragment, HasTypeParameters, MethodFragment, MixinFragment, NamedMixinApplicationFragment,
    RepresentationField, TypedefFragment, field_has_setter,
};
pub use ids::{FragmentId, FragmentIdAllocator, NominalVariableId, ScopeId, StructuralVariableId};
pub use mixin::{
    ClassReferences, MixinApplicationBuilder, MixinApplicationRequest, MixinChain, MixinSynthesizer,
    NamedApplication,
};
pub use modifiers::Modifiers;
pub use names::{
    CanonicalName, ContainerType, DeclarationNameKind, FieldNames, FieldShape, NameKind, NameScheme, ProcedureKind,
    declaration_name, is_private,
};
pub use namespace::{DeclarationNameSpace, LibraryNameSpace, NameSpace};
#[cfg(feature = "snapshot")]
pub use reference::SnapshotError;
pub use reference::{IndexedContainer, IndexedLibrary, Reference, ReferenceIndex, ReferenceRegistry};
pub use scope::{NominalParameterNameSpace, ScopeRecord, ScopeStack, StructuralParameterNameSpace, TypeScopeKind};
pub use types::{
    FormalParameterBuilder, FormalParameterKind, FunctionTypeBuilder, MetadataBuilder, NamedTypeBuilder,
    NominalParameterCopy, NominalSubstitution, NominalVariableBuilder, Nullability, RecordField, RecordTypeBuilder,
    StructuralVariableBuilder, TypeBuilder, TypeDeclaration, TypeName, TypeParameterKind, UnboundVariables,
    VariableArena, copy_type_parameters,
};
pub use unit::{CompilationContext, LoadRequest, UnitDescriptor, UnitLoader};
pub use uri::{
    DirectiveUri, MALFORMED_URI_SCHEME, NoTranslation, PackageTranslator, UriParseError, UriTranslator,
    check_uri_reference, resolve_directive_uri, try_resolve,
};
