//! Fragments: immutable records of one declaration occurrence each.
//!
//! Class-like declarations go through a pending [`DeclarationBuilder`]
//! while their body is parsed and are frozen into a fragment by the
//! matching `add_*` call. Members are immutable from creation.

use std::fmt;

use smol_str::SmolStr;

use crate::base::{DeclarationOffsets, FileId, TextSize};

use super::ids::{FragmentId, NominalVariableId, ScopeId};
use super::modifiers::Modifiers;
use super::names::ProcedureKind;
use super::namespace::DeclarationNameSpace;
use super::reference::Reference;
use super::types::{FormalParameterBuilder, MetadataBuilder, TypeBuilder, TypeName};

// ============================================================================
// DECLARATION KINDS
// ============================================================================

/// Kinds of declarations with a body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Class,
    Mixin,
    Enum,
    Extension,
    ExtensionType,
}

impl DeclarationKind {
    pub fn is_extension_like(self) -> bool {
        matches!(self, DeclarationKind::Extension | DeclarationKind::ExtensionType)
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeclarationKind::Class => "class",
            DeclarationKind::Mixin => "mixin",
            DeclarationKind::Enum => "enum",
            DeclarationKind::Extension => "extension",
            DeclarationKind::ExtensionType => "extension type",
        })
    }
}

/// The representation field of an extension type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepresentationField {
    pub name: SmolStr,
    pub ty: TypeBuilder,
    pub offset: TextSize,
}

/// A class-like declaration whose body is still being parsed.
#[derive(Clone, Debug)]
pub struct DeclarationBuilder {
    pub id: FragmentId,
    pub kind: DeclarationKind,
    /// `None` only for unnamed extensions.
    pub name: Option<SmolStr>,
    /// Name used for members' canonical names: the declared name, or the
    /// synthesized `_extension#N` of an unnamed extension.
    pub container_name: SmolStr,
    pub offsets: DeclarationOffsets,
    /// Type scope enclosing the declaration.
    pub scope: ScopeId,
    /// Header type parameters, known once the body begins.
    pub type_parameters: Vec<NominalVariableId>,
    /// `on` type of an extension.
    pub on_type: Option<TypeBuilder>,
    pub modifiers: Modifiers,
    pub representation: Option<RepresentationField>,
    pub name_space: DeclarationNameSpace,
}

impl DeclarationBuilder {
    /// Name used in diagnostics and synthesized names.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.container_name)
    }
}

// ============================================================================
// DECLARATION FRAGMENTS
// ============================================================================

#[derive(Clone, Debug)]
pub struct ClassFragment {
    pub id: FragmentId,
    pub name: SmolStr,
    pub offsets: DeclarationOffsets,
    pub modifiers: Modifiers,
    pub metadata: Vec<MetadataBuilder>,
    pub reference: Option<Reference>,
    /// `None` for classes synthesized from mixin applications.
    pub scope: Option<ScopeId>,
    pub type_parameters: Vec<NominalVariableId>,
    pub supertype: Option<TypeBuilder>,
    /// Set on mixin application classes.
    pub mixed_in_type: Option<TypeBuilder>,
    pub interfaces: Vec<TypeBuilder>,
    pub name_space: DeclarationNameSpace,
}

impl ClassFragment {
    pub fn is_mixin_application(&self) -> bool {
        self.mixed_in_type.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct MixinFragment {
    pub id: FragmentId,
    pub name: SmolStr,
    pub offsets: DeclarationOffsets,
    pub modifiers: Modifiers,
    pub metadata: Vec<MetadataBuilder>,
    pub reference: Option<Reference>,
    pub scope: ScopeId,
    pub type_parameters: Vec<NominalVariableId>,
    /// The `on` types as written.
    pub on_types: Vec<TypeBuilder>,
    /// The single `on` type, or the synthesized super-mixin chain.
    pub supertype: Option<TypeBuilder>,
    pub interfaces: Vec<TypeBuilder>,
    pub name_space: DeclarationNameSpace,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumConstant {
    pub name: SmolStr,
    pub offset: TextSize,
    pub metadata: Vec<MetadataBuilder>,
}

#[derive(Clone, Debug)]
pub struct EnumFragment {
    pub id: FragmentId,
    pub name: SmolStr,
    pub offsets: DeclarationOffsets,
    pub modifiers: Modifiers,
    pub metadata: Vec<MetadataBuilder>,
    pub reference: Option<Reference>,
    pub scope: ScopeId,
    pub type_parameters: Vec<NominalVariableId>,
    pub supertype: TypeBuilder,
    pub interfaces: Vec<TypeBuilder>,
    pub constants: Vec<EnumConstant>,
    pub name_space: DeclarationNameSpace,
}

#[derive(Clone, Debug)]
pub struct ExtensionFragment {
    pub id: FragmentId,
    pub name: Option<SmolStr>,
    /// Declared name or `_extension#N`.
    pub container_name: SmolStr,
    pub offsets: DeclarationOffsets,
    pub modifiers: Modifiers,
    pub metadata: Vec<MetadataBuilder>,
    pub reference: Option<Reference>,
    pub scope: ScopeId,
    pub type_parameters: Vec<NominalVariableId>,
    pub on_type: TypeBuilder,
    pub name_space: DeclarationNameSpace,
}

#[derive(Clone, Debug)]
pub struct ExtensionTypeFragment {
    pub id: FragmentId,
    pub name: SmolStr,
    pub offsets: DeclarationOffsets,
    pub modifiers: Modifiers,
    pub metadata: Vec<MetadataBuilder>,
    pub reference: Option<Reference>,
    pub scope: ScopeId,
    pub type_parameters: Vec<NominalVariableId>,
    pub representation: Option<RepresentationField>,
    pub interfaces: Vec<TypeBuilder>,
    pub name_space: DeclarationNameSpace,
}

/// `class N = S with M implements I;`
#[derive(Clone, Debug)]
pub struct NamedMixinApplicationFragment {
    pub id: FragmentId,
    pub name: SmolStr,
    pub offsets: DeclarationOffsets,
    pub modifiers: Modifiers,
    pub metadata: Vec<MetadataBuilder>,
    pub reference: Option<Reference>,
    pub scope: ScopeId,
    pub type_parameters: Vec<NominalVariableId>,
    /// Supertype after all but the last mixin have been applied.
    pub supertype: TypeBuilder,
    pub mixed_in_type: TypeBuilder,
    pub interfaces: Vec<TypeBuilder>,
}

#[derive(Clone, Debug)]
pub struct TypedefFragment {
    pub id: FragmentId,
    pub name: SmolStr,
    pub offsets: DeclarationOffsets,
    pub modifiers: Modifiers,
    pub metadata: Vec<MetadataBuilder>,
    pub reference: Option<Reference>,
    pub type_parameters: Vec<NominalVariableId>,
    pub aliased_type: TypeBuilder,
}

// ============================================================================
// MEMBER FRAGMENTS
// ============================================================================

#[derive(Clone, Debug)]
pub struct ConstructorFragment {
    pub id: FragmentId,
    /// Suffix after the class name, empty for the unnamed constructor.
    pub name: SmolStr,
    pub offsets: DeclarationOffsets,
    pub modifiers: Modifiers,
    pub metadata: Vec<MetadataBuilder>,
    pub type_parameters: Vec<NominalVariableId>,
    pub formals: Vec<FormalParameterBuilder>,
    pub is_primary: bool,
    pub reference: Option<Reference>,
    pub tear_off_reference: Option<Reference>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstructorReferenceBuilder {
    pub type_name: TypeName,
    pub type_arguments: Vec<TypeBuilder>,
    /// `.named` part, if any.
    pub suffix: Option<SmolStr>,
    pub offset: TextSize,
}

#[derive(Clone, Debug)]
pub struct FactoryFragment {
    pub id: FragmentId,
    pub name: SmolStr,
    pub offsets: DeclarationOffsets,
    pub modifiers: Modifiers,
    pub metadata: Vec<MetadataBuilder>,
    pub type_parameters: Vec<NominalVariableId>,
    pub formals: Vec<FormalParameterBuilder>,
    pub redirection_target: Option<ConstructorReferenceBuilder>,
    pub reference: Option<Reference>,
    pub tear_off_reference: Option<Reference>,
}

/// Methods, getters, setters and operators; top-level functions too.
#[derive(Clone, Debug)]
pub struct MethodFragment {
    pub id: FragmentId,
    pub name: SmolStr,
    pub kind: ProcedureKind,
    pub offsets: DeclarationOffsets,
    pub modifiers: Modifiers,
    pub metadata: Vec<MetadataBuilder>,
    /// Synthesized copies of the enclosing extension's parameters come first.
    pub type_parameters: Vec<NominalVariableId>,
    /// Extension instance members start with the `#this` receiver.
    pub formals: Vec<FormalParameterBuilder>,
    pub return_type: TypeBuilder,
    pub is_top_level: bool,
    pub reference: Option<Reference>,
    /// Tear-off of an extension instance method.
    pub tear_off_reference: Option<Reference>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldReferences {
    pub field: Option<Reference>,
    pub getter: Option<Reference>,
    pub setter: Option<Reference>,
    pub is_set: Option<Reference>,
}

#[derive(Clone, Debug)]
pub struct FieldFragment {
    pub id: FragmentId,
    pub name: SmolStr,
    pub offsets: DeclarationOffsets,
    pub modifiers: Modifiers,
    pub metadata: Vec<MetadataBuilder>,
    pub ty: TypeBuilder,
    pub is_top_level: bool,
    /// Lowered into a backing field plus accessors.
    pub is_late_lowered: bool,
    pub references: FieldReferences,
}

impl FieldFragment {
    pub fn has_setter(&self) -> bool {
        field_has_setter(self.modifiers)
    }
}

/// `final` and `const` fields have no setter, except `late final` fields
/// without an initializer.
pub fn field_has_setter(modifiers: Modifiers) -> bool {
    if modifiers.is_const() {
        return false;
    }
    if modifiers.is_final() {
        return modifiers.is_late() && !modifiers.contains(Modifiers::HAS_INITIALIZER);
    }
    true
}

// ============================================================================
// FRAGMENT
// ============================================================================

#[derive(Clone, Debug)]
pub enum Fragment {
    Class(ClassFragment),
    Mixin(MixinFragment),
    Enum(EnumFragment),
    Extension(ExtensionFragment),
    ExtensionType(ExtensionTypeFragment),
    NamedMixinApplication(NamedMixinApplicationFragment),
    Typedef(TypedefFragment),
    Constructor(ConstructorFragment),
    Factory(FactoryFragment),
    Method(MethodFragment),
    Field(FieldFragment),
}

macro_rules! each_fragment {
    ($self:expr, $f:ident => $body:expr) => {
        match $self {
            Fragment::Class($f) => $body,
            Fragment::Mixin($f) => $body,
            Fragment::Enum($f) => $body,
            Fragment::Extension($f) => $body,
            Fragment::ExtensionType($f) => $body,
            Fragment::NamedMixinApplication($f) => $body,
            Fragment::Typedef($f) => $body,
            Fragment::Constructor($f) => $body,
            Fragment::Factory($f) => $body,
            Fragment::Method($f) => $body,
            Fragment::Field($f) => $body,
        }
    };
}

impl Fragment {
    pub fn id(&self) -> FragmentId {
        each_fragment!(self, f => f.id)
    }

    /// Declaring unit.
    pub fn file(&self) -> FileId {
        self.id().file
    }

    /// `None` only for unnamed extensions.
    pub fn name(&self) -> Option<&str> {
        match self {
            Fragment::Extension(f) => f.name.as_deref(),
            Fragment::Class(f) => Some(&f.name),
            Fragment::Mixin(f) => Some(&f.name),
            Fragment::Enum(f) => Some(&f.name),
            Fragment::ExtensionType(f) => Some(&f.name),
            Fragment::NamedMixinApplication(f) => Some(&f.name),
            Fragment::Typedef(f) => Some(&f.name),
            Fragment::Constructor(f) => Some(&f.name),
            Fragment::Factory(f) => Some(&f.name),
            Fragment::Method(f) => Some(&f.name),
            Fragment::Field(f) => Some(&f.name),
        }
    }

    pub fn offsets(&self) -> DeclarationOffsets {
        each_fragment!(self, f => f.offsets)
    }

    pub fn modifiers(&self) -> Modifiers {
        each_fragment!(self, f => f.modifiers)
    }

    pub fn metadata(&self) -> &[MetadataBuilder] {
        each_fragment!(self, f => &f.metadata)
    }

    /// Primary reference; for fields, the field itself.
    pub fn reference(&self) -> Option<Reference> {
        match self {
            Fragment::Field(f) => f.references.field,
            Fragment::Class(f) => f.reference,
            Fragment::Mixin(f) => f.reference,
            Fragment::Enum(f) => f.reference,
            Fragment::Extension(f) => f.reference,
            Fragment::ExtensionType(f) => f.reference,
            Fragment::NamedMixinApplication(f) => f.reference,
            Fragment::Typedef(f) => f.reference,
            Fragment::Constructor(f) => f.reference,
            Fragment::Factory(f) => f.reference,
            Fragment::Method(f) => f.reference,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Fragment::Class(_) => "class",
            Fragment::Mixin(_) => "mixin",
            Fragment::Enum(_) => "enum",
            Fragment::Extension(_) => "extension",
            Fragment::ExtensionType(_) => "extension type",
            Fragment::NamedMixinApplication(_) => "named mixin application",
            Fragment::Typedef(_) => "typedef",
            Fragment::Constructor(_) => "constructor",
            Fragment::Factory(_) => "factory",
            Fragment::Method(_) => "method",
            Fragment::Field(_) => "field",
        }
    }

    /// Body of a class-like fragment.
    pub fn name_space(&self) -> Option<&DeclarationNameSpace> {
        match self {
            Fragment::Class(f) => Some(&f.name_space),
            Fragment::Mixin(f) => Some(&f.name_space),
            Fragment::Enum(f) => Some(&f.name_space),
            Fragment::Extension(f) => Some(&f.name_space),
            Fragment::ExtensionType(f) => Some(&f.name_space),
            _ => None,
        }
    }

    pub fn as_has_type_parameters(&self) -> Option<&dyn HasTypeParameters> {
        match self {
            Fragment::Class(f) => Some(f),
            Fragment::Mixin(f) => Some(f),
            Fragment::Enum(f) => Some(f),
            Fragment::Extension(f) => Some(f),
            Fragment::ExtensionType(f) => Some(f),
            Fragment::NamedMixinApplication(f) => Some(f),
            Fragment::Typedef(f) => Some(f),
            Fragment::Constructor(f) => Some(f),
            Fragment::Factory(f) => Some(f),
            Fragment::Method(f) => Some(f),
            Fragment::Field(_) => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassFragment> {
        match self {
            Fragment::Class(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodFragment> {
        match self {
            Fragment::Method(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&FieldFragment> {
        match self {
            Fragment::Field(f) => Some(f),
            _ => None,
        }
    }
}

/// Fragments that declare type parameters.
pub trait HasTypeParameters {
    fn type_parameters(&self) -> &[NominalVariableId];
}

macro_rules! impl_has_type_parameters {
    ($($ty:ty),* $(,)?) => {
        $(impl HasTypeParameters for $ty {
            fn type_parameters(&self) -> &[NominalVariableId] {
                &self.type_parameters
            }
        })*
    };
}

impl_has_type_parameters!(
    ClassFragment,
    MixinFragment,
    EnumFragment,
    ExtensionFragment,
    ExtensionTypeFragment,
    NamedMixinApplicationFragment,
    TypedefFragment,
    ConstructorFragment,
    FactoryFragment,
    MethodFragment,
    DeclarationBuilder,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_setters() {
        assert!(field_has_setter(Modifiers::empty()));
        assert!(!field_has_setter(Modifiers::FINAL));
        assert!(!field_has_setter(Modifiers::CONST | Modifiers::STATIC));
        assert!(field_has_setter(Modifiers::LATE | Modifiers::FINAL));
        assert!(!field_has_setter(Modifiers::LATE | Modifiers::FINAL | Modifiers::HAS_INITIALIZER));
    }

    #[test]
    fn test_declaration_kind_display() {
        assert_eq!(DeclarationKind::ExtensionType.to_string(), "extension type");
        assert!(DeclarationKind::Extension.is_extension_like());
        assert!(!DeclarationKind::Mixin.is_extension_like());
    }
}
