//! Type builders and type-parameter builders.
//!
//! The parser hands these over already shaped; the outline builder only
//! binds names to type variables, copies type parameters, and rewrites
//! types through substitutions when it synthesizes declarations.

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use crate::base::{FileId, TextSize};

use super::error::{BuildResult, InternalError};
use super::ids::{FragmentId, NominalVariableId, StructuralVariableId};
use super::modifiers::Modifiers;

// ============================================================================
// TYPE BUILDERS
// ============================================================================

/// Whether a type was written with a trailing `?`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Nullability {
    #[default]
    Omitted,
    Nullable,
}

/// A (possibly prefixed) type name as written.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeName {
    pub name: SmolStr,
    pub prefix: Option<SmolStr>,
    pub offset: TextSize,
}

impl TypeName {
    pub fn new(name: impl Into<SmolStr>, offset: impl Into<TextSize>) -> Self {
        Self {
            name: name.into(),
            prefix: None,
            offset: offset.into(),
        }
    }

    pub fn prefixed(prefix: impl Into<SmolStr>, name: impl Into<SmolStr>, offset: impl Into<TextSize>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Self::new(name, offset)
        }
    }
}

/// What a named type has been bound to, if anything.
///
/// Names that are not type variables stay unbound here; library-level
/// lookup happens during elaboration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeDeclaration {
    Nominal(NominalVariableId),
    Structural(StructuralVariableId),
    /// A class synthesized by the outline builder (mixin applications).
    Synthesized(FragmentId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedTypeBuilder {
    pub name: TypeName,
    pub arguments: Vec<TypeBuilder>,
    pub nullability: Nullability,
    pub declaration: Option<TypeDeclaration>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionTypeBuilder {
    pub return_type: Box<TypeBuilder>,
    pub type_parameters: Vec<StructuralVariableId>,
    pub formals: Vec<FormalParameterBuilder>,
    pub nullability: Nullability,
    pub offset: TextSize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordField {
    pub name: Option<SmolStr>,
    pub ty: TypeBuilder,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordTypeBuilder {
    pub positional: Vec<RecordField>,
    pub named: Vec<RecordField>,
    pub nullability: Nullability,
    pub offset: TextSize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeBuilder {
    Named(NamedTypeBuilder),
    Function(FunctionTypeBuilder),
    Record(RecordTypeBuilder),
    Void(TextSize),
    /// No type was written (`var x`, untyped formals).
    Omitted,
    /// Recovery placeholder for a type the parser could not make sense of.
    Invalid(TextSize),
}

/// Old variable → fresh copy.
pub type NominalSubstitution = FxHashMap<NominalVariableId, NominalVariableId>;

/// Structural parameters refreshed while rewriting function types.
type StructuralSubstitution = FxHashMap<StructuralVariableId, StructuralVariableId>;

impl TypeBuilder {
    /// An unbound named type with no arguments.
    pub fn named(name: TypeName) -> Self {
        Self::named_with(name, Vec::new(), None)
    }

    pub fn named_with(name: TypeName, arguments: Vec<TypeBuilder>, declaration: Option<TypeDeclaration>) -> Self {
        TypeBuilder::Named(NamedTypeBuilder {
            name,
            arguments,
            nullability: Nullability::Omitted,
            declaration,
        })
    }

    /// A reference to a nominal type variable.
    pub fn variable(name: impl Into<SmolStr>, id: NominalVariableId, offset: TextSize) -> Self {
        Self::named_with(TypeName::new(name, offset), Vec::new(), Some(TypeDeclaration::Nominal(id)))
    }

    /// The name usable in synthesized names, if this type has one.
    pub fn type_name(&self) -> Option<&TypeName> {
        match self {
            TypeBuilder::Named(named) => Some(&named.name),
            _ => None,
        }
    }

    pub fn declaration(&self) -> Option<TypeDeclaration> {
        match self {
            TypeBuilder::Named(named) => named.declaration,
            _ => None,
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            TypeBuilder::Named(t) => t.nullability == Nullability::Nullable,
            TypeBuilder::Function(t) => t.nullability == Nullability::Nullable,
            TypeBuilder::Record(t) => t.nullability == Nullability::Nullable,
            TypeBuilder::Void(_) | TypeBuilder::Omitted | TypeBuilder::Invalid(_) => false,
        }
    }

    /// Whether any of `variables` occurs in this type, including in bounds
    /// of function-type parameters.
    pub fn uses_any(&self, variables: &FxHashSet<NominalVariableId>, arena: &VariableArena) -> bool {
        match self {
            TypeBuilder::Named(named) => {
                if let Some(TypeDeclaration::Nominal(id)) = named.declaration {
                    if variables.contains(&id) {
                        return true;
                    }
                }
                named.arguments.iter().any(|a| a.uses_any(variables, arena))
            }
            TypeBuilder::Function(function) => {
                function.return_type.uses_any(variables, arena)
                    || function.formals.iter().any(|f| f.ty.uses_any(variables, arena))
                    || function.type_parameters.iter().any(|&id| {
                        arena
                            .structural(id)
                            .and_then(|v| v.bound.as_ref())
                            .is_some_and(|b| b.uses_any(variables, arena))
                    })
            }
            TypeBuilder::Record(record) => record
                .positional
                .iter()
                .chain(record.named.iter())
                .any(|f| f.ty.uses_any(variables, arena)),
            TypeBuilder::Void(_) | TypeBuilder::Omitted | TypeBuilder::Invalid(_) => false,
        }
    }

    /// Rewrite every occurrence of a substituted variable.
    ///
    /// Function types whose parameter bounds mention a substituted variable
    /// get fresh structural parameters, allocated in `arena`; their bodies
    /// are rewritten to refer to the fresh parameters.
    pub fn substitute(&self, substitution: &NominalSubstitution, arena: &mut VariableArena) -> TypeBuilder {
        if substitution.is_empty() {
            return self.clone();
        }
        let mut structural = StructuralSubstitution::default();
        self.rewrite(substitution, &mut structural, arena)
    }

    /// Whether this type mentions a variable that `nominal` or `structural`
    /// will replace.
    fn mentions(&self, nominal: &NominalSubstitution, structural: &StructuralSubstitution, arena: &VariableArena) -> bool {
        match self {
            TypeBuilder::Named(named) => {
                let hit = match named.declaration {
                    Some(TypeDeclaration::Nominal(id)) => nominal.contains_key(&id),
                    Some(TypeDeclaration::Structural(id)) => structural.contains_key(&id),
                    _ => false,
                };
                hit || named.arguments.iter().any(|a| a.mentions(nominal, structural, arena))
            }
            TypeBuilder::Function(function) => {
                function.return_type.mentions(nominal, structural, arena)
                    || function.formals.iter().any(|f| f.ty.mentions(nominal, structural, arena))
                    || function.type_parameters.iter().any(|&id| {
                        arena
                            .structural(id)
                            .and_then(|v| v.bound.as_ref())
                            .is_some_and(|b| b.mentions(nominal, structural, arena))
                    })
            }
            TypeBuilder::Record(record) => record
                .positional
                .iter()
                .chain(record.named.iter())
                .any(|f| f.ty.mentions(nominal, structural, arena)),
            TypeBuilder::Void(_) | TypeBuilder::Omitted | TypeBuilder::Invalid(_) => false,
        }
    }

    fn rewrite(
        &self,
        nominal: &NominalSubstitution,
        structural: &mut StructuralSubstitution,
        arena: &mut VariableArena,
    ) -> TypeBuilder {
        match self {
            TypeBuilder::Named(named) => {
                let declaration = match named.declaration {
                    Some(TypeDeclaration::Nominal(id)) => {
                        Some(TypeDeclaration::Nominal(nominal.get(&id).copied().unwrap_or(id)))
                    }
                    Some(TypeDeclaration::Structural(id)) => {
                        Some(TypeDeclaration::Structural(structural.get(&id).copied().unwrap_or(id)))
                    }
                    other => other,
                };
                TypeBuilder::Named(NamedTypeBuilder {
                    name: named.name.clone(),
                    arguments: named.arguments.iter().map(|a| a.rewrite(nominal, structural, arena)).collect(),
                    nullability: named.nullability,
                    declaration,
                })
            }
            TypeBuilder::Function(function) => {
                let needs_fresh = function.type_parameters.iter().any(|&id| {
                    arena
                        .structural(id)
                        .and_then(|v| v.bound.as_ref())
                        .is_some_and(|b| b.mentions(nominal, structural, arena))
                });
                let type_parameters = if needs_fresh {
                    let originals: Vec<_> = function
                        .type_parameters
                        .iter()
                        .filter_map(|&id| arena.structural(id).cloned())
                        .collect();
                    // All fresh ids first, so bounds can refer to siblings.
                    let fresh: Vec<_> = originals
                        .iter()
                        .map(|old| {
                            let id = arena.new_structural(old.name.clone(), old.offset);
                            structural.insert(old.id, id);
                            id
                        })
                        .collect();
                    for (old, &id) in originals.iter().zip(&fresh) {
                        let bound = old.bound.as_ref().map(|b| b.rewrite(nominal, structural, arena));
                        if let Some(v) = arena.structural_mut(id) {
                            v.bound = bound;
                        }
                    }
                    fresh
                } else {
                    function.type_parameters.clone()
                };
                TypeBuilder::Function(FunctionTypeBuilder {
                    return_type: Box::new(function.return_type.rewrite(nominal, structural, arena)),
                    type_parameters,
                    formals: function
                        .formals
                        .iter()
                        .map(|f| FormalParameterBuilder {
                            ty: f.ty.rewrite(nominal, structural, arena),
                            ..f.clone()
                        })
                        .collect(),
                    nullability: function.nullability,
                    offset: function.offset,
                })
            }
            TypeBuilder::Record(record) => {
                let mut field = |f: &RecordField| RecordField {
                    name: f.name.clone(),
                    ty: f.ty.rewrite(nominal, structural, arena),
                };
                let positional = record.positional.iter().map(&mut field).collect();
                let named = record.named.iter().map(&mut field).collect();
                TypeBuilder::Record(RecordTypeBuilder {
                    positional,
                    named,
                    nullability: record.nullability,
                    offset: record.offset,
                })
            }
            other => other.clone(),
        }
    }
}

// ============================================================================
// FORMALS & METADATA
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormalParameterKind {
    RequiredPositional,
    OptionalPositional,
    RequiredNamed,
    OptionalNamed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormalParameterBuilder {
    pub kind: FormalParameterKind,
    pub modifiers: Modifiers,
    pub ty: TypeBuilder,
    pub name: SmolStr,
    pub offset: TextSize,
    /// The synthesized receiver of an extension or extension-type member.
    pub is_extension_this: bool,
    /// `this.x`
    pub is_initializing_formal: bool,
    /// `super.x`
    pub is_super_initializing_formal: bool,
    pub has_default: bool,
}

impl FormalParameterBuilder {
    pub fn required(name: impl Into<SmolStr>, ty: TypeBuilder, offset: impl Into<TextSize>) -> Self {
        Self {
            kind: FormalParameterKind::RequiredPositional,
            modifiers: Modifiers::empty(),
            ty,
            name: name.into(),
            offset: offset.into(),
            is_extension_this: false,
            is_initializing_formal: false,
            is_super_initializing_formal: false,
            has_default: false,
        }
    }
}

/// An `@annotation` as seen by the outline: where it starts and what it names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataBuilder {
    pub at_offset: TextSize,
    pub name: SmolStr,
}

// ============================================================================
// TYPE PARAMETERS
// ============================================================================

/// Where a nominal type parameter came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeParameterKind {
    /// Declared on a class, mixin, enum, extension, extension type or typedef.
    Declaration,
    /// Declared on a method, constructor or factory.
    Member,
    /// Copied from an extension or extension type onto one of its members.
    ExtensionSynthesized,
    /// Copied from a subclass onto an anonymous mixin application.
    MixinApplicationSynthesized,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NominalVariableBuilder {
    pub id: NominalVariableId,
    pub name: SmolStr,
    pub offset: TextSize,
    pub kind: TypeParameterKind,
    pub bound: Option<TypeBuilder>,
    pub default_type: Option<TypeBuilder>,
    /// Name of the declaration the variable was bound to, once known.
    pub owner: Option<SmolStr>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructuralVariableBuilder {
    pub id: StructuralVariableId,
    pub name: SmolStr,
    pub offset: TextSize,
    pub bound: Option<TypeBuilder>,
}

/// Variables created but not yet collected into a library.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnboundVariables {
    pub nominal: Vec<NominalVariableId>,
    pub structural: Vec<StructuralVariableId>,
}

impl UnboundVariables {
    pub fn len(&self) -> usize {
        self.nominal.len() + self.structural.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nominal.is_empty() && self.structural.is_empty()
    }
}

/// Storage for every type-parameter builder created while building a unit.
///
/// Every variable is created here, so the arena doubles as the unit's
/// unbound-variable list: [`take_unbound`](Self::take_unbound) hands out
/// each id exactly once.
#[derive(Clone, Debug)]
pub struct VariableArena {
    file: FileId,
    nominal: Vec<NominalVariableBuilder>,
    structural: Vec<StructuralVariableBuilder>,
    nominal_taken: usize,
    structural_taken: usize,
}

impl VariableArena {
    pub fn new(file: FileId) -> Self {
        Self {
            file,
            nominal: Vec::new(),
            structural: Vec::new(),
            nominal_taken: 0,
            structural_taken: 0,
        }
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    pub fn new_nominal(&mut self, name: impl Into<SmolStr>, offset: TextSize, kind: TypeParameterKind) -> NominalVariableId {
        let id = NominalVariableId {
            file: self.file,
            local: self.nominal.len() as u32,
        };
        self.nominal.push(NominalVariableBuilder {
            id,
            name: name.into(),
            offset,
            kind,
            bound: None,
            default_type: None,
            owner: None,
        });
        id
    }

    pub fn new_structural(&mut self, name: impl Into<SmolStr>, offset: TextSize) -> StructuralVariableId {
        let id = StructuralVariableId {
            file: self.file,
            local: self.structural.len() as u32,
        };
        self.structural.push(StructuralVariableBuilder {
            id,
            name: name.into(),
            offset,
            bound: None,
        });
        id
    }

    pub fn nominal(&self, id: NominalVariableId) -> Option<&NominalVariableBuilder> {
        if id.file != self.file {
            return None;
        }
        self.nominal.get(id.local as usize)
    }

    pub fn nominal_mut(&mut self, id: NominalVariableId) -> Option<&mut NominalVariableBuilder> {
        if id.file != self.file {
            return None;
        }
        self.nominal.get_mut(id.local as usize)
    }

    pub fn structural(&self, id: StructuralVariableId) -> Option<&StructuralVariableBuilder> {
        if id.file != self.file {
            return None;
        }
        self.structural.get(id.local as usize)
    }

    pub fn structural_mut(&mut self, id: StructuralVariableId) -> Option<&mut StructuralVariableBuilder> {
        if id.file != self.file {
            return None;
        }
        self.structural.get_mut(id.local as usize)
    }

    pub fn nominal_name(&self, id: NominalVariableId) -> BuildResult<&SmolStr> {
        self.nominal(id).map(|v| &v.name).ok_or(InternalError::UnknownTypeParameter)
    }

    /// A named type referring to `id`, as written at `offset`.
    pub fn type_of(&self, id: NominalVariableId, offset: TextSize) -> BuildResult<TypeBuilder> {
        Ok(TypeBuilder::variable(self.nominal_name(id)?.clone(), id, offset))
    }

    /// Hand out every variable created since the last call.
    pub fn take_unbound(&mut self) -> UnboundVariables {
        let nominal = self.nominal[self.nominal_taken..].iter().map(|v| v.id).collect();
        let structural = self.structural[self.structural_taken..].iter().map(|v| v.id).collect();
        self.nominal_taken = self.nominal.len();
        self.structural_taken = self.structural.len();
        UnboundVariables { nominal, structural }
    }

    pub fn nominal_count(&self) -> usize {
        self.nominal.len()
    }

    pub fn structural_count(&self) -> usize {
        self.structural.len()
    }
}

/// Fresh copies of a list of type parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NominalParameterCopy {
    pub new_parameters: Vec<NominalVariableId>,
    pub substitution: NominalSubstitution,
}

/// Copy `parameters` as `kind`, rewriting bounds and defaults to refer to
/// the copies. Returns `None` when there is nothing to copy.
pub fn copy_type_parameters(
    arena: &mut VariableArena,
    parameters: &[NominalVariableId],
    kind: TypeParameterKind,
) -> BuildResult<Option<NominalParameterCopy>> {
    if parameters.is_empty() {
        return Ok(None);
    }

    let mut substitution = NominalSubstitution::default();
    let mut new_parameters = Vec::with_capacity(parameters.len());
    for &old in parameters {
        let (name, offset) = {
            let variable = arena.nominal(old).ok_or(InternalError::UnknownTypeParameter)?;
            (variable.name.clone(), variable.offset)
        };
        let fresh = arena.new_nominal(name, offset, kind);
        substitution.insert(old, fresh);
        new_parameters.push(fresh);
    }

    for (&old, &fresh) in parameters.iter().zip(&new_parameters) {
        let (bound, default_type) = {
            let variable = arena.nominal(old).ok_or(InternalError::UnknownTypeParameter)?;
            (variable.bound.clone(), variable.default_type.clone())
        };
        let bound = bound.map(|b| b.substitute(&substitution, arena));
        let default_type = default_type.map(|d| d.substitute(&substitution, arena));
        if let Some(variable) = arena.nominal_mut(fresh) {
            variable.bound = bound;
            variable.default_type = default_type;
        }
    }

    Ok(Some(NominalParameterCopy {
        new_parameters,
        substitution,
    }))
}
