//! Type-parameter and type events.

use smol_str::SmolStr;

use crate::base::TextSize;

use super::BuilderFactory;
use crate::outline::error::{BuildResult, InternalError};
use crate::outline::ids::{NominalVariableId, StructuralVariableId};
use crate::outline::scope::TypeScopeKind;
use crate::outline::types::{
    FormalParameterBuilder, FunctionTypeBuilder, NamedTypeBuilder, Nullability, TypeBuilder, TypeName,
    TypeParameterKind,
};

impl BuilderFactory<'_> {
    /// Declare a type parameter in the innermost nominal parameter namespace.
    pub fn add_nominal_parameter(&mut self, name: impl Into<SmolStr>, offset: TextSize) -> BuildResult<NominalVariableId> {
        let name = name.into();
        self.guard("add_nominal_parameter", |this| {
            let kind = match this.scopes.current() {
                TypeScopeKind::MemberTypeParameters => TypeParameterKind::Member,
                _ => TypeParameterKind::Declaration,
            };
            let id = this.variables.new_nominal(name.clone(), offset, kind);
            this.scopes.current_nominal_namespace()?.push(name, offset, id);
            Ok(id)
        })
    }

    /// Declare a type parameter of the innermost function type.
    pub fn add_structural_parameter(
        &mut self,
        name: impl Into<SmolStr>,
        offset: TextSize,
    ) -> BuildResult<StructuralVariableId> {
        let name = name.into();
        self.guard("add_structural_parameter", |this| {
            let id = this.variables.new_structural(name.clone(), offset);
            this.scopes.current_structural_namespace()?.push(name, offset, id);
            Ok(id)
        })
    }

    pub fn set_nominal_bound(&mut self, id: NominalVariableId, bound: TypeBuilder) -> BuildResult<()> {
        self.guard("set_nominal_bound", |this| {
            let variable = this.variables.nominal_mut(id).ok_or(InternalError::UnknownTypeParameter)?;
            variable.bound = Some(bound);
            Ok(())
        })
    }

    pub fn set_nominal_default(&mut self, id: NominalVariableId, default_type: TypeBuilder) -> BuildResult<()> {
        self.guard("set_nominal_default", |this| {
            let variable = this.variables.nominal_mut(id).ok_or(InternalError::UnknownTypeParameter)?;
            variable.default_type = Some(default_type);
            Ok(())
        })
    }

    pub fn set_structural_bound(&mut self, id: StructuralVariableId, bound: TypeBuilder) -> BuildResult<()> {
        self.guard("set_structural_bound", |this| {
            let variable = this
                .variables
                .structural_mut(id)
                .ok_or(InternalError::UnknownTypeParameter)?;
            variable.bound = Some(bound);
            Ok(())
        })
    }

    /// Create a named type, binding unprefixed names to the innermost type
    /// variable in scope. Other names are kept for elaboration.
    pub fn add_named_type(
        &mut self,
        name: TypeName,
        arguments: Vec<TypeBuilder>,
        nullability: Nullability,
    ) -> BuildResult<TypeBuilder> {
        self.guard("add_named_type", |this| {
            let declaration = match name.prefix {
                None => this.scopes.lookup_type_variable(&name.name),
                Some(_) => None,
            };
            if declaration.is_none() {
                tracing::trace!(name = %name.name, prefix = ?name.prefix, "unresolved type name");
                this.unresolved_types.push(name.clone());
            }
            Ok(TypeBuilder::Named(NamedTypeBuilder {
                name,
                arguments,
                nullability,
                declaration,
            }))
        })
    }

    pub fn begin_function_type(&mut self) -> BuildResult<()> {
        self.guard("begin_function_type", |this| {
            this.scopes.push_type_scope(TypeScopeKind::FunctionTypeParameters);
            Ok(())
        })
    }

    pub fn end_function_type(
        &mut self,
        return_type: TypeBuilder,
        formals: Vec<FormalParameterBuilder>,
        nullability: Nullability,
        offset: TextSize,
    ) -> BuildResult<TypeBuilder> {
        self.guard("end_function_type", |this| {
            this.scopes.pop_type_scope(TypeScopeKind::FunctionTypeParameters)?;
            let type_parameters = this
                .scopes
                .pop_structural_namespace()?
                .add_type_parameters(this.file, &mut this.diagnostics, false);
            Ok(TypeBuilder::Function(FunctionTypeBuilder {
                return_type: Box::new(return_type),
                type_parameters,
                formals,
                nullability,
                offset,
            }))
        })
    }

    pub fn end_function_type_for_parser_recovery(&mut self) -> BuildResult<()> {
        self.guard("end_function_type_for_parser_recovery", |this| {
            tracing::warn!(file = ?this.file, "function type closed by parser recovery");
            this.scopes.pop_type_scope(TypeScopeKind::FunctionTypeParameters)?;
            this.scopes
                .pop_structural_namespace()?
                .add_type_parameters(this.file, &mut this.diagnostics, true);
            Ok(())
        })
    }
}
