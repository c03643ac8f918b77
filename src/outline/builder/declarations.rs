//! Class-like declarations, named mixin applications and typedefs.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::base::{DeclarationOffsets, TextSize};

use super::{AppliedMixins, BuilderFactory};
use crate::outline::error::{BuildResult, InternalError};
use crate::outline::fragments::{
    ClassFragment, DeclarationBuilder, DeclarationKind, EnumConstant, EnumFragment, ExtensionFragment,
    ExtensionTypeFragment, FieldFragment, FieldReferences, Fragment, MixinFragment, NamedMixinApplicationFragment,
    TypedefFragment,
};
use crate::outline::ids::{FragmentId, NominalVariableId};
use crate::outline::mixin::{MixinApplicationBuilder, MixinApplicationRequest, MixinChain, MixinSynthesizer, NamedApplication};
use crate::outline::modifiers::Modifiers;
use crate::outline::names::{CanonicalName, ContainerType, DeclarationNameKind, FieldShape, NameScheme, declaration_name};
use crate::outline::namespace::DeclarationNameSpace;
use crate::outline::scope::TypeScopeKind;
use crate::outline::types::{MetadataBuilder, TypeBuilder, TypeName};

// ============================================================================
// PARSER INPUT
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct ClassDeclaration {
    pub metadata: Vec<MetadataBuilder>,
    pub modifiers: Modifiers,
    pub supertype: Option<TypeBuilder>,
    pub mixins: Option<MixinApplicationBuilder>,
    pub interfaces: Vec<TypeBuilder>,
    pub end_offset: TextSize,
}

#[derive(Clone, Debug)]
pub struct NamedMixinApplicationDeclaration {
    pub name: SmolStr,
    pub offsets: DeclarationOffsets,
    pub metadata: Vec<MetadataBuilder>,
    pub modifiers: Modifiers,
    pub supertype: Option<TypeBuilder>,
    pub mixins: MixinApplicationBuilder,
    pub interfaces: Vec<TypeBuilder>,
}

#[derive(Clone, Debug, Default)]
pub struct MixinDeclaration {
    pub metadata: Vec<MetadataBuilder>,
    pub modifiers: Modifiers,
    pub on_types: Vec<TypeBuilder>,
    pub interfaces: Vec<TypeBuilder>,
    pub end_offset: TextSize,
}

#[derive(Clone, Debug, Default)]
pub struct EnumDeclaration {
    pub metadata: Vec<MetadataBuilder>,
    pub mixins: Option<MixinApplicationBuilder>,
    pub interfaces: Vec<TypeBuilder>,
    pub constants: Vec<EnumConstant>,
    pub end_offset: TextSize,
}

#[derive(Clone, Debug, Default)]
pub struct ExtensionDeclaration {
    pub metadata: Vec<MetadataBuilder>,
    pub modifiers: Modifiers,
    pub end_offset: TextSize,
}

#[derive(Clone, Debug, Default)]
pub struct ExtensionTypeDeclaration {
    pub metadata: Vec<MetadataBuilder>,
    pub modifiers: Modifiers,
    pub interfaces: Vec<TypeBuilder>,
    pub end_offset: TextSize,
}

#[derive(Clone, Debug)]
pub struct TypedefDeclaration {
    pub name: SmolStr,
    pub offsets: DeclarationOffsets,
    pub metadata: Vec<MetadataBuilder>,
    pub aliased_type: TypeBuilder,
}

/// A pending declaration with its type parameters finalized.
struct Closed {
    pending: DeclarationBuilder,
    type_parameters: Vec<NominalVariableId>,
}

impl BuilderFactory<'_> {
    // ------------------------------------------------------------------------
    // Scope plumbing shared by every class-like declaration
    // ------------------------------------------------------------------------

    /// Open the type-parameter scope of a class, mixin, enum, extension,
    /// extension type or named mixin application header.
    pub fn begin_declaration_header(&mut self) -> BuildResult<()> {
        self.guard("begin_declaration_header", |this| {
            this.scopes.push_type_scope(TypeScopeKind::DeclarationTypeParameters);
            Ok(())
        })
    }

    fn begin_declaration(
        &mut self,
        kind: DeclarationKind,
        name: Option<SmolStr>,
        offsets: DeclarationOffsets,
        on_type: Option<TypeBuilder>,
    ) -> BuildResult<()> {
        let found = self.scopes.current();
        if found != TypeScopeKind::DeclarationTypeParameters {
            return Err(InternalError::ScopeKindMismatch {
                expected: TypeScopeKind::DeclarationTypeParameters,
                found,
            });
        }
        let type_parameters = self.scopes.current_nominal_namespace()?.ids();
        let container_name = match &name {
            Some(name) => name.clone(),
            None => self.ctx.unnamed_extension_name(&self.unit.library_uri),
        };
        let id = self.ids.next_id();
        tracing::debug!(%kind, name = %container_name, ?id, "begin declaration");

        let pending = DeclarationBuilder {
            id,
            kind,
            name,
            container_name,
            offsets,
            scope: self.scopes.current_id(),
            type_parameters,
            on_type,
            modifiers: Modifiers::empty(),
            representation: None,
            name_space: DeclarationNameSpace::new(),
        };
        self.scopes.push_declaration(pending);
        self.scopes.push_type_scope(TypeScopeKind::DeclarationBody(kind));
        Ok(())
    }

    fn end_declaration(&mut self, kind: DeclarationKind) -> BuildResult<()> {
        self.scopes.pop_type_scope(TypeScopeKind::DeclarationBody(kind))?;
        self.scopes.pop_type_scope(TypeScopeKind::DeclarationTypeParameters)?;
        tracing::debug!(%kind, "end declaration");
        Ok(())
    }

    fn end_declaration_for_parser_recovery(&mut self, kind: DeclarationKind) -> BuildResult<()> {
        self.end_declaration(kind)?;
        let pending = self.scopes.pop_declaration(kind)?;
        tracing::warn!(%kind, name = %pending.display_name(), "declaration discarded by parser recovery");
        let discarded: FxHashSet<FragmentId> = pending
            .name_space
            .members()
            .iter()
            .chain(pending.name_space.constructors().iter())
            .map(Fragment::id)
            .collect();
        self.ctx.release_references(&discarded);
        self.scopes.pop_nominal_namespace()?.add_type_parameters(
            &mut self.variables,
            &mut self.diagnostics,
            Some(pending.display_name()),
            true,
        );
        Ok(())
    }

    /// Pop the pending declaration and finalize its type parameters.
    fn close_declaration(&mut self, kind: DeclarationKind) -> BuildResult<Closed> {
        let pending = self.scopes.pop_declaration(kind)?;
        let type_parameters = self.scopes.pop_nominal_namespace()?.add_type_parameters(
            &mut self.variables,
            &mut self.diagnostics,
            Some(pending.display_name()),
            false,
        );
        Ok(Closed {
            pending,
            type_parameters,
        })
    }

    /// `Name<T, ...>` for a declaration's own type parameters.
    fn this_type(&self, name: &str, type_parameters: &[NominalVariableId], offset: TextSize) -> BuildResult<TypeBuilder> {
        let arguments = type_parameters
            .iter()
            .map(|&id| self.variables.type_of(id, offset))
            .collect::<BuildResult<Vec<_>>>()?;
        Ok(TypeBuilder::named_with(TypeName::new(name, offset), arguments, None))
    }

    fn apply_mixins(&mut self, request: MixinApplicationRequest) -> BuildResult<MixinChain> {
        let subclass = request.subclass_name.clone();
        let object_type = self.ctx.config.object_type.clone();
        let library = self.unit.library_uri.clone();
        let ctx = &mut *self.ctx;
        let mut references =
            |name: &CanonicalName, id: FragmentId| ctx.claim_reference(&library, None, name, id);
        let chain = MixinSynthesizer {
            arena: &mut self.variables,
            ids: &mut self.ids,
            library: &library,
            object_type: &object_type,
            references: &mut references,
        }
        .apply(request)?;

        let classes: Vec<_> = chain.classes.iter().map(|c| c.id).collect();
        for class in chain.classes.iter().cloned() {
            self.register_top_level(Fragment::Class(class));
        }
        self.mixin_applications.push(AppliedMixins {
            subclass,
            classes,
            supertype: chain.supertype.clone(),
        });
        Ok(chain)
    }

    // ------------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------------

    pub fn begin_class_declaration(&mut self, name: impl Into<SmolStr>, offsets: DeclarationOffsets) -> BuildResult<()> {
        let name = name.into();
        self.guard("begin_class_declaration", |this| {
            this.begin_declaration(DeclarationKind::Class, Some(name), offsets, None)
        })
    }

    pub fn end_class_declaration(&mut self) -> BuildResult<()> {
        self.guard("end_class_declaration", |this| this.end_declaration(DeclarationKind::Class))
    }

    pub fn end_class_declaration_for_parser_recovery(&mut self) -> BuildResult<()> {
        self.guard("end_class_declaration_for_parser_recovery", |this| {
            this.end_declaration_for_parser_recovery(DeclarationKind::Class)
        })
    }

    pub fn add_class(&mut self, declaration: ClassDeclaration) -> BuildResult<FragmentId> {
        self.guard("add_class", |this| {
            let Closed {
                pending,
                type_parameters,
            } = this.close_declaration(DeclarationKind::Class)?;
            let name = pending.container_name.clone();

            let supertype = match declaration.mixins {
                Some(mixins) => {
                    this.apply_mixins(MixinApplicationRequest {
                        subclass_name: name.clone(),
                        type_parameters: type_parameters.clone(),
                        supertype: declaration.supertype,
                        mixins,
                        modifiers: declaration.modifiers,
                        offsets: pending.offsets,
                        is_mixin_declaration: false,
                        named: None,
                    })?
                    .supertype
                }
                None => declaration.supertype,
            };

            let canonical = declaration_name(DeclarationNameKind::Class, &name, this.library_uri());
            let reference = this.claim_top_level(&canonical, pending.id);
            this.register_top_level(Fragment::Class(ClassFragment {
                id: pending.id,
                name,
                offsets: pending.offsets.with_end(declaration.end_offset),
                modifiers: declaration.modifiers | pending.modifiers,
                metadata: declaration.metadata,
                reference,
                scope: Some(pending.scope),
                type_parameters,
                supertype,
                mixed_in_type: None,
                interfaces: declaration.interfaces,
                name_space: pending.name_space,
            }));
            Ok(pending.id)
        })
    }

    // ------------------------------------------------------------------------
    // Named mixin applications
    // ------------------------------------------------------------------------

    /// `class N<T> = S with M;` after the header's type parameters.
    pub fn begin_named_mixin_application(&mut self) -> BuildResult<()> {
        self.guard("begin_named_mixin_application", |this| {
            let found = this.scopes.current();
            if found != TypeScopeKind::DeclarationTypeParameters {
                return Err(InternalError::ScopeKindMismatch {
                    expected: TypeScopeKind::DeclarationTypeParameters,
                    found,
                });
            }
            this.named_mixin_scope = Some(this.scopes.current_id());
            Ok(())
        })
    }

    pub fn end_named_mixin_application(&mut self) -> BuildResult<()> {
        self.guard("end_named_mixin_application", |this| {
            this.scopes.pop_type_scope(TypeScopeKind::DeclarationTypeParameters)?;
            Ok(())
        })
    }

    pub fn end_named_mixin_application_for_parser_recovery(&mut self) -> BuildResult<()> {
        self.guard("end_named_mixin_application_for_parser_recovery", |this| {
            tracing::warn!(file = ?this.file, "named mixin application discarded by parser recovery");
            this.named_mixin_scope = None;
            this.scopes.pop_type_scope(TypeScopeKind::DeclarationTypeParameters)?;
            this.scopes
                .pop_nominal_namespace()?
                .add_type_parameters(&mut this.variables, &mut this.diagnostics, None, true);
            Ok(())
        })
    }

    pub fn add_named_mixin_application(&mut self, declaration: NamedMixinApplicationDeclaration) -> BuildResult<FragmentId> {
        self.guard("add_named_mixin_application", |this| {
            let scope = this
                .named_mixin_scope
                .take()
                .ok_or(InternalError::NoCurrentDeclaration("named mixin application"))?;
            let type_parameters = this.scopes.pop_nominal_namespace()?.add_type_parameters(
                &mut this.variables,
                &mut this.diagnostics,
                Some(declaration.name.as_str()),
                false,
            );
            let id = this.ids.next_id();
            let canonical = declaration_name(DeclarationNameKind::Class, &declaration.name, this.library_uri());
            let reference = this.claim_top_level(&canonical, id);
            let fallback_supertype = declaration.supertype.clone();
            let chain = this.apply_mixins(MixinApplicationRequest {
                subclass_name: declaration.name.clone(),
                type_parameters: type_parameters.clone(),
                supertype: declaration.supertype,
                mixins: declaration.mixins,
                modifiers: declaration.modifiers,
                offsets: declaration.offsets,
                is_mixin_declaration: false,
                named: Some(NamedApplication {
                    id,
                    scope,
                    metadata: declaration.metadata.clone(),
                    interfaces: declaration.interfaces.clone(),
                    reference,
                }),
            })?;

            // An empty `with` clause only reaches here from broken input.
            let fragment = chain.named.unwrap_or_else(|| NamedMixinApplicationFragment {
                id,
                name: declaration.name.clone(),
                offsets: declaration.offsets,
                modifiers: declaration.modifiers | Modifiers::NAMED_MIXIN_APPLICATION,
                metadata: declaration.metadata,
                reference,
                scope,
                type_parameters,
                supertype: fallback_supertype.unwrap_or(TypeBuilder::Invalid(declaration.offsets.name)),
                mixed_in_type: TypeBuilder::Invalid(declaration.offsets.name),
                interfaces: declaration.interfaces,
            });
            this.register_top_level(Fragment::NamedMixinApplication(fragment));
            Ok(id)
        })
    }

    // ------------------------------------------------------------------------
    // Mixins
    // ------------------------------------------------------------------------

    pub fn begin_mixin_declaration(&mut self, name: impl Into<SmolStr>, offsets: DeclarationOffsets) -> BuildResult<()> {
        let name = name.into();
        self.guard("begin_mixin_declaration", |this| {
            this.begin_declaration(DeclarationKind::Mixin, Some(name), offsets, None)
        })
    }

    pub fn end_mixin_declaration(&mut self) -> BuildResult<()> {
        self.guard("end_mixin_declaration", |this| this.end_declaration(DeclarationKind::Mixin))
    }

    pub fn end_mixin_declaration_for_parser_recovery(&mut self) -> BuildResult<()> {
        self.guard("end_mixin_declaration_for_parser_recovery", |this| {
            this.end_declaration_for_parser_recovery(DeclarationKind::Mixin)
        })
    }

    pub fn add_mixin_declaration(&mut self, declaration: MixinDeclaration) -> BuildResult<FragmentId> {
        self.guard("add_mixin_declaration", |this| {
            let Closed {
                pending,
                type_parameters,
            } = this.close_declaration(DeclarationKind::Mixin)?;
            let name = pending.container_name.clone();

            let supertype = match declaration.on_types.as_slice() {
                [] => None,
                [single] => Some(single.clone()),
                [first, rest @ ..] => {
                    this.apply_mixins(MixinApplicationRequest {
                        subclass_name: name.clone(),
                        type_parameters: type_parameters.clone(),
                        supertype: Some(first.clone()),
                        mixins: MixinApplicationBuilder {
                            mixins: rest.to_vec(),
                            offset: pending.offsets.name,
                        },
                        modifiers: declaration.modifiers,
                        offsets: pending.offsets,
                        is_mixin_declaration: true,
                        named: None,
                    })?
                    .supertype
                }
            };

            let canonical = declaration_name(DeclarationNameKind::Mixin, &name, this.library_uri());
            let reference = this.claim_top_level(&canonical, pending.id);
            this.register_top_level(Fragment::Mixin(MixinFragment {
                id: pending.id,
                name,
                offsets: pending.offsets.with_end(declaration.end_offset),
                modifiers: declaration.modifiers | pending.modifiers,
                metadata: declaration.metadata,
                reference,
                scope: pending.scope,
                type_parameters,
                on_types: declaration.on_types,
                supertype,
                interfaces: declaration.interfaces,
                name_space: pending.name_space,
            }));
            Ok(pending.id)
        })
    }

    // ------------------------------------------------------------------------
    // Enums
    // ------------------------------------------------------------------------

    pub fn begin_enum_declaration(&mut self, name: impl Into<SmolStr>, offsets: DeclarationOffsets) -> BuildResult<()> {
        let name = name.into();
        self.guard("begin_enum_declaration", |this| {
            this.begin_declaration(DeclarationKind::Enum, Some(name), offsets, None)
        })
    }

    pub fn end_enum_declaration(&mut self) -> BuildResult<()> {
        self.guard("end_enum_declaration", |this| this.end_declaration(DeclarationKind::Enum))
    }

    pub fn end_enum_declaration_for_parser_recovery(&mut self) -> BuildResult<()> {
        self.guard("end_enum_declaration_for_parser_recovery", |this| {
            this.end_declaration_for_parser_recovery(DeclarationKind::Enum)
        })
    }

    /// Freeze an enum, synthesizing a static const field per constant plus
    /// `values`.
    pub fn add_enum(&mut self, declaration: EnumDeclaration) -> BuildResult<FragmentId> {
        self.guard("add_enum", |this| {
            let Closed {
                mut pending,
                type_parameters,
            } = this.close_declaration(DeclarationKind::Enum)?;
            let name = pending.container_name.clone();
            let offset = pending.offsets.name;

            let base = TypeBuilder::named(TypeName::new(this.ctx.config.enum_base_type.clone(), offset));
            let supertype = match declaration.mixins {
                Some(mixins) => this
                    .apply_mixins(MixinApplicationRequest {
                        subclass_name: name.clone(),
                        type_parameters: type_parameters.clone(),
                        supertype: Some(base.clone()),
                        mixins,
                        modifiers: Modifiers::empty(),
                        offsets: pending.offsets,
                        is_mixin_declaration: false,
                        named: None,
                    })?
                    .supertype
                    .unwrap_or(base),
                None => base,
            };

            let enum_type = this.this_type(&name, &type_parameters, offset)?;
            let scheme = NameScheme::member(ContainerType::Enum, name.clone(), false, this.library_uri().clone());
            let constant_modifiers = Modifiers::STATIC | Modifiers::CONST | Modifiers::HAS_INITIALIZER;
            for constant in &declaration.constants {
                let field = this.enum_field(
                    &scheme,
                    constant.name.clone(),
                    DeclarationOffsets::at(constant.offset),
                    constant_modifiers,
                    constant.metadata.clone(),
                    enum_type.clone(),
                );
                pending.name_space.add_member(field);
            }
            let values_type = TypeBuilder::named_with(TypeName::new("List", offset), vec![enum_type], None);
            let values = this.enum_field(
                &scheme,
                SmolStr::new_static("values"),
                DeclarationOffsets::at(offset),
                constant_modifiers | Modifiers::SYNTHETIC,
                Vec::new(),
                values_type,
            );
            pending.name_space.add_member(values);

            let canonical = declaration_name(DeclarationNameKind::Enum, &name, this.library_uri());
            let reference = this.claim_top_level(&canonical, pending.id);
            this.register_top_level(Fragment::Enum(EnumFragment {
                id: pending.id,
                name,
                offsets: pending.offsets.with_end(declaration.end_offset),
                modifiers: pending.modifiers,
                metadata: declaration.metadata,
                reference,
                scope: pending.scope,
                type_parameters,
                supertype,
                interfaces: declaration.interfaces,
                constants: declaration.constants,
                name_space: pending.name_space,
            }));
            Ok(pending.id)
        })
    }

    fn enum_field(
        &mut self,
        scheme: &NameScheme,
        name: SmolStr,
        offsets: DeclarationOffsets,
        modifiers: Modifiers,
        metadata: Vec<MetadataBuilder>,
        ty: TypeBuilder,
    ) -> Fragment {
        let id = self.ids.next_id();
        let names = scheme.field_names(&name, FieldShape::default());
        let references = FieldReferences {
            field: self.claim(scheme, &names.field, id),
            getter: self.claim(scheme, &names.getter, id),
            setter: None,
            is_set: None,
        };
        Fragment::Field(FieldFragment {
            id,
            name,
            offsets,
            modifiers,
            metadata,
            ty,
            is_top_level: false,
            is_late_lowered: false,
            references,
        })
    }

    // ------------------------------------------------------------------------
    // Extensions
    // ------------------------------------------------------------------------

    /// `extension E<T> on Type {`; unnamed extensions get `_extension#N`.
    pub fn begin_extension_declaration(
        &mut self,
        name: Option<SmolStr>,
        offsets: DeclarationOffsets,
        on_type: TypeBuilder,
    ) -> BuildResult<()> {
        self.guard("begin_extension_declaration", |this| {
            this.begin_declaration(DeclarationKind::Extension, name, offsets, Some(on_type))
        })
    }

    pub fn end_extension_declaration(&mut self) -> BuildResult<()> {
        self.guard("end_extension_declaration", |this| {
            this.end_declaration(DeclarationKind::Extension)?;
            // Only extensions that survive use up an `_extension#N` number.
            let unnamed = this
                .scopes
                .current_declaration()
                .is_some_and(|d| d.kind == DeclarationKind::Extension && d.name.is_none());
            if unnamed {
                this.ctx.advance_unnamed_extension(&this.unit.library_uri);
            }
            Ok(())
        })
    }

    pub fn end_extension_declaration_for_parser_recovery(&mut self) -> BuildResult<()> {
        self.guard("end_extension_declaration_for_parser_recovery", |this| {
            this.end_declaration_for_parser_recovery(DeclarationKind::Extension)
        })
    }

    pub fn add_extension_declaration(&mut self, declaration: ExtensionDeclaration) -> BuildResult<FragmentId> {
        self.guard("add_extension_declaration", |this| {
            let Closed {
                pending,
                type_parameters,
            } = this.close_declaration(DeclarationKind::Extension)?;
            let canonical = declaration_name(DeclarationNameKind::Extension, &pending.container_name, this.library_uri());
            let reference = this.claim_top_level(&canonical, pending.id);
            let on_type = pending
                .on_type
                .unwrap_or(TypeBuilder::Invalid(pending.offsets.name));
            this.register_top_level(Fragment::Extension(ExtensionFragment {
                id: pending.id,
                name: pending.name,
                container_name: pending.container_name,
                offsets: pending.offsets.with_end(declaration.end_offset),
                modifiers: declaration.modifiers | pending.modifiers,
                metadata: declaration.metadata,
                reference,
                scope: pending.scope,
                type_parameters,
                on_type,
                name_space: pending.name_space,
            }));
            Ok(pending.id)
        })
    }

    // ------------------------------------------------------------------------
    // Extension types
    // ------------------------------------------------------------------------

    pub fn begin_extension_type_declaration(&mut self, name: impl Into<SmolStr>, offsets: DeclarationOffsets) -> BuildResult<()> {
        let name = name.into();
        self.guard("begin_extension_type_declaration", |this| {
            this.begin_declaration(DeclarationKind::ExtensionType, Some(name), offsets, None)
        })
    }

    pub fn end_extension_type_declaration(&mut self) -> BuildResult<()> {
        self.guard("end_extension_type_declaration", |this| {
            this.end_declaration(DeclarationKind::ExtensionType)
        })
    }

    pub fn end_extension_type_declaration_for_parser_recovery(&mut self) -> BuildResult<()> {
        self.guard("end_extension_type_declaration_for_parser_recovery", |this| {
            this.end_declaration_for_parser_recovery(DeclarationKind::ExtensionType)
        })
    }

    pub fn add_extension_type_declaration(&mut self, declaration: ExtensionTypeDeclaration) -> BuildResult<FragmentId> {
        self.guard("add_extension_type_declaration", |this| {
            let Closed {
                pending,
                type_parameters,
            } = this.close_declaration(DeclarationKind::ExtensionType)?;
            let name = pending.container_name.clone();
            let canonical = declaration_name(DeclarationNameKind::ExtensionType, &name, this.library_uri());
            let reference = this.claim_top_level(&canonical, pending.id);
            this.register_top_level(Fragment::ExtensionType(ExtensionTypeFragment {
                id: pending.id,
                name,
                offsets: pending.offsets.with_end(declaration.end_offset),
                modifiers: declaration.modifiers | pending.modifiers,
                metadata: declaration.metadata,
                reference,
                scope: pending.scope,
                type_parameters,
                representation: pending.representation,
                interfaces: declaration.interfaces,
                name_space: pending.name_space,
            }));
            Ok(pending.id)
        })
    }

    // ------------------------------------------------------------------------
    // Typedefs
    // ------------------------------------------------------------------------

    pub fn begin_typedef(&mut self) -> BuildResult<()> {
        self.guard("begin_typedef", |this| {
            this.scopes.push_type_scope(TypeScopeKind::DeclarationTypeParameters);
            Ok(())
        })
    }

    pub fn end_typedef(&mut self) -> BuildResult<()> {
        self.guard("end_typedef", |this| {
            this.scopes.pop_type_scope(TypeScopeKind::DeclarationTypeParameters)?;
            Ok(())
        })
    }

    pub fn end_typedef_for_parser_recovery(&mut self) -> BuildResult<()> {
        self.guard("end_typedef_for_parser_recovery", |this| {
            tracing::warn!(file = ?this.file, "typedef discarded by parser recovery");
            this.scopes.pop_type_scope(TypeScopeKind::DeclarationTypeParameters)?;
            this.scopes
                .pop_nominal_namespace()?
                .add_type_parameters(&mut this.variables, &mut this.diagnostics, None, true);
            Ok(())
        })
    }

    pub fn add_function_type_alias(&mut self, declaration: TypedefDeclaration) -> BuildResult<FragmentId> {
        self.guard("add_function_type_alias", |this| {
            let type_parameters = this.scopes.pop_nominal_namespace()?.add_type_parameters(
                &mut this.variables,
                &mut this.diagnostics,
                Some(declaration.name.as_str()),
                false,
            );
            let id = this.ids.next_id();
            let canonical = declaration_name(DeclarationNameKind::Typedef, &declaration.name, this.library_uri());
            let reference = this.claim_top_level(&canonical, id);
            this.register_top_level(Fragment::Typedef(TypedefFragment {
                id,
                name: declaration.name,
                offsets: declaration.offsets,
                modifiers: Modifiers::empty(),
                metadata: declaration.metadata,
                reference,
                type_parameters,
                aliased_type: declaration.aliased_type,
            }));
            Ok(id)
        })
    }
}
