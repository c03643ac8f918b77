//! Member events: methods, constructors, factories, primary constructors
//! and fields.

use smol_str::SmolStr;

use crate::base::{DeclarationOffsets, TextSize};

use super::BuilderFactory;
use crate::outline::diagnostics::{Diagnostic, DiagnosticSink, Location, Template};
use crate::outline::error::{BuildResult, InternalError};
use crate::outline::fragments::{
    ConstructorFragment, ConstructorReferenceBuilder, DeclarationKind, FactoryFragment, FieldFragment, FieldReferences,
    Fragment, MethodFragment, RepresentationField, field_has_setter,
};
use crate::outline::ids::{FragmentId, NominalVariableId};
use crate::outline::modifiers::Modifiers;
use crate::outline::names::{FieldShape, ProcedureKind};
use crate::outline::reference::Reference;
use crate::outline::scope::TypeScopeKind;
use crate::outline::types::{
    FormalParameterBuilder, MetadataBuilder, NominalSubstitution, TypeBuilder, TypeName, TypeParameterKind,
    VariableArena, copy_type_parameters,
};

const THIS_NAME: &str = "#this";

#[derive(Clone, Debug)]
pub struct MethodDeclaration {
    pub name: SmolStr,
    pub kind: ProcedureKind,
    pub offsets: DeclarationOffsets,
    pub modifiers: Modifiers,
    pub metadata: Vec<MetadataBuilder>,
    pub return_type: TypeBuilder,
    pub formals: Vec<FormalParameterBuilder>,
}

/// A constructor name as written: `C`, `C.named`, `new`, `new named`
/// or `C.new`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstructorIdentifier {
    pub prefix: SmolStr,
    pub prefix_offset: TextSize,
    pub suffix: Option<SmolStr>,
    pub suffix_offset: TextSize,
}

impl ConstructorIdentifier {
    pub fn unnamed(prefix: impl Into<SmolStr>, offset: TextSize) -> Self {
        Self {
            prefix: prefix.into(),
            prefix_offset: offset,
            suffix: None,
            suffix_offset: offset,
        }
    }

    pub fn named(prefix: impl Into<SmolStr>, prefix_offset: TextSize, suffix: impl Into<SmolStr>, suffix_offset: TextSize) -> Self {
        Self {
            prefix: prefix.into(),
            prefix_offset,
            suffix: Some(suffix.into()),
            suffix_offset,
        }
    }

    /// The suffix with `new` folded into the unnamed constructor.
    fn suffix_name(&self) -> SmolStr {
        match self.suffix.as_deref() {
            None | Some("new") => SmolStr::default(),
            Some(suffix) => SmolStr::new(suffix),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConstructorDeclaration {
    pub name: ConstructorIdentifier,
    pub offsets: DeclarationOffsets,
    pub modifiers: Modifiers,
    pub metadata: Vec<MetadataBuilder>,
    pub formals: Vec<FormalParameterBuilder>,
}

#[derive(Clone, Debug)]
pub struct FactoryDeclaration {
    pub name: ConstructorIdentifier,
    pub offsets: DeclarationOffsets,
    pub modifiers: Modifiers,
    pub metadata: Vec<MetadataBuilder>,
    pub formals: Vec<FormalParameterBuilder>,
    pub redirection_target: Option<ConstructorReferenceBuilder>,
}

/// `extension type E.name(int it)`; `name` is `None` for the unnamed one.
#[derive(Clone, Debug, Default)]
pub struct PrimaryConstructorDeclaration {
    pub name: Option<(SmolStr, TextSize)>,
    pub offsets: DeclarationOffsets,
    pub modifiers: Modifiers,
    pub formals: Vec<FormalParameterBuilder>,
}

#[derive(Clone, Debug)]
pub struct FieldDeclarator {
    pub name: SmolStr,
    pub offsets: DeclarationOffsets,
    pub has_initializer: bool,
}

/// `static late final int a = 0, b;`
#[derive(Clone, Debug)]
pub struct FieldsDeclaration {
    pub metadata: Vec<MetadataBuilder>,
    pub modifiers: Modifiers,
    pub ty: TypeBuilder,
    pub declarators: Vec<FieldDeclarator>,
}

/// What an extension-like declaration lends its members.
struct Enclosing {
    kind: DeclarationKind,
    name: SmolStr,
    name_offset: TextSize,
    type_parameters: Vec<NominalVariableId>,
    on_type: Option<TypeBuilder>,
}

/// Declaration type parameters copied onto one member.
#[derive(Default)]
struct Copied {
    parameters: Vec<NominalVariableId>,
    substitution: NominalSubstitution,
}

impl Copied {
    fn apply(&self, ty: &TypeBuilder, arena: &mut VariableArena) -> TypeBuilder {
        if self.substitution.is_empty() {
            ty.clone()
        } else {
            ty.substitute(&self.substitution, arena)
        }
    }
}

impl BuilderFactory<'_> {
    // ------------------------------------------------------------------------
    // Scope plumbing
    // ------------------------------------------------------------------------

    fn begin_member(&mut self, event: &'static str) -> BuildResult<()> {
        self.guard(event, |this| {
            this.scopes.push_type_scope(TypeScopeKind::MemberTypeParameters);
            Ok(())
        })
    }

    fn end_member(&mut self, event: &'static str) -> BuildResult<()> {
        self.guard(event, |this| {
            this.scopes.pop_type_scope(TypeScopeKind::MemberTypeParameters)?;
            Ok(())
        })
    }

    fn end_member_for_parser_recovery(&mut self, event: &'static str) -> BuildResult<()> {
        self.guard(event, |this| {
            tracing::warn!(file = ?this.file, event, "member discarded by parser recovery");
            this.scopes.pop_type_scope(TypeScopeKind::MemberTypeParameters)?;
            this.scopes
                .pop_nominal_namespace()?
                .add_type_parameters(&mut this.variables, &mut this.diagnostics, None, true);
            Ok(())
        })
    }

    pub fn begin_method(&mut self) -> BuildResult<()> {
        self.begin_member("begin_method")
    }

    pub fn end_method(&mut self) -> BuildResult<()> {
        self.end_member("end_method")
    }

    pub fn end_method_for_parser_recovery(&mut self) -> BuildResult<()> {
        self.end_member_for_parser_recovery("end_method_for_parser_recovery")
    }

    pub fn begin_constructor(&mut self) -> BuildResult<()> {
        self.begin_member("begin_constructor")
    }

    pub fn end_constructor(&mut self) -> BuildResult<()> {
        self.end_member("end_constructor")
    }

    pub fn end_constructor_for_parser_recovery(&mut self) -> BuildResult<()> {
        self.end_member_for_parser_recovery("end_constructor_for_parser_recovery")
    }

    pub fn begin_factory_method(&mut self) -> BuildResult<()> {
        self.begin_member("begin_factory_method")
    }

    pub fn end_factory_method(&mut self) -> BuildResult<()> {
        self.end_member("end_factory_method")
    }

    pub fn end_factory_method_for_parser_recovery(&mut self) -> BuildResult<()> {
        self.end_member_for_parser_recovery("end_factory_method_for_parser_recovery")
    }

    pub fn begin_primary_constructor(&mut self) -> BuildResult<()> {
        self.begin_member("begin_primary_constructor")
    }

    pub fn end_primary_constructor(&mut self) -> BuildResult<()> {
        self.end_member("end_primary_constructor")
    }

    pub fn end_primary_constructor_for_parser_recovery(&mut self) -> BuildResult<()> {
        self.end_member_for_parser_recovery("end_primary_constructor_for_parser_recovery")
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn member_type_parameters(&mut self, owner: &str) -> BuildResult<Vec<NominalVariableId>> {
        Ok(self.scopes.pop_nominal_namespace()?.add_type_parameters(
            &mut self.variables,
            &mut self.diagnostics,
            Some(owner),
            false,
        ))
    }

    fn enclosing(&self) -> Option<Enclosing> {
        self.scopes.current_declaration().map(|d| Enclosing {
            kind: d.kind,
            name: d.container_name.clone(),
            name_offset: d.offsets.name,
            type_parameters: d.type_parameters.clone(),
            on_type: d.on_type.clone(),
        })
    }

    fn copy_declaration_parameters(&mut self, enclosing: &Enclosing, owner: &str) -> BuildResult<Copied> {
        let copy = copy_type_parameters(
            &mut self.variables,
            &enclosing.type_parameters,
            TypeParameterKind::ExtensionSynthesized,
        )?;
        let Some(copy) = copy else {
            return Ok(Copied::default());
        };
        for &id in &copy.new_parameters {
            if let Some(variable) = self.variables.nominal_mut(id) {
                variable.owner = Some(SmolStr::new(owner));
            }
        }
        Ok(Copied {
            parameters: copy.new_parameters,
            substitution: copy.substitution,
        })
    }

    /// Type of the `#this` receiver: the `on` type of an extension, or
    /// `E<T...>` for an extension type.
    fn receiver_type(&self, enclosing: &Enclosing, offset: TextSize) -> BuildResult<TypeBuilder> {
        match enclosing.kind {
            DeclarationKind::Extension => Ok(enclosing
                .on_type
                .clone()
                .unwrap_or(TypeBuilder::Invalid(enclosing.name_offset))),
            _ => {
                let arguments = enclosing
                    .type_parameters
                    .iter()
                    .map(|&id| self.variables.type_of(id, offset))
                    .collect::<BuildResult<Vec<_>>>()?;
                Ok(TypeBuilder::named_with(
                    TypeName::new(enclosing.name.clone(), offset),
                    arguments,
                    None,
                ))
            }
        }
    }

    fn substitute_formals(&mut self, formals: Vec<FormalParameterBuilder>, copied: &Copied) -> Vec<FormalParameterBuilder> {
        formals
            .into_iter()
            .map(|formal| FormalParameterBuilder {
                ty: copied.apply(&formal.ty, &mut self.variables),
                ..formal
            })
            .collect()
    }

    /// Check `C.name` against the enclosing declaration and return the
    /// constructor suffix. A wrong prefix is reported; recovery keeps a
    /// named suffix and yields `None` when only the wrong prefix is left.
    fn constructor_suffix(&mut self, identifier: &ConstructorIdentifier, enclosing: &Enclosing) -> Option<SmolStr> {
        if identifier.prefix == "new" || identifier.prefix == enclosing.name {
            return Some(identifier.suffix_name());
        }
        let location = Location::new(self.file, identifier.prefix_offset, identifier.prefix.len() as u32);
        let context = Location::new(self.file, enclosing.name_offset, enclosing.name.len() as u32);
        self.diagnostics.report(
            Diagnostic::error(Template::ConstructorWithWrongName, location).with_context(
                Template::ConstructorWithWrongNameContext {
                    class_name: enclosing.name.clone(),
                },
                context,
            ),
        );
        match identifier.suffix.as_deref() {
            None | Some("new") => None,
            Some(suffix) => Some(SmolStr::new(suffix)),
        }
    }

    fn report_extension_constructor(&mut self, offsets: DeclarationOffsets, name: &ConstructorIdentifier) {
        self.report(Template::ExtensionDeclaresConstructor, offsets.name, name.prefix.len() as u32);
    }

    // ------------------------------------------------------------------------
    // Methods
    // ------------------------------------------------------------------------

    /// Add a method, getter, setter, operator or top-level function.
    pub fn add_method(&mut self, declaration: MethodDeclaration) -> BuildResult<FragmentId> {
        self.guard("add_method", |this| {
            let MethodDeclaration {
                name,
                kind,
                offsets,
                modifiers,
                metadata,
                mut return_type,
                mut formals,
            } = declaration;
            let own = this.member_type_parameters(&name)?;
            let enclosing = this.enclosing();
            let is_instance = enclosing.is_some() && !modifiers.is_static();
            let scheme = this.member_scheme(is_instance);

            let mut type_parameters = own;
            if let (true, Some(enclosing)) = (scheme.is_extension_instance_member(), &enclosing) {
                let copied = this.copy_declaration_parameters(enclosing, &name)?;
                let receiver = this.receiver_type(enclosing, offsets.name)?;
                let receiver = copied.apply(&receiver, &mut this.variables);
                return_type = copied.apply(&return_type, &mut this.variables);
                formals = this.substitute_formals(formals, &copied);

                let mut this_formal = FormalParameterBuilder::required(THIS_NAME, receiver, offsets.name);
                this_formal.modifiers = Modifiers::FINAL;
                this_formal.is_extension_this = true;
                formals.insert(0, this_formal);

                let mut all = copied.parameters;
                all.append(&mut type_parameters);
                type_parameters = all;
            }

            let id = this.ids.next_id();
            let reference = this.claim(&scheme, &scheme.procedure_name(kind, &name), id);
            let tear_off_reference = match (kind, scheme.tear_off_name(&name)) {
                (ProcedureKind::Method, Some(tear_off)) => this.claim(&scheme, &tear_off, id),
                _ => None,
            };

            this.register_member(Fragment::Method(MethodFragment {
                id,
                name,
                kind,
                offsets,
                modifiers,
                metadata,
                type_parameters,
                formals,
                return_type,
                is_top_level: enclosing.is_none(),
                reference,
                tear_off_reference,
            }));
            Ok(id)
        })
    }

    // ------------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------------

    /// Add a generative constructor. Returns `None` when the enclosing
    /// declaration cannot have one or the name cannot be recovered.
    pub fn add_constructor(&mut self, declaration: ConstructorDeclaration) -> BuildResult<Option<FragmentId>> {
        self.guard("add_constructor", |this| {
            let ConstructorDeclaration {
                name,
                offsets,
                modifiers,
                metadata,
                formals,
            } = declaration;
            let own = this.member_type_parameters(&name.prefix)?;
            let enclosing = this.enclosing().ok_or(InternalError::NoCurrentDeclaration("constructor"))?;
            if enclosing.kind == DeclarationKind::Extension {
                this.report_extension_constructor(offsets, &name);
                return Ok(None);
            }

            let Some(suffix) = this.constructor_suffix(&name, &enclosing) else {
                tracing::debug!(prefix = %name.prefix, "constructor with wrong name dropped");
                return Ok(None);
            };
            if modifiers.is_const() {
                if let Some(pending) = this.scopes.current_declaration_mut() {
                    pending.modifiers |= Modifiers::DECLARES_CONST_CONSTRUCTOR;
                }
            }

            let (type_parameters, formals) = this.constructor_signature(&enclosing, &suffix, own, formals)?;
            let id = this.ids.next_id();
            let (reference, tear_off_reference) = this.claim_constructor(&suffix, false, id);
            this.register_constructor(Fragment::Constructor(ConstructorFragment {
                id,
                name: suffix,
                offsets,
                modifiers,
                metadata,
                type_parameters,
                formals,
                is_primary: false,
                reference,
                tear_off_reference,
            }))?;
            Ok(Some(id))
        })
    }

    /// Extension-type constructors get copies of the declaration's type
    /// parameters in front of their own.
    fn constructor_signature(
        &mut self,
        enclosing: &Enclosing,
        owner: &str,
        own: Vec<NominalVariableId>,
        formals: Vec<FormalParameterBuilder>,
    ) -> BuildResult<(Vec<NominalVariableId>, Vec<FormalParameterBuilder>)> {
        if enclosing.kind != DeclarationKind::ExtensionType {
            return Ok((own, formals));
        }
        let copied = self.copy_declaration_parameters(enclosing, owner)?;
        let formals = self.substitute_formals(formals, &copied);
        let mut type_parameters = copied.parameters;
        type_parameters.extend(own);
        Ok((type_parameters, formals))
    }

    fn claim_constructor(&mut self, suffix: &str, is_factory: bool, id: FragmentId) -> (Option<Reference>, Option<Reference>) {
        let scheme = self.member_scheme(false);
        let reference = self.claim(&scheme, &scheme.constructor_name(suffix, is_factory), id);
        let tear_off_reference = if self.ctx.config.lower_constructor_tear_offs {
            self.claim(&scheme, &scheme.constructor_tear_off_name(suffix), id)
        } else {
            None
        };
        (reference, tear_off_reference)
    }

    pub fn add_factory_method(&mut self, declaration: FactoryDeclaration) -> BuildResult<Option<FragmentId>> {
        self.guard("add_factory_method", |this| {
            let FactoryDeclaration {
                name,
                offsets,
                modifiers,
                metadata,
                formals,
                redirection_target,
            } = declaration;
            let own = this.member_type_parameters(&name.prefix)?;
            let enclosing = this.enclosing().ok_or(InternalError::NoCurrentDeclaration("factory"))?;
            if enclosing.kind == DeclarationKind::Extension {
                this.report_extension_constructor(offsets, &name);
                return Ok(None);
            }

            let Some(suffix) = this.constructor_suffix(&name, &enclosing) else {
                tracing::debug!(prefix = %name.prefix, "factory with wrong name dropped");
                return Ok(None);
            };
            let (type_parameters, formals) = this.constructor_signature(&enclosing, &suffix, own, formals)?;
            let id = this.ids.next_id();
            let (reference, tear_off_reference) = this.claim_constructor(&suffix, true, id);
            this.register_constructor(Fragment::Factory(FactoryFragment {
                id,
                name: suffix,
                offsets,
                modifiers,
                metadata,
                type_parameters,
                formals,
                redirection_target,
                reference,
                tear_off_reference,
            }))?;
            Ok(Some(id))
        })
    }

    /// Add the primary constructor of an extension type, synthesizing its
    /// representation field from the single formal.
    pub fn add_primary_constructor(&mut self, declaration: PrimaryConstructorDeclaration) -> BuildResult<FragmentId> {
        self.guard("add_primary_constructor", |this| {
            let PrimaryConstructorDeclaration {
                name,
                offsets,
                modifiers,
                formals,
            } = declaration;
            let enclosing = this
                .enclosing()
                .ok_or(InternalError::NoCurrentDeclaration("primary constructor"))?;
            let suffix = name.map(|(name, _)| name).unwrap_or_default();
            let own = this.member_type_parameters(&enclosing.name)?;

            if enclosing.kind == DeclarationKind::ExtensionType {
                this.add_representation_field(&formals, offsets)?;
            }

            let (type_parameters, formals) = this.constructor_signature(&enclosing, &suffix, own, formals)?;
            let id = this.ids.next_id();
            let (reference, tear_off_reference) = this.claim_constructor(&suffix, false, id);
            this.register_constructor(Fragment::Constructor(ConstructorFragment {
                id,
                name: suffix,
                offsets,
                modifiers,
                metadata: Vec::new(),
                type_parameters,
                formals,
                is_primary: true,
                reference,
                tear_off_reference,
            }))?;
            Ok(id)
        })
    }

    fn add_representation_field(&mut self, formals: &[FormalParameterBuilder], offsets: DeclarationOffsets) -> BuildResult<()> {
        let field = match formals {
            [] => {
                self.report(Template::ExpectedRepresentationField, offsets.name, 1);
                return Ok(());
            }
            [field] => field,
            [field, second, ..] => {
                self.report(Template::MultipleRepresentationFields, second.offset, second.name.len() as u32);
                field
            }
        };

        let scheme = self.member_scheme(true);
        let id = self.ids.next_id();
        let getter = self.claim(&scheme, &scheme.procedure_name(ProcedureKind::Getter, &field.name), id);
        let fragment = Fragment::Field(FieldFragment {
            id,
            name: field.name.clone(),
            offsets: DeclarationOffsets::at(field.offset),
            modifiers: Modifiers::FINAL | Modifiers::SYNTHETIC,
            metadata: Vec::new(),
            ty: field.ty.clone(),
            is_top_level: false,
            is_late_lowered: false,
            references: FieldReferences {
                getter,
                ..FieldReferences::default()
            },
        });

        let pending = self
            .scopes
            .current_declaration_mut()
            .ok_or(InternalError::NoCurrentDeclaration("representation field"))?;
        pending.representation = Some(RepresentationField {
            name: field.name.clone(),
            ty: field.ty.clone(),
            offset: field.offset,
        });
        pending.name_space.add_member(fragment);
        tracing::debug!(name = %field.name, ?id, "representation field");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------------

    /// Add one field per declarator, top-level or in the current declaration.
    pub fn add_fields(&mut self, declaration: FieldsDeclaration) -> BuildResult<Vec<FragmentId>> {
        self.guard("add_fields", |this| {
            let enclosing = this.enclosing();
            let is_instance = enclosing.is_some() && !declaration.modifiers.is_static();
            let extension_like = enclosing.as_ref().is_some_and(|e| e.kind.is_extension_like());
            let nullable_type = declaration.ty.is_nullable() || matches!(declaration.ty, TypeBuilder::Omitted);
            let scheme = this.member_scheme(is_instance);

            let mut ids = Vec::with_capacity(declaration.declarators.len());
            for declarator in declaration.declarators {
                if is_instance && extension_like {
                    this.report(
                        Template::ExtensionDeclaresInstanceField {
                            name: declarator.name.clone(),
                        },
                        declarator.offsets.name,
                        declarator.name.len() as u32,
                    );
                    continue;
                }

                let mut modifiers = declaration.modifiers;
                if declarator.has_initializer {
                    modifiers |= Modifiers::HAS_INITIALIZER;
                }
                let late_lowered = this.ctx.config.lower_late_fields && modifiers.is_late();
                let names = scheme.field_names(
                    &declarator.name,
                    FieldShape {
                        has_setter: field_has_setter(modifiers),
                        late_lowered,
                        nullable_type,
                    },
                );

                let id = this.ids.next_id();
                let references = FieldReferences {
                    field: this.claim(&scheme, &names.field, id),
                    getter: this.claim(&scheme, &names.getter, id),
                    setter: match &names.setter {
                        Some(setter) => this.claim(&scheme, setter, id),
                        None => None,
                    },
                    is_set: match &names.is_set {
                        Some(is_set) => this.claim(&scheme, is_set, id),
                        None => None,
                    },
                };
                this.register_member(Fragment::Field(FieldFragment {
                    id,
                    name: declarator.name,
                    offsets: declarator.offsets,
                    modifiers,
                    metadata: declaration.metadata.clone(),
                    ty: declaration.ty.clone(),
                    is_top_level: enclosing.is_none(),
                    is_late_lowered: late_lowered,
                    references,
                }));
                ids.push(id);
            }
            Ok(ids)
        })
    }

    // ------------------------------------------------------------------------
    // Constructor references
    // ------------------------------------------------------------------------

    /// Record `C<T>.name` as used in redirections and enum constants. An
    /// omitted type name means the enclosing enum.
    pub fn add_constructor_reference(
        &mut self,
        type_name: Option<TypeName>,
        type_arguments: Vec<TypeBuilder>,
        suffix: Option<SmolStr>,
        offset: TextSize,
    ) -> BuildResult<ConstructorReferenceBuilder> {
        self.guard("add_constructor_reference", |this| {
            let type_name = match type_name {
                Some(type_name) => type_name,
                None => match this.scopes.current_declaration() {
                    Some(pending) if pending.kind == DeclarationKind::Enum => {
                        TypeName::new(pending.container_name.clone(), offset)
                    }
                    _ => return Err(InternalError::OmittedTypeNameOutsideEnum),
                },
            };
            let reference = ConstructorReferenceBuilder {
                type_name,
                type_arguments,
                suffix,
                offset,
            };
            this.constructor_references.push(reference.clone());
            Ok(reference)
        })
    }
}
