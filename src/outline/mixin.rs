//! Mixin application synthesis.
//!
//! `class C<T> extends S<T> with M1<T>, M2` becomes
//!
//! ```text
//! abstract class _C&S&M1<T> = S<T> with M1<T>;
//! abstract class _C&S&M1&M2<T> = _C&S&M1<T> with M2;
//! class C<T> extends _C&S&M1&M2<T> { ... }
//! ```
//!
//! Each generic step gets its own copy of the subclass's type parameters.
//! For a named application `class N = S with M1, M2;` the last step is
//! `N` itself.

use rustc_hash::FxHashSet;
use smol_str::{SmolStr, format_smolstr};
use url::Url;

use crate::base::{DeclarationOffsets, TextSize};

use super::error::BuildResult;
use super::fragments::{ClassFragment, NamedMixinApplicationFragment};
use super::ids::{FragmentId, FragmentIdAllocator, NominalVariableId, ScopeId};
use super::modifiers::Modifiers;
use super::names::{CanonicalName, DeclarationNameKind, declaration_name};
use super::namespace::DeclarationNameSpace;
use super::reference::Reference;
use super::types::{
    MetadataBuilder, TypeBuilder, TypeDeclaration, TypeName, TypeParameterKind, VariableArena,
    copy_type_parameters,
};

/// `with M1, M2, ...` as written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MixinApplicationBuilder {
    pub mixins: Vec<TypeBuilder>,
    pub offset: TextSize,
}

/// The declaration a mixin chain is built for.
#[derive(Clone, Debug)]
pub struct MixinApplicationRequest {
    pub subclass_name: SmolStr,
    pub type_parameters: Vec<NominalVariableId>,
    /// `None` means the implicit top type.
    pub supertype: Option<TypeBuilder>,
    pub mixins: MixinApplicationBuilder,
    /// Modifiers of the subclass; a few carry over to the intermediates.
    pub modifiers: Modifiers,
    pub offsets: DeclarationOffsets,
    /// The super-mixin chain of `mixin M on A, B`: intermediates implement
    /// the types instead of extending and mixing them in.
    pub is_mixin_declaration: bool,
    /// Present for `class N = S with ...;`.
    pub named: Option<NamedApplication>,
}

/// What the final step of a named application carries.
#[derive(Clone, Debug)]
pub struct NamedApplication {
    pub id: FragmentId,
    pub scope: ScopeId,
    pub metadata: Vec<MetadataBuilder>,
    pub interfaces: Vec<TypeBuilder>,
    pub reference: Option<Reference>,
}

#[derive(Clone, Debug)]
pub struct MixinChain {
    /// Anonymous intermediates, in application order.
    pub classes: Vec<ClassFragment>,
    pub named: Option<NamedMixinApplicationFragment>,
    /// Supertype for the subclass: the last anonymous class applied to the
    /// subclass's type parameters. `None` for named applications.
    pub supertype: Option<TypeBuilder>,
}

/// Claims the reference recorded for a synthesized class name.
pub trait ClassReferences {
    fn claim(&mut self, name: &CanonicalName, fragment: FragmentId) -> Option<Reference>;
}

impl<F> ClassReferences for F
where
    F: FnMut(&CanonicalName, FragmentId) -> Option<Reference>,
{
    fn claim(&mut self, name: &CanonicalName, fragment: FragmentId) -> Option<Reference> {
        self(name, fragment)
    }
}

pub struct MixinSynthesizer<'a> {
    pub arena: &'a mut VariableArena,
    pub ids: &'a mut FragmentIdAllocator,
    pub library: &'a Url,
    pub object_type: &'a str,
    pub references: &'a mut dyn ClassReferences,
}

/// Name component for a type: its name, or nothing for unnamed types
/// such as function types.
fn component(ty: &TypeBuilder) -> SmolStr {
    ty.type_name().map(|n| n.name.clone()).unwrap_or_default()
}

impl MixinSynthesizer<'_> {
    pub fn apply(&mut self, request: MixinApplicationRequest) -> BuildResult<MixinChain> {
        let MixinApplicationRequest {
            subclass_name,
            type_parameters,
            supertype,
            mixins,
            modifiers,
            offsets,
            is_mixin_declaration,
            mut named,
        } = request;

        let mut supertype = supertype.unwrap_or_else(|| {
            TypeBuilder::named(TypeName::new(self.object_type, offsets.name))
        });
        let mut running_name = component(&supertype);
        let subclass_parameters: FxHashSet<_> = type_parameters.iter().copied().collect();
        let inherited = modifiers & (Modifiers::BASE | Modifiers::FINAL);

        let mut classes = Vec::new();
        let mut named_fragment = None;
        let last = mixins.mixins.len().saturating_sub(1);

        for (index, mixin) in mixins.mixins.into_iter().enumerate() {
            let is_named_step = index == last && named.is_some();

            let is_generic = !subclass_parameters.is_empty()
                && (supertype.uses_any(&subclass_parameters, self.arena)
                    || mixin.uses_any(&subclass_parameters, self.arena));

            if is_named_step {
                if let Some(application) = named.take() {
                    tracing::trace!(name = %subclass_name, "named mixin application step");
                    named_fragment = Some(NamedMixinApplicationFragment {
                        id: application.id,
                        name: subclass_name.clone(),
                        offsets,
                        modifiers: modifiers | Modifiers::NAMED_MIXIN_APPLICATION,
                        metadata: application.metadata,
                        reference: application.reference,
                        scope: application.scope,
                        type_parameters: type_parameters.clone(),
                        supertype: supertype.clone(),
                        mixed_in_type: mixin,
                        interfaces: application.interfaces,
                    });
                }
                break;
            }

            running_name = format_smolstr!("{running_name}&{}", component(&mixin));
            let full_name = format_smolstr!("_{subclass_name}&{running_name}");

            let (step_parameters, step_supertype, step_mixin) = if is_generic {
                match copy_type_parameters(
                    self.arena,
                    &type_parameters,
                    TypeParameterKind::MixinApplicationSynthesized,
                )? {
                    Some(copy) => {
                        let s = supertype.substitute(&copy.substitution, self.arena);
                        let m = mixin.substitute(&copy.substitution, self.arena);
                        (copy.new_parameters, s, m)
                    }
                    None => (Vec::new(), supertype.clone(), mixin),
                }
            } else {
                (Vec::new(), supertype.clone(), mixin)
            };

            let id = self.ids.next_id();
            let canonical = declaration_name(DeclarationNameKind::Class, &full_name, self.library);
            let reference = self.references.claim(&canonical, id);
            tracing::debug!(name = %full_name, generic = is_generic, ?reference, "synthesized mixin application");

            let (class_supertype, mixed_in_type, interfaces) = if is_mixin_declaration {
                (None, None, vec![step_supertype, step_mixin])
            } else {
                (Some(step_supertype), Some(step_mixin), Vec::new())
            };

            classes.push(ClassFragment {
                id,
                name: full_name.clone(),
                offsets,
                modifiers: Modifiers::ABSTRACT | Modifiers::SYNTHETIC | inherited,
                metadata: Vec::new(),
                reference,
                scope: None,
                type_parameters: step_parameters,
                supertype: class_supertype,
                mixed_in_type,
                interfaces,
                name_space: DeclarationNameSpace::new(),
            });

            let arguments = if is_generic {
                type_parameters
                    .iter()
                    .map(|&id| self.arena.type_of(id, offsets.name))
                    .collect::<BuildResult<Vec<_>>>()?
            } else {
                Vec::new()
            };
            supertype = TypeBuilder::named_with(
                TypeName::new(full_name, offsets.name),
                arguments,
                Some(TypeDeclaration::Synthesized(id)),
            );
        }

        let supertype = named_fragment.is_none().then_some(supertype);
        Ok(MixinChain {
            classes,
            named: named_fragment,
            supertype,
        })
    }
}
