//! The scope stack: type scopes, parameter namespaces and pending
//! declarations in one arena.
//!
//! Every frame lives in a single `Vec`. Four top indices (type scope,
//! nominal namespace, structural namespace, declaration) each follow their
//! own parent links, so the concerns move independently while sharing one
//! place where residue can be checked.
//!
//! Popping a type-parameter scope closes it for lookup but leaves its
//! parameter namespace on the frame: the matching `add_*` call takes it
//! later through the namespace top index and finalizes it.

use std::fmt;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::{FileId, TextSize};

use super::diagnostics::{Diagnostic, DiagnosticSink, Location, Template};
use super::error::{BuildResult, InternalError};
use super::fragments::{DeclarationBuilder, DeclarationKind};
use super::ids::{NominalVariableId, ScopeId, StructuralVariableId};
use super::types::{TypeDeclaration, VariableArena};

// ============================================================================
// SCOPE KINDS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeScopeKind {
    Library,
    DeclarationTypeParameters,
    DeclarationBody(DeclarationKind),
    MemberTypeParameters,
    FunctionTypeParameters,
}

impl TypeScopeKind {
    /// Whether frames of this kind carry a nominal parameter namespace.
    fn has_nominal_parameters(self) -> bool {
        matches!(
            self,
            TypeScopeKind::DeclarationTypeParameters | TypeScopeKind::MemberTypeParameters
        )
    }
}

impl fmt::Display for TypeScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeScopeKind::Library => f.write_str("library"),
            TypeScopeKind::DeclarationTypeParameters => f.write_str("declaration type parameters"),
            TypeScopeKind::DeclarationBody(kind) => write!(f, "{kind} body"),
            TypeScopeKind::MemberTypeParameters => f.write_str("member type parameters"),
            TypeScopeKind::FunctionTypeParameters => f.write_str("function type parameters"),
        }
    }
}

// ============================================================================
// PARAMETER NAMESPACES
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
struct Declared<Id> {
    name: SmolStr,
    offset: TextSize,
    id: Id,
}

/// Type parameters of a declaration or member, collected as the parser
/// sees them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NominalParameterNameSpace {
    parameters: Vec<Declared<NominalVariableId>>,
}

impl NominalParameterNameSpace {
    pub fn push(&mut self, name: SmolStr, offset: TextSize, id: NominalVariableId) {
        self.parameters.push(Declared { name, offset, id });
    }

    pub fn ids(&self) -> Vec<NominalVariableId> {
        self.parameters.iter().map(|p| p.id).collect()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    fn lookup(&self, name: &str) -> Option<NominalVariableId> {
        self.parameters.iter().find(|p| p.name == name).map(|p| p.id)
    }

    /// Bind the parameters to `owner` and report duplicate names.
    ///
    /// Every parameter is kept in declaration order; duplicates are only
    /// reported, with a context note at the first occurrence. Recovery
    /// paths pass `allow_name_conflict` to stay quiet.
    pub fn add_type_parameters(
        self,
        arena: &mut VariableArena,
        sink: &mut dyn DiagnosticSink,
        owner: Option<&str>,
        allow_name_conflict: bool,
    ) -> Vec<NominalVariableId> {
        let file = arena.file();
        report_duplicates(&self.parameters, file, sink, allow_name_conflict);
        for parameter in &self.parameters {
            if let Some(variable) = arena.nominal_mut(parameter.id) {
                variable.owner = owner.map(SmolStr::new);
            }
        }
        self.parameters.into_iter().map(|p| p.id).collect()
    }
}

/// Type parameters of a function type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StructuralParameterNameSpace {
    parameters: Vec<Declared<StructuralVariableId>>,
}

impl StructuralParameterNameSpace {
    pub fn push(&mut self, name: SmolStr, offset: TextSize, id: StructuralVariableId) {
        self.parameters.push(Declared { name, offset, id });
    }

    fn lookup(&self, name: &str) -> Option<StructuralVariableId> {
        self.parameters.iter().find(|p| p.name == name).map(|p| p.id)
    }

    pub fn add_type_parameters(
        self,
        file: FileId,
        sink: &mut dyn DiagnosticSink,
        allow_name_conflict: bool,
    ) -> Vec<StructuralVariableId> {
        report_duplicates(&self.parameters, file, sink, allow_name_conflict);
        self.parameters.into_iter().map(|p| p.id).collect()
    }
}

fn report_duplicates<Id>(
    parameters: &[Declared<Id>],
    file: FileId,
    sink: &mut dyn DiagnosticSink,
    allow_name_conflict: bool,
) {
    if allow_name_conflict {
        return;
    }
    let mut seen: FxHashMap<&str, &Declared<Id>> = FxHashMap::default();
    for parameter in parameters {
        match seen.get(parameter.name.as_str()) {
            Some(first) => {
                let length = parameter.name.len() as u32;
                sink.report(
                    Diagnostic::error(
                        Template::DuplicatedTypeParameterName {
                            name: parameter.name.clone(),
                        },
                        Location::new(file, parameter.offset, length),
                    )
                    .with_context(
                        Template::DuplicatedTypeParameterNameContext {
                            name: parameter.name.clone(),
                        },
                        Location::new(file, first.offset, length),
                    ),
                );
            }
            None => {
                seen.insert(parameter.name.as_str(), parameter);
            }
        }
    }
}

// ============================================================================
// FRAMES
// ============================================================================

#[derive(Debug)]
enum Parameters {
    None,
    Nominal(Option<NominalParameterNameSpace>),
    Structural(Option<StructuralParameterNameSpace>),
}

#[derive(Debug)]
struct TypeFrame {
    kind: TypeScopeKind,
    parameters: Parameters,
}

#[derive(Debug)]
enum Payload {
    Type(TypeFrame),
    Declaration(Option<DeclarationBuilder>),
}

#[derive(Debug)]
struct Frame {
    payload: Payload,
    /// Enclosing frame of the same concern.
    parent: Option<ScopeId>,
    /// Previous frame holding a parameter namespace of the same flavour.
    namespace_parent: Option<ScopeId>,
}

/// A type scope as it was entered, kept after it closes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScopeRecord {
    pub id: ScopeId,
    pub kind: TypeScopeKind,
    pub parent: Option<ScopeId>,
}

#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<Frame>,
    type_top: ScopeId,
    nominal_top: Option<ScopeId>,
    structural_top: Option<ScopeId>,
    declaration_top: Option<ScopeId>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    /// Create a stack holding only the library scope.
    pub fn new() -> Self {
        let library = Frame {
            payload: Payload::Type(TypeFrame {
                kind: TypeScopeKind::Library,
                parameters: Parameters::None,
            }),
            parent: None,
            namespace_parent: None,
        };
        Self {
            frames: vec![library],
            type_top: ScopeId(0),
            nominal_top: None,
            structural_top: None,
            declaration_top: None,
        }
    }

    fn alloc(&mut self, frame: Frame) -> ScopeId {
        let id = ScopeId(self.frames.len() as u32);
        self.frames.push(frame);
        id
    }

    fn frame(&self, id: ScopeId) -> &Frame {
        &self.frames[id.index()]
    }

    fn frame_mut(&mut self, id: ScopeId) -> &mut Frame {
        &mut self.frames[id.index()]
    }

    fn type_frame(&self, id: ScopeId) -> Option<&TypeFrame> {
        match &self.frame(id).payload {
            Payload::Type(frame) => Some(frame),
            Payload::Declaration(_) => None,
        }
    }

    // ------------------------------------------------------------------------
    // Type scopes
    // ------------------------------------------------------------------------

    /// Enter a type scope. Parameter scopes also open a parameter namespace.
    pub fn push_type_scope(&mut self, kind: TypeScopeKind) -> ScopeId {
        let (parameters, namespace_parent) = if kind.has_nominal_parameters() {
            (Parameters::Nominal(Some(NominalParameterNameSpace::default())), self.nominal_top)
        } else if kind == TypeScopeKind::FunctionTypeParameters {
            (
                Parameters::Structural(Some(StructuralParameterNameSpace::default())),
                self.structural_top,
            )
        } else {
            (Parameters::None, None)
        };
        let has_nominal = matches!(parameters, Parameters::Nominal(_));
        let has_structural = matches!(parameters, Parameters::Structural(_));

        let id = self.alloc(Frame {
            payload: Payload::Type(TypeFrame {
                kind,
                parameters,
            }),
            parent: Some(self.type_top),
            namespace_parent,
        });
        self.type_top = id;
        if has_nominal {
            self.nominal_top = Some(id);
        }
        if has_structural {
            self.structural_top = Some(id);
        }
        tracing::trace!(?id, %kind, "push type scope");
        id
    }

    /// Leave the current type scope, which must be of kind `expected`.
    pub fn pop_type_scope(&mut self, expected: TypeScopeKind) -> BuildResult<ScopeId> {
        let id = self.type_top;
        let found = self.current();
        if found != expected {
            return Err(InternalError::ScopeKindMismatch { expected, found });
        }
        let parent = self.frame(id).parent.ok_or(InternalError::ScopeUnderflow)?;
        self.type_top = parent;
        tracing::trace!(?id, %expected, "pop type scope");
        Ok(id)
    }

    /// Kind of the innermost open type scope.
    pub fn current(&self) -> TypeScopeKind {
        self.type_frame(self.type_top)
            .map(|f| f.kind)
            .unwrap_or(TypeScopeKind::Library)
    }

    pub fn current_id(&self) -> ScopeId {
        self.type_top
    }

    /// The innermost scope, or `None` at library level.
    pub fn current_or_none(&self) -> Option<TypeScopeKind> {
        match self.current() {
            TypeScopeKind::Library => None,
            kind => Some(kind),
        }
    }

    /// Bind `name` to the innermost type variable of that name that is
    /// still in scope.
    pub fn lookup_type_variable(&self, name: &str) -> Option<TypeDeclaration> {
        let mut cursor = Some(self.type_top);
        while let Some(id) = cursor {
            let frame = self.frame(id);
            if let Payload::Type(type_frame) = &frame.payload {
                match &type_frame.parameters {
                    Parameters::Nominal(Some(ns)) => {
                        if let Some(variable) = ns.lookup(name) {
                            return Some(TypeDeclaration::Nominal(variable));
                        }
                    }
                    Parameters::Structural(Some(ns)) => {
                        if let Some(variable) = ns.lookup(name) {
                            return Some(TypeDeclaration::Structural(variable));
                        }
                    }
                    _ => {}
                }
            }
            cursor = frame.parent;
        }
        None
    }

    // ------------------------------------------------------------------------
    // Parameter namespaces
    // ------------------------------------------------------------------------

    /// The innermost nominal namespace still awaiting finalization.
    pub fn current_nominal_namespace(&mut self) -> BuildResult<&mut NominalParameterNameSpace> {
        let id = self.nominal_top.ok_or(InternalError::MissingParameterNameSpace("nominal"))?;
        match &mut self.frames[id.index()].payload {
            Payload::Type(TypeFrame {
                parameters: Parameters::Nominal(Some(ns)),
                ..
            }) => Ok(ns),
            _ => Err(InternalError::MissingParameterNameSpace("nominal")),
        }
    }

    pub fn current_structural_namespace(&mut self) -> BuildResult<&mut StructuralParameterNameSpace> {
        let id = self
            .structural_top
            .ok_or(InternalError::MissingParameterNameSpace("structural"))?;
        match &mut self.frames[id.index()].payload {
            Payload::Type(TypeFrame {
                parameters: Parameters::Structural(Some(ns)),
                ..
            }) => Ok(ns),
            _ => Err(InternalError::MissingParameterNameSpace("structural")),
        }
    }

    pub fn pop_nominal_namespace(&mut self) -> BuildResult<NominalParameterNameSpace> {
        let id = self.nominal_top.ok_or(InternalError::MissingParameterNameSpace("nominal"))?;
        let frame = self.frame_mut(id);
        let namespace_parent = frame.namespace_parent;
        let ns = match &mut frame.payload {
            Payload::Type(TypeFrame {
                parameters: Parameters::Nominal(slot),
                ..
            }) => slot.take(),
            _ => None,
        }
        .ok_or(InternalError::MissingParameterNameSpace("nominal"))?;
        self.nominal_top = namespace_parent;
        Ok(ns)
    }

    pub fn pop_structural_namespace(&mut self) -> BuildResult<StructuralParameterNameSpace> {
        let id = self
            .structural_top
            .ok_or(InternalError::MissingParameterNameSpace("structural"))?;
        let frame = self.frame_mut(id);
        let namespace_parent = frame.namespace_parent;
        let ns = match &mut frame.payload {
            Payload::Type(TypeFrame {
                parameters: Parameters::Structural(slot),
                ..
            }) => slot.take(),
            _ => None,
        }
        .ok_or(InternalError::MissingParameterNameSpace("structural"))?;
        self.structural_top = namespace_parent;
        Ok(ns)
    }

    // ------------------------------------------------------------------------
    // Pending declarations
    // ------------------------------------------------------------------------

    pub fn push_declaration(&mut self, declaration: DeclarationBuilder) -> ScopeId {
        let id = self.alloc(Frame {
            payload: Payload::Declaration(Some(declaration)),
            parent: self.declaration_top,
            namespace_parent: None,
        });
        self.declaration_top = Some(id);
        id
    }

    pub fn current_declaration(&self) -> Option<&DeclarationBuilder> {
        let id = self.declaration_top?;
        match &self.frame(id).payload {
            Payload::Declaration(declaration) => declaration.as_ref(),
            Payload::Type(_) => None,
        }
    }

    pub fn current_declaration_mut(&mut self) -> Option<&mut DeclarationBuilder> {
        let id = self.declaration_top?;
        match &mut self.frames[id.index()].payload {
            Payload::Declaration(declaration) => declaration.as_mut(),
            Payload::Type(_) => None,
        }
    }

    /// Take the current pending declaration, which must be of `expected` kind.
    pub fn pop_declaration(&mut self, expected: DeclarationKind) -> BuildResult<DeclarationBuilder> {
        let id = self
            .declaration_top
            .ok_or(InternalError::NoCurrentDeclaration("pop"))?;
        if let Payload::Declaration(Some(pending)) = &self.frame(id).payload {
            if pending.kind != expected {
                return Err(InternalError::DeclarationKindMismatch {
                    expected,
                    found: pending.kind,
                });
            }
        }
        let frame = self.frame_mut(id);
        let parent = frame.parent;
        let declaration = match &mut frame.payload {
            Payload::Declaration(slot) => slot.take(),
            Payload::Type(_) => None,
        }
        .ok_or(InternalError::NoCurrentDeclaration("pop"))?;
        self.declaration_top = parent;
        Ok(declaration)
    }

    // ------------------------------------------------------------------------
    // Consistency
    // ------------------------------------------------------------------------

    fn depth(&self, top: Option<ScopeId>, namespace: bool) -> usize {
        let mut depth = 0;
        let mut cursor = top;
        while let Some(id) = cursor {
            depth += 1;
            let frame = self.frame(id);
            cursor = if namespace { frame.namespace_parent } else { frame.parent };
        }
        depth
    }

    /// Verify that every concern is back at its initial state.
    pub fn check_stacks(&self) -> BuildResult<()> {
        if self.current() != TypeScopeKind::Library {
            return Err(InternalError::StackResidue {
                stack: "type scope",
                depth: self.depth(Some(self.type_top), false) - 1,
            });
        }
        if self.declaration_top.is_some() {
            return Err(InternalError::StackResidue {
                stack: "declaration",
                depth: self.depth(self.declaration_top, false),
            });
        }
        if self.nominal_top.is_some() {
            return Err(InternalError::StackResidue {
                stack: "nominal parameter namespace",
                depth: self.depth(self.nominal_top, true),
            });
        }
        if self.structural_top.is_some() {
            return Err(InternalError::StackResidue {
                stack: "structural parameter namespace",
                depth: self.depth(self.structural_top, true),
            });
        }
        Ok(())
    }

    /// Every type scope entered so far, in entry order.
    pub fn records(&self) -> Vec<ScopeRecord> {
        self.frames
            .iter()
            .enumerate()
            .filter_map(|(index, frame)| match &frame.payload {
                Payload::Type(type_frame) => Some(ScopeRecord {
                    id: ScopeId(index as u32),
                    kind: type_frame.kind,
                    parent: frame.parent,
                }),
                Payload::Declaration(_) => None,
            })
            .collect()
    }
}
