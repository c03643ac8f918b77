//! Builder factory event sequences: declarations, members, type
//! parameters and stack discipline.

use outline::base::{DeclarationOffsets, TextSize};
use outline::outline::{
    BuilderFactory, CanonicalName, ClassDeclaration, CompilationContext, ConstructorDeclaration,
    ConstructorIdentifier, DeclarationKind, EnumConstant, EnumDeclaration, ExtensionDeclaration,
    ExtensionTypeDeclaration, FactoryDeclaration, FieldDeclarator, FieldsDeclaration, FormalParameterBuilder,
    Fragment, HasTypeParameters, InternalError, MethodDeclaration, Modifiers, NameKind, Nullability, OutlineConfig,
    PrimaryConstructorDeclaration, ProcedureKind, ReferenceIndex, TypeBuilder, TypeDeclaration, TypeName,
    TypeParameterKind, TypeScopeKind, TypedefDeclaration, UnitDescriptor, UnitOutline, codes,
};
use rstest::rstest;
use url::Url;

fn unit(uri: &str) -> UnitDescriptor {
    UnitDescriptor::library(Url::parse(uri).unwrap())
}

fn offsets(start: u32, name: u32) -> DeclarationOffsets {
    DeclarationOffsets::new(start, name, name)
}

fn int_type() -> TypeBuilder {
    TypeBuilder::named(TypeName::new("int", 0u32))
}

/// `class <name> {}` with the given type parameter names.
fn declare_class(factory: &mut BuilderFactory<'_>, name: &str, parameters: &[&str]) {
    factory.begin_declaration_header().unwrap();
    for (i, p) in parameters.iter().enumerate() {
        factory.add_nominal_parameter(*p, TextSize::from(8 + 3 * i as u32)).unwrap();
    }
    factory.begin_class_declaration(name, offsets(0, 6)).unwrap();
    factory.end_class_declaration().unwrap();
    factory.add_class(ClassDeclaration::default()).unwrap();
}

fn method(name: &str, modifiers: Modifiers) -> MethodDeclaration {
    MethodDeclaration {
        name: name.into(),
        kind: ProcedureKind::Method,
        offsets: offsets(20, 25),
        modifiers,
        metadata: Vec::new(),
        return_type: TypeBuilder::Void(TextSize::from(20)),
        formals: Vec::new(),
    }
}

fn class<'a>(outline: &'a UnitOutline, name: &str) -> &'a outline::outline::ClassFragment {
    outline.library.lookup_first(name).and_then(Fragment::as_class).unwrap()
}

// ============================================================================
// DECLARATIONS
// ============================================================================

#[test]
fn test_class_with_type_parameters() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    declare_class(&mut factory, "Box", &["T", "U"]);
    let outline = factory.finish().unwrap();

    let fragment = class(&outline, "Box");
    assert_eq!(fragment.type_parameters.len(), 2);
    let t = outline.variables.nominal(fragment.type_parameters[0]).unwrap();
    assert_eq!(t.name, "T");
    assert_eq!(t.owner.as_deref(), Some("Box"));
    assert_eq!(t.kind, TypeParameterKind::Declaration);
    assert!(outline.diagnostics.is_empty());
    assert_eq!(outline.unbound.nominal.len(), 2);

    let generic = outline.library.lookup_first("Box").and_then(Fragment::as_has_type_parameters).unwrap();
    assert_eq!(generic.type_parameters(), fragment.type_parameters.as_slice());
}

#[test]
fn test_unbound_variables_reach_the_library() {
    let mut ctx = CompilationContext::default();
    let library = Url::parse("package:app/a.dart").unwrap();
    let mut factory = BuilderFactory::new(&mut ctx, unit(library.as_str()));
    declare_class(&mut factory, "A", &["T"]);
    declare_class(&mut factory, "B", &["S"]);
    factory.finish().unwrap();

    assert_eq!(ctx.unbound_variables(&library).unwrap().nominal.len(), 2);
}

#[test]
fn test_duplicated_type_parameter_reports_context() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    declare_class(&mut factory, "C", &["T", "T"]);
    let outline = factory.finish().unwrap();

    let duplicates: Vec<_> = outline
        .diagnostics
        .iter()
        .filter(|d| d.code() == codes::DUPLICATED_TYPE_PARAMETER_NAME)
        .collect();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].location.offset, TextSize::from(11));
    assert_eq!(duplicates[0].context.len(), 1);
    assert_eq!(duplicates[0].context[0].location.offset, TextSize::from(8));
    // Both parameters survive.
    assert_eq!(class(&outline, "C").type_parameters.len(), 2);
}

#[test]
fn test_mixin_declaration_with_single_on_type() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_declaration_header().unwrap();
    factory.begin_mixin_declaration("M", offsets(0, 6)).unwrap();
    factory.end_mixin_declaration().unwrap();
    factory
        .add_mixin_declaration(outline::outline::MixinDeclaration {
            on_types: vec![TypeBuilder::named(TypeName::new("A", 11u32))],
            ..Default::default()
        })
        .unwrap();
    let outline = factory.finish().unwrap();

    let Some(Fragment::Mixin(mixin)) = outline.library.lookup_first("M") else {
        panic!("mixin not registered");
    };
    assert_eq!(mixin.supertype.as_ref().and_then(|t| t.type_name()).unwrap().name, "A");
    assert!(outline.mixin_applications.is_empty());
}

#[test]
fn test_enum_synthesizes_constants_and_values() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_declaration_header().unwrap();
    factory.begin_enum_declaration("Color", offsets(0, 5)).unwrap();
    factory.end_enum_declaration().unwrap();
    let constant = |name: &str, offset: u32| EnumConstant {
        name: name.into(),
        offset: TextSize::from(offset),
        metadata: Vec::new(),
    };
    factory
        .add_enum(EnumDeclaration {
            constants: vec![constant("red", 13), constant("green", 18)],
            ..Default::default()
        })
        .unwrap();
    let outline = factory.finish().unwrap();

    let Some(Fragment::Enum(fragment)) = outline.library.lookup_first("Color") else {
        panic!("enum not registered");
    };
    assert_eq!(fragment.supertype.type_name().unwrap().name, "_Enum");
    let members = fragment.name_space.members();
    for name in ["red", "green", "values"] {
        let field = members.lookup_first(name).and_then(Fragment::as_field).unwrap();
        assert!(field.modifiers.is_static());
        assert!(field.modifiers.is_const());
        assert!(!field.has_setter());
    }
    let values = members.lookup_first("values").and_then(Fragment::as_field).unwrap();
    assert!(values.modifiers.contains(Modifiers::SYNTHETIC));
    assert_eq!(values.ty.type_name().unwrap().name, "List");
}

#[test]
fn test_unnamed_extensions_are_numbered() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    for _ in 0..2 {
        factory.begin_declaration_header().unwrap();
        factory
            .begin_extension_declaration(None, offsets(0, 10), int_type())
            .unwrap();
        factory.end_extension_declaration().unwrap();
        factory.add_extension_declaration(ExtensionDeclaration::default()).unwrap();
    }
    let outline = factory.finish().unwrap();

    let names: Vec<_> = outline
        .library
        .iter()
        .filter_map(|f| match f {
            Fragment::Extension(e) => Some(e.container_name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["_extension#0", "_extension#1"]);
    // Unnamed extensions are not reachable by name.
    assert!(outline.library.lookup_first("_extension#0").is_none());
}

#[test]
fn test_typedef_owns_its_parameters() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_typedef().unwrap();
    let t = factory.add_nominal_parameter("T", TextSize::from(10)).unwrap();
    let aliased = factory
        .add_named_type(TypeName::new("T", 15u32), Vec::new(), Nullability::Omitted)
        .unwrap();
    assert_eq!(aliased.declaration(), Some(TypeDeclaration::Nominal(t)));
    factory.end_typedef().unwrap();
    factory
        .add_function_type_alias(TypedefDeclaration {
            name: "Alias".into(),
            offsets: offsets(0, 8),
            metadata: Vec::new(),
            aliased_type: aliased,
        })
        .unwrap();
    let outline = factory.finish().unwrap();

    let Some(Fragment::Typedef(typedef)) = outline.library.lookup_first("Alias") else {
        panic!("typedef not registered");
    };
    assert_eq!(typedef.type_parameters, vec![t]);
}

// ============================================================================
// TYPES
// ============================================================================

#[test]
fn test_function_type_binds_structural_parameters() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_function_type().unwrap();
    let x = factory.add_structural_parameter("X", TextSize::from(14)).unwrap();
    let ret = factory
        .add_named_type(TypeName::new("X", 4u32), Vec::new(), Nullability::Omitted)
        .unwrap();
    assert_eq!(ret.declaration(), Some(TypeDeclaration::Structural(x)));
    let function = factory
        .end_function_type(ret, Vec::new(), Nullability::Nullable, TextSize::from(4))
        .unwrap();
    assert!(function.is_nullable());

    // Out of scope again.
    let later = factory
        .add_named_type(TypeName::new("X", 30u32), Vec::new(), Nullability::Omitted)
        .unwrap();
    assert_eq!(later.declaration(), None);
    let outline = factory.finish().unwrap();
    assert_eq!(outline.unresolved_types.len(), 1);
    assert_eq!(outline.unbound.structural, vec![x]);
}

#[test]
fn test_prefixed_names_are_never_type_variables() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_declaration_header().unwrap();
    factory.add_nominal_parameter("T", TextSize::from(8)).unwrap();
    let ty = factory
        .add_named_type(TypeName::prefixed("p", "T", 20u32), Vec::new(), Nullability::Omitted)
        .unwrap();
    assert_eq!(ty.declaration(), None);
    factory.begin_class_declaration("C", offsets(0, 6)).unwrap();
    factory.end_class_declaration().unwrap();
    factory.add_class(ClassDeclaration::default()).unwrap();
    factory.finish().unwrap();
}

// ============================================================================
// MEMBERS
// ============================================================================

#[test]
fn test_extension_instance_method_gets_receiver_and_copies() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_declaration_header().unwrap();
    let t = factory.add_nominal_parameter("T", TextSize::from(12)).unwrap();
    let element = factory
        .add_named_type(TypeName::new("T", 23u32), Vec::new(), Nullability::Omitted)
        .unwrap();
    let on_type = factory
        .add_named_type(TypeName::new("List", 18u32), vec![element], Nullability::Omitted)
        .unwrap();
    factory
        .begin_extension_declaration(Some("E".into()), offsets(0, 10), on_type)
        .unwrap();

    factory.begin_method().unwrap();
    factory.add_nominal_parameter("S", TextSize::from(40)).unwrap();
    factory.end_method().unwrap();
    let id = factory.add_method(method("m", Modifiers::empty())).unwrap();

    factory.end_extension_declaration().unwrap();
    factory.add_extension_declaration(ExtensionDeclaration::default()).unwrap();
    let outline = factory.finish().unwrap();

    let Some(Fragment::Extension(extension)) = outline.library.lookup_first("E") else {
        panic!("extension not registered");
    };
    let m = extension.name_space.members().get(id).and_then(Fragment::as_method).unwrap();
    assert_eq!(m.type_parameters.len(), 2);
    let copy = outline.variables.nominal(m.type_parameters[0]).unwrap();
    assert_eq!(copy.name, "T");
    assert_eq!(copy.kind, TypeParameterKind::ExtensionSynthesized);
    assert_ne!(m.type_parameters[0], t);

    let receiver = &m.formals[0];
    assert_eq!(receiver.name, "#this");
    assert!(receiver.is_extension_this);
    assert!(receiver.modifiers.is_final());
    // List<T> rewritten to the copy.
    let TypeBuilder::Named(list) = &receiver.ty else {
        panic!("receiver should be a named type");
    };
    assert_eq!(
        list.arguments[0].declaration(),
        Some(TypeDeclaration::Nominal(m.type_parameters[0]))
    );
}

#[test]
fn test_static_extension_method_has_no_receiver() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_declaration_header().unwrap();
    factory
        .begin_extension_declaration(Some("E".into()), offsets(0, 10), int_type())
        .unwrap();
    factory.begin_method().unwrap();
    factory.end_method().unwrap();
    let id = factory.add_method(method("s", Modifiers::STATIC)).unwrap();
    factory.end_extension_declaration().unwrap();
    factory.add_extension_declaration(ExtensionDeclaration::default()).unwrap();
    let outline = factory.finish().unwrap();

    let extension = outline.library.lookup_first("E").unwrap();
    let s = extension.name_space().unwrap().members().get(id).and_then(Fragment::as_method).unwrap();
    assert!(s.formals.is_empty());
    assert!(s.type_parameters.is_empty());
}

#[test]
fn test_top_level_function() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_method().unwrap();
    factory.end_method().unwrap();
    factory.add_method(method("main", Modifiers::empty())).unwrap();
    let outline = factory.finish().unwrap();

    let main = outline.library.lookup_first("main").and_then(Fragment::as_method).unwrap();
    assert!(main.is_top_level);
}

fn constructor(prefix: &str, suffix: Option<&str>, modifiers: Modifiers) -> ConstructorDeclaration {
    let name = match suffix {
        Some(suffix) => ConstructorIdentifier::named(prefix, TextSize::from(20), suffix, TextSize::from(22)),
        None => ConstructorIdentifier::unnamed(prefix, TextSize::from(20)),
    };
    ConstructorDeclaration {
        name,
        offsets: offsets(20, 20),
        modifiers,
        metadata: Vec::new(),
        formals: Vec::new(),
    }
}

#[rstest]
#[case::unnamed("C", None, "", 0)]
#[case::named("C", Some("named"), "named", 0)]
#[case::new_keyword("new", None, "", 0)]
#[case::new_named("new", Some("named"), "named", 0)]
#[case::dot_new("C", Some("new"), "", 0)]
#[case::wrong_prefix("D", Some("named"), "named", 1)]
fn test_constructor_names(
    #[case] prefix: &str,
    #[case] suffix: Option<&str>,
    #[case] expected: &str,
    #[case] errors: usize,
) {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_declaration_header().unwrap();
    factory.begin_class_declaration("C", offsets(0, 6)).unwrap();
    factory.begin_constructor().unwrap();
    factory.end_constructor().unwrap();
    factory
        .add_constructor(constructor(prefix, suffix, Modifiers::empty()))
        .unwrap();
    factory.end_class_declaration().unwrap();
    factory.add_class(ClassDeclaration::default()).unwrap();
    let outline = factory.finish().unwrap();

    let constructors = class(&outline, "C").name_space.constructors();
    assert!(constructors.lookup_first(expected).is_some());
    let wrong: Vec<_> = outline
        .diagnostics
        .iter()
        .filter(|d| d.code() == codes::CONSTRUCTOR_WITH_WRONG_NAME)
        .collect();
    assert_eq!(wrong.len(), errors);
    if let Some(diagnostic) = wrong.first() {
        assert_eq!(diagnostic.context[0].location.offset, TextSize::from(6));
    }
}

#[rstest]
#[case::unnamed(None)]
#[case::dot_new(Some("new"))]
fn test_constructor_with_wrong_name_is_not_registered(#[case] suffix: Option<&str>) {
    let library = Url::parse("package:app/a.dart").unwrap();
    let mut index = ReferenceIndex::new();
    let unnamed = index.insert(&library, Some("A"), CanonicalName::new(NameKind::Constructors, "", &library));
    let tear_off = index.insert(
        &library,
        Some("A"),
        CanonicalName::new(NameKind::Methods, "_#new#tearOff", &library),
    );
    let mut ctx = CompilationContext::default().with_index(index);
    let mut factory = BuilderFactory::new(&mut ctx, unit(library.as_str()));
    // class A { B(); }
    factory.begin_declaration_header().unwrap();
    factory.begin_class_declaration("A", offsets(0, 6)).unwrap();
    factory.begin_constructor().unwrap();
    factory.end_constructor().unwrap();
    let added = factory
        .add_constructor(constructor("B", suffix, Modifiers::CONST))
        .unwrap();
    factory.end_class_declaration().unwrap();
    factory.add_class(ClassDeclaration::default()).unwrap();
    let outline = factory.finish().unwrap();

    assert_eq!(added, None);
    let a = class(&outline, "A");
    assert!(a.name_space.constructors().is_empty());
    assert!(!a.modifiers.contains(Modifiers::DECLARES_CONST_CONSTRUCTOR));
    assert_eq!(
        outline
            .diagnostics
            .iter()
            .filter(|d| d.code() == codes::CONSTRUCTOR_WITH_WRONG_NAME)
            .count(),
        1
    );
    assert_eq!(ctx.registry().holder(unnamed), None);
    assert_eq!(ctx.registry().holder(tear_off), None);
}

#[test]
fn test_factory_with_wrong_name_is_not_registered() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_declaration_header().unwrap();
    factory.begin_class_declaration("A", offsets(0, 6)).unwrap();
    factory.begin_factory_method().unwrap();
    factory.end_factory_method().unwrap();
    let added = factory
        .add_factory_method(FactoryDeclaration {
            name: ConstructorIdentifier::unnamed("B", TextSize::from(28)),
            offsets: offsets(20, 28),
            modifiers: Modifiers::empty(),
            metadata: Vec::new(),
            formals: Vec::new(),
            redirection_target: None,
        })
        .unwrap();
    factory.end_class_declaration().unwrap();
    factory.add_class(ClassDeclaration::default()).unwrap();
    let outline = factory.finish().unwrap();

    assert_eq!(added, None);
    assert!(class(&outline, "A").name_space.constructors().is_empty());
}

#[test]
fn test_const_constructor_marks_class() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_declaration_header().unwrap();
    factory.begin_class_declaration("C", offsets(0, 6)).unwrap();
    factory.begin_constructor().unwrap();
    factory.end_constructor().unwrap();
    factory.add_constructor(constructor("C", None, Modifiers::CONST)).unwrap();
    factory.end_class_declaration().unwrap();
    factory.add_class(ClassDeclaration::default()).unwrap();
    let outline = factory.finish().unwrap();

    assert!(class(&outline, "C").modifiers.contains(Modifiers::DECLARES_CONST_CONSTRUCTOR));
}

#[test]
fn test_extension_constructor_is_reported_and_dropped() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_declaration_header().unwrap();
    factory
        .begin_extension_declaration(Some("E".into()), offsets(0, 10), int_type())
        .unwrap();
    factory.begin_constructor().unwrap();
    factory.end_constructor().unwrap();
    let added = factory.add_constructor(constructor("E", None, Modifiers::empty())).unwrap();
    assert_eq!(added, None);
    factory.end_extension_declaration().unwrap();
    factory.add_extension_declaration(ExtensionDeclaration::default()).unwrap();
    let outline = factory.finish().unwrap();

    assert!(
        outline
            .diagnostics
            .iter()
            .any(|d| d.code() == codes::EXTENSION_DECLARES_CONSTRUCTOR)
    );
    let extension = outline.library.lookup_first("E").unwrap();
    assert!(extension.name_space().unwrap().constructors().is_empty());
}

fn fields(names: &[&str], modifiers: Modifiers, ty: TypeBuilder) -> FieldsDeclaration {
    FieldsDeclaration {
        metadata: Vec::new(),
        modifiers,
        ty,
        declarators: names
            .iter()
            .map(|name| FieldDeclarator {
                name: (*name).into(),
                offsets: offsets(30, 34),
                has_initializer: false,
            })
            .collect(),
    }
}

#[test]
fn test_extension_instance_field_is_reported() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_declaration_header().unwrap();
    factory
        .begin_extension_declaration(Some("E".into()), offsets(0, 10), int_type())
        .unwrap();
    let instance = factory.add_fields(fields(&["x"], Modifiers::empty(), int_type())).unwrap();
    let statics = factory.add_fields(fields(&["y"], Modifiers::STATIC, int_type())).unwrap();
    factory.end_extension_declaration().unwrap();
    factory.add_extension_declaration(ExtensionDeclaration::default()).unwrap();
    let outline = factory.finish().unwrap();

    assert!(instance.is_empty());
    assert_eq!(statics.len(), 1);
    assert_eq!(
        outline
            .diagnostics
            .iter()
            .filter(|d| d.code() == codes::EXTENSION_DECLARES_INSTANCE_FIELD)
            .count(),
        1
    );
}

#[rstest]
#[case::lowered(true, true)]
#[case::kept(false, false)]
fn test_late_field_lowering_follows_config(#[case] lower: bool, #[case] expected: bool) {
    let mut ctx = CompilationContext::new(OutlineConfig::new().with_late_lowering(lower));
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_declaration_header().unwrap();
    factory.begin_class_declaration("C", offsets(0, 6)).unwrap();
    factory
        .add_fields(fields(&["x"], Modifiers::LATE, int_type()))
        .unwrap();
    factory.end_class_declaration().unwrap();
    factory.add_class(ClassDeclaration::default()).unwrap();
    let outline = factory.finish().unwrap();

    let field = class(&outline, "C")
        .name_space
        .lookup_member("x")
        .and_then(Fragment::as_field)
        .unwrap();
    assert_eq!(field.is_late_lowered, expected);
    assert!(field.has_setter());
}

#[test]
fn test_multi_declarator_fields_share_type() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    let ids = factory
        .add_fields(fields(&["a", "b"], Modifiers::FINAL, int_type()))
        .unwrap();
    let outline = factory.finish().unwrap();

    assert_eq!(ids.len(), 2);
    for name in ["a", "b"] {
        let field = outline.library.lookup_first(name).and_then(Fragment::as_field).unwrap();
        assert!(field.is_top_level);
        assert!(!field.has_setter());
        assert_eq!(field.ty.type_name().unwrap().name, "int");
    }
}

// ============================================================================
// EXTENSION TYPES
// ============================================================================

fn extension_type_with(formals: Vec<FormalParameterBuilder>) -> UnitOutline {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_declaration_header().unwrap();
    factory.add_nominal_parameter("T", TextSize::from(17)).unwrap();
    factory.begin_extension_type_declaration("Id", offsets(0, 15)).unwrap();
    factory.begin_primary_constructor().unwrap();
    factory.end_primary_constructor().unwrap();
    factory
        .add_primary_constructor(PrimaryConstructorDeclaration {
            offsets: offsets(15, 15),
            formals,
            ..Default::default()
        })
        .unwrap();
    factory.end_extension_type_declaration().unwrap();
    factory
        .add_extension_type_declaration(ExtensionTypeDeclaration::default())
        .unwrap();
    factory.finish().unwrap()
}

#[test]
fn test_primary_constructor_synthesizes_representation() {
    let outline = extension_type_with(vec![FormalParameterBuilder::required("it", int_type(), 24u32)]);
    let Some(Fragment::ExtensionType(fragment)) = outline.library.lookup_first("Id") else {
        panic!("extension type not registered");
    };
    let representation = fragment.representation.as_ref().unwrap();
    assert_eq!(representation.name, "it");
    let field = fragment.name_space.lookup_member("it").and_then(Fragment::as_field).unwrap();
    assert!(field.modifiers.contains(Modifiers::FINAL | Modifiers::SYNTHETIC));

    let primary = fragment.name_space.lookup_constructor("").unwrap();
    let Fragment::Constructor(primary) = primary else {
        panic!("primary constructor should be a constructor");
    };
    assert!(primary.is_primary);
    // Copy of T.
    assert_eq!(primary.type_parameters.len(), 1);
    assert!(outline.diagnostics.is_empty());
}

#[rstest]
#[case::none(0, codes::EXPECTED_REPRESENTATION_FIELD)]
#[case::two(2, codes::MULTIPLE_REPRESENTATION_FIELDS)]
fn test_representation_field_count(#[case] count: u32, #[case] code: &str) {
    let formals = (0..count)
        .map(|i| FormalParameterBuilder::required(format!("f{i}"), int_type(), 24 + 8 * i))
        .collect();
    let outline = extension_type_with(formals);
    assert_eq!(outline.diagnostics.len(), 1);
    assert_eq!(outline.diagnostics[0].code(), code);
}

// ============================================================================
// CONSTRUCTOR REFERENCES
// ============================================================================

#[test]
fn test_omitted_constructor_reference_type_in_enum() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_declaration_header().unwrap();
    factory.begin_enum_declaration("E", offsets(0, 5)).unwrap();
    let reference = factory
        .add_constructor_reference(None, Vec::new(), Some("named".into()), TextSize::from(9))
        .unwrap();
    assert_eq!(reference.type_name.name, "E");
    factory.end_enum_declaration().unwrap();
    factory.add_enum(EnumDeclaration::default()).unwrap();
    let outline = factory.finish().unwrap();
    assert_eq!(outline.constructor_references.len(), 1);
}

#[test]
fn test_omitted_constructor_reference_type_outside_enum_poisons() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    let error = factory
        .add_constructor_reference(None, Vec::new(), None, TextSize::from(9))
        .unwrap_err();
    assert_eq!(error, InternalError::OmittedTypeNameOutsideEnum);
    assert!(factory.is_poisoned());
}

// ============================================================================
// STACK DISCIPLINE
// ============================================================================

#[test]
fn test_mismatched_end_poisons_factory() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_method().unwrap();
    let error = factory.end_class_declaration().unwrap_err();
    assert!(matches!(
        error,
        InternalError::ScopeKindMismatch {
            found: TypeScopeKind::MemberTypeParameters,
            ..
        }
    ));
    // Every later call reports the same fault.
    assert_eq!(factory.end_method().unwrap_err(), error);
    assert_eq!(factory.finish().unwrap_err(), error);
}

#[test]
fn test_unclosed_header_is_residue() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_declaration_header().unwrap();
    let error = factory.finish().unwrap_err();
    assert!(matches!(error, InternalError::StackResidue { stack: "type scope", .. }));
}

#[test]
fn test_wrong_declaration_kind_is_fault() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_declaration_header().unwrap();
    factory.begin_mixin_declaration("M", offsets(0, 6)).unwrap();
    factory.end_mixin_declaration().unwrap();
    let error = factory.add_class(ClassDeclaration::default()).unwrap_err();
    assert_eq!(
        error,
        InternalError::DeclarationKindMismatch {
            expected: DeclarationKind::Class,
            found: DeclarationKind::Mixin,
        }
    );
}

#[test]
fn test_parser_recovery_discards_declaration() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    factory.begin_declaration_header().unwrap();
    factory.add_nominal_parameter("T", TextSize::from(8)).unwrap();
    factory.add_nominal_parameter("T", TextSize::from(11)).unwrap();
    factory.begin_class_declaration("Broken", offsets(0, 6)).unwrap();
    factory.begin_method().unwrap();
    factory.end_method_for_parser_recovery().unwrap();
    factory.end_class_declaration_for_parser_recovery().unwrap();
    let outline = factory.finish().unwrap();

    assert!(outline.library.is_empty());
    // Name conflicts are tolerated on recovery.
    assert!(outline.diagnostics.is_empty());
}

/// Opens a header scope with a duplicated `T`.
fn header_with_duplicates(factory: &mut BuilderFactory<'_>) {
    factory.begin_declaration_header().unwrap();
    duplicate_parameters(factory);
}

fn duplicate_parameters(factory: &mut BuilderFactory<'_>) {
    factory.add_nominal_parameter("T", TextSize::from(8)).unwrap();
    factory.add_nominal_parameter("T", TextSize::from(11)).unwrap();
}

fn recover_class(factory: &mut BuilderFactory<'_>) {
    header_with_duplicates(factory);
    factory.begin_class_declaration("C", offsets(0, 6)).unwrap();
    factory.end_class_declaration_for_parser_recovery().unwrap();
}

fn recover_mixin(factory: &mut BuilderFactory<'_>) {
    header_with_duplicates(factory);
    factory.begin_mixin_declaration("M", offsets(0, 6)).unwrap();
    factory.end_mixin_declaration_for_parser_recovery().unwrap();
}

fn recover_named_mixin_application(factory: &mut BuilderFactory<'_>) {
    header_with_duplicates(factory);
    factory.begin_named_mixin_application().unwrap();
    factory.end_named_mixin_application_for_parser_recovery().unwrap();
}

fn recover_enum(factory: &mut BuilderFactory<'_>) {
    header_with_duplicates(factory);
    factory.begin_enum_declaration("E", offsets(0, 5)).unwrap();
    factory.end_enum_declaration_for_parser_recovery().unwrap();
}

fn recover_extension(factory: &mut BuilderFactory<'_>) {
    header_with_duplicates(factory);
    factory
        .begin_extension_declaration(Some("X".into()), offsets(0, 10), int_type())
        .unwrap();
    factory.end_extension_declaration_for_parser_recovery().unwrap();
}

fn recover_extension_type(factory: &mut BuilderFactory<'_>) {
    header_with_duplicates(factory);
    factory.begin_extension_type_declaration("V", offsets(0, 15)).unwrap();
    factory.end_extension_type_declaration_for_parser_recovery().unwrap();
}

fn recover_typedef(factory: &mut BuilderFactory<'_>) {
    factory.begin_typedef().unwrap();
    duplicate_parameters(factory);
    factory.end_typedef_for_parser_recovery().unwrap();
}

fn recover_function_type(factory: &mut BuilderFactory<'_>) {
    factory.begin_function_type().unwrap();
    factory.add_structural_parameter("X", TextSize::from(5)).unwrap();
    factory.add_structural_parameter("X", TextSize::from(8)).unwrap();
    factory.end_function_type_for_parser_recovery().unwrap();
}

fn recover_method(factory: &mut BuilderFactory<'_>) {
    factory.begin_method().unwrap();
    duplicate_parameters(factory);
    factory.end_method_for_parser_recovery().unwrap();
}

fn recover_constructor(factory: &mut BuilderFactory<'_>) {
    factory.begin_constructor().unwrap();
    duplicate_parameters(factory);
    factory.end_constructor_for_parser_recovery().unwrap();
}

fn recover_factory_method(factory: &mut BuilderFactory<'_>) {
    factory.begin_factory_method().unwrap();
    duplicate_parameters(factory);
    factory.end_factory_method_for_parser_recovery().unwrap();
}

fn recover_primary_constructor(factory: &mut BuilderFactory<'_>) {
    factory.begin_primary_constructor().unwrap();
    duplicate_parameters(factory);
    factory.end_primary_constructor_for_parser_recovery().unwrap();
}

#[rstest]
#[case::class(recover_class)]
#[case::mixin(recover_mixin)]
#[case::named_mixin_application(recover_named_mixin_application)]
#[case::enumeration(recover_enum)]
#[case::extension(recover_extension)]
#[case::extension_type(recover_extension_type)]
#[case::typedef(recover_typedef)]
#[case::function_type(recover_function_type)]
#[case::method(recover_method)]
#[case::constructor(recover_constructor)]
#[case::factory_method(recover_factory_method)]
#[case::primary_constructor(recover_primary_constructor)]
fn test_recovery_end_keeps_stacks_balanced(#[case] recover: fn(&mut BuilderFactory<'_>)) {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    recover(&mut factory);

    factory.check_stacks().unwrap();
    // Later declarations still build normally.
    declare_class(&mut factory, "After", &[]);
    let outline = factory.finish().unwrap();

    let names: Vec<_> = outline.library.iter().filter_map(Fragment::name).collect();
    assert_eq!(names, vec!["After"]);
    // Duplicate names are tolerated on recovery.
    assert!(outline.diagnostics.is_empty());
}

#[test]
fn test_scope_records_follow_entry_order() {
    let mut ctx = CompilationContext::default();
    let mut factory = BuilderFactory::new(&mut ctx, unit("package:app/a.dart"));
    declare_class(&mut factory, "A", &[]);
    let outline = factory.finish().unwrap();

    let kinds: Vec<_> = outline.scopes.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TypeScopeKind::Library,
            TypeScopeKind::DeclarationTypeParameters,
            TypeScopeKind::DeclarationBody(DeclarationKind::Class),
        ]
    );
    let class = class(&outline, "A");
    assert_eq!(class.scope, Some(outline.scopes[1].id));
}
