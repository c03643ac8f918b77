//! Canonical names for declarations and members.
//!
//! A canonical name is `kind` × `text`, qualified by the library URI when
//! the text is private. The same container, member kind and source name
//! always produce the same canonical name, which is what lets a reference
//! index from a previous build be replayed onto a new one.
//!
//! Extension and extension-type members are lowered to library-level
//! procedures, so their texts carry the extension name: `E|foo`,
//! `E|get#x`, `E|set#x`, `E|constructor#named`.

use std::fmt;

use smol_str::{SmolStr, format_smolstr};
use url::Url;

use super::fragments::DeclarationKind;

// ============================================================================
// CANONICAL NAMES
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NameKind {
    Classes,
    Mixins,
    Enums,
    Extensions,
    ExtensionTypes,
    Typedefs,
    Fields,
    Getters,
    Setters,
    Methods,
    Constructors,
    Factories,
}

impl NameKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NameKind::Classes => "@classes",
            NameKind::Mixins => "@mixins",
            NameKind::Enums => "@enums",
            NameKind::Extensions => "@extensions",
            NameKind::ExtensionTypes => "@extension-types",
            NameKind::Typedefs => "@typedefs",
            NameKind::Fields => "@fields",
            NameKind::Getters => "@getters",
            NameKind::Setters => "@setters",
            NameKind::Methods => "@methods",
            NameKind::Constructors => "@constructors",
            NameKind::Factories => "@factories",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let kind = match text {
            "@classes" => NameKind::Classes,
            "@mixins" => NameKind::Mixins,
            "@enums" => NameKind::Enums,
            "@extensions" => NameKind::Extensions,
            "@extension-types" => NameKind::ExtensionTypes,
            "@typedefs" => NameKind::Typedefs,
            "@fields" => NameKind::Fields,
            "@getters" => NameKind::Getters,
            "@setters" => NameKind::Setters,
            "@methods" => NameKind::Methods,
            "@constructors" => NameKind::Constructors,
            "@factories" => NameKind::Factories,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CanonicalName {
    pub kind: NameKind,
    pub text: SmolStr,
    /// Set only for private texts (leading `_`).
    pub library: Option<Url>,
}

impl CanonicalName {
    pub fn new(kind: NameKind, text: impl Into<SmolStr>, library: &Url) -> Self {
        let text = text.into();
        let library = is_private(&text).then(|| library.clone());
        Self { kind, text, library }
    }

    pub fn is_private(&self) -> bool {
        self.library.is_some()
    }
}

impl fmt::Display for CanonicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.library {
            Some(library) => write!(f, "{}::{}::{}", self.kind, library, self.text),
            None => write!(f, "{}::{}", self.kind, self.text),
        }
    }
}

pub fn is_private(name: &str) -> bool {
    name.starts_with('_')
}

// ============================================================================
// NAME SCHEMES
// ============================================================================

/// What a member lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerType {
    Library,
    Class,
    Mixin,
    Enum,
    Extension,
    ExtensionType,
}

impl From<DeclarationKind> for ContainerType {
    fn from(kind: DeclarationKind) -> Self {
        match kind {
            DeclarationKind::Class => ContainerType::Class,
            DeclarationKind::Mixin => ContainerType::Mixin,
            DeclarationKind::Enum => ContainerType::Enum,
            DeclarationKind::Extension => ContainerType::Extension,
            DeclarationKind::ExtensionType => ContainerType::ExtensionType,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProcedureKind {
    Method,
    Getter,
    Setter,
    Operator,
}

/// Which top-level declaration a name is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeclarationNameKind {
    Class,
    Mixin,
    Enum,
    Extension,
    ExtensionType,
    Typedef,
}

pub fn declaration_name(kind: DeclarationNameKind, name: &str, library: &Url) -> CanonicalName {
    let kind = match kind {
        DeclarationNameKind::Class => NameKind::Classes,
        DeclarationNameKind::Mixin => NameKind::Mixins,
        DeclarationNameKind::Enum => NameKind::Enums,
        DeclarationNameKind::Extension => NameKind::Extensions,
        DeclarationNameKind::ExtensionType => NameKind::ExtensionTypes,
        DeclarationNameKind::Typedef => NameKind::Typedefs,
    };
    CanonicalName::new(kind, name, library)
}

/// Names of the members a field turns into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldNames {
    /// The stored field, or the backing field of a lowered late field.
    pub field: CanonicalName,
    pub getter: CanonicalName,
    pub setter: Option<CanonicalName>,
    /// Companion flag of a lowered late field whose type can hold null.
    pub is_set: Option<CanonicalName>,
}

/// How a field is lowered, as far as naming is concerned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldShape {
    pub has_setter: bool,
    pub late_lowered: bool,
    /// Declared type is nullable or omitted.
    pub nullable_type: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameScheme {
    pub container_type: ContainerType,
    /// Declaration name; the synthesized `_extension#N` for unnamed extensions.
    pub container_name: Option<SmolStr>,
    pub is_instance_member: bool,
    pub library: Url,
}

impl NameScheme {
    pub fn top_level(library: Url) -> Self {
        Self {
            container_type: ContainerType::Library,
            container_name: None,
            is_instance_member: false,
            library,
        }
    }

    pub fn member(container_type: ContainerType, container_name: impl Into<SmolStr>, is_instance_member: bool, library: Url) -> Self {
        Self {
            container_type,
            container_name: Some(container_name.into()),
            is_instance_member,
            library,
        }
    }

    /// Members lowered to library-level procedures.
    pub fn is_extension_member(&self) -> bool {
        matches!(
            self.container_type,
            ContainerType::Extension | ContainerType::ExtensionType
        )
    }

    pub fn is_extension_instance_member(&self) -> bool {
        self.is_extension_member() && self.is_instance_member
    }

    /// Container key in the reference index: the class name for class-like
    /// containers, `None` for anything looked up in the library itself.
    pub fn container_key(&self) -> Option<&str> {
        match self.container_type {
            ContainerType::Class | ContainerType::Mixin | ContainerType::Enum => self.container_name.as_deref(),
            ContainerType::Library | ContainerType::Extension | ContainerType::ExtensionType => None,
        }
    }

    fn container(&self) -> &str {
        self.container_name.as_deref().unwrap_or("")
    }

    fn name(&self, kind: NameKind, text: impl Into<SmolStr>) -> CanonicalName {
        CanonicalName::new(kind, text, &self.library)
    }

    pub fn procedure_name(&self, kind: ProcedureKind, name: &str) -> CanonicalName {
        if self.is_extension_instance_member() {
            let e = self.container();
            return match kind {
                ProcedureKind::Method | ProcedureKind::Operator => self.name(NameKind::Methods, format_smolstr!("{e}|{name}")),
                ProcedureKind::Getter => self.name(NameKind::Methods, format_smolstr!("{e}|get#{name}")),
                ProcedureKind::Setter => self.name(NameKind::Methods, format_smolstr!("{e}|set#{name}")),
            };
        }
        let text = if self.is_extension_member() {
            format_smolstr!("{}|{name}", self.container())
        } else {
            SmolStr::new(name)
        };
        match kind {
            ProcedureKind::Method | ProcedureKind::Operator => self.name(NameKind::Methods, text),
            ProcedureKind::Getter => self.name(NameKind::Getters, text),
            ProcedureKind::Setter => self.name(NameKind::Setters, format_smolstr!("{text}=")),
        }
    }

    /// Tear-off of an extension instance method: `E|get#m`.
    pub fn tear_off_name(&self, name: &str) -> Option<CanonicalName> {
        self.is_extension_instance_member()
            .then(|| self.name(NameKind::Methods, format_smolstr!("{}|get#{name}", self.container())))
    }

    /// `name` is the constructor suffix, empty for the unnamed constructor.
    pub fn constructor_name(&self, name: &str, is_factory: bool) -> CanonicalName {
        if self.is_extension_member() {
            return self.name(NameKind::Methods, format_smolstr!("{}|constructor#{name}", self.container()));
        }
        let kind = if is_factory {
            NameKind::Factories
        } else {
            NameKind::Constructors
        };
        self.name(kind, name)
    }

    pub fn constructor_tear_off_name(&self, name: &str) -> CanonicalName {
        let name = if name.is_empty() { "new" } else { name };
        if self.is_extension_member() {
            self.name(NameKind::Methods, format_smolstr!("{}|_#{name}#tearOff", self.container()))
        } else {
            self.name(NameKind::Methods, format_smolstr!("_#{name}#tearOff"))
        }
    }

    pub fn field_names(&self, name: &str, shape: FieldShape) -> FieldNames {
        let text = if self.is_extension_member() {
            format_smolstr!("{}|{name}", self.container())
        } else {
            SmolStr::new(name)
        };

        let field = if shape.late_lowered {
            if self.is_instance_member && !self.is_extension_member() {
                format_smolstr!("_#{}#{name}", self.container())
            } else {
                format_smolstr!("_#{name}")
            }
        } else {
            text.clone()
        };
        let is_set = (shape.late_lowered && shape.nullable_type)
            .then(|| self.name(NameKind::Fields, format_smolstr!("{field}#isSet")));

        FieldNames {
            field: self.name(NameKind::Fields, field),
            getter: self.name(NameKind::Getters, text.clone()),
            setter: shape
                .has_setter
                .then(|| self.name(NameKind::Setters, format_smolstr!("{text}="))),
            is_set,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> Url {
        Url::parse("package:a/a.dart").unwrap()
    }

    #[test]
    fn test_getter_and_method_names_differ() {
        let scheme = NameScheme::member(ContainerType::Class, "A", true, library());
        let method = scheme.procedure_name(ProcedureKind::Method, "foo");
        let getter = scheme.procedure_name(ProcedureKind::Getter, "foo");
        assert_eq!(method.to_string(), "@methods::foo");
        assert_eq!(getter.to_string(), "@getters::foo");
        assert_ne!(method, getter);
    }

    #[test]
    fn test_setters_and_index_setters() {
        let scheme = NameScheme::member(ContainerType::Class, "A", true, library());
        assert_eq!(scheme.procedure_name(ProcedureKind::Setter, "x").to_string(), "@setters::x=");
        assert_eq!(scheme.procedure_name(ProcedureKind::Operator, "[]=").to_string(), "@methods::[]=");
    }

    #[test]
    fn test_private_names_carry_the_library() {
        let scheme = NameScheme::top_level(library());
        let name = scheme.procedure_name(ProcedureKind::Method, "_hidden");
        assert!(name.is_private());
        assert_eq!(name.to_string(), "@methods::package:a/a.dart::_hidden");
    }

    #[test]
    fn test_extension_instance_members_are_method_shaped() {
        let scheme = NameScheme::member(ContainerType::Extension, "E", true, library());
        assert_eq!(scheme.procedure_name(ProcedureKind::Getter, "x").text, "E|get#x");
        assert_eq!(scheme.procedure_name(ProcedureKind::Setter, "x").text, "E|set#x");
        assert_eq!(scheme.procedure_name(ProcedureKind::Setter, "x").kind, NameKind::Methods);
        assert_eq!(scheme.tear_off_name("m").unwrap().text, "E|get#m");
        assert_eq!(scheme.container_key(), None);
    }

    #[test]
    fn test_extension_static_members() {
        let scheme = NameScheme::member(ContainerType::Extension, "E", false, library());
        assert_eq!(scheme.procedure_name(ProcedureKind::Method, "m").text, "E|m");
        assert!(scheme.tear_off_name("m").is_none());
        let names = scheme.field_names("x", FieldShape { has_setter: true, ..FieldShape::default() });
        assert_eq!(names.field.text, "E|x");
        assert_eq!(names.setter.unwrap().text, "E|x=");
    }

    #[test]
    fn test_constructor_names() {
        let class = NameScheme::member(ContainerType::Class, "C", false, library());
        assert_eq!(class.constructor_name("", false).to_string(), "@constructors::");
        assert_eq!(class.constructor_name("named", true).kind, NameKind::Factories);
        assert_eq!(class.constructor_tear_off_name("").text, "_#new#tearOff");

        let extension_type = NameScheme::member(ContainerType::ExtensionType, "E", false, library());
        assert_eq!(extension_type.constructor_name("named", false).text, "E|constructor#named");
        assert_eq!(extension_type.constructor_tear_off_name("").text, "E|_#new#tearOff");
    }

    #[test]
    fn test_late_field_lowering_names() {
        let instance = NameScheme::member(ContainerType::Class, "C", true, library());
        let names = instance.field_names(
            "x",
            FieldShape {
                has_setter: true,
                late_lowered: true,
                nullable_type: true,
            },
        );
        assert_eq!(names.field.text, "_#C#x");
        assert_eq!(names.is_set.unwrap().text, "_#C#x#isSet");
        assert_eq!(names.getter.text, "x");

        let top_level = NameScheme::top_level(library());
        let names = top_level.field_names(
            "y",
            FieldShape {
                has_setter: false,
                late_lowered: true,
                nullable_type: false,
            },
        );
        assert_eq!(names.field.text, "_#y");
        assert!(names.is_set.is_none());
        assert!(names.setter.is_none());
    }

    #[test]
    fn test_name_kind_round_trips_through_text() {
        for kind in [NameKind::ExtensionTypes, NameKind::Setters, NameKind::Factories] {
            assert_eq!(NameKind::parse(kind.as_str()), Some(kind));
        }
    }
}
