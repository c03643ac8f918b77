//! User-facing problems found while building outlines.
//!
//! Problems are structured: a [`Template`] with its arguments, a location,
//! and optional context locations. Rendering them into prose for a terminal
//! or an editor is someone else's job; [`Template::message`] exists for
//! logs and tests.

use smol_str::SmolStr;

use crate::base::{FileId, TextSize};

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Standard diagnostic codes.
pub mod codes {
    pub const COULD_NOT_PARSE_URI: &str = "E0101";
    pub const UNSUPPORTED_DART_EXT: &str = "E0102";
    pub const SCRIPT_TAG_IN_PART_FILE: &str = "E0103";
    pub const DUPLICATED_TYPE_PARAMETER_NAME: &str = "E0104";
    pub const CONSTRUCTOR_WITH_WRONG_NAME: &str = "E0105";
    pub const EXTENSION_DECLARES_CONSTRUCTOR: &str = "E0106";
    pub const EXTENSION_DECLARES_INSTANCE_FIELD: &str = "E0107";
    pub const EXPECTED_REPRESENTATION_FIELD: &str = "E0108";
    pub const MULTIPLE_REPRESENTATION_FIELDS: &str = "E0109";
    pub const MISSING_PREFIX_IN_DEFERRED_IMPORT: &str = "E0110";
    pub const PART_OF_SELF: &str = "E0111";
    pub const PART_OF_TWICE: &str = "E0112";

    /// Context notes carry no code of their own.
    pub const CONTEXT: &str = "N0000";
}

/// The problem template plus its arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Template {
    CouldNotParseUri { uri: SmolStr, details: SmolStr },
    UnsupportedDartExt,
    ScriptTagInPartFile,
    DuplicatedTypeParameterName { name: SmolStr },
    DuplicatedTypeParameterNameContext { name: SmolStr },
    ConstructorWithWrongName,
    ConstructorWithWrongNameContext { class_name: SmolStr },
    ExtensionDeclaresConstructor,
    ExtensionDeclaresInstanceField { name: SmolStr },
    ExpectedRepresentationField,
    MultipleRepresentationFields,
    MissingPrefixInDeferredImport,
    PartOfSelf,
    PartOfTwice,
}

impl Template {
    pub fn code(&self) -> &'static str {
        match self {
            Template::CouldNotParseUri { .. } => codes::COULD_NOT_PARSE_URI,
            Template::UnsupportedDartExt => codes::UNSUPPORTED_DART_EXT,
            Template::ScriptTagInPartFile => codes::SCRIPT_TAG_IN_PART_FILE,
            Template::DuplicatedTypeParameterName { .. } => codes::DUPLICATED_TYPE_PARAMETER_NAME,
            Template::ConstructorWithWrongName => codes::CONSTRUCTOR_WITH_WRONG_NAME,
            Template::ExtensionDeclaresConstructor => codes::EXTENSION_DECLARES_CONSTRUCTOR,
            Template::ExtensionDeclaresInstanceField { .. } => codes::EXTENSION_DECLARES_INSTANCE_FIELD,
            Template::ExpectedRepresentationField => codes::EXPECTED_REPRESENTATION_FIELD,
            Template::MultipleRepresentationFields => codes::MULTIPLE_REPRESENTATION_FIELDS,
            Template::MissingPrefixInDeferredImport => codes::MISSING_PREFIX_IN_DEFERRED_IMPORT,
            Template::PartOfSelf => codes::PART_OF_SELF,
            Template::PartOfTwice => codes::PART_OF_TWICE,
            Template::DuplicatedTypeParameterNameContext { .. }
            | Template::ConstructorWithWrongNameContext { .. } => codes::CONTEXT,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Template::CouldNotParseUri { uri, details } => {
                format!("Couldn't parse URI '{uri}':\n  {details}.")
            }
            Template::UnsupportedDartExt => "Dart native extensions are no longer supported.".to_string(),
            Template::ScriptTagInPartFile => "A part file cannot have script tag.".to_string(),
            Template::DuplicatedTypeParameterName { name } => {
                format!("A type variable can't have the same name as another: '{name}'.")
            }
            Template::DuplicatedTypeParameterNameContext { name } => {
                format!("The other type variable named '{name}'.")
            }
            Template::ConstructorWithWrongName => {
                "The name of a constructor must match the name of the enclosing class.".to_string()
            }
            Template::ConstructorWithWrongNameContext { class_name } => {
                format!("The name of the enclosing class is '{class_name}'.")
            }
            Template::ExtensionDeclaresConstructor => "Extensions can't declare constructors.".to_string(),
            Template::ExtensionDeclaresInstanceField { name } => {
                format!("Extensions can't declare instance fields: '{name}'.")
            }
            Template::ExpectedRepresentationField => {
                "Expected a representation field.".to_string()
            }
            Template::MultipleRepresentationFields => {
                "Each extension type should have exactly one representation field.".to_string()
            }
            Template::MissingPrefixInDeferredImport => "Deferred imports should have a prefix.".to_string(),
            Template::PartOfSelf => "A file can't be a part of itself.".to_string(),
            Template::PartOfTwice => "Only one part-of directive may be declared in a file.".to_string(),
        }
    }
}

/// A source location: unit, offset and length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: FileId,
    pub offset: TextSize,
    pub length: u32,
}

impl Location {
    pub fn new(file: FileId, offset: TextSize, length: u32) -> Self {
        Self { file, offset, length }
    }
}

/// A context note attached to a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelatedInfo {
    pub template: Template,
    pub location: Location,
}

/// A reported problem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub template: Template,
    pub severity: Severity,
    pub location: Location,
    pub context: Vec<RelatedInfo>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(template: Template, location: Location) -> Self {
        Self {
            template,
            severity: Severity::Error,
            location,
            context: Vec::new(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(template: Template, location: Location) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(template, location)
        }
    }

    /// Add related information.
    pub fn with_context(mut self, template: Template, location: Location) -> Self {
        self.context.push(RelatedInfo { template, location });
        self
    }

    pub fn code(&self) -> &'static str {
        self.template.code()
    }
}

// ============================================================================
// DIAGNOSTIC SINK
// ============================================================================

/// Where the outline builder sends user-facing problems.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Collects diagnostics for one compilation unit.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Get the number of errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error).count()
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Diagnostics with a given code, in report order.
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics.iter().filter(move |d| d.code() == code)
    }

    /// Take all diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

impl DiagnosticSink for DiagnosticCollector {
    fn report(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(code = diagnostic.code(), "{}", diagnostic.template.message());
        self.diagnostics.push(diagnostic);
    }
}
