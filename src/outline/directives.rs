//! Import, export and part directives.
//!
//! The `*Directive` types are what the parser hands over; [`Import`],
//! [`Export`], [`Part`] and [`PartOf`] are the resolved edges a unit keeps.

use smol_str::SmolStr;
use url::Url;

use crate::base::{FileId, TextSize};

use super::config::EnvironmentOracle;
use super::types::MetadataBuilder;
use super::uri::DirectiveUri;

pub const DART_EXT_PREFIX: &str = "dart-ext:";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CombinatorKind {
    Show,
    Hide,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Combinator {
    pub kind: CombinatorKind,
    pub names: Vec<SmolStr>,
    pub offset: TextSize,
}

/// `if (dart.library.io == "true") 'io.dart'`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Configuration {
    pub dotted_name: SmolStr,
    /// `None` means `== "true"`.
    pub condition: Option<SmolStr>,
    pub uri: SmolStr,
    pub offset: TextSize,
}

impl Configuration {
    pub fn new(dotted_name: impl Into<SmolStr>, uri: impl Into<SmolStr>) -> Self {
        Self {
            dotted_name: dotted_name.into(),
            condition: None,
            uri: uri.into(),
            offset: TextSize::default(),
        }
    }

    pub fn with_condition(mut self, value: impl Into<SmolStr>) -> Self {
        self.condition = Some(value.into());
        self
    }

    pub fn matches(&self, environment: &dyn EnvironmentOracle) -> bool {
        let expected = self.condition.as_deref().unwrap_or("true");
        environment
            .lookup(&self.dotted_name)
            .is_some_and(|value| value == expected)
    }
}

/// The first configuration whose condition holds, else the default URI.
pub fn select_configuration<'a>(
    default_uri: &'a str,
    configurations: &'a [Configuration],
    environment: &dyn EnvironmentOracle,
) -> &'a str {
    configurations
        .iter()
        .find(|c| c.matches(environment))
        .map_or(default_uri, |c| c.uri.as_str())
}

// ============================================================================
// PARSER INPUT
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportDirective {
    pub metadata: Vec<MetadataBuilder>,
    pub uri: SmolStr,
    pub configurations: Vec<Configuration>,
    pub prefix: Option<SmolStr>,
    pub prefix_offset: TextSize,
    pub combinators: Vec<Combinator>,
    pub is_deferred: bool,
    pub import_offset: TextSize,
    pub uri_offset: TextSize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportDirective {
    pub metadata: Vec<MetadataBuilder>,
    pub uri: SmolStr,
    pub configurations: Vec<Configuration>,
    pub combinators: Vec<Combinator>,
    pub export_offset: TextSize,
    pub uri_offset: TextSize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartDirective {
    pub metadata: Vec<MetadataBuilder>,
    pub uri: SmolStr,
    pub part_offset: TextSize,
    pub uri_offset: TextSize,
}

/// `part of 'lib.dart';` or the legacy `part of lib.name;`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartOfDirective {
    pub metadata: Vec<MetadataBuilder>,
    pub uri: Option<SmolStr>,
    pub name: Option<SmolStr>,
    pub offset: TextSize,
    pub uri_offset: TextSize,
}

// ============================================================================
// RESOLVED EDGES
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    /// `None` for malformed URIs and native extensions, which load nothing.
    pub target: Option<FileId>,
    pub uri: DirectiveUri,
    pub prefix: Option<SmolStr>,
    pub prefix_offset: TextSize,
    pub is_deferred: bool,
    pub combinators: Vec<Combinator>,
    pub import_offset: TextSize,
    pub uri_offset: TextSize,
    /// Best-effort path of a `dart-ext:` import.
    pub native_path: Option<SmolStr>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Export {
    pub target: Option<FileId>,
    pub uri: DirectiveUri,
    pub combinators: Vec<Combinator>,
    pub export_offset: TextSize,
    pub uri_offset: TextSize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Part {
    pub target: Option<FileId>,
    pub uri: DirectiveUri,
    pub file_uri: Option<Url>,
    pub part_offset: TextSize,
    pub uri_offset: TextSize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartOf {
    pub uri: Option<DirectiveUri>,
    pub name: Option<SmolStr>,
    pub offset: TextSize,
}

/// One unit re-exporting another, kept on the exported unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exporter {
    pub exporter: FileId,
    pub combinators: Vec<Combinator>,
    pub offset: TextSize,
}
