//! Directive URI resolution.
//!
//! URIs in `import`, `export` and `part` directives are resolved against
//! the unit's import URI. The `url` crate accepts almost anything, so
//! [`check_uri_reference`] first rejects what a strict URI grammar would,
//! reporting the offset where parsing failed.

use std::fmt;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use url::Url;
use url::form_urlencoded::byte_serialize;

use crate::base::{FileId, TextSize};

use super::diagnostics::{Diagnostic, DiagnosticSink, Location, Template};

pub const MALFORMED_URI_SCHEME: &str = "org-dartlang-malformed-uri";

// ============================================================================
// RESOLVED URIS
// ============================================================================

/// Result of resolving a directive URI.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DirectiveUri {
    Resolved(Url),
    /// The URI could not be parsed; the original text is kept for
    /// diagnostics.
    Malformed(SmolStr),
}

impl DirectiveUri {
    pub fn as_url(&self) -> Option<&Url> {
        match self {
            DirectiveUri::Resolved(url) => Some(url),
            DirectiveUri::Malformed(_) => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, DirectiveUri::Malformed(_))
    }
}

impl fmt::Display for DirectiveUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectiveUri::Resolved(url) => write!(f, "{url}"),
            DirectiveUri::Malformed(original) => {
                write!(f, "{MALFORMED_URI_SCHEME}:?")?;
                for chunk in byte_serialize(original.as_bytes()) {
                    f.write_str(chunk)?;
                }
                Ok(())
            }
        }
    }
}

/// Where and why a URI failed to parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UriParseError {
    /// Byte offset into the URI text, if known.
    pub position: Option<usize>,
    pub message: SmolStr,
}

impl UriParseError {
    fn at(position: usize, message: &'static str) -> Self {
        Self {
            position: Some(position),
            message: SmolStr::new_static(message),
        }
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

fn scheme_end(raw: &str) -> Option<usize> {
    let end = raw.find([':', '/', '?', '#'])?;
    (raw.as_bytes()[end] == b':').then_some(end)
}

/// Check `raw` against the URI-reference grammar.
pub fn check_uri_reference(raw: &str) -> Result<(), UriParseError> {
    let bytes = raw.as_bytes();

    if let Some(end) = scheme_end(raw) {
        if end == 0 {
            return Err(UriParseError::at(0, "Invalid empty scheme"));
        }
        if !bytes[0].is_ascii_alphabetic() {
            return Err(UriParseError::at(0, "Scheme not starting with alphabetic character"));
        }
        if let Some(bad) = bytes[..end]
            .iter()
            .position(|&b| !(b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.'))
        {
            return Err(UriParseError::at(bad, "Illegal scheme character"));
        }
    }

    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b if b < 0x20 || b == 0x7f => {
                return Err(UriParseError::at(index, "Invalid character"));
            }
            b'%' => {
                let valid = bytes
                    .get(index + 1..index + 3)
                    .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
                if !valid {
                    return Err(UriParseError::at(index, "Invalid URL encoding"));
                }
                index += 3;
                continue;
            }
            _ => {}
        }
        index += 1;
    }

    check_port(raw)
}

fn check_port(raw: &str) -> Result<(), UriParseError> {
    let start = match scheme_end(raw) {
        Some(end) => end + 1,
        None => 0,
    };
    let Some(rest) = raw[start..].strip_prefix("//") else {
        return Ok(());
    };
    let authority_start = start + 2;
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    let host_start = authority.find('@').map_or(0, |at| at + 1);
    let host = &authority[host_start..];
    let port_colon = if host.starts_with('[') {
        host.find(']').and_then(|close| host[close..].find(':').map(|c| close + c))
    } else {
        host.find(':')
    };
    if let Some(colon) = port_colon {
        let port = &host[colon + 1..];
        if let Some(bad) = port.bytes().position(|b| !b.is_ascii_digit()) {
            return Err(UriParseError::at(
                authority_start + host_start + colon + 1 + bad,
                "Invalid port",
            ));
        }
    }
    Ok(())
}

// ============================================================================
// RESOLUTION
// ============================================================================

fn remove_dot_segments(path: &str) -> String {
    let mut output: Vec<&str> = Vec::new();
    let segments: Vec<&str> = path.split('/').collect();
    let last = segments.len().saturating_sub(1);
    for (index, segment) in segments.iter().enumerate() {
        match *segment {
            "." => {
                if index == last {
                    output.push("");
                }
            }
            ".." => {
                if output.len() > 1 || output.first().is_some_and(|s| !s.is_empty()) {
                    output.pop();
                }
                if index == last {
                    output.push("");
                }
            }
            other => output.push(other),
        }
    }
    output.join("/")
}

/// Resolve against a base whose path is opaque (`dart:core`).
fn merge_opaque(base: &Url, raw: &str, expand_library: bool) -> Result<Url, UriParseError> {
    let base_path = base.path();
    let base_path = if expand_library && !base_path.contains('/') {
        format!("{base_path}/{base_path}.dart")
    } else {
        base_path.to_string()
    };
    let directory = match base_path.rfind('/') {
        Some(slash) => &base_path[..=slash],
        None => "",
    };
    let merged = if let Some(absolute) = raw.strip_prefix('/') {
        remove_dot_segments(absolute)
    } else {
        remove_dot_segments(&format!("{directory}{raw}"))
    };
    Url::parse(&format!("{}:{merged}", base.scheme())).map_err(|e| UriParseError {
        position: None,
        message: SmolStr::new(e.to_string()),
    })
}

/// Resolve `raw` against `base` without reporting.
///
/// Parts of `dart:` libraries resolve against the library's own file:
/// `part 'bool.dart'` in `dart:core` is `dart:core/bool.dart`.
pub fn try_resolve(base: &Url, raw: &str, is_part: bool) -> Result<Url, UriParseError> {
    check_uri_reference(raw)?;
    if scheme_end(raw).is_some() {
        return Url::parse(raw).map_err(|e| UriParseError {
            position: None,
            message: SmolStr::new(e.to_string()),
        });
    }
    if is_part && base.scheme() == "dart" {
        return merge_opaque(base, raw, true);
    }
    if base.cannot_be_a_base() {
        return merge_opaque(base, raw, false);
    }
    base.join(raw).map_err(|e| UriParseError {
        position: None,
        message: SmolStr::new(e.to_string()),
    })
}

/// Resolve a directive URI, reporting malformed ones.
///
/// `uri_offset` is the offset of the string literal's opening quote; the
/// diagnostic points one past it plus the failure position.
pub fn resolve_directive_uri(
    base: &Url,
    raw: &str,
    uri_offset: TextSize,
    is_part: bool,
    file: FileId,
    sink: &mut dyn DiagnosticSink,
) -> DirectiveUri {
    match try_resolve(base, raw, is_part) {
        Ok(url) => DirectiveUri::Resolved(url),
        Err(error) => {
            let offset = match error.position {
                Some(position) => uri_offset + TextSize::from(1 + position as u32),
                None => uri_offset,
            };
            tracing::debug!(raw, details = %error.message, "malformed directive uri");
            sink.report(Diagnostic::error(
                Template::CouldNotParseUri {
                    uri: SmolStr::new(raw),
                    details: error.message,
                },
                Location::new(file, offset, 1),
            ));
            DirectiveUri::Malformed(SmolStr::new(raw))
        }
    }
}

// ============================================================================
// TRANSLATION
// ============================================================================

/// Maps logical URIs (`package:`) to file URIs.
pub trait UriTranslator {
    fn translate(&self, uri: &Url) -> Option<Url>;
}

/// A translator that knows no mappings.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTranslation;

impl UriTranslator for NoTranslation {
    fn translate(&self, _uri: &Url) -> Option<Url> {
        None
    }
}

/// `package:name/path` → `<root of name>/path`.
#[derive(Clone, Debug, Default)]
pub struct PackageTranslator {
    packages: FxHashMap<SmolStr, Url>,
}

impl PackageTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `root` is the package's `lib/` directory and should end in `/`.
    pub fn with_package(mut self, name: impl Into<SmolStr>, root: Url) -> Self {
        self.packages.insert(name.into(), root);
        self
    }
}

impl UriTranslator for PackageTranslator {
    fn translate(&self, uri: &Url) -> Option<Url> {
        if uri.scheme() != "package" {
            return None;
        }
        let (package, path) = uri.path().split_once('/')?;
        self.packages.get(package)?.join(path).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::diagnostics::DiagnosticCollector;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_relative_and_absolute_resolution() {
        let base = url("package:a/src/b.dart");
        assert_eq!(try_resolve(&base, "c.dart", false).unwrap(), url("package:a/src/c.dart"));
        assert_eq!(try_resolve(&base, "../d.dart", false).unwrap(), url("package:a/d.dart"));
        assert_eq!(try_resolve(&base, "dart:io", false).unwrap(), url("dart:io"));
    }

    #[test]
    fn test_dart_parts_resolve_inside_the_library() {
        let base = url("dart:core");
        assert_eq!(try_resolve(&base, "bool.dart", true).unwrap().as_str(), "dart:core/bool.dart");
        let base = url("dart:_internal/internal.dart");
        assert_eq!(try_resolve(&base, "list.dart", true).unwrap().as_str(), "dart:_internal/list.dart");
    }

    #[test]
    fn test_control_character_is_rejected_with_position() {
        let err = check_uri_reference("foo\u{1}bar.dart").unwrap_err();
        assert_eq!(err.position, Some(3));
    }

    #[test]
    fn test_bad_escape_and_port() {
        assert_eq!(check_uri_reference("a%2.dart").unwrap_err().position, Some(1));
        assert_eq!(check_uri_reference("http://host:8x/a").unwrap_err().position, Some(13));
        assert!(check_uri_reference("http://[::1]:80/a").is_ok());
        assert!(check_uri_reference("a%20b.dart").is_ok());
    }

    #[test]
    fn test_malformed_uri_reports_and_returns_sentinel() {
        let mut sink = DiagnosticCollector::new();
        let resolved = resolve_directive_uri(
            &url("package:a/a.dart"),
            "b\u{7}.dart",
            TextSize::from(7),
            false,
            FileId::new(0),
            &mut sink,
        );
        assert_eq!(resolved, DirectiveUri::Malformed("b\u{7}.dart".into()));
        assert_eq!(resolved.to_string(), "org-dartlang-malformed-uri:?b%07.dart");
        assert_eq!(sink.diagnostics()[0].location.offset, TextSize::from(9));
    }

    #[test]
    fn test_package_translator() {
        let translator = PackageTranslator::new().with_package("a", url("file:///pkgs/a/lib/"));
        assert_eq!(
            translator.translate(&url("package:a/src/b.dart")),
            Some(url("file:///pkgs/a/lib/src/b.dart"))
        );
        assert_eq!(translator.translate(&url("package:z/z.dart")), None);
        assert_eq!(translator.translate(&url("dart:core")), None);
    }
}
