//! Outline-builder configuration and the environment oracle.

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

/// Knobs that change which entities the outline builder synthesizes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutlineConfig {
    /// Lower `late` fields into a backing field plus accessors.
    pub lower_late_fields: bool,
    /// Give constructors a lowered tear-off (`_#new#tearOff`).
    pub lower_constructor_tear_offs: bool,
    /// Supertype every enum extends before its mixins are applied.
    pub enum_base_type: SmolStr,
    /// Implicit supertype of classes and mixin applications without one.
    pub object_type: SmolStr,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            lower_late_fields: true,
            lower_constructor_tear_offs: true,
            enum_base_type: SmolStr::new_static("_Enum"),
            object_type: SmolStr::new_static("Object"),
        }
    }
}

impl OutlineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_late_lowering(mut self, lower: bool) -> Self {
        self.lower_late_fields = lower;
        self
    }

    pub fn with_constructor_tear_off_lowering(mut self, lower: bool) -> Self {
        self.lower_constructor_tear_offs = lower;
        self
    }

    pub fn with_enum_base_type(mut self, name: impl Into<SmolStr>) -> Self {
        self.enum_base_type = name.into();
        self
    }

    pub fn with_object_type(mut self, name: impl Into<SmolStr>) -> Self {
        self.object_type = name.into();
        self
    }
}

/// Answers configuration conditions in conditional imports and exports.
///
/// `if (dart.library.io) 'io.dart'` asks for `"dart.library.io"` and picks
/// the URI when the answer equals the condition's value (`"true"` when the
/// condition has no `==`).
pub trait EnvironmentOracle {
    fn lookup(&self, dotted_name: &str) -> Option<SmolStr>;
}

/// Environment built from the set of supported `dart:` libraries plus
/// explicit `-D` style defines.
#[derive(Clone, Debug, Default)]
pub struct LibrarySupport {
    supported: FxHashSet<SmolStr>,
    defines: FxHashMap<SmolStr, SmolStr>,
}

impl LibrarySupport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `dart:<library>` as supported.
    pub fn with_library(mut self, library: impl Into<SmolStr>) -> Self {
        self.supported.insert(library.into());
        self
    }

    pub fn with_define(mut self, name: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.defines.insert(name.into(), value.into());
        self
    }
}

impl EnvironmentOracle for LibrarySupport {
    fn lookup(&self, dotted_name: &str) -> Option<SmolStr> {
        if let Some(value) = self.defines.get(dotted_name) {
            return Some(value.clone());
        }
        let library = dotted_name.strip_prefix("dart.library.")?;
        if self.supported.contains(library) {
            Some(SmolStr::new_static("true"))
        } else {
            Some(SmolStr::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_support_answers_dart_library_conditions() {
        let env = LibrarySupport::new().with_library("io");
        assert_eq!(env.lookup("dart.library.io").as_deref(), Some("true"));
        assert_eq!(env.lookup("dart.library.html").as_deref(), Some(""));
        assert_eq!(env.lookup("flavor"), None);
    }

    #[test]
    fn test_defines_take_precedence() {
        let env = LibrarySupport::new()
            .with_library("io")
            .with_define("dart.library.io", "false")
            .with_define("flavor", "prod");
        assert_eq!(env.lookup("dart.library.io").as_deref(), Some("false"));
        assert_eq!(env.lookup("flavor").as_deref(), Some("prod"));
    }

    #[test]
    fn test_config_builder() {
        let config = OutlineConfig::new().with_late_lowering(false).with_object_type("Any");
        assert!(!config.lower_late_fields);
        assert_eq!(config.object_type, "Any");
        assert_eq!(config.enum_base_type, "_Enum");
    }
}
