//! Declaration modifier bitset.

use bitflags::bitflags;

bitflags! {
    /// Modifiers seen on a declaration, plus a few synthesized markers.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        const ABSTRACT = 1 << 0;
        const AUGMENT = 1 << 1;
        const CONST = 1 << 2;
        const COVARIANT = 1 << 3;
        const EXTERNAL = 1 << 4;
        const FINAL = 1 << 5;
        const STATIC = 1 << 6;
        const LATE = 1 << 7;
        const REQUIRED = 1 << 8;
        const BASE = 1 << 9;
        const INTERFACE = 1 << 10;
        const SEALED = 1 << 11;
        const MIXIN = 1 << 12;
        const VAR = 1 << 13;

        /// Set on a class-like declaration that has at least one const constructor.
        const DECLARES_CONST_CONSTRUCTOR = 1 << 20;
        /// Set on the final class of `class N = S with M;`.
        const NAMED_MIXIN_APPLICATION = 1 << 21;
        /// Set on fields with an initializer in the source.
        const HAS_INITIALIZER = 1 << 22;
        /// Set on fragments that do not appear in the source.
        const SYNTHETIC = 1 << 23;
    }
}

impl Modifiers {
    #[inline]
    pub fn is_static(self) -> bool {
        self.contains(Modifiers::STATIC)
    }

    #[inline]
    pub fn is_const(self) -> bool {
        self.contains(Modifiers::CONST)
    }

    #[inline]
    pub fn is_final(self) -> bool {
        self.contains(Modifiers::FINAL)
    }

    #[inline]
    pub fn is_late(self) -> bool {
        self.contains(Modifiers::LATE)
    }

    #[inline]
    pub fn is_abstract(self) -> bool {
        self.contains(Modifiers::ABSTRACT)
    }
}
