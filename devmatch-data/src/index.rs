//! Strongly typed indexes and offsets used to address entities.
//!
//! Fixed length entities (values, profiles, signatures) are addressed by
//! their position in their list, variable length entities (strings, nodes)
//! by their byte offset within their section.

use std::fmt;

macro_rules! entity_ref {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            #[must_use]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            #[must_use]
            pub const fn get(self) -> u32 {
                self.0
            }

            #[must_use]
            pub const fn as_usize(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_ref! {
    /// Byte offset of a string within the string heap.
    StringOffset
}

entity_ref! {
    /// Byte offset of a node within the node section.
    NodeOffset
}

entity_ref! {
    /// Position of a property within the property list.
    PropertyIndex
}

entity_ref! {
    /// Position of a value within the value list.
    ValueIndex
}

entity_ref! {
    /// Position of a profile within the profile list.
    ProfileIndex
}

entity_ref! {
    /// Position of a signature within the signature list.
    SignatureIndex
}

/// Sentinel used in data files for an absent reference.
pub(crate) const NONE_REF: u32 = u32::MAX;

pub(crate) fn optional<T>(raw: u32, make: impl FnOnce(u32) -> T) -> Option<T> {
    (raw != NONE_REF).then(|| make(raw))
}
