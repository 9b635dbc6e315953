//! Typed indices into the tree's arenas.

use std::fmt;

macro_rules! impl_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
        pub struct $name(u32);

        impl $name {
            /// Build id from its raw value
            pub const fn new(raw: u32) -> Self {
                $name(raw)
            }

            /// Build id from an arena index
            pub fn from_index(index: usize) -> Self {
                $name(index as u32)
            }

            /// Raw value
            pub const fn raw(self) -> u32 {
                self.0
            }

            /// Arena index
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                $name(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

impl_id!(
    /// BSP node identifier, as stored in level data.
    NodeId
);
impl_id!(
    /// Leaf cell identifier.
    CellId
);
impl_id!(
    /// Portal identifier, unique per tree.
    PortalId
);
impl_id!(
    /// Movable object identifier used for cell tagging.
    ObjectId
);
impl_id!(
    /// Light identifier.
    LightId
);
