//! Code for handling IDs
//!
//! Places and hosts are stored in arenas keyed by integer IDs. All cross-references between them
//! (owners, assets, neighbours) are stored as IDs, never as references.

macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(
            Clone,
            Copy,
            std::hash::Hash,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Debug,
            serde::Deserialize,
            serde::Serialize,
            derive_more::Display,
        )]
        /// An ID type (e.g. `PlaceID`, `HostID`)
        pub struct $name(pub u32);

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                $name(id)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> u32 {
                id.0
            }
        }
    };
}
pub(crate) use define_id_type;

/// Indicates that the struct has an ID field
pub trait HasID<ID: Copy> {
    /// Get the struct's ID
    fn get_id(&self) -> ID;
}

/// Implement the `HasID` trait for the given type, assuming it has a field called `id`
macro_rules! define_id_getter {
    ($t:ty, $id_ty:ty) => {
        impl crate::id::HasID<$id_ty> for $t {
            fn get_id(&self) -> $id_ty {
                self.id
            }
        }
    };
}
pub(crate) use define_id_getter;
