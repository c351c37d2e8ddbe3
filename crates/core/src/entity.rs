//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Everything the entity store keeps in a keyed table implements this, so the
/// store can index a record without knowing its concrete shape.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
