//! Entity trait: records with a store-assigned identity.

/// A record identified by a store-assigned id.
///
/// Customers, vehicles and rentals are entities: two records with the same
/// identifier are the same record even if every other field differs. Ids are
/// UUIDv7, so id order is creation order.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + Ord + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Listing order for collections of entities.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IdOrder {
    OldestFirst,
    NewestFirst,
}

/// Sort `records` by identifier, which is creation order.
pub fn sort_by_id<E: Entity>(records: &mut [E], order: IdOrder) {
    match order {
        IdOrder::OldestFirst => records.sort_by(|a, b| a.id().cmp(b.id())),
        IdOrder::NewestFirst => records.sort_by(|a, b| b.id().cmp(a.id())),
    }
}
