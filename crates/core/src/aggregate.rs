//! Aggregate root trait and optimistic version expectations.

/// Aggregate root marker + minimal interface.
///
/// An aggregate root is the only entry point for mutating the entities it
/// owns (an `Order` owns its `OrderItem`s). The version is bumped by the
/// persistence layer on every successful write.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the persisted row.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for an aggregate write: the stored
/// aggregate must still be at this version.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExpectedVersion(pub u64);

impl ExpectedVersion {
    /// Expect the version `aggregate` was loaded at.
    pub fn of<A: AggregateRoot>(aggregate: &A) -> Self {
        Self(aggregate.version())
    }

    pub fn matches(self, actual: u64) -> bool {
        self.0 == actual
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        id: u32,
        version: u64,
    }

    impl AggregateRoot for Counter {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.id
        }

        fn version(&self) -> u64 {
            self.version
        }
    }

    #[test]
    fn expects_the_loaded_version() {
        let loaded = Counter { id: 1, version: 3 };
        let expected = ExpectedVersion::of(&loaded);
        assert_eq!(expected, ExpectedVersion(3));
        assert!(expected.matches(3));
        assert!(!expected.matches(4));
    }
}
