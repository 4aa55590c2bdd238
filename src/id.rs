// model = "claude-opus-4-5"
// created = 2026-02-02
// modified = 2026-02-02
// driver = "Isaac Clayton"

//! Identifiers and per-site ID generation.
//!
//! # Identifier Design
//!
//! Every character and every command carries an `Id`: a `(site, clock)`
//! pair. IDs are:
//! - Globally unique: each site owns its clock and never reuses a value
//! - Totally ordered: lexicographic on `(site, clock)`, site first
//! - Compact and copyable: two machine words
//!
//! Two sentinel IDs bound the character sequence at every replica:
//! [`Id::BEGIN`] and [`Id::END`]. Site number 0 is reserved for them,
//! and fresh sites start their clock at 2, so no generated ID can ever
//! collide with a sentinel tuple.

use serde::Deserialize;
use serde::Serialize;

/// An identifier: originating site plus that site's clock value.
///
/// The derived `Ord` compares `site` first and then `clock`, which is
/// the total order every replica uses to break ties between concurrent
/// insertions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Id {
    /// The site that generated this ID.
    pub site: u64,
    /// The site's clock at generation time.
    pub clock: u64,
}

impl Id {
    /// The sentinel before the first character. Least possible ID.
    pub const BEGIN: Id = Id { site: 0, clock: 0 };

    /// The sentinel after the last character.
    ///
    /// Not the greatest possible tuple, but greater than `BEGIN` and
    /// never generated by any site, which is all the engine needs.
    pub const END: Id = Id { site: 0, clock: 1 };

    /// Create a new ID.
    pub fn new(site: u64, clock: u64) -> Id {
        return Id { site, clock };
    }

    /// Check whether this ID is one of the two sentinels.
    pub fn is_sentinel(&self) -> bool {
        return *self == Id::BEGIN || *self == Id::END;
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "{}:{}", self.site, self.clock);
    }
}

/// A replica identity bound to a monotonic clock.
///
/// Each command a site emits gets a fresh clock value, so a site's
/// commands are totally ordered by emission. The caller is responsible
/// for handing out distinct site numbers; two live replicas sharing one
/// breaks every convergence guarantee.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Site {
    site: u64,
    clock: u64,
}

impl Site {
    /// Create a site with the given nonzero site number.
    ///
    /// Clock values 0 and 1 are reserved at every site so generated IDs
    /// never collide with the sentinel tuples.
    ///
    /// # Panics
    ///
    /// Panics if `site` is 0, which is reserved for the sentinels.
    pub fn new(site: u64) -> Site {
        assert!(site != 0, "site 0 is reserved for the sentinels");
        return Site { site, clock: 2 };
    }

    /// The site number this generator is bound to.
    pub fn site(&self) -> u64 {
        return self.site;
    }

    /// Generate the next ID, advancing the clock by one.
    pub fn generate_id(&mut self) -> Id {
        let id = Id::new(self.site, self.clock);
        self.clock += 1;
        return id;
    }

    /// Reserve a block of `n` consecutive IDs in one call.
    ///
    /// Returns the first and last ID of the block; the clock advances
    /// past the whole block. Used by insert commands, which assign one
    /// ID per inserted character.
    ///
    /// # Panics
    ///
    /// Panics if `n` is 0.
    pub fn generate_id_block(&mut self, n: usize) -> (Id, Id) {
        assert!(n > 0, "cannot reserve an empty ID block");
        let first = Id::new(self.site, self.clock);
        let last = Id::new(self.site, self.clock + n as u64 - 1);
        self.clock += n as u64;
        return (first, last);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_site_first() {
        let a = Id::new(1, 100);
        let b = Id::new(1, 101);
        let c = Id::new(2, 2);

        assert!(a < b);
        assert!(b < c); // site dominates clock
        assert!(Id::BEGIN < a);
        assert!(Id::BEGIN < Id::END);
        assert!(Id::END < a);
    }

    #[test]
    fn sentinels() {
        assert!(Id::BEGIN.is_sentinel());
        assert!(Id::END.is_sentinel());
        assert!(!Id::new(1, 2).is_sentinel());
    }

    #[test]
    fn generate_id_advances_clock() {
        let mut site = Site::new(1);
        assert_eq!(site.generate_id(), Id::new(1, 2));
        assert_eq!(site.generate_id(), Id::new(1, 3));
    }

    #[test]
    fn generated_ids_never_collide_with_sentinels() {
        let mut site = Site::new(1);
        let id = site.generate_id();
        assert!(!id.is_sentinel());
        assert!(id > Id::END);
    }

    #[test]
    fn block_reserves_consecutive_clocks() {
        let mut site = Site::new(3);
        let (first, last) = site.generate_id_block(5);
        assert_eq!(first, Id::new(3, 2));
        assert_eq!(last, Id::new(3, 6));

        // The next single ID comes after the whole block.
        assert_eq!(site.generate_id(), Id::new(3, 7));
    }

    #[test]
    fn block_of_one() {
        let mut site = Site::new(2);
        let (first, last) = site.generate_id_block(1);
        assert_eq!(first, last);
    }

    #[test]
    #[should_panic]
    fn site_zero_is_rejected() {
        Site::new(0);
    }

    #[test]
    fn display() {
        assert_eq!(Id::new(4, 17).to_string(), "4:17");
    }
}
