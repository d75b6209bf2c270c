//! Operation catalogue.
//!
//! The catalogue is the single list of operations a connection may invoke,
//! and the authorization boundary: operations not named here do not exist as
//! far as the router is concerned, and only the mutations listed here are
//! ever offered to remote devices. Host-only work (round initialization,
//! imports) stays out of the catalogue on purpose.

/// Operation names as they appear on the wire.
pub mod ops {
    pub const GET_POOLS: &str = "get_pools";
    pub const GET_BOUTS_FOR_POOL: &str = "get_bouts_for_pool";
    pub const GET_OFFICIALS: &str = "get_officials";
    pub const GET_REFEREES: &str = "get_referees";
    pub const UPDATE_BOUT_SCORES: &str = "update_bout_scores";
    pub const ADD_OFFICIAL: &str = "add_official";
    pub const REMOVE_OFFICIAL: &str = "remove_official";
    pub const ADD_REFEREE: &str = "add_referee";
    pub const REMOVE_REFEREE: &str = "remove_referee";
}

/// Push topics, keyed by the entity family a mutation touches.
pub mod topics {
    pub const BOUTS: &str = "bouts:pool";
    pub const OFFICIALS: &str = "officials";
    pub const REFEREES: &str = "referees";
}

/// What an operation does to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Read,
    /// Requires roster authorization; broadcasts on `topic` when applied.
    Mutation { topic: &'static str },
}

/// Catalogue lookup. `None` means the operation does not exist.
pub fn lookup(op: &str) -> Option<OpKind> {
    use ops::*;
    match op {
        GET_POOLS | GET_BOUTS_FOR_POOL | GET_OFFICIALS | GET_REFEREES => Some(OpKind::Read),
        UPDATE_BOUT_SCORES => Some(OpKind::Mutation {
            topic: topics::BOUTS,
        }),
        ADD_OFFICIAL | REMOVE_OFFICIAL => Some(OpKind::Mutation {
            topic: topics::OFFICIALS,
        }),
        ADD_REFEREE | REMOVE_REFEREE => Some(OpKind::Mutation {
            topic: topics::REFEREES,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_reads() {
        assert_eq!(lookup(ops::GET_POOLS), Some(OpKind::Read));
        assert_eq!(lookup(ops::GET_BOUTS_FOR_POOL), Some(OpKind::Read));
    }

    #[test]
    fn score_updates_broadcast_on_bout_topic() {
        assert_eq!(
            lookup(ops::UPDATE_BOUT_SCORES),
            Some(OpKind::Mutation {
                topic: topics::BOUTS
            })
        );
    }

    #[test]
    fn unlisted_operations_do_not_exist() {
        assert_eq!(lookup("initialize_round"), None);
        assert_eq!(lookup(""), None);
    }
}
