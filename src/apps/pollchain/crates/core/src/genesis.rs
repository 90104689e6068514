//! Genesis state creation.
//!
//! A fresh store holds only the schema version and the three counters:
//! - the next poll id (0)
//! - the next event sequence number (0)
//! - the event chain head (`Hash::ZERO`)

use crate::store::{keys, read, Mutation, Store};
use crate::{Error, Hash};

/// Layout version written to `meta/schema`.
pub const SCHEMA_VERSION: u32 = 1;

/// Counters read back from a store's `meta/` subtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Meta {
    pub next_poll_id: u64,
    pub event_seq: u64,
    pub event_head: Hash,
}

pub(crate) fn genesis_batch() -> Result<Vec<Mutation>, Error> {
    Ok(vec![
        Mutation::put(keys::schema(), &SCHEMA_VERSION)?,
        Mutation::put(keys::next_poll_id(), &0u64)?,
        Mutation::put(keys::event_seq(), &0u64)?,
        Mutation::put(keys::event_head(), &Hash::ZERO)?,
    ])
}

/// Seed `store` if it is blank, otherwise check its schema. Returns the counters.
pub fn open(store: &mut dyn Store) -> Result<Meta, Error> {
    match read::<u32>(store, &keys::schema())? {
        None => store.apply(genesis_batch()?)?,
        Some(SCHEMA_VERSION) => {}
        Some(found) => {
            return Err(Error::Schema {
                found,
                expected: SCHEMA_VERSION,
            })
        }
    }

    Ok(Meta {
        next_poll_id: read(store, &keys::next_poll_id())?.unwrap_or(0),
        event_seq: read(store, &keys::event_seq())?.unwrap_or(0),
        event_head: read(store, &keys::event_head())?.unwrap_or(Hash::ZERO),
    })
}
