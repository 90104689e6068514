//! pollchain-core: the poll registry state machine.
//!
//! Anyone can open a poll with a fixed list of options; each account casts
//! at most one ballot per poll, and only a poll's creator can pause or delete
//! it. The crate provides:
//! - `Registry`: the state machine, over any `Store`
//! - `SharedRegistry`: the same operations behind one lock
//! - `Event` / `Record`: the hash-chained log of applied changes
//! - `Command` / `Query`: serializable envelopes for transports

mod account;
mod clock;
mod config;
mod error;
mod hash;
mod poll;
mod registry;
mod shared;
pub mod command;
pub mod event;
pub mod genesis;
pub mod store;

pub use account::AccountId;
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use config::{EventConfig, LimitsConfig, RegistryConfig};
pub use error::{Error, ErrorKind};
pub use event::{Event, EventLog, Record};
pub use hash::Hash;
pub use poll::{OptionIndex, Poll, PollId, PollSnapshot};
pub use registry::Registry;
pub use shared::SharedRegistry;
pub use store::{MemoryStore, Mutation, Store};

/// Contract messages carried by rejections.
pub mod messages {
    pub use crate::error::{
        ALREADY_VOTED, CHOOSE_AT_LEAST_ONE, CHOOSE_EXACTLY_ONE, DUPLICATE_OPTIONS,
        INVALID_OPTION, NO_OPTIONS, ONLY_CREATOR_DELETE, ONLY_CREATOR_TOGGLE,
        POLL_DOES_NOT_EXIST, POLL_NOT_ACTIVE, TEXT_TOO_LONG, TOO_MANY_OPTIONS,
    };
}
