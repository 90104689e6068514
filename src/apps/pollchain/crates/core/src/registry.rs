//! The poll registry: creates polls, counts ballots, and enforces who may
//! change what.
//!
//! Every mutating call follows the same shape: load the records it needs,
//! run every check, build one mutation batch (including the event-chain
//! counters), then apply the batch and append the event. A failed check
//! returns before anything is written.

use crate::error::{
    ALREADY_VOTED, CHOOSE_AT_LEAST_ONE, CHOOSE_EXACTLY_ONE, DUPLICATE_OPTIONS, INVALID_OPTION,
    NO_OPTIONS, ONLY_CREATOR_DELETE, ONLY_CREATOR_TOGGLE, POLL_DOES_NOT_EXIST, POLL_NOT_ACTIVE,
    TEXT_TOO_LONG, TOO_MANY_OPTIONS,
};
use crate::event::{EventLog, Record};
use crate::poll::BallotEntry;
use crate::store::{keys, path, read, MemoryStore, Mutation, Store};
use crate::{
    genesis, AccountId, Clock, Error, Event, Hash, OptionIndex, Poll, PollId, PollSnapshot,
    RegistryConfig,
};
use std::collections::HashSet;
use tracing::{debug, info};

/// The poll registry over a store `S`.
///
/// Not synchronized; wrap it in a [`SharedRegistry`](crate::SharedRegistry)
/// to call it from several threads.
pub struct Registry<S: Store = MemoryStore> {
    store: S,
    /// Source of `created_at`.
    clock: Box<dyn Clock>,
    config: RegistryConfig,
    /// Retained tail of the event chain. Its head and sequence are also
    /// persisted under `meta/`.
    log: EventLog,
    /// Mirror of `meta/next_poll_id`.
    next_poll_id: PollId,
}

impl Registry<MemoryStore> {
    /// A registry over a fresh in-memory store.
    pub fn new(config: RegistryConfig, clock: Box<dyn Clock>) -> Result<Self, Error> {
        Self::with_store(MemoryStore::new(), config, clock)
    }

    /// Serialize the whole store. Events are not part of the snapshot; the
    /// chain head is, so a restored registry keeps extending the same chain.
    pub fn snapshot(&self) -> Result<Vec<u8>, Error> {
        self.store.to_snapshot()
    }

    pub fn restore(
        bytes: &[u8],
        config: RegistryConfig,
        clock: Box<dyn Clock>,
    ) -> Result<Self, Error> {
        Self::with_store(MemoryStore::from_snapshot(bytes)?, config, clock)
    }
}

impl<S: Store> Registry<S> {
    /// Open a registry over `store`, seeding it if blank.
    pub fn with_store(
        mut store: S,
        config: RegistryConfig,
        clock: Box<dyn Clock>,
    ) -> Result<Self, Error> {
        let meta = genesis::open(&mut store)?;
        let log = EventLog::resume(meta.event_seq, meta.event_head, config.events.retain);
        debug!(
            next_poll_id = meta.next_poll_id,
            event_seq = meta.event_seq,
            "registry opened"
        );
        Ok(Self {
            store,
            clock,
            config,
            log,
            next_poll_id: PollId(meta.next_poll_id),
        })
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a poll owned by `caller`. Returns its id.
    pub fn create_poll<T, Q, I, O>(
        &mut self,
        caller: &AccountId,
        title: T,
        question: Q,
        options: I,
        is_multiple_choice: bool,
    ) -> Result<PollId, Error>
    where
        T: Into<String>,
        Q: Into<String>,
        I: IntoIterator<Item = O>,
        O: Into<String>,
    {
        let options: Vec<String> = options.into_iter().map(Into::into).collect();
        self.create_poll_record(caller, title.into(), question.into(), options, is_multiple_choice)
            .map(|record| record.event.poll_id())
    }

    pub(crate) fn create_poll_record(
        &mut self,
        caller: &AccountId,
        title: String,
        question: String,
        options: Vec<String>,
        is_multiple_choice: bool,
    ) -> Result<Record, Error> {
        self.try_create_poll(caller, title, question, options, is_multiple_choice)
            .inspect_err(|e| debug!(op = "create_poll", caller = %caller, kind = ?e.kind(), "rejected: {}", e))
    }

    fn try_create_poll(
        &mut self,
        caller: &AccountId,
        title: String,
        question: String,
        options: Vec<String>,
        is_multiple_choice: bool,
    ) -> Result<Record, Error> {
        if options.is_empty() {
            return Err(Error::InvalidArgument(NO_OPTIONS));
        }
        self.check_limits(&title, &question, &options)?;

        let id = self.next_poll_id;
        let poll = Poll::new(
            id,
            caller.clone(),
            title,
            question,
            options,
            is_multiple_choice,
            self.clock.now(),
        );

        let mut owned = self.get_user_polls(caller)?;
        owned.push(id);

        let batch = vec![
            Mutation::put(keys::poll(id), &poll)?,
            Mutation::put(keys::next_poll_id(), &id.next().0)?,
            Mutation::put(keys::creator_polls(caller), &owned)?,
        ];
        let event = Event::PollCreated {
            id,
            creator: poll.creator,
            title: poll.title,
            question: poll.question,
            options: poll.options,
            is_multiple_choice: poll.is_multiple_choice,
            created_at: poll.created_at,
        };
        let record = self.commit(batch, event)?;
        self.next_poll_id = id.next();

        info!(poll_id = %id, creator = %caller, "poll created");
        Ok(record)
    }

    /// Cast `caller`'s ballot in poll `id`.
    pub fn vote(
        &mut self,
        caller: &AccountId,
        id: PollId,
        chosen: &[OptionIndex],
    ) -> Result<(), Error> {
        self.vote_record(caller, id, chosen).map(|_| ())
    }

    pub(crate) fn vote_record<C: BallotEntry>(
        &mut self,
        caller: &AccountId,
        id: PollId,
        chosen: &[C],
    ) -> Result<Record, Error> {
        self.try_vote(caller, id, chosen)
            .inspect_err(|e| debug!(op = "vote", poll_id = %id, caller = %caller, kind = ?e.kind(), "rejected: {}", e))
    }

    fn try_vote<C: BallotEntry>(
        &mut self,
        caller: &AccountId,
        id: PollId,
        chosen: &[C],
    ) -> Result<Record, Error> {
        let mut poll = self.load_poll(id)?;
        if !poll.active {
            return Err(Error::InvalidState(POLL_NOT_ACTIVE));
        }
        if self.has_voted_in_poll(id, caller)? {
            return Err(Error::AlreadyDone(ALREADY_VOTED));
        }
        let chosen = validate_ballot(&poll, chosen)?;

        poll.record_ballot(&chosen);
        let polls_voted = self.polls_voted_count(caller)? + 1;

        let batch = vec![
            Mutation::put(keys::poll(id), &poll)?,
            Mutation::put(keys::voted(id, caller), &true)?,
            Mutation::put(keys::polls_voted(caller), &polls_voted)?,
        ];
        let event = Event::Voted {
            poll_id: id,
            voter: caller.clone(),
            options: chosen.clone(),
        };
        let record = self.commit(batch, event)?;

        debug!(poll_id = %id, voter = %caller, options = ?chosen, "vote counted");
        Ok(record)
    }

    /// Flip a poll between active and inactive. Creator only.
    ///
    /// Returns the new value of `active`.
    pub fn toggle_poll_status(&mut self, caller: &AccountId, id: PollId) -> Result<bool, Error> {
        self.toggle_record(caller, id).map(|(_, active)| active)
    }

    pub(crate) fn toggle_record(
        &mut self,
        caller: &AccountId,
        id: PollId,
    ) -> Result<(Record, bool), Error> {
        self.try_toggle(caller, id)
            .inspect_err(|e| debug!(op = "toggle_poll_status", poll_id = %id, caller = %caller, kind = ?e.kind(), "rejected: {}", e))
    }

    fn try_toggle(&mut self, caller: &AccountId, id: PollId) -> Result<(Record, bool), Error> {
        let mut poll = self.load_poll(id)?;
        if poll.creator != *caller {
            return Err(Error::PermissionDenied(ONLY_CREATOR_TOGGLE));
        }

        poll.active = !poll.active;
        let active = poll.active;
        let batch = vec![Mutation::put(keys::poll(id), &poll)?];
        let record = self.commit(batch, Event::PollStatusToggled { poll_id: id, active })?;

        info!(poll_id = %id, active, "poll status toggled");
        Ok((record, active))
    }

    /// Remove a poll for good. Creator only.
    ///
    /// The id stays retired. Participation records, voter counters and the
    /// creator's history keep their entries for it.
    pub fn delete_poll(&mut self, caller: &AccountId, id: PollId) -> Result<(), Error> {
        self.delete_record(caller, id).map(|_| ())
    }

    pub(crate) fn delete_record(&mut self, caller: &AccountId, id: PollId) -> Result<Record, Error> {
        self.try_delete(caller, id)
            .inspect_err(|e| debug!(op = "delete_poll", poll_id = %id, caller = %caller, kind = ?e.kind(), "rejected: {}", e))
    }

    fn try_delete(&mut self, caller: &AccountId, id: PollId) -> Result<Record, Error> {
        let poll = self.load_poll(id)?;
        if poll.creator != *caller {
            return Err(Error::PermissionDenied(ONLY_CREATOR_DELETE));
        }

        let batch = vec![Mutation::Delete(keys::poll(id))];
        let record = self.commit(batch, Event::PollDeleted { poll_id: id })?;

        info!(poll_id = %id, "poll deleted");
        Ok(record)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The poll's current state, or "Poll does not exist".
    pub fn get_poll(&self, id: PollId) -> Result<PollSnapshot, Error> {
        Ok(self.load_poll(id)?.snapshot())
    }

    /// Whether `voter` has voted in poll `id`. Never fails on a missing poll.
    pub fn has_voted_in_poll(&self, id: PollId, voter: &AccountId) -> Result<bool, Error> {
        Ok(read(&self.store, &keys::voted(id, voter))?.unwrap_or(false))
    }

    /// Ids of every poll `account` created, oldest first, deleted ones included.
    pub fn get_user_polls(&self, account: &AccountId) -> Result<Vec<PollId>, Error> {
        Ok(read(&self.store, &keys::creator_polls(account))?.unwrap_or_default())
    }

    /// Number of distinct polls `account` has voted in.
    pub fn polls_voted_count(&self, account: &AccountId) -> Result<u64, Error> {
        Ok(read(&self.store, &keys::polls_voted(account))?.unwrap_or(0))
    }

    /// Number of ids ever assigned; the next poll gets this id.
    pub fn poll_count(&self) -> u64 {
        self.next_poll_id.0
    }

    /// Snapshots of every poll that still exists, in id order.
    pub fn polls(&self) -> Result<Vec<PollSnapshot>, Error> {
        let mut polls = Vec::new();
        for p in self.store.enumerate(&path(["polls"])) {
            if let Some(poll) = read::<Poll>(&self.store, &p)? {
                polls.push(poll.snapshot());
            }
        }
        // Keys are strings, so "10" sorts before "2".
        polls.sort_by_key(|p| p.id);
        Ok(polls)
    }

    /// Accounts with a participation record for poll `id`.
    pub fn voters_of(&self, id: PollId) -> Vec<AccountId> {
        self.store
            .enumerate(&path(["voted".to_string(), id.to_string()]))
            .into_iter()
            .filter_map(|p| p.last().cloned().map(AccountId::from))
            .collect()
    }

    /// Content hash of the whole store. Unchanged by rejected calls.
    pub fn state_root(&self) -> Result<Hash, Error> {
        self.store.root()
    }

    /// The retained tail of the event chain.
    pub fn events(&self) -> &EventLog {
        &self.log
    }

    /// Hand retained events to a subscriber, emptying the in-memory log.
    pub fn drain_events(&mut self) -> Vec<Record> {
        self.log.drain()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn load_poll(&self, id: PollId) -> Result<Poll, Error> {
        read(&self.store, &keys::poll(id))?.ok_or(Error::NotFound(POLL_DOES_NOT_EXIST))
    }

    fn check_limits(&self, title: &str, question: &str, options: &[String]) -> Result<(), Error> {
        let limits = &self.config.limits;
        if limits.max_options.is_some_and(|max| options.len() > max) {
            return Err(Error::InvalidArgument(TOO_MANY_OPTIONS));
        }
        if let Some(max) = limits.max_text_bytes {
            let too_long = [title, question]
                .into_iter()
                .chain(options.iter().map(String::as_str))
                .any(|text| text.len() > max);
            if too_long {
                return Err(Error::InvalidArgument(TEXT_TOO_LONG));
            }
        }
        Ok(())
    }

    /// Seal `event`, then write `batch` plus the new chain head in one apply.
    fn commit(&mut self, mut batch: Vec<Mutation>, event: Event) -> Result<Record, Error> {
        let record = self.log.seal(event)?;
        batch.push(Mutation::put(keys::event_seq(), &(record.seq + 1))?);
        batch.push(Mutation::put(keys::event_head(), &record.hash)?);

        self.store.apply(batch)?;
        self.log.append(record.clone());
        Ok(record)
    }
}

/// Shape and range checks for a ballot, in contract order. Returns the
/// chosen indices once every entry names an option.
fn validate_ballot<C: BallotEntry>(
    poll: &Poll,
    chosen: &[C],
) -> Result<Vec<OptionIndex>, Error> {
    if poll.is_multiple_choice {
        if chosen.is_empty() {
            return Err(Error::InvalidArgument(CHOOSE_AT_LEAST_ONE));
        }
        let mut seen = HashSet::with_capacity(chosen.len());
        if !chosen.iter().all(|entry| seen.insert(entry)) {
            return Err(Error::InvalidArgument(DUPLICATE_OPTIONS));
        }
    } else if chosen.len() != 1 {
        return Err(Error::InvalidArgument(CHOOSE_EXACTLY_ONE));
    }

    let count = poll.option_count() as u64;
    chosen
        .iter()
        .map(|entry| match entry.option_index() {
            Some(i) if i < count => Ok(i),
            _ => Err(Error::InvalidArgument(INVALID_OPTION)),
        })
        .collect()
}
