//! Domain events and the append-only event log.
//!
//! Every successful mutation emits exactly one [`Event`]. The registry seals
//! it into a [`Record`] carrying a sequence number and a hash chained over
//! the previous record, so a subscriber holding the last head it saw can
//! check that nothing was dropped or rewritten.

use crate::{AccountId, Error, Hash, OptionIndex, PollId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A change the registry accepted. Serialized with a `type` tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A poll was opened with zeroed tallies.
    PollCreated {
        id: PollId,
        creator: AccountId,
        title: String,
        question: String,
        options: Vec<String>,
        is_multiple_choice: bool,
        created_at: Timestamp,
    },
    /// A ballot was counted; `options` are the chosen indices as submitted.
    Voted {
        poll_id: PollId,
        voter: AccountId,
        options: Vec<OptionIndex>,
    },
    /// `active` is the status after the toggle.
    PollStatusToggled {
        poll_id: PollId,
        active: bool,
    },
    PollDeleted {
        poll_id: PollId,
    },
}

impl Event {
    /// The poll this event concerns.
    pub fn poll_id(&self) -> PollId {
        match self {
            Event::PollCreated { id, .. } => *id,
            Event::Voted { poll_id, .. }
            | Event::PollStatusToggled { poll_id, .. }
            | Event::PollDeleted { poll_id } => *poll_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::PollCreated { .. } => "PollCreated",
            Event::Voted { .. } => "Voted",
            Event::PollStatusToggled { .. } => "PollStatusToggled",
            Event::PollDeleted { .. } => "PollDeleted",
        }
    }
}

/// A sequenced, hash-chained event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Position in the chain, starting at 0 and never reused.
    pub seq: u64,
    pub event: Event,
    /// `H(previous hash || cbor(seq, event))`.
    pub hash: Hash,
}

impl Record {
    fn link(prev: &Hash, seq: u64, event: &Event) -> Result<Hash, Error> {
        let mut payload = Vec::new();
        ciborium::into_writer(&(seq, event), &mut payload)?;
        Ok(Hash::chain(prev, &payload))
    }
}

/// Check that `records` extend the chain whose head was `prev`.
pub fn verify_chain(prev: Hash, records: &[Record]) -> bool {
    let mut head = prev;
    let mut expected_seq = None;
    for record in records {
        if expected_seq.is_some_and(|s| s != record.seq) {
            return false;
        }
        match Record::link(&head, record.seq, &record.event) {
            Ok(h) if h == record.hash => head = h,
            _ => return false,
        }
        expected_seq = Some(record.seq + 1);
    }
    true
}

/// In-memory tail of the event stream.
#[derive(Debug, Default)]
pub struct EventLog {
    records: VecDeque<Record>,
    retain: Option<usize>,
    next_seq: u64,
    head: Hash,
}

impl EventLog {
    /// Continue a chain at `next_seq` whose last hash was `head`.
    pub fn resume(next_seq: u64, head: Hash, retain: Option<usize>) -> Self {
        Self {
            records: VecDeque::new(),
            retain,
            next_seq,
            head,
        }
    }

    /// Compute the record `event` would become, without appending it.
    pub(crate) fn seal(&self, event: Event) -> Result<Record, Error> {
        let hash = Record::link(&self.head, self.next_seq, &event)?;
        Ok(Record {
            seq: self.next_seq,
            event,
            hash,
        })
    }

    pub(crate) fn append(&mut self, record: Record) {
        self.head = record.hash;
        self.next_seq = record.seq + 1;
        self.records.push_back(record);
        if let Some(limit) = self.retain {
            while self.records.len() > limit {
                self.records.pop_front();
            }
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Retained records with `seq >= from`.
    pub fn since(&self, from: u64) -> Vec<Record> {
        self.records.iter().filter(|r| r.seq >= from).cloned().collect()
    }

    /// Remove and return every retained record.
    pub fn drain(&mut self) -> Vec<Record> {
        self.records.drain(..).collect()
    }

    pub fn head(&self) -> Hash {
        self.head
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
