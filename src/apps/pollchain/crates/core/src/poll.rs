//! Poll records.

use crate::{AccountId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequential poll identifier. Assigned once, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollId(pub u64);

impl PollId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of an option within its poll.
pub type OptionIndex = u64;

/// One entry of a submitted ballot.
///
/// Transports may carry numbers that can never name an option (negative,
/// fractional, wider than [`OptionIndex`]). Those still take part in the
/// shape checks and are rejected by the range check like any other index
/// past the end.
pub(crate) trait BallotEntry: Eq + std::hash::Hash {
    /// The index this entry names, or `None` if it names no option at all.
    fn option_index(&self) -> Option<OptionIndex>;
}

impl BallotEntry for OptionIndex {
    fn option_index(&self) -> Option<OptionIndex> {
        Some(*self)
    }
}

/// A poll as stored at `polls/<id>`.
///
/// `options` and `option_votes` are sized together at creation and never
/// resized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: PollId,
    /// Account that created the poll; the only one allowed to toggle or delete it.
    pub creator: AccountId,
    pub title: String,
    pub question: String,
    /// Option labels, in the order ballots refer to them.
    pub options: Vec<String>,
    /// Tally per option, same length as `options`.
    pub option_votes: Vec<u64>,
    /// Whether a ballot may name several options.
    pub is_multiple_choice: bool,
    /// Number of accepted ballots.
    pub voter_count: u64,
    /// Ballots are accepted only while this is set.
    pub active: bool,
    /// Clock reading at creation, unix seconds.
    pub created_at: Timestamp,
}

impl Poll {
    pub fn new(
        id: PollId,
        creator: AccountId,
        title: String,
        question: String,
        options: Vec<String>,
        is_multiple_choice: bool,
        created_at: Timestamp,
    ) -> Self {
        let option_votes = vec![0; options.len()];
        Self {
            id,
            creator,
            title,
            question,
            options,
            option_votes,
            is_multiple_choice,
            voter_count: 0,
            active: true,
            created_at,
        }
    }

    /// Number of options the poll was created with.
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    /// Count one ballot. Indices must already be validated.
    pub(crate) fn record_ballot(&mut self, chosen: &[OptionIndex]) {
        for &i in chosen {
            self.option_votes[i as usize] += 1;
        }
        self.voter_count += 1;
    }

    /// Copy out the read-side view.
    pub fn snapshot(&self) -> PollSnapshot {
        PollSnapshot {
            id: self.id,
            creator: self.creator.clone(),
            title: self.title.clone(),
            question: self.question.clone(),
            options: self.options.clone(),
            option_votes: self.option_votes.clone(),
            is_multiple_choice: self.is_multiple_choice,
            voter_count: self.voter_count,
            active: self.active,
            created_at: self.created_at,
        }
    }
}

/// Read-only view returned by `get_poll`. Fields mirror [`Poll`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSnapshot {
    pub id: PollId,
    pub creator: AccountId,
    pub title: String,
    pub question: String,
    pub options: Vec<String>,
    pub option_votes: Vec<u64>,
    pub is_multiple_choice: bool,
    pub voter_count: u64,
    pub active: bool,
    pub created_at: Timestamp,
}
