//! Serializable command and query envelopes.
//!
//! A transport (RPC server, message queue, CLI) decodes its own protocol into
//! a [`Command`] or [`Query`] and hands it to the registry together with the
//! authenticated caller. Commands travel as tagged JSON:
//!
//! ```json
//! {"op": "vote", "poll_id": 0, "options": [1]}
//! ```

use crate::event::Record;
use crate::poll::BallotEntry;
use crate::store::Store;
use crate::{AccountId, Error, OptionIndex, PollId, PollSnapshot, Registry};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use tracing::debug;

/// An option index as it arrives in a command.
///
/// Any JSON number decodes. One that is negative, fractional or wider than
/// [`OptionIndex`] names no option, so the registry rejects it with
/// "Invalid option" once the poll-level checks have passed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Choice(Number);

impl From<OptionIndex> for Choice {
    fn from(index: OptionIndex) -> Self {
        Self(index.into())
    }
}

impl BallotEntry for Choice {
    fn option_index(&self) -> Option<OptionIndex> {
        self.0.as_u64()
    }
}

/// A state-changing request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    /// Open a poll owned by the caller.
    CreatePoll {
        title: String,
        question: String,
        options: Vec<String>,
        #[serde(default)]
        is_multiple_choice: bool,
    },
    /// Cast the caller's ballot.
    Vote {
        poll_id: PollId,
        options: Vec<Choice>,
    },
    /// Pause or resume a poll. Creator only.
    TogglePollStatus { poll_id: PollId },
    /// Delete a poll. Creator only.
    DeletePoll { poll_id: PollId },
}

/// A read-only request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Query {
    GetPoll { poll_id: PollId },
    HasVotedInPoll { poll_id: PollId, voter: AccountId },
    GetUserPolls { account: AccountId },
    PollsVotedCount { account: AccountId },
    PollCount,
    /// Retained event records with `seq >= since`, for subscribers catching up.
    Events {
        #[serde(default)]
        since: u64,
    },
}

/// What a successful command produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// The poll the command created or touched.
    pub poll_id: PollId,
    /// The event record the command appended.
    pub record: Record,
}

/// A query result. Serialized bare, without a variant tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Poll(PollSnapshot),
    Flag(bool),
    PollIds(Vec<PollId>),
    Count(u64),
    Events(Vec<Record>),
}

impl<S: Store> Registry<S> {
    pub fn execute(&mut self, caller: &AccountId, command: Command) -> Result<Outcome, Error> {
        debug!(caller = %caller, ?command, "executing command");
        let record = match command {
            Command::CreatePoll {
                title,
                question,
                options,
                is_multiple_choice,
            } => self.create_poll_record(caller, title, question, options, is_multiple_choice)?,
            Command::Vote { poll_id, options } => self.vote_record(caller, poll_id, &options)?,
            Command::TogglePollStatus { poll_id } => self.toggle_record(caller, poll_id)?.0,
            Command::DeletePoll { poll_id } => self.delete_record(caller, poll_id)?,
        };
        Ok(Outcome {
            poll_id: record.event.poll_id(),
            record,
        })
    }

    pub fn query(&self, query: &Query) -> Result<Answer, Error> {
        debug!(?query, "answering query");
        Ok(match query {
            Query::GetPoll { poll_id } => Answer::Poll(self.get_poll(*poll_id)?),
            Query::HasVotedInPoll { poll_id, voter } => {
                Answer::Flag(self.has_voted_in_poll(*poll_id, voter)?)
            }
            Query::GetUserPolls { account } => Answer::PollIds(self.get_user_polls(account)?),
            Query::PollsVotedCount { account } => Answer::Count(self.polls_voted_count(account)?),
            Query::PollCount => Answer::Count(self.poll_count()),
            Query::Events { since } => Answer::Events(self.events().since(*since)),
        })
    }

    /// Decode a JSON command and execute it.
    pub fn execute_json(&mut self, caller: &AccountId, input: &[u8]) -> Result<Outcome, Error> {
        let command: Command = serde_json::from_slice(input)?;
        self.execute(caller, command)
    }

    /// Decode a JSON query and answer it as JSON.
    pub fn query_json(&self, input: &[u8]) -> Result<Vec<u8>, Error> {
        let query: Query = serde_json::from_slice(input)?;
        Ok(serde_json::to_vec(&self.query(&query)?)?)
    }
}
