//! Thread-safe registry handle.
//!
//! Every call, reads included, takes the same lock for its whole duration,
//! so calls from different threads behave as if they ran one after another.

use crate::command::{Answer, Command, Outcome, Query};
use crate::event::Record;
use crate::store::{MemoryStore, Store};
use crate::{AccountId, Error, OptionIndex, PollId, PollSnapshot, Registry};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A cloneable handle to one [`Registry`]. Clones share the same state.
pub struct SharedRegistry<S: Store = MemoryStore> {
    inner: Arc<Mutex<Registry<S>>>,
}

impl<S: Store> Clone for SharedRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store> SharedRegistry<S> {
    /// Take ownership of `registry`.
    pub fn new(registry: Registry<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Run `f` with exclusive access to the registry.
    ///
    /// A panic in another holder cannot leave a half-applied batch behind,
    /// so a poisoned lock is simply taken over.
    pub fn with<T>(&self, f: impl FnOnce(&mut Registry<S>) -> T) -> T {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Registry<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// See [`Registry::create_poll`].
    pub fn create_poll(
        &self,
        caller: &AccountId,
        title: &str,
        question: &str,
        options: &[&str],
        is_multiple_choice: bool,
    ) -> Result<PollId, Error> {
        self.lock()
            .create_poll(caller, title, question, options.iter().copied(), is_multiple_choice)
    }

    /// See [`Registry::vote`].
    pub fn vote(&self, caller: &AccountId, id: PollId, chosen: &[OptionIndex]) -> Result<(), Error> {
        self.lock().vote(caller, id, chosen)
    }

    /// See [`Registry::toggle_poll_status`]. Returns the new `active` value.
    pub fn toggle_poll_status(&self, caller: &AccountId, id: PollId) -> Result<bool, Error> {
        self.lock().toggle_poll_status(caller, id)
    }

    /// See [`Registry::delete_poll`].
    pub fn delete_poll(&self, caller: &AccountId, id: PollId) -> Result<(), Error> {
        self.lock().delete_poll(caller, id)
    }

    /// See [`Registry::get_poll`].
    pub fn get_poll(&self, id: PollId) -> Result<PollSnapshot, Error> {
        self.lock().get_poll(id)
    }

    /// See [`Registry::has_voted_in_poll`].
    pub fn has_voted_in_poll(&self, id: PollId, voter: &AccountId) -> Result<bool, Error> {
        self.lock().has_voted_in_poll(id, voter)
    }

    /// See [`Registry::get_user_polls`].
    pub fn get_user_polls(&self, account: &AccountId) -> Result<Vec<PollId>, Error> {
        self.lock().get_user_polls(account)
    }

    /// See [`Registry::polls_voted_count`].
    pub fn polls_voted_count(&self, account: &AccountId) -> Result<u64, Error> {
        self.lock().polls_voted_count(account)
    }

    /// See [`Registry::poll_count`].
    pub fn poll_count(&self) -> u64 {
        self.lock().poll_count()
    }

    /// Dispatch a decoded command as `caller`.
    pub fn execute(&self, caller: &AccountId, command: Command) -> Result<Outcome, Error> {
        self.lock().execute(caller, command)
    }

    /// Answer a decoded query.
    pub fn query(&self, query: &Query) -> Result<Answer, Error> {
        self.lock().query(query)
    }

    /// See [`Registry::drain_events`].
    pub fn drain_events(&self) -> Vec<Record> {
        self.lock().drain_events()
    }
}
