//! Conformance tests for the poll registry.
//!
//! Each test checks one observable property of the registry contract:
//! creation, ballot validation, tallying, access control and deletion.

use pollchain_core::messages::*;
use pollchain_core::{
    AccountId, ErrorKind, Event, ManualClock, PollId, Registry, RegistryConfig,
};
use std::sync::Arc;

// =============================================================================
// Test Utilities
// =============================================================================

const NOW: u64 = 1_700_000_000;

/// Route registry logs through the test harness; `RUST_LOG=debug` shows rejections.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn registry() -> Registry {
    init_tracing();
    Registry::new(RegistryConfig::default(), Box::new(Arc::new(ManualClock::new(NOW)))).unwrap()
}

fn account(name: &str) -> AccountId {
    AccountId::from(name)
}

/// The three sample polls: colors (single), sports (multiple), languages (single).
fn seeded() -> (Registry, AccountId, AccountId) {
    let mut reg = registry();
    let owner = account("owner");
    let voter1 = account("voter1");

    reg.create_poll(
        &voter1,
        "Favorite Color Poll",
        "What is your favorite color?",
        ["Red", "Green", "Blue"],
        false,
    )
    .unwrap();
    reg.create_poll(
        &owner,
        "Favorite Sports Poll",
        "Name your favorite sports",
        ["Soccer", "Equestrian", "Basketball", "Tennis"],
        true,
    )
    .unwrap();
    reg.create_poll(
        &voter1,
        "Favorite Programming Language Poll",
        "What is your favorite programming language?",
        ["Python", "JavaScript", "Java", "C++"],
        false,
    )
    .unwrap();

    (reg, owner, voter1)
}

fn last_event(reg: &Registry) -> Event {
    reg.events().records().last().expect("an event was emitted").event.clone()
}

// =============================================================================
// Creation
// =============================================================================

/// Option-count invariant
#[test]
fn tallies_match_options() {
    let (mut reg, _, _) = seeded();
    reg.vote(&account("x"), PollId(1), &[0, 3]).unwrap();

    for poll in reg.polls().unwrap() {
        assert_eq!(poll.option_votes.len(), poll.options.len(), "poll {}", poll.id);
    }
}

/// Creation validation
#[test]
fn create_requires_an_option() {
    let mut reg = registry();
    let err = reg
        .create_poll(&account("a"), "Invalid Title", "Invalid poll", Vec::<String>::new(), false)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.to_string(), NO_OPTIONS);
    assert_eq!(reg.poll_count(), 0);
    assert!(reg.events().is_empty());
}

#[test]
fn create_assigns_fresh_sequential_ids() {
    let mut reg = registry();
    let creator = account("creator");

    for expected in 0..5 {
        let id = reg.create_poll(&creator, "t", "q", ["only"], expected % 2 == 0).unwrap();
        assert_eq!(id, PollId(expected));

        let poll = reg.get_poll(id).unwrap();
        assert!(poll.active);
        assert_eq!(poll.voter_count, 0);
        assert_eq!(poll.option_votes, vec![0]);
        assert_eq!(poll.created_at, NOW);
    }
}

#[test]
fn create_emits_poll_created() {
    let mut reg = registry();
    let voter1 = account("voter1");
    reg.create_poll(
        &voter1,
        "Favorite Color Poll",
        "What is your favorite color?",
        ["Red", "Green", "Blue"],
        false,
    )
    .unwrap();

    assert_eq!(
        last_event(&reg),
        Event::PollCreated {
            id: PollId(0),
            creator: voter1,
            title: "Favorite Color Poll".into(),
            question: "What is your favorite color?".into(),
            options: vec!["Red".into(), "Green".into(), "Blue".into()],
            is_multiple_choice: false,
            created_at: NOW,
        }
    );
}

#[test]
fn user_polls_track_creation_order() {
    let (reg, owner, voter1) = seeded();

    assert_eq!(reg.get_user_polls(&voter1).unwrap(), vec![PollId(0), PollId(2)]);
    assert_eq!(reg.get_user_polls(&owner).unwrap(), vec![PollId(1)]);
    assert!(reg.get_user_polls(&account("nobody")).unwrap().is_empty());
}

#[test]
fn get_missing_poll_fails() {
    let (reg, _, _) = seeded();
    let err = reg.get_poll(PollId(999)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), POLL_DOES_NOT_EXIST);
}

// =============================================================================
// Voting
// =============================================================================

/// Single vote per voter
#[test]
fn second_vote_is_rejected() {
    let (mut reg, _, _) = seeded();
    let voter2 = account("voter2");
    reg.vote(&voter2, PollId(0), &[0]).unwrap();
    let before = reg.get_poll(PollId(0)).unwrap();

    let err = reg.vote(&voter2, PollId(0), &[1]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyDone);
    assert_eq!(err.to_string(), ALREADY_VOTED);
    assert_eq!(reg.get_poll(PollId(0)).unwrap(), before);
    assert_eq!(reg.polls_voted_count(&voter2).unwrap(), 1);
}

/// Shape enforcement
#[test]
fn single_choice_needs_exactly_one() {
    let (mut reg, _, _) = seeded();
    let v = account("v");

    let ballots: [&[u64]; 3] = [&[], &[0, 1], &[0, 1, 2]];
    for ballot in ballots {
        let err = reg.vote(&v, PollId(0), ballot).unwrap_err();
        assert_eq!(err.to_string(), CHOOSE_EXACTLY_ONE, "ballot {:?}", ballot);
    }
    assert!(!reg.has_voted_in_poll(PollId(0), &v).unwrap());
}

#[test]
fn multiple_choice_rejects_empty_and_duplicates() {
    let (mut reg, _, _) = seeded();
    let v = account("v");

    let err = reg.vote(&v, PollId(1), &[]).unwrap_err();
    assert_eq!(err.to_string(), CHOOSE_AT_LEAST_ONE);

    let err = reg.vote(&v, PollId(1), &[0, 0]).unwrap_err();
    assert_eq!(err.to_string(), DUPLICATE_OPTIONS);

    // Shape is checked before range.
    let err = reg.vote(&v, PollId(1), &[9, 9]).unwrap_err();
    assert_eq!(err.to_string(), DUPLICATE_OPTIONS);

    assert_eq!(reg.get_poll(PollId(1)).unwrap().voter_count, 0);
}

/// Range enforcement
#[test]
fn out_of_range_index_is_rejected() {
    let (mut reg, _, _) = seeded();
    let v = account("v");

    let err = reg.vote(&v, PollId(0), &[3]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.to_string(), INVALID_OPTION);

    let err = reg.vote(&v, PollId(1), &[0, 4]).unwrap_err();
    assert_eq!(err.to_string(), INVALID_OPTION);
    assert_eq!(reg.get_poll(PollId(1)).unwrap().option_votes, vec![0, 0, 0, 0]);
}

/// Tally correctness
#[test]
fn vote_increments_chosen_options_only() {
    let (mut reg, _, _) = seeded();
    reg.vote(&account("a"), PollId(1), &[3, 1]).unwrap();
    reg.vote(&account("b"), PollId(1), &[1]).unwrap();

    let poll = reg.get_poll(PollId(1)).unwrap();
    assert_eq!(poll.option_votes, vec![0, 2, 0, 1]);
    assert_eq!(poll.voter_count, 2);
}

#[test]
fn vote_checks_run_in_contract_order() {
    let (mut reg, _, voter1) = seeded();
    let v = account("v");
    reg.vote(&v, PollId(0), &[0]).unwrap();
    reg.toggle_poll_status(&voter1, PollId(0)).unwrap();

    // Inactive beats already-voted, which beats a malformed ballot.
    let err = reg.vote(&v, PollId(0), &[7, 7]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    reg.toggle_poll_status(&voter1, PollId(0)).unwrap();
    let err = reg.vote(&v, PollId(0), &[7, 7]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyDone);

    let err = reg.vote(&v, PollId(42), &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn participation_is_tracked_per_poll() {
    let (mut reg, _, _) = seeded();
    let voter2 = account("voter2");
    let voter3 = account("voter3");
    reg.vote(&voter2, PollId(0), &[0]).unwrap();
    reg.vote(&voter3, PollId(1), &[0, 2]).unwrap();

    assert!(reg.has_voted_in_poll(PollId(0), &voter2).unwrap());
    assert!(!reg.has_voted_in_poll(PollId(1), &voter2).unwrap());
    assert!(!reg.has_voted_in_poll(PollId(0), &voter3).unwrap());
    assert!(reg.has_voted_in_poll(PollId(1), &voter3).unwrap());
    assert!(!reg.has_voted_in_poll(PollId(500), &voter3).unwrap());

    reg.vote(&voter2, PollId(2), &[3]).unwrap();
    assert_eq!(reg.polls_voted_count(&voter2).unwrap(), 2);
    assert_eq!(reg.polls_voted_count(&voter3).unwrap(), 1);
    assert_eq!(reg.polls_voted_count(&account("idle")).unwrap(), 0);
}

#[test]
fn vote_emits_voted() {
    let (mut reg, _, _) = seeded();
    let voter3 = account("voter3");
    reg.vote(&voter3, PollId(1), &[0, 2]).unwrap();

    assert_eq!(
        last_event(&reg),
        Event::Voted {
            poll_id: PollId(1),
            voter: voter3,
            options: vec![0, 2],
        }
    );
}

// =============================================================================
// Access control
// =============================================================================

/// Access control
#[test]
fn only_creator_may_toggle_or_delete() {
    let (mut reg, owner, _) = seeded();
    let root = reg.state_root().unwrap();

    let err = reg.toggle_poll_status(&owner, PollId(0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert_eq!(err.to_string(), ONLY_CREATOR_TOGGLE);

    let err = reg.delete_poll(&owner, PollId(0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert_eq!(err.to_string(), ONLY_CREATOR_DELETE);

    assert_eq!(reg.state_root().unwrap(), root);
    assert!(reg.get_poll(PollId(0)).unwrap().active);
}

#[test]
fn toggle_on_missing_poll_is_not_found() {
    let (mut reg, owner, _) = seeded();
    let err = reg.toggle_poll_status(&owner, PollId(77)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn toggle_emits_new_status() {
    let (mut reg, _, voter1) = seeded();

    assert!(!reg.toggle_poll_status(&voter1, PollId(0)).unwrap());
    assert_eq!(
        last_event(&reg),
        Event::PollStatusToggled { poll_id: PollId(0), active: false }
    );
    assert!(!reg.get_poll(PollId(0)).unwrap().active);

    assert!(reg.toggle_poll_status(&voter1, PollId(0)).unwrap());
    assert_eq!(
        last_event(&reg),
        Event::PollStatusToggled { poll_id: PollId(0), active: true }
    );
}

// =============================================================================
// Deletion
// =============================================================================

/// Deletion finality
#[test]
fn deleted_id_is_retired() {
    let (mut reg, owner, _) = seeded();
    let voter = account("voter");
    reg.vote(&voter, PollId(1), &[1]).unwrap();
    reg.delete_poll(&owner, PollId(1)).unwrap();

    assert_eq!(reg.get_poll(PollId(1)).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(reg.vote(&account("late"), PollId(1), &[0]).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(reg.toggle_poll_status(&owner, PollId(1)).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(reg.delete_poll(&owner, PollId(1)).unwrap_err().kind(), ErrorKind::NotFound);

    let next = reg.create_poll(&owner, "t", "q", ["a"], false).unwrap();
    assert_eq!(next, PollId(3));
    assert_eq!(reg.poll_count(), 4);

    // Auxiliary records outlive the poll.
    assert_eq!(reg.get_user_polls(&owner).unwrap(), vec![PollId(1), PollId(3)]);
    assert!(reg.has_voted_in_poll(PollId(1), &voter).unwrap());
    assert_eq!(reg.polls_voted_count(&voter).unwrap(), 1);
}

// =============================================================================
// End-to-end flows
// =============================================================================

#[test]
fn single_choice_vote_is_counted() {
    let mut reg = registry();
    let id = reg
        .create_poll(&account("creator"), "Colors", "Pick one", ["Red", "Green", "Blue"], false)
        .unwrap();
    reg.vote(&account("X"), id, &[0]).unwrap();

    let poll = reg.get_poll(id).unwrap();
    assert_eq!(poll.option_votes, vec![1, 0, 0]);
    assert_eq!(poll.voter_count, 1);
}

#[test]
fn multiple_choice_vote_then_retry() {
    let mut reg = registry();
    let y = account("Y");
    let id = reg
        .create_poll(&account("creator"), "Sports", "Pick any", ["a", "b", "c", "d"], true)
        .unwrap();
    reg.vote(&y, id, &[0, 2]).unwrap();
    assert_eq!(reg.get_poll(id).unwrap().option_votes, vec![1, 0, 1, 0]);

    let err = reg.vote(&y, id, &[1]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyDone);
    assert_eq!(reg.get_poll(id).unwrap().option_votes, vec![1, 0, 1, 0]);
}

#[test]
fn inactive_poll_refuses_votes() {
    let mut reg = registry();
    let creator = account("creator");
    let id = reg.create_poll(&creator, "t", "q", ["a", "b"], false).unwrap();

    reg.toggle_poll_status(&creator, id).unwrap();
    let err = reg.vote(&account("v"), id, &[0]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(err.to_string(), POLL_NOT_ACTIVE);

    reg.toggle_poll_status(&creator, id).unwrap();
    reg.vote(&account("v"), id, &[0]).unwrap();
    assert_eq!(reg.get_poll(id).unwrap().voter_count, 1);
}

#[test]
fn delete_is_observed() {
    let mut reg = registry();
    let creator = account("creator");
    let id = reg.create_poll(&creator, "t", "q", ["a"], false).unwrap();

    reg.delete_poll(&creator, id).unwrap();
    assert_eq!(last_event(&reg), Event::PollDeleted { poll_id: id });
    assert_eq!(reg.get_poll(id).unwrap_err().to_string(), POLL_DOES_NOT_EXIST);
}

#[test]
fn event_log_is_a_verifiable_chain() {
    let (mut reg, owner, voter1) = seeded();
    reg.vote(&owner, PollId(0), &[2]).unwrap();
    reg.toggle_poll_status(&voter1, PollId(2)).unwrap();
    reg.delete_poll(&owner, PollId(1)).unwrap();

    let records = reg.drain_events();
    assert_eq!(records.len(), 6);
    assert!(pollchain_core::event::verify_chain(pollchain_core::Hash::ZERO, &records));
    assert_eq!(records.last().unwrap().hash, reg.events().head());
}
