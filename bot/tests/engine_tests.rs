mod common;

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use bluequiz::error::BotError;
use bluequiz::models::{PostRef, RoundState};
use bluequiz::services::engine::RoundEngine;
use bluequiz::store::StoredRound;

use common::{
    fast_settings, reply, test_preparer, trivia_source, CancellingClock, FakeSocial, FakeStore,
    TestClock,
};

#[tokio::test]
async fn full_round_publishes_scores_and_archives() {
    let (_dir, source) = trivia_source(&[("Guess the movie!", "The Matrix")]);
    let social = FakeSocial::with_replies(vec![
        reply("alice.test", "the matrix", 1),
        reply("bob.test", "teh matrx", 2),
        reply("carol.test", "The Matrix!!!", 3),
        reply("dave.test", "Inception", 4),
        reply("erin.test", "no idea", 5),
    ]);
    let store = FakeStore::default();
    let clock = TestClock::new(Utc::now());
    let mut engine = RoundEngine::new(
        social.clone(),
        store.clone(),
        clock.clone(),
        vec![source],
        test_preparer(),
        fast_settings(),
        CancellationToken::new(),
    );

    engine.run_round().await.unwrap();

    let posts = social.published();
    assert_eq!(posts.len(), 2, "announcement and results");
    assert!(posts[0].text.contains("Round #1"));
    assert!(posts[0].text.contains("Guess the movie!"));
    assert_eq!(posts[0].image_count, 0);
    assert!(posts[1].text.contains("60% guessed it"), "got: {}", posts[1].text);
    assert!(posts[1].text.contains("The answer was: The Matrix."));

    // Three replies clear the threshold and get acknowledged.
    assert_eq!(social.likes.lock().unwrap().len(), 3);

    let stored = store.stored();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].state, RoundState::ResultsPublished);
    assert_eq!(stored[0].percent, Some(60));
    assert_eq!(stored[0].attempts, Some(5));
    assert!(stored[0].ended_at.is_some());

    // The reply window elapsed on the virtual clock, not in real time.
    assert!(clock
        .slept
        .lock()
        .unwrap()
        .iter()
        .any(|d| *d == Duration::from_secs(30 * 60)));
}

#[tokio::test]
async fn zero_replies_skip_results_publication() {
    let (_dir, source) = trivia_source(&[("Capital of France?", "Paris")]);
    let social = FakeSocial::default();
    let store = FakeStore::default();
    let mut engine = RoundEngine::new(
        social.clone(),
        store.clone(),
        TestClock::new(Utc::now()),
        vec![source],
        test_preparer(),
        fast_settings(),
        CancellationToken::new(),
    );

    engine.run_round().await.unwrap();

    // Only the announcement went out; no numeric result was published.
    assert_eq!(social.published().len(), 1);
    assert!(social.likes.lock().unwrap().is_empty());

    let stored = store.stored();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].attempts, Some(0));
    assert_eq!(stored[0].percent, None);
    assert!(stored[0].ended_at.is_some());
}

#[tokio::test]
async fn exhausted_sources_leave_no_trace() {
    let (_dir, empty) = trivia_source(&[]);
    let social = FakeSocial::default();
    let store = FakeStore::default();
    let mut engine = RoundEngine::new(
        social.clone(),
        store.clone(),
        TestClock::new(Utc::now()),
        vec![empty],
        test_preparer(),
        fast_settings(),
        CancellationToken::new(),
    );

    match engine.run_round().await {
        Err(BotError::NoEligibleQuestion) => {}
        other => panic!("expected NoEligibleQuestion, got {other:?}"),
    }

    assert!(social.published().is_empty());
    assert!(store.stored().is_empty());
}

#[tokio::test]
async fn selection_retries_other_variants() {
    // One variant is empty; with a generous attempt budget the seeded
    // variant is always reached.
    let (_dir_a, empty) = trivia_source(&[]);
    let (_dir_b, seeded) = trivia_source(&[("Q?", "Answer")]);
    let social = FakeSocial::with_replies(vec![reply("alice.test", "answer", 1)]);
    let store = FakeStore::default();
    let mut settings = fast_settings();
    settings.source_retry.max_attempts = 32;

    let mut engine = RoundEngine::new(
        social.clone(),
        store.clone(),
        TestClock::new(Utc::now()),
        vec![empty, seeded],
        test_preparer(),
        settings,
        CancellationToken::new(),
    );

    engine.run_round().await.unwrap();
    assert_eq!(store.stored()[0].percent, Some(100));
}

#[tokio::test]
async fn collaborator_failure_withdraws_the_round() {
    let (_dir, source) = trivia_source(&[("Q?", "Answer")]);
    let social = FakeSocial::default();
    social.fail_fetch.store(true, std::sync::atomic::Ordering::SeqCst);
    let store = FakeStore::default();
    let mut engine = RoundEngine::new(
        social.clone(),
        store.clone(),
        TestClock::new(Utc::now()),
        vec![source],
        test_preparer(),
        fast_settings(),
        CancellationToken::new(),
    );

    match engine.run_round().await {
        Err(BotError::Collaborator(_)) => {}
        other => panic!("expected Collaborator error, got {other:?}"),
    }

    // The announcement was published, then withdrawn, and the archived
    // row purged: the failed round leaves no public artifact.
    assert_eq!(social.published().len(), 1);
    let removed = social.removed.lock().unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].uri, "at://fake/app.bsky.feed.post/0");
    assert!(store.stored().is_empty());
}

#[tokio::test]
async fn shutdown_during_the_reply_window_exits_promptly() {
    let (_dir, source) = trivia_source(&[("Q?", "Answer")]);
    let social = FakeSocial::default();
    let store = FakeStore::default();
    let cancel = CancellationToken::new();
    let clock = CancellingClock {
        inner: TestClock::new(Utc::now()),
        cancel: cancel.clone(),
    };
    let mut engine = RoundEngine::new(
        social.clone(),
        store.clone(),
        clock,
        vec![source],
        test_preparer(),
        fast_settings(),
        cancel.clone(),
    );

    engine.run_round().await.unwrap();

    // The round stays published and un-finalized; startup recovery
    // handles it on the next boot.
    assert_eq!(social.published().len(), 1);
    let stored = store.stored();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].ended_at.is_none());
    assert!(cancel.is_cancelled());
}

#[tokio::test]
async fn startup_recovery_cleans_dangling_round() {
    let (_dir, source) = trivia_source(&[("Q?", "Answer")]);
    let social = FakeSocial::default();
    let store = FakeStore::default();
    let dangling = PostRef { uri: "at://fake/app.bsky.feed.post/old".to_string(), cid: "old-cid".to_string() };
    store.rounds.lock().unwrap().push(StoredRound {
        number: 3,
        state: RoundState::Collecting,
        answer: "Lost Answer".to_string(),
        source: "General Trivia".to_string(),
        post: Some(dangling.clone()),
        percent: None,
        attempts: None,
        created_at: Utc::now(),
        ended_at: None,
    });

    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut engine = RoundEngine::new(
        social.clone(),
        store.clone(),
        TestClock::new(Utc::now()),
        vec![source],
        test_preparer(),
        fast_settings(),
        cancel,
    );

    // Pre-cancelled: recovery runs, then the loop exits before any round.
    engine.run().await.unwrap();

    let removed = social.removed.lock().unwrap().clone();
    assert_eq!(removed, vec![dangling]);
    assert!(store.stored().is_empty());
    assert!(social.published().is_empty());
}
