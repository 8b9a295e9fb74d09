//! Shared test fixtures: in-memory fakes for the engine's collaborator
//! contracts plus a virtual clock, so a full round runs without network,
//! disk waits, or real time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use bluequiz::imaging::{CoverageRange, ImagePreparer};
use bluequiz::models::{PostRef, Reply, Round, RoundResult, RoundState};
use bluequiz::services::engine::EngineSettings;
use bluequiz::services::social::{PostImage, SocialClient};
use bluequiz::services::sources::{QuestionSource, TriviaQuestionSource};
use bluequiz::store::{Database, RoundStore, StoredRound};
use bluequiz::utils::clock::Clock;
use bluequiz::utils::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct PublishedPost {
    pub text: String,
    pub image_count: usize,
}

/// Social client fake: records publications and likes, serves canned
/// replies. Clone-able; clones share state for assertions.
#[derive(Clone, Default)]
pub struct FakeSocial {
    pub posts: Arc<Mutex<Vec<PublishedPost>>>,
    pub replies: Arc<Mutex<Vec<Reply>>>,
    pub likes: Arc<Mutex<Vec<PostRef>>>,
    pub removed: Arc<Mutex<Vec<PostRef>>>,
    pub fail_fetch: Arc<AtomicBool>,
}

impl FakeSocial {
    pub fn with_replies(replies: Vec<Reply>) -> Self {
        let fake = Self::default();
        *fake.replies.lock().unwrap() = replies;
        fake
    }

    pub fn published(&self) -> Vec<PublishedPost> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SocialClient for FakeSocial {
    async fn publish(&self, text: &str, images: &[PostImage]) -> Result<PostRef> {
        let mut posts = self.posts.lock().unwrap();
        let n = posts.len();
        posts.push(PublishedPost { text: text.to_string(), image_count: images.len() });
        Ok(PostRef {
            uri: format!("at://fake/app.bsky.feed.post/{n}"),
            cid: format!("cid-{n}"),
        })
    }

    async fn fetch_replies(&self, _post: &PostRef) -> Result<Vec<Reply>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            bail!("thread fetch failed");
        }
        Ok(self.replies.lock().unwrap().clone())
    }

    async fn acknowledge(&self, reply: &Reply) -> Result<()> {
        self.likes.lock().unwrap().push(reply.post.clone());
        Ok(())
    }

    async fn remove_post(&self, post: &PostRef) -> Result<()> {
        self.removed.lock().unwrap().push(post.clone());
        Ok(())
    }
}

/// Round store fake keeping archived rounds in memory.
#[derive(Clone, Default)]
pub struct FakeStore {
    pub rounds: Arc<Mutex<Vec<StoredRound>>>,
}

impl FakeStore {
    pub fn stored(&self) -> Vec<StoredRound> {
        self.rounds.lock().unwrap().clone()
    }
}

impl RoundStore for FakeStore {
    fn record_round(&self, round: &Round) -> Result<()> {
        self.rounds.lock().unwrap().push(StoredRound {
            number: round.number,
            state: round.state,
            answer: round.question.answer.clone(),
            source: round.question.source.clone(),
            post: round.post.clone(),
            percent: None,
            attempts: None,
            created_at: round.started_at,
            ended_at: None,
        });
        Ok(())
    }

    fn finalize_round(
        &self,
        number: i64,
        state: RoundState,
        result: Option<RoundResult>,
        ended_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut rounds = self.rounds.lock().unwrap();
        let Some(stored) = rounds.iter_mut().find(|r| r.number == number) else {
            bail!("round {number} not found");
        };
        stored.state = state;
        stored.percent = result.and_then(|r| r.percentage());
        stored.attempts = result.map(|r| r.attempts);
        stored.ended_at = Some(ended_at);
        Ok(())
    }

    fn last_round(&self) -> Result<Option<StoredRound>> {
        let rounds = self.rounds.lock().unwrap();
        Ok(rounds.iter().max_by_key(|r| r.number).cloned())
    }

    fn purge_round(&self, number: i64) -> Result<()> {
        self.rounds.lock().unwrap().retain(|r| r.number != number);
        Ok(())
    }
}

/// Virtual clock: sleeps return immediately and advance `now` by the
/// requested duration, recording each request.
#[derive(Clone)]
pub struct TestClock {
    pub now: Arc<Mutex<DateTime<Utc>>>,
    pub slept: Arc<Mutex<Vec<Duration>>>,
}

impl TestClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
            slept: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
    }
}

/// Clock whose first sleep fires the cancellation token and then hangs,
/// simulating a shutdown arriving during the reply-window wait.
#[derive(Clone)]
pub struct CancellingClock {
    pub inner: TestClock,
    pub cancel: CancellationToken,
}

#[async_trait]
impl Clock for CancellingClock {
    fn now(&self) -> DateTime<Utc> {
        self.inner.now()
    }

    async fn sleep(&self, _duration: Duration) {
        self.cancel.cancel();
        std::future::pending::<()>().await;
    }
}

pub fn fast_settings() -> EngineSettings {
    EngineSettings {
        round_window: chrono::Duration::minutes(30),
        break_delay: Duration::from_secs(1800),
        cooldown: Duration::from_secs(60),
        threshold: 80,
        source_retry: RetryPolicy {
            max_attempts: 4,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            jitter_max: None,
        },
    }
}

pub fn test_preparer() -> ImagePreparer {
    ImagePreparer::new(1280, 75, CoverageRange::default())
}

pub fn reply(author: &str, text: &str, position: u32) -> Reply {
    Reply {
        author: author.to_string(),
        text: text.to_string(),
        position,
        post: PostRef {
            uri: format!("at://fake/app.bsky.feed.post/reply-{position}"),
            cid: format!("reply-cid-{position}"),
        },
    }
}

/// Trivia source over a temp database seeded with the given questions.
/// Keep the returned directory alive for the duration of the test.
pub fn trivia_source(questions: &[(&str, &str)]) -> (tempfile::TempDir, QuestionSource) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("trivia.db")).unwrap();
    for (prompt, answer) in questions {
        db.insert_question(prompt, answer, "General", "medium", None).unwrap();
    }
    (dir, QuestionSource::Trivia(TriviaQuestionSource::new(db)))
}
