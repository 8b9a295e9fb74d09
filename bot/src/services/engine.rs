//! The round lifecycle engine.
//!
//! One logical control flow walks each round through
//! `IDLE → SELECTING → MEDIA_READY → PUBLISHED → COLLECTING → SCORING →
//! RESULTS_PUBLISHED → IDLE` and loops until cancelled. The engine only
//! suspends while waiting out the reply window and the inter-round
//! delay; both waits watch the cancellation token so shutdown never has
//! to sit out a full round. Every transition runs inside the recovery
//! boundary in [`RoundEngine::run`]: a failed round is cleaned up,
//! logged, and followed by a cool-down, never a crash.

use std::time::Duration;

use anyhow::Context;
use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::error::{BotError, SourceError};
use crate::imaging::ImagePreparer;
use crate::matcher;
use crate::models::{Question, Reply, Round, RoundResult, RoundState};
use crate::services::posts;
use crate::services::social::{PostImage, SocialClient};
use crate::services::sources::QuestionSource;
use crate::store::RoundStore;
use crate::utils::clock::Clock;
use crate::utils::retry::{retry_if, RetryPolicy};

/// Engine knobs, derived from configuration at startup.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Reply window: a round's end timestamp is its start plus this.
    pub round_window: chrono::Duration,
    /// Pause between a finished round and the next one.
    pub break_delay: Duration,
    /// Pause after a failed or empty selection before re-entering idle.
    pub cooldown: Duration,
    /// Minimum similarity score for a reply to count as correct.
    pub threshold: u32,
    /// Budget for retrying question selection across source variants.
    pub source_retry: RetryPolicy,
}

pub struct RoundEngine<S, R, C> {
    social: S,
    store: R,
    clock: C,
    sources: Vec<QuestionSource>,
    preparer: ImagePreparer,
    settings: EngineSettings,
    cancel: CancellationToken,
    round_number: i64,
}

impl<S: SocialClient, R: RoundStore, C: Clock> RoundEngine<S, R, C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        social: S,
        store: R,
        clock: C,
        sources: Vec<QuestionSource>,
        preparer: ImagePreparer,
        settings: EngineSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            social,
            store,
            clock,
            sources,
            preparer,
            settings,
            cancel,
            round_number: 0,
        }
    }

    /// Runs rounds until the cancellation token fires. This loop is the
    /// single recovery boundary: nothing below it re-raises past here.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        if let Err(err) = self.recover_abandoned_round().await {
            tracing::warn!(error = %err, "Startup recovery failed, continuing");
        }

        self.round_number = self
            .store
            .last_round()
            .context("Failed to read round history")?
            .map(|r| r.number)
            .unwrap_or(0);
        tracing::info!("Round engine starting at round #{}", self.round_number + 1);

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let delay = match self.run_round().await {
                Ok(()) => self.settings.break_delay,
                Err(BotError::NoEligibleQuestion) => {
                    tracing::warn!("No source produced an eligible question, cooling down");
                    self.settings.cooldown
                }
                Err(err) => {
                    tracing::error!(error = %err, "Round abandoned, cooling down");
                    self.settings.cooldown
                }
            };

            if !self.pause(delay).await {
                break;
            }
        }

        tracing::info!("Round engine stopped");
        Ok(())
    }

    /// One complete round. Faults are not retried mid-transition: the
    /// first error aborts the round, and anything already published is
    /// withdrawn so a failed round stays invisible to players.
    pub async fn run_round(&mut self) -> Result<(), BotError> {
        // IDLE -> SELECTING
        let (question, censor) = self.select_question().await?;

        let mut round = Round::new(
            self.round_number + 1,
            question,
            self.clock.now(),
            self.settings.round_window,
        );
        tracing::info!("===== Round #{} =====", round.number);
        tracing::info!(
            "Question from {} [{}] (answer: {})",
            round.question.source,
            round.question.category.as_deref().unwrap_or("general"),
            round.question.answer
        );

        // SELECTING -> MEDIA_READY
        let images = self.prepare_media(&round.question, censor)?;
        if round.question.has_media() {
            tracing::info!("Prepared {} media payloads for round #{}", images.len(), round.number);
        }
        round.state = RoundState::MediaReady;

        // MEDIA_READY -> PUBLISHED
        let text = posts::round_announcement(round.number, &round.question.prompt, round.ends_at);
        let post = self
            .social
            .publish(&text, &images)
            .await
            .map_err(BotError::Collaborator)?;
        round.post = Some(post);
        round.state = RoundState::Published;
        self.round_number = round.number;
        tracing::info!("Round #{} published", round.number);

        if let Err(err) = self.store.record_round(&round).map_err(BotError::Collaborator) {
            self.discard_round(&round).await;
            return Err(err);
        }

        match self.finish_published_round(&mut round).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.discard_round(&round).await;
                Err(err)
            }
        }
    }

    async fn finish_published_round(&self, round: &mut Round) -> Result<(), BotError> {
        // PUBLISHED -> COLLECTING: the engine's designed suspension
        // point. Replies accumulate on the platform while we sleep.
        round.state = RoundState::Collecting;
        let wait = (round.ends_at - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        if !self.pause(wait).await {
            tracing::info!(
                "Shutdown requested mid-round, round #{} is left for startup recovery",
                round.number
            );
            return Ok(());
        }

        // COLLECTING -> SCORING: one fetch, in arrival order.
        round.state = RoundState::Scoring;
        let Some(post) = round.post.clone() else {
            return Err(BotError::InvariantViolation(
                "published round without a post reference".to_string(),
            ));
        };
        let replies = self
            .social
            .fetch_replies(&post)
            .await
            .map_err(BotError::Collaborator)?;

        if replies.is_empty() {
            // No division by zero and no public artifact: the round is
            // archived without a numeric result.
            tracing::info!("No players joined round #{}, skipping results", round.number);
            self.store
                .finalize_round(
                    round.number,
                    round.state,
                    Some(RoundResult { attempts: 0, correct: 0 }),
                    self.clock.now(),
                )
                .map_err(BotError::Collaborator)?;
            return Ok(());
        }

        tracing::info!("Scoring {} replies for round #{}", replies.len(), round.number);
        let result = self.score_replies(round, &replies).await?;
        let Some(percent) = result.percentage() else {
            return Err(BotError::InvariantViolation(
                "percentage undefined despite non-empty replies".to_string(),
            ));
        };
        tracing::info!(
            "Round #{} results: {}/{} = {}%",
            round.number,
            result.correct,
            result.attempts,
            percent
        );

        // SCORING -> RESULTS_PUBLISHED
        let next_round = self.clock.now()
            + chrono::Duration::from_std(self.settings.break_delay)
                .unwrap_or_else(|_| chrono::Duration::zero());
        let text = posts::results(
            round.number,
            &round.question.answer,
            percent,
            result.attempts,
            next_round,
        );
        self.social
            .publish(&text, &[])
            .await
            .map_err(BotError::Collaborator)?;
        round.state = RoundState::ResultsPublished;

        self.store
            .finalize_round(round.number, round.state, Some(result), self.clock.now())
            .map_err(BotError::Collaborator)?;

        Ok(())
    }

    /// Picks a random source variant and asks it for a question,
    /// retrying other variants within the policy budget. Only
    /// eligibility misses consume further attempts; a collaborator
    /// failure aborts the selection (and the round) immediately.
    /// Exhausting the budget is the recoverable `NoEligibleQuestion`.
    async fn select_question(&self) -> Result<(Question, bool), BotError> {
        if self.sources.is_empty() {
            return Err(BotError::InvariantViolation(
                "no question sources configured".to_string(),
            ));
        }

        let eligibility_miss = |err: &SourceError| matches!(err, SourceError::NoEligibleQuestion);
        let outcome = retry_if(&self.settings.source_retry, eligibility_miss, || async {
            let index = rand::rng().random_range(0..self.sources.len());
            let source = &self.sources[index];
            match source.fetch_question().await {
                Ok(question) => Ok((question, source.censor_media())),
                Err(err) => {
                    tracing::warn!("Source {} yielded nothing: {err}", source.name());
                    Err(err)
                }
            }
        })
        .await;

        outcome.map_err(|err| match err {
            SourceError::NoEligibleQuestion => BotError::NoEligibleQuestion,
            SourceError::Collaborator(cause) => BotError::Collaborator(cause),
        })
    }

    /// SELECTING -> MEDIA_READY: censoring sources get the full image
    /// pipeline, others publish their media untouched.
    fn prepare_media(&self, question: &Question, censor: bool) -> Result<Vec<PostImage>, BotError> {
        let mut images = Vec::with_capacity(question.media.len());
        for media in &question.media {
            let (bytes, mime_type) = if censor {
                // The pipeline always re-encodes to JPEG.
                let prepared = self
                    .preparer
                    .prepare(&media.bytes)
                    .map_err(BotError::Collaborator)?;
                (prepared, "image/jpeg".to_string())
            } else {
                (media.bytes.clone(), media.mime_type.clone())
            };
            images.push(PostImage {
                bytes,
                mime_type,
                alt_text: media.alt_text.clone(),
            });
        }
        Ok(images)
    }

    /// Each reply is scored exactly once, sequentially; correct ones are
    /// acknowledged on the platform as they are counted.
    async fn score_replies(&self, round: &Round, replies: &[Reply]) -> Result<RoundResult, BotError> {
        let mut result = RoundResult { attempts: 0, correct: 0 };
        for reply in replies {
            let scored = matcher::evaluate(
                &reply.text,
                &round.question.answer_normalized,
                self.settings.threshold,
            );
            tracing::debug!(
                "#{} @{} guessed '{}' -> {} ({})",
                reply.position,
                reply.author,
                reply.text,
                scored.score,
                if scored.correct { "correct" } else { "incorrect" }
            );
            if scored.correct {
                result.correct += 1;
                self.social
                    .acknowledge(reply)
                    .await
                    .map_err(BotError::Collaborator)?;
            }
            result.attempts += 1;
        }
        Ok(result)
    }

    /// Best-effort withdrawal of a partially published round. Players
    /// must never see a malformed round; failures here are logged and
    /// the next round proceeds regardless.
    async fn discard_round(&self, round: &Round) {
        if let Some(post) = &round.post {
            if let Err(err) = self.social.remove_post(post).await {
                tracing::warn!(error = %err, "Failed to remove post of abandoned round #{}", round.number);
            }
        }
        if let Err(err) = self.store.purge_round(round.number) {
            tracing::warn!(error = %err, "Failed to purge abandoned round #{}", round.number);
        }
    }

    /// A stored round without an end timestamp never finished (crash or
    /// shutdown mid-round). Its post is withdrawn and the row removed so
    /// history only holds completed rounds.
    async fn recover_abandoned_round(&self) -> anyhow::Result<()> {
        let Some(last) = self.store.last_round()? else {
            return Ok(());
        };
        if last.ended_at.is_some() {
            return Ok(());
        }

        tracing::warn!(
            "Round #{} was left in state '{}', cleaning it up",
            last.number,
            last.state.as_str()
        );
        if let Some(post) = &last.post {
            self.social.remove_post(post).await?;
        }
        self.store.purge_round(last.number)?;
        Ok(())
    }

    /// Cancellable sleep: every suspension funnels through here so
    /// shutdown is observed promptly. Returns false when cancelled.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = self.clock.sleep(duration) => true,
        }
    }
}
