use thiserror::Error;

/// Failure taxonomy at the round engine boundary. Everything that can go
/// wrong inside a round is folded into one of these before it reaches the
/// engine's recovery loop; nothing propagates past that loop.
#[derive(Debug, Error)]
pub enum BotError {
    /// Every configured question source was tried within the retry budget
    /// and none produced an eligible question. Recoverable: the engine
    /// cools down and re-enters idle.
    #[error("no eligible question from any configured source")]
    NoEligibleQuestion,

    /// A collaborator (social platform, catalog, storage) failed. The
    /// current round is abandoned and the engine resumes from idle after
    /// a cool-down.
    #[error("collaborator failure: {0}")]
    Collaborator(#[source] anyhow::Error),

    /// An internal invariant was broken. Tests must fail on this; in
    /// production the round is abandoned like any other fault.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Outcome of asking a single question source for a question.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source is healthy but has nothing eligible to offer right now
    /// (empty question table, movie without enough backdrops). The engine
    /// retries against another source.
    #[error("source has no eligible question")]
    NoEligibleQuestion,

    /// The source's backend failed (network, API, storage).
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}
