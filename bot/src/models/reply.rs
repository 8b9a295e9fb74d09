use super::PostRef;

/// One public reply pulled from the round thread. Ephemeral: replies live
/// only while a round is being scored and are never stored individually.
#[derive(Debug, Clone)]
pub struct Reply {
    /// External author identifier (the Bluesky handle).
    pub author: String,
    pub text: String,
    /// Arrival position within the thread, starting at 1.
    pub position: u32,
    pub post: PostRef,
}

/// Scoring outcome for a single reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreResult {
    /// Similarity against the canonical answer, 0-100.
    pub score: u32,
    /// True when score reached the configured threshold (inclusive).
    pub correct: bool,
}
