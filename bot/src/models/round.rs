use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PostRef, Question};

/// Lifecycle of a round. The engine walks these in order and loops back
/// to `Idle`; there is no terminal state short of process shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    Idle,
    Selecting,
    MediaReady,
    Published,
    Collecting,
    Scoring,
    ResultsPublished,
}

impl RoundState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundState::Idle => "idle",
            RoundState::Selecting => "selecting",
            RoundState::MediaReady => "media_ready",
            RoundState::Published => "published",
            RoundState::Collecting => "collecting",
            RoundState::Scoring => "scoring",
            RoundState::ResultsPublished => "results_published",
        }
    }
}

impl std::str::FromStr for RoundState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(RoundState::Idle),
            "selecting" => Ok(RoundState::Selecting),
            "media_ready" => Ok(RoundState::MediaReady),
            "published" => Ok(RoundState::Published),
            "collecting" => Ok(RoundState::Collecting),
            "scoring" => Ok(RoundState::Scoring),
            "results_published" => Ok(RoundState::ResultsPublished),
            other => Err(format!("unknown round state: {other}")),
        }
    }
}

/// One active round. Exclusively owns its question; exactly one exists at
/// a time.
#[derive(Debug)]
pub struct Round {
    pub id: Uuid,
    /// Sequential round number, continuing from the stored history.
    pub number: i64,
    pub question: Question,
    pub state: RoundState,
    pub started_at: DateTime<Utc>,
    /// Always `started_at` + the configured round window.
    pub ends_at: DateTime<Utc>,
    pub post: Option<PostRef>,
}

impl Round {
    pub fn new(number: i64, question: Question, started_at: DateTime<Utc>, window: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            question,
            state: RoundState::Selecting,
            started_at,
            ends_at: started_at + window,
            post: None,
        }
    }
}

/// Aggregated outcome of one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundResult {
    pub attempts: u32,
    pub correct: u32,
}

impl RoundResult {
    /// Success percentage, rounded. Undefined with zero attempts: callers
    /// must skip numeric results instead of dividing by zero.
    pub fn percentage(&self) -> Option<u32> {
        if self.attempts == 0 {
            return None;
        }
        Some(((self.correct as f64 / self.attempts as f64) * 100.0).round() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds() {
        let result = RoundResult { attempts: 5, correct: 3 };
        assert_eq!(result.percentage(), Some(60));

        let result = RoundResult { attempts: 3, correct: 1 };
        assert_eq!(result.percentage(), Some(33));

        let result = RoundResult { attempts: 3, correct: 2 };
        assert_eq!(result.percentage(), Some(67));
    }

    #[test]
    fn percentage_undefined_without_attempts() {
        let result = RoundResult { attempts: 0, correct: 0 };
        assert_eq!(result.percentage(), None);
    }

    #[test]
    fn round_window_is_fixed() {
        let question = Question::new("q", "a", vec![], None, "test");
        let start = Utc::now();
        let round = Round::new(1, question, start, Duration::minutes(30));
        assert_eq!(round.ends_at - round.started_at, Duration::minutes(30));
    }

    #[test]
    fn state_round_trips_through_str() {
        for state in [
            RoundState::Idle,
            RoundState::Selecting,
            RoundState::MediaReady,
            RoundState::Published,
            RoundState::Collecting,
            RoundState::Scoring,
            RoundState::ResultsPublished,
        ] {
            assert_eq!(state.as_str().parse::<RoundState>().unwrap(), state);
        }
    }
}
