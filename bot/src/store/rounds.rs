use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database, RoundStore};
use crate::models::{PostRef, Round, RoundResult, RoundState};

/// Archived round row. `ended_at` doubles as the completion marker:
/// a NULL there means the round never finished and startup recovery
/// should clean it up.
#[derive(Debug, Clone)]
pub struct StoredRound {
    pub number: i64,
    pub state: RoundState,
    pub answer: String,
    pub source: String,
    pub post: Option<PostRef>,
    pub percent: Option<u32>,
    pub attempts: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

fn row_to_round(row: &Row) -> Result<StoredRound> {
    let state: String = row.get("state")?;
    let created_at: String = row.get("created_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let post_uri: Option<String> = row.get("post_uri")?;
    let post_cid: Option<String> = row.get("post_cid")?;

    let post = match (post_uri, post_cid) {
        (Some(uri), Some(cid)) => Some(PostRef { uri, cid }),
        _ => None,
    };

    Ok(StoredRound {
        number: row.get("number")?,
        state: state.parse().map_err(|e: String| anyhow!(e))?,
        answer: row.get("answer")?,
        source: row.get("source")?,
        post,
        percent: row.get("percent")?,
        attempts: row.get("attempts")?,
        created_at: parse_datetime(&created_at)?,
        ended_at: ended_at.as_deref().map(parse_datetime).transpose()?,
    })
}

impl RoundStore for Database {
    fn record_round(&self, round: &Round) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO rounds (number, state, answer, source, post_uri, post_cid, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    round.number,
                    round.state.as_str(),
                    round.question.answer,
                    round.question.source,
                    round.post.as_ref().map(|p| p.uri.as_str()),
                    round.post.as_ref().map(|p| p.cid.as_str()),
                    round.started_at.to_rfc3339(),
                ],
            )
            .context("Failed to insert round")?;
            Ok(())
        })
    }

    fn finalize_round(
        &self,
        number: i64,
        state: RoundState,
        result: Option<RoundResult>,
        ended_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let updated = conn
                .execute(
                    "UPDATE rounds
                     SET state = ?1, percent = ?2, attempts = ?3, ended_at = ?4
                     WHERE number = ?5",
                    params![
                        state.as_str(),
                        result.and_then(|r| r.percentage()),
                        result.map(|r| r.attempts),
                        ended_at.to_rfc3339(),
                        number,
                    ],
                )
                .context("Failed to finalize round")?;
            if updated == 0 {
                return Err(anyhow!("round {number} not found"));
            }
            Ok(())
        })
    }

    fn last_round(&self) -> Result<Option<StoredRound>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT number, state, answer, source, post_uri, post_cid,
                        percent, attempts, created_at, ended_at
                 FROM rounds ORDER BY number DESC LIMIT 1",
                [],
                |row| Ok(row_to_round(row)),
            )
            .optional()
            .context("Failed to query last round")?
            .transpose()
        })
    }

    fn purge_round(&self, number: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM rounds WHERE number = ?1", params![number])
                .context("Failed to delete round")?;
            Ok(())
        })
    }
}
