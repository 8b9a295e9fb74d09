//! Public post text composition. Posts are assembled from components in
//! priority order and truncated component-wise so the platform's length
//! limit is never crossed mid-sentence.

use chrono::{DateTime, Utc};
use rand::Rng;

/// The platform limit is 300 graphemes; composing against 280 leaves a
/// safety margin.
const MAX_POST_LEN: usize = 280;

const TIPS: [&str; 3] = [
    "Typos are forgiven: a mostly-right guess still counts.",
    "Correct guesses get a like from us once the round is scored.",
    "Replying to other players does not affect the result.",
];

pub fn round_announcement(round_number: i64, prompt: &str, deadline: DateTime<Utc>) -> String {
    let tip = TIPS[rand::rng().random_range(0..TIPS.len())];
    compose(&[
        format!("🎬 Round #{round_number}\n\n"),
        format!("{prompt}\n\n"),
        format!(
            "You have until {} to reply with your guess. Good luck!\n\n",
            format_deadline(deadline)
        ),
        format!("(TIP: {tip})"),
    ])
}

pub fn results(
    round_number: i64,
    answer: &str,
    percent: u32,
    attempts: u32,
    next_round: DateTime<Utc>,
) -> String {
    let header = if percent < 50 {
        format!("😿 Round #{round_number}: {percent}% guessed it.\n")
    } else {
        format!("🏆 Round #{round_number}: {percent}% guessed it! Congrats!\n")
    };
    compose(&[
        header,
        format!("The answer was: {answer}.\n"),
        format!("Attempts: {attempts}\n\n"),
        format!("Next round at {}", format_deadline(next_round)),
    ])
}

fn format_deadline(at: DateTime<Utc>) -> String {
    format!("{} UTC", at.format("%d/%m/%Y, %I:%M%p"))
}

/// Appends components while they fit; the first one that does not fit
/// ends the post. The leading components must therefore carry the
/// essential content.
fn compose(components: &[String]) -> String {
    let mut text = String::new();
    let mut len = 0;
    for component in components {
        let component_len = component.chars().count();
        if len + component_len > MAX_POST_LEN {
            break;
        }
        text.push_str(component);
        len += component_len;
    }
    text
}
