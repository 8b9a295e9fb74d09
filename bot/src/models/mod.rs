use serde::{Deserialize, Serialize};

pub mod question;
pub mod reply;
pub mod round;

pub use question::{Question, QuestionMedia};
pub use reply::{Reply, ScoreResult};
pub use round::{Round, RoundResult, RoundState};

/// Opaque reference to a published post. On Bluesky this is the record
/// URI plus its CID (the CID is required to like or reply to it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRef {
    pub uri: String,
    pub cid: String,
}
