use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Time source and sleeper for the round engine. The engine never calls
/// `Utc::now()` or `tokio::time::sleep` directly; injecting this seam
/// lets tests run a full round without real waiting.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
