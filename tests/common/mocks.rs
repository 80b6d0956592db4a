//! In-memory poster used to drive the scheduler without a network

#![allow(dead_code)]

use async_trait::async_trait;
use botblock::{BotBlockError, GuildCountPayload, GuildCountPoster, PostResponse, RateLimit};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// What the mock answers to the next post.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Ok,
    RateLimited { retry_after_secs: u64 },
    /// Rate limit carrying `retry_after` as is, bypassing body parsing.
    RateLimitedFor(Duration),
    Unreachable,
}

#[derive(Default)]
pub struct MockPoster {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(Instant, GuildCountPayload)>>,
    delay: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl MockPoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every post takes `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn script(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.replies.lock().unwrap().extend(replies);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    pub fn payloads(&self) -> Vec<GuildCountPayload> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GuildCountPoster for MockPoster {
    async fn post(&self, payload: &GuildCountPayload) -> botblock::Result<PostResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((Instant::now(), payload.clone()));

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Ok);
        match reply {
            Reply::Ok => Ok(PostResponse::default()),
            Reply::RateLimited { retry_after_secs } => Err(BotBlockError::RateLimited(
                RateLimit::from_response(&format!(r#"{{"retry_after":{retry_after_secs}}}"#), None),
            )),
            Reply::RateLimitedFor(retry_after) => Err(BotBlockError::RateLimited(RateLimit {
                retry_after,
                route: None,
                bot_id: None,
                ip: None,
                limited_at: chrono::Utc::now(),
            })),
            Reply::Unreachable => Err(BotBlockError::SiteUnreachable {
                url: "mock".to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}
