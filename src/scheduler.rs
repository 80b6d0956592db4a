use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex as TokioMutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::BotBlockConfig;
use crate::error::BotBlockError;
use crate::models::BotId;
use crate::post::{GuildCountPayload, GuildCountPoster, GuildCountSource, PostAction};

struct Schedule {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Posts the guild count on a fixed interval in the background.
///
/// The first post happens one interval after [`enable_auto_post`], never at
/// start-up. At most one post is outstanding per `AutoPoster`, including
/// across a schedule replaced by a second `enable_auto_post`. Failed ticks are
/// logged and skipped; a rate limit pauses posting until the advised wait has
/// passed.
///
/// [`enable_auto_post`]: AutoPoster::enable_auto_post
pub struct AutoPoster<P: GuildCountPoster + 'static = PostAction> {
    poster: Arc<P>,
    in_flight: Arc<TokioMutex<()>>,
    schedule: Mutex<Option<Schedule>>,
}

impl AutoPoster<PostAction> {
    pub fn for_bot(bot_id: impl Into<BotId>) -> Self {
        Self::new(PostAction::new(bot_id))
    }

    pub fn from_context(ctx: &serenity::client::Context) -> Self {
        Self::new(PostAction::from_context(ctx))
    }
}

impl<P: GuildCountPoster + 'static> AutoPoster<P> {
    pub fn new(poster: P) -> Self {
        Self {
            poster: Arc::new(poster),
            in_flight: Arc::new(TokioMutex::new(())),
            schedule: Mutex::new(None),
        }
    }

    pub fn poster(&self) -> &P {
        &self.poster
    }

    pub fn is_running(&self) -> bool {
        let schedule = self.schedule.lock().unwrap_or_else(PoisonError::into_inner);
        schedule
            .as_ref()
            .is_some_and(|s| !s.cancel.is_cancelled() && !s.task.is_finished())
    }

    /// Starts posting every `config.post_interval()`. A schedule that is
    /// already running is replaced.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn enable_auto_post<S>(&self, source: S, config: &BotBlockConfig)
    where
        S: GuildCountSource + 'static,
    {
        let mut schedule = self.schedule.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = schedule.take() {
            warn!("Auto-post already running, replacing the schedule");
            previous.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_schedule(
            Arc::clone(&self.poster),
            source,
            config.clone(),
            Arc::clone(&self.in_flight),
            cancel.clone(),
        ));

        *schedule = Some(Schedule { cancel, task });
    }

    /// Stops future ticks. A post already in flight is allowed to finish.
    /// Calling this while stopped does nothing.
    pub fn disable_auto_post(&self) {
        let schedule = self
            .schedule
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(schedule) = schedule {
            schedule.cancel.cancel();
            info!("Auto-post disabled");
        }
    }

    /// Disables auto-post and waits up to `timeout` for an in-flight post to
    /// complete. Returns `false` if the wait timed out.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let schedule = self
            .schedule
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(schedule) = schedule else {
            return true;
        };
        schedule.cancel.cancel();

        match tokio::time::timeout(timeout, schedule.task).await {
            Ok(_) => true,
            Err(_) => {
                warn!("Auto-post task did not stop within {:?}", timeout);
                false
            }
        }
    }
}

impl<P: GuildCountPoster + 'static> Drop for AutoPoster<P> {
    fn drop(&mut self) {
        self.disable_auto_post();
    }
}

async fn run_schedule<P, S>(
    poster: Arc<P>,
    source: S,
    config: BotBlockConfig,
    in_flight: Arc<TokioMutex<()>>,
    cancel: CancellationToken,
) where
    P: GuildCountPoster + 'static,
    S: GuildCountSource + 'static,
{
    let period = config.post_interval();
    info!(
        "Starting auto-post with interval: {} minutes",
        config.post_interval_minutes()
    );

    let Some(first_tick) = Instant::now().checked_add(period) else {
        error!("Post interval {:?} is out of range, auto-post not started", period);
        return;
    };
    let mut ticker = interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut backoff_until: Option<Instant> = None;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if let Some(until) = backoff_until {
            if Instant::now() < until {
                debug!("Rate limit still active, skipping auto-post tick");
                continue;
            }
            backoff_until = None;
        }

        let Ok(_guard) = in_flight.try_lock() else {
            warn!("Previous guild count post still in flight, skipping tick");
            continue;
        };

        if cancel.is_cancelled() {
            break;
        }

        let payload = match GuildCountPayload::from_source(&source, &config) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Could not build guild count payload: {}", e);
                continue;
            }
        };

        match poster.post(&payload).await {
            Ok(response) => {
                debug!(
                    "Auto-posted {} guilds ({} sites failed)",
                    payload.server_count,
                    response.failure.len()
                );
            }
            Err(BotBlockError::RateLimited(limit)) => {
                warn!("{}; pausing auto-post until {}", limit, limit.retry_at());
                let now = Instant::now();
                backoff_until = now
                    .checked_add(limit.retry_after)
                    .or_else(|| now.checked_add(period));
            }
            Err(e) => {
                warn!("Got an error while performing an auto-post task: {}", e);
            }
        }
    }

    info!("Auto-post stopped");
}
