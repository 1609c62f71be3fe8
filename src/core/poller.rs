use crate::domain::model::PaymentStatus;
use crate::domain::ports::PaymentGateway;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// `None` polls until confirmed or stopped.
    pub timeout: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Confirmed(PaymentStatus),
    Failed(PaymentStatus),
    TimedOut,
    Cancelled,
}

/// Polls the gateway for one tracking number until a terminal status.
pub struct PaymentPoller<G: PaymentGateway> {
    gateway: Arc<G>,
    settings: PollSettings,
}

impl<G: PaymentGateway + 'static> PaymentPoller<G> {
    pub fn new(gateway: Arc<G>, settings: PollSettings) -> Self {
        Self { gateway, settings }
    }

    /// Runs the loop in the current task. The first request goes out one
    /// interval after start, and a request is always awaited before the next
    /// tick, so at most one is outstanding.
    pub async fn run(&self, tracking_number: &str, mut stop: watch::Receiver<bool>) -> PollOutcome {
        let start = Instant::now();
        let mut ticker = time::interval_at(start + self.settings.interval, self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let deadline = async {
            match self.settings.timeout {
                Some(timeout) => time::sleep_until(start + timeout).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        let mut attempts: u32 = 0;
        loop {
            tokio::select! {
                biased;
                _ = stopped(&mut stop) => return PollOutcome::Cancelled,
                _ = &mut deadline => {
                    tracing::warn!("⏰ Payment for {} not confirmed after {} polls", tracking_number, attempts);
                    return PollOutcome::TimedOut;
                }
                _ = ticker.tick() => {}
            }

            attempts += 1;
            let fetched = tokio::select! {
                biased;
                _ = stopped(&mut stop) => return PollOutcome::Cancelled,
                _ = &mut deadline => return PollOutcome::TimedOut,
                fetched = self.gateway.poll_status(tracking_number) => fetched,
            };

            match fetched {
                Ok(status) if status.is_confirmed() => {
                    tracing::info!("✅ Payment for {} confirmed after {} polls", tracking_number, attempts);
                    return PollOutcome::Confirmed(status);
                }
                Ok(status) if status.is_failure() => {
                    tracing::warn!("❌ Payment for {} ended with status {}", tracking_number, status);
                    return PollOutcome::Failed(status);
                }
                Ok(status) => {
                    tracing::debug!("Poll #{} for {}: {}", attempts, tracking_number, status);
                }
                Err(e) => {
                    // 單次輪詢失敗不影響狀態，下一輪再試
                    tracing::warn!("Poll #{} for {} failed, skipping: {}", attempts, tracking_number, e);
                }
            }
        }
    }

    pub fn spawn(self, tracking_number: String) -> PollHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move { self.run(&tracking_number, stop_rx).await });
        PollHandle {
            stop: stop_tx,
            task: Some(task),
        }
    }
}

/// Resolves once a stop was requested or the sender is gone.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            return;
        }
    }
}

/// Owner of a spawned poll loop. Dropping it stops the loop.
pub struct PollHandle {
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<PollOutcome>>,
}

impl PollHandle {
    pub fn cancel(&self) {
        let _ = self.stop.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Waits for the loop to end.
    pub async fn outcome(mut self) -> PollOutcome {
        let Some(task) = self.task.take() else {
            return PollOutcome::Cancelled;
        };
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Payment poll task ended abnormally: {}", e);
                PollOutcome::Cancelled
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        let _ = self.stop.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
