//! Background maintenance: the ambient self-state refresh and passive desire
//! decay, each on its own interval until the token is cancelled.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::orchestrator::Orchestrator;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

pub struct BackgroundTasks {
    pub self_state: JoinHandle<()>,
    pub desires: JoinHandle<()>,
}

impl BackgroundTasks {
    /// Wait for both loops to exit. Call after cancelling the token.
    pub async fn join(self) {
        for (name, handle) in [("self_state", self.self_state), ("desires", self.desires)] {
            if let Err(e) = handle.await {
                tracing::warn!(task = name, "background task ended abnormally: {e}");
            }
        }
    }
}

/// Start both tickers. The first tick of each fires one full period after
/// spawning.
pub fn spawn_background(
    orchestrator: Arc<Orchestrator>,
    cancel: CancellationToken,
) -> BackgroundTasks {
    let self_state_every = orchestrator.config().self_state_tick();
    let desire_every = orchestrator.config().desire_tick();

    let o = orchestrator.clone();
    let self_state = spawn_loop("self_state", self_state_every, cancel.clone(), move || {
        let o = o.clone();
        async move {
            if let Err(e) = o.self_state_tick().await {
                tracing::warn!("self-state tick failed: {e}");
            }
        }
    });

    let o = orchestrator;
    let desires = spawn_loop("desires", desire_every, cancel, move || {
        let o = o.clone();
        async move {
            if let Err(e) = o.desire_tick().await {
                tracing::warn!("desire tick failed: {e}");
            }
        }
    });

    BackgroundTasks { self_state, desires }
}

fn spawn_loop<F, Fut>(
    name: &'static str,
    every: Duration,
    cancel: CancellationToken,
    mut step: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let every = every.max(MIN_INTERVAL);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval yields immediately on the first call
        interval.tick().await;
        tracing::debug!(task = name, period_ms = every.as_millis() as u64, "ticker started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(task = name, "ticker stopped");
                    break;
                }
                _ = interval.tick() => step().await,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_loop_waits_one_period_then_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();
        let c = count.clone();
        let handle = spawn_loop("test", Duration::from_secs(10), cancel.clone(), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_is_clamped() {
        let cancel = CancellationToken::new();
        let handle = spawn_loop("zero", Duration::ZERO, cancel.clone(), || async {});
        tokio::time::sleep(Duration::from_millis(5)).await;
        cancel.cancel();
        handle.await.unwrap();
    }
}
