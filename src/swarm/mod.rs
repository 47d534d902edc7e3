use dashmap::DashMap;
use futures::future::join_all;
use http::StatusCode;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use crate::catalog::CatalogVersion;
use crate::config::{Config, TaskConfig};
use crate::driver::{PriceClient, PriceDriver};
use crate::error::TaskError;
use crate::pacing::WaitPolicy;

#[derive(Debug, Default)]
struct Tally {
    successes: AtomicU64,
    failures: AtomicU64,
    errors: AtomicU64,
}

impl Tally {
    fn record(&self, outcome: &Result<StatusCode, TaskError>) {
        let counter = match outcome {
            Ok(status) if status.is_success() || status.is_redirection() => &self.successes,
            Ok(_) => &self.failures,
            Err(_) => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> TallySnapshot {
        TallySnapshot {
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Outcome counts for one task version at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TallySnapshot {
    /// 2xx and 3xx responses.
    pub successes: u64,
    /// 4xx and 5xx responses.
    pub failures: u64,
    /// Invocations that never produced a response.
    pub errors: u64,
}

impl TallySnapshot {
    pub fn total(&self) -> u64 {
        self.successes + self.failures + self.errors
    }
}

type SharedTallies = Arc<DashMap<CatalogVersion, Tally>>;

/// Runs simulated users against a shared driver for a bounded time.
pub struct Swarm<C> {
    driver: Arc<PriceDriver<C>>,
    tasks: Arc<[TaskConfig]>,
    pacing: WaitPolicy,
    users: usize,
    duration: Duration,
    tallies: SharedTallies,
}

impl<C: PriceClient> Swarm<C> {
    pub fn new(driver: PriceDriver<C>, config: &Config) -> Self {
        Self {
            driver: Arc::new(driver),
            tasks: config.tasks.clone().into(),
            pacing: config.pacing.clone(),
            users: config.users,
            duration: config.duration(),
            tallies: Arc::new(DashMap::new()),
        }
    }

    /// Starts every user, waits for the deadline or `stop`, and returns the tallies.
    pub async fn run(&self, stop: watch::Receiver<bool>) -> BTreeMap<CatalogVersion, TallySnapshot> {
        let Some(deadline) = Instant::now().checked_add(self.duration) else {
            error!("Run duration {:?} is out of range, not starting", self.duration);
            return BTreeMap::new();
        };
        info!(
            "Starting {} users for {}s with {:?}",
            self.users,
            self.duration.as_secs(),
            self.pacing
        );

        let handles: Vec<_> = (0..self.users)
            .map(|user_id| {
                let user = SimulatedUser {
                    id: user_id,
                    driver: self.driver.clone(),
                    tasks: self.tasks.clone(),
                    pacing: self.pacing.clone(),
                    tallies: self.tallies.clone(),
                };
                tokio::spawn(user.run(deadline, stop.clone()))
            })
            .collect();

        for result in join_all(handles).await {
            if let Err(e) = result {
                error!("Simulated user task failed: {}", e);
            }
        }

        self.tallies
            .iter()
            .map(|entry| (*entry.key(), entry.value().snapshot()))
            .collect()
    }
}

/// Weighted pick of the next task kind.
fn pick_task<R: Rng + ?Sized>(tasks: &[TaskConfig], rng: &mut R) -> Option<CatalogVersion> {
    tasks
        .choose_weighted(rng, |task| task.weight)
        .ok()
        .map(|task| task.version)
}

/// Resolves once a stop is requested; never resolves if the sender is gone.
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    let closed = stop.wait_for(|stopped| *stopped).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

struct SimulatedUser<C> {
    id: usize,
    driver: Arc<PriceDriver<C>>,
    tasks: Arc<[TaskConfig]>,
    pacing: WaitPolicy,
    tallies: SharedTallies,
}

impl<C: PriceClient> SimulatedUser<C> {
    async fn run(self, deadline: Instant, mut stop: watch::Receiver<bool>) {
        let mut completed = 0u64;

        while Instant::now() < deadline && !*stop.borrow() {
            let Some(version) = pick_task(&self.tasks, &mut rand::rng()) else {
                warn!("User {} has no runnable task, stopping", self.id);
                return;
            };

            let started = Instant::now();
            let outcome = tokio::select! {
                outcome = self.driver.run_task(version) => outcome,
                _ = time::sleep_until(deadline) => Err(TaskError::Cancelled),
                _ = stop_requested(&mut stop) => Err(TaskError::Cancelled),
            };
            let elapsed = started.elapsed();

            if let Err(e) = &outcome {
                debug!("User {} task {} failed: {}", self.id, version, e);
            }
            self.tallies.entry(version).or_default().record(&outcome);
            completed += 1;

            let delay = self.pacing.next_delay(elapsed, &mut rand::rng());
            let wake = Instant::now()
                .checked_add(delay)
                .map_or(deadline, |wake| wake.min(deadline));
            tokio::select! {
                _ = time::sleep_until(wake) => {}
                _ = stop_requested(&mut stop) => {}
            }
        }

        debug!("User {} finished after {} tasks", self.id, completed);
    }
}
