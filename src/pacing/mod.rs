use anyhow::{Result, bail};
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

/// Wait applied by a simulated user between two task invocations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaitPolicy {
    /// Uniform random wait in `[min_seconds, max_seconds]`.
    Between { min_seconds: f64, max_seconds: f64 },
    Constant { seconds: f64 },
    /// Targets a fixed task rate per user by subtracting the time the task took.
    ConstantThroughput { tasks_per_second: f64 },
}

impl Default for WaitPolicy {
    fn default() -> Self {
        WaitPolicy::Between {
            min_seconds: 1.0,
            max_seconds: 5.0,
        }
    }
}

impl WaitPolicy {
    pub fn validate(&self) -> Result<()> {
        match *self {
            WaitPolicy::Between {
                min_seconds,
                max_seconds,
            } => {
                if !(min_seconds.is_finite() && max_seconds.is_finite()) {
                    bail!("between pacing needs finite bounds");
                }
                if min_seconds < 0.0 || min_seconds > max_seconds {
                    bail!(
                        "between pacing needs 0 <= min_seconds <= max_seconds, got {} and {}",
                        min_seconds,
                        max_seconds
                    );
                }
                ensure_representable("between max_seconds", max_seconds)?;
            }
            WaitPolicy::Constant { seconds } => {
                if !seconds.is_finite() || seconds < 0.0 {
                    bail!("constant pacing needs a non-negative wait, got {}", seconds);
                }
                ensure_representable("constant seconds", seconds)?;
            }
            WaitPolicy::ConstantThroughput { tasks_per_second } => {
                if !tasks_per_second.is_finite() || tasks_per_second <= 0.0 {
                    bail!(
                        "constant_throughput pacing needs tasks_per_second > 0, got {}",
                        tasks_per_second
                    );
                }
                ensure_representable("constant_throughput interval", 1.0 / tasks_per_second)?;
            }
        }
        Ok(())
    }

    /// Delay before the next task, given how long the last one took.
    pub fn next_delay<R: Rng + ?Sized>(&self, task_elapsed: Duration, rng: &mut R) -> Duration {
        match *self {
            WaitPolicy::Between {
                min_seconds,
                max_seconds,
            } => {
                if min_seconds >= max_seconds {
                    return saturating_secs(min_seconds);
                }
                saturating_secs(rng.random_range(min_seconds..=max_seconds))
            }
            WaitPolicy::Constant { seconds } => saturating_secs(seconds),
            WaitPolicy::ConstantThroughput { tasks_per_second } => {
                saturating_secs(1.0 / tasks_per_second).saturating_sub(task_elapsed)
            }
        }
    }
}

fn ensure_representable(what: &str, seconds: f64) -> Result<()> {
    if Duration::try_from_secs_f64(seconds).is_err() {
        bail!("{} of {}s does not fit a wait duration", what, seconds);
    }
    Ok(())
}

fn saturating_secs(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}
