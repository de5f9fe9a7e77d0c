// ABOUTME: Bounded retry loop around one fetch-and-extract attempt with a fixed pause between attempts.
// ABOUTME: Pipeline and Pacer are traits so tests can count attempts and pauses without sleeping.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::ScrapeError;
use crate::record::{FieldKind, PriceRecord};

/// One fetch + extract attempt.
#[async_trait]
pub trait Pipeline: Send {
    /// `attempt` counts from 1.
    async fn attempt(&mut self, attempt: u32) -> Result<PriceRecord, ScrapeError>;
}

/// Waits between attempts.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How a retry run ended.
#[derive(Debug)]
pub enum RetryOutcome {
    Accepted {
        record: PriceRecord,
        attempts: u32,
    },
    Exhausted {
        attempts: u32,
        last_error: ScrapeError,
    },
}

impl RetryOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Accepted { attempts, .. } | RetryOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Fixed-backoff retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDriver {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryDriver {
    /// `max_attempts` below 1 is treated as 1.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Run attempts until one yields a record with the primary field set.
    ///
    /// Pauses between attempts, never after the last one. An attempt that
    /// returns a record without the primary field counts as a failure.
    pub async fn run<P, T>(&self, pipeline: &mut P, pacer: &T) -> RetryOutcome
    where
        P: Pipeline + ?Sized,
        T: Pacer + ?Sized,
    {
        let mut attempt = 1;
        loop {
            let result = pipeline.attempt(attempt).await.and_then(|record| {
                if record.is_complete() {
                    Ok(record)
                } else {
                    Err(ScrapeError::incomplete(
                        record.source.clone(),
                        "Extract",
                        Some(anyhow::anyhow!(
                            "{} not found (observed: {})",
                            FieldKind::PRIMARY,
                            describe(&record)
                        )),
                    ))
                }
            });

            match result {
                Ok(record) => {
                    info!(attempt, source = %record.source, "attempt accepted");
                    return RetryOutcome::Accepted {
                        record,
                        attempts: attempt,
                    };
                }
                Err(err) => {
                    warn!(attempt, max = self.max_attempts, error = %err, "attempt failed");
                    if attempt >= self.max_attempts {
                        return RetryOutcome::Exhausted {
                            attempts: attempt,
                            last_error: err,
                        };
                    }
                }
            }
            pacer.pause(self.backoff).await;
            attempt += 1;
        }
    }
}

fn describe(record: &PriceRecord) -> String {
    let observed = record.prices.observed();
    if observed.is_empty() {
        return "nothing".to_string();
    }
    observed
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Returns the scripted results in order.
    struct Scripted {
        results: Vec<Result<PriceRecord, ScrapeError>>,
        calls: u32,
    }

    #[async_trait]
    impl Pipeline for Scripted {
        async fn attempt(&mut self, attempt: u32) -> Result<PriceRecord, ScrapeError> {
            self.calls += 1;
            assert_eq!(attempt, self.calls);
            self.results.remove(0)
        }
    }

    #[derive(Default)]
    struct RecordingPacer {
        pauses: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Pacer for RecordingPacer {
        async fn pause(&self, duration: Duration) {
            self.pauses.lock().unwrap().push(duration);
        }
    }

    fn incomplete() -> PriceRecord {
        let mut rec = PriceRecord::captured_now("goldr", "BDT");
        rec.set_if_unset(FieldKind::Gold21K, 7520.25);
        rec
    }

    fn complete() -> PriceRecord {
        let mut rec = PriceRecord::captured_now("goldr", "BDT");
        rec.set_if_unset(FieldKind::Gold22K, 7850.5);
        rec
    }

    fn unreachable() -> ScrapeError {
        ScrapeError::unreachable("goldr", "Fetch", Some(anyhow::anyhow!("HTTP status 503")))
    }

    #[tokio::test]
    async fn every_attempt_incomplete_exhausts_the_budget() {
        let mut pipeline = Scripted {
            results: vec![Ok(incomplete()), Err(unreachable()), Ok(incomplete())],
            calls: 0,
        };
        let pacer = RecordingPacer::default();
        let driver = RetryDriver::new(3, Duration::from_secs(10));

        let outcome = driver.run(&mut pipeline, &pacer).await;

        assert_eq!(pipeline.calls, 3);
        assert_eq!(
            *pacer.pauses.lock().unwrap(),
            vec![Duration::from_secs(10); 2]
        );
        match outcome {
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.is_incomplete());
                assert!(last_error.to_string().contains("gold 21K"));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stops_at_first_complete_attempt() {
        let mut pipeline = Scripted {
            results: vec![Err(unreachable()), Ok(complete()), Ok(complete())],
            calls: 0,
        };
        let pacer = RecordingPacer::default();
        let outcome = RetryDriver::new(3, Duration::from_secs(1))
            .run(&mut pipeline, &pacer)
            .await;

        assert_eq!(pipeline.calls, 2);
        assert_eq!(pacer.pauses.lock().unwrap().len(), 1);
        assert_eq!(outcome.attempts(), 2);
        assert!(matches!(
            outcome,
            RetryOutcome::Accepted { ref record, .. }
                if record.get(FieldKind::Gold22K) == Some(7850.5)
        ));
    }

    #[tokio::test]
    async fn single_attempt_never_pauses() {
        let mut pipeline = Scripted {
            results: vec![Err(unreachable())],
            calls: 0,
        };
        let pacer = RecordingPacer::default();
        let outcome = RetryDriver::new(0, Duration::from_secs(5))
            .run(&mut pipeline, &pacer)
            .await;

        assert_eq!(pipeline.calls, 1);
        assert!(pacer.pauses.lock().unwrap().is_empty());
        assert!(matches!(
            outcome,
            RetryOutcome::Exhausted { ref last_error, .. } if last_error.is_unreachable()
        ));
    }

    #[tokio::test]
    async fn tokio_pacer_sleeps_for_the_backoff() {
        let start = tokio::time::Instant::now();
        TokioPacer.pause(Duration::from_millis(30)).await;
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
