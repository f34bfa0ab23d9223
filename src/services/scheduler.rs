//! Periodic driver for the transaction processor.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::services::processor::TransactionProcessor;

/// Runs a full settlement pass on a fixed interval, forever. Each pass is
/// awaited before the next tick is taken, so passes never overlap; a pass
/// that overruns the interval delays the next tick instead of bursting to
/// catch up.
pub struct Scheduler {
    period: Duration,
    processor: Arc<TransactionProcessor>,
}

impl Scheduler {
    pub fn new(period: Duration, processor: Arc<TransactionProcessor>) -> Self {
        Self { period, processor }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("settlement scheduler started, period {:?}", self.period);
            let mut ticker = self.ticker();

            loop {
                ticker.tick().await;

                match self.processor.run_pass().await {
                    Ok(summary) if summary.picked > 0 => {
                        debug!(
                            "settlement pass finished: {} picked, {} completed, {} failed, {} requeued",
                            summary.picked, summary.completed, summary.failed, summary.requeued
                        );
                    }
                    Ok(_) => {}
                    // The loop must survive indefinitely; a failed pass is
                    // logged and the next tick tries again.
                    Err(e) => error!("settlement pass error: {}", e),
                }
            }
        })
    }

    fn ticker(&self) -> Interval {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }
}
