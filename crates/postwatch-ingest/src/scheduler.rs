//! Periodic driver: runs every tracked account through the pipeline once
//! per cycle, pacing accounts to respect the platform's rate limits.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::client::TimelineSource;
use crate::pipeline::{until_cancelled, AccountOutcome, AccountPipeline, Stage};
use crate::preview::PreviewResolver;
use crate::store::{AccountRegistry, CycleJournal, PostStore};

const DEFAULT_STARTUP_DELAY_SECS: u64 = 10;
const DEFAULT_ACCOUNT_PAUSE_SECS: u64 = 900;
const DEFAULT_CYCLE_PERIOD_SECS: u64 = 86_400;
const DEFAULT_MAX_RESULTS: u32 = 10;

/// Timing and volume knobs for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Wait before the first cycle.
    pub startup_delay: Duration,
    /// Pause between consecutive accounts within a cycle.
    pub account_pause: Duration,
    /// Sleep after a cycle finishes before the next one starts.
    pub cycle_period: Duration,
    /// Posts requested per account per cycle.
    pub max_results: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_secs(DEFAULT_STARTUP_DELAY_SECS),
            account_pause: Duration::from_secs(DEFAULT_ACCOUNT_PAUSE_SECS),
            cycle_period: Duration::from_secs(DEFAULT_CYCLE_PERIOD_SECS),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl ScheduleConfig {
    #[must_use]
    pub fn from_app_config(config: &postwatch_core::AppConfig) -> Self {
        Self {
            startup_delay: Duration::from_secs(config.startup_delay_secs),
            account_pause: Duration::from_secs(config.account_pause_secs),
            cycle_period: Duration::from_secs(config.cycle_period_secs),
            max_results: config.fetch_max_results,
        }
    }
}

/// Totals for one cycle, written to the cycle journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Accounts that ran to an outcome (not cut short by cancellation).
    pub accounts_processed: u64,
    /// Accounts that failed at some stage or no longer exist on the platform.
    pub accounts_failed: u64,
    pub posts_persisted: u64,
    /// Cancellation ended the cycle early.
    pub cancelled: bool,
}

impl CycleSummary {
    fn begin() -> Self {
        let now = Utc::now();
        Self {
            cycle_id: Uuid::new_v4(),
            started_at: now,
            completed_at: now,
            accounts_processed: 0,
            accounts_failed: 0,
            posts_persisted: 0,
            cancelled: false,
        }
    }

    fn record(&mut self, outcome: &AccountOutcome) {
        if matches!(outcome, AccountOutcome::Cancelled) {
            self.cancelled = true;
            return;
        }
        self.accounts_processed += 1;
        if outcome.is_failure() {
            self.accounts_failed += 1;
        }
        self.posts_persisted += outcome.persisted();
    }
}

/// Owns the pipeline's collaborators and drives cycles until cancelled.
pub struct Scheduler<T, R, S> {
    source: T,
    resolver: R,
    store: S,
    config: ScheduleConfig,
}

impl<T, R, S> Scheduler<T, R, S>
where
    T: TimelineSource,
    R: PreviewResolver,
    S: AccountRegistry + PostStore + CycleJournal,
{
    #[must_use]
    pub fn new(source: T, resolver: R, store: S, config: ScheduleConfig) -> Self {
        Self {
            source,
            resolver,
            store,
            config,
        }
    }

    #[must_use]
    pub fn source(&self) -> &T {
        &self.source
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Waits the startup delay, then runs cycles separated by the cycle
    /// period until `cancel` fires. Returns promptly on cancellation.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            startup_delay_secs = self.config.startup_delay.as_secs(),
            cycle_period_secs = self.config.cycle_period.as_secs(),
            account_pause_secs = self.config.account_pause.as_secs(),
            "scheduler started"
        );

        if until_cancelled(&cancel, tokio::time::sleep(self.config.startup_delay))
            .await
            .is_none()
        {
            tracing::info!("scheduler cancelled before first cycle");
            return;
        }

        loop {
            self.run_cycle(&cancel).await;
            if cancel.is_cancelled() {
                break;
            }
            if until_cancelled(&cancel, tokio::time::sleep(self.config.cycle_period))
                .await
                .is_none()
            {
                break;
            }
        }

        tracing::info!("scheduler stopped");
    }

    /// Runs every tracked account once, sequentially, and journals the
    /// totals. No new account is started after `cancel` fires.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleSummary {
        let mut summary = CycleSummary::begin();
        tracing::info!(cycle_id = %summary.cycle_id, "ingestion cycle started");

        let accounts = match until_cancelled(cancel, self.store.list_tracked_accounts()).await {
            None => {
                summary.cancelled = true;
                Vec::new()
            }
            Some(Ok(accounts)) => accounts,
            Some(Err(e)) => {
                tracing::error!(
                    cycle_id = %summary.cycle_id,
                    error = %e,
                    "failed to load tracked accounts; skipping cycle"
                );
                Vec::new()
            }
        };

        let pipeline = AccountPipeline {
            source: &self.source,
            resolver: &self.resolver,
            store: &self.store,
            max_results: self.config.max_results,
        };

        for (index, account) in accounts.iter().enumerate() {
            if index > 0
                && until_cancelled(cancel, tokio::time::sleep(self.config.account_pause))
                    .await
                    .is_none()
            {
                summary.cancelled = true;
                break;
            }
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let outcome = match AssertUnwindSafe(pipeline.run(account, cancel))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::warn!(
                        cycle_id = %summary.cycle_id,
                        account_id = account.id,
                        stage = %Stage::Unexpected,
                        error = %message,
                        "account processing panicked"
                    );
                    AccountOutcome::Failed {
                        stage: Stage::Unexpected,
                        error: message,
                    }
                }
            };

            if let AccountOutcome::Failed { stage, .. } = &outcome {
                tracing::debug!(account_id = account.id, stage = %stage, "account failed");
            }
            summary.record(&outcome);
            if summary.cancelled {
                break;
            }
        }

        summary.completed_at = Utc::now();
        tracing::info!(
            cycle_id = %summary.cycle_id,
            accounts = accounts.len(),
            accounts_processed = summary.accounts_processed,
            accounts_failed = summary.accounts_failed,
            posts_persisted = summary.posts_persisted,
            cancelled = summary.cancelled,
            "ingestion cycle finished"
        );

        if let Err(e) = self.store.record_cycle(&summary).await {
            tracing::warn!(cycle_id = %summary.cycle_id, error = %e, "failed to journal cycle");
        }

        summary
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
