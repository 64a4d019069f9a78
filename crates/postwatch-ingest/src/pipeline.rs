//! One account's pass through fetch, dedup, enrich and persist.

use std::future::Future;

use postwatch_core::TrackedAccount;
use tokio_util::sync::CancellationToken;

use crate::client::TimelineSource;
use crate::dedup::dedup_candidates;
use crate::enrich::enrich_missing_media;
use crate::persist::persist_posts;
use crate::preview::PreviewResolver;
use crate::store::PostStore;

/// Pipeline stage an account failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Dedup,
    Persist,
    /// The account's task panicked.
    Unexpected,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Fetch => write!(f, "fetch"),
            Stage::Dedup => write!(f, "dedup"),
            Stage::Persist => write!(f, "persist"),
            Stage::Unexpected => write!(f, "unexpected"),
        }
    }
}

/// Result of processing one account in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountOutcome {
    Ingested {
        fetched: u64,
        new: u64,
        enriched: u64,
        persisted: u64,
    },
    /// The platform reports the account does not exist.
    AccountMissing,
    Failed {
        stage: Stage,
        error: String,
    },
    /// Shutdown was requested before the account finished; nothing was stored.
    Cancelled,
}

impl AccountOutcome {
    /// Posts written for the account.
    #[must_use]
    pub fn persisted(&self) -> u64 {
        match self {
            AccountOutcome::Ingested { persisted, .. } => *persisted,
            _ => 0,
        }
    }

    /// `true` for outcomes counted against the cycle as failures.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            AccountOutcome::Failed { .. } | AccountOutcome::AccountMissing
        )
    }
}

/// Runs `fut` to completion unless `cancel` fires first.
pub(crate) async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Option<F::Output> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}

/// Borrowed collaborators for processing a single account.
pub struct AccountPipeline<'a, T, R, S> {
    pub source: &'a T,
    pub resolver: &'a R,
    pub store: &'a S,
    pub max_results: u32,
}

impl<T, R, S> AccountPipeline<'_, T, R, S>
where
    T: TimelineSource,
    R: PreviewResolver,
    S: PostStore,
{
    /// Processes `account` end to end.
    ///
    /// Fetch, dedup and enrichment stop early on cancellation. Once the
    /// write has started it is allowed to finish so the account is never
    /// left half-stored.
    pub async fn run(&self, account: &TrackedAccount, cancel: &CancellationToken) -> AccountOutcome {
        let fetched = match until_cancelled(
            cancel,
            self.source
                .fetch_recent_posts(&account.external_id, self.max_results),
        )
        .await
        {
            None => return AccountOutcome::Cancelled,
            Some(Ok(timeline)) => timeline,
            Some(Err(e)) => {
                tracing::warn!(
                    account_id = account.id,
                    handle = %account.handle,
                    error = %e,
                    "timeline fetch failed"
                );
                return AccountOutcome::Failed {
                    stage: Stage::Fetch,
                    error: e.to_string(),
                };
            }
        };

        if fetched.account_missing {
            tracing::warn!(
                account_id = account.id,
                external_id = %account.external_id,
                handle = %account.handle,
                "platform reports tracked account does not exist"
            );
            return AccountOutcome::AccountMissing;
        }

        let fetched_count = fetched.posts.len() as u64;
        let mut fresh =
            match until_cancelled(cancel, dedup_candidates(self.store, account.id, fetched.posts))
                .await
            {
                None => return AccountOutcome::Cancelled,
                Some(Ok(posts)) => posts,
                Some(Err(e)) => {
                    tracing::warn!(account_id = account.id, error = %e, "dedup lookup failed");
                    return AccountOutcome::Failed {
                        stage: Stage::Dedup,
                        error: e.to_string(),
                    };
                }
            };

        if fresh.is_empty() {
            tracing::debug!(
                account_id = account.id,
                fetched = fetched_count,
                "no new posts"
            );
            return AccountOutcome::Ingested {
                fetched: fetched_count,
                new: 0,
                enriched: 0,
                persisted: 0,
            };
        }

        let Some(enriched) =
            until_cancelled(cancel, enrich_missing_media(self.resolver, &mut fresh)).await
        else {
            return AccountOutcome::Cancelled;
        };

        let new_count = fresh.len() as u64;
        match persist_posts(self.store, account.id, &fresh).await {
            Ok(persisted) => {
                tracing::info!(
                    account_id = account.id,
                    handle = %account.handle,
                    fetched = fetched_count,
                    new = new_count,
                    enriched,
                    persisted,
                    "account ingested"
                );
                AccountOutcome::Ingested {
                    fetched: fetched_count,
                    new: new_count,
                    enriched: enriched as u64,
                    persisted,
                }
            }
            Err(e) => {
                tracing::warn!(
                    account_id = account.id,
                    attempted = new_count,
                    error = %e,
                    "persist failed; batch discarded"
                );
                AccountOutcome::Failed {
                    stage: Stage::Persist,
                    error: e.to_string(),
                }
            }
        }
    }
}
