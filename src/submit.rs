// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Asynchronous, retried delivery of ratings to a [`ReviewStore`].

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::config::RetryConfig;
use crate::error::ErrorReport;
use crate::store::ReviewStore;
use crate::store::ReviewSubmission;
use crate::types::ids::CardId;
use crate::types::ids::SessionId;
use crate::types::ids::UserId;
use crate::types::sr_data::SrData;

/// Bounded exponential backoff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// How long to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubmissionOutcome {
    Stored { state: SrData, attempts: u32 },
    Failed { attempts: u32, error: ErrorReport },
}

/// The result of one submission task, tagged with the session that issued
/// it.
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub session_id: SessionId,
    pub card_id: CardId,
    pub outcome: SubmissionOutcome,
}

/// A card whose write never reached the store. `state` is the locally
/// computed state to push once the store is reachable again.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingResync {
    pub user_id: UserId,
    pub state: SrData,
    pub error: ErrorReport,
}

#[derive(Clone)]
pub struct Submitter {
    store: Arc<dyn ReviewStore>,
    policy: RetryPolicy,
}

impl Submitter {
    pub fn new(store: Arc<dyn ReviewStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Submit on a task of its own. The task runs to completion even if the
    /// handle is dropped.
    pub fn spawn(&self, session_id: SessionId, submission: ReviewSubmission) -> JoinHandle<Completion> {
        let store = self.store.clone();
        let policy = self.policy.clone();
        tokio::spawn(async move {
            let card_id = submission.card_id.clone();
            let outcome = submit_with_retry(store.as_ref(), &policy, &submission).await;
            Completion {
                session_id,
                card_id,
                outcome,
            }
        })
    }
}

pub async fn submit_with_retry(
    store: &dyn ReviewStore,
    policy: &RetryPolicy,
    submission: &ReviewSubmission,
) -> SubmissionOutcome {
    let mut attempt = 1;
    loop {
        match store.submit_review(submission).await {
            Ok(state) => {
                return SubmissionOutcome::Stored {
                    state,
                    attempts: attempt,
                };
            }
            Err(error) => {
                if attempt >= policy.max_attempts {
                    log::error!(
                        "Giving up on {} after {attempt} attempts: {error}",
                        submission.card_id
                    );
                    return SubmissionOutcome::Failed {
                        attempts: attempt,
                        error,
                    };
                }
                let delay = policy.delay_after(attempt);
                log::warn!(
                    "Attempt {attempt} to submit {} failed ({error}), retrying in {}ms",
                    submission.card_id,
                    delay.as_millis()
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Push locally computed states to the store. Returns the entries that still
/// could not be written.
pub async fn flush_resync(store: &dyn ReviewStore, pending: Vec<PendingResync>) -> Vec<PendingResync> {
    let mut remaining = Vec::new();
    for entry in pending {
        match store.resync_card(&entry.user_id, &entry.state).await {
            Ok(()) => log::debug!("Resynced {}", entry.state.card_id),
            Err(error) => {
                log::warn!("Resync of {} failed: {error}", entry.state.card_id);
                remaining.push(PendingResync { error, ..entry });
            }
        }
    }
    remaining
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::test_support::MemoryStore;
    use crate::test_support::sample_deck;
    use crate::types::rating::Rating;
    use crate::types::timestamp::Timestamp;

    fn submission(card_id: &str) -> ReviewSubmission {
        ReviewSubmission {
            user_id: UserId::new("ana"),
            card_id: CardId::new(card_id),
            rating: Rating::Good,
            client_timestamp: Timestamp::now(),
            review_date: Timestamp::now().local_date(),
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(1000),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(200));
        assert_eq!(policy.delay_after(2), Duration::from_millis(400));
        assert_eq!(policy.delay_after(3), Duration::from_millis(800));
        assert_eq!(policy.delay_after(4), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(60), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let store = MemoryStore::new(sample_deck(2));
        store.fail_next(2);
        let policy = RetryPolicy::default();
        let started = Instant::now();
        let outcome = submit_with_retry(&store, &policy, &submission("card-0")).await;
        match outcome {
            SubmissionOutcome::Stored { attempts, state } => {
                assert_eq!(attempts, 3);
                assert_eq!(state.review_count, 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        // 200ms after the first failure, 400ms after the second.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(600));
        assert!(elapsed < Duration::from_millis(700));
        assert_eq!(store.submit_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let store = MemoryStore::new(sample_deck(1));
        store.fail_next(10);
        let outcome = submit_with_retry(&store, &RetryPolicy::default(), &submission("card-0")).await;
        match outcome {
            SubmissionOutcome::Failed { attempts, error } => {
                assert_eq!(attempts, 3);
                assert_eq!(error.message(), "store unavailable");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(store.submit_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_task_is_tagged() -> crate::error::Fallible<()> {
        let store = Arc::new(MemoryStore::new(sample_deck(1)));
        let submitter = Submitter::new(store, RetryPolicy::default());
        let session_id = SessionId::new("s-1");
        let completion = submitter
            .spawn(session_id.clone(), submission("card-0"))
            .await?;
        assert_eq!(completion.session_id, session_id);
        assert_eq!(completion.card_id, CardId::new("card-0"));
        assert!(matches!(completion.outcome, SubmissionOutcome::Stored { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_flush_resync() {
        let store = MemoryStore::new(sample_deck(2));
        let deck = sample_deck(2);
        let mut state = deck[1].sr_data.clone();
        state.review_count = 1;
        state.success_count = 1;
        let pending = vec![PendingResync {
            user_id: UserId::new("ana"),
            state: state.clone(),
            error: ErrorReport::new("store unavailable"),
        }];
        store.fail_resync(true);
        let remaining = flush_resync(&store, pending).await;
        assert_eq!(remaining.len(), 1);
        store.fail_resync(false);
        let remaining = flush_resync(&store, remaining).await;
        assert!(remaining.is_empty());
        assert_eq!(store.state_of(&CardId::new("card-1")), Some(state));
    }
}
