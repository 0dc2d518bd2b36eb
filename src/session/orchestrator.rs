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

use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::config::SchedulerConfig;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;
use crate::progress::DeckProgress;
use crate::progress::bucket_of;
use crate::progress::project_deck;
use crate::scheduler::apply_rating;
use crate::session::queue::Selection;
use crate::session::queue::build_queue;
use crate::session::tracker::RatingBreakdown;
use crate::session::tracker::SessionSummary;
use crate::session::tracker::SessionTracker;
use crate::store::ReviewStore;
use crate::store::ReviewSubmission;
use crate::submit::Completion;
use crate::submit::PendingResync;
use crate::submit::RetryPolicy;
use crate::submit::SubmissionOutcome;
use crate::submit::Submitter;
use crate::types::card::CardReview;
use crate::types::date::Date;
use crate::types::ids::DeckId;
use crate::types::ids::SessionId;
use crate::types::ids::UserId;
use crate::types::rating::Rating;
use crate::types::timestamp::Timestamp;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Idle,
    Active,
    RatingInFlight,
    Completed,
    Cancelled,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Cancelled)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub deck_id: DeckId,
    pub user_id: UserId,
    pub started_at: Timestamp,
    /// The day the session schedules against.
    pub today: Date,
}

/// The live aggregate of a session. Exists only between `start` and
/// completion or cancellation.
pub struct Session {
    pub info: SessionInfo,
    pub cards: Vec<CardReview>,
    pub current_card_index: usize,
    tracker: SessionTracker,
}

impl Session {
    pub fn current_card(&self) -> Option<&CardReview> {
        self.cards.get(self.current_card_index)
    }

    pub fn rating_breakdown(&self) -> RatingBreakdown {
        self.tracker.rating_breakdown()
    }

    pub fn deck_progress(&self) -> DeckProgress {
        self.tracker.deck_progress()
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSession {
    pub info: SessionInfo,
    pub ended_at: Timestamp,
    pub summary: SessionSummary,
}

/// What the presentation layer reads between operations.
#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub phase: Phase,
    pub current: Option<CardReview>,
    pub flipped: bool,
    pub can_rate: bool,
    /// Zero-based index of the current card.
    pub position: usize,
    pub total: usize,
    pub rating_breakdown: RatingBreakdown,
    pub deck_progress: Option<DeckProgress>,
}

/// Drives one review session: `Idle → Active ⇄ RatingInFlight →
/// Completed`, or `Cancelled` from any non-terminal phase. A new session
/// needs a new orchestrator.
pub struct ReviewOrchestrator {
    store: Arc<dyn ReviewStore>,
    submitter: Submitter,
    config: SchedulerConfig,
    phase: Phase,
    session: Option<Session>,
    flipped: bool,
    can_rate: bool,
    completed: Option<CompletedSession>,
    pending_resync: Vec<PendingResync>,
}

impl ReviewOrchestrator {
    pub fn new(store: Arc<dyn ReviewStore>, config: &Config) -> Self {
        let submitter = Submitter::new(store.clone(), RetryPolicy::from(&config.retry));
        Self {
            store,
            submitter,
            config: config.scheduler.clone(),
            phase: Phase::Idle,
            session: None,
            flipped: false,
            can_rate: false,
            completed: None,
            pending_resync: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn completed(&self) -> Option<&CompletedSession> {
        self.completed.as_ref()
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.completed.as_ref().map(|c| &c.summary)
    }

    /// Cards whose writes exhausted their retries.
    pub fn pending_resync(&self) -> &[PendingResync] {
        &self.pending_resync
    }

    pub fn take_pending_resync(&mut self) -> Vec<PendingResync> {
        std::mem::take(&mut self.pending_resync)
    }

    /// Load the deck, snapshot its progress, and queue the cards to study.
    /// A deck with nothing to study completes the session immediately.
    pub async fn start(
        &mut self,
        deck_id: DeckId,
        user_id: UserId,
        selection: &Selection,
        today: Date,
    ) -> Fallible<()> {
        if self.phase != Phase::Idle {
            return fail("session already started.");
        }
        let cards = self.store.fetch_due_cards(&deck_id, &user_id).await?;
        let deck_progress_before =
            project_deck(cards.iter().map(|c| &c.sr_data), &self.config.mastery);
        let queue = build_queue(cards, selection, today);
        let info = SessionInfo {
            session_id: SessionId::generate(),
            deck_id,
            user_id,
            started_at: Timestamp::now(),
            today,
        };
        log::info!(
            "Session {} started on {} with {} cards ({} in deck).",
            info.session_id,
            info.deck_id,
            queue.len(),
            deck_progress_before.total()
        );
        if queue.is_empty() {
            log::info!("Nothing to review, session completed.");
            self.completed = Some(CompletedSession {
                info,
                ended_at: Timestamp::now(),
                summary: SessionSummary::empty(deck_progress_before),
            });
            self.phase = Phase::Completed;
            return Ok(());
        }
        self.session = Some(Session {
            info,
            cards: queue,
            current_card_index: 0,
            tracker: SessionTracker::new(deck_progress_before),
        });
        self.flipped = false;
        self.can_rate = true;
        self.phase = Phase::Active;
        Ok(())
    }

    /// Toggle whether the current card's answer is shown. Returns the new
    /// reveal state.
    pub fn flip_card(&mut self) -> bool {
        if self.phase != Phase::Active {
            log::warn!("Flipping a card while the session is {:?}.", self.phase);
            return self.flipped;
        }
        self.flipped = !self.flipped;
        self.flipped
    }

    /// Rate the current card.
    ///
    /// The new scheduling state, bucket transition, and session counters are
    /// applied before the write is sent. The write is retried per the retry
    /// policy; if it still fails, the card is queued for resync and the
    /// session continues. Dropping the returned future mid-write leaves the
    /// session in `RatingInFlight`; only `cancel` leaves that phase then.
    pub async fn rate_card(&mut self, rating: Rating, elapsed_seconds: u64) -> Fallible<()> {
        if self.phase != Phase::Active || !self.can_rate {
            return fail("no card is awaiting a rating.");
        }
        let (session_id, submission) = {
            let Some(session) = self.session.as_mut() else {
                return fail("no active session.");
            };
            let index = session.current_card_index;
            let Some(card) = session.cards.get_mut(index) else {
                return fail("current card is out of range.");
            };
            self.can_rate = false;
            self.phase = Phase::RatingInFlight;
            let before = card.sr_data.clone();
            let after = apply_rating(&before, rating, session.info.today, &self.config);
            let bucket_before = bucket_of(&before, &self.config.mastery);
            let bucket_after = bucket_of(&after, &self.config.mastery);
            log::debug!(
                "{} {} {:?}->{:?} interval={}d ease={:.2} due={}",
                after.card_id,
                rating,
                bucket_before,
                bucket_after,
                after.interval,
                after.ease_factor,
                after
                    .due_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
            card.sr_data = after;
            session.tracker.record(rating, elapsed_seconds);
            session.tracker.record_bucket_change(bucket_before, bucket_after);
            let submission = ReviewSubmission {
                user_id: session.info.user_id.clone(),
                card_id: card.sr_data.card_id.clone(),
                rating,
                client_timestamp: Timestamp::now(),
                review_date: session.info.today,
            };
            (session.info.session_id.clone(), submission)
        };

        let card_id = submission.card_id.clone();
        let completion = match self.submitter.spawn(session_id.clone(), submission).await {
            Ok(completion) => completion,
            Err(e) => Completion {
                session_id,
                card_id,
                outcome: SubmissionOutcome::Failed {
                    attempts: 0,
                    error: ErrorReport::from(e),
                },
            },
        };
        self.accept_completion(completion);
        self.advance();
        Ok(())
    }

    /// Apply the result of a submission task. Completions for a session this
    /// orchestrator no longer owns are ignored. A failed write, or a stored
    /// state that differs from the local one, queues the local state for
    /// resync.
    pub fn accept_completion(&mut self, completion: Completion) {
        let Some(session) = self.session.as_ref() else {
            log::debug!(
                "Ignoring late completion for {} in session {}.",
                completion.card_id,
                completion.session_id
            );
            return;
        };
        if session.info.session_id != completion.session_id {
            log::debug!(
                "Ignoring completion for {} from foreign session {}.",
                completion.card_id,
                completion.session_id
            );
            return;
        }
        let Some(local) = session
            .cards
            .iter()
            .find(|c| c.sr_data.card_id == completion.card_id)
            .map(|c| c.sr_data.clone())
        else {
            log::warn!("Completion for {} which is not in the session.", completion.card_id);
            return;
        };
        let error = match completion.outcome {
            SubmissionOutcome::Stored { state, attempts } => {
                log::debug!("Stored {} after {attempts} attempt(s).", completion.card_id);
                if state == local {
                    self.pending_resync.retain(|p| p.state.card_id != local.card_id);
                    return;
                }
                log::warn!(
                    "Store state for {} differs from local state, marking for resync.",
                    completion.card_id
                );
                ErrorReport::new(format!(
                    "store state for {} differs from local state",
                    completion.card_id
                ))
            }
            SubmissionOutcome::Failed { attempts, error } => {
                log::warn!(
                    "Could not store {} after {attempts} attempt(s), marking for resync: {error}",
                    completion.card_id
                );
                error
            }
        };
        let user_id = session.info.user_id.clone();
        self.pending_resync.retain(|p| p.state.card_id != local.card_id);
        self.pending_resync.push(PendingResync {
            user_id,
            state: local,
            error,
        });
    }

    fn advance(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.current_card_index += 1;
        self.flipped = false;
        if session.current_card_index < session.cards.len() {
            self.can_rate = true;
            self.phase = Phase::Active;
            return;
        }
        if let Some(session) = self.session.take() {
            let summary = session.tracker.finalize();
            log::info!(
                "Session {} completed: {} cards, {}% accuracy.",
                session.info.session_id,
                summary.cards_reviewed,
                summary.accuracy
            );
            self.completed = Some(CompletedSession {
                info: session.info,
                ended_at: Timestamp::now(),
                summary,
            });
        }
        self.can_rate = false;
        self.phase = Phase::Completed;
    }

    /// Abandon the session without a summary.
    pub fn cancel(&mut self) {
        if self.phase.is_terminal() {
            log::warn!("Cancelling a session that is already {:?}.", self.phase);
            return;
        }
        if let Some(session) = self.session.take() {
            log::info!("Session {} cancelled.", session.info.session_id);
        }
        self.flipped = false;
        self.can_rate = false;
        self.phase = Phase::Cancelled;
    }

    pub fn snapshot(&self) -> SessionView {
        match &self.session {
            Some(session) => SessionView {
                phase: self.phase,
                current: session.current_card().cloned(),
                flipped: self.flipped,
                can_rate: self.can_rate,
                position: session.current_card_index,
                total: session.cards.len(),
                rating_breakdown: session.rating_breakdown(),
                deck_progress: Some(session.deck_progress()),
            },
            None => SessionView {
                phase: self.phase,
                current: None,
                flipped: false,
                can_rate: false,
                position: 0,
                total: 0,
                rating_breakdown: self
                    .summary()
                    .map(|s| s.rating_breakdown)
                    .unwrap_or_default(),
                deck_progress: self.summary().map(|s| s.deck_progress_after),
            },
        }
    }
}
