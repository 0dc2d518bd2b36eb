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

use serde::Serialize;

use crate::progress::Bucket;
use crate::progress::DeckProgress;
use crate::progress::TransitionCounters;
use crate::progress::record_transition;
use crate::types::rating::Rating;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingBreakdown {
    pub again: u32,
    pub hard: u32,
    pub good: u32,
    pub easy: u32,
}

impl RatingBreakdown {
    pub fn increment(&mut self, rating: Rating) {
        let counter = match rating {
            Rating::Again => &mut self.again,
            Rating::Hard => &mut self.hard,
            Rating::Good => &mut self.good,
            Rating::Easy => &mut self.easy,
        };
        *counter = counter.saturating_add(1);
    }

    pub fn get(&self, rating: Rating) -> u32 {
        match rating {
            Rating::Again => self.again,
            Rating::Hard => self.hard,
            Rating::Good => self.good,
            Rating::Easy => self.easy,
        }
    }

    pub fn total(&self) -> u32 {
        self.again + self.hard + self.good + self.easy
    }
}

/// The outcome of a finished session. Built once, never mutated.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub cards_reviewed: u32,
    /// Percentage of good or easy ratings, `0..=100`.
    pub accuracy: u32,
    /// Seconds.
    pub total_time: u64,
    /// Seconds.
    pub average_time_per_card: u64,
    pub rating_breakdown: RatingBreakdown,
    pub transitions: TransitionCounters,
    pub deck_progress_before: DeckProgress,
    pub deck_progress_after: DeckProgress,
}

impl SessionSummary {
    /// The summary of a session that had nothing to review.
    pub fn empty(deck_progress_before: DeckProgress) -> Self {
        Self {
            cards_reviewed: 0,
            accuracy: 0,
            total_time: 0,
            average_time_per_card: 0,
            rating_breakdown: RatingBreakdown::default(),
            transitions: TransitionCounters::default(),
            deck_progress_before,
            deck_progress_after: deck_progress_before,
        }
    }

    /// Whether there is a rating breakdown and transitions worth showing.
    pub fn has_details(&self) -> bool {
        self.cards_reviewed > 0
    }
}

/// Accumulates one session's ratings, timing, and bucket movements.
#[derive(Clone, Debug)]
pub struct SessionTracker {
    cards_reviewed: u32,
    total_time: u64,
    rating_breakdown: RatingBreakdown,
    transitions: TransitionCounters,
    deck_progress_before: DeckProgress,
    deck_progress: DeckProgress,
}

impl SessionTracker {
    pub fn new(deck_progress_before: DeckProgress) -> Self {
        Self {
            cards_reviewed: 0,
            total_time: 0,
            rating_breakdown: RatingBreakdown::default(),
            transitions: TransitionCounters::default(),
            deck_progress_before,
            deck_progress: deck_progress_before,
        }
    }

    pub fn record(&mut self, rating: Rating, elapsed_seconds: u64) {
        self.rating_breakdown.increment(rating);
        self.cards_reviewed = self.cards_reviewed.saturating_add(1);
        self.total_time = self.total_time.saturating_add(elapsed_seconds);
    }

    /// Apply one rated card's bucket change to the transition counters and
    /// the running deck progress.
    pub fn record_bucket_change(&mut self, before: Bucket, after: Bucket) {
        record_transition(before, after, &mut self.transitions);
        self.deck_progress.shift(before, after);
    }

    pub fn cards_reviewed(&self) -> u32 {
        self.cards_reviewed
    }

    pub fn rating_breakdown(&self) -> RatingBreakdown {
        self.rating_breakdown
    }

    pub fn transitions(&self) -> TransitionCounters {
        self.transitions
    }

    pub fn deck_progress(&self) -> DeckProgress {
        self.deck_progress
    }

    pub fn finalize(&self) -> SessionSummary {
        if self.cards_reviewed == 0 {
            return SessionSummary::empty(self.deck_progress_before);
        }
        let n = u64::from(self.cards_reviewed);
        let correct: u64 = Rating::ALL
            .iter()
            .filter(|rating| rating.is_correct())
            .map(|rating| u64::from(self.rating_breakdown.get(*rating)))
            .sum();
        SessionSummary {
            cards_reviewed: self.cards_reviewed,
            accuracy: rounded_ratio(100 * correct, n) as u32,
            total_time: self.total_time,
            average_time_per_card: rounded_ratio(self.total_time, n),
            rating_breakdown: self.rating_breakdown,
            transitions: self.transitions,
            deck_progress_before: self.deck_progress_before,
            deck_progress_after: self.deck_progress,
        }
    }
}

/// `round(numerator / denominator)` with halves rounded up, in integer
/// arithmetic. Returns 0 for a zero denominator.
fn rounded_ratio(numerator: u64, denominator: u64) -> u64 {
    if denominator == 0 {
        return 0;
    }
    let numerator = u128::from(numerator);
    let denominator = u128::from(denominator);
    ((2 * numerator + denominator) / (2 * denominator)) as u64
}
