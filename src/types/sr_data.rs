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

use serde::Deserialize;
use serde::Serialize;

use crate::types::card_state::CardState;
use crate::types::date::Date;
use crate::types::ids::CardId;
use crate::types::ids::DeckId;

/// The ease factor every card starts with.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Scheduling state of one card for one learner.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SrData {
    pub card_id: CardId,
    pub deck_id: DeckId,
    pub state: CardState,
    /// Index into the learning or relearning ladder.
    pub step: u32,
    /// Days until the next review once graduated.
    pub interval: u32,
    pub ease_factor: f64,
    /// Consecutive successful reviews since the last lapse.
    pub repetitions: u32,
    /// `None` only for cards that have never been seen.
    pub due_date: Option<Date>,
    pub review_count: u32,
    pub success_count: u32,
    pub failure_count: u32,
}

impl SrData {
    /// The state of a card that has never been reviewed.
    pub fn new(card_id: CardId, deck_id: DeckId) -> Self {
        Self {
            card_id,
            deck_id,
            state: CardState::New,
            step: 0,
            interval: 0,
            ease_factor: DEFAULT_EASE_FACTOR,
            repetitions: 0,
            due_date: None,
            review_count: 0,
            success_count: 0,
            failure_count: 0,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.review_count == 0 {
            0.0
        } else {
            f64::from(self.success_count) / f64::from(self.review_count)
        }
    }

    /// Whether the card should be presented on `today`. New cards are
    /// always available.
    pub fn is_due(&self, today: Date) -> bool {
        match self.due_date {
            None => true,
            Some(due_date) => due_date <= today,
        }
    }
}
