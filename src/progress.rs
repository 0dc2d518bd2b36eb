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

//! Display buckets and deck-level progress.

use serde::Serialize;

use crate::config::MasteryThresholds;
use crate::types::card_state::CardState;
use crate::types::sr_data::SrData;

/// A coarse display category derived from scheduling state.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    New,
    Learning,
    Review,
    Mastered,
}

/// A named movement between buckets.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Transition {
    NewToLearning,
    LearningToReview,
    ReviewToMastered,
    ToRelearning,
}

pub fn bucket_of(card: &SrData, mastery: &MasteryThresholds) -> Bucket {
    match card.state {
        CardState::New => Bucket::New,
        CardState::Learning | CardState::Relearning => Bucket::Learning,
        CardState::Review => {
            if card.interval >= mastery.interval && card.repetitions >= mastery.repetitions {
                Bucket::Mastered
            } else {
                Bucket::Review
            }
        }
    }
}

/// Which named transition, if any, moving from `before` to `after` is.
pub fn transition_between(before: Bucket, after: Bucket) -> Option<Transition> {
    match (before, after) {
        (Bucket::New, Bucket::Learning) => Some(Transition::NewToLearning),
        (Bucket::Learning, Bucket::Review) => Some(Transition::LearningToReview),
        (Bucket::Review, Bucket::Mastered) => Some(Transition::ReviewToMastered),
        (Bucket::Review | Bucket::Mastered, Bucket::Learning) => Some(Transition::ToRelearning),
        _ => None,
    }
}

/// Increment the counter for the transition from `before` to `after`. At
/// most one counter changes.
pub fn record_transition(before: Bucket, after: Bucket, into: &mut TransitionCounters) {
    if let Some(transition) = transition_between(before, after) {
        into.increment(transition);
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionCounters {
    pub new_to_learning: u32,
    pub learning_to_review: u32,
    pub review_to_mastered: u32,
    pub to_relearning: u32,
}

impl TransitionCounters {
    pub fn increment(&mut self, transition: Transition) {
        let counter = match transition {
            Transition::NewToLearning => &mut self.new_to_learning,
            Transition::LearningToReview => &mut self.learning_to_review,
            Transition::ReviewToMastered => &mut self.review_to_mastered,
            Transition::ToRelearning => &mut self.to_relearning,
        };
        *counter = counter.saturating_add(1);
    }

    pub fn total(&self) -> u32 {
        self.new_to_learning + self.learning_to_review + self.review_to_mastered + self.to_relearning
    }
}

/// How many cards of a deck sit in each bucket.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckProgress {
    pub cards_new: u32,
    pub cards_learning: u32,
    pub cards_review: u32,
    pub cards_mastered: u32,
}

impl DeckProgress {
    pub fn total(&self) -> u32 {
        self.cards_new + self.cards_learning + self.cards_review + self.cards_mastered
    }

    pub fn count(&self, bucket: Bucket) -> u32 {
        match bucket {
            Bucket::New => self.cards_new,
            Bucket::Learning => self.cards_learning,
            Bucket::Review => self.cards_review,
            Bucket::Mastered => self.cards_mastered,
        }
    }

    fn slot(&mut self, bucket: Bucket) -> &mut u32 {
        match bucket {
            Bucket::New => &mut self.cards_new,
            Bucket::Learning => &mut self.cards_learning,
            Bucket::Review => &mut self.cards_review,
            Bucket::Mastered => &mut self.cards_mastered,
        }
    }

    pub fn add(&mut self, bucket: Bucket) {
        let slot = self.slot(bucket);
        *slot = slot.saturating_add(1);
    }

    /// Move one card from `before` to `after`. A no-op when the buckets are
    /// equal, or when `before` is already empty (the card was not part of
    /// the projected deck), so the total never changes.
    pub fn shift(&mut self, before: Bucket, after: Bucket) {
        if before == after {
            return;
        }
        let from = self.slot(before);
        if *from == 0 {
            log::warn!("Bucket {before:?} is empty, not moving a card to {after:?}.");
            return;
        }
        *from -= 1;
        self.add(after);
    }
}

/// Count the bucket membership of every card in a deck.
pub fn project_deck<'a>(
    cards: impl IntoIterator<Item = &'a SrData>,
    mastery: &MasteryThresholds,
) -> DeckProgress {
    let mut progress = DeckProgress::default();
    for card in cards {
        progress.add(bucket_of(card, mastery));
    }
    progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ids::CardId;
    use crate::types::ids::DeckId;

    fn card(state: CardState, interval: u32, repetitions: u32) -> SrData {
        let mut card = SrData::new(CardId::new("c"), DeckId::new("d"));
        card.state = state;
        card.interval = interval;
        card.repetitions = repetitions;
        card
    }

    #[test]
    fn test_bucket_of() {
        let m = MasteryThresholds::default();
        assert_eq!(bucket_of(&card(CardState::New, 0, 0), &m), Bucket::New);
        assert_eq!(bucket_of(&card(CardState::Learning, 0, 0), &m), Bucket::Learning);
        assert_eq!(bucket_of(&card(CardState::Relearning, 30, 0), &m), Bucket::Learning);
        assert_eq!(bucket_of(&card(CardState::Review, 20, 5), &m), Bucket::Review);
        assert_eq!(bucket_of(&card(CardState::Review, 21, 1), &m), Bucket::Review);
        assert_eq!(bucket_of(&card(CardState::Review, 21, 2), &m), Bucket::Mastered);
    }

    #[test]
    fn test_transition_between() {
        use Bucket::*;
        assert_eq!(transition_between(New, Learning), Some(Transition::NewToLearning));
        assert_eq!(transition_between(Learning, Review), Some(Transition::LearningToReview));
        assert_eq!(transition_between(Review, Mastered), Some(Transition::ReviewToMastered));
        assert_eq!(transition_between(Review, Learning), Some(Transition::ToRelearning));
        assert_eq!(transition_between(Mastered, Learning), Some(Transition::ToRelearning));
        assert_eq!(transition_between(Review, Review), None);
        assert_eq!(transition_between(New, Review), None);
        assert_eq!(transition_between(Mastered, Review), None);
        assert_eq!(transition_between(Learning, Learning), None);
    }

    #[test]
    fn test_record_transition_increments_at_most_one() {
        let buckets = [Bucket::New, Bucket::Learning, Bucket::Review, Bucket::Mastered];
        for before in buckets {
            for after in buckets {
                let mut counters = TransitionCounters::default();
                record_transition(before, after, &mut counters);
                assert!(counters.total() <= 1);
            }
        }
    }

    #[test]
    fn test_project_deck() {
        let cards = vec![
            card(CardState::New, 0, 0),
            card(CardState::New, 0, 0),
            card(CardState::Learning, 0, 0),
            card(CardState::Review, 5, 1),
            card(CardState::Review, 40, 4),
        ];
        let progress = project_deck(&cards, &MasteryThresholds::default());
        assert_eq!(
            progress,
            DeckProgress {
                cards_new: 2,
                cards_learning: 1,
                cards_review: 1,
                cards_mastered: 1,
            }
        );
        assert_eq!(progress.total(), 5);
    }

    #[test]
    fn test_shift_conserves_total() {
        let mut progress = DeckProgress {
            cards_new: 1,
            cards_learning: 0,
            cards_review: 0,
            cards_mastered: 0,
        };
        progress.shift(Bucket::New, Bucket::Learning);
        assert_eq!(progress.cards_new, 0);
        assert_eq!(progress.cards_learning, 1);
        // Nothing left in `new` to move.
        progress.shift(Bucket::New, Bucket::Review);
        assert_eq!(progress.total(), 1);
        assert_eq!(progress.count(Bucket::Review), 0);
    }
}
