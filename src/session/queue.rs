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

use crate::config::SessionConfig;
use crate::types::card::CardReview;
use crate::types::card::StudyCard;
use crate::types::card_state::CardState;
use crate::types::date::Date;

/// Which cards a session draws from the deck.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    /// Hard cap on the session's queue length.
    pub max_cards: usize,
    /// Cap on never-seen cards introduced in one session.
    pub max_new_cards: usize,
    /// Fill spare capacity with cards that are not due yet.
    pub early_practice: bool,
}

impl From<&SessionConfig> for Selection {
    fn from(config: &SessionConfig) -> Self {
        Self {
            max_cards: config.max_cards,
            max_new_cards: config.max_new_cards,
            early_practice: config.early_practice,
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

/// Build a session queue from every card of a deck.
///
/// Due cards come first, oldest due date first, then new cards in deck
/// order. With early practice enabled, spare capacity is filled with the
/// soonest-due remaining cards, which are flagged and spread evenly through
/// the queue.
pub fn build_queue(cards: Vec<StudyCard>, selection: &Selection, today: Date) -> Vec<CardReview> {
    let mut due: Vec<StudyCard> = Vec::new();
    let mut new: Vec<StudyCard> = Vec::new();
    let mut early: Vec<StudyCard> = Vec::new();
    for card in cards {
        if card.sr_data.state == CardState::New {
            new.push(card);
        } else if card.sr_data.is_due(today) {
            due.push(card);
        } else {
            early.push(card);
        }
    }
    let by_due_date = |a: &StudyCard, b: &StudyCard| {
        (a.sr_data.due_date, a.card_id()).cmp(&(b.sr_data.due_date, b.card_id()))
    };
    due.sort_by(by_due_date);
    early.sort_by(by_due_date);

    let mut regular: Vec<CardReview> = due
        .into_iter()
        .take(selection.max_cards)
        .map(|card| CardReview::new(card, false))
        .collect();
    let new_capacity = selection
        .max_new_cards
        .min(selection.max_cards - regular.len());
    regular.extend(
        new.into_iter()
            .take(new_capacity)
            .map(|card| CardReview::new(card, false)),
    );

    if !selection.early_practice {
        return regular;
    }
    let early: Vec<CardReview> = early
        .into_iter()
        .take(selection.max_cards - regular.len())
        .map(|card| CardReview::new(card, true))
        .collect();
    interleave(regular, early)
}

fn interleave(regular: Vec<CardReview>, early: Vec<CardReview>) -> Vec<CardReview> {
    let r = regular.len();
    let e = early.len();
    let mut out = Vec::with_capacity(r + e);
    let mut early = early.into_iter();
    let mut placed = 0;
    for (i, card) in regular.into_iter().enumerate() {
        out.push(card);
        let target = ((i + 1) * e) / r;
        while placed < target {
            if let Some(card) = early.next() {
                out.push(card);
            }
            placed += 1;
        }
    }
    out.extend(early);
    out
}
