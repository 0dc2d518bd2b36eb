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

use lexireview::config::MIN_EASE_FACTOR;
use lexireview::config::SchedulerConfig;
use lexireview::progress::DeckProgress;
use lexireview::progress::TransitionCounters;
use lexireview::progress::bucket_of;
use lexireview::progress::project_deck;
use lexireview::progress::record_transition;
use lexireview::scheduler::apply_rating;
use lexireview::types::card_state::CardState;
use lexireview::types::date::Date;
use lexireview::types::ids::CardId;
use lexireview::types::ids::DeckId;
use lexireview::types::rating::Rating;
use lexireview::types::sr_data::SrData;
use proptest::prelude::*;

fn rating() -> impl Strategy<Value = Rating> {
    prop::sample::select(Rating::ALL.to_vec())
}

fn start_date() -> Date {
    Date::parse("2025-01-01").unwrap()
}

/// Replays `ratings` on a fresh card, reviewing each time on the day it is
/// due.
fn replay(ratings: &[Rating], config: &SchedulerConfig) -> Vec<SrData> {
    let mut card = SrData::new(CardId::new("haus"), DeckId::new("german"));
    let mut today = start_date();
    let mut history = Vec::new();
    for rating in ratings {
        card = apply_rating(&card, *rating, today, config);
        if let Some(due) = card.due_date {
            today = due;
        }
        history.push(card.clone());
    }
    history
}

proptest! {
    #[test]
    fn review_count_is_successes_plus_failures(ratings in prop::collection::vec(rating(), 0..60)) {
        let config = SchedulerConfig::default();
        for (i, card) in replay(&ratings, &config).iter().enumerate() {
            prop_assert_eq!(card.review_count, card.success_count + card.failure_count);
            prop_assert_eq!(card.review_count as usize, i + 1);
        }
    }

    #[test]
    fn ease_and_interval_stay_in_bounds(ratings in prop::collection::vec(rating(), 0..60)) {
        let config = SchedulerConfig::default();
        for card in replay(&ratings, &config) {
            prop_assert!(card.ease_factor >= MIN_EASE_FACTOR);
            prop_assert!(card.interval <= config.max_interval);
            prop_assert!(card.due_date.is_some());
            if card.state == CardState::Review {
                prop_assert!(card.interval >= 1);
            }
        }
    }

    #[test]
    fn replay_is_deterministic(ratings in prop::collection::vec(rating(), 0..40)) {
        let config = SchedulerConfig::default();
        prop_assert_eq!(replay(&ratings, &config), replay(&ratings, &config));
    }

    #[test]
    fn lapse_resets_repetitions(
        prefix in prop::collection::vec(rating(), 0..30),
    ) {
        let config = SchedulerConfig::default();
        let history = replay(&prefix, &config);
        let card = history
            .last()
            .cloned()
            .unwrap_or_else(|| SrData::new(CardId::new("haus"), DeckId::new("german")));
        if card.state == CardState::Review {
            let today = card.due_date.unwrap_or_else(start_date);
            let lapsed = apply_rating(&card, Rating::Again, today, &config);
            prop_assert_eq!(lapsed.state, CardState::Relearning);
            prop_assert_eq!(lapsed.repetitions, 0);
            prop_assert_eq!(lapsed.step, 0);
            prop_assert_eq!(lapsed.failure_count, card.failure_count + 1);
        }
    }

    #[test]
    fn easy_grows_until_the_cap(count in 1usize..40) {
        let config = SchedulerConfig::default();
        let history = replay(&vec![Rating::Easy; count], &config);
        for pair in history.windows(2) {
            let (before, after) = (&pair[0], &pair[1]);
            if before.interval < config.max_interval {
                prop_assert!(after.interval > before.interval);
            } else {
                prop_assert_eq!(after.interval, config.max_interval);
            }
        }
    }

    #[test]
    fn deck_progress_is_conserved(
        sequences in prop::collection::vec(prop::collection::vec(rating(), 0..20), 1..20),
    ) {
        let config = SchedulerConfig::default();
        let mut cards: Vec<SrData> = (0..sequences.len())
            .map(|i| SrData::new(CardId::new(format!("card-{i}")), DeckId::new("german")))
            .collect();
        let before = project_deck(cards.iter(), &config.mastery);
        let mut running: DeckProgress = before;
        let mut transitions = TransitionCounters::default();
        let today = start_date();
        for (card, ratings) in cards.iter_mut().zip(&sequences) {
            for rating in ratings {
                let next = apply_rating(card, *rating, today, &config);
                let (from, to) = (bucket_of(card, &config.mastery), bucket_of(&next, &config.mastery));
                running.shift(from, to);
                record_transition(from, to, &mut transitions);
                *card = next;
            }
        }
        prop_assert_eq!(running.total(), before.total());
        prop_assert_eq!(running, project_deck(cards.iter(), &config.mastery));
        let ratings: usize = sequences.iter().map(|s| s.len()).sum();
        prop_assert!(transitions.total() as usize <= ratings);
    }
}
