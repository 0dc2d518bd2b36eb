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

//! The per-card scheduling state machine.
//!
//! Cards start `new`, climb a ladder of learning steps, graduate into
//! `review` where the interval grows by the ease factor, and drop into
//! `relearning` on a lapse. Every function here is pure.

use crate::config::MIN_EASE_FACTOR;
use crate::config::SchedulerConfig;
use crate::types::card_state::CardState;
use crate::types::date::Date;
use crate::types::rating::Rating;
use crate::types::sr_data::SrData;

/// Compute the scheduling state that results from rating `card` on `today`.
///
/// Inputs outside the arithmetic invariants (ease below the floor, review
/// interval of zero or beyond the cap, a step past the end of the ladder)
/// are clamped first.
pub fn apply_rating(card: &SrData, rating: Rating, today: Date, config: &SchedulerConfig) -> SrData {
    let mut next = sanitize(card, config);
    match next.state {
        CardState::New => {
            next.state = CardState::Learning;
            next.step = 0;
            rate_learning(&mut next, rating, today, config);
        }
        CardState::Learning => rate_learning(&mut next, rating, today, config),
        CardState::Review => rate_review(&mut next, rating, today, config),
        CardState::Relearning => rate_relearning(&mut next, rating, today, config),
    }
    next.review_count = next.review_count.saturating_add(1);
    if rating.is_success() {
        next.success_count = next.success_count.saturating_add(1);
    } else {
        next.failure_count = next.failure_count.saturating_add(1);
    }
    next
}

/// Days until the card would next be due for each rating, in the order
/// again, hard, good, easy.
pub fn preview_intervals(card: &SrData, today: Date, config: &SchedulerConfig) -> [u32; 4] {
    Rating::ALL.map(|rating| {
        let next = apply_rating(card, rating, today, config);
        match next.due_date {
            Some(due_date) => today.days_until(due_date).max(0) as u32,
            None => 0,
        }
    })
}

/// The length in days of rung `step` of a ladder. Steps past the end use
/// the last rung.
pub fn step_interval(ladder: &[u32], step: u32) -> u32 {
    let index = (step as usize).min(ladder.len().saturating_sub(1));
    ladder.get(index).copied().unwrap_or(1)
}

fn rate_learning(card: &mut SrData, rating: Rating, today: Date, config: &SchedulerConfig) {
    let ladder = &config.learning_steps;
    match rating {
        Rating::Again => {
            card.step = 0;
            card.repetitions = 0;
            card.due_date = Some(today.add_days(step_interval(ladder, 0)));
        }
        Rating::Hard => {
            card.due_date = Some(today.add_days(step_interval(ladder, card.step)));
        }
        Rating::Good => {
            card.step += 1;
            if card.step as usize >= ladder.len() {
                graduate(card, config.graduating_interval, today, config);
            } else {
                card.due_date = Some(today.add_days(step_interval(ladder, card.step)));
            }
        }
        Rating::Easy => graduate(card, config.easy_interval, today, config),
    }
}

fn rate_review(card: &mut SrData, rating: Rating, today: Date, config: &SchedulerConfig) {
    match rating {
        Rating::Again => {
            card.state = CardState::Relearning;
            card.step = 0;
            card.ease_factor = floor_ease(card.ease_factor - config.lapse_ease_penalty, config);
            card.repetitions = 0;
            card.due_date = Some(today.add_days(step_interval(&config.relearning_steps, 0)));
            // The interval is kept so recovery can restore part of it.
            return;
        }
        Rating::Hard => {
            card.interval = scale_interval(card.interval, config.hard_multiplier, config);
            card.ease_factor = floor_ease(card.ease_factor - config.hard_ease_penalty, config);
        }
        Rating::Good => {
            card.interval = scale_interval(card.interval, card.ease_factor, config);
        }
        Rating::Easy => {
            let factor = card.ease_factor * config.easy_multiplier;
            let max = config.max_interval.max(1);
            card.interval = scale_interval(card.interval, factor, config)
                .max(card.interval.saturating_add(1))
                .min(max);
            card.ease_factor += config.easy_ease_bonus;
        }
    }
    card.repetitions = card.repetitions.saturating_add(1);
    card.due_date = Some(today.add_days(card.interval));
}

fn rate_relearning(card: &mut SrData, rating: Rating, today: Date, config: &SchedulerConfig) {
    let ladder = &config.relearning_steps;
    match rating {
        Rating::Again => {
            card.step = 0;
            card.repetitions = 0;
            card.due_date = Some(today.add_days(step_interval(ladder, 0)));
        }
        Rating::Hard => {
            card.due_date = Some(today.add_days(step_interval(ladder, card.step)));
        }
        Rating::Good | Rating::Easy => {
            let interval = scale_interval(card.interval, config.lapse_recovery_factor, config);
            graduate(card, interval, today, config);
        }
    }
}

fn graduate(card: &mut SrData, interval: u32, today: Date, config: &SchedulerConfig) {
    card.state = CardState::Review;
    card.step = 0;
    card.interval = interval.clamp(1, config.max_interval.max(1));
    card.repetitions = 1;
    card.due_date = Some(today.add_days(card.interval));
}

/// `round(interval × factor)`, kept within `[1, max_interval]`.
fn scale_interval(interval: u32, factor: f64, config: &SchedulerConfig) -> u32 {
    let max = config.max_interval.max(1);
    let scaled = (f64::from(interval) * factor).round();
    if !scaled.is_finite() || scaled < 1.0 {
        1
    } else if scaled >= f64::from(max) {
        max
    } else {
        scaled as u32
    }
}

fn floor_ease(ease: f64, config: &SchedulerConfig) -> f64 {
    let min_ease = config.min_ease.max(MIN_EASE_FACTOR);
    if ease.is_finite() {
        ease.max(min_ease)
    } else {
        config.starting_ease.max(min_ease)
    }
}

/// Clamp a possibly malformed state back into the domain the state machine
/// expects.
fn sanitize(card: &SrData, config: &SchedulerConfig) -> SrData {
    let mut card = card.clone();
    card.ease_factor = floor_ease(card.ease_factor, config);
    match card.state {
        CardState::New => card.step = 0,
        CardState::Learning => {
            let last = config.learning_steps.len().saturating_sub(1) as u32;
            card.step = card.step.min(last);
        }
        CardState::Review => {
            card.step = 0;
            card.interval = card.interval.clamp(1, config.max_interval.max(1));
        }
        CardState::Relearning => {
            let last = config.relearning_steps.len().saturating_sub(1) as u32;
            card.step = card.step.min(last);
            card.interval = card.interval.clamp(1, config.max_interval.max(1));
        }
    }
    // Counters only go up: unaccounted reviews count as failures, and a
    // short review count is raised to the recorded outcomes.
    let recorded = card.success_count.saturating_add(card.failure_count);
    if card.review_count != recorded {
        log::warn!(
            "{}: review count {} does not match {} recorded outcomes",
            card.card_id,
            card.review_count,
            recorded
        );
        if card.review_count > recorded {
            card.failure_count += card.review_count - recorded;
        } else {
            card.review_count = recorded;
        }
    }
    card
}
