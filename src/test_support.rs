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

//! In-memory store and fixtures shared by the unit tests.

use std::future::pending;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use async_trait::async_trait;

use crate::config::SchedulerConfig;
use crate::error::Fallible;
use crate::error::fail;
use crate::scheduler::apply_rating;
use crate::store::ReviewStore;
use crate::store::ReviewSubmission;
use crate::types::card::CardContent;
use crate::types::card::StudyCard;
use crate::types::ids::CardId;
use crate::types::ids::DeckId;
use crate::types::ids::UserId;
use crate::types::sr_data::SrData;

/// `count` new phrase cards named `card-0`, `card-1`, ... in deck `german`.
pub fn sample_deck(count: usize) -> Vec<StudyCard> {
    (0..count)
        .map(|i| StudyCard {
            content: CardContent::Phrase {
                text: format!("phrase {i}"),
                translation: format!("translation {i}"),
                example: None,
            },
            sr_data: SrData::new(CardId::new(format!("card-{i}")), DeckId::new("german")),
        })
        .collect()
}

pub struct MemoryStore {
    cards: Mutex<Vec<StudyCard>>,
    config: SchedulerConfig,
    failures_left: AtomicU32,
    submit_calls: AtomicU32,
    fail_fetch: AtomicBool,
    fail_resync: AtomicBool,
    hang: AtomicBool,
}

impl MemoryStore {
    pub fn new(cards: Vec<StudyCard>) -> Self {
        Self {
            cards: Mutex::new(cards),
            config: SchedulerConfig::default(),
            failures_left: AtomicU32::new(0),
            submit_calls: AtomicU32::new(0),
            fail_fetch: AtomicBool::new(false),
            fail_resync: AtomicBool::new(false),
            hang: AtomicBool::new(false),
        }
    }

    /// Make the next `count` submissions fail.
    pub fn fail_next(&self, count: u32) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_resync(&self, fail: bool) {
        self.fail_resync.store(fail, Ordering::SeqCst);
    }

    /// Make submissions never complete.
    pub fn hang_submissions(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn state_of(&self, card_id: &CardId) -> Option<SrData> {
        let cards = self.cards.lock().unwrap();
        cards
            .iter()
            .find(|c| c.card_id() == card_id)
            .map(|c| c.sr_data.clone())
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn fetch_due_cards(
        &self,
        deck_id: &DeckId,
        _user_id: &UserId,
    ) -> Fallible<Vec<StudyCard>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return fail("store unavailable");
        }
        let cards = self.cards.lock().unwrap();
        Ok(cards
            .iter()
            .filter(|c| c.deck_id() == deck_id)
            .cloned()
            .collect())
    }

    async fn submit_review(&self, submission: &ReviewSubmission) -> Fallible<SrData> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            pending::<()>().await;
        }
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return fail("store unavailable");
        }
        let today = submission.review_date;
        let mut cards = self.cards.lock().unwrap();
        let Some(card) = cards.iter_mut().find(|c| c.card_id() == &submission.card_id) else {
            return fail(format!("unknown card: {}", submission.card_id));
        };
        card.sr_data = apply_rating(&card.sr_data, submission.rating, today, &self.config);
        Ok(card.sr_data.clone())
    }

    async fn resync_card(&self, _user_id: &UserId, state: &SrData) -> Fallible<()> {
        if self.fail_resync.load(Ordering::SeqCst) {
            return fail("store unavailable");
        }
        let mut cards = self.cards.lock().unwrap();
        match cards.iter_mut().find(|c| c.card_id() == &state.card_id) {
            Some(card) => {
                card.sr_data = state.clone();
                Ok(())
            }
            None => fail(format!("unknown card: {}", state.card_id)),
        }
    }
}
