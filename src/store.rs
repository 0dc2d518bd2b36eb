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

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Fallible;
use crate::types::card::StudyCard;
use crate::types::date::Date;
use crate::types::ids::CardId;
use crate::types::ids::DeckId;
use crate::types::ids::UserId;
use crate::types::rating::Rating;
use crate::types::sr_data::SrData;
use crate::types::timestamp::Timestamp;

/// One rating, as sent to the persistence collaborator.
#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmission {
    pub user_id: UserId,
    pub card_id: CardId,
    pub rating: Rating,
    pub client_timestamp: Timestamp,
    /// The day the rating is scheduled against. Stores must schedule with
    /// this, not with the clock, so that both sides agree.
    pub review_date: Date,
}

/// Where cards and their scheduling state live.
///
/// Implementations decide their own timeouts. Every method may fail; the
/// review session treats read failures at start as fatal and write failures
/// as retryable.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Every card of the deck with the user's current scheduling state for
    /// it. Cards the user has never seen come back in the `new` state. The
    /// session picks what is due from this.
    async fn fetch_due_cards(&self, deck_id: &DeckId, user_id: &UserId)
    -> Fallible<Vec<StudyCard>>;

    /// Record a rating and return the state the store computed for it.
    async fn submit_review(&self, submission: &ReviewSubmission) -> Fallible<SrData>;

    /// Overwrite the stored state of a card with one computed elsewhere.
    async fn resync_card(&self, user_id: &UserId, state: &SrData) -> Fallible<()>;
}
