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

use std::fmt::Display;
use std::fmt::Formatter;

use clap::ValueEnum;
use serde::Serialize;

use crate::collection::Collection;
use crate::config::MasteryThresholds;
use crate::db::SqliteStore;
use crate::error::Fallible;
use crate::progress::DeckProgress;
use crate::progress::project_deck;
use crate::types::ids::DeckId;
use crate::types::ids::UserId;
use crate::types::timestamp::Timestamp;

#[derive(ValueEnum, Clone)]
pub enum StatsFormat {
    /// Plain text output.
    Text,
    /// JSON output.
    Json,
}

impl Display for StatsFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsFormat::Text => write!(f, "text"),
            StatsFormat::Json => write!(f, "json"),
        }
    }
}

pub fn print_deck_stats(
    directory: Option<String>,
    deck: String,
    user: String,
    format: StatsFormat,
) -> Fallible<()> {
    let collection = Collection::new(directory)?;
    let stats = deck_stats(
        &collection.store,
        &collection.config.scheduler.mastery,
        &DeckId::new(deck),
        &UserId::new(user),
    )?;
    match format {
        StatsFormat::Text => {
            let p = &stats.progress;
            println!("Cards: {}", stats.cards_in_deck_count);
            println!("New: {}", p.cards_new);
            println!("Learning: {}", p.cards_learning);
            println!("Review: {}", p.cards_review);
            println!("Mastered: {}", p.cards_mastered);
            println!("Reviews today: {}", stats.today_review_count);
        }
        StatsFormat::Json => {
            let stats_json = serde_json::to_string_pretty(&stats)?;
            println!("{}", stats_json);
        }
    }
    Ok(())
}

fn deck_stats(
    store: &SqliteStore,
    mastery: &MasteryThresholds,
    deck_id: &DeckId,
    user_id: &UserId,
) -> Fallible<Stats> {
    let cards = store.deck_cards(deck_id, user_id)?;
    let progress = project_deck(cards.iter().map(|c| &c.sr_data), mastery);
    Ok(Stats {
        cards_in_deck_count: store.card_count(deck_id)?,
        today_review_count: store.today_review_count(user_id, Timestamp::now().local_date())?,
        progress,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    cards_in_deck_count: usize,
    today_review_count: usize,
    #[serde(flatten)]
    progress: DeckProgress,
}
