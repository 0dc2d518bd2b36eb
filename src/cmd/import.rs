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

use std::fs::read_to_string;
use std::path::Path;

use serde::Deserialize;

use crate::collection::Collection;
use crate::db::SqliteStore;
use crate::error::Fallible;
use crate::error::fail;
use crate::types::card::CardContent;
use crate::types::ids::CardId;
use crate::types::ids::DeckId;
use crate::types::timestamp::Timestamp;

/// A file of cards to import:
///
/// ```toml
/// [[cards]]
/// id = "haus"
/// partOfSpeech = "noun"
/// word = "Haus"
/// translation = "house"
/// gender = "neuter"
/// ```
#[derive(Deserialize)]
struct ImportFile {
    cards: Vec<ImportCard>,
}

#[derive(Deserialize)]
struct ImportCard {
    id: String,
    #[serde(flatten)]
    content: CardContent,
}

pub fn import_cards(directory: Option<String>, file: &str, deck: String) -> Fallible<()> {
    let collection = Collection::new(directory)?;
    let (added, skipped) = import_file(&collection.store, Path::new(file), &DeckId::new(deck))?;
    println!("Imported {added} cards ({skipped} already present).");
    Ok(())
}

/// Returns how many cards were added and how many were already present.
fn import_file(store: &SqliteStore, path: &Path, deck_id: &DeckId) -> Fallible<(usize, usize)> {
    if !path.exists() {
        return fail("file does not exist.");
    }
    let content = read_to_string(path)?;
    let file: ImportFile = toml::from_str(&content)?;
    let now = Timestamp::now();
    let mut added = 0;
    let mut skipped = 0;
    for card in file.cards {
        if card.id.trim().is_empty() {
            return fail("card IDs must not be empty.");
        }
        if store.add_card(&CardId::new(card.id), deck_id, &card.content, now)? {
            added += 1;
        } else {
            skipped += 1;
        }
    }
    log::debug!("Imported {added} cards into {deck_id}, skipped {skipped}.");
    Ok((added, skipped))
}
