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

use crate::types::ids::CardId;
use crate::types::ids::DeckId;
use crate::types::sr_data::SrData;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Masculine,
    Feminine,
    Neuter,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Masculine => "masculine",
            Gender::Feminine => "feminine",
            Gender::Neuter => "neuter",
        }
    }
}

/// What a vocabulary card shows, keyed by part of speech. Scheduling never
/// looks inside this.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(
    tag = "partOfSpeech",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum CardContent {
    Noun {
        word: String,
        translation: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gender: Option<Gender>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        plural: Option<String>,
    },
    Verb {
        infinitive: String,
        translation: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        past: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        participle: Option<String>,
        #[serde(default)]
        irregular: bool,
    },
    Adjective {
        word: String,
        translation: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comparative: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        superlative: Option<String>,
    },
    Phrase {
        text: String,
        translation: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        example: Option<String>,
    },
}

impl CardContent {
    pub fn part_of_speech(&self) -> &'static str {
        match self {
            CardContent::Noun { .. } => "noun",
            CardContent::Verb { .. } => "verb",
            CardContent::Adjective { .. } => "adjective",
            CardContent::Phrase { .. } => "phrase",
        }
    }

    /// The prompt side of the card.
    pub fn front(&self) -> &str {
        match self {
            CardContent::Noun { word, .. } => word,
            CardContent::Verb { infinitive, .. } => infinitive,
            CardContent::Adjective { word, .. } => word,
            CardContent::Phrase { text, .. } => text,
        }
    }

    /// The answer side: the translation followed by any grammar details,
    /// one per line.
    pub fn back(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        match self {
            CardContent::Noun {
                translation,
                gender,
                plural,
                ..
            } => {
                lines.push(translation.clone());
                if let Some(gender) = gender {
                    lines.push(format!("gender: {}", gender.as_str()));
                }
                if let Some(plural) = plural {
                    lines.push(format!("plural: {plural}"));
                }
            }
            CardContent::Verb {
                translation,
                past,
                participle,
                irregular,
                ..
            } => {
                lines.push(translation.clone());
                if let Some(past) = past {
                    lines.push(format!("past: {past}"));
                }
                if let Some(participle) = participle {
                    lines.push(format!("participle: {participle}"));
                }
                if *irregular {
                    lines.push("irregular".to_string());
                }
            }
            CardContent::Adjective {
                translation,
                comparative,
                superlative,
                ..
            } => {
                lines.push(translation.clone());
                if let Some(comparative) = comparative {
                    lines.push(format!("comparative: {comparative}"));
                }
                if let Some(superlative) = superlative {
                    lines.push(format!("superlative: {superlative}"));
                }
            }
            CardContent::Phrase {
                translation,
                example,
                ..
            } => {
                lines.push(translation.clone());
                if let Some(example) = example {
                    lines.push(format!("e.g. {example}"));
                }
            }
        }
        lines.join("\n")
    }
}

/// A card's content together with the learner's scheduling state for it.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyCard {
    pub content: CardContent,
    pub sr_data: SrData,
}

impl StudyCard {
    pub fn card_id(&self) -> &CardId {
        &self.sr_data.card_id
    }

    pub fn deck_id(&self) -> &DeckId {
        &self.sr_data.deck_id
    }
}

/// The view-model handed to the presentation layer for one queued card.
#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardReview {
    pub content: CardContent,
    pub sr_data: SrData,
    /// The card is being studied before its due date.
    pub is_early_practice: bool,
}

impl CardReview {
    pub fn new(card: StudyCard, is_early_practice: bool) -> Self {
        Self {
            content: card.content,
            sr_data: card.sr_data,
            is_early_practice,
        }
    }
}
