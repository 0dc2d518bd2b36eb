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

use clap::Parser;

use crate::cmd::drill::drill;
use crate::cmd::import::import_cards;
use crate::cmd::stats::StatsFormat;
use crate::cmd::stats::print_deck_stats;
use crate::error::Fallible;

#[derive(Parser)]
#[command(version, about, long_about = None)]
enum Command {
    /// Review the cards of a deck in the terminal.
    Drill {
        /// The deck to review.
        deck: String,
        /// Path to the collection directory. By default, the current working directory is used.
        directory: Option<String>,
        /// Who is reviewing.
        #[arg(long, default_value = "local")]
        user: String,
        /// Top the session up with cards that are not due yet.
        #[arg(long)]
        early: bool,
        /// Maximum number of cards to review in this session.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Import cards from a TOML file into a deck.
    Import {
        /// Path to the TOML file.
        file: String,
        /// The deck to add the cards to.
        deck: String,
        /// Path to the collection directory. By default, the current working directory is used.
        directory: Option<String>,
    },
    /// Print deck progress.
    Stats {
        /// The deck to describe.
        deck: String,
        /// Path to the collection directory. By default, the current working directory is used.
        directory: Option<String>,
        /// Whose progress to show.
        #[arg(long, default_value = "local")]
        user: String,
        /// Output format.
        #[arg(long, default_value_t = StatsFormat::Text)]
        format: StatsFormat,
    },
}

pub async fn entrypoint() -> Fallible<()> {
    let cli: Command = Command::parse();
    match cli {
        Command::Drill {
            deck,
            directory,
            user,
            early,
            limit,
        } => drill(directory, deck, user, early, limit).await,
        Command::Import {
            file,
            deck,
            directory,
        } => import_cards(directory, &file, deck),
        Command::Stats {
            deck,
            directory,
            user,
            format,
        } => print_deck_stats(directory, deck, user, format),
    }
}
