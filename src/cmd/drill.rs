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

use std::io::BufRead;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use crate::collection::Collection;
use crate::error::Fallible;
use crate::session::orchestrator::Phase;
use crate::session::orchestrator::ReviewOrchestrator;
use crate::session::queue::Selection;
use crate::session::tracker::SessionSummary;
use crate::store::ReviewStore;
use crate::submit::flush_resync;
use crate::types::ids::DeckId;
use crate::types::ids::UserId;
use crate::types::rating::Rating;
use crate::types::timestamp::Timestamp;

pub async fn drill(
    directory: Option<String>,
    deck: String,
    user: String,
    early: bool,
    limit: Option<usize>,
) -> Fallible<()> {
    let collection = Collection::new(directory)?;
    let mut selection = Selection::from(&collection.config.session);
    if early {
        selection.early_practice = true;
    }
    if let Some(limit) = limit {
        selection.max_cards = limit;
    }
    let today = Timestamp::now().local_date();
    let store: Arc<dyn ReviewStore> = Arc::new(collection.store.clone());
    let mut orchestrator = ReviewOrchestrator::new(store.clone(), &collection.config);
    orchestrator
        .start(DeckId::new(deck), UserId::new(user), &selection, today)
        .await?;

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    run_session(&mut orchestrator, &mut input, &mut output).await?;

    if let Some(completed) = orchestrator.completed() {
        if completed.summary.cards_reviewed > 0 {
            collection.store.save_session(completed)?;
        }
        print_summary(&completed.summary, &mut output)?;
    }

    let pending = orchestrator.take_pending_resync();
    if !pending.is_empty() {
        log::info!("Resyncing {} card(s).", pending.len());
        let remaining = flush_resync(store.as_ref(), pending).await;
        for entry in &remaining {
            log::error!("Card {} could not be saved: {}", entry.state.card_id, entry.error);
        }
    }
    Ok(())
}

/// Show cards and read ratings until the session completes, the user quits,
/// or input runs out.
async fn run_session<R: BufRead, W: Write>(
    orchestrator: &mut ReviewOrchestrator,
    input: &mut R,
    output: &mut W,
) -> Fallible<()> {
    loop {
        let view = orchestrator.snapshot();
        if view.phase != Phase::Active {
            break;
        }
        let Some(card) = view.current else {
            break;
        };
        let marker = if card.is_early_practice { " (early)" } else { "" };
        writeln!(
            output,
            "[{}/{}] {}{marker}",
            view.position + 1,
            view.total,
            card.content.front()
        )?;
        writeln!(output, "[press enter to reveal, q to quit]")?;
        let start = Instant::now();
        match read_line(input)? {
            Some(line) if line != "q" => {}
            _ => {
                orchestrator.cancel();
                break;
            }
        }
        orchestrator.flip_card();
        writeln!(output, "{}", card.content.back())?;
        let Some(rating) = read_rating(input, output)? else {
            orchestrator.cancel();
            break;
        };
        let elapsed = start.elapsed().as_secs();
        orchestrator.rate_card(rating, elapsed).await?;
    }
    if orchestrator.phase() == Phase::Cancelled {
        writeln!(output, "Session cancelled.")?;
    }
    Ok(())
}

/// Returns `None` on end of input.
fn read_line<R: BufRead>(input: &mut R) -> Fallible<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Returns `None` if the user quits.
fn read_rating<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Fallible<Option<Rating>> {
    loop {
        writeln!(output, "Rating: (1 = Again, 2 = Hard, 3 = Good, 4 = Easy, q = Quit)")?;
        let Some(line) = read_line(input)? else {
            return Ok(None);
        };
        if line == "q" {
            return Ok(None);
        }
        match line.parse::<Rating>() {
            Ok(rating) => return Ok(Some(rating)),
            Err(e) => writeln!(output, "{}", e.message())?,
        }
    }
}

fn print_summary<W: Write>(summary: &SessionSummary, output: &mut W) -> Fallible<()> {
    if summary.cards_reviewed == 0 {
        writeln!(output, "Nothing to review.")?;
        return Ok(());
    }
    writeln!(output, "Reviewed {} cards.", summary.cards_reviewed)?;
    writeln!(output, "Accuracy: {}%", summary.accuracy)?;
    writeln!(
        output,
        "Time: {}s ({}s per card)",
        summary.total_time, summary.average_time_per_card
    )?;
    if summary.has_details() {
        let b = &summary.rating_breakdown;
        writeln!(
            output,
            "Again: {}  Hard: {}  Good: {}  Easy: {}",
            b.again, b.hard, b.good, b.easy
        )?;
        let t = &summary.transitions;
        writeln!(
            output,
            "New to learning: {}  Learning to review: {}  Review to mastered: {}  Relearning: {}",
            t.new_to_learning, t.learning_to_review, t.review_to_mastered, t.to_relearning
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::config::Config;
    use crate::test_support::MemoryStore;
    use crate::test_support::sample_deck;
    use crate::types::date::Date;

    async fn started(cards: usize) -> (Arc<MemoryStore>, ReviewOrchestrator) {
        let store = Arc::new(MemoryStore::new(sample_deck(cards)));
        let mut orchestrator = ReviewOrchestrator::new(store.clone(), &Config::default());
        orchestrator
            .start(
                DeckId::new("german"),
                UserId::new("ana"),
                &Selection::default(),
                Date::parse("2025-03-01").unwrap(),
            )
            .await
            .unwrap();
        (store, orchestrator)
    }

    #[tokio::test]
    async fn test_run_session_to_completion() -> Fallible<()> {
        let (store, mut orchestrator) = started(2).await;
        let mut input = Cursor::new("\n3\n\nbanana\n4\n");
        let mut output = Vec::new();
        run_session(&mut orchestrator, &mut input, &mut output).await?;
        assert_eq!(orchestrator.phase(), Phase::Completed);
        let summary = orchestrator.summary().unwrap();
        assert_eq!(summary.cards_reviewed, 2);
        assert_eq!(summary.accuracy, 100);
        assert_eq!(store.submit_calls(), 2);
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("[1/2] phrase 0"));
        assert!(output.contains("translation 1"));
        assert!(output.contains("Invalid rating: banana"));
        Ok(())
    }

    #[tokio::test]
    async fn test_quit_cancels() -> Fallible<()> {
        let (store, mut orchestrator) = started(3).await;
        let mut input = Cursor::new("\n1\nq\n");
        let mut output = Vec::new();
        run_session(&mut orchestrator, &mut input, &mut output).await?;
        assert_eq!(orchestrator.phase(), Phase::Cancelled);
        assert!(orchestrator.summary().is_none());
        assert_eq!(store.submit_calls(), 1);
        let output = String::from_utf8(output).unwrap();
        assert!(output.ends_with("Session cancelled.\n"));
        Ok(())
    }

    #[tokio::test]
    async fn test_end_of_input_cancels() -> Fallible<()> {
        let (store, mut orchestrator) = started(1).await;
        let mut input = Cursor::new("\n");
        let mut output = Vec::new();
        run_session(&mut orchestrator, &mut input, &mut output).await?;
        assert_eq!(orchestrator.phase(), Phase::Cancelled);
        assert_eq!(store.submit_calls(), 0);
        Ok(())
    }

    #[test]
    fn test_print_empty_summary() -> Fallible<()> {
        let mut output = Vec::new();
        print_summary(&SessionSummary::empty(Default::default()), &mut output)?;
        assert_eq!(String::from_utf8(output).unwrap(), "Nothing to review.\n");
        Ok(())
    }
}
