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

use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::config::DbConfig;

use crate::config::SchedulerConfig;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;
use crate::scheduler::apply_rating;
use crate::session::orchestrator::CompletedSession;
use crate::store::ReviewStore;
use crate::store::ReviewSubmission;
use crate::types::card::CardContent;
use crate::types::card::StudyCard;
use crate::types::card_state::CardState;
use crate::types::date::Date;
use crate::types::ids::CardId;
use crate::types::ids::DeckId;
use crate::types::ids::UserId;
use crate::types::sr_data::SrData;
use crate::types::timestamp::Timestamp;

/// A [`ReviewStore`] backed by a local SQLite file. Ratings are scheduled
/// here with the same scheduler configuration as the client.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    config: SchedulerConfig,
}

impl SqliteStore {
    pub fn open(database_path: &Path, config: SchedulerConfig) -> Fallible<Self> {
        let conn = Connection::open(database_path)?;
        Self::init(conn, config)
    }

    pub fn open_in_memory(config: SchedulerConfig) -> Fallible<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, config)
    }

    fn init(mut conn: Connection, config: SchedulerConfig) -> Fallible<Self> {
        conn.set_db_config(DbConfig::SQLITE_DBCONFIG_ENABLE_FKEY, true)?;
        {
            let tx = conn.transaction()?;
            if !probe_schema_exists(&tx)? {
                log::debug!("Creating database schema.");
                tx.execute_batch(include_str!("schema.sql"))?;
                tx.commit()?;
            }
        }
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self { conn, config })
    }

    /// Add a card to a deck. Returns `false` if a card with this ID already
    /// exists, in which case nothing is changed.
    pub fn add_card(
        &self,
        card_id: &CardId,
        deck_id: &DeckId,
        content: &CardContent,
        added_at: Timestamp,
    ) -> Fallible<bool> {
        let content = serde_json::to_string(content)?;
        let conn = self.acquire()?;
        let sql = "insert into cards (card_id, deck_id, content, added_at) values (?, ?, ?, ?) on conflict (card_id) do nothing;";
        let inserted = conn.execute(sql, (card_id, deck_id, &content, added_at))?;
        if inserted > 0 {
            log::debug!("Added card {card_id} to {deck_id}.");
        }
        Ok(inserted > 0)
    }

    pub fn card_count(&self, deck_id: &DeckId) -> Fallible<usize> {
        let conn = self.acquire()?;
        let sql = "select count(*) from cards where deck_id = ?;";
        let count: i64 = conn.query_row(sql, [deck_id], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Every card of a deck, in the order they were added, with the user's
    /// state for each.
    pub fn deck_cards(&self, deck_id: &DeckId, user_id: &UserId) -> Fallible<Vec<StudyCard>> {
        let conn = self.acquire()?;
        let sql = "select c.card_id, c.deck_id, c.content, s.state, s.step, s.interval, s.ease_factor, s.repetitions, s.due_date, s.review_count, s.success_count, s.failure_count from cards c left outer join card_states s on s.card_id = c.card_id and s.user_id = ? where c.deck_id = ? order by c.rowid;";
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query((user_id, deck_id))?;
        let mut cards = Vec::new();
        while let Some(row) = rows.next()? {
            let card_id: CardId = row.get(0)?;
            let deck_id: DeckId = row.get(1)?;
            let content: String = row.get(2)?;
            let content: CardContent = serde_json::from_str(&content)?;
            let state: Option<CardState> = row.get(3)?;
            let sr_data = match state {
                Some(state) => read_state(row, card_id, deck_id, state, 4)?,
                None => SrData::new(card_id, deck_id),
            };
            cards.push(StudyCard { content, sr_data });
        }
        Ok(cards)
    }

    pub fn get_state(&self, user_id: &UserId, card_id: &CardId) -> Fallible<Option<SrData>> {
        let conn = self.acquire()?;
        let tx = conn.unchecked_transaction()?;
        let state = load_state(&tx, user_id, card_id)?;
        tx.commit()?;
        Ok(state)
    }

    /// Schedule a rating against the stored state and record it.
    pub fn record_review(&self, submission: &ReviewSubmission) -> Fallible<SrData> {
        let mut conn = self.acquire()?;
        let tx = conn.transaction()?;
        let current = match load_state(&tx, &submission.user_id, &submission.card_id)? {
            Some(state) => state,
            None => {
                let deck_id = card_deck(&tx, &submission.card_id)?;
                SrData::new(submission.card_id.clone(), deck_id)
            }
        };
        let today = submission.review_date;
        let next = apply_rating(&current, submission.rating, today, &self.config);
        upsert_state(&tx, &submission.user_id, &next)?;
        let sql = "insert into reviews (user_id, card_id, rating, reviewed_at, review_date, state, interval, ease_factor, due_date) values (?, ?, ?, ?, ?, ?, ?, ?, ?);";
        tx.execute(
            sql,
            (
                &submission.user_id,
                &submission.card_id,
                submission.rating,
                submission.client_timestamp,
                today,
                next.state,
                next.interval,
                next.ease_factor,
                next.due_date,
            ),
        )?;
        tx.commit()?;
        Ok(next)
    }

    pub fn put_state(&self, user_id: &UserId, state: &SrData) -> Fallible<()> {
        let mut conn = self.acquire()?;
        let tx = conn.transaction()?;
        // Fails on unknown cards through the foreign key.
        upsert_state(&tx, user_id, state)?;
        tx.commit()?;
        Ok(())
    }

    pub fn save_session(&self, session: &CompletedSession) -> Fallible<()> {
        let summary = serde_json::to_string(&session.summary)?;
        let conn = self.acquire()?;
        let sql = "insert into sessions (session_id, user_id, deck_id, started_at, ended_at, cards_reviewed, accuracy, total_time, summary) values (?, ?, ?, ?, ?, ?, ?, ?, ?);";
        conn.execute(
            sql,
            (
                &session.info.session_id,
                &session.info.user_id,
                &session.info.deck_id,
                session.info.started_at,
                session.ended_at,
                session.summary.cards_reviewed,
                session.summary.accuracy,
                session.summary.total_time as i64,
                &summary,
            ),
        )?;
        Ok(())
    }

    /// How many ratings the user gave on `today`.
    pub fn today_review_count(&self, user_id: &UserId, today: Date) -> Fallible<usize> {
        let conn = self.acquire()?;
        let sql = "select count(*) from reviews where user_id = ? and review_date = ?;";
        let count: i64 = conn.query_row(sql, (user_id, today), |row| row.get(0))?;
        Ok(count as usize)
    }

    fn acquire(&self) -> Fallible<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ErrorReport::new("database lock poisoned"))
    }
}

#[async_trait]
impl ReviewStore for SqliteStore {
    async fn fetch_due_cards(
        &self,
        deck_id: &DeckId,
        user_id: &UserId,
    ) -> Fallible<Vec<StudyCard>> {
        self.deck_cards(deck_id, user_id)
    }

    async fn submit_review(&self, submission: &ReviewSubmission) -> Fallible<SrData> {
        self.record_review(submission)
    }

    async fn resync_card(&self, user_id: &UserId, state: &SrData) -> Fallible<()> {
        self.put_state(user_id, state)
    }
}

fn read_state(
    row: &Row,
    card_id: CardId,
    deck_id: DeckId,
    state: CardState,
    offset: usize,
) -> Fallible<SrData> {
    Ok(SrData {
        card_id,
        deck_id,
        state,
        step: row.get(offset)?,
        interval: row.get(offset + 1)?,
        ease_factor: row.get(offset + 2)?,
        repetitions: row.get(offset + 3)?,
        due_date: row.get(offset + 4)?,
        review_count: row.get(offset + 5)?,
        success_count: row.get(offset + 6)?,
        failure_count: row.get(offset + 7)?,
    })
}

fn load_state(tx: &Transaction, user_id: &UserId, card_id: &CardId) -> Fallible<Option<SrData>> {
    let sql = "select c.card_id, c.deck_id, s.state, s.step, s.interval, s.ease_factor, s.repetitions, s.due_date, s.review_count, s.success_count, s.failure_count from card_states s join cards c on c.card_id = s.card_id where s.user_id = ? and s.card_id = ?;";
    let mut stmt = tx.prepare(sql)?;
    let mut rows = stmt.query((user_id, card_id))?;
    match rows.next()? {
        Some(row) => {
            let card_id: CardId = row.get(0)?;
            let deck_id: DeckId = row.get(1)?;
            let state: CardState = row.get(2)?;
            Ok(Some(read_state(row, card_id, deck_id, state, 3)?))
        }
        None => Ok(None),
    }
}

fn card_deck(tx: &Transaction, card_id: &CardId) -> Fallible<DeckId> {
    let sql = "select deck_id from cards where card_id = ?;";
    let deck_id: Option<DeckId> = tx
        .query_row(sql, [card_id], |row| row.get(0))
        .optional()?;
    match deck_id {
        Some(deck_id) => Ok(deck_id),
        None => fail(format!("unknown card: {card_id}")),
    }
}

fn upsert_state(tx: &Transaction, user_id: &UserId, state: &SrData) -> Fallible<()> {
    let sql = "insert into card_states (user_id, card_id, state, step, interval, ease_factor, repetitions, due_date, review_count, success_count, failure_count) values (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) on conflict (user_id, card_id) do update set state = excluded.state, step = excluded.step, interval = excluded.interval, ease_factor = excluded.ease_factor, repetitions = excluded.repetitions, due_date = excluded.due_date, review_count = excluded.review_count, success_count = excluded.success_count, failure_count = excluded.failure_count;";
    tx.execute(
        sql,
        (
            user_id,
            &state.card_id,
            state.state,
            state.step,
            state.interval,
            state.ease_factor,
            state.repetitions,
            state.due_date,
            state.review_count,
            state.success_count,
            state.failure_count,
        ),
    )?;
    Ok(())
}

fn probe_schema_exists(tx: &Transaction) -> Fallible<bool> {
    let sql = "select count(*) from sqlite_master where type='table' AND name=?;";
    let count: i64 = tx.query_row(sql, ["cards"], |row| row.get(0))?;
    Ok(count > 0)
}
