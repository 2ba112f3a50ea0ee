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

use rusqlite::Connection;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::config::DbConfig;
use serde::Serialize;

use crate::error::Fallible;
use crate::error::fail;
use crate::session::Rated;
use crate::types::card::Card;
use crate::types::card_id::CardId;
use crate::types::card_state::CardState;
use crate::types::patch::CardPatch;
use crate::types::rating::Rating;
use crate::types::timestamp::Timestamp;

const CARD_COLUMNS: &str = "card_id, deck_name, front, back, state, due_at, interval_days, ease, reps, lapses, learning_step_index, created_at, updated_at";

pub struct Database {
    conn: Connection,
}

pub type SessionId = i64;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
    pub session_id: SessionId,
    pub deck_name: String,
    pub started_at: Timestamp,
    pub ended_at: Timestamp,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRow {
    pub card_id: CardId,
    pub reviewed_at: Timestamp,
    pub rating: Rating,
    pub state_before: CardState,
    pub state_after: CardState,
    pub interval_days: u32,
    pub ease: f64,
    pub due_at: Timestamp,
}

impl Database {
    pub fn new(database_path: &str) -> Fallible<Self> {
        let mut conn = Connection::open(database_path)?;
        conn.set_db_config(DbConfig::SQLITE_DBCONFIG_ENABLE_FKEY, true)?;
        {
            let tx = conn.transaction()?;
            if !probe_schema_exists(&tx)? {
                log::debug!("Creating database schema.");
                tx.execute_batch(include_str!("schema.sql"))?;
                tx.commit()?;
            }
        }
        Ok(Self { conn })
    }

    /// Insert a new card.
    ///
    /// If a card with the same ID exists, returns an error.
    pub fn add_card(&mut self, card: &Card) -> Fallible<()> {
        let tx = self.conn.transaction()?;
        if select_card(&tx, card.id)?.is_some() {
            return fail(format!("card already exists: {}", card.id));
        }
        let sql = format!(
            "insert into cards ({CARD_COLUMNS}) values (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?);"
        );
        tx.execute(
            &sql,
            (
                card.id,
                &card.deck,
                &card.front,
                &card.back,
                card.state,
                card.due_at,
                card.interval_days,
                card.ease,
                card.reps,
                card.lapses,
                step_index_to_sql(card.learning_step_index),
                card.created_at,
                card.updated_at,
            ),
        )?;
        tx.commit()?;
        log::debug!("Added card {} to deck {}.", card.id.short(), card.deck);
        Ok(())
    }

    pub fn get_card(&self, card_id: CardId) -> Fallible<Option<Card>> {
        select_card(&self.conn, card_id)
    }

    /// The cards in a deck that are due at `now`, earliest due first. Ties
    /// are broken by creation time.
    pub fn due_cards(
        &self,
        deck_name: &str,
        now: Timestamp,
        limit: Option<usize>,
    ) -> Fallible<Vec<Card>> {
        // A negative limit means no limit in SQLite.
        let limit: i64 = match limit {
            Some(limit) => i64::try_from(limit).unwrap_or(i64::MAX),
            None => -1,
        };
        let sql = format!(
            "select {CARD_COLUMNS} from cards where deck_name = ? and due_at <= ? order by due_at, created_at, card_id limit ?;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query((deck_name, now, limit))?;
        let mut cards = Vec::new();
        while let Some(row) = rows.next()? {
            cards.push(read_card(row)?);
        }
        Ok(cards)
    }

    /// Every card in a deck, oldest first.
    pub fn deck_cards(&self, deck_name: &str) -> Fallible<Vec<Card>> {
        let sql = format!(
            "select {CARD_COLUMNS} from cards where deck_name = ? order by created_at, card_id;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([deck_name])?;
        let mut cards = Vec::new();
        while let Some(row) = rows.next()? {
            cards.push(read_card(row)?);
        }
        Ok(cards)
    }

    /// Merge a patch into a stored card in a single transaction, returning
    /// the updated card.
    ///
    /// If no card with the given ID exists, returns an error.
    pub fn apply_patch(&mut self, card_id: CardId, patch: &CardPatch) -> Fallible<Card> {
        let tx = self.conn.transaction()?;
        let card = patch_card(&tx, card_id, patch)?;
        tx.commit()?;
        Ok(card)
    }

    /// The number of reviews of cards in a deck since the given instant.
    pub fn review_count_since(&self, deck_name: &str, since: Timestamp) -> Fallible<usize> {
        let sql = "select count(*) from reviews r join cards c on c.card_id = r.card_id where c.deck_name = ? and r.reviewed_at >= ?;";
        let count: i64 = self
            .conn
            .query_row(sql, (deck_name, since), |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Open a study session. Its end time is bumped as ratings come in.
    pub fn start_session(&mut self, deck_name: &str, started_at: Timestamp) -> Fallible<SessionId> {
        let sql = "insert into sessions (deck_name, started_at, ended_at) values (?, ?, ?) returning session_id;";
        let session_id: SessionId = self
            .conn
            .query_row(sql, (deck_name, started_at, started_at), |row| {
                row.get(0)
            })?;
        log::debug!("Started session {session_id} on {deck_name}.");
        Ok(session_id)
    }

    /// Persist a rating: the card's patch and its review row are written in
    /// one transaction, so a stored card state always has its review.
    pub fn record_rating(&mut self, session_id: SessionId, rated: &Rated) -> Fallible<Card> {
        let tx = self.conn.transaction()?;
        let card = patch_card(&tx, rated.before.id, &rated.patch)?;
        insert_review(&tx, session_id, rated)?;
        touch_session(&tx, session_id, rated.reviewed_at)?;
        tx.commit()?;
        Ok(card)
    }

    /// Undo a recorded rating: restore the card to its state before the
    /// rating and delete the rating's review row.
    pub fn revert_rating(&mut self, session_id: SessionId, rated: &Rated) -> Fallible<()> {
        let tx = self.conn.transaction()?;
        update_card(&tx, &rated.before)?;
        let sql = "delete from reviews where review_id = (select max(review_id) from reviews where session_id = ? and card_id = ?);";
        let deleted = tx.execute(sql, (session_id, rated.before.id))?;
        if deleted == 0 {
            return fail(format!(
                "no review of {} in session {session_id}",
                rated.before.id
            ));
        }
        tx.commit()?;
        log::debug!("Reverted '{}' on {}.", rated.rating, rated.before.id.short());
        Ok(())
    }

    /// Close a session at the given instant.
    pub fn end_session(&mut self, session_id: SessionId, ended_at: Timestamp) -> Fallible<()> {
        let tx = self.conn.transaction()?;
        touch_session(&tx, session_id, ended_at)?;
        tx.commit()?;
        Ok(())
    }

    pub fn sessions(&self, deck_name: &str) -> Fallible<Vec<SessionRow>> {
        let sql = "select session_id, deck_name, started_at, ended_at from sessions where deck_name = ? order by started_at;";
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([deck_name])?;
        let mut sessions = Vec::new();
        while let Some(row) = rows.next()? {
            sessions.push(SessionRow {
                session_id: row.get(0)?,
                deck_name: row.get(1)?,
                started_at: row.get(2)?,
                ended_at: row.get(3)?,
            });
        }
        Ok(sessions)
    }

    pub fn session_reviews(&self, session_id: SessionId) -> Fallible<Vec<ReviewRow>> {
        let sql = "select card_id, reviewed_at, rating, state_before, state_after, interval_days, ease, due_at from reviews where session_id = ? order by review_id;";
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([session_id])?;
        let mut reviews = Vec::new();
        while let Some(row) = rows.next()? {
            reviews.push(ReviewRow {
                card_id: row.get(0)?,
                reviewed_at: row.get(1)?,
                rating: row.get(2)?,
                state_before: row.get(3)?,
                state_after: row.get(4)?,
                interval_days: row.get(5)?,
                ease: row.get(6)?,
                due_at: row.get(7)?,
            });
        }
        Ok(reviews)
    }
}

fn read_card(row: &Row) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        deck: row.get(1)?,
        front: row.get(2)?,
        back: row.get(3)?,
        state: row.get(4)?,
        due_at: row.get(5)?,
        interval_days: row.get(6)?,
        ease: row.get(7)?,
        reps: row.get(8)?,
        lapses: row.get(9)?,
        learning_step_index: usize::try_from(row.get::<_, i64>(10)?).unwrap_or(0),
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn step_index_to_sql(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

fn select_card(conn: &Connection, card_id: CardId) -> Fallible<Option<Card>> {
    let sql = format!("select {CARD_COLUMNS} from cards where card_id = ?;");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([card_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(read_card(row)?)),
        None => Ok(None),
    }
}

fn patch_card(tx: &Transaction, card_id: CardId, patch: &CardPatch) -> Fallible<Card> {
    let Some(card) = select_card(tx, card_id)? else {
        return fail(format!("no card with id {card_id}"));
    };
    let card = patch.apply(&card);
    update_card(tx, &card)?;
    log::debug!(
        "Persisted {} state={} due={}",
        card_id.short(),
        card.state,
        card.due_at
    );
    Ok(card)
}

fn touch_session(tx: &Transaction, session_id: SessionId, ended_at: Timestamp) -> Fallible<()> {
    let sql = "update sessions set ended_at = max(ended_at, ?) where session_id = ?;";
    let changed = tx.execute(sql, (ended_at, session_id))?;
    if changed == 0 {
        return fail(format!("no session with id {session_id}"));
    }
    Ok(())
}

fn update_card(tx: &Transaction, card: &Card) -> Fallible<()> {
    let sql = "update cards set state = ?, due_at = ?, interval_days = ?, ease = ?, reps = ?, lapses = ?, learning_step_index = ?, updated_at = ? where card_id = ?;";
    let changed = tx.execute(
        sql,
        (
            card.state,
            card.due_at,
            card.interval_days,
            card.ease,
            card.reps,
            card.lapses,
            step_index_to_sql(card.learning_step_index),
            card.updated_at,
            card.id,
        ),
    )?;
    if changed == 0 {
        return fail(format!("no card with id {}", card.id));
    }
    Ok(())
}

fn insert_review(tx: &Transaction, session_id: SessionId, rated: &Rated) -> Fallible<()> {
    let sql = "insert into reviews (session_id, card_id, reviewed_at, rating, state_before, state_after, interval_days, ease, due_at) values (?, ?, ?, ?, ?, ?, ?, ?, ?);";
    tx.execute(
        sql,
        (
            session_id,
            rated.before.id,
            rated.reviewed_at,
            rated.rating,
            rated.before.state,
            rated.after.state,
            rated.after.interval_days,
            rated.after.ease,
            rated.after.due_at,
        ),
    )?;
    Ok(())
}

fn probe_schema_exists(tx: &Transaction) -> Fallible<bool> {
    let sql = "select count(*) from sqlite_master where type='table' AND name=?;";
    let count: i64 = tx.query_row(sql, ["cards"], |row| row.get(0))?;
    Ok(count > 0)
}
