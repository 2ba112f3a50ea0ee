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

use std::collections::HashSet;

use crate::error::Fallible;
use crate::error::fail;
use crate::limits::DEFAULT_AGAIN_REINSERT_AFTER_CARDS;
use crate::limits::DEFAULT_DAILY_REVIEW_LIMIT;
use crate::limits::DEFAULT_NEW_CARDS_PER_SESSION;
use crate::limits::clamp_again_reinsert_after_cards;
use crate::limits::clamp_daily_review_limit;
use crate::limits::clamp_new_cards_per_session;
use crate::queue::PickParams;
use crate::queue::pick_due_cards_for_queue;
use crate::queue::upsert_reinforcement_card;
use crate::scheduler::schedule;
use crate::types::card::Card;
use crate::types::card_id::CardId;
use crate::types::patch::CardPatch;
use crate::types::rating::Rating;
use crate::types::timestamp::Timestamp;

/// The per-deck settings a session runs under, already clamped.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SessionLimits {
    pub new_cards_per_session: usize,
    pub again_reinsert_after_cards: usize,
    pub daily_review_limit: usize,
}

impl SessionLimits {
    pub fn new(
        new_cards_per_session: f64,
        again_reinsert_after_cards: f64,
        daily_review_limit: f64,
    ) -> Self {
        Self {
            new_cards_per_session: clamp_new_cards_per_session(new_cards_per_session),
            again_reinsert_after_cards: clamp_again_reinsert_after_cards(
                again_reinsert_after_cards,
            ),
            daily_review_limit: clamp_daily_review_limit(daily_review_limit),
        }
    }
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            new_cards_per_session: DEFAULT_NEW_CARDS_PER_SESSION,
            again_reinsert_after_cards: DEFAULT_AGAIN_REINSERT_AFTER_CARDS,
            daily_review_limit: DEFAULT_DAILY_REVIEW_LIMIT,
        }
    }
}

/// One rating applied during a session.
#[derive(Clone, Debug, PartialEq)]
pub struct Rated {
    /// The card as it was before the rating.
    pub before: Card,
    pub rating: Rating,
    pub patch: CardPatch,
    /// The card with the patch applied.
    pub after: Card,
    pub reviewed_at: Timestamp,
}

struct Snapshot {
    queue: Vec<Card>,
    cursor: usize,
    reviewed_ids: HashSet<CardId>,
    introduced_new_count: usize,
}

/// An in-memory review session. The queue keeps every card the session has
/// shown; the cursor points at the card being reviewed, so entries before it
/// are done.
pub struct Session {
    limits: SessionLimits,
    /// Reviews done today before this session started.
    reviewed_today: usize,
    queue: Vec<Card>,
    cursor: usize,
    reviewed_ids: HashSet<CardId>,
    introduced_new_count: usize,
    reviews: Vec<Rated>,
    history: Vec<Snapshot>,
}

impl Session {
    pub fn new(limits: SessionLimits, reviewed_today: usize) -> Self {
        Self {
            limits,
            reviewed_today,
            queue: Vec::new(),
            cursor: 0,
            reviewed_ids: HashSet::new(),
            introduced_new_count: 0,
            reviews: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Adds due cards to the end of the queue, within the session's new-card
    /// cap and what is left of the daily review limit. Returns the number of
    /// cards added.
    pub fn refill(&mut self, due_cards: &[Card]) -> usize {
        let queued_ids: HashSet<CardId> = self.pending().iter().map(|card| card.id).collect();
        let used = self.reviewed_today + self.reviews.len() + self.remaining();
        let allowance = self.limits.daily_review_limit.saturating_sub(used);
        if allowance == 0 {
            log::debug!("Daily review limit reached; not adding cards.");
            return 0;
        }
        let result = pick_due_cards_for_queue(PickParams {
            due_cards,
            queued_ids: &queued_ids,
            reviewed_ids: &self.reviewed_ids,
            introduced_new_count: self.introduced_new_count,
            new_cards_per_session: self.limits.new_cards_per_session,
            max_cards_to_pick: Some(allowance),
        });
        let added = result.picked.len();
        self.introduced_new_count = result.introduced_new_count;
        self.queue.extend(result.picked);
        log::debug!("Added {added} cards to the session queue.");
        added
    }

    /// The card under review, if any.
    pub fn current(&self) -> Option<&Card> {
        self.queue.get(self.cursor)
    }

    /// Cards still waiting, including the current one.
    pub fn pending(&self) -> &[Card] {
        self.queue.get(self.cursor..).unwrap_or(&[])
    }

    pub fn remaining(&self) -> usize {
        self.pending().len()
    }

    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }

    pub fn introduced_new_count(&self) -> usize {
        self.introduced_new_count
    }

    pub fn reviews(&self) -> &[Rated] {
        &self.reviews
    }

    /// Rates the current card and moves on to the next. A card rated `Again`
    /// is put back a few cards ahead.
    pub fn rate(&mut self, rating: Rating, now: Timestamp) -> Fallible<Rated> {
        let Some(before) = self.current().cloned() else {
            return fail("no card to rate: the session queue is empty.");
        };
        self.history.push(Snapshot {
            queue: self.queue.clone(),
            cursor: self.cursor,
            reviewed_ids: self.reviewed_ids.clone(),
            introduced_new_count: self.introduced_new_count,
        });

        let patch = schedule(&before, rating, now);
        let after = patch.apply(&before);
        log::debug!(
            "{} {} {} -> {} interval={}d ease={:.2} due={}",
            before.id.short(),
            rating,
            before.state,
            after.state,
            after.interval_days,
            after.ease,
            after.due_at
        );

        if rating == Rating::Again {
            self.queue = upsert_reinforcement_card(
                &self.queue,
                self.cursor,
                after.clone(),
                self.limits.again_reinsert_after_cards,
            );
        }
        self.cursor += 1;
        self.reviewed_ids.insert(before.id);

        let rated = Rated {
            before,
            rating,
            patch,
            after,
            reviewed_at: now,
        };
        self.reviews.push(rated.clone());
        Ok(rated)
    }

    /// Reverts the most recent rating, returning it so the caller can restore
    /// the stored card.
    pub fn undo(&mut self) -> Option<Rated> {
        let snapshot = self.history.pop()?;
        self.queue = snapshot.queue;
        self.cursor = snapshot.cursor;
        self.reviewed_ids = snapshot.reviewed_ids;
        self.introduced_new_count = snapshot.introduced_new_count;
        let rated = self.reviews.pop();
        if let Some(rated) = &rated {
            log::debug!("Undid {} on {}", rated.rating, rated.before.id.short());
        }
        rated
    }
}
