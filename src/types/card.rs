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

use serde::Serialize;

use crate::scheduler::DEFAULT_EASE;
use crate::types::card_id::CardId;
use crate::types::card_state::CardState;
use crate::types::timestamp::Timestamp;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    /// The name of the deck this card belongs to.
    pub deck: String,
    pub front: String,
    pub back: String,
    pub state: CardState,
    /// The card is eligible for review at or after this instant.
    pub due_at: Timestamp,
    /// The last computed spacing interval. Only meaningful in review; zero
    /// while new or learning.
    pub interval_days: u32,
    /// Interval multiplier, kept within `[MIN_EASE, MAX_EASE]`.
    pub ease: f64,
    /// The number of ratings ever applied, including `Again`.
    pub reps: u32,
    /// The number of times the card was forgotten while in review.
    pub lapses: u32,
    /// Index into `LEARNING_STEPS`. Only meaningful while learning.
    pub learning_step_index: usize,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Card {
    /// Creates a new card that is immediately due.
    pub fn new(
        deck: impl Into<String>,
        front: impl Into<String>,
        back: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        let deck = deck.into();
        let front = front.into().trim().to_string();
        let back = back.into().trim().to_string();
        Self {
            id: CardId::for_content(&deck, &front, &back),
            deck,
            front,
            back,
            state: CardState::New,
            due_at: created_at,
            interval_days: 0,
            ease: DEFAULT_EASE,
            reps: 0,
            lapses: 0,
            learning_step_index: 0,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn is_due(&self, now: Timestamp) -> bool {
        self.due_at <= now
    }
}
