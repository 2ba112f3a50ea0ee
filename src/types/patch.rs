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

use crate::types::card::Card;
use crate::types::card_state::CardState;
use crate::types::timestamp::Timestamp;

/// A partial update to a card's scheduling fields. `None` means the field is
/// left as it is.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<CardState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ease: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lapses: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_step_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl CardPatch {
    /// Returns a copy of `card` with this patch merged in.
    pub fn apply(&self, card: &Card) -> Card {
        let mut card = card.clone();
        if let Some(state) = self.state {
            card.state = state;
        }
        if let Some(due_at) = self.due_at {
            card.due_at = due_at;
        }
        if let Some(interval_days) = self.interval_days {
            card.interval_days = interval_days;
        }
        if let Some(ease) = self.ease {
            card.ease = ease;
        }
        if let Some(reps) = self.reps {
            card.reps = reps;
        }
        if let Some(lapses) = self.lapses {
            card.lapses = lapses;
        }
        if let Some(index) = self.learning_step_index {
            card.learning_step_index = index;
        }
        if let Some(updated_at) = self.updated_at {
            card.updated_at = updated_at;
        }
        card
    }
}
