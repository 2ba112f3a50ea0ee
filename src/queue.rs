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

use crate::limits::clamp_again_reinsert_after_cards;
use crate::limits::clamp_new_cards_per_session;
use crate::types::card::Card;
use crate::types::card_id::CardId;
use crate::types::card_state::CardState;

pub struct PickParams<'a> {
    /// Candidate cards, in the order the caller wants them reviewed.
    pub due_cards: &'a [Card],
    /// Cards already staged in the queue.
    pub queued_ids: &'a HashSet<CardId>,
    /// Cards already reviewed this session.
    pub reviewed_ids: &'a HashSet<CardId>,
    /// How many new cards have already entered this session.
    pub introduced_new_count: usize,
    pub new_cards_per_session: usize,
    /// Upper bound on the number of cards returned.
    pub max_cards_to_pick: Option<usize>,
}

#[derive(Debug)]
pub struct PickedCards {
    pub picked: Vec<Card>,
    pub introduced_new_count: usize,
}

/// Chooses which due cards join the session: learning cards first, then
/// review cards, then as many new cards as the session's allowance permits.
/// Input order is kept within each group.
pub fn pick_due_cards_for_queue(params: PickParams<'_>) -> PickedCards {
    let mut learning: Vec<&Card> = Vec::new();
    let mut review: Vec<&Card> = Vec::new();
    let mut new: Vec<&Card> = Vec::new();
    for card in params.due_cards {
        if params.queued_ids.contains(&card.id) || params.reviewed_ids.contains(&card.id) {
            continue;
        }
        match card.state {
            CardState::Learning => learning.push(card),
            CardState::Review => review.push(card),
            CardState::New => new.push(card),
        }
    }

    let cap = clamp_new_cards_per_session(params.new_cards_per_session as f64);
    let allowance = cap.saturating_sub(params.introduced_new_count);
    new.truncate(allowance);

    let mut picked: Vec<Card> = learning
        .into_iter()
        .chain(review)
        .chain(new)
        .cloned()
        .collect();
    if let Some(max) = params.max_cards_to_pick {
        picked.truncate(max);
    }

    let introduced = picked
        .iter()
        .filter(|card| card.state == CardState::New)
        .count();
    PickedCards {
        picked,
        introduced_new_count: params.introduced_new_count + introduced,
    }
}

/// Puts a just-rated card back into the queue so it comes up again later in
/// the session. If the card is already waiting after `after_index`, that
/// entry is replaced; otherwise the card is inserted `after_cards` cards
/// past `after_index`, or at the end if the queue is shorter.
pub fn upsert_reinforcement_card(
    queue: &[Card],
    after_index: usize,
    card: Card,
    after_cards: usize,
) -> Vec<Card> {
    let mut queue = queue.to_vec();
    let start = after_index.saturating_add(1);
    let existing = queue
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, queued)| queued.id == card.id)
        .map(|(index, _)| index);
    match existing {
        Some(index) => {
            queue[index] = card;
        }
        None => {
            let after_cards = clamp_again_reinsert_after_cards(after_cards as f64);
            let insert_at = start.saturating_add(after_cards).min(queue.len());
            queue.insert(insert_at, card);
        }
    }
    queue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::timestamp::Timestamp;

    fn card(name: &str, state: CardState) -> Card {
        let mut card = Card::new("deck", name, "answer", Timestamp::from_millis(0));
        card.state = state;
        card
    }

    fn fronts(cards: &[Card]) -> Vec<&str> {
        cards.iter().map(|card| card.front.as_str()).collect()
    }

    fn pick(
        due_cards: &[Card],
        queued_ids: &HashSet<CardId>,
        reviewed_ids: &HashSet<CardId>,
        introduced_new_count: usize,
        new_cards_per_session: usize,
        max_cards_to_pick: Option<usize>,
    ) -> PickedCards {
        pick_due_cards_for_queue(PickParams {
            due_cards,
            queued_ids,
            reviewed_ids,
            introduced_new_count,
            new_cards_per_session,
            max_cards_to_pick,
        })
    }

    #[test]
    fn test_pick_priority_order() {
        let due = vec![
            card("new1", CardState::New),
            card("review", CardState::Review),
            card("new2", CardState::New),
            card("learning", CardState::Learning),
            card("new3", CardState::New),
        ];
        let none = HashSet::new();
        let result = pick(&due, &none, &none, 0, 2, None);
        assert_eq!(
            fronts(&result.picked),
            vec!["learning", "review", "new1", "new2"]
        );
        assert_eq!(result.introduced_new_count, 2);
    }

    #[test]
    fn test_pick_skips_queued_and_reviewed() {
        let due = vec![
            card("a", CardState::Review),
            card("b", CardState::Review),
            card("c", CardState::Learning),
        ];
        let queued: HashSet<CardId> = [due[0].id].into_iter().collect();
        let reviewed: HashSet<CardId> = [due[2].id].into_iter().collect();
        let result = pick(&due, &queued, &reviewed, 0, 20, None);
        assert_eq!(fronts(&result.picked), vec!["b"]);
        assert_eq!(result.introduced_new_count, 0);
    }

    #[test]
    fn test_pick_respects_already_introduced() {
        let due = vec![
            card("new1", CardState::New),
            card("new2", CardState::New),
            card("new3", CardState::New),
        ];
        let none = HashSet::new();
        let result = pick(&due, &none, &none, 2, 3, None);
        assert_eq!(fronts(&result.picked), vec!["new1"]);
        assert_eq!(result.introduced_new_count, 3);

        let result = pick(&due, &none, &none, 5, 3, None);
        assert!(result.picked.is_empty());
        assert_eq!(result.introduced_new_count, 5);
    }

    #[test]
    fn test_pick_truncation_only_counts_surviving_new_cards() {
        let due = vec![
            card("review", CardState::Review),
            card("new1", CardState::New),
            card("new2", CardState::New),
        ];
        let none = HashSet::new();
        let result = pick(&due, &none, &none, 0, 10, Some(2));
        assert_eq!(fronts(&result.picked), vec!["review", "new1"]);
        assert_eq!(result.introduced_new_count, 1);

        let result = pick(&due, &none, &none, 0, 10, Some(0));
        assert!(result.picked.is_empty());
        assert_eq!(result.introduced_new_count, 0);
    }

    #[test]
    fn test_pick_reclamps_new_card_cap() {
        let due: Vec<Card> = (0..150)
            .map(|i| card(&format!("new{i}"), CardState::New))
            .collect();
        let none = HashSet::new();
        let result = pick(&due, &none, &none, 0, 5000, None);
        assert_eq!(result.picked.len(), 100);
    }

    #[test]
    fn test_upsert_inserts_ahead() {
        let queue: Vec<Card> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|name| card(name, CardState::Review))
            .collect();
        let mut failed = queue[0].clone();
        failed.state = CardState::Learning;
        let result = upsert_reinforcement_card(&queue, 0, failed, 3);
        assert_eq!(fronts(&result), vec!["a", "b", "c", "d", "a", "e", "f"]);
        assert_eq!(result[4].state, CardState::Learning);
        // The input is left alone.
        assert_eq!(queue.len(), 6);
    }

    #[test]
    fn test_upsert_appends_when_queue_is_short() {
        let queue = vec![card("a", CardState::Review), card("b", CardState::Review)];
        let result = upsert_reinforcement_card(&queue, 0, queue[0].clone(), 3);
        assert_eq!(fronts(&result), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let queue: Vec<Card> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|name| card(name, CardState::Review))
            .collect();
        let mut failed = queue[0].clone();
        failed.reps = 1;
        let once = upsert_reinforcement_card(&queue, 0, failed.clone(), 2);
        failed.reps = 2;
        let twice = upsert_reinforcement_card(&once, 0, failed, 2);
        assert_eq!(twice.len(), once.len());
        assert_eq!(fronts(&twice), vec!["a", "b", "c", "a", "d", "e"]);
        assert_eq!(twice[3].reps, 2);
    }

    #[test]
    fn test_upsert_ignores_entries_at_or_before_index() {
        let queue = vec![
            card("a", CardState::Review),
            card("b", CardState::Review),
            card("c", CardState::Review),
        ];
        // "a" sits at index 0, which is not after index 1.
        let result = upsert_reinforcement_card(&queue, 1, queue[0].clone(), 1);
        assert_eq!(fronts(&result), vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_upsert_clamps_after_cards() {
        let queue: Vec<Card> = ["a", "b", "c", "d"]
            .iter()
            .map(|name| card(name, CardState::Review))
            .collect();
        // Zero is raised to the minimum of one intervening card.
        let result = upsert_reinforcement_card(&queue, 0, queue[0].clone(), 0);
        assert_eq!(fronts(&result), vec!["a", "b", "a", "c", "d"]);
    }

    #[test]
    fn test_upsert_into_empty_queue() {
        let result = upsert_reinforcement_card(&[], 0, card("a", CardState::Learning), 3);
        assert_eq!(fronts(&result), vec!["a"]);
    }
}
