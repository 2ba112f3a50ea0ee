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

use std::time::Duration;

use crate::types::card::Card;
use crate::types::card_state::CardState;
use crate::types::patch::CardPatch;
use crate::types::rating::Rating;
use crate::types::timestamp::Timestamp;

/// The learning steps, shortest first. New and lapsed cards work through
/// these before (re)entering review.
pub const LEARNING_STEPS: [Duration; 2] = [
    Duration::from_secs(10 * 60),
    Duration::from_secs(24 * 60 * 60),
];

/// The ease assigned to cards when they first leave the new state.
pub const DEFAULT_EASE: f64 = 2.5;

pub const MIN_EASE: f64 = 1.3;

pub const MAX_EASE: f64 = 3.0;

/// The interval a card gets the moment it enters review.
pub const GRADUATING_INTERVAL_DAYS: u32 = 2;

const LAST_STEP: usize = LEARNING_STEPS.len() - 1;

/// The step a new card rated `Good` starts at: it skips the shortest one.
const NEW_GOOD_STEP: usize = if LAST_STEP < 1 { LAST_STEP } else { 1 };

const LAPSE_EASE_PENALTY: f64 = 0.2;

const HARD_EASE_PENALTY: f64 = 0.15;

const EASY_EASE_BONUS: f64 = 0.15;

const HARD_INTERVAL_FACTOR: f64 = 1.2;

const EASY_INTERVAL_BONUS: f64 = 1.3;

/// Clamps an ease into `[MIN_EASE, MAX_EASE]`. Non-finite values fall back
/// to `DEFAULT_EASE`.
pub fn clamp_ease(ease: f64) -> f64 {
    if ease.is_finite() {
        ease.clamp(MIN_EASE, MAX_EASE)
    } else {
        DEFAULT_EASE
    }
}

/// Computes the changes a rating makes to a card. Every state and rating
/// combination is defined, and the resulting due time is always after `now`.
pub fn schedule(card: &Card, rating: Rating, now: Timestamp) -> CardPatch {
    let patch = match card.state {
        CardState::New => schedule_new(rating, now),
        CardState::Learning => schedule_learning(card, rating, now),
        CardState::Review => schedule_review(card, rating, now),
    };
    CardPatch {
        reps: Some(card.reps.saturating_add(1)),
        updated_at: Some(now),
        ..patch
    }
}

fn schedule_new(rating: Rating, now: Timestamp) -> CardPatch {
    let step = match rating {
        Rating::Easy => return graduate(DEFAULT_EASE, now),
        Rating::Good => NEW_GOOD_STEP,
        Rating::Again | Rating::Hard => 0,
    };
    CardPatch {
        ease: Some(DEFAULT_EASE),
        interval_days: Some(0),
        ..learning_step(step, now)
    }
}

fn schedule_learning(card: &Card, rating: Rating, now: Timestamp) -> CardPatch {
    let step = card.learning_step_index.min(LAST_STEP);
    match rating {
        Rating::Again => learning_step(0, now),
        Rating::Hard => learning_step(step, now),
        Rating::Good => {
            if step + 1 > LAST_STEP {
                graduate(clamp_ease(card.ease), now)
            } else {
                learning_step(step + 1, now)
            }
        }
        Rating::Easy => graduate(clamp_ease(card.ease), now),
    }
}

fn schedule_review(card: &Card, rating: Rating, now: Timestamp) -> CardPatch {
    let interval = f64::from(card.interval_days.max(1));
    let ease = clamp_ease(card.ease);
    match rating {
        Rating::Again => CardPatch {
            lapses: Some(card.lapses.saturating_add(1)),
            ease: Some(clamp_ease(ease - LAPSE_EASE_PENALTY)),
            ..learning_step(0, now)
        },
        Rating::Hard => {
            let ease = clamp_ease(ease - HARD_EASE_PENALTY);
            let days = next_interval(interval * HARD_INTERVAL_FACTOR);
            review(card, days, ease, now)
        }
        Rating::Good => {
            let days = next_interval(interval * ease);
            review(card, days, ease, now)
        }
        Rating::Easy => {
            let ease = clamp_ease(ease + EASY_EASE_BONUS);
            let days = next_interval(interval * ease * EASY_INTERVAL_BONUS);
            review(card, days, ease, now)
        }
    }
}

fn learning_step(index: usize, now: Timestamp) -> CardPatch {
    CardPatch {
        state: Some(CardState::Learning),
        learning_step_index: Some(index),
        due_at: Some(now.plus(LEARNING_STEPS[index])),
        ..CardPatch::default()
    }
}

/// Moves a card into review. A stale `interval_days` left over from before a
/// lapse is ignored.
fn graduate(ease: f64, now: Timestamp) -> CardPatch {
    CardPatch {
        state: Some(CardState::Review),
        interval_days: Some(GRADUATING_INTERVAL_DAYS),
        ease: Some(ease),
        due_at: Some(now.plus_days(GRADUATING_INTERVAL_DAYS)),
        learning_step_index: Some(0),
        ..CardPatch::default()
    }
}

fn review(card: &Card, days: u32, ease: f64, now: Timestamp) -> CardPatch {
    CardPatch {
        state: Some(CardState::Review),
        interval_days: Some(days),
        ease: Some(ease),
        due_at: Some(now.plus_days(days)),
        learning_step_index: Some(0),
        lapses: Some(card.lapses),
        ..CardPatch::default()
    }
}

/// Rounds half away from zero, with a floor of one day.
fn next_interval(days: f64) -> u32 {
    days.round().max(1.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: Timestamp = Timestamp::from_millis(1_750_000_000_000);

    fn card_in(state: CardState) -> Card {
        let mut card = Card::new("deck", "question", "answer", Timestamp::from_millis(0));
        card.state = state;
        card
    }

    fn review_card(interval_days: u32, ease: f64) -> Card {
        let mut card = card_in(CardState::Review);
        card.interval_days = interval_days;
        card.ease = ease;
        card.reps = 4;
        card.lapses = 1;
        card
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_new_easy_graduates() {
        let card = card_in(CardState::New);
        let patch = schedule(&card, Rating::Easy, NOW);
        assert_eq!(patch.state, Some(CardState::Review));
        assert_eq!(patch.interval_days, Some(GRADUATING_INTERVAL_DAYS));
        assert_eq!(patch.ease, Some(DEFAULT_EASE));
        assert_eq!(patch.learning_step_index, Some(0));
        assert_eq!(patch.due_at, Some(NOW.plus_days(GRADUATING_INTERVAL_DAYS)));
        assert_eq!(patch.reps, Some(1));
        assert_eq!(patch.updated_at, Some(NOW));
    }

    #[test]
    fn test_new_again_and_hard_start_at_first_step() {
        let card = card_in(CardState::New);
        for rating in [Rating::Again, Rating::Hard] {
            let patch = schedule(&card, rating, NOW);
            assert_eq!(patch.state, Some(CardState::Learning));
            assert_eq!(patch.learning_step_index, Some(0));
            assert_eq!(patch.due_at, Some(NOW.plus(LEARNING_STEPS[0])));
            assert_eq!(patch.interval_days, Some(0));
            assert_eq!(patch.ease, Some(DEFAULT_EASE));
            assert_eq!(patch.reps, Some(1));
        }
    }

    #[test]
    fn test_new_good_skips_first_step() {
        let card = card_in(CardState::New);
        let patch = schedule(&card, Rating::Good, NOW);
        assert_eq!(patch.state, Some(CardState::Learning));
        assert_eq!(patch.learning_step_index, Some(1));
        assert_eq!(patch.due_at, Some(NOW.plus(LEARNING_STEPS[1])));
    }

    #[test]
    fn test_new_resets_ease() {
        let mut card = card_in(CardState::New);
        card.ease = 1.7;
        let patch = schedule(&card, Rating::Again, NOW);
        assert_eq!(patch.ease, Some(DEFAULT_EASE));
    }

    #[test]
    fn test_learning_hard_repeats_step() {
        let mut card = card_in(CardState::Learning);
        card.learning_step_index = 1;
        let patch = schedule(&card, Rating::Hard, NOW);
        assert_eq!(patch.state, Some(CardState::Learning));
        assert_eq!(patch.learning_step_index, Some(1));
        assert!(patch.due_at.is_some_and(|due| due > NOW));
        assert_eq!(patch.ease, None);
    }

    #[test]
    fn test_learning_again_resets_step() {
        let mut card = card_in(CardState::Learning);
        card.learning_step_index = 1;
        card.ease = 1.9;
        let patch = schedule(&card, Rating::Again, NOW);
        assert_eq!(patch.learning_step_index, Some(0));
        assert_eq!(patch.due_at, Some(NOW.plus(LEARNING_STEPS[0])));
        assert_eq!(patch.apply(&card).ease, 1.9);
    }

    #[test]
    fn test_learning_good_advances() {
        let card = card_in(CardState::Learning);
        let patch = schedule(&card, Rating::Good, NOW);
        assert_eq!(patch.state, Some(CardState::Learning));
        assert_eq!(patch.learning_step_index, Some(1));
        assert_eq!(patch.due_at, Some(NOW.plus(LEARNING_STEPS[1])));
    }

    #[test]
    fn test_learning_good_on_last_step_graduates() {
        let mut card = card_in(CardState::Learning);
        card.learning_step_index = LAST_STEP;
        card.ease = 2.1;
        // A stale interval from before a lapse is not reused.
        card.interval_days = 40;
        let patch = schedule(&card, Rating::Good, NOW);
        assert_eq!(patch.state, Some(CardState::Review));
        assert_eq!(patch.interval_days, Some(GRADUATING_INTERVAL_DAYS));
        assert_eq!(patch.ease, Some(2.1));
        assert_eq!(patch.learning_step_index, Some(0));
    }

    #[test]
    fn test_learning_easy_keeps_current_ease() {
        let mut card = card_in(CardState::Learning);
        card.ease = 1.5;
        let patch = schedule(&card, Rating::Easy, NOW);
        assert_eq!(patch.state, Some(CardState::Review));
        assert_eq!(patch.ease, Some(1.5));
        assert_eq!(patch.due_at, Some(NOW.plus_days(GRADUATING_INTERVAL_DAYS)));
    }

    #[test]
    fn test_learning_step_out_of_range_is_clamped() {
        let mut card = card_in(CardState::Learning);
        card.learning_step_index = 17;
        let patch = schedule(&card, Rating::Hard, NOW);
        assert_eq!(patch.learning_step_index, Some(LAST_STEP));
        let patch = schedule(&card, Rating::Good, NOW);
        assert_eq!(patch.state, Some(CardState::Review));
    }

    #[test]
    fn test_review_again_is_a_lapse() {
        let card = review_card(10, MIN_EASE);
        let patch = schedule(&card, Rating::Again, NOW);
        assert_eq!(patch.state, Some(CardState::Learning));
        assert_eq!(patch.learning_step_index, Some(0));
        assert_eq!(patch.lapses, Some(2));
        assert_eq!(patch.ease, Some(MIN_EASE));
        assert_eq!(patch.interval_days, None);
        assert_eq!(patch.reps, Some(5));
        assert_eq!(patch.due_at, Some(NOW.plus(LEARNING_STEPS[0])));
    }

    #[test]
    fn test_review_again_lowers_ease() {
        let patch = schedule(&review_card(10, 2.5), Rating::Again, NOW);
        assert_close(patch.ease.unwrap_or_default(), 2.3);
    }

    #[test]
    fn test_review_hard() {
        let card = review_card(10, 2.5);
        let patch = schedule(&card, Rating::Hard, NOW);
        assert_eq!(patch.state, Some(CardState::Review));
        assert_close(patch.ease.unwrap_or_default(), 2.35);
        assert_eq!(patch.interval_days, Some(12));
        assert_eq!(patch.due_at, Some(NOW.plus_days(12)));
        assert_eq!(patch.lapses, Some(1));
        assert_eq!(patch.learning_step_index, Some(0));
    }

    #[test]
    fn test_review_good() {
        let patch = schedule(&review_card(10, 2.5), Rating::Good, NOW);
        assert_eq!(patch.interval_days, Some(25));
        assert_eq!(patch.ease, Some(2.5));
        assert_eq!(patch.due_at, Some(NOW.plus_days(25)));
    }

    #[test]
    fn test_review_easy_uses_boosted_ease() {
        let patch = schedule(&review_card(10, 2.5), Rating::Easy, NOW);
        assert_close(patch.ease.unwrap_or_default(), 2.65);
        // round(10 * 2.65 * 1.3) = round(34.45)
        assert_eq!(patch.interval_days, Some(34));
    }

    #[test]
    fn test_review_easy_at_ceiling() {
        let patch = schedule(&review_card(10, MAX_EASE), Rating::Easy, NOW);
        assert_eq!(patch.ease, Some(MAX_EASE));
        assert_eq!(patch.interval_days, Some(39));
    }

    #[test]
    fn test_review_zero_interval_treated_as_one() {
        let patch = schedule(&review_card(0, 2.5), Rating::Hard, NOW);
        assert_eq!(patch.interval_days, Some(1));
        let patch = schedule(&review_card(0, 2.5), Rating::Good, NOW);
        // round(2.5) rounds half away from zero.
        assert_eq!(patch.interval_days, Some(3));
    }

    #[test]
    fn test_review_clamps_out_of_range_ease() {
        let patch = schedule(&review_card(10, 9.0), Rating::Good, NOW);
        assert_eq!(patch.ease, Some(MAX_EASE));
        assert_eq!(patch.interval_days, Some(30));
        let patch = schedule(&review_card(10, f64::NAN), Rating::Good, NOW);
        assert_eq!(patch.ease, Some(DEFAULT_EASE));
    }

    #[test]
    fn test_every_transition_is_in_the_future() {
        let states = [CardState::New, CardState::Learning, CardState::Review];
        let ratings = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];
        for state in states {
            for rating in ratings {
                let card = card_in(state);
                let patch = schedule(&card, rating, NOW);
                let after = patch.apply(&card);
                assert!(after.due_at > NOW, "{state} {rating}");
                assert_eq!(after.reps, card.reps + 1);
                assert!(after.ease >= MIN_EASE && after.ease <= MAX_EASE);
                assert_ne!(after.state, CardState::New);
                if state == CardState::Review && rating == Rating::Again {
                    assert_eq!(after.lapses, card.lapses + 1);
                } else {
                    assert_eq!(after.lapses, card.lapses, "{state} {rating}");
                }
                if state != CardState::Review {
                    assert_eq!(patch.lapses, None, "{state} {rating}");
                }
                if after.state == CardState::Review {
                    assert!(after.interval_days >= 1);
                }
            }
        }
    }

    #[test]
    fn test_schedule_does_not_mutate_card() {
        let card = review_card(10, 2.5);
        let copy = card.clone();
        let _ = schedule(&card, Rating::Again, NOW);
        assert_eq!(card, copy);
    }
}
