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

//! Validation for the per-deck session settings. Every helper is total:
//! values are rounded and clamped, and non-finite input falls back to the
//! setting's default.

pub const MIN_NEW_CARDS_PER_SESSION: usize = 0;
pub const MAX_NEW_CARDS_PER_SESSION: usize = 100;
pub const DEFAULT_NEW_CARDS_PER_SESSION: usize = 20;

pub const MIN_AGAIN_REINSERT_AFTER_CARDS: usize = 1;
pub const MAX_AGAIN_REINSERT_AFTER_CARDS: usize = 20;
pub const DEFAULT_AGAIN_REINSERT_AFTER_CARDS: usize = 3;

pub const MIN_DAILY_REVIEW_LIMIT: usize = 0;
pub const MAX_DAILY_REVIEW_LIMIT: usize = 9999;
pub const DEFAULT_DAILY_REVIEW_LIMIT: usize = 200;

pub fn clamp_new_cards_per_session(value: f64) -> usize {
    clamp_setting(
        value,
        MIN_NEW_CARDS_PER_SESSION,
        MAX_NEW_CARDS_PER_SESSION,
        DEFAULT_NEW_CARDS_PER_SESSION,
    )
}

pub fn clamp_again_reinsert_after_cards(value: f64) -> usize {
    clamp_setting(
        value,
        MIN_AGAIN_REINSERT_AFTER_CARDS,
        MAX_AGAIN_REINSERT_AFTER_CARDS,
        DEFAULT_AGAIN_REINSERT_AFTER_CARDS,
    )
}

pub fn clamp_daily_review_limit(value: f64) -> usize {
    clamp_setting(
        value,
        MIN_DAILY_REVIEW_LIMIT,
        MAX_DAILY_REVIEW_LIMIT,
        DEFAULT_DAILY_REVIEW_LIMIT,
    )
}

fn clamp_setting(value: f64, min: usize, max: usize, default: usize) -> usize {
    if !value.is_finite() {
        return default;
    }
    let rounded = value.round();
    if rounded <= min as f64 {
        min
    } else if rounded >= max as f64 {
        max
    } else {
        rounded as usize
    }
}
