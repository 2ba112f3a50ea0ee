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

use std::fmt::Display;
use std::fmt::Formatter;

use clap::ValueEnum;
use serde::Serialize;

use crate::collection::Collection;
use crate::error::Fallible;
use crate::types::card_state::CardState;
use crate::types::timestamp::Timestamp;

#[derive(ValueEnum, Clone)]
pub enum StatsFormat {
    /// Plain text output.
    Text,
    /// JSON output.
    Json,
}

impl Display for StatsFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsFormat::Text => write!(f, "text"),
            StatsFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    deck_name: String,
    card_count: usize,
    new_count: usize,
    learning_count: usize,
    review_count: usize,
    due_count: usize,
    lapse_count: u32,
    reviewed_last_day_count: usize,
}

pub fn print_deck_stats(coll: &Collection, deck: &str, format: StatsFormat) -> Fallible<()> {
    let stats = get_stats(coll, deck, Timestamp::now())?;
    match format {
        StatsFormat::Text => {
            println!("Deck:             {}", stats.deck_name);
            println!("Cards:            {}", stats.card_count);
            println!("  new:            {}", stats.new_count);
            println!("  learning:       {}", stats.learning_count);
            println!("  review:         {}", stats.review_count);
            println!("Due now:          {}", stats.due_count);
            println!("Lapses:           {}", stats.lapse_count);
            println!("Reviewed (24h):   {}", stats.reviewed_last_day_count);
        }
        StatsFormat::Json => {
            let stats_json = serde_json::to_string_pretty(&stats)?;
            println!("{}", stats_json);
        }
    }
    Ok(())
}

fn get_stats(coll: &Collection, deck: &str, now: Timestamp) -> Fallible<Stats> {
    let cards = coll.db.deck_cards(deck)?;
    let count = |state: CardState| cards.iter().filter(|c| c.state == state).count();
    Ok(Stats {
        deck_name: deck.to_string(),
        card_count: cards.len(),
        new_count: count(CardState::New),
        learning_count: count(CardState::Learning),
        review_count: count(CardState::Review),
        due_count: cards.iter().filter(|c| c.is_due(now)).count(),
        lapse_count: cards.iter().map(|c| c.lapses).sum(),
        reviewed_last_day_count: coll.db.review_count_since(deck, now.minus_days(1))?,
    })
}
