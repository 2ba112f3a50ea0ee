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

use crate::collection::Collection;
use crate::db::ReviewRow;
use crate::db::SessionId;
use crate::error::Fallible;
use crate::types::card::Card;
use crate::types::timestamp::Timestamp;

pub fn export_deck(coll: &Collection, deck: &str) -> Fallible<()> {
    let export: Export = get_export(coll, deck)?;
    let json: String = serde_json::to_string_pretty(&export)?;
    println!("{json}");
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Export {
    deck_name: String,
    cards: Vec<Card>,
    sessions: Vec<SessionExport>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionExport {
    session_id: SessionId,
    started_at: Timestamp,
    ended_at: Timestamp,
    reviews: Vec<ReviewRow>,
}

fn get_export(coll: &Collection, deck: &str) -> Fallible<Export> {
    let cards = coll.db.deck_cards(deck)?;
    let mut sessions = Vec::new();
    for session in coll.db.sessions(deck)? {
        let reviews = coll.db.session_reviews(session.session_id)?;
        sessions.push(SessionExport {
            session_id: session.session_id,
            started_at: session.started_at,
            ended_at: session.ended_at,
            reviews,
        });
    }
    Ok(Export {
        deck_name: deck.to_string(),
        cards,
        sessions,
    })
}
