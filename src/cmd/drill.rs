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

use std::io::BufRead;
use std::io::Write;
use std::io::stdin;
use std::io::stdout;

use crate::collection::Collection;
use crate::db::Database;
use crate::db::SessionId;
use crate::error::Fallible;
use crate::error::fail;
use crate::session::Rated;
use crate::session::Session;
use crate::types::rating::Rating;
use crate::types::timestamp::Timestamp;

#[derive(Debug, PartialEq)]
enum Action {
    Reveal,
    Undo,
    Quit,
    Rate(Rating),
}

impl Action {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "" => Some(Action::Reveal),
            "u" => Some(Action::Undo),
            "q" => Some(Action::Quit),
            key => Rating::from_key(key).map(Action::Rate),
        }
    }
}

/// Drills the due cards of a deck on the terminal.
pub fn drill(coll: &mut Collection, deck: &str) -> Fallible<()> {
    let input = stdin().lock();
    let output = stdout().lock();
    run_drill(coll, deck, input, output, Timestamp::now)?;
    Ok(())
}

/// Runs a session over `input` and `output`, returning the number of
/// ratings made. Each rating is persisted with its review row as soon as it
/// is made, so an interrupted session keeps its history.
pub fn run_drill<R: BufRead, W: Write>(
    coll: &mut Collection,
    deck: &str,
    mut input: R,
    mut output: W,
    clock: impl Fn() -> Timestamp,
) -> Fallible<usize> {
    let started_at = clock();
    let reviewed_today = coll.db.review_count_since(deck, started_at.minus_days(1))?;
    let limits = coll.config.limits_for(deck);
    log::debug!("Starting session on {deck} with {limits:?}, {reviewed_today} reviews today.");
    let mut session = Session::new(limits, reviewed_today);
    session.refill(&coll.db.due_cards(deck, started_at, None)?);
    if session.is_finished() {
        writeln!(output, "No cards due.")?;
        return Ok(0);
    }

    let mut history = SessionLog {
        deck,
        started_at,
        id: None,
    };
    let result = drill_loop(coll, &mut session, &mut history, &mut input, &mut output, &clock);
    let closed = history.close(&mut coll.db, clock());
    let count = session.reviews().len();
    if let Err(e) = &result {
        log::error!("Drill on {deck} stopped after {count} reviews: {e}");
    }
    result?;
    closed?;
    writeln!(output, "Session completed: {count} reviews.")?;
    Ok(count)
}

/// The session row ratings are written under. It is only created once the
/// first rating is made.
struct SessionLog<'a> {
    deck: &'a str,
    started_at: Timestamp,
    id: Option<SessionId>,
}

impl SessionLog<'_> {
    fn record(&mut self, db: &mut Database, rated: &Rated) -> Fallible<()> {
        let id = match self.id {
            Some(id) => id,
            None => {
                let id = db.start_session(self.deck, self.started_at)?;
                self.id = Some(id);
                id
            }
        };
        db.record_rating(id, rated)?;
        Ok(())
    }

    fn revert(&self, db: &mut Database, rated: &Rated) -> Fallible<()> {
        match self.id {
            Some(id) => db.revert_rating(id, rated),
            None => fail("no session to revert a rating in"),
        }
    }

    fn close(&self, db: &mut Database, ended_at: Timestamp) -> Fallible<()> {
        match self.id {
            Some(id) => db.end_session(id, ended_at),
            None => Ok(()),
        }
    }
}

fn drill_loop<R: BufRead, W: Write>(
    coll: &mut Collection,
    session: &mut Session,
    history: &mut SessionLog,
    input: &mut R,
    output: &mut W,
    clock: &impl Fn() -> Timestamp,
) -> Fallible<()> {
    'session: loop {
        if session.is_finished() {
            // Cards not yet seen this session may have come due while
            // drilling.
            let due = coll.db.due_cards(history.deck, clock(), None)?;
            if session.refill(&due) == 0 {
                break;
            }
        }
        let Some(card) = session.current().cloned() else {
            break;
        };

        writeln!(output)?;
        writeln!(output, "[{} left] {}", session.remaining(), card.front)?;
        loop {
            writeln!(output, "(Enter = reveal, u = undo, q = quit)")?;
            match read_action(input, output)? {
                Action::Reveal => break,
                Action::Undo => {
                    undo(coll, session, history, output)?;
                    continue 'session;
                }
                Action::Quit => break 'session,
                Action::Rate(_) => writeln!(output, "Reveal the card first.")?,
            }
        }

        writeln!(output, "{}", card.back)?;
        loop {
            writeln!(
                output,
                "Grade: (1 = Again, 2 = Hard, 3 = Good, 4 = Easy, u = undo, q = quit)"
            )?;
            match read_action(input, output)? {
                Action::Rate(rating) => {
                    let rated = session.rate(rating, clock())?;
                    history.record(&mut coll.db, &rated)?;
                    break;
                }
                Action::Undo => {
                    undo(coll, session, history, output)?;
                    continue 'session;
                }
                Action::Quit => break 'session,
                Action::Reveal => {}
            }
        }
    }
    Ok(())
}

/// Reads lines until one parses as an action. End of input quits.
fn read_action<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Fallible<Action> {
    loop {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(Action::Quit);
        }
        match Action::parse(&line) {
            Some(action) => return Ok(action),
            None => writeln!(output, "Unrecognized input: {}", line.trim())?,
        }
    }
}

fn undo<W: Write>(
    coll: &mut Collection,
    session: &mut Session,
    history: &SessionLog,
    output: &mut W,
) -> Fallible<()> {
    match session.undo() {
        Some(rated) => {
            history.revert(&mut coll.db, &rated)?;
            writeln!(output, "Undid '{}' on the previous card.", rated.rating)?;
        }
        None => writeln!(output, "Nothing to undo.")?,
    }
    Ok(())
}
