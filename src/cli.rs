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

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

use crate::cmd::add::add_card;
use crate::cmd::drill::drill;
use crate::cmd::export::export_deck;
use crate::cmd::stats::StatsFormat;
use crate::cmd::stats::print_deck_stats;
use crate::collection::Collection;
use crate::error::Fallible;
use crate::types::timestamp::Timestamp;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the card database.
    #[arg(long, global = true, default_value = "stepcards.db")]
    db: PathBuf,
    /// Path to the preferences file. Defaults to `stepcards.toml` next to
    /// the database, if it exists.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a card to a deck.
    Add {
        /// The name of the deck.
        deck: String,
        /// The prompt side of the card.
        front: String,
        /// The answer side of the card.
        back: String,
    },
    /// Drill the due cards of a deck.
    Drill {
        /// The name of the deck.
        deck: String,
    },
    /// Print deck statistics.
    Stats {
        /// The name of the deck.
        deck: String,
        /// Which output format to use.
        #[arg(long, default_value_t = StatsFormat::Text)]
        format: StatsFormat,
    },
    /// Export a deck's cards and review history as JSON.
    Export {
        /// The name of the deck.
        deck: String,
    },
}

pub fn entrypoint() -> Fallible<()> {
    let cli: Cli = Cli::parse();
    let mut coll = Collection::new(cli.db, cli.config.as_deref())?;
    match cli.command {
        Command::Add { deck, front, back } => {
            let id = add_card(&mut coll, &deck, &front, &back, Timestamp::now())?;
            println!("{id}");
            Ok(())
        }
        Command::Drill { deck } => drill(&mut coll, &deck),
        Command::Stats { deck, format } => print_deck_stats(&coll, &deck, format),
        Command::Export { deck } => export_deck(&coll, &deck),
    }
}
