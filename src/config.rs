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

use std::collections::HashMap;
use std::fs::read_to_string;
use std::path::Path;

use serde::Deserialize;

use crate::error::Fallible;
use crate::error::fail;
use crate::limits::DEFAULT_AGAIN_REINSERT_AFTER_CARDS;
use crate::limits::DEFAULT_DAILY_REVIEW_LIMIT;
use crate::limits::DEFAULT_NEW_CARDS_PER_SESSION;
use crate::session::SessionLimits;

/// The name of the configuration file looked for next to the database.
pub const CONFIG_FILE_NAME: &str = "stepcards.toml";

/// Per-deck preferences, read from TOML.
#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    defaults: DeckPreferences,
    #[serde(default)]
    decks: HashMap<String, DeckPreferences>,
}

/// Settings that may be given globally or per deck. Values are kept as
/// plain numbers and only validated when limits are resolved.
#[derive(Deserialize, Default, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct DeckPreferences {
    new_cards_per_session: Option<f64>,
    again_reinsert_after_cards: Option<f64>,
    daily_review_limit: Option<f64>,
}

impl Config {
    pub fn parse(content: &str) -> Fallible<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Fallible<Self> {
        log::debug!("Loading configuration from {}", path.display());
        let content = read_to_string(path)?;
        Self::parse(&content)
    }

    /// Finds the configuration: an explicit path must exist; otherwise the
    /// file next to the database is used if present, and the built-in
    /// defaults if not.
    pub fn locate(explicit: Option<&Path>, db_path: &Path) -> Fallible<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return fail(format!(
                    "configuration file does not exist: {}",
                    path.display()
                ));
            }
            return Self::load(path);
        }
        let sibling = match db_path.parent() {
            Some(parent) => parent.join(CONFIG_FILE_NAME),
            None => Path::new(CONFIG_FILE_NAME).to_path_buf(),
        };
        if sibling.exists() {
            Self::load(&sibling)
        } else {
            log::debug!("No configuration file, using defaults.");
            Ok(Self::default())
        }
    }

    /// Resolves the limits for a deck. Deck settings override the defaults,
    /// and every value is clamped.
    pub fn limits_for(&self, deck_name: &str) -> SessionLimits {
        let deck = self.decks.get(deck_name);
        let defaults = &self.defaults;
        SessionLimits::new(
            resolve(
                deck,
                defaults,
                |p| p.new_cards_per_session,
                DEFAULT_NEW_CARDS_PER_SESSION,
            ),
            resolve(
                deck,
                defaults,
                |p| p.again_reinsert_after_cards,
                DEFAULT_AGAIN_REINSERT_AFTER_CARDS,
            ),
            resolve(
                deck,
                defaults,
                |p| p.daily_review_limit,
                DEFAULT_DAILY_REVIEW_LIMIT,
            ),
        )
    }
}

fn resolve(
    deck: Option<&DeckPreferences>,
    defaults: &DeckPreferences,
    get: fn(&DeckPreferences) -> Option<f64>,
    fallback: usize,
) -> f64 {
    deck.and_then(get)
        .or_else(|| get(defaults))
        .unwrap_or(fallback as f64)
}

#[cfg(test)]
mod tests {
    use std::fs::write;

    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() -> Fallible<()> {
        let config = Config::parse("")?;
        assert_eq!(config.limits_for("any"), SessionLimits::default());
        Ok(())
    }

    #[test]
    fn test_deck_overrides_defaults() -> Fallible<()> {
        let config = Config::parse(
            r#"
            [defaults]
            new_cards_per_session = 10
            daily_review_limit = 50

            [decks.spanish]
            new_cards_per_session = 5
            again_reinsert_after_cards = 2.0
            "#,
        )?;
        let spanish = config.limits_for("spanish");
        assert_eq!(spanish.new_cards_per_session, 5);
        assert_eq!(spanish.again_reinsert_after_cards, 2);
        assert_eq!(spanish.daily_review_limit, 50);
        let other = config.limits_for("french");
        assert_eq!(other.new_cards_per_session, 10);
        assert_eq!(other.again_reinsert_after_cards, 3);
        Ok(())
    }

    #[test]
    fn test_out_of_range_values_are_clamped() -> Fallible<()> {
        let config = Config::parse(
            r#"
            [defaults]
            new_cards_per_session = -5
            again_reinsert_after_cards = 999
            daily_review_limit = nan
            "#,
        )?;
        let limits = config.limits_for("x");
        assert_eq!(limits.new_cards_per_session, 0);
        assert_eq!(limits.again_reinsert_after_cards, 20);
        assert_eq!(limits.daily_review_limit, DEFAULT_DAILY_REVIEW_LIMIT);
        Ok(())
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(Config::parse("[defaults]\nnew_cards = 3\n").is_err());
    }

    #[test]
    fn test_locate() -> Fallible<()> {
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("stepcards.db");
        let config = Config::locate(None, &db_path)?;
        assert_eq!(config.limits_for("x"), SessionLimits::default());

        write(
            dir.path().join(CONFIG_FILE_NAME),
            "[defaults]\nnew_cards_per_session = 7\n",
        )?;
        let config = Config::locate(None, &db_path)?;
        assert_eq!(config.limits_for("x").new_cards_per_session, 7);

        let missing = dir.path().join("missing.toml");
        assert!(Config::locate(Some(&missing), &db_path).is_err());
        Ok(())
    }
}
