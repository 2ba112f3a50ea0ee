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

use std::path::Path;
use std::path::PathBuf;

use crate::config::Config;
use crate::db::Database;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;

/// The card database together with the preferences that govern sessions.
pub struct Collection {
    pub db_path: PathBuf,
    pub db: Database,
    pub config: Config,
}

impl Collection {
    pub fn new(db_path: PathBuf, config_path: Option<&Path>) -> Fallible<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return fail("database directory does not exist.");
            }
        }
        let config = Config::locate(config_path, &db_path)?;
        let db: Database = {
            let path: &str = db_path
                .to_str()
                .ok_or_else(|| ErrorReport::new("invalid path"))?;
            log::debug!("Opening database at {path}");
            Database::new(path)?
        };
        Ok(Self {
            db_path,
            db,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionLimits;

    #[test]
    fn test_missing_directory() {
        let path = PathBuf::from("./derpherp/stepcards.db");
        let result = Collection::new(path, None);
        assert!(result.is_err());
        let err = result.err().map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some("error: database directory does not exist.")
        );
    }

    #[test]
    fn test_open_fresh_collection() -> Fallible<()> {
        let dir = tempfile::tempdir()?;
        let coll = Collection::new(dir.path().join("stepcards.db"), None)?;
        assert!(coll.db_path.exists());
        assert_eq!(coll.config.limits_for("x"), SessionLimits::default());
        Ok(())
    }
}
