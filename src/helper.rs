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

use tempfile::TempDir;
use tempfile::tempdir;

use crate::collection::Collection;
use crate::db::Database;
use crate::error::ErrorReport;
use crate::error::Fallible;

/// Creates an empty database in a fresh temporary directory. The directory
/// is deleted when the returned `TempDir` is dropped.
pub fn create_tmp_database() -> Fallible<(TempDir, Database)> {
    let dir = tempdir()?;
    let path = dir.path().join("test.db");
    let path = path
        .to_str()
        .ok_or_else(|| ErrorReport::new("invalid path"))?;
    let db = Database::new(path)?;
    Ok((dir, db))
}

/// Creates a collection with default preferences in a fresh temporary
/// directory.
pub fn create_tmp_collection() -> Fallible<(TempDir, Collection)> {
    let dir = tempdir()?;
    let coll = Collection::new(dir.path().join("stepcards.db"), None)?;
    Ok((dir, coll))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tmp_collection() -> Fallible<()> {
        let (dir, coll) = create_tmp_collection()?;
        assert!(coll.db_path.starts_with(dir.path()));
        Ok(())
    }
}
