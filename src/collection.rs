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

use std::env::current_dir;
use std::path::PathBuf;

use crate::config::Config;
use crate::db::SqliteStore;
use crate::error::Fallible;
use crate::error::fail;

/// A directory holding a review database and an optional `config.toml`.
pub struct Collection {
    pub directory: PathBuf,
    pub config: Config,
    pub store: SqliteStore,
}

impl Collection {
    pub fn new(directory: Option<String>) -> Fallible<Self> {
        let directory: PathBuf = match directory {
            Some(dir) => PathBuf::from(dir),
            None => current_dir()?,
        };
        let directory = if directory.exists() {
            directory.canonicalize()?
        } else {
            return fail("directory does not exist.");
        };

        let config = Config::load(&directory.join("config.toml"))?;
        config.validate()?;

        let db_path: PathBuf = directory.join("lexireview.db");
        log::debug!("Opening database at {}.", db_path.display());
        let store = SqliteStore::open(&db_path, config.scheduler.clone())?;

        Ok(Self {
            directory,
            config,
            store,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs::write;

    use tempfile::tempdir;

    use super::*;
    use crate::types::ids::DeckId;

    #[test]
    fn test_missing_directory() {
        let result = Collection::new(Some("./this-directory-does-not-exist".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_new_collection() -> Fallible<()> {
        let dir = tempdir()?;
        write(
            dir.path().join("config.toml"),
            "[session]\nmax_cards = 10\n",
        )?;
        let collection = Collection::new(Some(dir.path().display().to_string()))?;
        assert_eq!(collection.config.session.max_cards, 10);
        assert_eq!(collection.store.card_count(&DeckId::new("german"))?, 0);
        assert!(dir.path().join("lexireview.db").exists());
        Ok(())
    }

    #[test]
    fn test_invalid_config() -> Fallible<()> {
        let dir = tempdir()?;
        write(dir.path().join("config.toml"), "[retry]\nmax_attempts = 0\n")?;
        assert!(Collection::new(Some(dir.path().display().to_string())).is_err());
        Ok(())
    }
}
