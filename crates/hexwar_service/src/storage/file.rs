//! Filesystem backend.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<game_id>/metadata.json
//! <root>/<game_id>/state.json
//! <root>/<game_id>/history.json
//! ```
//!
//! Documents are pretty-printed JSON, written to a temp file and renamed
//! into place.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use hexwar_core::state::{GameMoveHistory, GameRecord, GameState, MoveGroup, ScreenshotIndexInfo};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{check_version, next_state, push_group, GameStateUpdater, GameStorageProvider};
use crate::error::{Result, ServiceError};

const METADATA_FILE: &str = "metadata.json";
const STATE_FILE: &str = "state.json";
const HISTORY_FILE: &str = "history.json";

/// Games stored as JSON documents, one directory per game.
///
/// Version check-and-write is serialized by a process-wide mutex; two
/// processes sharing a root are not coordinated.
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Open (and create if needed) a storage root.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Io`] if the directory cannot be created.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| ServiceError::io(&root, e))?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn game_dir(&self, game_id: &str) -> Result<PathBuf> {
        let valid = !game_id.is_empty()
            && game_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ServiceError::InvalidRequest(format!(
                "invalid game id '{game_id}'"
            )));
        }
        Ok(self.root.join(game_id))
    }

    fn existing_dir(&self, game_id: &str) -> Result<PathBuf> {
        let dir = self.game_dir(game_id)?;
        if dir.join(METADATA_FILE).is_file() {
            Ok(dir)
        } else {
            Err(ServiceError::GameNotFound(game_id.to_string()))
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| ServiceError::LockPoisoned)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| ServiceError::io(path, e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ServiceError::Serialization(format!("{}: {e}", path.display())))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| ServiceError::Serialization(format!("{}: {e}", path.display())))?;
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, bytes).map_err(|e| ServiceError::io(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| ServiceError::io(path, e))?;
    debug!(path = %path.display(), "document written");
    Ok(())
}

impl GameStorageProvider for FileStorage {
    fn create_game(&self, record: &GameRecord, state: &GameState) -> Result<()> {
        let _guard = self.lock()?;
        let dir = self.game_dir(&record.id)?;
        if dir.join(METADATA_FILE).exists() {
            return Err(ServiceError::GameExists(record.id.clone()));
        }
        fs::create_dir_all(&dir).map_err(|e| ServiceError::io(&dir, e))?;

        let mut state = state.clone();
        state.version = 0;
        write_json(&dir.join(STATE_FILE), &state)?;
        write_json(&dir.join(HISTORY_FILE), &GameMoveHistory::new(record.id.clone()))?;
        // Metadata last: its presence marks the game as complete.
        write_json(&dir.join(METADATA_FILE), record)
    }

    fn load_game(&self, game_id: &str) -> Result<(GameRecord, GameState)> {
        let dir = self.existing_dir(game_id)?;
        let record = read_json(&dir.join(METADATA_FILE))?;
        let state = read_json(&dir.join(STATE_FILE))?;
        Ok((record, state))
    }

    fn save_game_state(
        &self,
        game_id: &str,
        state: &GameState,
        expected_version: u64,
    ) -> Result<u64> {
        let _guard = self.lock()?;
        let dir = self.existing_dir(game_id)?;
        let path = dir.join(STATE_FILE);
        let stored: GameState = read_json(&path)?;
        check_version(game_id, expected_version, stored.version)?;

        let next = next_state(&stored, state, expected_version);
        write_json(&path, &next)?;
        Ok(next.version)
    }

    fn delete_game(&self, game_id: &str) -> Result<()> {
        let _guard = self.lock()?;
        let dir = self.existing_dir(game_id)?;
        fs::remove_dir_all(&dir).map_err(|e| ServiceError::io(&dir, e))
    }

    fn list_games(&self) -> Result<Vec<GameRecord>> {
        let mut records = Vec::new();
        let entries = fs::read_dir(&self.root).map_err(|e| ServiceError::io(&self.root, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| ServiceError::io(&self.root, e))?;
            let metadata = entry.path().join(METADATA_FILE);
            if metadata.is_file() {
                records.push(read_json::<GameRecord>(&metadata)?);
            }
        }
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    fn load_history(&self, game_id: &str) -> Result<GameMoveHistory> {
        let dir = self.existing_dir(game_id)?;
        read_json(&dir.join(HISTORY_FILE))
    }

    fn append_history(&self, game_id: &str, group: &MoveGroup) -> Result<u64> {
        let _guard = self.lock()?;
        let dir = self.existing_dir(game_id)?;
        let path = dir.join(HISTORY_FILE);
        let mut history: GameMoveHistory = read_json(&path)?;
        let number = push_group(&mut history, group);
        write_json(&path, &history)?;
        Ok(number)
    }
}

impl GameStateUpdater for FileStorage {
    fn game_state_version(&self, game_id: &str) -> Result<u64> {
        let dir = self.existing_dir(game_id)?;
        let state: GameState = read_json(&dir.join(STATE_FILE))?;
        Ok(state.version)
    }

    fn update_screenshot_index_info(
        &self,
        game_id: &str,
        expected_version: u64,
        info: &ScreenshotIndexInfo,
    ) -> Result<()> {
        let _guard = self.lock()?;
        let dir = self.existing_dir(game_id)?;
        let path = dir.join(STATE_FILE);
        let mut state: GameState = read_json(&path)?;
        check_version(game_id, expected_version, state.version)?;
        state.screenshot_index = info.clone();
        write_json(&path, &state)
    }
}
