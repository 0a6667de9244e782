//! State document persistence
//!
//! Load decodes and migrates the document; save serializes it to a temp
//! sibling file and atomically renames it into place, so a crash leaves
//! either the old or the new document on disk, never a torn write.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::migration::{self, CURRENT_VERSION};
use crate::schema::State;

const STATE_DIR: &str = ".ludus-magnus";
const STATE_FILE: &str = "state.json";

/// Default on-disk state location, relative to the working directory.
pub fn default_state_path() -> PathBuf {
    PathBuf::from(STATE_DIR).join(STATE_FILE)
}

/// Read and decode state from disk, migrating it to the current schema
/// version. A missing file yields a fresh empty document.
pub fn load(path: &Path) -> Result<State> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(State::new()),
        Err(source) => {
            return Err(CoreError::ReadState {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut state: State =
        serde_json::from_slice(&content).map_err(|source| CoreError::DecodeState {
            path: path.to_path_buf(),
            source,
        })?;

    migration::migrate(&mut state)?;
    Ok(state)
}

/// Encode and write state to disk atomically.
pub fn save(path: &Path, state: &State) -> Result<()> {
    let mut state = state.clone();
    if state.version.trim().is_empty() {
        state.version = CURRENT_VERSION.to_string();
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| CoreError::WriteState {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }

    let mut content = serde_json::to_string_pretty(&state)?;
    content.push('\n');

    let tmp_path = temp_sibling(path);
    fs::write(&tmp_path, content).map_err(|source| CoreError::WriteState {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| CoreError::WriteState {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), sessions = state.sessions.len(), "state saved");
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| STATE_FILE.into());
    name.push(".tmp");
    path.with_file_name(name)
}
