//! `.env` file loading

use std::path::PathBuf;

/// Load variables from the nearest `.env` file, if any
///
/// Variables already present in the process environment win. Returns the
/// path that was loaded.
pub fn load_env_file() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!("Loaded environment from {}", path.display());
            Some(path)
        }
        Err(e) if e.not_found() => None,
        Err(e) => {
            tracing::warn!("Ignoring unreadable .env file: {e}");
            None
        }
    }
}
