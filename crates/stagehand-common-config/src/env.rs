//! Environment variable handling.

use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("failed to load {}: {message}", path.display())]
    DotenvError { path: PathBuf, message: String },
}

/// Environment variable names.
pub mod vars {
    pub const STAGEHAND_ENV: &str = "STAGEHAND_ENV";

    // Overrides
    pub const STAGEHAND_TOLERANCE_MS: &str = "STAGEHAND_TOLERANCE_MS";
    pub const STAGEHAND_GUARD_MODE: &str = "STAGEHAND_GUARD_MODE";
    pub const STAGEHAND_DATABASE_PATH: &str = "STAGEHAND_DATABASE_PATH";
}

/// Access to process environment.
pub struct Environment;

impl Environment {
    /// Load `.env.<STAGEHAND_ENV>`, `.env.local` and `.env` from `dir`.
    ///
    /// Variables already set are never overwritten, so the process
    /// environment wins, then the most specific file. Missing files are
    /// skipped. Returns the files that were loaded.
    pub fn load_dotenv(dir: &Path) -> Result<Vec<PathBuf>, EnvError> {
        let mut candidates = Vec::with_capacity(3);
        if let Ok(name) = env::var(vars::STAGEHAND_ENV) {
            candidates.push(dir.join(format!(".env.{name}")));
        }
        candidates.push(dir.join(".env.local"));
        candidates.push(dir.join(".env"));

        let mut loaded = Vec::new();
        for path in candidates.into_iter().filter(|p| p.is_file()) {
            dotenvy::from_path(&path).map_err(|e| EnvError::DotenvError {
                path: path.clone(),
                message: e.to_string(),
            })?;
            loaded.push(path);
        }
        Ok(loaded)
    }

    pub fn get(var: &str) -> Option<String> {
        env::var(var).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_missing_files_are_skipped() {
        let dir = tempdir().unwrap();
        assert!(Environment::load_dotenv(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_local_file_takes_precedence() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(".env"),
            "STAGEHAND_TEST_DOTENV_SHARED=base\nSTAGEHAND_TEST_DOTENV_BASE_ONLY=yes\n",
        )
        .unwrap();
        fs::write(dir.path().join(".env.local"), "STAGEHAND_TEST_DOTENV_SHARED=local\n").unwrap();

        let loaded = Environment::load_dotenv(dir.path()).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(Environment::get("STAGEHAND_TEST_DOTENV_SHARED").as_deref(), Some("local"));
        assert_eq!(Environment::get("STAGEHAND_TEST_DOTENV_BASE_ONLY").as_deref(), Some("yes"));
    }

    #[test]
    fn test_process_environment_wins() {
        let dir = tempdir().unwrap();
        env::set_var("STAGEHAND_TEST_DOTENV_PRESET", "process");
        fs::write(dir.path().join(".env"), "STAGEHAND_TEST_DOTENV_PRESET=file\n").unwrap();

        Environment::load_dotenv(dir.path()).unwrap();

        assert_eq!(Environment::get("STAGEHAND_TEST_DOTENV_PRESET").as_deref(), Some("process"));
        env::remove_var("STAGEHAND_TEST_DOTENV_PRESET");
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".env"), "=orphan\n").unwrap();

        match Environment::load_dotenv(dir.path()) {
            Err(EnvError::DotenvError { path, .. }) => assert!(path.ends_with(".env")),
            other => panic!("Expected DotenvError, got {other:?}"),
        }
    }
}
