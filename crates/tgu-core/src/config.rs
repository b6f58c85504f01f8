use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{errors::Error, Result};

/// Typed configuration, loaded from the environment (with `.env` support).
///
/// All three transport credentials must be present; they are validated here,
/// once, before any per-item processing begins.
#[derive(Clone, Debug)]
pub struct Config {
    /// Path to the saved user session.
    pub session_file: PathBuf,
    pub api_id: i32,
    pub api_hash: String,

    /// Record per-item failures instead of aborting the run.
    pub continue_on_fail: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_env()
    }

    fn from_env() -> Result<Self> {
        let session_file = env_str("TELEGRAM_SESSION_FILE").and_then(non_empty);
        let api_id = env_str("TELEGRAM_API_ID").and_then(|s| s.trim().parse::<i32>().ok());
        let api_hash = env_str("TELEGRAM_API_HASH").and_then(non_empty);

        let (Some(session_file), Some(api_id), Some(api_hash)) =
            (session_file, api_id, api_hash)
        else {
            return Err(Error::MissingCredentials);
        };

        Ok(Self {
            session_file: PathBuf::from(session_file),
            api_id,
            api_hash,
            continue_on_fail: env_bool("CONTINUE_ON_FAIL").unwrap_or(false),
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
