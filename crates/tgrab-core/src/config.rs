use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{
    domain::ChatTarget,
    errors::Error,
    Result,
};

/// Typed configuration for one archival run.
///
/// Everything comes from the environment (or a local `.env`); the core never
/// parses CLI flags.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram API credentials
    pub api_id: i32,
    pub api_hash: String,
    pub phone: String,

    // What to archive and where to put it
    pub chat: ChatTarget,
    pub output_dir: PathBuf,
    pub message_limit: Option<usize>,

    // Session persistence
    pub session_file: PathBuf,

    // Run log
    pub run_log_path: PathBuf,
    pub run_log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let api_id = env_i32("TELEGRAM_API_ID").ok_or_else(|| {
            Error::Config("TELEGRAM_API_ID environment variable is required".to_string())
        })?;
        let api_hash = env_str("TELEGRAM_API_HASH")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("TELEGRAM_API_HASH environment variable is required".to_string())
            })?;
        let phone = env_str("TELEGRAM_PHONE").and_then(non_empty).ok_or_else(|| {
            Error::Config("TELEGRAM_PHONE environment variable is required".to_string())
        })?;

        let chat = env_str("TELEGRAM_CHAT")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("TELEGRAM_CHAT environment variable is required".to_string())
            })?
            .parse::<ChatTarget>()?;

        let output_dir =
            env_path("OUTPUT_DIR").unwrap_or_else(|| PathBuf::from("downloaded_images"));
        let message_limit = env_usize("MESSAGE_LIMIT");

        let session_file =
            env_path("SESSION_FILE").unwrap_or_else(|| PathBuf::from("tgrab.session"));

        let run_log_path =
            env_path("RUN_LOG_PATH").unwrap_or_else(|| PathBuf::from("/tmp/tgrab-run.log"));
        let run_log_json = env_bool("RUN_LOG_JSON").unwrap_or(false);

        Ok(Self {
            api_id,
            api_hash,
            phone,
            chat,
            output_dir,
            message_limit,
            session_file,
            run_log_path,
            run_log_json,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
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

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_i32(key: &str) -> Option<i32> {
    env_str(key).and_then(|s| s.trim().parse::<i32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
