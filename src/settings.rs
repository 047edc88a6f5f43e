//! Process settings read from the environment (`.env` is loaded first by `main`).

use crate::sheets::google::GoogleCredentials;
use crate::sheets::SheetsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{0} missing")]
    Missing(&'static str),
    #[error("set GOOGLE_ACCESS_TOKEN, or CLIENT_SECRET_FILE together with GOOGLE_REFRESH_TOKEN")]
    NoGoogleCredentials,
    #[error(transparent)]
    Credentials(#[from] SheetsError),
}

pub struct Settings {
    pub bot_token: String,
    pub bot_username: Option<String>,
    pub database_url: String,
    pub config_path: PathBuf,
    pub bind_addr: String,
    pub webhook_secret: Option<String>,
    pub google: GoogleCredentials,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| var(key).ok_or(SettingsError::Missing(key));

        let bind_addr = var("BIND_ADDR").unwrap_or_else(|| {
            let port = var("PORT").unwrap_or_else(|| "3000".to_string());
            format!("0.0.0.0:{}", port)
        });

        let google = match (
            var("GOOGLE_ACCESS_TOKEN"),
            var("CLIENT_SECRET_FILE"),
            var("GOOGLE_REFRESH_TOKEN"),
        ) {
            (Some(token), _, _) => GoogleCredentials::AccessToken(token),
            (None, Some(file), Some(refresh)) => {
                GoogleCredentials::from_client_secret_file(file, refresh)?
            }
            _ => return Err(SettingsError::NoGoogleCredentials),
        };

        Ok(Self {
            bot_token: required("TELEGRAM_BOT_TOKEN")?,
            bot_username: var("BOT_USERNAME").map(|name| name.trim_start_matches('@').to_string()),
            database_url: required("DATABASE_URL")?,
            config_path: var("CONFIGURATION_FILE_PATH")
                .unwrap_or_else(|| "config.json".to_string())
                .into(),
            bind_addr,
            webhook_secret: var("WEBHOOK_SECRET"),
            google,
        })
    }
}
