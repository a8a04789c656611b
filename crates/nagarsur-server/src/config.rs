use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, bail};

use nagarsur_functions::NotificationSettings;
use nagarsur_functions::fcm::DEFAULT_ENDPOINT;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub admin_users: HashSet<String>,
    /// Unset disables push delivery.
    pub fcm_server_key: Option<String>,
    pub fcm_endpoint: String,
    pub notifications: NotificationSettings,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = var("NAGARSUR_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("NAGARSUR_JWT_SECRET is unset or still a placeholder");
        }

        let port: u16 = var("NAGARSUR_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("NAGARSUR_PORT must be a port number")?;

        let admin_users = var("NAGARSUR_ADMIN_USERS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect();

        let defaults = NotificationSettings::default();
        let notifications = NotificationSettings {
            icon: var("NAGARSUR_PUSH_ICON").unwrap_or(defaults.icon),
            sound: var("NAGARSUR_PUSH_SOUND").unwrap_or(defaults.sound),
            click_action: var("NAGARSUR_CLICK_ACTION").unwrap_or(defaults.click_action),
        };

        Ok(Self {
            host: var("NAGARSUR_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("NAGARSUR_DB_PATH").unwrap_or_else(|| "nagarsur.db".into()).into(),
            jwt_secret,
            admin_users,
            fcm_server_key: var("NAGARSUR_FCM_SERVER_KEY").filter(|k| !k.is_empty()),
            fcm_endpoint: var("NAGARSUR_FCM_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.into()),
            notifications,
        })
    }
}
