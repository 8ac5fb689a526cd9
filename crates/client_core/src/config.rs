use std::time::Duration;

use url::Url;

use crate::{
    error::{ClientError, ClientResult},
    notice::DEFAULT_NOTICE_TTL,
};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_url: String,
    pub notice_ttl: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            notice_ttl: DEFAULT_NOTICE_TTL,
        }
    }
}

impl ClientSettings {
    pub fn from_env() -> ClientResult<Self> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `CHAT_CURATOR_SERVER_URL` and
    /// `CHAT_CURATOR_NOTICE_TTL_MS`. The URL is only checked by
    /// [`ClientSettings::validate`], since a local workspace never uses it.
    pub fn resolve(env: impl Fn(&str) -> Option<String>) -> ClientResult<Self> {
        let mut settings = Self::default();
        if let Some(v) = env("CHAT_CURATOR_SERVER_URL") {
            settings.server_url = v;
        }
        if let Some(v) = env("CHAT_CURATOR_NOTICE_TTL_MS") {
            let millis = v.parse::<u64>().map_err(|err| {
                ClientError::validation(format!("invalid CHAT_CURATOR_NOTICE_TTL_MS '{v}': {err}"))
            })?;
            settings.notice_ttl = Duration::from_millis(millis);
        }
        Ok(settings)
    }

    pub fn with_server_url(mut self, server_url: impl Into<String>) -> ClientResult<Self> {
        self.server_url = server_url.into();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> ClientResult<()> {
        Url::parse(&self.server_url).map_err(|err| {
            ClientError::validation(format!("invalid server url '{}': {err}", self.server_url))
        })?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
