//! Per-user AI provider settings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported generative providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    Google,
    Openai,
}

impl AiProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Openai => "openai",
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            "openai" => Ok(Self::Openai),
            other => Err(format!("Unknown AI provider '{other}'")),
        }
    }
}

/// Stored settings row. The key stays encrypted; this type is never sent to
/// clients.
#[derive(Debug, Clone)]
pub struct UserSettings {
    pub id: String,
    pub user_id: String,
    pub ai_provider: AiProvider,
    pub encrypted_api_key: Option<String>,
    pub preferred_model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What `settings.get` returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub ai_provider: AiProvider,
    pub has_api_key: bool,
    pub preferred_model: Option<String>,
}

impl From<Option<&UserSettings>> for SettingsView {
    fn from(settings: Option<&UserSettings>) -> Self {
        match settings {
            Some(s) => Self {
                ai_provider: s.ai_provider,
                has_api_key: s.encrypted_api_key.is_some(),
                preferred_model: s.preferred_model.clone(),
            },
            None => Self {
                ai_provider: AiProvider::default(),
                has_api_key: false,
                preferred_model: None,
            },
        }
    }
}
