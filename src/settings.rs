use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CommandError;

/// Process-wide configuration, read once at startup and then immutable.
///
/// The token secret is accepted from the environment or settings file but is
/// never serialized back out and never logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the hypervisor API, e.g. `https://pve.example.com:8006/api2/json`.
    pub api_url: String,
    /// API token id in `user@realm!tokenid` form.
    pub token_id: String,
    /// Token secret. Loaded, used for the auth header, never written back.
    #[serde(default, skip_serializing)]
    pub token_secret: String,
    /// The single capability flag: are mutating operations permitted.
    #[serde(default)]
    pub allow_mutations: bool,
    /// Verify the API's TLS certificate. Off is common for lab clusters
    /// with self-signed certs.
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    /// Node used when a command accepts an optional `node` and none is given.
    #[serde(default)]
    pub default_node: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Settings {
    /// Load settings from `VIRTDECK_*` environment variables, optionally
    /// seeded from a JSON settings file (env wins over file).
    pub fn load(file: Option<&Path>) -> Result<Settings, CommandError> {
        let mut settings = match file {
            Some(path) => read_settings_file(path)?,
            None => Settings {
                api_url: String::new(),
                token_id: String::new(),
                token_secret: String::new(),
                allow_mutations: false,
                verify_tls: true,
                default_node: None,
            },
        };

        if let Ok(v) = std::env::var("VIRTDECK_API_URL") {
            settings.api_url = v;
        }
        if let Ok(v) = std::env::var("VIRTDECK_TOKEN_ID") {
            settings.token_id = v;
        }
        if let Ok(v) = std::env::var("VIRTDECK_TOKEN_SECRET") {
            settings.token_secret = v;
        }
        if let Ok(v) = std::env::var("VIRTDECK_ALLOW_MUTATIONS") {
            settings.allow_mutations = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("VIRTDECK_VERIFY_TLS") {
            settings.verify_tls = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("VIRTDECK_DEFAULT_NODE") {
            settings.default_node = Some(v);
        }

        if settings.api_url.is_empty() {
            return Err(CommandError::Settings {
                message: "api_url is not configured (set VIRTDECK_API_URL)".into(),
            });
        }
        Ok(settings)
    }

    /// The value of the `Authorization` header for API-token auth.
    pub fn auth_header(&self) -> String {
        format!("PVEAPIToken={}={}", self.token_id, self.token_secret)
    }
}

fn read_settings_file(path: &Path) -> Result<Settings, CommandError> {
    let raw = fs::read_to_string(path).map_err(|e| CommandError::Settings {
        message: format!("cannot read {}: {e}", path.display()),
    })?;
    serde_json::from_str(&raw).map_err(|e| CommandError::Settings {
        message: format!("cannot parse {}: {e}", path.display()),
    })
}

fn parse_bool(v: &str) -> bool {
    matches!(v.trim(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn token_secret_is_never_serialized() {
        let settings = Settings {
            api_url: "https://pve:8006/api2/json".into(),
            token_id: "root@pam!deck".into(),
            token_secret: "s3cret".into(),
            allow_mutations: true,
            verify_tls: false,
            default_node: None,
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("s3cret"));
        assert!(!json.contains("token_secret"));
    }

    #[test]
    fn auth_header_shape() {
        let settings = Settings {
            api_url: "https://pve:8006/api2/json".into(),
            token_id: "root@pam!deck".into(),
            token_secret: "abc".into(),
            allow_mutations: false,
            verify_tls: true,
            default_node: None,
        };
        assert_eq!(settings.auth_header(), "PVEAPIToken=root@pam!deck=abc");
    }

    #[test]
    fn parse_bool_accepts_common_forms() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool(" yes "));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("nope"));
    }
}
